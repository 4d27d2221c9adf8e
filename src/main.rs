//! Dots and Boxes engine.
//!
//! ## Usage
//!
//! - `dots-and-boxes` - Show a demo
//! - `dots-and-boxes selfplay` - Play a series and write its game log as JSON lines
//! - `dots-and-boxes demo` - Play one classic-versus-random game on the terminal

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use dots_and_boxes::agent::AgentKind;
use dots_and_boxes::config::{Mode, SearchConfig};
use dots_and_boxes::evaluator::UniformEvaluator;
use dots_and_boxes::game::{AgentSpec, Match, Turn, run_series};
use dots_and_boxes::metrics::{JsonLinesSink, MemorySink};

/// Dots and Boxes MCTS engine
#[derive(Parser)]
#[command(name = "dots-and-boxes")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a series of unattended games and export training examples
    Selfplay(SelfplayArgs),
    /// Play one game and print the board after every move
    Demo,
}

#[derive(Args)]
struct SelfplayArgs {
    /// Number of games
    #[arg(short, long, default_value_t = 1)]
    games: u32,

    /// Boxes per side
    #[arg(short = 'n', long, default_value_t = 3)]
    boxes: usize,

    #[arg(long, value_enum, default_value_t = AgentKind::Neural)]
    agent1: AgentKind,

    #[arg(long, value_enum, default_value_t = AgentKind::Classic)]
    agent2: AgentKind,

    #[arg(long, value_enum, default_value_t = Mode::Training)]
    mode: Mode,

    /// Classic search budget per move, in milliseconds
    #[arg(long, default_value_t = 200)]
    millis: u64,

    /// Rollouts per expansion (classic) or simulations per move (neural)
    #[arg(long, default_value_t = 50)]
    simulations: u32,

    /// Reward for moves that keep the turn; defaults to the number of boxes
    #[arg(long)]
    bonus: Option<f64>,

    #[arg(long, default_value_t = dots_and_boxes::constants::DEFAULT_SEED)]
    seed: u64,

    /// Write examples here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Some(Commands::Selfplay(args)) => run_selfplay(args),
        Some(Commands::Demo) | None => run_demo(),
    }
}

fn run_selfplay(args: SelfplayArgs) -> Result<()> {
    let mut config = SearchConfig::default()
        .with_mode(args.mode)
        .with_millis(args.millis)
        .with_simulations(args.simulations)
        .with_seed(args.seed);
    if let Some(bonus) = args.bonus {
        config = config.with_bonus(bonus);
    }

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("cannot create {}", path.display()))?),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(writer));

    let evaluator = UniformEvaluator;
    let spec = |name, kind| {
        let spec = AgentSpec::new(name, kind);
        if kind == AgentKind::Neural { spec.with_evaluator(&evaluator) } else { spec }
    };
    let agents = [spec("1 PC", args.agent1), spec("2 PC", args.agent2)];

    info!(games = args.games, boxes = args.boxes, mode = ?config.mode, "starting self-play");
    let summary = run_series(args.games, args.boxes, &config, agents, &mut sink).context("self-play failed")?;
    sink.into_inner().flush().context("cannot flush output")?;

    eprint!("{}", summary.report(args.boxes, &config, agents));
    Ok(())
}

fn run_demo() -> Result<()> {
    println!("Dots and Boxes: MCTS Engine\n");

    let config = SearchConfig::for_competition().with_millis(100).with_simulations(20);
    let mut game = Match::new(3, config)?;
    game.add_agent("Classic", AgentKind::Classic, None)?;
    game.add_agent("Random", AgentKind::Random, None)?;

    let mut sink = MemorySink::default();
    println!("{}", game.board());
    loop {
        let mover = game.board().agent_name(game.board().active_seat());
        match game.step(None, &mut sink)? {
            Turn::Played(text) => {
                let board = game.board();
                println!("{mover} played {text} ({} pts)", board.last_points());
                println!("{board}");
            }
            Turn::Finished => break,
            Turn::Rejected(_) | Turn::NeedsInput(_) => bail!("{mover} needs manual input"),
        }
    }
    game.finish(&mut sink)?;
    println!("{}", game.board().result_summary());
    Ok(())
}
