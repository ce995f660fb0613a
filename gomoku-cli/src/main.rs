//! Batch CLI for the Gomoku sandbox: run untrusted move code, ask the LLM
//! advisor, or check the environment. JSON in, JSON out; no interactive UI.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gomoku_common::{init_logging, Config};
use gomoku_engine::{heuristic, Board, MoveAdvisor, Stone};
use gomoku_sandbox::{
    CodeSubmission, DockerSandbox, IsolationLevel, Orchestrator, ResourceLimitPolicy,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gomoku")]
#[command(version = "0.1.0")]
#[command(about = "Sandboxed execution of untrusted Gomoku move code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a code file in the sandbox and report the extracted move
    Run {
        /// Path to the submitted Python source
        code: PathBuf,
        /// Isolation level for the execution
        #[arg(long, value_enum, default_value = "strong")]
        isolation: IsolationArg,
        /// Board state as a JSON 15x15 cell array; empty board if omitted
        #[arg(long)]
        board: Option<PathBuf>,
        /// Player the code moves for (1 black, 2 white)
        #[arg(long, default_value_t = 2)]
        player: u8,
    },
    /// Ask the configured LLM advisor for a move
    Advise {
        /// Board state as a JSON 15x15 cell array; empty board if omitted
        #[arg(long)]
        board: Option<PathBuf>,
        /// Player to advise (1 black, 2 white)
        #[arg(long, default_value_t = 2)]
        player: u8,
        /// Fall back to the heuristic engine when no valid move is obtained
        #[arg(long)]
        fallback: bool,
    },
    /// Check sandbox and advisor availability
    Doctor,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IsolationArg {
    Strong,
    Weak,
}

impl From<IsolationArg> for IsolationLevel {
    fn from(arg: IsolationArg) -> Self {
        match arg {
            IsolationArg::Strong => Self::Strong,
            IsolationArg::Weak => Self::Weak,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    let policy = ResourceLimitPolicy::from_config_value(&config.sandbox)
        .context("Invalid sandbox configuration")?;

    match cli.command {
        Commands::Run {
            code,
            isolation,
            board,
            player,
        } => run_submission(policy, &code, isolation, board.as_deref(), player).await,
        Commands::Advise {
            board,
            player,
            fallback,
        } => advise(&config, board.as_deref(), player, fallback).await,
        Commands::Doctor => doctor(&config).await,
    }
}

async fn run_submission(
    policy: ResourceLimitPolicy,
    code_path: &std::path::Path,
    isolation: IsolationArg,
    board_path: Option<&std::path::Path>,
    player: u8,
) -> Result<()> {
    let stone = stone_for(player)?;
    let board = load_board(board_path)?;
    let code = tokio::fs::read_to_string(code_path)
        .await
        .with_context(|| format!("Failed to read {}", code_path.display()))?;

    let orchestrator = Orchestrator::connect(policy);
    let submission = CodeSubmission::new(code, isolation.into(), board.snapshot(stone));
    let report = orchestrator.execute(submission).await;
    let validated = board.validate_candidate(&report.candidate);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "outcome": report.outcome,
            "candidate": report.candidate,
            "validated": validated,
        }))?
    );
    Ok(())
}

async fn advise(
    config: &Config,
    board_path: Option<&std::path::Path>,
    player: u8,
    fallback: bool,
) -> Result<()> {
    let stone = stone_for(player)?;
    let board = load_board(board_path)?;

    let suggestion = match MoveAdvisor::from_config(&config.advisor) {
        Ok(advisor) => match advisor.suggest(&board, stone).await {
            Ok(candidate) => board
                .validate_candidate(&candidate)
                .map(|pair| (pair, "advisor")),
            Err(e) => {
                tracing::warn!(error = %e, "Advisor call failed");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Advisor not configured");
            None
        }
    };

    // Falling back to the heuristic is this caller's policy, deliberately
    // not the advisor's or the orchestrator's.
    let resolved = match suggestion {
        Some(found) => Some(found),
        None if fallback => Some((heuristic::suggest_move(&board, stone), "heuristic")),
        None => None,
    };

    match resolved {
        Some(((row, col), source)) => println!(
            "{}",
            serde_json::json!({ "move": [row, col], "source": source })
        ),
        None => println!("{}", serde_json::json!({ "move": null })),
    }
    Ok(())
}

async fn doctor(config: &Config) -> Result<()> {
    let sandbox_ok = match DockerSandbox::connect() {
        Ok(sandbox) => sandbox.health_check().await,
        Err(e) => {
            tracing::warn!(error = %e, "Docker connection failed");
            false
        }
    };

    println!(
        "{}",
        serde_json::json!({
            "sandbox_available": sandbox_ok,
            "advisor_configured": !config.advisor.api_key.is_empty(),
        })
    );
    Ok(())
}

fn stone_for(player: u8) -> Result<Stone> {
    match Stone::from_cell_value(player) {
        Some(stone) => Ok(stone),
        None => bail!("Player must be 1 (black) or 2 (white), got {player}"),
    }
}

fn load_board(path: Option<&std::path::Path>) -> Result<Board> {
    let Some(path) = path else {
        return Ok(Board::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cells: Vec<Vec<u8>> =
        serde_json::from_str(&content).with_context(|| format!("Invalid board in {}", path.display()))?;
    Board::from_cells(cells).context("Invalid board state")
}
