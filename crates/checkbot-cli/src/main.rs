//! checkbot CLI: move prediction, outcome recording, onboarding and status.
//!
//! Usage:
//!   checkbot predict --state board.json   Ask a provider for the next move
//!   checkbot record --session g1 ...      Record a finished game once
//!   checkbot outcome <session>            Show a recorded outcome
//!   checkbot outcomes                     List recent outcomes
//!   checkbot providers                    List providers and default models
//!   checkbot onboard                      Create a default configuration
//!   checkbot status                       Show configuration and health

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use checkbot_core::agent::{MoveAgent, PredictRequest};
use checkbot_core::config::Config;
use checkbot_core::recorder::{OutcomeFact, OutcomeRecorder, SqliteOutcomeRecorder};
use checkbot_core::registry::ProviderRegistry;

/// Exit status for a duplicate outcome.
const EXIT_CONFLICT: i32 = 3;

#[derive(Parser)]
#[command(
    name = "checkbot",
    version,
    about = "LLM-driven checkers move prediction",
    long_about = "checkbot asks a language model for a checkers move and turns its answer into one validated action."
)]
struct Cli {
    /// Config file (default: ~/.checkbot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the next move for a board snapshot
    Predict {
        /// Provider name (overrides agent.defaultProvider)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,

        /// JSON file with the board snapshot, or "-" for stdin
        #[arg(short, long)]
        state: PathBuf,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Record a finished game. Each session is recorded at most once.
    Record {
        #[arg(long)]
        session: String,

        #[arg(long)]
        winner: String,

        /// e.g. "ai", "human", "draw"
        #[arg(long)]
        winner_kind: String,

        #[arg(long, default_value = "unknown")]
        finish_reason: String,

        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        duration_secs: Option<u64>,

        #[arg(long)]
        move_count: Option<u32>,
    },

    /// Show the recorded outcome of one session
    Outcome {
        session: String,
    },

    /// List recently recorded outcomes
    Outcomes {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List available providers and their default models
    Providers,

    /// Create or reset the default configuration
    Onboard,

    /// Show configuration status and health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Predict {
            provider,
            model,
            state,
            timeout_secs,
        } => cmd_predict(config_path, provider, model, &state, timeout_secs).await?,
        Commands::Record {
            session,
            winner,
            winner_kind,
            finish_reason,
            provider,
            model,
            duration_secs,
            move_count,
        } => {
            let mut fact = OutcomeFact::new(session, winner, winner_kind, finish_reason);
            fact.provider = provider;
            fact.model = model;
            fact.duration_secs = duration_secs;
            fact.move_count = move_count;
            cmd_record(config_path, &fact)?
        }
        Commands::Outcome { session } => cmd_outcome(config_path, &session)?,
        Commands::Outcomes { limit } => cmd_outcomes(config_path, limit)?,
        Commands::Providers => cmd_providers(),
        Commands::Onboard => cmd_onboard(config_path)?,
        Commands::Status => cmd_status(config_path)?,
    }

    Ok(())
}

// ── Shared Setup ────────────────────────────────────────────────────

/// `--config` if given, otherwise `~/.checkbot/config.json`.
fn resolve_config_path(config_path: Option<&Path>) -> PathBuf {
    config_path.map_or_else(Config::default_path, Path::to_path_buf)
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_or_default(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Config::load().context("failed to load the default configuration"),
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if let Err(errors) = config.validate() {
        eprintln!("\n  \x1b[31m❌ Configuration errors:\x1b[0m");
        for e in &errors {
            eprintln!("     • {}", e);
        }
        eprintln!();
        anyhow::bail!("Fix the above {} error(s) in config.json", errors.len());
    }
    Ok(())
}

fn open_recorder(config: &Config) -> Result<SqliteOutcomeRecorder> {
    let path = config.database_path();
    SqliteOutcomeRecorder::new(&path)
        .with_context(|| format!("failed to open outcome store at {}", path.display()))
}

fn read_state(path: &Path) -> Result<serde_json::Value> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read board state from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read board state from {}", path.display()))?
    };
    serde_json::from_str(&content).context("board state is not valid JSON")
}

// ── Predict Command ─────────────────────────────────────────────────

async fn cmd_predict(
    config_path: Option<&Path>,
    provider: Option<String>,
    model: Option<String>,
    state: &Path,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let board_state = read_state(state)?;
    let provider = provider.unwrap_or_else(|| config.agent.default_provider.clone());
    let entry = config.providers.get(&provider).cloned().unwrap_or_default();

    let request = PredictRequest {
        provider,
        model: model.or_else(|| entry.model.clone()),
        credential: entry.credential().map(str::to_string),
        options: entry.options(),
        board_state,
    };

    info!(provider = %request.provider, state = %state.display(), "Starting prediction");

    let agent = MoveAgent::new(ProviderRegistry::global());
    let cycle = agent.predict_move(request);

    let prediction = match timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), cycle).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_secs = secs, "Prediction deadline exceeded");
                anyhow::bail!("prediction timed out after {secs}s");
            }
        },
        None => cycle.await?,
    };

    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

// ── Outcome Commands ────────────────────────────────────────────────

fn cmd_record(config_path: Option<&Path>, fact: &OutcomeFact) -> Result<()> {
    let config = load_config(config_path)?;
    let recorder = open_recorder(&config)?;

    if recorder.record_once(fact)? {
        println!("recorded");
        Ok(())
    } else {
        warn!(session = %fact.session_id, "Duplicate outcome rejected");
        eprintln!("conflict: outcome for session '{}' already recorded", fact.session_id);
        std::process::exit(EXIT_CONFLICT);
    }
}

fn cmd_outcome(config_path: Option<&Path>, session: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let recorder = open_recorder(&config)?;

    match recorder.get(session)? {
        Some(fact) => println!("{}", serde_json::to_string_pretty(&fact)?),
        None => anyhow::bail!("no outcome recorded for session '{session}'"),
    }
    Ok(())
}

fn cmd_outcomes(config_path: Option<&Path>, limit: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let recorder = open_recorder(&config)?;
    let facts = recorder.list_recent(limit)?;

    if facts.is_empty() {
        println!("  No outcomes recorded yet.");
        return Ok(());
    }

    println!();
    for fact in &facts {
        let at = fact.recorded_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M");
        println!(
            "  {}  {:<16} winner: {} ({})  reason: {}{}",
            at,
            fact.session_id,
            fact.winner,
            fact.winner_kind,
            fact.finish_reason,
            fact.move_count
                .map(|n| format!("  moves: {n}"))
                .unwrap_or_default(),
        );
    }
    println!();
    Ok(())
}

// ── Providers Command ───────────────────────────────────────────────

fn cmd_providers() {
    let registry = ProviderRegistry::global();
    println!();
    for name in registry.available() {
        println!(
            "  {:<12} {}",
            name,
            registry.default_model(&name).unwrap_or_default()
        );
    }
    println!();
}

// ── Onboard Command ─────────────────────────────────────────────────

fn cmd_onboard(config_path: Option<&Path>) -> Result<()> {
    let config_path = resolve_config_path(config_path);
    Config::write_default_template(&config_path)?;
    println!();
    println!("  ✅ Configuration created at:");
    println!("     {}", config_path.display());
    println!();
    println!("  Next steps:");
    println!("  1. Edit the config file and add your API key (or set it in the environment)");
    println!("  2. Run `checkbot predict --state board.json`");
    println!();
    Ok(())
}

// ── Status Command ──────────────────────────────────────────────────

fn cmd_status(config_path: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(config_path);
    println!();
    println!("  checkbot status");
    println!("  ─────────────────────────────────────");

    if path.exists() {
        println!("  Config:    {}", path.display());
    } else {
        println!("  Config:    ❌ Not found (run `checkbot onboard`)");
        return Ok(());
    }

    let config = load_config(config_path)?;
    println!("  Provider:  {} (default)", config.agent.default_provider);

    let configured = config.providers.entries();
    if configured.is_empty() {
        println!("  Keys:      none in config, environment variables will be used");
    }
    for (name, entry) in configured {
        let key = if entry.credential().is_some() { "✅ key set" } else { "env" };
        println!(
            "  {:<10} {} model: {}",
            format!("{name}:"),
            key,
            entry.model.as_deref().unwrap_or("default")
        );
    }

    match config.validate() {
        Ok(()) => println!("  Valid:     ✅"),
        Err(errors) => println!("  Valid:     ❌ {} problem(s)", errors.len()),
    }

    let db = config.database_path();
    println!(
        "  Database:  {} {}",
        db.display(),
        if db.exists() { "✅" } else { "⚠️  (will be created)" }
    );

    println!();
    Ok(())
}
