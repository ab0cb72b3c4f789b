//! journey CLI
//!
//! Usage:
//!   journey --signals '{"Q11": 2}'          # Single evaluation
//!   journey --interactive                   # Accumulate signals turn by turn
//!   journey --serve                         # HTTP API server
//!   journey --fingerprint                   # Questionnaire version + fingerprint
//!   journey --signals '{"Q5": 1}' --json    # JSON output

use clap::Parser;
use colored::Colorize;
use serde_json::{Map, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use journey_stage::core::{
    load_path, spawn_expiry_sweep, AppState, ConfigError, EchoAnnotator, FileStore,
    InMemoryStore, StateStore, StoreError, TurnProcessor, run_server,
};
use journey_stage::settings::{Settings, SettingsError};
use journey_stage::telemetry::{self, TelemetryError};
use journey_stage::types::{QuestionnaireConfig, TurnOutcome, UserState};
use journey_stage::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "journey",
    version = VERSION,
    about = "Estimate culture-shock adaptation stage from conversational signals",
    long_about = "journey scores per-question signals against a weighted questionnaire\n\
                  and reports a probability distribution over adaptation stages\n\
                  with a confidence label.\n\n\
                  Modes:\n  \
                  --signals      Score one signal map\n  \
                  --interactive  Accumulate signals across turns\n  \
                  --serve        HTTP API server mode\n\n\
                  Interactive input: a JSON object or pairs like `Q11=2 Q5=-1`."
)]
struct Args {
    /// Signals to evaluate as a JSON object (single mode)
    #[arg(long)]
    signals: Option<String>,

    /// Interactive mode - read signal lines from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Print questionnaire version and fingerprint, then exit
    #[arg(long)]
    fingerprint: bool,

    /// Server address (default: JOURNEY_HOST:JOURNEY_PORT)
    #[arg(long)]
    addr: Option<String>,

    /// Questionnaire definition (default: JOURNEY_QUESTIONNAIRE or built-in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for persisted user state (default: JOURNEY_STATE_DIR or memory)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show raw stage scores
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("signals must be a JSON object: {0}")]
    Signals(String),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let settings = Settings::load()?;
    if args.no_color {
        colored::control::set_override(false);
    }

    let config_path = args.config.clone().or_else(|| settings.questionnaire_path.clone());
    let config = Arc::new(match config_path {
        Some(path) => load_path(path)?,
        None => QuestionnaireConfig::builtin()?,
    });

    if args.fingerprint {
        println!("{} {}", config.version, config.fingerprint());
        return Ok(());
    }

    if args.serve {
        telemetry::init(&settings.log_level)?;
        return run_serve(&args, &settings, config).await;
    }

    let processor = TurnProcessor::new(config);
    if let Some(ref raw) = args.signals {
        run_single(&processor, raw, &args)
    } else {
        run_interactive(&processor, &args)
    }
}

/// Score one signal map
fn run_single(processor: &TurnProcessor, raw: &str, args: &Args) -> Result<(), AppError> {
    let signals = parse_json_signals(raw)?;
    let result = processor.process(None, &signals);
    print_outcome(processor, &result.state, &result.outcome, args)
}

/// Interactive mode: each line is one turn
fn run_interactive(processor: &TurnProcessor, args: &Args) -> Result<(), AppError> {
    let config = processor.config();
    print_header(config, processor.manager().fingerprint());
    println!("Enter signals as JSON or `Q11=2 Q5=-1`. Commands: state, reset, quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut state: Option<UserState> = None;

    loop {
        print!("{} > ", turn_count(&state));
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => {
                println!("\nSession ended. Snapshots: {}", turn_count(&state));
                break;
            }
            "reset" => {
                state = None;
                println!("State cleared.");
                continue;
            }
            "state" => {
                let current = state.clone().unwrap_or_default();
                println!("{}", serde_json::to_string_pretty(&current.signals).unwrap_or_default());
                continue;
            }
            _ => {}
        }

        let signals = match parse_line(line) {
            Ok(signals) => signals,
            Err(e) => {
                println!("{}", e.to_string().yellow());
                continue;
            }
        };
        let result = processor.process(state.take(), &signals);
        print_outcome(processor, &result.state, &result.outcome, args)?;
        state = Some(result.state);
    }
    Ok(())
}

fn turn_count(state: &Option<UserState>) -> usize {
    state.as_ref().map(|s| s.history.len()).unwrap_or(0)
}

fn parse_line(line: &str) -> Result<Map<String, Value>, AppError> {
    if line.starts_with('{') {
        return parse_json_signals(line);
    }
    let mut signals = Map::new();
    for pair in line.split_whitespace() {
        let (qid, value) = pair
            .split_once('=')
            .ok_or_else(|| AppError::Signals(format!("expected QID=value, got `{}`", pair)))?;
        signals.insert(qid.to_string(), Value::String(value.to_string()));
    }
    Ok(signals)
}

fn parse_json_signals(raw: &str) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::Signals(format!("got {}", other))),
        Err(e) => Err(AppError::Signals(e.to_string())),
    }
}

fn print_outcome(
    processor: &TurnProcessor,
    state: &UserState,
    outcome: &TurnOutcome,
    args: &Args,
) -> Result<(), AppError> {
    let stages = &processor.config().stages;

    if args.json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    if args.no_color {
        println!("{}", outcome.to_parseable_string(stages));
    } else {
        println!("{}", outcome.to_terminal_string(stages));
    }

    if args.verbose {
        let assessment = processor.manager().assess(&state.signals);
        for stage in stages {
            println!(
                "  {:<4} raw={:>6.2}  p={:.3}",
                stage,
                assessment.stage_scores.get(stage).copied().unwrap_or(0.0),
                assessment.probability(stage)
            );
        }
        println!(
            "  dominance={:.3} coverage={:.3} score={:.3} dominant={}",
            assessment.dominance,
            assessment.coverage,
            assessment.confidence_score,
            assessment.dominant_stage().unwrap_or("-")
        );
    }
    Ok(())
}

fn print_header(config: &QuestionnaireConfig, fingerprint: &str) {
    println!("{}", "========================================".bold());
    println!("{}", format!("  journey v{} - interactive", VERSION).bold());
    println!(
        "  questionnaire {} ({}), {} questions",
        config.version,
        fingerprint,
        config.question_count()
    );
    println!("{}", "========================================".bold());
    println!();
}

/// Run HTTP API server
async fn run_serve(args: &Args, settings: &Settings, config: Arc<QuestionnaireConfig>) -> Result<(), AppError> {
    let state_dir = args.state_dir.clone().or_else(|| settings.state_dir.clone());
    let store: Arc<dyn StateStore> = match state_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using file state store");
            Arc::new(FileStore::new(dir, settings.state_ttl)?)
        }
        None => Arc::new(InMemoryStore::new(settings.state_ttl)),
    };
    let sweep_every = settings.state_ttl.clamp(Duration::from_secs(1), Duration::from_secs(300));
    spawn_expiry_sweep(store.clone(), sweep_every);

    info!(
        version = %config.version,
        fingerprint = %config.fingerprint(),
        questions = config.question_count(),
        "questionnaire loaded"
    );

    let state = Arc::new(AppState::new(
        config,
        store,
        Arc::new(EchoAnnotator),
        settings.history_window,
    ));
    let addr = args.addr.clone().unwrap_or_else(|| settings.bind_addr());
    run_server(&addr, state).await?;
    Ok(())
}
