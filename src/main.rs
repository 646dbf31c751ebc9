use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use design_interview::{
    automation::{AutomationHandle, AutomationLoop, AutomationOutcome},
    config::Config,
    engine::TraversalMode,
    oracle::OracleClient,
    session::{InterviewSettings, SessionController},
    storage::{SqliteStorage, Storage},
};

/// Adaptive design interview over an LLM question oracle.
#[derive(Debug, Parser)]
#[command(name = "design-interview", version, about)]
struct Cli {
    /// Design prompt to interview about, e.g. "Design a parking app".
    prompt: Option<String>,

    /// Traversal mode.
    #[arg(long, default_value_t = TraversalMode::Bfs)]
    mode: TraversalMode,

    /// Stop after this many questions.
    #[arg(long)]
    max_questions: Option<usize>,

    /// Let the oracle answer its own questions (Ctrl-C cancels).
    #[arg(long)]
    auto: bool,

    /// Resume a saved session by id instead of starting a new one.
    #[arg(long, value_name = "SESSION_ID")]
    resume: Option<String>,

    /// List saved sessions and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Design interview starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    if cli.list {
        return list_sessions(storage.as_ref()).await;
    }

    // Initialize oracle client
    let oracle = match OracleClient::new(&config.oracle, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.oracle.base_url, "Oracle client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize oracle client");
            return Err(e.into());
        }
    };

    let mut settings = InterviewSettings::from_config(cli.mode, &config.interview);
    if cli.max_questions.is_some() {
        settings.max_questions = cli.max_questions;
    }

    let mut session = match &cli.resume {
        Some(session_id) => {
            SessionController::restore(session_id, oracle, storage, Vec::new()).await?
        }
        None => {
            let Some(prompt) = cli.prompt.clone() else {
                eprintln!("A design prompt is required unless --resume or --list is given");
                std::process::exit(1);
            };
            SessionController::begin(prompt, settings, oracle, storage, Vec::new()).await?
        }
    };

    println!("Session {} ({})", session.id(), session.settings().mode);
    println!("Prompt: {}", session.design_prompt());
    println!();

    if cli.auto {
        run_automation(&mut session).await?;
    } else {
        run_interactive(&mut session).await?;
    }

    info!(session_id = %session.id(), "Session saved");
    Ok(())
}

/// Interactive loop: print the current question, read an answer or a
/// `:command` from stdin, repeat until the traversal completes.
async fn run_interactive(session: &mut SessionController) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let Some(node) = session.current_question() else {
            println!("Interview complete after {} questions.", session.question_count());
            offer_requirements(session).await?;
            return Ok(());
        };
        let prompt = format!("\n[q{}] {}\n> ", session.question_count(), node.question);
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let input = line.trim();
        match input {
            "" => continue,
            ":quit" | ":q" => return Ok(()),
            ":save" => {
                session.save().await?;
                println!("Saved session {}", session.id());
            }
            ":auto" => run_automation(session).await?,
            ":doc" => {
                let doc = session.compile_requirements().await?;
                println!("\n{}\n", doc);
            }
            ":mockup" => {
                let mockup = session.generate_mockup().await?;
                println!("\n{}\n", mockup);
            }
            answer => {
                if session.submit_answer(answer).await?.is_none() {
                    println!("Interview complete after {} questions.", session.question_count());
                    offer_requirements(session).await?;
                    return Ok(());
                }
            }
        }
    }
}

/// Hand the session to the automation loop; Ctrl-C requests a cooperative
/// stop instead of killing the process.
async fn run_automation(session: &mut SessionController) -> anyhow::Result<()> {
    let handle = AutomationHandle::new();
    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_handle.stop();
        }
    });

    println!("Auto-answering (Ctrl-C to stop)...");
    let outcome = AutomationLoop::new(session).run(session, &handle).await?;
    match outcome {
        AutomationOutcome::Complete => {
            println!("Interview complete after {} questions.", session.question_count());
            offer_requirements(session).await?;
        }
        AutomationOutcome::Stopped => println!("Automation stopped."),
        AutomationOutcome::NoSuggestion => {
            println!("The oracle had no answer for the current question.")
        }
        AutomationOutcome::Exhausted => {
            println!("Question budget spent after {} questions.", session.question_count())
        }
    }
    Ok(())
}

async fn offer_requirements(session: &mut SessionController) -> anyhow::Result<()> {
    if session.tree().answered_history().is_empty() {
        return Ok(());
    }
    let doc = session.compile_requirements().await?;
    println!("\n{}", doc);
    Ok(())
}

async fn list_sessions(storage: &dyn Storage) -> anyhow::Result<()> {
    let sessions = storage.list_sessions().await?;
    if sessions.is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }
    for summary in sessions {
        println!(
            "{}  {}  {}",
            summary.session_id, summary.updated_at, summary.design_prompt
        );
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        design_interview::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        design_interview::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
