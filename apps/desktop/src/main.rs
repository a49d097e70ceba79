use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AssistantSession, Notifier, OperationOutcome, SelectedFile, SubmitOutcome, TracingNotifier,
};
use shared::domain::DocumentName;
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod shell;

use config::load_settings;
use console::{render_documents, render_turn, ConsoleNotifier};

#[derive(Parser, Debug)]
#[command(name = "rag-desktop", about = "Ask questions against a document corpus")]
struct Args {
    /// Config file; defaults to ./client.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// Per-request timeout in seconds (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    /// Send notifications to the log instead of the terminal.
    #[arg(long)]
    log_notifications: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question and print the answer with its references.
    Ask { question: Vec<String> },
    /// List the documents stored on the server.
    List,
    /// Index every uploaded document.
    Ingest,
    /// Upload a file into the corpus.
    Upload { path: PathBuf },
    /// Delete a document by name.
    Delete { name: String },
    /// Interactive session (the default).
    Shell,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }

    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let notifier: Arc<dyn Notifier> = if args.log_notifications {
        Arc::new(TracingNotifier)
    } else {
        Arc::new(ConsoleNotifier)
    };
    let session = AssistantSession::connect(&settings.session_config(), notifier)
        .with_context(|| format!("cannot use server url '{}'", settings.server_url))?;

    match args.command.unwrap_or(Command::Shell) {
        Command::Ask { question } => {
            let question = question.join(" ");
            match session.conversation().submit_question(&question).await {
                SubmitOutcome::Answered { turn_id } => {
                    let transcript = session.conversation().transcript().await;
                    if let Some(turn) = transcript.iter().find(|turn| turn.id == turn_id) {
                        print!("{}", render_turn(turn));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                SubmitOutcome::Rejected | SubmitOutcome::Failed(_) => Ok(ExitCode::FAILURE),
            }
        }
        Command::List => {
            let outcome = session.documents().list_documents().await;
            if outcome.is_completed() {
                print!("{}", render_documents(&session.documents().documents().await));
            }
            Ok(exit_code(&outcome))
        }
        Command::Ingest => Ok(exit_code(&session.documents().ingest_corpus().await)),
        Command::Upload { path } => {
            let file = SelectedFile::from_path(&path).await?;
            session.documents().select_file(Some(file)).await;
            let outcome = session.documents().upload_document().await;
            if outcome.is_completed() {
                print!("{}", render_documents(&session.documents().documents().await));
            }
            Ok(exit_code(&outcome))
        }
        Command::Delete { name } => {
            let outcome = session
                .documents()
                .delete_document(&DocumentName::new(name))
                .await;
            print!("{}", render_documents(&session.documents().documents().await));
            Ok(exit_code(&outcome))
        }
        Command::Shell => {
            shell::run(Arc::new(session)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// The notifier has already told the user what happened; this only sets the
/// exit status.
fn exit_code(outcome: &OperationOutcome) -> ExitCode {
    if outcome.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
