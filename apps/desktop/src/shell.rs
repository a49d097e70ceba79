//! Interactive session: plain lines are questions, `:` lines drive the
//! document panel. Every operation runs as its own task so a slow answer
//! does not block the corpus commands; a command whose operation is already
//! in flight is refused, the way a busy button is disabled.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use client_core::{AssistantSession, OperationOutcome, SelectedFile, SubmitOutcome};
use shared::domain::DocumentName;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};
use tracing::{debug, warn};

use crate::console::{render_documents, render_status, render_turn};

const HELP: &str = "\
Type a question and press enter to ask it.
  :list            refresh the document list from the server
  :docs            show the cached document list
  :select <path>   choose a file to upload
  :upload [path]   upload the chosen (or given) file
  :ingest          index all uploaded documents
  :delete <name>   delete a document
  :history         show the conversation so far
  :status          show operations in progress
  :help            show this help
  :quit            cancel outstanding requests and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    List,
    Docs,
    Select(PathBuf),
    Upload(Option<PathBuf>),
    Ingest,
    Delete(String),
    History,
    Status,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ShellCommand {
    let Some(command) = line.trim_start().strip_prefix(':') else {
        return ShellCommand::Ask(line.to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command.trim(), ""),
    };
    match (name, arg) {
        ("list" | "refresh", _) => ShellCommand::List,
        ("docs", _) => ShellCommand::Docs,
        ("select", path) if !path.is_empty() => ShellCommand::Select(PathBuf::from(path)),
        ("upload", "") => ShellCommand::Upload(None),
        ("upload", path) => ShellCommand::Upload(Some(PathBuf::from(path))),
        ("ingest", _) => ShellCommand::Ingest,
        ("delete", name) => ShellCommand::Delete(name.to_string()),
        ("history", _) => ShellCommand::History,
        ("status", _) => ShellCommand::Status,
        ("help", _) => ShellCommand::Help,
        ("quit" | "exit", _) => ShellCommand::Quit,
        _ => ShellCommand::Unknown(command.to_string()),
    }
}

pub async fn run(session: Arc<AssistantSession>) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ShellCommand::Quit => break,
            command => dispatch(&session, command, &mut tasks).await,
        }
    }

    session.shutdown();
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "shell: operation task failed");
        }
    }
    Ok(())
}

async fn dispatch(session: &Arc<AssistantSession>, command: ShellCommand, tasks: &mut JoinSet<()>) {
    debug!(?command, "shell: command");
    match command {
        ShellCommand::Ask(question) => {
            if session.conversation().is_pending() {
                println!("Still waiting for the previous answer.");
                return;
            }
            let session = session.clone();
            tasks.spawn(async move {
                if let SubmitOutcome::Answered { turn_id } =
                    session.conversation().submit_question(&question).await
                {
                    let transcript = session.conversation().transcript().await;
                    if let Some(turn) = transcript.iter().find(|turn| turn.id == turn_id) {
                        print!("{}", render_turn(turn));
                    }
                }
            });
        }
        ShellCommand::List => {
            if session.documents().status().list {
                println!("A listing is already in progress.");
                return;
            }
            let session = session.clone();
            tasks.spawn(async move {
                if session.documents().list_documents().await.is_completed() {
                    print!("{}", render_documents(&session.documents().documents().await));
                }
            });
        }
        ShellCommand::Docs => {
            print!("{}", render_documents(&session.documents().documents().await));
        }
        ShellCommand::Select(path) => {
            select(session, path).await;
        }
        ShellCommand::Upload(path) => {
            if session.documents().status().upload {
                println!("An upload is already in progress.");
                return;
            }
            if let Some(path) = path {
                if !select(session, path).await {
                    return;
                }
            }
            let session = session.clone();
            tasks.spawn(async move {
                if session.documents().upload_document().await.is_completed() {
                    print!("{}", render_documents(&session.documents().documents().await));
                }
            });
        }
        ShellCommand::Ingest => {
            if session.documents().status().ingest {
                println!("Ingestion is already in progress.");
                return;
            }
            let session = session.clone();
            tasks.spawn(async move {
                session.documents().ingest_corpus().await;
            });
        }
        ShellCommand::Delete(name) => {
            if session.documents().status().delete {
                println!("A deletion is already in progress.");
                return;
            }
            let session = session.clone();
            tasks.spawn(async move {
                let outcome = session
                    .documents()
                    .delete_document(&DocumentName::new(name))
                    .await;
                if outcome != OperationOutcome::Rejected {
                    print!("{}", render_documents(&session.documents().documents().await));
                }
            });
        }
        ShellCommand::History => {
            for turn in session.conversation().transcript().await {
                print!("{}", render_turn(&turn));
            }
        }
        ShellCommand::Status => println!("{}", render_status(&session.status())),
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Unknown(command) => {
            println!("Unknown command ':{command}'. Type :help for the list.");
        }
        ShellCommand::Quit => {}
    }
}

/// Reads `path` into the pending selection; an unreadable file leaves the
/// previous selection alone and returns false.
async fn select(session: &AssistantSession, path: PathBuf) -> bool {
    match SelectedFile::from_path(&path).await {
        Ok(file) => {
            println!("Selected {} ({} bytes).", file.filename, file.bytes.len());
            session.documents().select_file(Some(file)).await;
            true
        }
        Err(e) => {
            eprintln!("[error] {e:#}");
            false
        }
    }
}
