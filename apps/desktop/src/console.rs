//! Terminal rendering of notifications, turns and the document list.

use client_core::{BusyFlags, Notifier, NotifyLevel};
use shared::domain::{DocumentName, Turn, TurnText};

pub const ASSISTANT_LABEL: &str = "Assistant";
pub const USER_LABEL: &str = "User";

/// Prints notifications to stderr so they never interleave with piped
/// answers on stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Success => eprintln!("[ok] {message}"),
            NotifyLevel::Error => eprintln!("[error] {message}"),
        }
    }
}

pub fn render_turn(turn: &Turn) -> String {
    let label = if turn.is_bot {
        ASSISTANT_LABEL
    } else {
        USER_LABEL
    };
    let mut out = format!("{label}:\n");
    match &turn.text {
        TurnText::Pending => out.push_str("  █\n"),
        TurnText::Final(text) => {
            for line in text.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    if turn.is_bot && !turn.text.is_pending() {
        out.push_str("  Reference\n");
        for source in &turn.sources {
            out.push_str(&format!("    - {}\n", source.name));
            for line in source.content.lines() {
                out.push_str(&format!("      {line}\n"));
            }
        }
    }
    out
}

pub fn render_documents(documents: &[DocumentName]) -> String {
    if documents.is_empty() {
        return "Empty DB. Refresh to double check.\n".to_string();
    }
    documents
        .iter()
        .map(|doc| format!("  {doc}\n"))
        .collect()
}

pub fn render_status(flags: &BusyFlags) -> String {
    let busy: Vec<&str> = [
        ("ask", flags.ask),
        ("upload", flags.upload),
        ("ingest", flags.ingest),
        ("list", flags.list),
        ("delete", flags.delete),
    ]
    .into_iter()
    .filter(|(_, busy)| *busy)
    .map(|(name, _)| name)
    .collect();
    if busy.is_empty() {
        "idle".to_string()
    } else {
        format!("in progress: {}", busy.join(", "))
    }
}
