use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::SourceExcerpt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(TurnId);

/// Name of a stored document. The backend keys its corpus by filename, so this
/// is the only identity the client holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentName(pub String);

impl DocumentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum TurnText {
    Pending,
    Final(String),
}

impl TurnText {
    pub fn as_final(&self) -> Option<&str> {
        match self {
            TurnText::Final(text) => Some(text),
            TurnText::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TurnText::Pending)
    }
}

/// One entry of the conversation transcript.
///
/// User turns never carry sources and are always `Final`. A bot turn starts
/// `Pending` while its answer is outstanding and is resolved exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub is_bot: bool,
    pub text: TurnText,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceExcerpt>,
}

impl Turn {
    pub fn user(id: TurnId, text: impl Into<String>) -> Self {
        Self {
            id,
            is_bot: false,
            text: TurnText::Final(text.into()),
            sources: Vec::new(),
        }
    }

    pub fn pending_bot(id: TurnId) -> Self {
        Self {
            id,
            is_bot: true,
            text: TurnText::Pending,
            sources: Vec::new(),
        }
    }

    pub fn bot(id: TurnId, answer: impl Into<String>, sources: Vec<SourceExcerpt>) -> Self {
        Self {
            id,
            is_bot: true,
            text: TurnText::Final(answer.into()),
            sources,
        }
    }
}
