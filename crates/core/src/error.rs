use crate::ast::NodeId;

/// A lexical failure raised by the base scanner.
///
/// Recovery never suppresses these: the replay engine hands them back to the
/// caller exactly as the scanner produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("unterminated string literal at offset {offset}")]
    UnterminatedString { offset: u32 },

    #[error("unterminated character literal at offset {offset}")]
    UnterminatedCharacter { offset: u32 },

    #[error("unterminated block comment at offset {offset}")]
    UnterminatedComment { offset: u32 },

    #[error("invalid escape sequence '\\{escape}' at offset {offset}")]
    InvalidEscape { offset: u32, escape: char },

    #[error("malformed number literal '{text}' at offset {offset}")]
    MalformedNumber { offset: u32, text: String },

    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedCharacter { offset: u32, found: char },
}

impl ScanError {
    /// Byte offset the error was raised at.
    pub fn offset(&self) -> u32 {
        match self {
            ScanError::UnterminatedString { offset }
            | ScanError::UnterminatedCharacter { offset }
            | ScanError::UnterminatedComment { offset }
            | ScanError::InvalidEscape { offset, .. }
            | ScanError::MalformedNumber { offset, .. }
            | ScanError::UnexpectedCharacter { offset, .. } => *offset,
        }
    }
}

/// Structural tree-editing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {child} is already attached to {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },

    #[error("node {child} is not a child of {parent}")]
    NotAChild { child: NodeId, parent: NodeId },

    #[error("node {child} fills a mandatory slot of {parent} and cannot be removed")]
    MandatoryChild { child: NodeId, parent: NodeId },

    #[error("node {0} is protected against modification")]
    Protected(NodeId),

    #[error("tree has no root")]
    MissingRoot,
}

/// Failures of the end-to-end recovery session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed session document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tree: {0}")]
    Tree(#[from] TreeError),

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("session has no source text to replay")]
    NoSource,
}
