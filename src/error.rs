use crate::dom::readiness::Readiness;
use crate::selector::{SelectionHints, SelectionKind, SelectionStatus};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for staging operations
pub type Result<T> = std::result::Result<T, StageError>;

/// Errors that can occur while staging a draft
#[derive(Debug, Error)]
pub enum StageError {
    /// No debuggable page target appeared before the deadline
    #[error("no debuggable page target for {url} within {timeout_ms}ms: {reason}")]
    TargetUnavailable { url: String, timeout_ms: u64, reason: String },

    /// The debugger socket closed or errored before a response arrived
    #[error("CDP channel closed: {0}")]
    ChannelClosed(String),

    /// The debugger socket could not be opened
    #[error("failed to connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A command got no response within the command timeout
    #[error("CDP command {method} timed out after {timeout_ms}ms")]
    CommandTimeout { method: String, timeout_ms: u64 },

    /// The remote end answered with an error payload
    #[error("CDP error {code} from {method}: {message}")]
    RemoteError { method: String, code: i64, message: String },

    /// An in-page snippet threw
    #[error("page evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("composer not ready after {timeout_ms}ms ({readiness})")]
    ComposerNotReady { timeout_ms: u64, readiness: Readiness },

    #[error("{kind} selection of '{target}' failed: {status}{}", hint_suffix(.hints))]
    SelectionFailed {
        kind: SelectionKind,
        target: String,
        status: SelectionStatus,
        hints: Option<SelectionHints>,
    },

    #[error("failed to set prompt: {0}")]
    PromptInjectionFailed(String),

    #[error("no file input element found in the composer")]
    NoFileInput,

    #[error(
        "attachments not confirmed within {timeout_ms}ms (staged={staged}/{expected},namesVisible={names_visible})"
    )]
    AttachmentTimeout {
        staged: usize,
        expected: usize,
        names_visible: bool,
        timeout_ms: u64,
    },

    #[error("attachment not found: {}", .0.display())]
    MissingAttachment(PathBuf),

    /// Data from the endpoint or the page did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn hint_suffix(hints: &Option<SelectionHints>) -> String {
    hints.as_ref().map(|h| format!(" ({h})")).unwrap_or_default()
}

impl StageError {
    /// Whether this failure came from the transport rather than the page.
    ///
    /// The orchestrator retries the whole page sequence only for these.
    pub fn is_channel_failure(&self) -> bool {
        matches!(
            self,
            StageError::ChannelClosed(_) | StageError::ConnectionFailed { .. } | StageError::CommandTimeout { .. }
        )
    }
}
