use thiserror::Error;

/// Edits the builder refuses to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("section '{0}' does not exist")]
    UnknownSection(String),
    #[error("question '{0}' does not exist in this section")]
    UnknownQuestion(String),
    #[error("the last remaining section cannot be deleted")]
    LastSection,
    #[error("question '{source_id}' cannot gate question '{question_id}'; only earlier questions can")]
    IneligibleConditionSource {
        question_id: String,
        source_id: String,
    },
    #[error("question '{question_id}' has no condition at index {index}")]
    UnknownCondition { question_id: String, index: usize },
    #[error("cannot move question from {from} to {to} in a section of {len}")]
    MoveOutOfRange { from: usize, to: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The storage collaborator rejected a write; the caller may retry.
    #[error("write rejected ({status}): {message}")]
    TransientWrite { status: u16, message: String },
    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft store error: {0}")]
    DraftStore(String),
    #[error("failed to read config {path}: {reason}")]
    Config { path: String, reason: String },
    #[error("{0}")]
    Builder(#[from] BuilderError),
    #[error("{count} question(s) failed validation")]
    Invalid { count: usize },
    #[error("request cancelled")]
    Cancelled,
}

impl RuntimeError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RuntimeError::TransientWrite { .. } => true,
            RuntimeError::Http(error) => error.is_timeout() || error.is_connect(),
            _ => false,
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
