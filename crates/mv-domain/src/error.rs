//! Shared error taxonomy used across all MarketVoice crates (spec §7).

/// Errors that degrade a stage rather than failing the whole turn are
/// still represented as `Error` values — callers decide whether to
/// propagate or absorb them (see `mv-agent`'s per-stage failure semantics).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("unknown user: {0}")]
    UserUnknown(String),

    #[error("transient: {0}")]
    Transient(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("tool {tool_id}: {message}")]
    ToolFailure { tool_id: String, message: String },

    #[error("llm: {0}")]
    LlmFailure(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the operation that produced this error is worthwhile.
    /// Used by the tool registry and the store's backoff helper.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
