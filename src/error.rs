use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    /// The search store answered with a non-success status.
    #[error("Search store responded with {status}: {body}")]
    Search { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed records end up here, e.g. an unknown job state.
    #[error("Malformed document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
