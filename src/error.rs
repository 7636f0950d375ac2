use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovlensError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Payload not found at '{0}'")]
    MissingPayload(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CovlensError>;
