use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid scope: {0}")]
    Scope(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP status error: {0}")]
    HttpStatus(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

pub type Result<T> = std::result::Result<T, Error>;
