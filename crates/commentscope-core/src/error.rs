use crate::page::PageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid selector file: {0}")]
    InvalidSelectors(String),

    #[error("Invalid session credential: {0}")]
    InvalidCredential(String),

    #[error("Invalid profile URL: {0}")]
    InvalidProfileUrl(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

pub type Result<T> = std::result::Result<T, Error>;
