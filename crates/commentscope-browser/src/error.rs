use commentscope_core::page::PageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("Invalid cookie '{name}': {reason}")]
    Cookie { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

impl From<Error> for PageError {
    fn from(err: Error) -> Self {
        match err {
            Error::Cdp(msg) => PageError::Script(msg),
            other => PageError::Disconnected(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
