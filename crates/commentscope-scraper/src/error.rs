use commentscope_core::page::PageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The stored session was not accepted
    #[error("Session rejected: {0}")]
    SessionRejected(String),

    /// The browser was bounced to a login or checkpoint page mid-run
    #[error("Session expired while loading {url}")]
    SessionExpired { url: String },

    #[error("Activity feed unavailable for {profile}: {reason}")]
    FeedUnavailable { profile: String, reason: String },

    #[error("No comment section found on {url}")]
    CommentSectionMissing { url: String },

    #[error("No headline found on {url}")]
    HeadlineMissing { url: String },

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Core(#[from] commentscope_core::Error),
}

impl ScrapeError {
    /// Whether the error ends the run instead of just the current item
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::SessionRejected(_)
                | ScrapeError::SessionExpired { .. }
                | ScrapeError::FeedUnavailable { .. }
        )
    }

    /// Whether the session is unusable for every remaining profile
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ScrapeError::SessionRejected(_) | ScrapeError::SessionExpired { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
