pub mod auth;
pub mod collector;
pub mod config;
pub mod enricher;
pub mod error;
pub mod pacing;
pub mod paginator;
pub mod run;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ScrapeConfig;
pub use error::{Result, ScrapeError};
pub use pacing::Pacer;
pub use run::{RunState, RunSummary, Scraper};
pub use wait::WaitPolicy;
