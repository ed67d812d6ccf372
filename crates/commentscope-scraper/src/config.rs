use crate::pacing::Pacer;
use crate::wait::WaitPolicy;
use commentscope_core::output::OutputFormat;
use commentscope_core::{LookbackWindow, UnresolvedPolicy};
use std::path::PathBuf;

/// Runtime tunables for one scraping run
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub window: LookbackWindow,
    pub unresolved: UnresolvedPolicy,
    pub scrape_headlines: bool,

    /// Consecutive scrolls without new posts before the feed counts as exhausted
    pub max_idle_scrolls: u32,
    /// Upper bound on "load more" clicks per control per post
    pub max_expansions: u32,
    pub wait: WaitPolicy,
    pub pacer: Pacer,

    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Where post-list checkpoints live
    pub state_dir: PathBuf,
    /// Rewrite the output file after every collected post
    pub incremental_save: bool,
    pub show_progress: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            window: LookbackWindow::default(),
            unresolved: UnresolvedPolicy::default(),
            scrape_headlines: false,
            max_idle_scrolls: 3,
            max_expansions: 50,
            wait: WaitPolicy::default(),
            pacer: Pacer::default(),
            output_dir: PathBuf::from("output"),
            format: OutputFormat::default(),
            state_dir: PathBuf::from("output").join("state"),
            incremental_save: false,
            show_progress: false,
        }
    }
}
