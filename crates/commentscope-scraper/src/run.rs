//! One pass over a target profile: paginate, collect, resolve, filter,
//! enrich and write.

use crate::auth::verify_login;
use crate::collector::CommentCollector;
use crate::config::ScrapeConfig;
use crate::enricher::{EnrichmentFailure, HeadlineEnricher};
use crate::paginator::FeedPaginator;
use crate::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use commentscope_core::checkpoint::PostCheckpoint;
use commentscope_core::filter::{aggregate, carry_over};
use commentscope_core::output::{OutputRow, ResultReader, ResultWriter};
use commentscope_core::page::PageDriver;
use commentscope_core::profile_url::profile_slug;
use commentscope_core::selectors::SelectorRegistry;
use commentscope_core::urn::resolve_records;
use commentscope_core::{CommenterAggregate, PostHandle, ResolvedComment};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Authenticating,
    Paginating,
    Collecting,
    Filtering,
    Enriching,
    Writing,
    /// Finished, but some posts, records or profiles were skipped
    Degraded,
    Done,
    Fatal,
}

impl RunState {
    pub fn is_success(&self) -> bool {
        matches!(self, RunState::Done | RunState::Degraded)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Authenticating => "authenticating",
            RunState::Paginating => "paginating",
            RunState::Collecting => "collecting",
            RunState::Filtering => "filtering",
            RunState::Enriching => "enriching",
            RunState::Writing => "writing",
            RunState::Degraded => "degraded",
            RunState::Done => "done",
            RunState::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A post whose comments could not be collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFailure {
    pub post_url: String,
    pub reason: String,
}

/// What happened during one profile run
#[derive(Debug)]
pub struct RunSummary {
    pub profile_url: String,
    pub state: RunState,
    pub used_checkpoint: bool,
    pub posts_found: usize,
    pub posts_skipped: usize,
    pub posts_collected: usize,
    pub post_failures: Vec<PostFailure>,
    pub comments_collected: usize,
    pub unresolved: usize,
    /// Rows read back from an earlier run's output file
    pub previous_rows: usize,
    pub commenters: usize,
    pub enrichment_failures: Vec<EnrichmentFailure>,
    pub output_path: Option<PathBuf>,
    pub error: Option<ScrapeError>,
    degraded: bool,
}

impl RunSummary {
    pub fn new(profile_url: &str) -> Self {
        Self {
            profile_url: profile_url.to_string(),
            state: RunState::Init,
            used_checkpoint: false,
            posts_found: 0,
            posts_skipped: 0,
            posts_collected: 0,
            post_failures: Vec::new(),
            comments_collected: 0,
            unresolved: 0,
            previous_rows: 0,
            commenters: 0,
            enrichment_failures: Vec::new(),
            output_path: None,
            error: None,
            degraded: false,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn transition(&mut self, to: RunState) {
        tracing::debug!("Run state: {} -> {}", self.state, to);
        self.state = to;
    }

    fn degrade(&mut self, reason: &str) {
        if !self.degraded {
            tracing::warn!("Run degraded while {}: {}", self.state, reason);
        }
        self.degraded = true;
    }

    fn fail(mut self, error: ScrapeError) -> Self {
        tracing::error!("Run failed while {}: {}", self.state, error);
        self.transition(RunState::Fatal);
        self.error = Some(error);
        self
    }

    fn finish(mut self) -> Self {
        let end = if self.degraded {
            RunState::Degraded
        } else {
            RunState::Done
        };
        self.transition(end);
        self
    }
}

/// Where and against what the output file is (re)written
struct OutputTarget<'p> {
    path: &'p Path,
    previous: &'p [OutputRow],
    cutoff: DateTime<Utc>,
}

/// Drives the pipeline over a single shared page
pub struct Scraper<'a> {
    page: &'a dyn PageDriver,
    selectors: &'a SelectorRegistry,
    config: ScrapeConfig,
    checkpoint: PostCheckpoint,
    authenticated: bool,
}

impl<'a> Scraper<'a> {
    pub fn new(page: &'a dyn PageDriver, selectors: &'a SelectorRegistry, config: ScrapeConfig) -> Self {
        let checkpoint = PostCheckpoint::new(config.state_dir.clone());
        Self {
            page,
            selectors,
            config,
            checkpoint,
            authenticated: false,
        }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Verify the session once; later calls are no-ops
    pub async fn authenticate(&mut self) -> Result<()> {
        if self.authenticated {
            tracing::debug!("Session already verified");
            return Ok(());
        }
        verify_login(self.page, self.selectors, self.config.wait).await?;
        self.authenticated = true;
        Ok(())
    }

    /// Run the full pipeline for one target profile.
    ///
    /// Commenters already in the profile's output file are merged into the
    /// result, keeping their headlines. Results gathered before a fatal error
    /// are still written, provided any post was collected.
    pub async fn run_profile(&mut self, profile_url: &str, run_start: DateTime<Utc>) -> RunSummary {
        let mut summary = RunSummary::new(profile_url);
        let cutoff = self.config.window.cutoff(run_start);
        let slug = profile_slug(profile_url);
        tracing::info!(
            "Scraping {} (comments since {})",
            profile_url,
            cutoff.to_rfc3339()
        );

        summary.transition(RunState::Authenticating);
        if let Err(e) = self.authenticate().await {
            return summary.fail(e);
        }

        summary.transition(RunState::Paginating);
        let posts = match self.checkpoint.load(&slug) {
            Some(posts) => {
                tracing::info!(
                    "Resuming with {} post(s) from {}",
                    posts.len(),
                    self.checkpoint.path_for(&slug).display()
                );
                summary.used_checkpoint = true;
                posts
            }
            None => match self.paginate(profile_url, run_start, &mut summary).await {
                Ok(posts) => {
                    if let Err(e) = self.checkpoint.save(&slug, &posts) {
                        tracing::warn!("Could not save post checkpoint: {}", e);
                    }
                    posts
                }
                Err(e) => return summary.fail(e),
            },
        };
        summary.posts_found = posts.len();
        tracing::info!("Found {} post(s) in the lookback window", posts.len());

        let output_path = self.config.format.path_for(&self.config.output_dir, &slug);
        let previous = self.load_previous(&output_path);
        summary.previous_rows = previous.len();
        let target = OutputTarget {
            path: &output_path,
            previous: &previous,
            cutoff,
        };

        summary.transition(RunState::Collecting);
        let (records, mut fatal) = self.collect(&posts, &target, &mut summary).await;

        summary.transition(RunState::Filtering);
        if summary.unresolved > 0 {
            summary.degrade(&format!(
                "{} comment timestamp(s) could not be resolved",
                summary.unresolved
            ));
        }
        let mut aggregates = self.merge_results(&records, &target);
        summary.commenters = aggregates.len();
        tracing::info!(
            "{} unique commenter(s) in the last {} day(s)",
            aggregates.len(),
            self.config.window.as_days()
        );

        if fatal.is_none() && self.config.scrape_headlines && !aggregates.is_empty() {
            summary.transition(RunState::Enriching);
            if let Err(e) = self.enrich(&mut aggregates, &mut summary).await {
                fatal = Some(e);
            }
        }

        if fatal.is_some() && summary.posts_collected == 0 {
            tracing::warn!("Nothing collected before the failure, no output written");
        } else {
            summary.transition(RunState::Writing);
            match self.write(&aggregates, target.path) {
                Ok(path) => summary.output_path = Some(path),
                Err(e) => return summary.fail(e),
            }
            if fatal.is_none() {
                if let Err(e) = self.checkpoint.clear(&slug) {
                    tracing::warn!("Could not remove post checkpoint: {}", e);
                }
            }
        }

        match fatal {
            Some(e) => summary.fail(e),
            None => summary.finish(),
        }
    }

    async fn paginate(
        &self,
        profile_url: &str,
        run_start: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<Vec<PostHandle>> {
        let mut paginator = FeedPaginator::new(
            self.page,
            self.selectors,
            profile_url,
            run_start,
            self.config.window.cutoff(run_start),
            self.config.wait,
            self.config.pacer,
            self.config.max_idle_scrolls,
        );
        let posts = paginator.collect_all().await?;

        summary.posts_skipped = paginator.skipped();
        if summary.posts_skipped > 0 {
            summary.degrade(&format!(
                "{} post(s) skipped without a publish time",
                summary.posts_skipped
            ));
        }
        Ok(posts)
    }

    /// Collect and resolve every post, isolating per-post failures. A fatal
    /// error stops collection and is handed back alongside what was gathered
    /// so far. With incremental saving the output file is rewritten after
    /// every collected post.
    async fn collect(
        &self,
        posts: &[PostHandle],
        target: &OutputTarget<'_>,
        summary: &mut RunSummary,
    ) -> (Vec<ResolvedComment>, Option<ScrapeError>) {
        let collector = CommentCollector::new(
            self.page,
            self.selectors,
            self.config.wait,
            self.config.pacer,
            self.config.max_expansions,
        );
        let progress = self.progress_bar(posts.len() as u64, "posts");
        let mut records = Vec::new();
        let mut fatal = None;

        for post in posts {
            progress.set_message(post.url.clone());
            match collector.collect(post).await {
                Ok(comments) => {
                    summary.posts_collected += 1;
                    summary.comments_collected += comments.len();
                    let batch = resolve_records(comments, self.config.unresolved);
                    summary.unresolved += batch.unresolved.len();
                    records.extend(batch.records);

                    if self.config.incremental_save {
                        let snapshot = self.merge_results(&records, target);
                        match self.write(&snapshot, target.path) {
                            Ok(path) => summary.output_path = Some(path),
                            Err(e) => tracing::warn!("Incremental save failed: {}", e),
                        }
                    }
                }
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Skipping post {}: {}", post.url, e);
                    summary.degrade(&e.to_string());
                    summary.post_failures.push(PostFailure {
                        post_url: post.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            progress.inc(1);
            self.config.pacer.pause().await;
        }

        progress.finish_and_clear();
        (records, fatal)
    }

    fn merge_results(
        &self,
        records: &[ResolvedComment],
        target: &OutputTarget<'_>,
    ) -> Vec<CommenterAggregate> {
        carry_over(
            aggregate(records, target.cutoff),
            target.previous,
            target.cutoff,
            self.config.unresolved,
        )
    }

    /// Rows of an earlier run's output; an unreadable file is started over
    fn load_previous(&self, path: &Path) -> Vec<OutputRow> {
        match ResultReader::from_file(path, self.config.format) {
            Ok(rows) => {
                if !rows.is_empty() {
                    tracing::info!(
                        "Loaded {} existing commenter(s) from {}",
                        rows.len(),
                        path.display()
                    );
                }
                rows
            }
            Err(e) => {
                tracing::warn!(
                    "Output file {} is unreadable, starting fresh: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    async fn enrich(
        &self,
        aggregates: &mut [CommenterAggregate],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let enricher = HeadlineEnricher::new(
            self.page,
            self.selectors,
            self.config.wait,
            self.config.pacer,
        );
        let progress = self.progress_bar(aggregates.len() as u64, "profiles");
        let result = enricher.enrich(aggregates, || progress.inc(1)).await;
        progress.finish_and_clear();

        let failures = result?;
        if !failures.is_empty() {
            summary.degrade(&format!("{} headline(s) unavailable", failures.len()));
        }
        summary.enrichment_failures = failures;
        Ok(())
    }

    fn write(&self, aggregates: &[CommenterAggregate], path: &Path) -> Result<PathBuf> {
        ResultWriter::to_file(aggregates, path, self.config.format).map_err(ScrapeError::Core)?;
        tracing::debug!("Wrote {} row(s) to {}", aggregates.len(), path.display());
        Ok(path.to_path_buf())
    }

    fn progress_bar(&self, len: u64, unit: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template(&format!(
            "{{spinner}} [{{bar:30}}] {{pos}}/{{len}} {} {{wide_msg}}",
            unit
        )) {
            bar.set_style(style);
        }
        bar
    }
}
