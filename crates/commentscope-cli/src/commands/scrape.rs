use anyhow::Result;
use chrono::Utc;
use commentscope_browser::{
    ChromeFinder, ChromeLauncher, ChromeSession, LaunchOptions, UserDataDir,
};
use commentscope_core::credential::SessionCredential;
use commentscope_core::output::OutputFormat;
use commentscope_core::profile_url::parse_target_profile;
use commentscope_core::selectors::SelectorRegistry;
use commentscope_core::{LookbackWindow, UnresolvedPolicy};
use commentscope_scraper::{Pacer, RunState, RunSummary, ScrapeConfig, Scraper};
use std::path::{Path, PathBuf};
use std::time::Duration;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(45);

/// Everything the scrape command needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct ScrapeArgs {
    pub profile_url: Option<String>,
    pub profile_file: Option<PathBuf>,
    pub days: u32,
    pub scrape_headlines: bool,
    pub cookie_file: PathBuf,
    pub selector_file: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub state_dir: PathBuf,
    pub incremental_save: bool,
    pub unresolved: UnresolvedPolicy,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_scrolls: u32,
    pub show_progress: bool,
}

impl ScrapeArgs {
    fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            window: LookbackWindow::days(self.days),
            unresolved: self.unresolved,
            scrape_headlines: self.scrape_headlines,
            max_idle_scrolls: self.max_scrolls,
            pacer: Pacer::new(
                Duration::from_millis(self.min_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            ),
            output_dir: self.output_dir.clone(),
            format: self.format,
            state_dir: self.state_dir.clone(),
            incremental_save: self.incremental_save,
            show_progress: self.show_progress,
            ..ScrapeConfig::default()
        }
    }
}

pub fn execute(args: ScrapeArgs) -> Result<()> {
    // Validate every input before a browser is started
    let targets = load_targets(args.profile_url.as_deref(), args.profile_file.as_deref())?;
    let selectors = SelectorRegistry::from_file(&args.selector_file).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load selector file {}: {}",
            args.selector_file.display(),
            e
        )
    })?;
    let credential = SessionCredential::from_file(&args.cookie_file).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load cookie file {}: {}",
            args.cookie_file.display(),
            e
        )
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let summaries = runtime.block_on(scrape_all(&args, &targets, &selectors, &credential))?;

    for summary in &summaries {
        print_summary(summary);
    }

    let failed = summaries.iter().filter(|s| !s.state.is_success()).count();
    let skipped = targets.len() - summaries.len();
    if failed > 0 || skipped > 0 {
        anyhow::bail!(
            "{} of {} profile(s) failed",
            failed + skipped,
            targets.len()
        );
    }
    Ok(())
}

async fn scrape_all(
    args: &ScrapeArgs,
    targets: &[String],
    selectors: &SelectorRegistry,
    credential: &SessionCredential,
) -> Result<Vec<RunSummary>> {
    println!("🔍 Locating Chrome...");
    let chrome = ChromeFinder::new(args.chrome_path.clone()).find()?;
    println!("✅ Found Chrome at: {}", chrome.path.display());

    let user_data = UserDataDir::for_run(args.user_data_dir.as_deref())?;

    let options = LaunchOptions {
        headless: args.headless,
        ..LaunchOptions::default()
    };
    let launcher = ChromeLauncher::new(chrome.path, user_data.path().to_path_buf(), options);

    println!("🚀 Launching Chrome...");
    let mut chrome_process = launcher.launch()?;
    let mut session = match ChromeSession::connect(launcher.debugging_port(), NAVIGATION_TIMEOUT).await {
        Ok(session) => session,
        Err(e) => {
            let _ = chrome_process.kill();
            return Err(e.into());
        }
    };
    session.attach_process(chrome_process);
    session.install_cookies(&credential.cookies).await?;

    let mut summaries = Vec::with_capacity(targets.len());
    {
        let mut scraper = Scraper::new(&session, selectors, args.scrape_config());
        scraper.authenticate().await?;
        println!("✅ Logged in");

        match session.cookies().await {
            Ok(cookies) => {
                if let Err(e) = credential.save_refreshed(&args.cookie_file, &cookies) {
                    tracing::warn!("Could not save refreshed cookies: {}", e);
                }
            }
            Err(e) => tracing::warn!("Could not read cookies back from the browser: {}", e),
        }

        // One cutoff for every profile in this invocation
        let run_start = Utc::now();
        for target in targets {
            let summary = scraper.run_profile(target, run_start).await;
            let session_lost = summary
                .error
                .as_ref()
                .is_some_and(|e| e.is_auth_failure());
            summaries.push(summary);
            if session_lost {
                tracing::error!("Session is no longer valid; skipping remaining profiles");
                break;
            }
        }
    }

    session.close().await?;
    Ok(summaries)
}

/// Target profiles from `--profile-url` or `--profile-file`, canonicalised
/// and deduplicated in order
pub fn load_targets(profile_url: Option<&str>, profile_file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(url) = profile_url {
        return Ok(vec![parse_target_profile(url)?]);
    }

    let Some(path) = profile_file else {
        anyhow::bail!("Either --profile-url or --profile-file is required");
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read profile file {}: {}", path.display(), e))?;

    let mut targets: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if !line.starts_with("http") {
            continue;
        }
        match parse_target_profile(line) {
            Ok(url) if !targets.contains(&url) => targets.push(url),
            Ok(_) => tracing::debug!("Ignoring duplicate profile {}", line),
            Err(e) => tracing::warn!("Ignoring line in {}: {}", path.display(), e),
        }
    }

    if targets.is_empty() {
        anyhow::bail!("No valid profile URLs in {}", path.display());
    }
    tracing::info!("Loaded {} profile(s) from {}", targets.len(), path.display());
    Ok(targets)
}

fn print_summary(summary: &RunSummary) {
    use console::style;

    println!("\n{}", style(format!("Profile: {}", summary.profile_url)).bold().cyan());

    let state = match summary.state {
        RunState::Done => style("completed".to_string()).green(),
        RunState::Degraded => style("completed with warnings".to_string()).yellow(),
        other => style(format!("failed ({})", other)).red(),
    };
    println!("  Status:      {}", state);

    let source = if summary.used_checkpoint {
        " (from checkpoint)"
    } else {
        ""
    };
    println!(
        "  Posts:       {} found{}, {} collected, {} failed, {} skipped",
        summary.posts_found,
        source,
        summary.posts_collected,
        summary.post_failures.len(),
        summary.posts_skipped
    );
    println!(
        "  Comments:    {} collected, {} with unresolved timestamps",
        summary.comments_collected, summary.unresolved
    );
    if summary.previous_rows > 0 {
        println!("  Resumed:     {} commenter(s) from earlier output", summary.previous_rows);
    }
    println!("  Commenters:  {}", style(summary.commenters).bold());

    if !summary.enrichment_failures.is_empty() {
        println!(
            "  Headlines:   {} unavailable",
            style(summary.enrichment_failures.len()).yellow()
        );
    }
    for failure in &summary.post_failures {
        println!("  {} {}: {}", style("!").yellow(), failure.post_url, failure.reason);
    }
    if let Some(path) = &summary.output_path {
        println!("  Output:      {}", path.display());
    }
    if let Some(error) = &summary.error {
        println!("  {} {}", style("Error:").red().bold(), error);
    }
}
