use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use commentscope_cli::commands::{self, scrape::ScrapeArgs};
use commentscope_cli::{FormatArg, UnresolvedArg};
use std::path::PathBuf;

/// Largest accepted `--days` value
const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Parser)]
#[command(name = "commentscope")]
#[command(author, version)]
#[command(
    about = "Collect the people who recently commented on a LinkedIn profile's posts",
    long_about = "commentscope walks a profile's recent activity feed in a headless Chrome session, \
                  loads every comment on each post inside the lookback window, and writes one row \
                  per unique commenter with the time of their earliest comment."
)]
struct Cli {
    /// Profile whose posts are scanned
    #[arg(
        short = 'u',
        long,
        value_name = "URL",
        conflicts_with = "profile_file",
        required_unless_present_any = ["profile_file", "completion"]
    )]
    profile_url: Option<String>,

    /// File with one profile URL per line
    #[arg(short = 'f', long, value_name = "FILE")]
    profile_file: Option<PathBuf>,

    /// Lookback window in days
    #[arg(
        short,
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(0..=MAX_LOOKBACK_DAYS)
    )]
    days: u32,

    /// Visit each commenter's profile to read their headline
    #[arg(long)]
    scrape_headlines: bool,

    /// Session cookies: a JSON cookie array or a bare li_at value
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "COMMENTSCOPE_COOKIE_FILE",
        default_value = "cookies.json"
    )]
    cookie_file: PathBuf,

    /// JSON file mapping element names to CSS or XPath selectors
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "COMMENTSCOPE_SELECTOR_FILE",
        default_value = "selectors.json"
    )]
    selector_file: PathBuf,

    /// Directory for result files
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Result file format
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    format: FormatArg,

    /// Directory for post-list checkpoints
    #[arg(long, value_name = "DIR", default_value = "output/state")]
    state_dir: PathBuf,

    /// Rewrite the output file after every collected post
    #[arg(long)]
    incremental_save: bool,

    /// Keep or drop comments whose timestamp cannot be decoded
    #[arg(long, value_enum, default_value_t = UnresolvedArg::Exclude)]
    unresolved: UnresolvedArg,

    /// Run Chrome without a window (default)
    #[arg(long, overrides_with = "no_headless")]
    headless: bool,

    /// Show the Chrome window
    #[arg(long, overrides_with = "headless")]
    no_headless: bool,

    /// Path to the Chrome binary
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Reuse a persistent Chrome profile directory instead of a temporary one
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Shortest pause between page interactions
    #[arg(long, value_name = "MS", default_value_t = 1500)]
    min_delay_ms: u64,

    /// Longest pause between page interactions
    #[arg(long, value_name = "MS", default_value_t = 4000)]
    max_delay_ms: u64,

    /// Scrolls without new posts before the feed is considered exhausted
    #[arg(long, value_name = "N", default_value_t = 3)]
    max_scrolls: u32,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completion: Option<Shell>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    if let Some(shell) = cli.completion {
        return commands::completion::execute(shell, &mut Cli::command());
    }

    let show_progress = !cli.verbose && console::Term::stderr().is_term();
    commands::scrape::execute(ScrapeArgs {
        profile_url: cli.profile_url,
        profile_file: cli.profile_file,
        days: cli.days,
        scrape_headlines: cli.scrape_headlines,
        cookie_file: cli.cookie_file,
        selector_file: cli.selector_file,
        output_dir: cli.output_dir,
        format: cli.format.into(),
        state_dir: cli.state_dir,
        incremental_save: cli.incremental_save,
        unresolved: cli.unresolved.into(),
        headless: cli.headless || !cli.no_headless,
        chrome_path: cli.chrome_path,
        user_data_dir: cli.user_data_dir,
        min_delay_ms: cli.min_delay_ms,
        max_delay_ms: cli.max_delay_ms,
        max_scrolls: cli.max_scrolls,
        show_progress,
    })
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "commentscope=debug,commentscope_core=debug,commentscope_browser=debug,commentscope_scraper=debug",
        )
    } else {
        EnvFilter::new("commentscope=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
