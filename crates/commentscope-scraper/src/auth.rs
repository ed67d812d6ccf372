use crate::wait::{WaitPolicy, wait_for_element};
use crate::{Result, ScrapeError};
use commentscope_core::page::PageDriver;
use commentscope_core::selectors::{SelectorKey, SelectorRegistry};

pub const FEED_URL: &str = "https://www.linkedin.com/feed/";

/// Path fragments of pages LinkedIn shows instead of content when the
/// session is not accepted
const LOGIN_WALL_MARKERS: [&str; 5] = ["/login", "/authwall", "/checkpoint", "/uas/", "/signup"];

/// Whether `url` is a login, authwall or security checkpoint page
pub fn is_login_wall(url: &str) -> bool {
    LOGIN_WALL_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Fail with `SessionExpired` if the page was bounced to a login wall
pub(crate) async fn ensure_session(page: &dyn PageDriver, requested: &str) -> Result<()> {
    let current = page.current_url().await?;
    if is_login_wall(&current) {
        tracing::error!("Redirected to {} while loading {}", current, requested);
        return Err(ScrapeError::SessionExpired {
            url: requested.to_string(),
        });
    }
    Ok(())
}

/// Confirm the installed session is logged in by loading the home feed.
pub async fn verify_login(
    page: &dyn PageDriver,
    selectors: &SelectorRegistry,
    wait: WaitPolicy,
) -> Result<()> {
    tracing::info!("Verifying login session...");

    page.goto(FEED_URL)
        .await
        .map_err(|e| ScrapeError::SessionRejected(format!("could not load the feed: {}", e)))?;

    let current = page.current_url().await?;
    if is_login_wall(&current) {
        return Err(ScrapeError::SessionRejected(format!(
            "redirected to {}",
            current
        )));
    }

    let found = wait_for_element(page, selectors.get(SelectorKey::FeedPage), wait).await?;
    if !found {
        return Err(ScrapeError::SessionRejected(format!(
            "feed did not render within {:?}",
            wait.budget()
        )));
    }

    tracing::info!("Login verified");
    Ok(())
}
