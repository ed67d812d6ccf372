//! Lazy, pull-based walk over a profile's activity feed.

use crate::auth::ensure_session;
use crate::pacing::Pacer;
use crate::wait::{WaitPolicy, wait_for_element};
use crate::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use commentscope_core::PostHandle;
use commentscope_core::page::{ElementQuery, ExtractedElement, PageDriver};
use commentscope_core::profile_url::{activity_url, normalize_permalink};
use commentscope_core::relative_time::parse_age;
use commentscope_core::selectors::{AttributeKey, SelectorKey, SelectorRegistry};
use commentscope_core::urn::{find_post_urn, resolve};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Loading,
    Exhausted,
}

/// Yields the posts of one profile in feed order, newest first.
///
/// More of the feed is loaded by scrolling only when the buffered posts run
/// out. The walk ends once `max_idle_scrolls` consecutive scrolls add nothing
/// or a post older than `cutoff` shows up.
pub struct FeedPaginator<'a> {
    page: &'a dyn PageDriver,
    selectors: &'a SelectorRegistry,
    profile_url: String,
    run_start: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    wait: WaitPolicy,
    pacer: Pacer,
    max_idle_scrolls: u32,

    phase: Phase,
    buffer: VecDeque<PostHandle>,
    seen: HashSet<String>,
    idle_scrolls: u32,
    skipped: usize,
}

impl<'a> FeedPaginator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        page: &'a dyn PageDriver,
        selectors: &'a SelectorRegistry,
        profile_url: &str,
        run_start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        wait: WaitPolicy,
        pacer: Pacer,
        max_idle_scrolls: u32,
    ) -> Self {
        Self {
            page,
            selectors,
            profile_url: profile_url.to_string(),
            run_start,
            cutoff,
            wait,
            pacer,
            max_idle_scrolls,
            phase: Phase::NotStarted,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            idle_scrolls: 0,
            skipped: 0,
        }
    }

    /// Posts dropped because no publish time could be determined
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Next post, or `None` once the feed is exhausted or out of the window
    pub async fn next_post(&mut self) -> Result<Option<PostHandle>> {
        loop {
            if let Some(post) = self.buffer.pop_front() {
                return Ok(Some(post));
            }

            match self.phase {
                Phase::Exhausted => return Ok(None),
                Phase::NotStarted => {
                    self.open().await?;
                    self.phase = Phase::Loading;
                    self.harvest().await?;
                }
                Phase::Loading => {
                    if self.idle_scrolls >= self.max_idle_scrolls {
                        tracing::debug!(
                            "No new posts after {} scrolls, feed exhausted",
                            self.idle_scrolls
                        );
                        self.phase = Phase::Exhausted;
                        continue;
                    }

                    self.page.scroll_to_bottom().await?;
                    self.pacer.pause().await;
                    let added = self.harvest().await?;
                    if added == 0 {
                        self.idle_scrolls += 1;
                    } else {
                        self.idle_scrolls = 0;
                    }
                }
            }
        }
    }

    /// Drain the paginator
    pub async fn collect_all(&mut self) -> Result<Vec<PostHandle>> {
        let mut posts = Vec::new();
        while let Some(post) = self.next_post().await? {
            posts.push(post);
        }
        Ok(posts)
    }

    async fn open(&mut self) -> Result<()> {
        let url = activity_url(&self.profile_url);
        tracing::info!("Opening activity feed {}", url);

        self.page
            .goto(&url)
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;
        ensure_session(self.page, &url).await?;

        let item = self.selectors.get(SelectorKey::PostListItem);
        if !wait_for_element(self.page, item, self.wait).await? {
            return Err(self.unavailable(format!(
                "no posts rendered within {:?}",
                self.wait.budget()
            )));
        }
        Ok(())
    }

    /// Read every post currently in the DOM and buffer the unseen ones.
    ///
    /// Returns how many previously unseen posts were found.
    async fn harvest(&mut self) -> Result<usize> {
        let link = self.selectors.get(SelectorKey::PostTimestampAndLink);
        let query = ElementQuery::new(self.selectors.get(SelectorKey::PostListItem))
            .attr("urn", None, self.selectors.attribute(AttributeKey::PostUrn))
            .attr("href", Some(link), "href")
            .text("age", Some(link));

        let items = self.page.extract(&query).await?;
        let mut added = 0;

        for item in &items {
            let Some(url) = item.get("href").and_then(normalize_permalink) else {
                continue;
            };
            if !self.seen.insert(url.clone()) {
                continue;
            }
            added += 1;

            let Some(post) = self.to_post(url, item) else {
                continue;
            };

            if post.published_at.is_some_and(|at| at < self.cutoff) {
                tracing::info!(
                    "Reached a post older than the lookback window ({}), stopping pagination",
                    post.url
                );
                self.phase = Phase::Exhausted;
                break;
            }

            tracing::debug!("Found post {}", post.url);
            self.buffer.push_back(post);
        }

        tracing::debug!(
            "Feed has {} post item(s), {} new",
            items.len(),
            added
        );
        Ok(added)
    }

    fn to_post(&mut self, url: String, item: &ExtractedElement) -> Option<PostHandle> {
        let urn = item
            .get("urn")
            .and_then(find_post_urn)
            .or_else(|| find_post_urn(&url))
            .map(str::to_string);

        let published_at = urn
            .as_deref()
            .and_then(|u| resolve(u).ok())
            .or_else(|| {
                item.get("age")
                    .and_then(parse_age)
                    .and_then(|age| self.run_start.checked_sub_signed(age))
            });

        if published_at.is_none() {
            tracing::warn!("Skipping post with no readable publish time: {}", url);
            self.skipped += 1;
            return None;
        }

        Some(PostHandle {
            url,
            urn,
            author_url: self.profile_url.clone(),
            published_at,
        })
    }

    fn unavailable(&self, reason: String) -> ScrapeError {
        ScrapeError::FeedUnavailable {
            profile: self.profile_url.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedPage, element, registry};
    use chrono::{Duration, TimeZone};

    const PROFILE: &str = "https://www.linkedin.com/in/jane-doe/";
    const FEED: &str = "https://www.linkedin.com/in/jane-doe/recent-activity/all/";

    fn run_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 10, 12, 0, 0).unwrap()
    }

    fn post(n: u32, age: &str) -> ExtractedElement {
        element(&[
            ("href", format!("/feed/update/urn:li:activity:{}/?trk=x", n).as_str()),
            ("age", age),
        ])
    }

    fn paginator<'a>(page: &'a ScriptedPage, selectors: &'a SelectorRegistry) -> FeedPaginator<'a> {
        let start = run_start();
        FeedPaginator::new(
            page,
            selectors,
            PROFILE,
            start,
            start - Duration::days(7),
            WaitPolicy::new(2, std::time::Duration::ZERO),
            Pacer::none(),
            2,
        )
    }

    #[tokio::test]
    async fn test_yields_posts_in_feed_order_across_scrolls() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.set_counts_on(FEED, "div.post", [1]);
        page.set_extractions_on(
            FEED,
            "div.post",
            vec![
                vec![post(1, "1h"), post(2, "2d")],
                vec![post(1, "1h"), post(2, "2d"), post(3, "3d • Edited")],
            ],
        );

        let posts = paginator(&page, &selectors).collect_all().await.unwrap();

        let urls: Vec<_> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.linkedin.com/feed/update/urn:li:activity:1/",
                "https://www.linkedin.com/feed/update/urn:li:activity:2/",
                "https://www.linkedin.com/feed/update/urn:li:activity:3/",
            ]
        );
        assert_eq!(posts[1].published_at, Some(run_start() - Duration::days(2)));
        assert_eq!(posts[0].author_url, PROFILE);
        // one productive scroll, then two idle ones
        assert_eq!(page.scrolls(), 3);
    }

    #[tokio::test]
    async fn test_is_lazy() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.set_counts_on(FEED, "div.post", [1]);
        page.set_extraction_on(FEED, "div.post", vec![post(1, "1h"), post(2, "2h")]);

        let mut paginator = paginator(&page, &selectors);
        assert!(paginator.next_post().await.unwrap().is_some());
        assert!(paginator.next_post().await.unwrap().is_some());
        assert_eq!(page.scrolls(), 0);
    }

    #[tokio::test]
    async fn test_stops_at_first_post_outside_window() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.set_counts_on(FEED, "div.post", [1]);
        page.set_extraction_on(
            FEED,
            "div.post",
            vec![post(1, "1d"), post(2, "2w"), post(3, "1d")],
        );

        let posts = paginator(&page, &selectors).collect_all().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(page.scrolls(), 0);
    }

    #[tokio::test]
    async fn test_urn_takes_precedence_over_age_label() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.set_counts_on(FEED, "div.post", [1]);
        // 7315376118735060992 was created 2025-04-08T14:12:59.822Z
        page.set_extraction_on(
            FEED,
            "div.post",
            vec![element(&[
                ("urn", "urn:li:activity:7315376118735060992"),
                ("href", "https://www.linkedin.com/posts/jane-doe_hello-activity-7315376118735060992-abcd"),
                ("age", "5mo"),
            ])],
        );

        let posts = paginator(&page, &selectors).collect_all().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].urn.as_deref(),
            Some("urn:li:activity:7315376118735060992")
        );
        assert_eq!(
            posts[0].published_at,
            Some(Utc.with_ymd_and_hms(2025, 4, 8, 14, 12, 59).unwrap() + Duration::milliseconds(822))
        );
    }

    #[tokio::test]
    async fn test_skips_post_without_publish_time() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.set_counts_on(FEED, "div.post", [1]);
        page.set_extraction_on(
            FEED,
            "div.post",
            vec![post(1, "Promoted"), post(2, "3h")],
        );

        let mut paginator = paginator(&page, &selectors);
        let posts = paginator.collect_all().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].url.contains("activity:2"));
        assert_eq!(paginator.skipped(), 1);
    }

    #[tokio::test]
    async fn test_absurd_age_label_is_skipped() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.set_counts_on(FEED, "div.post", [1]);
        page.set_extraction_on(
            FEED,
            "div.post",
            vec![post(1, "9999999999999d"), post(2, "106751991167d"), post(3, "1d")],
        );

        let mut paginator = paginator(&page, &selectors);
        let posts = paginator.collect_all().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].url.contains("activity:3"));
        assert_eq!(paginator.skipped(), 2);
    }

    #[tokio::test]
    async fn test_empty_feed_is_unavailable() {
        let page = ScriptedPage::new();
        let selectors = registry();

        let err = paginator(&page, &selectors).next_post().await.unwrap_err();
        assert!(matches!(err, ScrapeError::FeedUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_login_redirect_is_session_expiry() {
        let page = ScriptedPage::new();
        let selectors = registry();
        page.redirect(FEED, "https://www.linkedin.com/authwall?trk=x");

        let err = paginator(&page, &selectors).next_post().await.unwrap_err();
        assert!(matches!(err, ScrapeError::SessionExpired { .. }));
    }
}
