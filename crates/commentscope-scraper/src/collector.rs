use crate::auth::ensure_session;
use crate::pacing::Pacer;
use crate::wait::{WaitPolicy, wait_for_element};
use crate::{Result, ScrapeError};
use commentscope_core::page::{ElementQuery, PageDriver};
use commentscope_core::profile_url::clean_profile_url;
use commentscope_core::selectors::{AttributeKey, SelectorKey, SelectorRegistry};
use commentscope_core::{PostHandle, RawComment};

/// Loads every comment on a post and reads one record per comment item
pub struct CommentCollector<'a> {
    page: &'a dyn PageDriver,
    selectors: &'a SelectorRegistry,
    wait: WaitPolicy,
    pacer: Pacer,
    max_expansions: u32,
}

impl<'a> CommentCollector<'a> {
    pub fn new(
        page: &'a dyn PageDriver,
        selectors: &'a SelectorRegistry,
        wait: WaitPolicy,
        pacer: Pacer,
        max_expansions: u32,
    ) -> Self {
        Self {
            page,
            selectors,
            wait,
            pacer,
            max_expansions,
        }
    }

    /// Collect the raw comment records of one post.
    ///
    /// A post without comments yields an empty vector.
    pub async fn collect(&self, post: &PostHandle) -> Result<Vec<RawComment>> {
        tracing::debug!("Collecting comments from {}", post.url);

        self.page.goto(&post.url).await?;
        ensure_session(self.page, &post.url).await?;

        let section = self.selectors.get(SelectorKey::CommentSection);
        if !wait_for_element(self.page, section, self.wait).await? {
            return Err(ScrapeError::CommentSectionMissing {
                url: post.url.clone(),
            });
        }

        self.expand(SelectorKey::LoadMoreCommentsButton).await?;
        self.expand(SelectorKey::LoadMoreRepliesButton).await?;

        let query = ElementQuery::new(self.selectors.get(SelectorKey::CommentItem))
            .attr("id", None, self.selectors.attribute(AttributeKey::CommentUrn))
            .attr("href", Some(self.selectors.get(SelectorKey::CommenterLink)), "href")
            .text("name", Some(self.selectors.get(SelectorKey::CommenterName)))
            .text("age", Some(self.selectors.get(SelectorKey::CommentTimestamp)));
        let items = self.page.extract(&query).await?;

        let mut comments = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for item in &items {
            let Some(profile_url) = item.get("href").and_then(clean_profile_url) else {
                // company pages, deleted members
                skipped += 1;
                continue;
            };

            comments.push(RawComment {
                display_name: item.get("name").unwrap_or_default().to_string(),
                profile_url,
                identifier: item.get("id").unwrap_or_default().to_string(),
                relative_time: item.get("age").unwrap_or_default().to_string(),
                post_url: post.url.clone(),
            });
        }

        tracing::info!(
            "Collected {} comment(s) from {}{}",
            comments.len(),
            post.url,
            if skipped > 0 {
                format!(" ({} non-member skipped)", skipped)
            } else {
                String::new()
            }
        );
        Ok(comments)
    }

    /// Click `control` until it disappears or the expansion cap is reached
    async fn expand(&self, control: SelectorKey) -> Result<u32> {
        let selector = self.selectors.get(control);
        let mut clicks = 0;

        while clicks < self.max_expansions {
            if !self.page.click_first_visible(selector).await? {
                break;
            }
            clicks += 1;
            self.pacer.pause().await;
        }

        if clicks == self.max_expansions && clicks > 0 {
            tracing::warn!(
                "Stopped expanding '{}' after {} clicks; some comments may be missing",
                control,
                clicks
            );
        } else if clicks > 0 {
            tracing::debug!("Expanded '{}' {} time(s)", control, clicks);
        }
        Ok(clicks)
    }
}
