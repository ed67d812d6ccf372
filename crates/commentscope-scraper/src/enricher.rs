use crate::auth::ensure_session;
use crate::pacing::Pacer;
use crate::wait::{WaitPolicy, wait_for_element};
use crate::{Result, ScrapeError};
use commentscope_core::CommenterAggregate;
use commentscope_core::page::{ElementQuery, PageDriver};
use commentscope_core::selectors::{SelectorKey, SelectorRegistry};

/// A profile whose headline could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentFailure {
    pub profile_url: String,
    pub reason: String,
}

/// Fills in commenter headlines by visiting each profile
pub struct HeadlineEnricher<'a> {
    page: &'a dyn PageDriver,
    selectors: &'a SelectorRegistry,
    wait: WaitPolicy,
    pacer: Pacer,
}

impl<'a> HeadlineEnricher<'a> {
    pub fn new(
        page: &'a dyn PageDriver,
        selectors: &'a SelectorRegistry,
        wait: WaitPolicy,
        pacer: Pacer,
    ) -> Self {
        Self {
            page,
            selectors,
            wait,
            pacer,
        }
    }

    /// Read the headline shown on one profile
    pub async fn headline(&self, profile_url: &str) -> Result<String> {
        self.pacer.pause().await;
        self.page.goto(profile_url).await?;
        ensure_session(self.page, profile_url).await?;

        let selector = self.selectors.get(SelectorKey::ProfileHeadline);
        if !wait_for_element(self.page, selector, self.wait).await? {
            return Err(ScrapeError::HeadlineMissing {
                url: profile_url.to_string(),
            });
        }

        let query = ElementQuery::new(selector).text("headline", None);
        self.page
            .extract(&query)
            .await?
            .iter()
            .find_map(|el| el.get("headline").map(str::to_string))
            .ok_or_else(|| ScrapeError::HeadlineMissing {
                url: profile_url.to_string(),
            })
    }

    /// Set the headline of every aggregate in place.
    ///
    /// Aggregates that already carry a headline (restored from an earlier
    /// run's output) are not visited again. Per-profile failures leave the
    /// headline empty and are returned; only a lost session aborts. Never
    /// adds, drops or reorders aggregates.
    pub async fn enrich(
        &self,
        aggregates: &mut [CommenterAggregate],
        mut on_progress: impl FnMut(),
    ) -> Result<Vec<EnrichmentFailure>> {
        let mut failures = Vec::new();

        for aggregate in aggregates.iter_mut() {
            if !aggregate.headline.is_empty() {
                tracing::debug!("Headline for {} already known", aggregate.profile_url);
                on_progress();
                continue;
            }

            match self.headline(&aggregate.profile_url).await {
                Ok(headline) => {
                    tracing::debug!("Headline for {}: {}", aggregate.profile_url, headline);
                    aggregate.headline = headline;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Could not read headline for {}: {}",
                        aggregate.profile_url,
                        e
                    );
                    aggregate.headline.clear();
                    failures.push(EnrichmentFailure {
                        profile_url: aggregate.profile_url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            on_progress();
        }

        Ok(failures)
    }
}
