use commentscope_core::page::{PageDriver, PageResult};
use std::time::Duration;

/// Bounded polling for content that appears asynchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Check once and never sleep
    pub fn immediate() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Longest time a wait can take
    pub fn budget(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(20, Duration::from_millis(500))
    }
}

/// Poll until `selector` matches at least one element.
///
/// Returns `false` once the attempts are used up.
pub async fn wait_for_element(
    page: &dyn PageDriver,
    selector: &str,
    policy: WaitPolicy,
) -> PageResult<bool> {
    for attempt in 1..=policy.attempts {
        if page.count(selector).await? > 0 {
            tracing::trace!("'{}' present after {} attempt(s)", selector, attempt);
            return Ok(true);
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::debug!(
        "'{}' not present after {} attempt(s)",
        selector,
        policy.attempts
    );
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPage;

    #[tokio::test]
    async fn test_wait_finds_element_that_appears_late() {
        let page = ScriptedPage::new();
        page.set_counts("div.feed", [0, 0, 1]);

        let policy = WaitPolicy::new(5, Duration::ZERO);
        assert!(wait_for_element(&page, "div.feed", policy).await.unwrap());
        assert_eq!(page.count_calls("div.feed"), 3);
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_attempts() {
        let page = ScriptedPage::new();

        let policy = WaitPolicy::new(4, Duration::ZERO);
        assert!(!wait_for_element(&page, "div.feed", policy).await.unwrap());
        assert_eq!(page.count_calls("div.feed"), 4);
    }

    #[test]
    fn test_zero_attempts_still_checks_once() {
        let policy = WaitPolicy::new(0, Duration::from_millis(100));
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.budget(), Duration::ZERO);
        assert_eq!(WaitPolicy::default().budget(), Duration::from_millis(9500));
    }
}
