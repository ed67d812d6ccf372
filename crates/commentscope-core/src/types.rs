use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One post discovered on a profile's activity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHandle {
    /// Permalink with query string and fragment removed; unique per post
    pub url: String,
    /// Platform URN of the post when the feed exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    /// Profile whose activity feed listed this post
    pub author_url: String,
    /// Approximate publish time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// A comment as scraped from the DOM, before its identifier is decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    pub display_name: String,
    /// Canonical `https://www.linkedin.com/in/<slug>/` form
    pub profile_url: String,
    pub identifier: String,
    /// Label shown next to the comment ("3d", "1w"); informational only
    pub relative_time: String,
    pub post_url: String,
}

/// A raw comment plus the instant decoded from its identifier.
///
/// `timestamp` is `None` only for records whose identifier could not be
/// decoded and that were kept under [`UnresolvedPolicy::Include`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComment {
    pub raw: RawComment,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One unique commenter across the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommenterAggregate {
    pub profile_url: String,
    pub display_name: String,
    /// Earliest comment time that falls inside the lookback window
    pub earliest_comment_at: Option<DateTime<Utc>>,
    pub comment_count: usize,
    pub post_count: usize,
    /// Empty when enrichment is disabled or the profile could not be read
    pub headline: String,
}

/// What to do with comments whose identifier cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Keep the record without a timestamp and log a warning
    Include,
    /// Drop the record and log a warning
    #[default]
    Exclude,
}

/// Number of days back from run start that a comment must fall within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    days: u32,
}

impl LookbackWindow {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    pub fn as_days(&self) -> u32 {
        self.days
    }

    /// Length of the window, saturating at the largest representable span
    pub fn duration(&self) -> Duration {
        Duration::try_days(i64::from(self.days)).unwrap_or(Duration::MAX)
    }

    /// Oldest instant still inside the window (inclusive); clamps to the
    /// earliest representable instant for windows reaching past it
    pub fn cutoff(&self, run_start: DateTime<Utc>) -> DateTime<Utc> {
        run_start
            .checked_sub_signed(self.duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self::days(7)
    }
}
