//! Deduplication of commenters and lookback-window filtering.

use crate::output::OutputRow;
use crate::types::{CommenterAggregate, ResolvedComment, UnresolvedPolicy};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Per-commenter state while folding records
#[derive(Debug, Default)]
struct Accumulator {
    display_name: String,
    earliest_in_window: Option<DateTime<Utc>>,
    has_unresolved: bool,
    comment_count: usize,
    posts: HashSet<String>,
}

impl Accumulator {
    fn add(&mut self, record: &ResolvedComment, cutoff: DateTime<Utc>) {
        if self.display_name.is_empty() {
            self.display_name = record.raw.display_name.trim().to_string();
        }
        self.comment_count += 1;
        self.posts.insert(record.raw.post_url.clone());

        match record.timestamp {
            // Boundary is inclusive
            Some(ts) if ts >= cutoff => {
                self.earliest_in_window = Some(match self.earliest_in_window {
                    Some(current) => current.min(ts),
                    None => ts,
                });
            }
            Some(_) => {}
            None => self.has_unresolved = true,
        }
    }

    fn survives(&self) -> bool {
        self.earliest_in_window.is_some() || self.has_unresolved
    }
}

/// Collapse resolved comments into one aggregate per profile URL.
///
/// A commenter survives when any of their comments is at or after `cutoff`,
/// or when one of them carries no timestamp (only present when the caller
/// chose to include unresolved records). The reported timestamp is the
/// earliest comment inside the window. Records with identical timestamps are
/// all counted. Results are ordered by that timestamp, then profile URL, with
/// timestamp-less aggregates last.
pub fn aggregate(records: &[ResolvedComment], cutoff: DateTime<Utc>) -> Vec<CommenterAggregate> {
    let mut groups: HashMap<&str, Accumulator> = HashMap::new();

    for record in records {
        groups
            .entry(record.raw.profile_url.as_str())
            .or_default()
            .add(record, cutoff);
    }

    let total = groups.len();
    let mut aggregates: Vec<CommenterAggregate> = groups
        .into_iter()
        .filter(|(_, acc)| acc.survives())
        .map(|(profile_url, acc)| CommenterAggregate {
            profile_url: profile_url.to_string(),
            display_name: acc.display_name,
            earliest_comment_at: acc.earliest_in_window,
            comment_count: acc.comment_count,
            post_count: acc.posts.len(),
            headline: String::new(),
        })
        .collect();

    sort_aggregates(&mut aggregates);

    tracing::debug!(
        "Aggregated {} records into {} commenters ({} outside the window)",
        records.len(),
        aggregates.len(),
        total - aggregates.len()
    );

    aggregates
}

/// Fold rows from an earlier run's output file into this run's aggregates.
///
/// A commenter found again keeps the earlier of the two in-window
/// timestamps, and an empty headline is filled from the saved row. Saved
/// rows not seen this run are kept while their timestamp is still inside
/// the window; rows without a timestamp are kept only under
/// [`UnresolvedPolicy::Include`]. Comment and post counts cover this run
/// only. The result is re-sorted like [`aggregate`].
pub fn carry_over(
    aggregates: Vec<CommenterAggregate>,
    previous: &[OutputRow],
    cutoff: DateTime<Utc>,
    policy: UnresolvedPolicy,
) -> Vec<CommenterAggregate> {
    let mut by_url: HashMap<String, CommenterAggregate> = aggregates
        .into_iter()
        .map(|agg| (agg.profile_url.clone(), agg))
        .collect();
    let mut dropped = 0;

    for row in previous {
        let saved_at = row.parsed_earliest();
        let in_window = saved_at.filter(|ts| *ts >= cutoff);

        if let Some(current) = by_url.get_mut(&row.profile_url) {
            current.earliest_comment_at = match (current.earliest_comment_at, in_window) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            if current.display_name.is_empty() {
                current.display_name = row.display_name.clone();
            }
            if current.headline.is_empty() {
                current.headline = row.headline.clone();
            }
            continue;
        }

        let keep = match saved_at {
            Some(_) => in_window.is_some(),
            None => policy == UnresolvedPolicy::Include,
        };
        if !keep {
            dropped += 1;
            continue;
        }
        by_url.insert(
            row.profile_url.clone(),
            CommenterAggregate {
                profile_url: row.profile_url.clone(),
                display_name: row.display_name.clone(),
                earliest_comment_at: in_window,
                comment_count: 0,
                post_count: 0,
                headline: row.headline.clone(),
            },
        );
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} saved commenter(s) now outside the window", dropped);
    }

    let mut merged: Vec<CommenterAggregate> = by_url.into_values().collect();
    sort_aggregates(&mut merged);
    merged
}

/// Earliest timestamp first, then profile URL; timestamp-less entries last
fn sort_aggregates(aggregates: &mut [CommenterAggregate]) {
    aggregates.sort_by(|a, b| match (a.earliest_comment_at, b.earliest_comment_at) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.profile_url.cmp(&b.profile_url)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.profile_url.cmp(&b.profile_url),
    });
}
