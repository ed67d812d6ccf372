//! Decoding creation instants from LinkedIn identifiers.
//!
//! Activity, share, ugcPost and comment ids are 64-bit values whose upper
//! 41 bits hold the creation time in Unix milliseconds; the remaining 22 bits
//! are sequence and shard data. Decoding depends on the identifier alone.

use crate::types::{RawComment, ResolvedComment, UnresolvedPolicy};
use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Bits below the millisecond timestamp
const TIMESTAMP_SHIFT: u32 = 22;

/// 2006-01-01T00:00:00Z; nothing on the platform predates this
const EARLIEST_PLAUSIBLE_MS: i64 = 1_136_073_600_000;

lazy_static! {
    static ref BARE_ID: Regex = Regex::new(r"^\d+$").unwrap();
    static ref SIMPLE_URN: Regex =
        Regex::new(r"^urn:li:(?:activity|ugcPost|share|comment):(\d+)$").unwrap();
    // urn:li:comment:(activity:7316321711396700160,7316400000000000000)
    static ref COMMENT_URN: Regex =
        Regex::new(r"^urn:li:comment:\((?:urn:li:)?[A-Za-z]+:\d+,(\d+)\)$").unwrap();
    // urn:li:fsd_comment:(7316400000000000000,urn:li:activity:7316321711396700160)
    static ref FSD_COMMENT_URN: Regex =
        Regex::new(r"^urn:li:fsd_comment:\((\d+),urn:li:[A-Za-z]+:\d+\)$").unwrap();
    static ref POST_URN_IN_TEXT: Regex =
        Regex::new(r"urn:li:(?:activity|ugcPost|share):\d+").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unrecognized identifier format: {0:?}")]
    UnrecognizedFormat(String),

    #[error("identifier {0} does not fit in 64 bits")]
    Overflow(String),

    #[error("identifier {id} decodes to an implausible instant ({millis} ms)")]
    OutOfRange { id: u64, millis: i64 },
}

/// Decode the creation instant embedded in a numeric id
pub fn decode_id(id: u64) -> Result<DateTime<Utc>, ResolveError> {
    let millis = (id >> TIMESTAMP_SHIFT) as i64;
    if millis < EARLIEST_PLAUSIBLE_MS {
        return Err(ResolveError::OutOfRange { id, millis });
    }
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(ResolveError::OutOfRange { id, millis })
}

/// Decode the creation instant of a comment or post identifier.
///
/// Accepts a bare decimal id, `urn:li:<kind>:<id>`, or the compound comment
/// forms, in which case the comment's own id is used.
pub fn resolve(identifier: &str) -> Result<DateTime<Utc>, ResolveError> {
    let identifier = identifier.trim();
    let digits = if BARE_ID.is_match(identifier) {
        identifier
    } else if let Some(caps) = SIMPLE_URN
        .captures(identifier)
        .or_else(|| COMMENT_URN.captures(identifier))
        .or_else(|| FSD_COMMENT_URN.captures(identifier))
    {
        caps.get(1).map(|m| m.as_str()).unwrap_or_default()
    } else {
        return Err(ResolveError::UnrecognizedFormat(identifier.to_string()));
    };

    let id: u64 = digits
        .parse()
        .map_err(|_| ResolveError::Overflow(digits.to_string()))?;
    decode_id(id)
}

/// First post URN embedded in a permalink or attribute value
pub fn find_post_urn(text: &str) -> Option<&str> {
    POST_URN_IN_TEXT.find(text).map(|m| m.as_str())
}

/// A comment dropped or kept without a timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRecord {
    pub identifier: String,
    pub profile_url: String,
    pub post_url: String,
    pub error: ResolveError,
}

/// Output of the resolution stage
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub records: Vec<ResolvedComment>,
    pub unresolved: Vec<UnresolvedRecord>,
}

/// Decode every record's identifier, applying `policy` to failures.
///
/// A failure only affects its own record; everything else from the same post
/// passes through untouched.
pub fn resolve_records(raw: Vec<RawComment>, policy: UnresolvedPolicy) -> ResolvedBatch {
    let mut batch = ResolvedBatch::default();

    for comment in raw {
        match resolve(&comment.identifier) {
            Ok(timestamp) => batch.records.push(ResolvedComment {
                raw: comment,
                timestamp: Some(timestamp),
            }),
            Err(error) => {
                tracing::warn!(
                    identifier = %comment.identifier,
                    profile = %comment.profile_url,
                    post = %comment.post_url,
                    ?policy,
                    "Could not resolve comment timestamp: {}",
                    error
                );
                batch.unresolved.push(UnresolvedRecord {
                    identifier: comment.identifier.clone(),
                    profile_url: comment.profile_url.clone(),
                    post_url: comment.post_url.clone(),
                    error,
                });
                if policy == UnresolvedPolicy::Include {
                    batch.records.push(ResolvedComment {
                        raw: comment,
                        timestamp: None,
                    });
                }
            }
        }
    }

    batch
}
