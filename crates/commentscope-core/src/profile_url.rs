//! Canonical forms of member profile URLs and post permalinks.

use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

pub const LINKEDIN_ORIGIN: &str = "https://www.linkedin.com";

lazy_static! {
    static ref PROFILE_SLUG: Regex = Regex::new(r"/in/([A-Za-z0-9_%-]+)").unwrap();
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_-]+").unwrap();
}

/// Canonical `https://www.linkedin.com/in/<slug>/` form of a member link.
///
/// Accepts absolute or site-relative hrefs. Company pages, hashtags and any
/// other non-member links yield `None`.
pub fn clean_profile_url(href: &str) -> Option<String> {
    let slug = PROFILE_SLUG.captures(href)?.get(1)?.as_str();
    Some(format!("{}/in/{}/", LINKEDIN_ORIGIN, slug))
}

/// Validate a user-supplied target profile and return its canonical form
pub fn parse_target_profile(input: &str) -> Result<String> {
    let input = input.trim();
    let url = Url::parse(input).map_err(|e| Error::InvalidProfileUrl(format!("{}: {}", input, e)))?;

    let is_linkedin = url
        .host_str()
        .is_some_and(|h| h == "linkedin.com" || h.ends_with(".linkedin.com"));
    if !is_linkedin {
        return Err(Error::InvalidProfileUrl(format!(
            "{} is not a linkedin.com URL",
            input
        )));
    }

    clean_profile_url(url.path())
        .ok_or_else(|| Error::InvalidProfileUrl(format!("{} has no /in/<name> path", input)))
}

/// Short name used for output and checkpoint file names
pub fn profile_slug(profile_url: &str) -> String {
    if let Some(slug) = PROFILE_SLUG
        .captures(profile_url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    {
        return UNSAFE_FILENAME_CHARS.replace_all(slug, "_").into_owned();
    }

    let stripped = profile_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .replace("www.", "")
        .replace("linkedin.com", "");
    let slug = UNSAFE_FILENAME_CHARS.replace_all(&stripped, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "profile".to_string()
    } else {
        slug.to_string()
    }
}

/// The "all activity" feed of a profile
pub fn activity_url(profile_url: &str) -> String {
    format!("{}/recent-activity/all/", profile_url.trim_end_matches('/'))
}

/// Absolute permalink with query string and fragment removed
pub fn normalize_permalink(href: &str) -> Option<String> {
    let base = Url::parse(LINKEDIN_ORIGIN).ok()?;
    let mut url = base.join(href.trim()).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_profile_url_variants() {
        let expected = Some("https://www.linkedin.com/in/jane-doe-123/".to_string());
        assert_eq!(clean_profile_url("/in/jane-doe-123/"), expected);
        assert_eq!(
            clean_profile_url("https://www.linkedin.com/in/jane-doe-123?miniProfileUrn=x"),
            expected
        );
        assert_eq!(
            clean_profile_url("https://linkedin.com/in/jane-doe-123/overlay/about-this-profile/"),
            expected
        );
    }

    #[test]
    fn test_clean_profile_url_rejects_non_members() {
        assert_eq!(clean_profile_url("/company/acme/"), None);
        assert_eq!(clean_profile_url("/feed/hashtag/rust"), None);
        assert_eq!(clean_profile_url(""), None);
    }

    #[test]
    fn test_clean_profile_url_keeps_encoded_slugs() {
        assert_eq!(
            clean_profile_url("/in/jos%C3%A9-garc%C3%ADa/"),
            Some("https://www.linkedin.com/in/jos%C3%A9-garc%C3%ADa/".to_string())
        );
    }

    #[test]
    fn test_parse_target_profile() {
        assert_eq!(
            parse_target_profile("https://www.linkedin.com/in/jane-doe/details/").unwrap(),
            "https://www.linkedin.com/in/jane-doe/"
        );
        assert!(parse_target_profile("https://example.com/in/jane").is_err());
        assert!(parse_target_profile("https://www.linkedin.com/company/acme").is_err());
        assert!(parse_target_profile("not a url").is_err());
    }

    #[test]
    fn test_profile_slug() {
        assert_eq!(profile_slug("https://www.linkedin.com/in/jane-doe/"), "jane-doe");
        assert_eq!(
            profile_slug("https://www.linkedin.com/in/jos%C3%A9/"),
            "jos_C3_A9"
        );
        assert_eq!(
            profile_slug("https://www.linkedin.com/company/acme/"),
            "company_acme"
        );
    }

    #[test]
    fn test_activity_url() {
        assert_eq!(
            activity_url("https://www.linkedin.com/in/jane/"),
            "https://www.linkedin.com/in/jane/recent-activity/all/"
        );
    }

    #[test]
    fn test_normalize_permalink() {
        assert_eq!(
            normalize_permalink("/feed/update/urn:li:activity:7315376118735060992/?updateEntityUrn=x#c"),
            Some("https://www.linkedin.com/feed/update/urn:li:activity:7315376118735060992/".to_string())
        );
        assert_eq!(
            normalize_permalink("https://www.linkedin.com/posts/jane_hello-activity-1?utm=a"),
            Some("https://www.linkedin.com/posts/jane_hello-activity-1".to_string())
        );
    }
}
