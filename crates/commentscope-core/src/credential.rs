//! Stored session credentials.
//!
//! Two file forms are accepted: a JSON array of browser cookies as exported
//! by common cookie-export extensions or a previous run, or a plain text file
//! containing only the value of the `li_at` session cookie.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Name of the LinkedIn session cookie
pub const AUTH_COOKIE_NAME: &str = "li_at";

const DEFAULT_COOKIE_DOMAIN: &str = ".www.linkedin.com";

fn default_domain() -> String {
    DEFAULT_COOKIE_DOMAIN.to_string()
}

fn default_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; negative or absent for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl SessionCookie {
    /// The `li_at` cookie built from a bare token
    pub fn auth_token(value: &str) -> Self {
        Self {
            name: AUTH_COOKIE_NAME.to_string(),
            value: value.to_string(),
            domain: default_domain(),
            path: default_path(),
            expires: None,
            http_only: true,
            secure: true,
            same_site: Some("None".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFormat {
    CookieJar,
    RawToken,
}

#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub cookies: Vec<SessionCookie>,
    pub format: CredentialFormat,
}

impl SessionCredential {
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading session credential from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let credential = Self::from_str(&content)?;
        tracing::info!(
            "Loaded {} cookie(s) from {}",
            credential.cookies.len(),
            path.display()
        );
        Ok(credential)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidCredential("credential file is empty".to_string()));
        }

        let credential = if trimmed.starts_with('[') {
            let cookies: Vec<SessionCookie> = serde_json::from_str(trimmed)?;
            Self {
                cookies,
                format: CredentialFormat::CookieJar,
            }
        } else if trimmed.contains(char::is_whitespace) || trimmed.starts_with('{') {
            return Err(Error::InvalidCredential(
                "expected a JSON cookie array or a bare li_at value".to_string(),
            ));
        } else {
            Self {
                cookies: vec![SessionCookie::auth_token(trimmed)],
                format: CredentialFormat::RawToken,
            }
        };

        if credential.auth_cookie().is_none() {
            return Err(Error::InvalidCredential(format!(
                "no non-empty '{}' cookie found",
                AUTH_COOKIE_NAME
            )));
        }

        Ok(credential)
    }

    pub fn auth_cookie(&self) -> Option<&SessionCookie> {
        self.cookies
            .iter()
            .find(|c| c.name == AUTH_COOKIE_NAME && !c.value.is_empty())
    }

    /// Persist cookies refreshed by the browser after a successful login.
    ///
    /// Only cookie-jar files are rewritten; a bare token file is left as the
    /// user wrote it.
    pub fn save_refreshed(&self, path: &Path, cookies: &[SessionCookie]) -> Result<bool> {
        if self.format != CredentialFormat::CookieJar {
            tracing::debug!("Credential file holds a bare token; not rewriting it");
            return Ok(false);
        }
        if !cookies.iter().any(|c| c.name == AUTH_COOKIE_NAME) {
            tracing::warn!("Browser returned no session cookie; keeping existing credential file");
            return Ok(false);
        }

        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), cookies)?;
        tracing::info!("Saved {} refreshed cookies to {}", cookies.len(), path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAR: &str = r#"[
        {"name": "li_at", "value": "AQEDAR", "domain": ".www.linkedin.com", "path": "/",
         "expires": 1767225600.5, "httpOnly": true, "secure": true, "sameSite": "None"},
        {"name": "JSESSIONID", "value": "\"ajax:123\""}
    ]"#;

    #[test]
    fn test_parse_cookie_jar() {
        let credential = SessionCredential::from_str(JAR).unwrap();
        assert_eq!(credential.format, CredentialFormat::CookieJar);
        assert_eq!(credential.cookies.len(), 2);
        assert_eq!(credential.auth_cookie().unwrap().value, "AQEDAR");

        let session = &credential.cookies[1];
        assert_eq!(session.domain, ".www.linkedin.com");
        assert_eq!(session.path, "/");
        assert!(!session.http_only);
    }

    #[test]
    fn test_parse_raw_token() {
        let credential = SessionCredential::from_str("  AQEDARtoken123\n").unwrap();
        assert_eq!(credential.format, CredentialFormat::RawToken);
        let cookie = credential.auth_cookie().unwrap();
        assert_eq!(cookie.value, "AQEDARtoken123");
        assert!(cookie.secure);
    }

    #[test]
    fn test_rejects_missing_auth_cookie() {
        let err = SessionCredential::from_str(r#"[{"name": "bcookie", "value": "x"}]"#).unwrap_err();
        assert!(err.to_string().contains("li_at"));
    }

    #[test]
    fn test_rejects_empty_and_prose() {
        assert!(SessionCredential::from_str("   ").is_err());
        assert!(SessionCredential::from_str("paste your cookie here").is_err());
        assert!(SessionCredential::from_str(r#"{"li_at": "x"}"#).is_err());
    }

    #[test]
    fn test_save_refreshed_rewrites_cookie_jar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, JAR).unwrap();

        let credential = SessionCredential::from_file(&path).unwrap();
        let refreshed = vec![SessionCookie::auth_token("NEWVALUE")];
        assert!(credential.save_refreshed(&path, &refreshed).unwrap());

        let reloaded = SessionCredential::from_file(&path).unwrap();
        assert_eq!(reloaded.auth_cookie().unwrap().value, "NEWVALUE");
    }

    #[test]
    fn test_save_refreshed_leaves_token_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("li_at.txt");
        std::fs::write(&path, "TOKEN").unwrap();

        let credential = SessionCredential::from_file(&path).unwrap();
        let refreshed = vec![SessionCookie::auth_token("NEWVALUE")];
        assert!(!credential.save_refreshed(&path, &refreshed).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TOKEN");
    }
}
