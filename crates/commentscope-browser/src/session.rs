use crate::{Error, Result, scripts};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, EnableParams, SetBlockedUrLsParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, EventConsoleApiCalled};
use commentscope_core::credential::SessionCookie;
use commentscope_core::page::{ElementQuery, ExtractedElement, PageDriver, PageError, PageResult};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::process::Child;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Third-party bot-detection scripts that are never allowed to load
const BLOCKED_URL_PATTERNS: [&str; 1] = ["*protechts.net*"];

const CONNECT_ATTEMPTS: u32 = 5;

/// One Chrome tab driven over CDP.
///
/// Owns the CDP handler task and, when attached, the Chrome process itself,
/// which is killed when the session is closed or dropped.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    console_task: Option<JoinHandle<()>>,
    chrome_process: Option<Child>,
    navigation_timeout: Duration,
}

impl ChromeSession {
    /// Connect to Chrome listening on `debugging_port` and prepare one page
    pub async fn connect(debugging_port: u16, navigation_timeout: Duration) -> Result<Self> {
        tracing::info!("CDP session: connecting to Chrome on port {}", debugging_port);

        // Chrome may not be listening yet right after launch
        let ws_url = format!("http://localhost:{}", debugging_port);
        let (browser, mut handler) = {
            let mut retries = CONNECT_ATTEMPTS;
            loop {
                tracing::debug!("Attempting CDP connection to {}...", ws_url);
                match Browser::connect(&ws_url).await {
                    Ok(result) => {
                        tracing::debug!("CDP connection established");
                        break result;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            return Err(Error::Cdp(format!(
                                "Failed to connect to Chrome after {} attempts: {}",
                                CONNECT_ATTEMPTS, e
                            )));
                        }
                        tracing::debug!(
                            "CDP connection attempt failed, retrying... ({} left)",
                            retries
                        );
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
            }
        };

        // The handler must be polled for any browser command to complete
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => browser.new_page("about:blank").await?,
        };

        page.execute(EnableParams::default()).await?;
        page.execute(SetBlockedUrLsParams::new(
            BLOCKED_URL_PATTERNS.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        ))
        .await?;
        tracing::debug!("Blocking requests matching {:?}", BLOCKED_URL_PATTERNS);

        let mut session = Self {
            browser,
            page,
            handler_task,
            console_task: None,
            chrome_process: None,
            navigation_timeout,
        };
        session.forward_console().await;
        Ok(session)
    }

    /// Take ownership of the Chrome process so it is stopped with the session
    pub fn attach_process(&mut self, child: Child) {
        self.chrome_process = Some(child);
    }

    async fn forward_console(&mut self) {
        let mut events = match self.page.event_listener::<EventConsoleApiCalled>().await {
            Ok(events) => events,
            Err(e) => {
                tracing::debug!("Browser console forwarding unavailable: {}", e);
                return;
            }
        };

        self.console_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let text = event
                    .args
                    .iter()
                    .map(|arg| match (&arg.value, &arg.description) {
                        (Some(serde_json::Value::String(s)), _) => s.clone(),
                        (Some(value), _) => value.to_string(),
                        (None, Some(description)) => description.clone(),
                        (None, None) => String::new(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::debug!("BROWSER LOG: {}", text);
            }
        }));
    }

    /// Install session cookies before the first navigation
    pub async fn install_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        let params = cookies
            .iter()
            .map(to_cookie_param)
            .collect::<Result<Vec<_>>>()?;
        self.page.set_cookies(params).await?;
        tracing::debug!("Installed {} cookies", cookies.len());
        Ok(())
    }

    /// Current cookies for the page, as the browser holds them
    pub async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: (c.expires > 0.0).then_some(c.expires),
                http_only: c.http_only,
                secure: c.secure,
                same_site: c.same_site.as_ref().and_then(|s| {
                    serde_json::to_value(s)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                }),
            })
            .collect())
    }

    /// Close the browser and stop the Chrome process
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.console_task.take() {
            task.abort();
        }
        self.handler_task.abort();
        if let Some(mut child) = self.chrome_process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> PageResult<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .build()
            .map_err(PageError::Script)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| PageError::Script(e.to_string()))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn to_cookie_param(cookie: &SessionCookie) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);

    let same_site = match cookie.same_site.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("strict") => Some(CookieSameSite::Strict),
        Some("lax") => Some(CookieSameSite::Lax),
        Some("none") | Some("no_restriction") => Some(CookieSameSite::None),
        _ => None,
    };
    if let Some(same_site) = same_site {
        builder = builder.same_site(same_site);
    }
    // Without an expiry Chrome keeps the cookie for this session only
    if let Some(expires) = cookie.expires.filter(|e| *e > 0.0) {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }

    builder.build().map_err(|reason| Error::Cookie {
        name: cookie.name.clone(),
        reason,
    })
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn goto(&self, url: &str) -> PageResult<()> {
        tracing::debug!("Navigating to {}", url);
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(PageError::Timeout(self.navigation_timeout)),
        }
    }

    async fn current_url(&self) -> PageResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| PageError::from(Error::from(e)))?;
        Ok(url.unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> PageResult<usize> {
        self.evaluate(scripts::count(selector)).await
    }

    async fn click_first_visible(&self, selector: &str) -> PageResult<bool> {
        self.evaluate(scripts::click_first_visible(selector)).await
    }

    async fn scroll_to_bottom(&self) -> PageResult<()> {
        let height: f64 = self.evaluate(scripts::scroll_to_bottom()).await?;
        tracing::trace!("Scrolled to {}px", height);
        Ok(())
    }

    async fn extract(&self, query: &ElementQuery) -> PageResult<Vec<ExtractedElement>> {
        let rows: Vec<HashMap<String, Option<String>>> =
            self.evaluate(scripts::extract(query)).await?;
        Ok(rows.into_iter().map(ExtractedElement::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_param_from_session_cookie() {
        let cookie = SessionCookie::auth_token("AQEDAR");
        let param = to_cookie_param(&cookie).unwrap();
        assert_eq!(param.name, "li_at");
        assert_eq!(param.value, "AQEDAR");
        assert_eq!(param.domain.as_deref(), Some(".www.linkedin.com"));
        assert_eq!(param.secure, Some(true));
        assert_eq!(param.same_site, Some(CookieSameSite::None));
    }

    #[test]
    fn test_cookie_param_ignores_unknown_same_site() {
        let mut cookie = SessionCookie::auth_token("AQEDAR");
        cookie.same_site = Some("unspecified".to_string());
        let param = to_cookie_param(&cookie).unwrap();
        assert_eq!(param.same_site, None);
    }

    #[test]
    fn test_cookie_param_keeps_expiry() {
        let mut cookie = SessionCookie::auth_token("AQEDAR");
        cookie.expires = Some(1_767_225_600.0);
        let param = to_cookie_param(&cookie).unwrap();
        assert_eq!(param.expires.map(|e| *e.inner()), Some(1_767_225_600.0));
    }

    #[test]
    fn test_cookie_param_without_expiry_is_session_cookie() {
        let mut cookie = SessionCookie::auth_token("AQEDAR");
        assert!(to_cookie_param(&cookie).unwrap().expires.is_none());

        cookie.expires = Some(-1.0);
        assert!(to_cookie_param(&cookie).unwrap().expires.is_none());
    }

    // Driving a real page needs a running Chrome and is exercised by the
    // CLI end to end, not here.
}
