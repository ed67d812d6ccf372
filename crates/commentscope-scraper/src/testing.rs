//! In-memory `PageDriver` with per-URL scripted DOM state.

use async_trait::async_trait;
use commentscope_core::page::{
    ElementQuery, ExtractedElement, PageDriver, PageError, PageResult,
};
use commentscope_core::selectors::SelectorRegistry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const SELECTORS: &str = r#"{
    "feed_page": "div.feed",
    "post_list_item": "div.post",
    "post_timestamp_and_link": "a.post-link",
    "comment_section": "div.comments",
    "load_more_comments_button": "button.more-comments",
    "load_more_replies_button": "button.more-replies",
    "comment_item": "article.comment",
    "commenter_link": "a.author",
    "profile_headline": "div.headline"
}"#;

pub(crate) fn registry() -> SelectorRegistry {
    SelectorRegistry::from_str(SELECTORS).unwrap()
}

pub(crate) fn element(fields: &[(&str, &str)]) -> ExtractedElement {
    fields.iter().copied().collect()
}

/// Scripts that apply whatever page is current
const ANY_PAGE: &str = "*";

#[derive(Default)]
struct PageScript {
    counts: HashMap<String, VecDeque<usize>>,
    clicks: HashMap<String, usize>,
    extractions: HashMap<String, VecDeque<Vec<ExtractedElement>>>,
}

#[derive(Default)]
struct State {
    current: String,
    pages: HashMap<String, PageScript>,
    redirects: HashMap<String, String>,
    unreachable: HashSet<String>,
    visits: Vec<String>,
    count_calls: HashMap<String, usize>,
    clicks_made: HashMap<String, usize>,
    scrolls: usize,
}

impl State {
    fn script(&mut self, url: &str) -> &mut PageScript {
        self.pages.entry(url.to_string()).or_default()
    }
}

/// Sequences with more than one entry are consumed front to back; the last
/// entry repeats forever.
fn next_of<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub(crate) struct ScriptedPage {
    state: Mutex<State>,
}

impl ScriptedPage {
    pub(crate) fn new() -> Self {
        let state = State {
            current: "about:blank".to_string(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub(crate) fn set_counts(&self, selector: &str, counts: impl IntoIterator<Item = usize>) {
        self.set_counts_on(ANY_PAGE, selector, counts);
    }

    pub(crate) fn set_counts_on(
        &self,
        url: &str,
        selector: &str,
        counts: impl IntoIterator<Item = usize>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .script(url)
            .counts
            .insert(selector.to_string(), counts.into_iter().collect());
    }

    /// Make `selector` clickable `times` times on `url`
    pub(crate) fn set_clicks_on(&self, url: &str, selector: &str, times: usize) {
        let mut state = self.state.lock().unwrap();
        state.script(url).clicks.insert(selector.to_string(), times);
    }

    /// Successive results of extracting `container` on `url`
    pub(crate) fn set_extractions_on(
        &self,
        url: &str,
        container: &str,
        batches: Vec<Vec<ExtractedElement>>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .script(url)
            .extractions
            .insert(container.to_string(), batches.into_iter().collect());
    }

    pub(crate) fn set_extraction_on(&self, url: &str, container: &str, items: Vec<ExtractedElement>) {
        self.set_extractions_on(url, container, vec![items]);
    }

    pub(crate) fn redirect(&self, from: &str, to: &str) {
        let mut state = self.state.lock().unwrap();
        state.redirects.insert(from.to_string(), to.to_string());
    }

    pub(crate) fn fail_navigation(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.unreachable.insert(url.to_string());
    }

    pub(crate) fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub(crate) fn count_calls(&self, selector: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.count_calls.get(selector).copied().unwrap_or(0)
    }

    pub(crate) fn clicks_made(&self, selector: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.clicks_made.get(selector).copied().unwrap_or(0)
    }

    pub(crate) fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str) -> PageResult<()> {
        let mut state = self.state.lock().unwrap();
        state.visits.push(url.to_string());
        if state.unreachable.contains(url) {
            return Err(PageError::Timeout(Duration::from_secs(30)));
        }
        state.current = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn count(&self, selector: &str) -> PageResult<usize> {
        let mut state = self.state.lock().unwrap();
        *state.count_calls.entry(selector.to_string()).or_default() += 1;
        let current = state.current.clone();
        for url in [current.as_str(), ANY_PAGE] {
            if let Some(queue) = state
                .pages
                .get_mut(url)
                .and_then(|s| s.counts.get_mut(selector))
            {
                return Ok(next_of(queue).unwrap_or(0));
            }
        }
        Ok(0)
    }

    async fn click_first_visible(&self, selector: &str) -> PageResult<bool> {
        let mut state = self.state.lock().unwrap();
        let current = state.current.clone();
        let clicked = match state
            .pages
            .get_mut(&current)
            .and_then(|s| s.clicks.get_mut(selector))
        {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if clicked {
            *state.clicks_made.entry(selector.to_string()).or_default() += 1;
        }
        Ok(clicked)
    }

    async fn scroll_to_bottom(&self) -> PageResult<()> {
        self.state.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn extract(&self, query: &ElementQuery) -> PageResult<Vec<ExtractedElement>> {
        let mut state = self.state.lock().unwrap();
        let current = state.current.clone();
        Ok(state
            .pages
            .get_mut(&current)
            .and_then(|s| s.extractions.get_mut(&query.container))
            .and_then(next_of)
            .unwrap_or_default())
    }
}
