//! Quote display
//!
//! Rendering of the current quote and the viewer state behind the category
//! selector: the selected filter (persisted) and the last shown quote
//! (session only).

use std::sync::Arc;

use crate::storage::{
    KeyValueStore, SharedQuoteStore, LAST_QUOTE_INDEX_KEY, SELECTED_CATEGORY_KEY,
};
use crate::types::filter::ALL_CATEGORIES;
use crate::types::{CategoryFilter, Quote};

/// Region that shows the current quote
pub const QUOTE_DISPLAY_REGION: &str = "quoteDisplay";

const EMPTY_TEXT: &str = "No quotes available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Html,
    Text,
}

/// Somewhere quotes can be shown
pub trait RenderSurface {
    fn set_content(&self, region: &str, content: &str);

    fn format(&self) -> RenderFormat {
        RenderFormat::Html
    }
}

/// Escape text for inclusion in HTML markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render_quote_html(quote: &Quote) -> String {
    format!(
        "<p class=\"quote-text\">\"{}\"</p>\n<p class=\"quote-cat\"><em>Category: {}</em></p>",
        escape_html(&quote.text),
        escape_html(&quote.category)
    )
}

pub fn render_quote_text(quote: &Quote) -> String {
    format!("\"{}\" — {}", quote.text, quote.category)
}

/// Render a quote, or the empty placeholder when there is none
pub fn render(quote: Option<&Quote>, format: RenderFormat) -> String {
    match (quote, format) {
        (Some(quote), RenderFormat::Html) => render_quote_html(quote),
        (Some(quote), RenderFormat::Text) => render_quote_text(quote),
        (None, RenderFormat::Html) => format!("<p>{}</p>", EMPTY_TEXT),
        (None, RenderFormat::Text) => EMPTY_TEXT.to_string(),
    }
}

pub struct QuoteViewer {
    store: SharedQuoteStore,
    prefs: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    filter: CategoryFilter,
}

impl QuoteViewer {
    /// Create a viewer, restoring the last selected category from `prefs`
    pub fn new(
        store: SharedQuoteStore,
        prefs: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Self {
        let filter = match prefs.get(SELECTED_CATEGORY_KEY) {
            Ok(Some(selected)) => CategoryFilter::from_selector(&selected),
            Ok(None) => CategoryFilter::All,
            Err(e) => {
                tracing::warn!("Could not read selected category: {}", e);
                CategoryFilter::All
            }
        };

        Self {
            store,
            prefs,
            session,
            filter,
        }
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    /// Change and persist the category filter
    pub fn set_filter(&mut self, filter: CategoryFilter) {
        if let Err(e) = self.prefs.set(SELECTED_CATEGORY_KEY, filter.as_selector()) {
            tracing::error!("Could not save selected category: {}", e);
        }
        self.filter = filter;
    }

    /// Selector entries: the "all" sentinel followed by every category
    pub async fn category_options(&self) -> Vec<String> {
        let store = self.store.lock().await;
        std::iter::once(ALL_CATEGORIES.to_string())
            .chain(store.categories())
            .collect()
    }

    /// Show a random quote matching the current filter
    pub async fn show_random(&self, surface: &dyn RenderSurface) -> Option<Quote> {
        let picked = {
            let store = self.store.lock().await;
            store
                .pick_indexed(&self.filter)
                .map(|(index, quote)| (index, quote.clone()))
        };

        match &picked {
            Some((index, _)) => self.remember(*index),
            None => self.forget(),
        }

        let quote = picked.map(|(_, quote)| quote);
        surface.set_content(QUOTE_DISPLAY_REGION, &render(quote.as_ref(), surface.format()));
        quote
    }

    /// Show the quote shown last this session, or a random one
    pub async fn restore_last(&self, surface: &dyn RenderSurface) -> Option<Quote> {
        let last = match self.session.get(LAST_QUOTE_INDEX_KEY) {
            Ok(value) => value.and_then(|v| v.trim().parse::<usize>().ok()),
            Err(e) => {
                tracing::debug!("Session storage unavailable: {}", e);
                None
            }
        };

        let quote = match last {
            Some(index) => self.store.lock().await.get(index).cloned(),
            None => None,
        };

        match quote {
            Some(quote) => {
                surface.set_content(QUOTE_DISPLAY_REGION, &render(Some(&quote), surface.format()));
                Some(quote)
            }
            None => self.show_random(surface).await,
        }
    }

    fn remember(&self, index: usize) {
        if let Err(e) = self.session.set(LAST_QUOTE_INDEX_KEY, &index.to_string()) {
            tracing::debug!("Could not remember last quote: {}", e);
        }
    }

    fn forget(&self) {
        if let Err(e) = self.session.remove(LAST_QUOTE_INDEX_KEY) {
            tracing::debug!("Could not clear last quote: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKvStore, QuoteStore};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSurface {
        writes: Mutex<Vec<(String, String)>>,
    }

    impl RenderSurface for RecordingSurface {
        fn set_content(&self, region: &str, content: &str) {
            self.writes
                .lock()
                .unwrap()
                .push((region.to_string(), content.to_string()));
        }

        fn format(&self) -> RenderFormat {
            RenderFormat::Text
        }
    }

    impl RecordingSurface {
        fn last(&self) -> Option<(String, String)> {
            self.writes.lock().unwrap().last().cloned()
        }
    }

    fn viewer(quotes: Vec<Quote>) -> (QuoteViewer, Arc<MemoryKvStore>, Arc<MemoryKvStore>) {
        let prefs = Arc::new(MemoryKvStore::new());
        let session = Arc::new(MemoryKvStore::new());
        let store = QuoteStore::from_quotes(prefs.clone(), quotes).into_shared();
        (
            QuoteViewer::new(store, prefs.clone(), session.clone()),
            prefs,
            session,
        )
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_html() {
        let html = render(Some(&Quote::new("a < b", "Math")), RenderFormat::Html);
        assert_eq!(
            html,
            concat!(
                "<p class=\"quote-text\">\"a &lt; b\"</p>\n",
                "<p class=\"quote-cat\"><em>Category: Math</em></p>"
            )
        );
        assert_eq!(render(None, RenderFormat::Html), "<p>No quotes available.</p>");
        assert_eq!(render(None, RenderFormat::Text), "No quotes available.");
    }

    #[tokio::test]
    async fn test_show_random_empty() {
        let (viewer, _, session) = viewer(Vec::new());
        let surface = RecordingSurface::default();

        assert!(viewer.show_random(&surface).await.is_none());
        assert_eq!(
            surface.last(),
            Some((QUOTE_DISPLAY_REGION.to_string(), EMPTY_TEXT.to_string()))
        );
        assert_eq!(session.get(LAST_QUOTE_INDEX_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_show_random_remembers_index() {
        let (mut viewer, prefs, session) = viewer(vec![
            Quote::new("1", "Life"),
            Quote::new("2", "Art"),
        ]);
        viewer.set_filter(CategoryFilter::Only("Art".to_string()));
        assert_eq!(prefs.get(SELECTED_CATEGORY_KEY).unwrap().as_deref(), Some("Art"));

        let surface = RecordingSurface::default();
        let shown = viewer.show_random(&surface).await.unwrap();
        assert_eq!(shown, Quote::new("2", "Art"));
        assert_eq!(session.get(LAST_QUOTE_INDEX_KEY).unwrap().as_deref(), Some("1"));
        assert_eq!(surface.last().unwrap().1, "\"2\" — Art");
    }

    #[tokio::test]
    async fn test_restore_last() {
        let (viewer, _, session) = viewer(vec![Quote::new("1", "Life"), Quote::new("2", "Art")]);
        let surface = RecordingSurface::default();

        session.set(LAST_QUOTE_INDEX_KEY, "1").unwrap();
        assert_eq!(viewer.restore_last(&surface).await, Some(Quote::new("2", "Art")));

        // Out of range falls back to a random quote
        session.set(LAST_QUOTE_INDEX_KEY, "9").unwrap();
        assert!(viewer.restore_last(&surface).await.is_some());
    }

    #[tokio::test]
    async fn test_filter_is_restored() {
        let prefs = Arc::new(MemoryKvStore::new());
        prefs.set(SELECTED_CATEGORY_KEY, "Life").unwrap();
        let store =
            QuoteStore::from_quotes(prefs.clone(), vec![Quote::new("1", "Life")]).into_shared();

        let viewer = QuoteViewer::new(store, prefs, Arc::new(MemoryKvStore::new()));
        assert_eq!(viewer.filter(), &CategoryFilter::Only("Life".to_string()));
        assert_eq!(viewer.category_options().await, vec!["all", "Life"]);
    }
}
