//! The browser surface the reader drives.
//!
//! Everything the progression engine needs from a browser goes through
//! `PageOpener` and `PageHandle`. The Chrome implementation lives in
//! `crate::browser`; tests provide scripted pages.

use crate::browser::BrowserError;
use async_trait::async_trait;
use serde_json::Value;

/// Expressions evaluated in page context
pub mod scripts {
    pub const DOCUMENT_HEIGHT: &str = "document.documentElement.scrollHeight";
    pub const VIEWPORT_BOTTOM: &str = "window.scrollY + window.innerHeight";
    pub const LOCATION: &str = "window.location.href";

    pub fn scroll_by(delta_px: i64) -> String {
        format!("window.scrollBy(0, {})", delta_px)
    }
}

/// A located element, addressed by the XPath that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    xpath: String,
}

impl ElementHandle {
    pub fn new(xpath: impl Into<String>) -> Self {
        Self { xpath: xpath.into() }
    }

    /// XPath matching the first element whose own text contains `text`
    pub fn containing_text(text: &str) -> Self {
        Self::new(format!("//*[contains(text(), {})]", xpath_literal(text)))
    }

    pub fn xpath(&self) -> &str {
        &self.xpath
    }
}

/// Quote `text` as an XPath string literal
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// A single browser tab
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Load another address in this tab
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluate an expression and return its JSON value (`Null` for undefined)
    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError>;

    /// Find an element by visible text.
    ///
    /// `Ok(None)` means the page answered and the element is not there;
    /// `Err` means the lookup itself could not be completed.
    async fn find_by_text(&self, text: &str) -> Result<Option<ElementHandle>, BrowserError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError>;

    async fn reload(&self) -> Result<(), BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;

    /// Rendered document markup
    async fn content(&self) -> Result<String, BrowserError>;

    /// Absolute addresses of every anchor on the page
    async fn anchors(&self) -> Result<Vec<String>, BrowserError>;

    /// Address currently shown, if the page reports a string
    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        let value = self.evaluate(scripts::LOCATION).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn evaluate_number(&self, expression: &str) -> Result<f64, BrowserError> {
        let value = self.evaluate(expression).await?;
        value.as_f64().ok_or_else(|| {
            BrowserError::JavaScriptError(format!(
                "Expected a number from `{}`, got {}",
                expression, value
            ))
        })
    }
}

/// Opens browser tabs
#[async_trait]
pub trait PageOpener: Send + Sync {
    /// Open `url`, in a fresh tab when `new_tab` is set, otherwise in the
    /// opener's main tab
    async fn open(&self, url: &str, new_tab: bool) -> Result<Box<dyn PageHandle>, BrowserError>;
}
