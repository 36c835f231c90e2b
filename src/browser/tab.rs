use super::manager::BrowserError;
use crate::page::{ElementHandle, PageHandle};
use async_trait::async_trait;
use headless_chrome::Tab;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

const ANCHORS_SCRIPT: &str =
    "JSON.stringify(Array.from(document.querySelectorAll('a[href]'), a => a.href))";

/// A Chrome tab behind the `PageHandle` interface.
///
/// `headless_chrome` is synchronous, so each call runs on tokio's blocking pool.
pub struct ChromePage {
    tab: Arc<Tab>,
    lookup_timeout: Duration,
}

impl ChromePage {
    /// Wrap a tab with the default 5 second element lookup window
    pub fn new(tab: Arc<Tab>) -> Self {
        Self::with_timeout(tab, Duration::from_secs(5))
    }

    /// Wrap a tab with a custom element lookup window
    pub fn with_timeout(tab: Arc<Tab>, lookup_timeout: Duration) -> Self {
        Self {
            tab,
            lookup_timeout,
        }
    }

    /// Get a reference to the underlying tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, BrowserError>
    where
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(tab.as_ref()))
            .await
            .map_err(|e| BrowserError::TaskFailed(e.to_string()))?
    }
}

fn evaluate_on(tab: &Tab, expression: &str) -> Result<Value, BrowserError> {
    let result = tab
        .evaluate(expression, false)
        .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;
    Ok(result.value.unwrap_or(Value::Null))
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let url = url.to_string();
        self.blocking(move |tab| {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(|e| {
                    BrowserError::NavigationError(format!("Failed to navigate to {}: {}", url, e))
                })?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let expression = expression.to_string();
        self.blocking(move |tab| evaluate_on(tab, &expression)).await
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<ElementHandle>, BrowserError> {
        let element = ElementHandle::containing_text(text);
        let xpath_js = serde_json::to_string(element.xpath())
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;
        let script = format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue !== null",
            xpath_js
        );
        let timeout = self.lookup_timeout;

        self.blocking(move |tab| {
            let start = Instant::now();
            loop {
                // A script error propagates: that is a failed lookup, not an absent element
                let present = evaluate_on(tab, &script)?;
                if present.as_bool() == Some(true) {
                    return Ok(Some(element));
                }
                if start.elapsed() > timeout {
                    return Ok(None);
                }
                std::thread::sleep(Duration::from_millis(250));
            }
        })
        .await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        let xpath = element.xpath().to_string();
        self.blocking(move |tab| {
            let found = tab
                .find_element_by_xpath(&xpath)
                .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", xpath, e)))?;
            found
                .click()
                .map_err(|e| BrowserError::JavaScriptError(format!("Click failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn reload(&self) -> Result<(), BrowserError> {
        self.blocking(|tab| {
            tab.reload(false, None)
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(|e| BrowserError::NavigationError(format!("Reload failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.blocking(|tab| {
            tab.close(true)
                .map_err(|e| BrowserError::CloseError(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.blocking(|tab| {
            tab.get_content()
                .map_err(|e| BrowserError::HtmlExtractionError(e.to_string()))
        })
        .await
    }

    async fn anchors(&self) -> Result<Vec<String>, BrowserError> {
        let value = self.evaluate(ANCHORS_SCRIPT).await?;
        let json = value.as_str().ok_or_else(|| {
            BrowserError::JavaScriptError("Anchor listing returned no value".to_string())
        })?;
        serde_json::from_str(json).map_err(|e| BrowserError::JavaScriptError(e.to_string()))
    }
}
