use super::config::BrowserConfig;
use super::tab::ChromePage;
use crate::page::{PageHandle, PageOpener};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;

/// Owns the Chrome process and hands out pages
pub struct BrowserManager {
    browser: Arc<Browser>,
    main_tab: Arc<Tab>,
    config: BrowserConfig,
}

impl BrowserManager {
    /// Launch Chrome with the given configuration
    pub fn new(config: BrowserConfig) -> Result<Self, BrowserError> {
        let launch_options = Self::build_launch_options(&config)?;

        let browser = Browser::new(launch_options)
            .map_err(|e| BrowserError::InitializationError(e.to_string()))?;

        let main_tab = browser
            .wait_for_initial_tab()
            .map_err(|e| BrowserError::TabCreationError(e.to_string()))?;
        main_tab.set_default_timeout(config.timeout());

        Ok(Self {
            browser: Arc::new(browser),
            main_tab,
            config,
        })
    }

    /// Build Chrome launch options from our config
    fn build_launch_options(config: &BrowserConfig) -> Result<LaunchOptions<'_>, BrowserError> {
        let args: Vec<&OsStr> = config.chrome_flags.iter().map(OsStr::new).collect();

        LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_size.0, config.window_size.1)))
            .user_data_dir(config.user_data_dir.clone())
            .idle_browser_timeout(config.idle_timeout())
            .args(args)
            .build()
            .map_err(|e| BrowserError::ConfigurationError(e.to_string()))
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

#[async_trait]
impl PageOpener for BrowserManager {
    async fn open(&self, url: &str, new_tab: bool) -> Result<Box<dyn PageHandle>, BrowserError> {
        log::debug!("Opening {} (new tab: {})", url, new_tab);

        let tab = if new_tab {
            let browser = Arc::clone(&self.browser);
            let timeout = self.config.timeout();
            tokio::task::spawn_blocking(move || {
                let tab = browser
                    .new_tab()
                    .map_err(|e| BrowserError::TabCreationError(e.to_string()))?;
                tab.set_default_timeout(timeout);
                Ok::<_, BrowserError>(tab)
            })
            .await
            .map_err(|e| BrowserError::TaskFailed(e.to_string()))??
        } else {
            Arc::clone(&self.main_tab)
        };

        let page = ChromePage::with_timeout(tab, self.config.timeout());
        page.navigate(url).await?;
        Ok(Box::new(page))
    }
}

/// Errors that can occur during browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    #[error("Browser configuration error: {0}")]
    ConfigurationError(String),

    #[error("Tab creation failed: {0}")]
    TabCreationError(String),

    #[error("Navigation error: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript execution error: {0}")]
    JavaScriptError(String),

    #[error("HTML extraction error: {0}")]
    HtmlExtractionError(String),

    #[error("Tab close failed: {0}")]
    CloseError(String),

    #[error("Browser task failed: {0}")]
    TaskFailed(String),
}
