//! Catalog discovery: collects title addresses from the paginated listing.

use crate::browser::BrowserError;
use crate::pacing::{Jitter, Pause};
use crate::page::PageOpener;
use crate::run_log::ScopedLog;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Listing address with a `{page}` placeholder
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_pages")]
    pub pages: u32,

    /// Only anchors starting with this prefix are titles
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    /// Addresses under the prefix that are not titles
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,

    /// Where the catalog is written, one address per line
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_listing_url() -> String { "https://mangabuff.ru/manga?page={page}".to_string() }
fn default_pages() -> u32 { 36 }
fn default_title_prefix() -> String { "https://mangabuff.ru/manga/".to_string() }
fn default_excluded() -> Vec<String> { vec!["https://mangabuff.ru/manga/top".to_string()] }
fn default_output() -> PathBuf { PathBuf::from("catalog.txt") }

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listing_url: default_listing_url(),
            pages: default_pages(),
            title_prefix: default_title_prefix(),
            excluded: default_excluded(),
            output: default_output(),
        }
    }
}

impl DiscoveryConfig {
    pub fn page_url(&self, page: u32) -> String {
        self.listing_url.replace("{page}", &page.to_string())
    }
}

/// Keeps title addresses in first-seen order
#[derive(Debug, Default)]
pub struct TitleCollector {
    prefix: String,
    excluded: HashSet<String>,
    seen: HashSet<String>,
    titles: Vec<String>,
}

impl TitleCollector {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            prefix: config.title_prefix.clone(),
            excluded: config.excluded.iter().cloned().collect(),
            ..Self::default()
        }
    }

    /// Add the matching anchors; returns how many were new
    pub fn extend<I>(&mut self, anchors: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.titles.len();
        for link in anchors {
            if link.starts_with(&self.prefix)
                && !self.excluded.contains(&link)
                && self.seen.insert(link.clone())
            {
                self.titles.push(link);
            }
        }
        self.titles.len() - before
    }

    pub fn into_titles(self) -> Vec<String> {
        self.titles
    }
}

pub struct LinkDiscovery {
    opener: Arc<dyn PageOpener>,
    config: DiscoveryConfig,
    settle: Jitter,
    pause: Arc<dyn Pause>,
    log: ScopedLog,
}

impl LinkDiscovery {
    pub fn new(
        opener: Arc<dyn PageOpener>,
        config: DiscoveryConfig,
        settle: Jitter,
        pause: Arc<dyn Pause>,
        log: ScopedLog,
    ) -> Self {
        Self {
            opener,
            config,
            settle,
            pause,
            log,
        }
    }

    /// Walk the listing pages and return every title address found
    pub async fn discover(&self) -> Result<Vec<String>, BrowserError> {
        let mut collector = TitleCollector::new(&self.config);
        if self.config.pages == 0 {
            return Ok(collector.into_titles());
        }

        let page = self.opener.open(&self.config.page_url(1), false).await?;
        for number in 1..=self.config.pages {
            if number > 1 {
                page.navigate(&self.config.page_url(number)).await?;
            }
            self.pause.pause(self.settle.sample()).await;

            let added = collector.extend(page.anchors().await?);
            self.log.debug(format_args!(
                "Listing page {}: {} new titles",
                number, added
            ));
        }

        let titles = collector.into_titles();
        self.log.info(format_args!(
            "Discovered {} titles over {} listing pages",
            titles.len(),
            self.config.pages
        ));
        Ok(titles)
    }
}
