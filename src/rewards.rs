//! Reward detection through the site's notifications page.

use crate::browser::BrowserError;
use crate::pacing::{Jitter, Pause};
use crate::page::PageHandle;
use crate::run_log::ScopedLog;
use scraper::Html;
use std::sync::Arc;

/// Phrase the site uses when a card is granted
pub const DEFAULT_REWARD_MARKER: &str = "Вы получили новую карту";

/// Number of reward notifications seen at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RewardSnapshot {
    pub count: u64,
}

impl RewardSnapshot {
    pub fn new(count: u64) -> Self {
        Self { count }
    }

    /// New rewards since `baseline`; a lower reading counts as none
    pub fn delta_since(&self, baseline: &RewardSnapshot) -> u64 {
        self.count.saturating_sub(baseline.count)
    }
}

/// Count text occurrences of `marker` in rendered markup.
///
/// Only text nodes are searched, so the marker inside attributes or scripts
/// is not counted.
pub fn count_markers(html: &str, marker: &str) -> u64 {
    if marker.is_empty() {
        return 0;
    }
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(|text| text.matches(marker).count() as u64)
        .sum()
}

/// Samples the shared notifications page
pub struct RewardMonitor {
    page: Box<dyn PageHandle>,
    marker: String,
    settle: Jitter,
    pause: Arc<dyn Pause>,
    log: ScopedLog,
}

impl RewardMonitor {
    pub fn new(
        page: Box<dyn PageHandle>,
        marker: impl Into<String>,
        settle: Jitter,
        pause: Arc<dyn Pause>,
        log: ScopedLog,
    ) -> Self {
        Self {
            page,
            marker: marker.into(),
            settle,
            pause,
            log,
        }
    }

    /// Reload the notifications and count reward markers
    pub async fn sample(&self) -> Result<RewardSnapshot, BrowserError> {
        self.page.reload().await?;
        self.pause.pause(self.settle.sample()).await;
        let html = self.page.content().await?;
        let snapshot = RewardSnapshot::new(count_markers(&html, &self.marker));
        self.log
            .debug(format_args!("Notifications show {} rewards", snapshot.count));
        Ok(snapshot)
    }

    /// New rewards in `fresh` relative to `baseline`, logging a reading that
    /// went backwards
    pub fn delta(&self, baseline: &RewardSnapshot, fresh: &RewardSnapshot) -> u64 {
        if fresh.count < baseline.count {
            self.log.warn(format_args!(
                "Reward count dropped from {} to {}, treating as no change",
                baseline.count, fresh.count
            ));
        }
        fresh.delta_since(baseline)
    }

    pub async fn close(&self) -> Result<(), BrowserError> {
        self.page.close().await
    }
}
