use crate::browser::BrowserConfig;
use crate::discovery::DiscoveryConfig;
use crate::pacing::Jitter;
use crate::progression::{ProgressionSettings, DEFAULT_NEXT_CHAPTER_TEXT};
use crate::queue::RemovalPolicy;
use crate::retry::RetryPolicy;
use crate::rewards::DEFAULT_REWARD_MARKER;
use crate::scroll::{ScrollPolicy, ScrollPreset};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub probe: RetryPolicy,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Page listing the account's notifications
    #[serde(default = "default_notifications_url")]
    pub notifications_url: String,

    /// Visible text of the next-chapter control
    #[serde(default = "default_next_chapter_text")]
    pub next_chapter_text: String,

    /// Notification phrase announcing a new card
    #[serde(default = "default_reward_marker")]
    pub reward_marker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub removal: RemovalPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSection {
    /// Plain-text file naming the Chrome profile directory
    #[serde(default = "default_profile_file")]
    pub profile_file: PathBuf,

    #[serde(default = "default_false")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Navigation and element lookup timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScrollConfig {
    #[serde(default)]
    pub preset: ScrollPreset,

    pub step_px: Option<i64>,
    pub tolerance_px: Option<f64>,
    pub max_rounds: Option<u32>,
    pub max_duration_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PacingConfig {
    /// Wait after opening or clicking through to a page
    #[serde(default = "default_settle")]
    pub settle: Jitter,

    #[serde(default = "default_between_chapters")]
    pub between_chapters: Jitter,

    /// Suspension after a new card
    #[serde(default = "default_cooldown")]
    pub cooldown: Jitter,

    /// Wait after reloading the notifications page
    #[serde(default = "default_notifications_settle")]
    pub notifications_settle: Jitter,
}

fn default_false() -> bool { false }
fn default_notifications_url() -> String { "https://mangabuff.ru/notifications".to_string() }
fn default_next_chapter_text() -> String { DEFAULT_NEXT_CHAPTER_TEXT.to_string() }
fn default_reward_marker() -> String { DEFAULT_REWARD_MARKER.to_string() }
fn default_queue_path() -> PathBuf { PathBuf::from("manga.txt") }
fn default_profile_file() -> PathBuf { PathBuf::from("user_data.txt") }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_timeout() -> u64 { 30 }
fn default_settle() -> Jitter { Jitter::secs(3, 5) }
fn default_between_chapters() -> Jitter { Jitter::secs(1, 3) }
fn default_cooldown() -> Jitter { Jitter::secs(3605, 3615) }
fn default_notifications_settle() -> Jitter { Jitter::secs(1, 2) }

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            notifications_url: default_notifications_url(),
            next_chapter_text: default_next_chapter_text(),
            reward_marker: default_reward_marker(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: default_queue_path(),
            removal: RemovalPolicy::default(),
        }
    }
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            profile_file: default_profile_file(),
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle: default_settle(),
            between_chapters: default_between_chapters(),
            cooldown: default_cooldown(),
            notifications_settle: default_notifications_settle(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl BrowserSection {
    /// Browser configuration without the profile directory, which comes from
    /// `profile_file`
    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            headless: self.headless,
            window_size: (self.window_width, self.window_height),
            timeout_seconds: self.timeout_secs,
            ..BrowserConfig::default()
        }
    }
}

impl ScrollConfig {
    pub fn policy(&self) -> ScrollPolicy {
        let mut policy = ScrollPolicy::from_preset(self.preset);
        if let Some(step_px) = self.step_px {
            policy.step_px = step_px.max(1);
        }
        if let Some(tolerance_px) = self.tolerance_px {
            policy.tolerance_px = tolerance_px;
        }
        if let Some(max_rounds) = self.max_rounds {
            policy.max_rounds = max_rounds;
        }
        if let Some(secs) = self.max_duration_secs {
            policy.max_duration = Duration::from_secs(secs);
        }
        policy
    }
}

impl Config {
    pub fn progression_settings(&self) -> ProgressionSettings {
        ProgressionSettings {
            next_chapter_text: self.site.next_chapter_text.clone(),
            settle: self.pacing.settle,
            between_chapters: self.pacing.between_chapters,
            cooldown: self.pacing.cooldown,
            probe_retry: self.probe.clone(),
        }
    }
}
