use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the reading browser
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,

    /// Browser window size
    pub window_size: (u32, u32),

    /// Chrome profile directory holding the logged-in site session
    pub user_data_dir: Option<PathBuf>,

    /// Navigation and element wait timeout in seconds
    pub timeout_seconds: u64,

    /// How long the driver keeps the connection without browser events.
    /// Must outlast the post-reward cooldown.
    pub idle_timeout_seconds: u64,

    /// Additional Chrome flags
    pub chrome_flags: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_size: (1920, 1080),
            user_data_dir: None,
            timeout_seconds: 30,
            idle_timeout_seconds: 2 * 60 * 60,
            chrome_flags: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    /// Headless variant, used where no display is available
    pub fn headless() -> Self {
        Self {
            headless: true,
            ..Self::default()
        }
    }

    /// Use the profile directory named in `profile_file`
    pub fn with_profile_file(mut self, profile_file: &Path) -> io::Result<Self> {
        self.user_data_dir = Some(read_profile_dir(profile_file)?);
        Ok(self)
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

/// Read the profile directory path from a plain-text file
pub fn read_profile_dir(profile_file: &Path) -> io::Result<PathBuf> {
    let content = fs::read_to_string(profile_file)?;
    let dir = content.trim();
    if dir.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} does not name a profile directory", profile_file.display()),
        ));
    }
    Ok(PathBuf::from(dir))
}
