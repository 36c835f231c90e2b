//! Chrome-backed implementation of the page interface
//!
//! `BrowserManager` launches Chrome against the reader's profile directory and
//! opens `ChromePage`s, which implement `crate::page::PageHandle` on top of
//! `headless_chrome` tabs.
//!
//! # Example
//!
//! ```no_run
//! use manga_card_reader::browser::{BrowserConfig, BrowserManager};
//! use manga_card_reader::page::PageOpener;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BrowserConfig::default().with_profile_file("user_data.txt".as_ref())?;
//! let manager = BrowserManager::new(config)?;
//!
//! let page = manager.open("https://mangabuff.ru/notifications", false).await?;
//! let html = page.content().await?;
//! println!("Extracted {} bytes of HTML", html.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod tab;

// Re-export main types for convenience
pub use config::BrowserConfig;
pub use manager::{BrowserError, BrowserManager};
pub use tab::ChromePage;
