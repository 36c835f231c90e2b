// Library interface for manga_card_reader
// The binary in main.rs wires these together; tests drive them with scripted pages.

pub mod browser;
pub mod config;
pub mod discovery;
pub mod locator;
pub mod pacing;
pub mod page;
pub mod progression;
pub mod queue;
pub mod retry;
pub mod rewards;
pub mod run_log;
pub mod scroll;
