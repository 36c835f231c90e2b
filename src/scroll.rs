//! Scroll-completion detection.
//!
//! A chapter is read by scrolling through it the way a person would: fixed
//! steps with jittered delays, an occasional small back-and-forth nudge, and a
//! sweep up and down after each pass so lazy-loaded images materialize. After
//! every pass the document height and viewport bottom are measured; the
//! chapter is done when the viewport reaches the end of the document or the
//! height stops growing. Rounds and wall-clock time are both capped, and
//! running out of either is reported as `ScrollOutcome::Stalled`.

use crate::browser::BrowserError;
use crate::page::{scripts, PageHandle};
use crate::pacing::{CountRange, Jitter, Pause};
use crate::run_log::ScopedLog;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Pacing and guard settings for one scrolling strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPolicy {
    /// Pixels per forward step
    pub step_px: i64,
    /// Delay after each step
    pub step_delay: Jitter,
    /// Steps between nudges, redrawn after every nudge
    pub nudge_every: CountRange,
    /// Pause before a nudge
    pub nudge_pause: Jitter,
    /// Delay between the moves of a nudge
    pub nudge_delay: Jitter,
    /// Steps in each direction of the end-of-pass sweep
    pub sweep_steps: CountRange,
    /// Viewport bottom this close to the document end counts as done
    pub tolerance_px: f64,
    /// Consecutive rounds without height growth that count as done
    pub stall_rounds: u32,
    pub max_rounds: u32,
    pub max_duration: Duration,
}

impl ScrollPolicy {
    /// Pacing modelled on a person reading a long vertical chapter
    pub fn human() -> Self {
        Self {
            step_px: 500,
            step_delay: Jitter::millis(10, 500),
            nudge_every: CountRange::new(15, 17),
            nudge_pause: Jitter::millis(1000, 2500),
            nudge_delay: Jitter::millis(10, 50),
            sweep_steps: CountRange::new(8, 10),
            tolerance_px: 40.0,
            stall_rounds: 1,
            max_rounds: 200,
            max_duration: Duration::from_secs(30 * 60),
        }
    }

    /// Same shape with short delays
    pub fn brisk() -> Self {
        Self {
            step_delay: Jitter::millis(5, 60),
            nudge_pause: Jitter::millis(100, 300),
            nudge_delay: Jitter::millis(5, 20),
            sweep_steps: CountRange::new(3, 4),
            max_duration: Duration::from_secs(10 * 60),
            ..Self::human()
        }
    }

    /// No delays at all
    pub fn instant() -> Self {
        Self {
            step_delay: Jitter::none(),
            nudge_pause: Jitter::none(),
            nudge_delay: Jitter::none(),
            ..Self::human()
        }
    }

    pub fn from_preset(preset: ScrollPreset) -> Self {
        match preset {
            ScrollPreset::Human => Self::human(),
            ScrollPreset::Brisk => Self::brisk(),
            ScrollPreset::Instant => Self::instant(),
        }
    }
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self::human()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPreset {
    #[default]
    Human,
    Brisk,
    Instant,
}

/// How a chapter-completion call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    Completed { rounds: u32 },
    /// A guard ran out before the page settled
    Stalled { rounds: u32, elapsed: Duration },
}

impl ScrollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScrollOutcome::Completed { .. })
    }
}

/// Working state of one chapter-completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollState {
    pub last_measured_height: f64,
    pub current_offset: f64,
    pub stall_count: u32,
}

pub struct ScrollCompletionDetector {
    policy: ScrollPolicy,
    pause: Arc<dyn Pause>,
    log: ScopedLog,
}

impl ScrollCompletionDetector {
    pub fn new(policy: ScrollPolicy, pause: Arc<dyn Pause>, log: ScopedLog) -> Self {
        Self { policy, pause, log }
    }

    pub fn policy(&self) -> &ScrollPolicy {
        &self.policy
    }

    /// Scroll `page` until the chapter is judged fully traversed
    pub async fn read_through(&self, page: &dyn PageHandle) -> Result<ScrollOutcome, BrowserError> {
        let started = Instant::now();
        let mut state = ScrollState {
            last_measured_height: page.evaluate_number(scripts::DOCUMENT_HEIGHT).await?,
            ..ScrollState::default()
        };
        let mut steps_since_nudge = 0u32;
        let mut nudge_at = self.policy.nudge_every.sample();

        for round in 1..=self.policy.max_rounds {
            while state.current_offset < state.last_measured_height {
                self.scroll(page, self.policy.step_px).await?;
                state.current_offset += self.policy.step_px as f64;
                self.pause.pause(self.policy.step_delay.sample()).await;

                steps_since_nudge += 1;
                if steps_since_nudge >= nudge_at {
                    self.nudge(page).await?;
                    steps_since_nudge = 0;
                    nudge_at = self.policy.nudge_every.sample();
                }

                if started.elapsed() > self.policy.max_duration {
                    return Ok(self.stalled(round, started));
                }
            }

            self.sweep(page).await?;

            let height = page.evaluate_number(scripts::DOCUMENT_HEIGHT).await?;
            let bottom = page.evaluate_number(scripts::VIEWPORT_BOTTOM).await?;
            self.log.debug(format_args!(
                "Round {}: height {} (was {}), viewport bottom {}",
                round, height, state.last_measured_height, bottom
            ));

            if height <= state.last_measured_height {
                state.stall_count += 1;
            } else {
                state.stall_count = 0;
            }

            if height - bottom <= self.policy.tolerance_px
                || state.stall_count >= self.policy.stall_rounds
            {
                return Ok(ScrollOutcome::Completed { rounds: round });
            }

            state.current_offset = state.last_measured_height;
            state.last_measured_height = height.max(state.last_measured_height);

            if started.elapsed() > self.policy.max_duration {
                return Ok(self.stalled(round, started));
            }
        }

        Ok(self.stalled(self.policy.max_rounds, started))
    }

    async fn scroll(&self, page: &dyn PageHandle, delta_px: i64) -> Result<(), BrowserError> {
        page.evaluate(&scripts::scroll_by(delta_px)).await?;
        Ok(())
    }

    /// Small step back and forth, the way a reader re-checks a panel
    async fn nudge(&self, page: &dyn PageHandle) -> Result<(), BrowserError> {
        self.pause.pause(self.policy.nudge_pause.sample()).await;
        for delta in [-100, -100, 200] {
            self.scroll(page, delta).await?;
            self.pause.pause(self.policy.nudge_delay.sample()).await;
        }
        Ok(())
    }

    /// Sweep up then down so images above and below the fold get loaded
    async fn sweep(&self, page: &dyn PageHandle) -> Result<(), BrowserError> {
        for direction in [-1, 1] {
            for _ in 0..self.policy.sweep_steps.sample() {
                self.scroll(page, direction * self.policy.step_px).await?;
                self.pause.pause(self.policy.step_delay.sample()).await;
            }
        }
        Ok(())
    }

    fn stalled(&self, rounds: u32, started: Instant) -> ScrollOutcome {
        let elapsed = started.elapsed();
        self.log.warn(format_args!(
            "Chapter did not settle after {} rounds ({:?})",
            rounds, elapsed
        ));
        ScrollOutcome::Stalled { rounds, elapsed }
    }
}
