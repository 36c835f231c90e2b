//! Chapter progression: reads every queued title chapter by chapter.
//!
//! Per title the controller cycles through
//! `Reading → Advancing → (Reading | Cooling | Finished)`:
//!
//! - `Reading` scrolls the open chapter to the end, stores the position and
//!   samples the reward notifications.
//! - `Advancing` looks for the next-chapter control. Found: click, move the
//!   locator one chapter on, reload. Absent: drop the title from the queue.
//!   A lookup that fails is retried with backoff; once retries run out the
//!   title stays queued.
//! - `Cooling` is entered whenever the reward count grew during the cycle,
//!   however the cycle ended, and suspends everything for about an hour
//!   unless the title just finished.

use crate::browser::BrowserError;
use crate::locator::ChapterLocator;
use crate::pacing::{Jitter, Pause};
use crate::page::{ElementHandle, PageHandle, PageOpener};
use crate::queue::{ProgressStore, QueueEntry, QueueError};
use crate::retry::RetryPolicy;
use crate::rewards::{RewardMonitor, RewardSnapshot};
use crate::run_log::ScopedLog;
use crate::scroll::{ScrollCompletionDetector, ScrollOutcome};
use std::sync::Arc;

/// Text of the site's next-chapter link
pub const DEFAULT_NEXT_CHAPTER_TEXT: &str = "След. глава";

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Timing and lookup settings for the controller
#[derive(Debug, Clone)]
pub struct ProgressionSettings {
    pub next_chapter_text: String,
    /// Wait after opening a chapter or clicking through to the next one
    pub settle: Jitter,
    /// Wait between two chapters of the same title
    pub between_chapters: Jitter,
    /// Suspension after a reward
    pub cooldown: Jitter,
    pub probe_retry: RetryPolicy,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            next_chapter_text: DEFAULT_NEXT_CHAPTER_TEXT.to_string(),
            settle: Jitter::secs(3, 5),
            between_chapters: Jitter::secs(1, 3),
            cooldown: Jitter::secs(3605, 3615),
            probe_retry: RetryPolicy::default(),
        }
    }
}

/// Result of looking for the next-chapter control
#[derive(Debug)]
pub enum ProbeOutcome {
    Found(ElementHandle),
    /// The page answered and has no such control
    Absent,
    /// Every attempt failed; says nothing about whether more chapters exist
    Failed(BrowserError),
}

/// How reading a title ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    /// No next chapter; the title left the queue
    Finished,
    /// A chapter never settled; the title stays queued
    Stalled,
    /// The next-chapter lookup kept failing; the title stays queued
    Interrupted,
    /// A browser error ended the title early; the title stays queued
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TitleReport {
    pub position: usize,
    pub started_at: ChapterLocator,
    pub last_locator: ChapterLocator,
    pub outcome: TitleOutcome,
    pub chapters_read: u32,
    pub cooldowns: u32,
    pub rewards: u64,
    pub reward_baseline: RewardSnapshot,
}

impl TitleReport {
    fn new(entry: &QueueEntry) -> Self {
        Self {
            position: entry.position,
            started_at: entry.locator.clone(),
            last_locator: entry.locator.clone(),
            outcome: TitleOutcome::Interrupted,
            chapters_read: 0,
            cooldowns: 0,
            rewards: 0,
            reward_baseline: RewardSnapshot::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub titles: Vec<TitleReport>,
}

impl RunSummary {
    pub fn chapters_read(&self) -> u32 {
        self.titles.iter().map(|t| t.chapters_read).sum()
    }

    pub fn rewards(&self) -> u64 {
        self.titles.iter().map(|t| t.rewards).sum()
    }

    pub fn cooldowns(&self) -> u32 {
        self.titles.iter().map(|t| t.cooldowns).sum()
    }

    pub fn finished(&self) -> usize {
        self.titles
            .iter()
            .filter(|t| t.outcome == TitleOutcome::Finished)
            .count()
    }
}

enum Phase {
    Reading,
    Advancing { fresh: RewardSnapshot },
    Cooling { fresh: RewardSnapshot, then: Step },
    Done(TitleOutcome),
}

/// Where a cycle goes once its rewards are accounted for
enum Step {
    NextChapter,
    /// The title left the queue; a reward here needs no cooldown
    Finished,
    Stop(TitleOutcome),
    Broken(BrowserError),
}

pub struct ChapterProgressionController {
    opener: Arc<dyn PageOpener>,
    store: ProgressStore,
    monitor: RewardMonitor,
    detector: ScrollCompletionDetector,
    pause: Arc<dyn Pause>,
    settings: ProgressionSettings,
    log: ScopedLog,
}

impl ChapterProgressionController {
    pub fn new(
        opener: Arc<dyn PageOpener>,
        store: ProgressStore,
        monitor: RewardMonitor,
        detector: ScrollCompletionDetector,
        pause: Arc<dyn Pause>,
        settings: ProgressionSettings,
        log: ScopedLog,
    ) -> Self {
        Self {
            opener,
            store,
            monitor,
            detector,
            pause,
            settings,
            log,
        }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Read every title in the queue, in order.
    ///
    /// Browser failures end only the title they happen in; queue failures
    /// end the run.
    pub async fn run(&mut self) -> Result<RunSummary, ProgressionError> {
        let queue = self.store.load()?;
        let mut summary = RunSummary::default();

        for entry in queue {
            self.log.info(format_args!(
                "Reading title at position {} from {}",
                entry.position, entry.locator
            ));
            let report = self.read_title(&entry).await?;
            self.log.info(format_args!(
                "Position {} ended {:?} after {} chapters at {}",
                report.position, report.outcome, report.chapters_read, report.last_locator
            ));
            summary.titles.push(report);
        }

        Ok(summary)
    }

    /// `run`, then release the notifications page whatever the result
    pub async fn run_and_close(mut self) -> Result<RunSummary, ProgressionError> {
        let result = self.run().await;
        self.shutdown().await;
        result
    }

    /// Release the notifications page
    pub async fn shutdown(self) {
        if let Err(e) = self.monitor.close().await {
            self.log
                .warn(format_args!("Closing the notifications page failed: {}", e));
        }
    }

    /// Read one title until it finishes or cannot go on
    pub async fn read_title(&mut self, entry: &QueueEntry) -> Result<TitleReport, ProgressionError> {
        let mut report = TitleReport::new(entry);

        let page = match self.opener.open(&entry.locator.to_string(), true).await {
            Ok(page) => page,
            Err(e) => {
                self.log
                    .error(format_args!("Could not open {}: {}", entry.locator, e));
                report.outcome = TitleOutcome::Failed(e.to_string());
                return Ok(report);
            }
        };
        self.pause.pause(self.settings.settle.sample()).await;

        let result = self.drive_title(entry, page.as_ref(), &mut report).await;

        if let Err(e) = page.close().await {
            self.log
                .warn(format_args!("Closing {} failed: {}", report.last_locator, e));
        }

        match result {
            Ok(outcome) => report.outcome = outcome,
            Err(ProgressionError::Browser(e)) => {
                self.log.error(format_args!(
                    "Browser error while reading {}: {}",
                    report.last_locator, e
                ));
                report.outcome = TitleOutcome::Failed(e.to_string());
            }
            Err(e) => return Err(e),
        }
        Ok(report)
    }

    async fn drive_title(
        &mut self,
        entry: &QueueEntry,
        page: &dyn PageHandle,
        report: &mut TitleReport,
    ) -> Result<TitleOutcome, ProgressionError> {
        let mut locator = entry.locator.clone();
        let mut baseline = self.monitor.sample().await?;
        report.reward_baseline = baseline;
        let mut phase = Phase::Reading;

        loop {
            phase = match phase {
                Phase::Reading => match self.detector.read_through(page).await? {
                    ScrollOutcome::Stalled { rounds, .. } => {
                        self.log.warn(format_args!(
                            "Leaving {} queued, chapter did not settle in {} rounds",
                            locator, rounds
                        ));
                        let fresh = self.monitor.sample().await?;
                        if self.monitor.delta(&baseline, &fresh) > 0 {
                            Phase::Cooling {
                                fresh,
                                then: Step::Stop(TitleOutcome::Stalled),
                            }
                        } else {
                            Phase::Done(TitleOutcome::Stalled)
                        }
                    }
                    ScrollOutcome::Completed { rounds } => {
                        report.chapters_read += 1;
                        locator = self.observed_locator(page, locator).await;
                        self.store.update(entry.position, &locator)?;
                        report.last_locator = locator.clone();
                        self.log.debug(format_args!(
                            "Finished chapter {} in {} rounds",
                            locator, rounds
                        ));

                        let fresh = self.monitor.sample().await?;
                        Phase::Advancing { fresh }
                    }
                },

                Phase::Advancing { fresh } => {
                    let rewarded = self.monitor.delta(&baseline, &fresh) > 0;
                    let step = self.advance(entry, page, &mut locator).await?;

                    if rewarded {
                        Phase::Cooling { fresh, then: step }
                    } else {
                        match step {
                            Step::NextChapter => {
                                self.pause
                                    .pause(self.settings.between_chapters.sample())
                                    .await;
                                Phase::Reading
                            }
                            Step::Finished => Phase::Done(TitleOutcome::Finished),
                            Step::Stop(outcome) => Phase::Done(outcome),
                            Step::Broken(e) => return Err(e.into()),
                        }
                    }
                }

                Phase::Cooling { fresh, then } => {
                    report.rewards += fresh.delta_since(&baseline);
                    baseline = fresh;
                    report.reward_baseline = baseline;

                    if let Step::Finished = then {
                        self.log.info(format_args!(
                            "New card received as {} finished, no cooldown needed",
                            locator
                        ));
                        Phase::Done(TitleOutcome::Finished)
                    } else {
                        let duration = self.settings.cooldown.sample();
                        self.log.info(format_args!(
                            "New card received, cooling down for {:?}",
                            duration
                        ));
                        self.pause.cooldown(duration).await;
                        report.cooldowns += 1;

                        match then {
                            Step::NextChapter => {
                                page.reload().await?;
                                Phase::Reading
                            }
                            Step::Finished => Phase::Done(TitleOutcome::Finished),
                            Step::Stop(outcome) => Phase::Done(outcome),
                            Step::Broken(e) => return Err(e.into()),
                        }
                    }
                }

                Phase::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// Move to the next chapter, or say why the title cannot go on.
    /// Browser failures come back as `Step::Broken` so the cycle's rewards
    /// are still handled; only queue errors propagate.
    async fn advance(
        &mut self,
        entry: &QueueEntry,
        page: &dyn PageHandle,
        locator: &mut ChapterLocator,
    ) -> Result<Step, ProgressionError> {
        let control = match self.probe_next_chapter(page).await {
            ProbeOutcome::Found(control) => control,
            ProbeOutcome::Absent => {
                self.log.info(format_args!("No chapters after {}", locator));
                self.store.remove(entry.position)?;
                return Ok(Step::Finished);
            }
            ProbeOutcome::Failed(e) => {
                self.log.warn(format_args!(
                    "Giving up on {} for this run, next-chapter lookup kept failing: {}",
                    locator, e
                ));
                return Ok(Step::Stop(TitleOutcome::Interrupted));
            }
        };

        let upcoming = match locator.next() {
            Ok(upcoming) => upcoming,
            Err(e) => {
                self.log
                    .error(format_args!("Cannot move past {}: {}", locator, e));
                return Ok(Step::Stop(TitleOutcome::Failed(e.to_string())));
            }
        };

        if let Err(e) = page.click(&control).await {
            return Ok(Step::Broken(e));
        }
        *locator = upcoming;
        self.log
            .debug(format_args!("Moving on to chapter {}", locator));
        self.pause.pause(self.settings.settle.sample()).await;
        if let Err(e) = page.reload().await {
            return Ok(Step::Broken(e));
        }
        Ok(Step::NextChapter)
    }

    /// Look for the next-chapter control, retrying lookups that fail
    async fn probe_next_chapter(&self, page: &dyn PageHandle) -> ProbeOutcome {
        let retry = &self.settings.probe_retry;
        let mut attempt = 0;
        loop {
            let error = match page.find_by_text(&self.settings.next_chapter_text).await {
                Ok(Some(control)) => return ProbeOutcome::Found(control),
                Ok(None) => return ProbeOutcome::Absent,
                Err(e) => e,
            };

            if attempt >= retry.max_retries {
                return ProbeOutcome::Failed(error);
            }

            let delay = retry.delay_for(attempt);
            self.log.warn(format_args!(
                "Next-chapter lookup failed, attempt {}/{}: {}; retrying in {:?}",
                attempt + 1,
                retry.attempts(),
                error,
                delay
            ));
            self.pause.pause(delay).await;
            attempt += 1;
        }
    }

    /// Prefer the address the page reports when it belongs to the same title
    async fn observed_locator(
        &self,
        page: &dyn PageHandle,
        expected: ChapterLocator,
    ) -> ChapterLocator {
        let url = match page.current_url().await {
            Ok(Some(url)) => url,
            Ok(None) => return expected,
            Err(e) => {
                self.log
                    .debug(format_args!("Could not read page address: {}", e));
                return expected;
            }
        };

        match ChapterLocator::parse(&url) {
            Ok(seen) if seen.same_title(&expected) => {
                if seen != expected {
                    self.log.debug(format_args!(
                        "Page reports {} instead of {}",
                        seen, expected
                    ));
                }
                seen
            }
            _ => expected,
        }
    }
}
