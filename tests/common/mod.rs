//! Scripted browser pages and helpers shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use manga_card_reader::browser::BrowserError;
use manga_card_reader::pacing::Pause;
use manga_card_reader::page::{scripts, ElementHandle, PageHandle, PageOpener};
use manga_card_reader::rewards::DEFAULT_REWARD_MARKER;
use manga_card_reader::run_log::{RunLog, ScopedLog};
use serde_json::Value;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn test_log(component: &'static str) -> ScopedLog {
    RunLog::with_id("test").scoped(component)
}

/// How the document height evolves across readings
#[derive(Debug, Clone)]
pub enum HeightModel {
    /// Successive readings; the last value repeats
    Sequence(Vec<f64>),
    /// Grows by `step` on every reading, forever
    Growing { start: f64, step: f64 },
}

/// Answer to one next-chapter lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeReply {
    Present,
    Absent,
    Error,
}

/// Ordered record of what happened, with the queue file as it stood then
#[derive(Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<(String, Option<String>)>>>,
    queue: Option<PathBuf>,
}

impl Timeline {
    pub fn watching(queue: PathBuf) -> Self {
        Self {
            events: Arc::default(),
            queue: Some(queue),
        }
    }

    pub fn record(&self, label: &str) {
        let snapshot = self
            .queue
            .as_ref()
            .map(|path| fs::read_to_string(path).unwrap_or_default());
        self.events
            .lock()
            .unwrap()
            .push((label.to_string(), snapshot));
    }

    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Queue contents at each occurrence of `label`
    pub fn queue_at(&self, label: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .filter_map(|(_, q)| q.clone())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PageScript {
    pub heights: HeightModel,
    pub viewport: f64,
    pub probes: Vec<ProbeReply>,
    pub location: Option<String>,
    /// Successive `content()` results; the last repeats
    pub contents: Vec<String>,
    pub anchors: Vec<Vec<String>>,
    /// Every click errors out
    pub broken_clicks: bool,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            heights: HeightModel::Sequence(vec![3000.0, 5000.0, 5000.0]),
            viewport: 800.0,
            probes: vec![ProbeReply::Absent],
            location: None,
            contents: vec![String::new()],
            anchors: Vec::new(),
            broken_clicks: false,
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    height_reads: usize,
    current_height: f64,
    scroll_y: f64,
    probes: usize,
    clicks: usize,
    reloads: usize,
    closes: usize,
    content_reads: usize,
    anchor_reads: usize,
    navigations: Vec<String>,
    evaluations: Vec<String>,
}

/// A page that answers from a script and counts what was done to it.
/// Clones share state, so a test can keep one and hand another out.
#[derive(Clone)]
pub struct MockPage {
    script: Arc<PageScript>,
    state: Arc<Mutex<PageState>>,
    timeline: Timeline,
}

impl MockPage {
    pub fn new(script: PageScript) -> Self {
        Self::with_timeline(script, Timeline::default())
    }

    pub fn with_timeline(script: PageScript, timeline: Timeline) -> Self {
        Self {
            script: Arc::new(script),
            state: Arc::default(),
            timeline,
        }
    }

    /// Notifications page whose successive reloads show these reward counts
    pub fn notifications(counts: &[usize]) -> Self {
        Self::new(PageScript {
            contents: counts.iter().map(|&n| notifications_html(n)).collect(),
            ..PageScript::default()
        })
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    pub fn probes(&self) -> usize {
        self.state.lock().unwrap().probes
    }

    pub fn reloads(&self) -> usize {
        self.state.lock().unwrap().reloads
    }

    pub fn height_reads(&self) -> usize {
        self.state.lock().unwrap().height_reads
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn evaluations_matching(&self, expression: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .evaluations
            .iter()
            .filter(|e| e.as_str() == expression)
            .count()
    }

    fn next_height(&self, state: &mut PageState) -> f64 {
        let height = match &self.script.heights {
            HeightModel::Sequence(values) => {
                let idx = state.height_reads.min(values.len().saturating_sub(1));
                values.get(idx).copied().unwrap_or(0.0)
            }
            HeightModel::Growing { start, step } => start + step * state.height_reads as f64,
        };
        state.height_reads += 1;
        state.current_height = height;
        height
    }
}

pub fn notifications_html(rewards: usize) -> String {
    let mut html = String::from("<html><body><ul>");
    html.push_str("<li>Новая глава вышла</li>");
    for i in 0..rewards {
        html.push_str(&format!("<li>{} #{}</li>", DEFAULT_REWARD_MARKER, i));
    }
    html.push_str("</ul></body></html>");
    html
}

#[async_trait]
impl PageHandle for MockPage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.scroll_y = 0.0;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.evaluations.push(expression.to_string());

        if expression == scripts::DOCUMENT_HEIGHT {
            return Ok(Value::from(self.next_height(&mut state)));
        }
        if expression == scripts::VIEWPORT_BOTTOM {
            return Ok(Value::from(state.scroll_y + self.script.viewport));
        }
        if expression == scripts::LOCATION {
            return Ok(self
                .script
                .location
                .clone()
                .map(Value::from)
                .unwrap_or(Value::Null));
        }
        if let Some(delta) = expression
            .strip_prefix("window.scrollBy(0, ")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let delta: f64 = delta.trim().parse().map_err(|_| {
                BrowserError::JavaScriptError(format!("bad scroll delta in {}", expression))
            })?;
            let max_y = (state.current_height - self.script.viewport).max(0.0);
            state.scroll_y = (state.scroll_y + delta).clamp(0.0, max_y);
            return Ok(Value::Null);
        }
        Ok(Value::Null)
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<ElementHandle>, BrowserError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            let idx = state.probes.min(self.script.probes.len().saturating_sub(1));
            state.probes += 1;
            self.script
                .probes
                .get(idx)
                .copied()
                .unwrap_or(ProbeReply::Absent)
        };
        self.timeline.record("probe");

        match reply {
            ProbeReply::Present => Ok(Some(ElementHandle::containing_text(text))),
            ProbeReply::Absent => Ok(None),
            ProbeReply::Error => Err(BrowserError::Timeout(format!("lookup of {}", text))),
        }
    }

    async fn click(&self, _element: &ElementHandle) -> Result<(), BrowserError> {
        {
            let mut state = self.state.lock().unwrap();
            state.clicks += 1;
            state.scroll_y = 0.0;
        }
        self.timeline.record("click");
        if self.script.broken_clicks {
            return Err(BrowserError::ElementNotFound("next chapter link".to_string()));
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.reloads += 1;
        state.scroll_y = 0.0;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.lock().unwrap().closes += 1;
        self.timeline.record("close");
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .content_reads
            .min(self.script.contents.len().saturating_sub(1));
        state.content_reads += 1;
        Ok(self.script.contents.get(idx).cloned().unwrap_or_default())
    }

    async fn anchors(&self) -> Result<Vec<String>, BrowserError> {
        let mut state = self.state.lock().unwrap();
        let idx = state.anchor_reads;
        state.anchor_reads += 1;
        Ok(self.script.anchors.get(idx).cloned().unwrap_or_default())
    }
}

/// Hands out prepared pages in order; fails once they run out
#[derive(Default)]
pub struct MockOpener {
    pages: Mutex<VecDeque<MockPage>>,
    opened: Mutex<Vec<(String, bool)>>,
}

impl MockOpener {
    pub fn with_pages(pages: Vec<MockPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            opened: Mutex::default(),
        }
    }

    pub fn opened(&self) -> Vec<(String, bool)> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageOpener for MockOpener {
    async fn open(&self, url: &str, new_tab: bool) -> Result<Box<dyn PageHandle>, BrowserError> {
        self.opened.lock().unwrap().push((url.to_string(), new_tab));
        let page = self
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BrowserError::TabCreationError(format!("no page for {}", url)))?;
        page.navigate(url).await?;
        Ok(Box::new(page))
    }
}

/// Returns immediately and remembers every pause
#[derive(Clone, Default)]
pub struct RecordingPause {
    pauses: Arc<Mutex<Vec<Duration>>>,
    cooldowns: Arc<Mutex<Vec<Duration>>>,
    timeline: Timeline,
}

impl RecordingPause {
    pub fn with_timeline(timeline: Timeline) -> Self {
        Self {
            timeline,
            ..Self::default()
        }
    }

    pub fn cooldowns(&self) -> Vec<Duration> {
        self.cooldowns.lock().unwrap().clone()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }

    async fn cooldown(&self, duration: Duration) {
        self.cooldowns.lock().unwrap().push(duration);
        self.timeline.record("cooldown");
    }
}
