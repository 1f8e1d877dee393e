//! Sliding-window compaction of a session's event log.
//!
//! Invocations are ordered by their latest event. Once `interval` invocations
//! have completed since the last compaction, the window from `overlap`
//! invocations before the first new one through the newest is summarized into
//! one compaction event. Raw events stay in the log; history reconstruction
//! substitutes the summary for them.

pub mod summarizer;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::context::new_invocation_id;
use crate::agent_loop::history::apply_rewinds;
use crate::error::BraidError;
use crate::session::Session;
use crate::types::{Content, Event, EventActions, EventCompaction, Part, Role, USER_AUTHOR};

pub use summarizer::{render_transcript, ModelSummarizer, Summarizer};

pub const DEFAULT_COMPACTION_INTERVAL: usize = 10;
pub const DEFAULT_COMPACTION_OVERLAP: usize = 2;

/// Summarizer-free compaction knobs, as loaded from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSettings {
    pub enabled: bool,
    pub interval: usize,
    pub overlap: usize,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_COMPACTION_INTERVAL,
            overlap: DEFAULT_COMPACTION_OVERLAP,
        }
    }
}

impl CompactionSettings {
    pub fn validate(&self) -> Result<(), BraidError> {
        if self.interval == 0 {
            return Err(BraidError::Configuration(
                "compaction interval must be greater than zero".into(),
            ));
        }
        if self.overlap >= self.interval {
            return Err(BraidError::Configuration(format!(
                "compaction overlap ({}) must be smaller than the interval ({})",
                self.overlap, self.interval
            )));
        }
        Ok(())
    }
}

/// Validated settings plus the summarizer that does the work.
#[derive(Clone)]
pub struct CompactionConfig {
    settings: CompactionSettings,
    summarizer: Arc<dyn Summarizer>,
}

impl CompactionConfig {
    pub fn new(
        interval: usize,
        overlap: usize,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, BraidError> {
        let settings = CompactionSettings {
            enabled: true,
            interval,
            overlap,
        };
        Self::from_settings(settings, summarizer)
    }

    pub fn from_settings(
        settings: CompactionSettings,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, BraidError> {
        settings.validate()?;
        Ok(Self {
            settings,
            summarizer,
        })
    }

    pub fn settings(&self) -> CompactionSettings {
        self.settings
    }
}

impl fmt::Debug for CompactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompactionConfig")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Removes a session from the in-progress set when a pass ends.
struct PassGuard<'a> {
    running: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Runs compaction passes, at most one per session at a time.
#[derive(Debug)]
pub struct CompactionService {
    config: CompactionConfig,
    running: Mutex<HashSet<String>>,
}

impl CompactionService {
    pub fn new(config: CompactionConfig) -> Self {
        Self {
            config,
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    fn begin_pass(&self, session: &Session) -> Option<PassGuard<'_>> {
        let key = format!("{}/{}/{}", session.app_name(), session.user_id(), session.id());
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(key.clone()) {
            return None;
        }
        Some(PassGuard {
            running: &self.running,
            key,
        })
    }

    /// Compact the session if enough invocations accumulated.
    ///
    /// Returns the appended compaction event, or `None` when nothing was due,
    /// compaction is disabled, or another pass on this session is running.
    pub async fn maybe_compact(&self, session: &Session) -> Result<Option<Event>, BraidError> {
        let settings = self.config.settings;
        if !settings.enabled {
            return Ok(None);
        }
        let Some(_guard) = self.begin_pass(session) else {
            tracing::debug!(session_id = %session.id(), "compaction already running; skipped");
            return Ok(None);
        };

        let log = session.events();
        let Some(window) = select_window(&log, settings.interval, settings.overlap) else {
            return Ok(None);
        };
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Ok(None);
        };
        let (start_timestamp, end_timestamp) = (first.timestamp, last.timestamp);

        tracing::debug!(
            session_id = %session.id(),
            events = window.len(),
            "compacting event window"
        );
        let summary = self.config.summarizer.summarize(&window).await?;

        let marker = Event::new(new_invocation_id(), USER_AUTHOR).with_actions(EventActions {
            compaction: Some(EventCompaction {
                start_timestamp,
                end_timestamp,
                compacted_content: Content::new(Role::Model, vec![Part::text(summary)]),
            }),
            ..Default::default()
        });
        session.append_event(marker.clone());
        Ok(Some(marker))
    }
}

/// Events to summarize, when a pass is due.
pub fn select_window(log: &[Event], interval: usize, overlap: usize) -> Option<Vec<Event>> {
    let events = apply_rewinds(log);
    let last_compacted: Option<DateTime<Utc>> = events
        .iter()
        .filter_map(|event| event.actions.compaction.as_ref())
        .map(|compaction| compaction.end_timestamp)
        .max();

    let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for event in events.iter().copied().filter(|e| !e.is_compaction()) {
        let entry = latest
            .entry(event.invocation_id.as_str())
            .or_insert(event.timestamp);
        if event.timestamp > *entry {
            *entry = event.timestamp;
        }
    }
    let mut invocations: Vec<(&str, DateTime<Utc>)> = latest.into_iter().collect();
    invocations.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let first_new = invocations
        .iter()
        .position(|(_, ts)| last_compacted.map_or(true, |end| *ts > end))?;
    let new_count = invocations.len() - first_new;
    if new_count < interval {
        return None;
    }

    let start = first_new.saturating_sub(overlap);
    let included: HashSet<&str> = invocations[start..].iter().map(|(id, _)| *id).collect();
    let window: Vec<Event> = events
        .into_iter()
        .filter(|event| !event.is_compaction() && included.contains(event.invocation_id.as_str()))
        .cloned()
        .collect();
    (!window.is_empty()).then_some(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(invocations: usize) -> Session {
        let session = Session::new("app", "u", "s");
        for n in 0..invocations {
            let inv = format!("inv-{n}");
            session.append_event(Event::new(&inv, USER_AUTHOR).with_content(Content::user(format!("q{n}"))));
            session.append_event(Event::new(&inv, "agent").with_content(Content::model(format!("a{n}"))));
        }
        session
    }

    fn invocation_ids(window: &[Event]) -> Vec<String> {
        let mut ids: Vec<String> = window.iter().map(|e| e.invocation_id.clone()).collect();
        ids.dedup();
        ids
    }

    #[test]
    fn settings_validation() {
        assert!(CompactionSettings { enabled: true, interval: 0, overlap: 0 }.validate().is_err());
        assert!(CompactionSettings { enabled: true, interval: 3, overlap: 3 }.validate().is_err());
        assert!(CompactionSettings { enabled: true, interval: 3, overlap: 2 }.validate().is_ok());
    }

    #[test]
    fn window_waits_for_interval() {
        let session = session_with(2);
        assert!(select_window(&session.events(), 3, 1).is_none());
        let session = session_with(3);
        let window = select_window(&session.events(), 3, 1).unwrap();
        assert_eq!(invocation_ids(&window), vec!["inv-0", "inv-1", "inv-2"]);
    }

    #[test]
    fn window_reaches_back_by_overlap_after_a_compaction() {
        let session = session_with(3);
        let first = select_window(&session.events(), 3, 1).unwrap();
        let end = first.last().unwrap().timestamp;
        session.append_event(Event::new("c-1", USER_AUTHOR).with_actions(EventActions {
            compaction: Some(EventCompaction {
                start_timestamp: first[0].timestamp,
                end_timestamp: end,
                compacted_content: Content::model("s1"),
            }),
            ..Default::default()
        }));
        for n in 3..5 {
            let inv = format!("inv-{n}");
            session.append_event(Event::new(&inv, USER_AUTHOR).with_content(Content::user("q")));
        }
        assert!(select_window(&session.events(), 3, 1).is_none());

        session.append_event(Event::new("inv-5", USER_AUTHOR).with_content(Content::user("q")));
        let window = select_window(&session.events(), 3, 1).unwrap();
        assert_eq!(invocation_ids(&window), vec!["inv-2", "inv-3", "inv-4", "inv-5"]);
    }
}
