//! Record of which notifications have already gone out.
//!
//! Sets only ever grow. Once `(event, label, kind)` is marked it stays marked
//! for the process lifetime, which is what keeps every notification kind
//! at-most-once per match.

use std::collections::{HashMap, HashSet};

/// The three notifications a match can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    AboutToPlay,
    StartingNow,
    Result,
}

#[derive(Debug, Default)]
struct EventSeen {
    about_to_play: HashSet<String>,
    starting_now: HashSet<String>,
    results: HashSet<String>,
    high_water_mark: u32,
}

impl EventSeen {
    fn set(&self, kind: NotifyKind) -> &HashSet<String> {
        match kind {
            NotifyKind::AboutToPlay => &self.about_to_play,
            NotifyKind::StartingNow => &self.starting_now,
            NotifyKind::Result => &self.results,
        }
    }

    fn set_mut(&mut self, kind: NotifyKind) -> &mut HashSet<String> {
        match kind {
            NotifyKind::AboutToPlay => &mut self.about_to_play,
            NotifyKind::StartingNow => &mut self.starting_now,
            NotifyKind::Result => &mut self.results,
        }
    }
}

/// Per-event dedup sets plus the highest completed match number seen.
#[derive(Debug, Default)]
pub struct SeenState {
    events: HashMap<String, EventSeen>,
}

impl SeenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_announced(&self, event: &str, label: &str, kind: NotifyKind) -> bool {
        self.events
            .get(event)
            .map(|seen| seen.set(kind).contains(label))
            .unwrap_or(false)
    }

    /// Idempotent.
    pub fn mark_announced(&mut self, event: &str, label: &str, kind: NotifyKind) {
        self.events
            .entry(event.to_string())
            .or_default()
            .set_mut(kind)
            .insert(label.to_string());
    }

    /// 0 until a completed match has been seen for the event.
    pub fn high_water_mark(&self, event: &str) -> u32 {
        self.events
            .get(event)
            .map(|seen| seen.high_water_mark)
            .unwrap_or(0)
    }

    /// Raise the mark to `n`; a lower `n` leaves it unchanged.
    pub fn advance_high_water_mark(&mut self, event: &str, n: u32) {
        let seen = self.events.entry(event.to_string()).or_default();
        seen.high_water_mark = seen.high_water_mark.max(n);
    }

    pub fn announced_count(&self, event: &str, kind: NotifyKind) -> usize {
        self.events
            .get(event)
            .map(|seen| seen.set(kind).len())
            .unwrap_or(0)
    }
}
