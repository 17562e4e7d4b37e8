//! Two-generation rank history for tracked teams.
//!
//! `current` is refreshed per event during a results pass; `rotate` copies it
//! over `previous` once the whole pass is done, so movement is always relative
//! to the prior pass rather than the prior tick.

use frc_watch_core::{RankEntry, TeamNumber, TrackedTeams};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMovement {
    Up,
    Down,
    Unchanged,
    Unknown,
}

impl RankMovement {
    /// Lower rank number is better.
    pub fn between(previous: Option<u32>, current: Option<u32>) -> Self {
        match (previous, current) {
            (Some(before), Some(now)) if now < before => RankMovement::Up,
            (Some(before), Some(now)) if now > before => RankMovement::Down,
            (Some(_), Some(_)) => RankMovement::Unchanged,
            _ => RankMovement::Unknown,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            RankMovement::Up => "🔼",
            RankMovement::Down => "🔽",
            RankMovement::Unchanged => "➡️",
            RankMovement::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Default)]
pub struct RankHistory {
    previous: HashMap<TeamNumber, u32>,
    current: HashMap<TeamNumber, u32>,
    generation: u64,
}

impl RankHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record fresh ranks for the tracked teams found in `entries`.
    pub fn refresh(&mut self, tracked: &TrackedTeams, entries: &[RankEntry]) {
        for entry in entries.iter().filter(|e| tracked.contains(&e.team)) {
            self.current.insert(entry.team.clone(), entry.rank);
        }
    }

    /// End of a results pass: `previous` becomes a copy of `current`.
    pub fn rotate(&mut self) {
        self.previous = self.current.clone();
        self.generation += 1;
    }

    pub fn current(&self, team: &str) -> Option<u32> {
        self.current.get(team).copied()
    }

    pub fn previous(&self, team: &str) -> Option<u32> {
        self.previous.get(team).copied()
    }

    pub fn movement(&self, team: &str) -> RankMovement {
        RankMovement::between(self.previous(team), self.current(team))
    }

    /// Completed rotations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
