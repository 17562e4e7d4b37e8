//! The poll engine.
//!
//! One task owns all watch state. Each tick runs the upcoming-match phase
//! against the live queue source and then the results phase against the
//! results source. A failure while processing one event is logged and the
//! tick moves on to the next event.

use anyhow::{Context, Result};
use chrono::Utc;
use frc_watch_core::clients::{ChannelDispatcher, LiveQueueSource, PredictionSource, ResultsSource};
use frc_watch_core::{
    EventConfig, LiveMatch, LiveStatus, MatchId, Notification, Prediction, ResultMatch, Side,
    TeamNumber, TrackedTeams,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::formatters::{self, UpcomingMatch};
use crate::rankings::RankHistory;
use crate::seen_state::{NotifyKind, SeenState};

/// The engine's view of the outside world.
#[derive(Clone)]
pub struct Sources {
    pub results: Arc<dyn ResultsSource>,
    pub live: Arc<dyn LiveQueueSource>,
    pub predictions: Arc<dyn PredictionSource>,
    pub dispatcher: Arc<dyn ChannelDispatcher>,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub channel_id: String,
    pub tracked: TrackedTeams,
    pub events: Vec<EventConfig>,
    pub poll_interval: Duration,
    pub announce_when_queuing: bool,
    pub footer: Option<String>,
}

impl From<&Config> for WatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            channel_id: config.announce_channel_id.clone(),
            tracked: config.tracked_teams.clone(),
            events: config.events.clone(),
            poll_interval: config.poll_interval,
            announce_when_queuing: config.announce_when_queuing,
            footer: config.footer.clone(),
        }
    }
}

pub struct ChampWatcher {
    settings: WatchSettings,
    sources: Sources,
    seen: SeenState,
    ranks: RankHistory,
    nicknames: HashMap<TeamNumber, String>,
    /// Events whose backfill has not succeeded yet; no results are announced for them
    pending_backfill: HashSet<String>,
    /// Process start, epoch seconds. Late backfills only seed matches played before it.
    started_at: i64,
}

impl ChampWatcher {
    pub fn new(settings: WatchSettings, sources: Sources) -> Self {
        let pending_backfill = settings
            .events
            .iter()
            .map(|e| e.results_key.clone())
            .collect();
        Self {
            settings,
            sources,
            seen: SeenState::new(),
            ranks: RankHistory::new(),
            nicknames: HashMap::new(),
            pending_backfill,
            started_at: Utc::now().timestamp(),
        }
    }

    /// Override the recorded process start (epoch seconds).
    pub fn with_start_time(mut self, epoch_secs: i64) -> Self {
        self.started_at = epoch_secs;
        self
    }

    pub fn seen(&self) -> &SeenState {
        &self.seen
    }

    pub fn ranks(&self) -> &RankHistory {
        &self.ranks
    }

    /// Check the chat connection and the destination channel. Either failing
    /// is fatal: polling must not start.
    pub async fn connect(&self) -> Result<()> {
        let bot = self
            .sources
            .dispatcher
            .ready()
            .await
            .context("Chat connection is not ready")?;
        info!("Connected to chat as {}", bot);

        let channel = self
            .sources
            .dispatcher
            .resolve_channel(&self.settings.channel_id)
            .await
            .with_context(|| {
                format!("Couldn't find announce channel {}", self.settings.channel_id)
            })?;
        info!("Announcing to #{} ({})", channel, self.settings.channel_id);
        Ok(())
    }

    // ========================================================================
    // Backfill
    // ========================================================================

    /// Seed the result sets from matches completed before start, without
    /// sending anything, then seed the rank history.
    pub async fn backfill(&mut self) {
        info!("Marking existing played matches...");
        let events = self.settings.events.clone();
        for event in &events {
            if let Err(e) = self.backfill_event(event, None).await {
                warn!("Backfill failed for {}: {:#}", event.results_key, e);
            }
        }
        self.ranks.rotate();
    }

    /// With `played_before` set, completed matches with a later actual time
    /// are left for the results phase to announce.
    async fn backfill_event(&mut self, event: &EventConfig, played_before: Option<i64>) -> Result<()> {
        let key = event.results_key.as_str();
        let matches = self
            .sources
            .results
            .event_matches_simple(key)
            .await
            .with_context(|| format!("results fetch for {}", key))?;

        let mut played = 0usize;
        let historical = |m: &ResultMatch| match (played_before, m.actual_time) {
            (Some(cutoff), Some(at)) => at <= cutoff,
            _ => true,
        };
        for m in matches.iter().filter(|m| m.is_completed() && historical(*m)) {
            self.seen.mark_announced(key, &m.key, NotifyKind::Result);
            self.seen.advance_high_water_mark(key, m.match_number);
            played += 1;
        }
        self.pending_backfill.remove(key);

        if played == 0 {
            info!(" {}: No played matches yet", key);
        } else {
            info!(
                " {}: {} played matches seen (high-water mark {})",
                key,
                played,
                self.seen.high_water_mark(key)
            );
        }

        self.refresh_ranks(key).await;
        Ok(())
    }

    // ========================================================================
    // Loop
    // ========================================================================

    /// Poll until `shutdown` flips to true. A tick that has started always
    /// runs to completion.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watch loop started (interval: {}s, events: {}, teams: {})",
            self.settings.poll_interval.as_secs(),
            self.settings.events.len(),
            self.settings.tracked.len()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now().timestamp_millis()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, stopping watch loop");
                        break;
                    }
                }
            }
        }
    }

    /// One poll: upcoming matches first, then results.
    pub async fn tick(&mut self, now_ms: i64) {
        info!("--- poll tick ---");
        self.poll_upcoming(now_ms).await;
        self.poll_results().await;
    }

    // ========================================================================
    // Upcoming matches
    // ========================================================================

    pub async fn poll_upcoming(&mut self, now_ms: i64) {
        debug!("Checking upcoming matches");
        let events = self.settings.events.clone();
        for event in &events {
            if let Err(e) = self.upcoming_for_event(event, now_ms).await {
                warn!("Error polling live queue for {}: {:#}", event.live_key, e);
            }
        }
    }

    async fn upcoming_for_event(&mut self, event: &EventConfig, now_ms: i64) -> Result<()> {
        let matches = self
            .sources
            .live
            .event_queue(&event.live_key)
            .await
            .with_context(|| format!("live queue fetch for {}", event.live_key))?;
        debug!(" {}: {} matches received", event.live_key, matches.len());

        for m in &matches {
            self.evaluate_live_match(event, m, now_ms).await;
        }
        Ok(())
    }

    async fn evaluate_live_match(&mut self, event: &EventConfig, m: &LiveMatch, now_ms: i64) {
        let Some(start_ms) = m.estimated_start_ms else {
            debug!("  - Skipping {} (no timing info)", m.label);
            return;
        };
        if start_ms < now_ms {
            debug!("  - Skipping {} (already started)", m.label);
            return;
        }

        let tracked_in = self
            .settings
            .tracked
            .in_roster(m.red_teams.iter().chain(m.blue_teams.iter()));
        let side = Side::of(
            tracked_in.iter().any(|t| m.red_teams.contains(t)),
            tracked_in.iter().any(|t| m.blue_teams.contains(t)),
        );
        let Some(side) = side else {
            debug!("  - Skipping {} (no tracked teams)", m.label);
            return;
        };

        let about_to_start = m.status == LiveStatus::OnDeck
            || (self.settings.announce_when_queuing && m.status == LiveStatus::NowQueuing);
        let live_key = event.live_key.as_str();
        let wants_about = about_to_start
            && !self.seen.was_announced(live_key, &m.label, NotifyKind::AboutToPlay);
        let wants_start = m.status == LiveStatus::OnField
            && !self.seen.was_announced(live_key, &m.label, NotifyKind::StartingNow);
        if !wants_about && !wants_start {
            return;
        }

        let minutes_until = (start_ms - now_ms) / 60_000;
        debug!(
            "  - Tracked match: {} ({}), starts in {} min",
            m.label,
            m.status.as_str(),
            minutes_until
        );

        let match_id = MatchId::from_live_label(&m.label);
        if match_id.is_none() {
            debug!("  - Unrecognised label {:?}; prediction unavailable", m.label);
        }
        let prediction_key = match_id.map(|id| id.prediction_key(&event.results_key));
        let prediction = self
            .prediction_for(&m.status, prediction_key.as_deref())
            .await;

        let mut team_names = Vec::with_capacity(tracked_in.len());
        for team in &tracked_in {
            team_names.push(self.team_name(team).await);
        }

        let upcoming = UpcomingMatch {
            event,
            label: &m.label,
            team_names: &team_names,
            side,
            prediction: &prediction,
            match_id,
            minutes_until,
        };
        let footer = self.settings.footer.as_deref();

        if wants_about {
            let n = formatters::about_to_play(&upcoming, footer);
            if self.dispatch(live_key, &m.label, "about to play", &n).await {
                self.seen.mark_announced(live_key, &m.label, NotifyKind::AboutToPlay);
            }
        }
        if wants_start {
            let n = formatters::starting_now(&upcoming, footer);
            if self.dispatch(live_key, &m.label, "starting now", &n).await {
                self.seen.mark_announced(live_key, &m.label, NotifyKind::StartingNow);
            }
        }
    }

    async fn prediction_for(&self, status: &LiveStatus, prediction_key: Option<&str>) -> Prediction {
        if status.too_early_to_predict() {
            return Prediction::unknown();
        }
        let Some(key) = prediction_key else {
            return Prediction::unknown();
        };
        match self.sources.predictions.match_prediction(key).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Prediction lookup failed for {}: {}", key, e);
                Prediction::unknown()
            }
        }
    }

    /// Nickname, or `#number` when there is none. Lookup failures are not
    /// cached so the next notification tries again.
    async fn team_name(&mut self, team: &str) -> String {
        if let Some(name) = self.nicknames.get(team) {
            return name.clone();
        }
        match self.sources.results.team_nickname(team).await {
            Ok(nickname) => {
                let name = nickname.unwrap_or_else(|| format!("#{}", team));
                self.nicknames.insert(team.to_string(), name.clone());
                name
            }
            Err(e) => {
                warn!("Nickname lookup failed for {}: {}", team, e);
                format!("#{}", team)
            }
        }
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Announce new results for every event, then rotate the rank history.
    pub async fn poll_results(&mut self) {
        debug!("Checking results");
        let events = self.settings.events.clone();
        for event in &events {
            if let Err(e) = self.results_for_event(event).await {
                warn!("Error polling results for {}: {:#}", event.results_key, e);
            }
        }
        self.ranks.rotate();
    }

    async fn results_for_event(&mut self, event: &EventConfig) -> Result<()> {
        let key = event.results_key.as_str();
        if self.pending_backfill.contains(key) {
            info!("Retrying backfill for {}", key);
            self.backfill_event(event, Some(self.started_at)).await?;
        }

        let matches = self
            .sources
            .results
            .event_matches(key)
            .await
            .with_context(|| format!("results fetch for {}", key))?;

        self.refresh_ranks(key).await;

        for m in matches.iter().filter(|m| m.is_completed()) {
            if self.seen.was_announced(key, &m.key, NotifyKind::Result) {
                continue;
            }
            self.announce_result(event, m).await;
        }
        Ok(())
    }

    async fn announce_result(&mut self, event: &EventConfig, m: &ResultMatch) {
        let key = event.results_key.as_str();
        let tracked_in = self.settings.tracked.in_roster(m.all_teams());
        let side = Side::of(
            tracked_in.iter().any(|t| m.red.teams.contains(t)),
            tracked_in.iter().any(|t| m.blue.teams.contains(t)),
        );

        // Untracked matches need no dispatch, so they can be marked right away
        let delivered = match side {
            None => true,
            Some(side) => {
                let n = formatters::result(
                    event,
                    m,
                    &tracked_in,
                    side,
                    &self.ranks,
                    self.settings.footer.as_deref(),
                );
                self.dispatch(key, &m.key, "result", &n).await
            }
        };

        if delivered {
            self.seen.mark_announced(key, &m.key, NotifyKind::Result);
            self.seen.advance_high_water_mark(key, m.match_number);
        }
    }

    async fn refresh_ranks(&mut self, event_key: &str) {
        match self.sources.results.event_rankings(event_key).await {
            Ok(entries) => self.ranks.refresh(&self.settings.tracked, &entries),
            Err(e) => warn!("Failed to fetch rankings for {}: {}", event_key, e),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    async fn dispatch(&self, event_key: &str, label: &str, kind: &str, n: &Notification) -> bool {
        match self
            .sources
            .dispatcher
            .send(&self.settings.channel_id, n)
            .await
        {
            Ok(()) => {
                info!("Announced {} for {} {}", kind, event_key, label);
                true
            }
            Err(e) => {
                warn!(
                    "Dispatch of {} for {} {} failed, will retry next tick: {}",
                    kind, event_key, label, e
                );
                false
            }
        }
    }
}
