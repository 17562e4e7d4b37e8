//! Poll engine scenarios against in-memory sources.

use async_trait::async_trait;
use champ_watch_rust::{ChampWatcher, NotifyKind, Sources, WatchSettings};
use frc_watch_core::clients::{ChannelDispatcher, LiveQueueSource, PredictionSource, ResultsSource};
use frc_watch_core::{
    Alliance, AllianceResult, ClientError, ClientResult, EventConfig, LiveMatch, LiveStatus,
    Notification, Prediction, RankEntry, ResultMatch, TrackedTeams,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_745_000_000_000;
const MINUTE: i64 = 60_000;

fn unavailable(source_name: &'static str, key: &str) -> ClientError {
    ClientError::Status {
        source_name,
        status: 503,
        url: format!("https://example.test/{}", key),
    }
}

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeResults {
    matches: Mutex<HashMap<String, Vec<ResultMatch>>>,
    rankings: Mutex<HashMap<String, Vec<RankEntry>>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeResults {
    fn set_matches(&self, event: &str, matches: Vec<ResultMatch>) {
        self.matches.lock().insert(event.to_string(), matches);
    }

    fn set_rank(&self, event: &str, team: &str, rank: u32) {
        self.rankings.lock().insert(
            event.to_string(),
            vec![RankEntry {
                team: team.to_string(),
                rank,
            }],
        );
    }

    fn fail(&self, event: &str, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(event.to_string());
        } else {
            set.remove(event);
        }
    }

    fn check(&self, event: &str) -> ClientResult<()> {
        if self.failing.lock().contains(event) {
            return Err(unavailable("tba", event));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultsSource for FakeResults {
    async fn event_matches(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>> {
        self.check(event_key)?;
        Ok(self.matches.lock().get(event_key).cloned().unwrap_or_default())
    }

    async fn event_matches_simple(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>> {
        self.event_matches(event_key).await
    }

    async fn event_rankings(&self, event_key: &str) -> ClientResult<Vec<RankEntry>> {
        self.check(event_key)?;
        Ok(self.rankings.lock().get(event_key).cloned().unwrap_or_default())
    }

    async fn team_nickname(&self, team: &str) -> ClientResult<Option<String>> {
        Ok(match team {
            "5987" => Some("Galaxia".to_string()),
            _ => None,
        })
    }
}

#[derive(Default)]
struct FakeLive {
    queues: Mutex<HashMap<String, Vec<LiveMatch>>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeLive {
    fn set_queue(&self, event: &str, matches: Vec<LiveMatch>) {
        self.queues.lock().insert(event.to_string(), matches);
    }
}

#[async_trait]
impl LiveQueueSource for FakeLive {
    async fn event_queue(&self, live_key: &str) -> ClientResult<Vec<LiveMatch>> {
        if self.failing.lock().contains(live_key) {
            return Err(unavailable("nexus", live_key));
        }
        Ok(self.queues.lock().get(live_key).cloned().unwrap_or_default())
    }
}

struct FakePredictions {
    red_win_prob: f64,
    failing: AtomicBool,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
}

impl Default for FakePredictions {
    fn default() -> Self {
        Self {
            red_win_prob: 0.62,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PredictionSource for FakePredictions {
    async fn match_prediction(&self, match_key: &str) -> ClientResult<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().push(match_key.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("statbotics", match_key));
        }
        Ok(Prediction {
            winner: Some(Alliance::Red),
            red_win_prob: self.red_win_prob,
        })
    }
}

#[derive(Default)]
struct FakeChannel {
    sent: Mutex<Vec<Notification>>,
    attempts: AtomicUsize,
    rejecting: AtomicBool,
    missing_channel: AtomicBool,
}

impl FakeChannel {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|n| n.title.clone()).collect()
    }
}

#[async_trait]
impl ChannelDispatcher for FakeChannel {
    async fn ready(&self) -> ClientResult<String> {
        Ok("watch-bot".to_string())
    }

    async fn resolve_channel(&self, channel_id: &str) -> ClientResult<String> {
        if self.missing_channel.load(Ordering::SeqCst) {
            return Err(ClientError::ChannelUnavailable {
                channel_id: channel_id.to_string(),
                detail: "HTTP 404".to_string(),
            });
        }
        Ok("announcements".to_string())
    }

    async fn send(&self, channel_id: &str, notification: &Notification) -> ClientResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(ClientError::Dispatch {
                channel_id: channel_id.to_string(),
                detail: "500 Internal Server Error".to_string(),
            });
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    results: Arc<FakeResults>,
    live: Arc<FakeLive>,
    predictions: Arc<FakePredictions>,
    channel: Arc<FakeChannel>,
    watcher: ChampWatcher,
}

fn dally() -> EventConfig {
    EventConfig::new("2025dal", "2025daly", "DALLY").with_stream("https://twitch.tv/firstinspires_daly")
}

fn curie() -> EventConfig {
    EventConfig::new("2025cur", "2025curie", "CURIE").with_stream("https://twitch.tv/firstinspires_curie")
}

fn harness_with(events: Vec<EventConfig>, announce_when_queuing: bool) -> Harness {
    let results = Arc::new(FakeResults::default());
    let live = Arc::new(FakeLive::default());
    let predictions = Arc::new(FakePredictions::default());
    let channel = Arc::new(FakeChannel::default());

    let settings = WatchSettings {
        channel_id: "1362810453977334001".to_string(),
        tracked: TrackedTeams::new(["5987", "1690"]),
        events,
        poll_interval: Duration::from_secs(30),
        announce_when_queuing,
        footer: Some("#BringThemHome".to_string()),
    };
    let sources = Sources {
        results: results.clone(),
        live: live.clone(),
        predictions: predictions.clone(),
        dispatcher: channel.clone(),
    };

    Harness {
        results,
        live,
        predictions,
        channel,
        watcher: ChampWatcher::new(settings, sources).with_start_time(NOW / 1000),
    }
}

fn harness() -> Harness {
    harness_with(vec![dally()], false)
}

fn qual(event: &str, number: u32, red: [&str; 3], blue: [&str; 3], score: Option<(i64, i64)>) -> ResultMatch {
    let (red_score, blue_score) = score.unwrap_or((-1, -1));
    let winning_alliance = score.and_then(|(r, b)| {
        if r > b {
            Some(Alliance::Red)
        } else if b > r {
            Some(Alliance::Blue)
        } else {
            None
        }
    });
    ResultMatch {
        key: format!("{}_qm{}", event, number),
        event_key: event.to_string(),
        comp_level: "qm".to_string(),
        set_number: 1,
        match_number: number,
        red: AllianceResult {
            teams: red.iter().map(|t| t.to_string()).collect(),
            score: red_score,
            ranking_points: score.map(|_| 3),
        },
        blue: AllianceResult {
            teams: blue.iter().map(|t| t.to_string()).collect(),
            score: blue_score,
            ranking_points: score.map(|_| 1),
        },
        winning_alliance,
        actual_time: score.map(|_| NOW / 1000),
    }
}

fn live(label: &str, status: LiveStatus, red: [&str; 3], blue: [&str; 3], start_ms: Option<i64>) -> LiveMatch {
    LiveMatch {
        label: label.to_string(),
        status,
        red_teams: red.iter().map(|t| t.to_string()).collect(),
        blue_teams: blue.iter().map(|t| t.to_string()).collect(),
        estimated_start_ms: start_ms,
    }
}

const TRACKED_RED: [&str; 3] = ["5987", "254", "1114"];
const OTHERS: [&str; 3] = ["118", "2056", "4414"];

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_end_to_end_championship_match() {
    let mut h = harness();
    h.results.set_matches(
        "2025dal",
        vec![
            qual("2025dal", 1, ["1", "2", "3"], ["4", "5", "6"], Some((50, 40))),
            qual("2025dal", 2, ["7", "8", "9"], ["10", "11", "12"], Some((20, 60))),
            qual("2025dal", 3, ["13", "14", "15"], ["16", "17", "18"], Some((33, 30))),
            qual("2025dal", 12, TRACKED_RED, OTHERS, None),
        ],
    );

    h.watcher.connect().await.unwrap();
    h.watcher.backfill().await;

    assert_eq!(h.watcher.seen().announced_count("2025dal", NotifyKind::Result), 3);
    assert_eq!(h.watcher.seen().high_water_mark("2025dal"), 3);
    assert!(h.channel.sent().is_empty());

    // On deck, five minutes out
    h.live.set_queue(
        "2025daly",
        vec![live("Qualification 12", LiveStatus::OnDeck, TRACKED_RED, OTHERS, Some(NOW + 5 * MINUTE))],
    );
    h.watcher.tick(NOW).await;
    h.watcher.tick(NOW + 10_000).await;

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "🛫 DALLY - Qualification 12");
    assert!(sent[0].body.contains("**Galaxia**"));
    assert!(sent[0].body.contains("🔴 Red Alliance"));
    assert!(sent[0].body.contains("62.0%"));
    assert!(sent[0].body.contains("**5 min**"));
    assert_eq!(h.predictions.keys.lock().clone(), vec!["2025dal_qm12".to_string()]);
    assert_eq!(sent[0].footer.as_deref(), Some("#BringThemHome"));
    assert_eq!(
        sent[0].links[1].url,
        "https://www.thebluealliance.com/match/2025dal_qm12"
    );

    // On the field
    h.live.set_queue(
        "2025daly",
        vec![live("Qualification 12", LiveStatus::OnField, TRACKED_RED, OTHERS, Some(NOW + 3 * MINUTE))],
    );
    h.watcher.tick(NOW + MINUTE).await;
    h.watcher.tick(NOW + MINUTE + 30_000).await;

    assert_eq!(
        h.channel.titles(),
        vec![
            "🛫 DALLY - Qualification 12".to_string(),
            "🔥 MATCH STARTING NOW on DALLY!".to_string(),
        ]
    );

    // Result posted, red wins
    h.live.set_queue(
        "2025daly",
        vec![live("Qualification 12", LiveStatus::Other("Completed".into()), TRACKED_RED, OTHERS, Some(NOW))],
    );
    h.results.set_matches(
        "2025dal",
        vec![
            qual("2025dal", 1, ["1", "2", "3"], ["4", "5", "6"], Some((50, 40))),
            qual("2025dal", 2, ["7", "8", "9"], ["10", "11", "12"], Some((20, 60))),
            qual("2025dal", 3, ["13", "14", "15"], ["16", "17", "18"], Some((33, 30))),
            qual("2025dal", 12, TRACKED_RED, OTHERS, Some((143, 120))),
        ],
    );
    h.watcher.tick(NOW + 10 * MINUTE).await;
    h.watcher.tick(NOW + 11 * MINUTE).await;

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].title, "🏟️ DALLY - Qualification 12");
    assert!(sent[2].body.contains("won! 🎉"));
    assert!(sent[2].body.contains("Red 143 - Blue 120"));
    assert_eq!(h.watcher.seen().high_water_mark("2025dal"), 12);
}

#[tokio::test]
async fn test_backfilled_results_never_announced() {
    let mut h = harness();
    h.results.set_matches(
        "2025dal",
        vec![
            qual("2025dal", 4, TRACKED_RED, OTHERS, Some((80, 70))),
            qual("2025dal", 9, OTHERS, TRACKED_RED, Some((80, 70))),
        ],
    );

    h.watcher.backfill().await;
    for i in 0..3 {
        h.watcher.tick(NOW + i * 30_000).await;
    }

    assert!(h.channel.sent().is_empty());
    assert_eq!(h.watcher.seen().high_water_mark("2025dal"), 9);
}

#[tokio::test]
async fn test_failed_backfill_is_retried_silently() {
    let mut h = harness();
    h.results.fail("2025dal", true);
    h.results.set_matches(
        "2025dal",
        vec![qual("2025dal", 4, TRACKED_RED, OTHERS, Some((80, 70)))],
    );

    h.watcher.backfill().await;
    assert_eq!(h.watcher.seen().announced_count("2025dal", NotifyKind::Result), 0);

    h.results.fail("2025dal", false);
    h.watcher.tick(NOW).await;
    h.watcher.tick(NOW + 30_000).await;

    assert!(h.channel.sent().is_empty());
    assert!(h
        .watcher
        .seen()
        .was_announced("2025dal", "2025dal_qm4", NotifyKind::Result));
}

#[tokio::test]
async fn test_late_backfill_still_announces_matches_played_after_start() {
    let mut h = harness();
    h.results.fail("2025dal", true);
    h.watcher.backfill().await;

    let mut late = qual("2025dal", 20, TRACKED_RED, OTHERS, Some((95, 60)));
    late.actual_time = Some(NOW / 1000 + 600);
    h.results.set_matches(
        "2025dal",
        vec![qual("2025dal", 4, TRACKED_RED, OTHERS, Some((80, 70))), late],
    );
    h.results.fail("2025dal", false);

    h.watcher.tick(NOW + 11 * MINUTE).await;
    h.watcher.tick(NOW + 12 * MINUTE).await;

    assert_eq!(h.channel.titles(), vec!["🏟️ DALLY - Qualification 20".to_string()]);
    assert!(h.channel.sent()[0].body.contains("won! 🎉"));
    assert!(h
        .watcher
        .seen()
        .was_announced("2025dal", "2025dal_qm4", NotifyKind::Result));
    assert_eq!(h.watcher.seen().high_water_mark("2025dal"), 20);
}

#[tokio::test]
async fn test_dispatch_failure_is_retried_next_tick() {
    let mut h = harness();
    h.watcher.backfill().await;
    h.live.set_queue(
        "2025daly",
        vec![live("Qualification 20", LiveStatus::OnDeck, TRACKED_RED, OTHERS, Some(NOW + 8 * MINUTE))],
    );

    h.channel.rejecting.store(true, Ordering::SeqCst);
    h.watcher.tick(NOW).await;
    assert_eq!(h.channel.attempts.load(Ordering::SeqCst), 1);
    assert!(!h
        .watcher
        .seen()
        .was_announced("2025daly", "Qualification 20", NotifyKind::AboutToPlay));

    h.channel.rejecting.store(false, Ordering::SeqCst);
    h.watcher.tick(NOW + 30_000).await;
    h.watcher.tick(NOW + 60_000).await;

    assert_eq!(h.channel.sent().len(), 1);
    assert_eq!(h.channel.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_starting_now_is_retried() {
    let mut h = harness();
    h.watcher.backfill().await;
    h.live.set_queue(
        "2025daly",
        vec![live("Qualification 21", LiveStatus::OnField, TRACKED_RED, OTHERS, Some(NOW + MINUTE))],
    );

    h.channel.rejecting.store(true, Ordering::SeqCst);
    h.watcher.tick(NOW).await;
    assert!(h.channel.sent().is_empty());
    assert!(!h
        .watcher
        .seen()
        .was_announced("2025daly", "Qualification 21", NotifyKind::StartingNow));

    h.channel.rejecting.store(false, Ordering::SeqCst);
    h.watcher.tick(NOW + 10_000).await;
    h.watcher.tick(NOW + 20_000).await;

    assert_eq!(h.channel.titles(), vec!["🔥 MATCH STARTING NOW on DALLY!".to_string()]);
    assert_eq!(h.channel.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_result_stays_unmarked() {
    let mut h = harness();
    h.watcher.backfill().await;
    h.results.set_matches(
        "2025dal",
        vec![qual("2025dal", 7, OTHERS, TRACKED_RED, Some((50, 65)))],
    );

    h.channel.rejecting.store(true, Ordering::SeqCst);
    h.watcher.tick(NOW).await;
    assert!(!h
        .watcher
        .seen()
        .was_announced("2025dal", "2025dal_qm7", NotifyKind::Result));
    assert_eq!(h.watcher.seen().high_water_mark("2025dal"), 0);

    h.channel.rejecting.store(false, Ordering::SeqCst);
    h.watcher.tick(NOW + 30_000).await;
    h.watcher.tick(NOW + 60_000).await;

    assert_eq!(h.channel.titles(), vec!["🏟️ DALLY - Qualification 7".to_string()]);
    assert_eq!(h.channel.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(h.watcher.seen().high_water_mark("2025dal"), 7);
}

#[tokio::test]
async fn test_one_failing_event_does_not_block_others() {
    let mut h = harness_with(vec![dally(), curie()], false);
    h.watcher.backfill().await;

    h.live.failing.lock().insert("2025daly".to_string());
    h.results.fail("2025dal", true);
    h.live.set_queue(
        "2025curie",
        vec![live("Qualification 3", LiveStatus::OnDeck, OTHERS, ["1690", "33", "67"], Some(NOW + 2 * MINUTE))],
    );
    h.results.set_matches(
        "2025cur",
        vec![qual("2025cur", 1, OTHERS, ["1690", "33", "67"], Some((40, 90)))],
    );

    h.watcher.tick(NOW).await;

    assert_eq!(
        h.channel.titles(),
        vec![
            "🛫 CURIE - Qualification 3".to_string(),
            "🏟️ CURIE - Qualification 1".to_string(),
        ]
    );
    let sent = h.channel.sent();
    assert!(sent[0].body.contains("🔵 Blue Alliance"));
    assert!(sent[0].body.contains("**#1690**"));
    assert!(sent[0].body.contains("38.0%"));
    assert!(sent[1].body.contains("won! 🎉"));
}

#[tokio::test]
async fn test_skips_untimed_past_and_untracked_matches() {
    let mut h = harness();
    h.watcher.backfill().await;
    h.live.set_queue(
        "2025daly",
        vec![
            live("Qualification 30", LiveStatus::OnDeck, TRACKED_RED, OTHERS, None),
            live("Qualification 31", LiveStatus::OnDeck, TRACKED_RED, OTHERS, Some(NOW - MINUTE)),
            live("Qualification 32", LiveStatus::OnDeck, OTHERS, ["1", "2", "3"], Some(NOW + MINUTE)),
            live("Qualification 33", LiveStatus::QueuingSoon, TRACKED_RED, OTHERS, Some(NOW + 20 * MINUTE)),
        ],
    );

    h.watcher.tick(NOW).await;

    assert!(h.channel.sent().is_empty());
    assert_eq!(h.predictions.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_queuing_announcement_uses_neutral_prediction() {
    let mut h = harness_with(vec![dally()], true);
    h.watcher.backfill().await;
    h.live.set_queue(
        "2025daly",
        vec![live("Playoff 4", LiveStatus::NowQueuing, OTHERS, TRACKED_RED, Some(NOW + 12 * MINUTE))],
    );

    h.watcher.tick(NOW).await;

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "🛫 DALLY - Playoff 4");
    assert!(sent[0].body.contains("50.0%"));
    assert!(sent[0].body.contains("UNKNOWN"));
    assert_eq!(
        sent[0].links[2].url,
        "https://www.statbotics.io/match/2025dal_sf4m1"
    );
    assert_eq!(h.predictions.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prediction_failure_still_announces() {
    let mut h = harness();
    h.watcher.backfill().await;
    h.predictions.failing.store(true, Ordering::SeqCst);
    h.live.set_queue(
        "2025daly",
        vec![live("Final 1", LiveStatus::OnDeck, TRACKED_RED, OTHERS, Some(NOW + MINUTE))],
    );

    h.watcher.tick(NOW).await;

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("50.0%"));
    assert_eq!(h.predictions.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rank_movement_relative_to_previous_pass() {
    let mut h = harness();
    h.results.set_rank("2025dal", "5987", 5);
    h.watcher.backfill().await;
    assert_eq!(h.watcher.ranks().previous("5987"), Some(5));

    h.results.set_rank("2025dal", "5987", 3);
    h.results.set_matches(
        "2025dal",
        vec![qual("2025dal", 14, TRACKED_RED, OTHERS, Some((60, 61)))],
    );
    h.watcher.tick(NOW).await;

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("lost 💔"));
    assert!(sent[0].body.contains("🏅 #5987: #3 🔼"));

    // Next pass: same rank, no new result
    h.watcher.tick(NOW + 30_000).await;
    assert_eq!(h.watcher.ranks().previous("5987"), Some(3));
    assert_eq!(h.channel.sent().len(), 1);
}

#[tokio::test]
async fn test_missing_channel_is_fatal() {
    let h = harness();
    h.channel.missing_channel.store(true, Ordering::SeqCst);
    let err = h.watcher.connect().await.unwrap_err();
    assert!(format!("{:#}", err).contains("1362810453977334001"));
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let mut h = harness();
    h.watcher.backfill().await;
    let (tx, rx) = tokio::sync::watch::channel(false);
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), h.watcher.run(rx))
        .await
        .unwrap();
}
