//! Domain models shared by the watch service and the query CLI.
//!
//! Snapshots here are produced fresh by every fetch and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Teams & Alliances
// ============================================================================

/// Team number without the `frc` prefix, e.g. `"5987"`.
pub type TeamNumber = String;

/// Strip the `frc` prefix the results source puts on team keys.
pub fn team_number_from_key(key: &str) -> &str {
    key.strip_prefix("frc").unwrap_or(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alliance {
    Red,
    Blue,
}

impl Alliance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alliance::Red => "red",
            Alliance::Blue => "blue",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "red" => Some(Alliance::Red),
            "blue" => Some(Alliance::Blue),
            _ => None,
        }
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side(s) the tracked teams of one match occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Only(Alliance),
    Both,
}

impl Side {
    /// `None` when no tracked team is in either roster.
    pub fn of(on_red: bool, on_blue: bool) -> Option<Self> {
        match (on_red, on_blue) {
            (true, true) => Some(Side::Both),
            (true, false) => Some(Side::Only(Alliance::Red)),
            (false, true) => Some(Side::Only(Alliance::Blue)),
            (false, false) => None,
        }
    }
}

/// Fixed allow-list of teams to watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedTeams {
    teams: BTreeSet<TeamNumber>,
}

impl TrackedTeams {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            teams: teams
                .into_iter()
                .map(|t| team_number_from_key(t.into().trim()).to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, team: &str) -> bool {
        self.teams.contains(team_number_from_key(team))
    }

    /// Tracked teams found in a roster, sorted and deduplicated.
    pub fn in_roster<'a, I>(&self, roster: I) -> Vec<TeamNumber>
    where
        I: IntoIterator<Item = &'a TeamNumber>,
    {
        let found: BTreeSet<&str> = roster
            .into_iter()
            .map(|t| team_number_from_key(t))
            .filter(|t| self.teams.contains(*t))
            .collect();
        found.into_iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

// ============================================================================
// Events
// ============================================================================

pub const DEFAULT_STREAM_URL: &str = "https://twitch.tv/firstinspires";

/// One watched event. The two sources name events differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventConfig {
    /// Key on the results source, e.g. `2025dal`
    pub results_key: String,
    /// Key on the live queue source, e.g. `2025daly`
    pub live_key: String,
    /// Display name used in notification titles
    pub display_name: String,
    /// Live stream link for this event's field
    pub stream_url: String,
}

impl EventConfig {
    pub fn new(results_key: &str, live_key: &str, display_name: &str) -> Self {
        Self {
            results_key: results_key.to_string(),
            live_key: live_key.to_string(),
            display_name: display_name.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
        }
    }

    pub fn with_stream(mut self, stream_url: &str) -> Self {
        self.stream_url = stream_url.to_string();
        self
    }
}

// ============================================================================
// Live queue snapshots
// ============================================================================

/// Lifecycle status reported by the live queue source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveStatus {
    QueuingSoon,
    NowQueuing,
    OnDeck,
    OnField,
    Other(String),
}

impl LiveStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Queuing soon" => LiveStatus::QueuingSoon,
            "Now queuing" => LiveStatus::NowQueuing,
            "On deck" => LiveStatus::OnDeck,
            "On field" => LiveStatus::OnField,
            other => LiveStatus::Other(other.to_string()),
        }
    }

    /// The prediction source has nothing useful this far out.
    pub fn too_early_to_predict(&self) -> bool {
        matches!(self, LiveStatus::QueuingSoon | LiveStatus::NowQueuing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LiveStatus::QueuingSoon => "Queuing soon",
            LiveStatus::NowQueuing => "Now queuing",
            LiveStatus::OnDeck => "On deck",
            LiveStatus::OnField => "On field",
            LiveStatus::Other(s) => s,
        }
    }
}

/// One scheduled match as seen by the live queue source.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMatch {
    pub label: String,
    pub status: LiveStatus,
    pub red_teams: Vec<TeamNumber>,
    pub blue_teams: Vec<TeamNumber>,
    /// Estimated start, epoch milliseconds
    pub estimated_start_ms: Option<i64>,
}

// ============================================================================
// Results snapshots
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllianceResult {
    pub teams: Vec<TeamNumber>,
    /// Negative while the match is unplayed
    pub score: i64,
    /// Ranking points earned, when the score breakdown carries them
    pub ranking_points: Option<i64>,
}

/// One match as seen by the results source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMatch {
    pub key: String,
    pub event_key: String,
    pub comp_level: String,
    pub set_number: u32,
    pub match_number: u32,
    pub red: AllianceResult,
    pub blue: AllianceResult,
    pub winning_alliance: Option<Alliance>,
    /// Epoch seconds the match was actually played
    pub actual_time: Option<i64>,
}

impl ResultMatch {
    /// Played with a recorded outcome. Ties carry no winning alliance, so a
    /// played match with both scores posted counts as complete too.
    pub fn is_completed(&self) -> bool {
        self.winning_alliance.is_some()
            || (self.actual_time.is_some() && self.red.score >= 0 && self.blue.score >= 0)
    }

    pub fn alliance(&self, side: Alliance) -> &AllianceResult {
        match side {
            Alliance::Red => &self.red,
            Alliance::Blue => &self.blue,
        }
    }

    pub fn all_teams(&self) -> impl Iterator<Item = &TeamNumber> {
        self.red.teams.iter().chain(self.blue.teams.iter())
    }

    /// Winner by score; `None` on a tie.
    pub fn winner_by_score(&self) -> Option<Alliance> {
        match self.red.score.cmp(&self.blue.score) {
            std::cmp::Ordering::Greater => Some(Alliance::Red),
            std::cmp::Ordering::Less => Some(Alliance::Blue),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub team: TeamNumber,
    pub rank: u32,
}

// ============================================================================
// Predictions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub winner: Option<Alliance>,
    pub red_win_prob: f64,
}

impl Prediction {
    /// Neutral stand-in when no prediction is available.
    pub fn unknown() -> Self {
        Self {
            winner: None,
            red_win_prob: 0.5,
        }
    }

    /// Win probability from the tracked side's point of view.
    pub fn win_probability_for(&self, side: Side) -> f64 {
        match side {
            Side::Only(Alliance::Red) => self.red_win_prob,
            Side::Only(Alliance::Blue) => 1.0 - self.red_win_prob,
            Side::Both => 0.5,
        }
    }
}

// ============================================================================
// Rendered notifications
// ============================================================================

/// Embed accent colours, matching the chat client's named palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedColor {
    Gold,
    Red,
    Green,
    Greyple,
    Blue,
    Brand,
}

impl EmbedColor {
    pub fn rgb(&self) -> u32 {
        match self {
            EmbedColor::Gold => 0xF1C40F,
            EmbedColor::Red => 0xE74C3C,
            EmbedColor::Green => 0x2ECC71,
            EmbedColor::Greyple => 0x99AAB5,
            EmbedColor::Blue => 0x3498DB,
            EmbedColor::Brand => 0x2859A5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Link {
    pub fn new(label: &str, url: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rendered message, ready for any dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub url: Option<String>,
    pub body: String,
    pub color: EmbedColor,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub links: Vec<Link>,
}

impl Notification {
    pub fn new(title: impl Into<String>, color: EmbedColor) -> Self {
        Self {
            title: title.into(),
            url: None,
            body: String::new(),
            color,
            fields: Vec::new(),
            footer: None,
            links: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Plain-text rendering for terminals and logs.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        if let Some(url) = &self.url {
            out.push_str(url);
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
            out.push('\n');
        }
        for field in &self.fields {
            out.push_str(&format!("\n[{}]\n{}\n", field.name, field.value));
        }
        for link in &self.links {
            out.push_str(&format!("\n{}: {}", link.label, link.url));
        }
        if !self.links.is_empty() {
            out.push('\n');
        }
        if let Some(footer) = &self.footer {
            out.push_str(&format!("\n{}\n", footer));
        }
        out
    }
}
