//! Results/rankings source client (The Blue Alliance API v3).
//!
//! Besides what the watch engine needs, this client carries the team and
//! event metadata endpoints used by the query CLI.

use super::{fetch_json, ResultsSource};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    team_number_from_key, Alliance, AllianceResult, RankEntry, ResultMatch,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";
const SOURCE: &str = "tba";
const AUTH_HEADER: &str = "X-TBA-Auth-Key";

#[derive(Clone)]
pub struct TbaClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for TbaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TbaClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TbaAlliance {
    #[serde(default)]
    pub team_keys: Vec<String>,
    /// Null or -1 until the match is played
    #[serde(default)]
    pub score: Option<i64>,
}

impl TbaAlliance {
    fn score_or_unplayed(&self) -> i64 {
        self.score.unwrap_or(-1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TbaAlliances {
    pub red: TbaAlliance,
    pub blue: TbaAlliance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TbaMatch {
    pub key: String,
    pub event_key: String,
    pub comp_level: String,
    #[serde(default)]
    pub set_number: u32,
    pub match_number: u32,
    pub alliances: TbaAlliances,
    #[serde(default)]
    pub winning_alliance: Option<String>,
    #[serde(default)]
    pub actual_time: Option<i64>,
    #[serde(default)]
    pub score_breakdown: Option<serde_json::Value>,
}

impl TbaMatch {
    fn ranking_points(&self, side: Alliance) -> Option<i64> {
        self.score_breakdown
            .as_ref()?
            .get(side.as_str())?
            .get("rp")?
            .as_i64()
    }
}

impl From<TbaMatch> for ResultMatch {
    fn from(m: TbaMatch) -> Self {
        let red_rp = m.ranking_points(Alliance::Red);
        let blue_rp = m.ranking_points(Alliance::Blue);
        let teams = |a: &TbaAlliance| -> Vec<String> {
            a.team_keys
                .iter()
                .map(|k| team_number_from_key(k).to_string())
                .collect()
        };
        let winning_alliance = m.winning_alliance.as_deref().and_then(Alliance::parse);

        ResultMatch {
            red: AllianceResult {
                teams: teams(&m.alliances.red),
                score: m.alliances.red.score_or_unplayed(),
                ranking_points: red_rp,
            },
            blue: AllianceResult {
                teams: teams(&m.alliances.blue),
                score: m.alliances.blue.score_or_unplayed(),
                ranking_points: blue_rp,
            },
            key: m.key,
            event_key: m.event_key,
            comp_level: m.comp_level,
            set_number: m.set_number,
            match_number: m.match_number,
            winning_alliance,
            actual_time: m.actual_time,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TbaRanking {
    team_key: String,
    rank: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct TbaRankings {
    #[serde(default)]
    rankings: Option<Vec<TbaRanking>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TbaTeam {
    pub key: String,
    pub team_number: u32,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_prov: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rookie_year: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TbaAward {
    pub award_type: u32,
    pub event_key: String,
    pub year: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TbaEvent {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub event_type_string: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_prov: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TbaRobot {
    pub year: u32,
    #[serde(default)]
    pub robot_name: String,
}

// ============================================================================
// Client
// ============================================================================

impl TbaClient {
    pub fn new(http: Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.http.get(&url).header(AUTH_HEADER, &self.api_key);
        fetch_json(SOURCE, &url, request).await
    }

    pub async fn matches(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>> {
        let raw: Vec<TbaMatch> = self.get(&format!("/event/{}/matches", event_key)).await?;
        Ok(raw.into_iter().map(ResultMatch::from).collect())
    }

    pub async fn matches_simple(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>> {
        let raw: Vec<TbaMatch> = self
            .get(&format!("/event/{}/matches/simple", event_key))
            .await?;
        Ok(raw.into_iter().map(ResultMatch::from).collect())
    }

    pub async fn rankings(&self, event_key: &str) -> ClientResult<Vec<RankEntry>> {
        let raw: Option<TbaRankings> = self.get(&format!("/event/{}/rankings", event_key)).await?;
        Ok(rank_entries(raw))
    }

    pub async fn team(&self, team: &str) -> ClientResult<TbaTeam> {
        self.get(&format!("/team/frc{}", team_number_from_key(team)))
            .await
    }

    pub async fn team_awards(&self, team: &str) -> ClientResult<Vec<TbaAward>> {
        self.get(&format!("/team/frc{}/awards", team_number_from_key(team)))
            .await
    }

    /// Event keys for a team, for one season or all of them.
    pub async fn team_event_keys(&self, team: &str, year: Option<u32>) -> ClientResult<Vec<String>> {
        let team = team_number_from_key(team);
        let path = match year {
            Some(y) => format!("/team/frc{}/events/{}/keys", team, y),
            None => format!("/team/frc{}/events/keys", team),
        };
        self.get(&path).await
    }

    pub async fn team_events(&self, team: &str, year: Option<u32>) -> ClientResult<Vec<TbaEvent>> {
        let team = team_number_from_key(team);
        let path = match year {
            Some(y) => format!("/team/frc{}/events/{}/simple", team, y),
            None => format!("/team/frc{}/events/simple", team),
        };
        self.get(&path).await
    }

    pub async fn event(&self, event_key: &str) -> ClientResult<TbaEvent> {
        self.get(&format!("/event/{}", event_key)).await
    }

    pub async fn team_event_matches(
        &self,
        team: &str,
        event_key: &str,
    ) -> ClientResult<Vec<ResultMatch>> {
        let raw: Vec<TbaMatch> = self
            .get(&format!(
                "/team/frc{}/event/{}/matches/simple",
                team_number_from_key(team),
                event_key
            ))
            .await?;
        Ok(raw.into_iter().map(ResultMatch::from).collect())
    }

    pub async fn team_robots(&self, team: &str) -> ClientResult<Vec<TbaRobot>> {
        self.get(&format!("/team/frc{}/robots", team_number_from_key(team)))
            .await
    }
}

fn rank_entries(raw: Option<TbaRankings>) -> Vec<RankEntry> {
    raw.and_then(|r| r.rankings)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| {
            Some(RankEntry {
                team: team_number_from_key(&r.team_key).to_string(),
                rank: r.rank.filter(|rank| *rank > 0)?,
            })
        })
        .collect()
}

/// Count awards by type, keeping only the types in `wanted`.
pub fn count_awards(awards: &[TbaAward], wanted: &[u32]) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for award in awards.iter().filter(|a| wanted.contains(&a.award_type)) {
        *counts.entry(award.award_type).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl ResultsSource for TbaClient {
    async fn event_matches(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>> {
        self.matches(event_key).await
    }

    async fn event_matches_simple(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>> {
        self.matches_simple(event_key).await
    }

    async fn event_rankings(&self, event_key: &str) -> ClientResult<Vec<RankEntry>> {
        self.rankings(event_key).await
    }

    async fn team_nickname(&self, team: &str) -> ClientResult<Option<String>> {
        match self.team(team).await {
            Ok(t) => Ok(t.nickname.filter(|n| !n.trim().is_empty())),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
