//! Live queue source client (FRC Nexus API v1).

use super::{fetch_json, LiveQueueSource};
use crate::error::ClientResult;
use crate::models::{team_number_from_key, LiveMatch, LiveStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://frc.nexus/api/v1";
const SOURCE: &str = "nexus";
const AUTH_HEADER: &str = "Nexus-Api-Key";

#[derive(Clone)]
pub struct NexusClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for NexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexusClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NexusTimes {
    #[serde(default)]
    estimated_start_time: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NexusMatch {
    #[serde(default)]
    label: String,
    #[serde(default)]
    status: String,
    // Slots for teams not yet assigned come back as null
    #[serde(default)]
    red_teams: Option<Vec<Option<String>>>,
    #[serde(default)]
    blue_teams: Option<Vec<Option<String>>>,
    #[serde(default)]
    times: NexusTimes,
}

#[derive(Debug, Clone, Deserialize)]
struct NexusEvent {
    #[serde(default)]
    matches: Vec<NexusMatch>,
}

fn roster(slots: Option<Vec<Option<String>>>) -> Vec<String> {
    slots
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|t| team_number_from_key(t.trim()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

impl From<NexusMatch> for LiveMatch {
    fn from(m: NexusMatch) -> Self {
        LiveMatch {
            status: LiveStatus::parse(&m.status),
            red_teams: roster(m.red_teams),
            blue_teams: roster(m.blue_teams),
            // Zero means "no estimate" on this feed
            estimated_start_ms: m.times.estimated_start_time.filter(|t| *t > 0),
            label: m.label,
        }
    }
}

impl NexusClient {
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

    pub async fn event(&self, live_key: &str) -> ClientResult<Vec<LiveMatch>> {
        let url = format!("{}/event/{}", self.base_url, live_key);
        let request = self.http.get(&url).header(AUTH_HEADER, &self.api_key);
        let event: NexusEvent = fetch_json(SOURCE, &url, request).await?;
        Ok(event.matches.into_iter().map(LiveMatch::from).collect())
    }
}

#[async_trait]
impl LiveQueueSource for NexusClient {
    async fn event_queue(&self, live_key: &str) -> ClientResult<Vec<LiveMatch>> {
        self.event(live_key).await
    }
}
