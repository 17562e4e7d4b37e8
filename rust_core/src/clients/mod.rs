//! External data clients and the chat dispatcher.
//!
//! Each remote service is reached through one concrete client, and the watch
//! engine only sees the traits below so it can be driven by fakes in tests.

pub mod discord;
pub mod nexus;
pub mod statbotics;
pub mod tba;

use crate::error::{ClientError, ClientResult};
use crate::models::{LiveMatch, Notification, Prediction, RankEntry, ResultMatch};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

// Re-export commonly used types
pub use discord::DiscordClient;
pub use nexus::NexusClient;
pub use statbotics::StatboticsClient;
pub use tba::TbaClient;

/// Authoritative, slower-updating match results and rankings.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    /// Full match records, including score breakdowns.
    async fn event_matches(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>>;

    /// Lighter match records without score breakdowns.
    async fn event_matches_simple(&self, event_key: &str) -> ClientResult<Vec<ResultMatch>>;

    async fn event_rankings(&self, event_key: &str) -> ClientResult<Vec<RankEntry>>;

    /// `None` when the team has no nickname on record.
    async fn team_nickname(&self, team: &str) -> ClientResult<Option<String>>;
}

/// Near-real-time queueing and timing feed.
#[async_trait]
pub trait LiveQueueSource: Send + Sync {
    async fn event_queue(&self, live_key: &str) -> ClientResult<Vec<LiveMatch>>;
}

/// Best-effort match outcome predictions.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    async fn match_prediction(&self, match_key: &str) -> ClientResult<Prediction>;
}

/// Delivers rendered notifications to a chat channel.
#[async_trait]
pub trait ChannelDispatcher: Send + Sync {
    /// Confirms the bot's connection works; returns the bot's name.
    async fn ready(&self) -> ClientResult<String>;

    /// Confirms the channel exists and is visible; returns its name.
    async fn resolve_channel(&self, channel_id: &str) -> ClientResult<String>;

    async fn send(&self, channel_id: &str, notification: &Notification) -> ClientResult<()>;
}

/// Build the HTTP session shared by every client for the process lifetime.
pub fn http_client(timeout: Duration) -> ClientResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("frc-watch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::http("http", e))
}

/// Send a request and decode a 2xx JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    source_name: &'static str,
    url: &str,
    request: RequestBuilder,
) -> ClientResult<T> {
    let resp = request
        .send()
        .await
        .map_err(|e| ClientError::http(source_name, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            source_name,
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ClientError::http(source_name, e))?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::decode(source_name, e))
}
