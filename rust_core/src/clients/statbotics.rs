//! Prediction source client (Statbotics API v3).
//!
//! Lookups are best-effort: a circuit breaker keeps a struggling prediction
//! service from adding a full timeout to every poll tick.

use super::{fetch_json, PredictionSource};
use crate::circuit_breaker::{ApiCircuitBreaker, BreakerConfig};
use crate::error::ClientResult;
use crate::models::{Alliance, Prediction};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.statbotics.io/v3";
const SOURCE: &str = "statbotics";

#[derive(Clone)]
pub struct StatboticsClient {
    http: Client,
    base_url: String,
    breaker: Arc<ApiCircuitBreaker>,
}

impl std::fmt::Debug for StatboticsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatboticsClient")
            .field("base_url", &self.base_url)
            .field("breaker", &self.breaker.state())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StatboticsPred {
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    red_win_prob: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct StatboticsMatch {
    #[serde(default)]
    pred: StatboticsPred,
}

impl From<StatboticsMatch> for Prediction {
    fn from(m: StatboticsMatch) -> Self {
        Prediction {
            winner: m.pred.winner.as_deref().and_then(Alliance::parse),
            red_win_prob: m
                .pred
                .red_win_prob
                .filter(|p| p.is_finite())
                .map(|p| p.clamp(0.0, 1.0))
                .unwrap_or(0.5),
        }
    }
}

impl StatboticsClient {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            breaker: Arc::new(ApiCircuitBreaker::new(SOURCE, BreakerConfig::default())),
        }
    }

    pub async fn get_match(&self, match_key: &str) -> ClientResult<Prediction> {
        self.breaker.check()?;

        let url = format!("{}/match/{}", self.base_url, match_key);
        let request = self.http.get(&url);
        let result = fetch_json::<StatboticsMatch>(SOURCE, &url, request)
            .await
            .map(Prediction::from);

        self.breaker.record(&result);
        result
    }
}

#[async_trait]
impl PredictionSource for StatboticsClient {
    async fn match_prediction(&self, match_key: &str) -> ClientResult<Prediction> {
        self.get_match(match_key).await
    }
}
