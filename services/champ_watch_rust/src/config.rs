//! Watch configuration, loaded from the environment.

use anyhow::{anyhow, Context, Result};
use frc_watch_core::clients::{discord, nexus, statbotics, tba};
use frc_watch_core::{EventConfig, TrackedTeams};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

const DEFAULT_TRACKED_TEAMS: &str = "1690,5990,2630,2230,5987,5951,3339,2231,6738,5654,5614,1942";

const DEFAULT_WATCH_EVENTS: &str = "\
2025arc|2025archimedes|ARCHIMEDES|https://twitch.tv/firstinspires_archimedes;\
2025cur|2025curie|CURIE|https://twitch.tv/firstinspires_curie;\
2025dal|2025daly|DALLY|https://twitch.tv/firstinspires_daly;\
2025gal|2025galileo|GALILEO|https://twitch.tv/firstinspires_galileo;\
2025hop|2025hopper|HOPPER|https://twitch.tv/firstinspires_hopper;\
2025joh|2025johnson|JOHNSON|https://twitch.tv/firstinspires_johnson;\
2025mil|2025milstein|MILSTEIN|https://twitch.tv/firstinspires_milstein;\
2025new|2025newton|NEWTON|https://twitch.tv/firstinspires_newton";

const DEFAULT_FOOTER: &str = "#BringThemHome";

#[derive(Debug, Clone)]
pub struct Config {
    pub tba_api_key: String,
    pub nexus_api_key: String,
    pub discord_bot_token: String,
    pub announce_channel_id: String,

    pub poll_interval: Duration,
    pub request_timeout: Duration,

    pub tracked_teams: TrackedTeams,
    pub events: Vec<EventConfig>,

    /// Treat "Now queuing" like "On deck" for the about-to-play notice
    pub announce_when_queuing: bool,
    pub footer: Option<String>,

    pub tba_base_url: String,
    pub nexus_base_url: String,
    pub statbotics_base_url: String,
    pub discord_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tba_api_key = required_env("TBA_API_KEY")?;
        let nexus_api_key = required_env("NEXUS_API_KEY")?;
        let discord_bot_token = required_env("DISCORD_BOT_TOKEN")?;
        let announce_channel_id = required_env("ANNOUNCE_CHANNEL_ID")?;

        let poll_interval_secs =
            parse_u64_env("POLL_INTERVAL_SECS", 30).context("POLL_INTERVAL_SECS")?;
        let request_timeout_secs =
            parse_u64_env("REQUEST_TIMEOUT_SECS", 10).context("REQUEST_TIMEOUT_SECS")?;

        let tracked_teams = parse_teams(
            &env::var("TRACKED_TEAMS").unwrap_or_else(|_| DEFAULT_TRACKED_TEAMS.to_string()),
        );
        let events = parse_events(
            &env::var("WATCH_EVENTS").unwrap_or_else(|_| DEFAULT_WATCH_EVENTS.to_string()),
        )
        .context("WATCH_EVENTS")?;

        let footer = env::var("NOTIFICATION_FOOTER").unwrap_or_else(|_| DEFAULT_FOOTER.to_string());

        let config = Self {
            tba_api_key,
            nexus_api_key,
            discord_bot_token,
            announce_channel_id,
            poll_interval: Duration::from_secs(poll_interval_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            tracked_teams,
            events,
            announce_when_queuing: parse_bool_env("ANNOUNCE_WHEN_QUEUING", false),
            footer: Some(footer).filter(|f| !f.trim().is_empty()),
            tba_base_url: env_or("TBA_BASE_URL", tba::DEFAULT_BASE_URL),
            nexus_base_url: env_or("NEXUS_BASE_URL", nexus::DEFAULT_BASE_URL),
            statbotics_base_url: env_or("STATBOTICS_BASE_URL", statbotics::DEFAULT_BASE_URL),
            discord_base_url: env_or("DISCORD_API_BASE_URL", discord::DEFAULT_BASE_URL),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracked_teams.is_empty() {
            return Err(anyhow!("TRACKED_TEAMS must contain at least one team"));
        }
        if self.events.is_empty() {
            return Err(anyhow!("WATCH_EVENTS must contain at least one event"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("POLL_INTERVAL_SECS must be > 0"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("REQUEST_TIMEOUT_SECS must be > 0"));
        }

        let mut results_keys = HashSet::new();
        let mut live_keys = HashSet::new();
        for event in &self.events {
            if !results_keys.insert(event.results_key.as_str()) {
                return Err(anyhow!("Duplicate results key in WATCH_EVENTS: {}", event.results_key));
            }
            if !live_keys.insert(event.live_key.as_str()) {
                return Err(anyhow!("Duplicate live key in WATCH_EVENTS: {}", event.live_key));
            }
        }
        Ok(())
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}

pub fn parse_teams(raw: &str) -> TrackedTeams {
    TrackedTeams::new(raw.split(',').map(str::trim).filter(|s| !s.is_empty()))
}

/// Parse `results_key|live_key|Display Name[|stream url]` entries separated by `;`.
pub fn parse_events(raw: &str) -> Result<Vec<EventConfig>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
            match parts.as_slice() {
                [results, live, name] if !results.is_empty() && !live.is_empty() => {
                    Ok(EventConfig::new(results, live, name))
                }
                [results, live, name, stream] if !results.is_empty() && !live.is_empty() => {
                    Ok(EventConfig::new(results, live, name).with_stream(stream))
                }
                _ => Err(anyhow!(
                    "Invalid event entry: {entry} (expected results_key|live_key|Display Name[|stream url])"
                )),
            }
        })
        .collect()
}
