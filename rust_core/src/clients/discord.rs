//! Channel dispatcher over the Discord REST API.
//!
//! Notifications become one embed plus rows of link buttons. Link buttons
//! need no interaction handling, so plain REST is enough.

use super::{fetch_json, ChannelDispatcher};
use crate::error::{ClientError, ClientResult};
use crate::models::Notification;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";
const SOURCE: &str = "discord";
const BUTTONS_PER_ROW: usize = 5;
const MAX_ROWS: usize = 5;
const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_LINK: u8 = 5;

#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    base_url: String,
    bot_token: String,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedFieldBody<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedFieldBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter<'a>>,
}

#[derive(Debug, Serialize)]
struct LinkButton<'a> {
    #[serde(rename = "type")]
    kind: u8,
    style: u8,
    label: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ActionRow<'a> {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<LinkButton<'a>>,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    embeds: Vec<Embed<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<ActionRow<'a>>,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

fn message_body(notification: &Notification) -> CreateMessage<'_> {
    let embed = Embed {
        title: &notification.title,
        url: notification.url.as_deref(),
        description: &notification.body,
        color: notification.color.rgb(),
        fields: notification
            .fields
            .iter()
            .map(|f| EmbedFieldBody {
                name: &f.name,
                value: &f.value,
                inline: f.inline,
            })
            .collect(),
        footer: notification
            .footer
            .as_deref()
            .map(|text| EmbedFooter { text }),
    };

    let components = notification
        .links
        .chunks(BUTTONS_PER_ROW)
        .take(MAX_ROWS)
        .map(|chunk| ActionRow {
            kind: COMPONENT_ACTION_ROW,
            components: chunk
                .iter()
                .map(|link| LinkButton {
                    kind: COMPONENT_BUTTON,
                    style: BUTTON_STYLE_LINK,
                    label: &link.label,
                    url: &link.url,
                })
                .collect(),
        })
        .collect();

    CreateMessage {
        embeds: vec![embed],
        components,
    }
}

impl DiscordClient {
    pub fn new(http: Client, bot_token: impl Into<String>) -> Self {
        Self::with_base_url(http, bot_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Client, bot_token: impl Into<String>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}

#[async_trait]
impl ChannelDispatcher for DiscordClient {
    async fn ready(&self) -> ClientResult<String> {
        let url = format!("{}/users/@me", self.base_url);
        let request = self.http.get(&url).header("Authorization", self.auth());
        let me: CurrentUser = fetch_json(SOURCE, &url, request).await?;
        Ok(me.username)
    }

    async fn resolve_channel(&self, channel_id: &str) -> ClientResult<String> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);
        let request = self.http.get(&url).header("Authorization", self.auth());
        match fetch_json::<Channel>(SOURCE, &url, request).await {
            Ok(channel) => Ok(channel.name.unwrap_or(channel.id)),
            Err(ClientError::Status { status, .. }) => Err(ClientError::ChannelUnavailable {
                channel_id: channel_id.to_string(),
                detail: format!("HTTP {}", status),
            }),
            Err(e) => Err(e),
        }
    }

    async fn send(&self, channel_id: &str, notification: &Notification) -> ClientResult<()> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.auth())
            .json(&message_body(notification))
            .send()
            .await
            .map_err(|e| ClientError::http(SOURCE, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ClientError::Dispatch {
                channel_id: channel_id.to_string(),
                detail: format!("{} body={}", status, text),
            });
        }
        Ok(())
    }
}
