//! Error types shared by the external data clients and the chat dispatcher.

use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or request timeout
    #[error("{source_name} request failed: {error}")]
    Http {
        source_name: &'static str,
        #[source]
        error: reqwest::Error,
    },

    /// The remote answered with a non-2xx status
    #[error("{source_name} returned {status} for {url}")]
    Status {
        source_name: &'static str,
        status: u16,
        url: String,
    },

    /// The body could not be decoded into the expected shape
    #[error("{source_name} returned a malformed body: {detail}")]
    Decode {
        source_name: &'static str,
        detail: String,
    },

    /// Call skipped because the source's circuit breaker is open
    #[error("{source_name} circuit breaker is open")]
    CircuitOpen { source_name: &'static str },

    /// The chat service rejected a message
    #[error("dispatch to channel {channel_id} rejected: {detail}")]
    Dispatch { channel_id: String, detail: String },

    /// The destination channel does not exist or the bot cannot see it
    #[error("channel {channel_id} is not available: {detail}")]
    ChannelUnavailable { channel_id: String, detail: String },
}

impl ClientError {
    pub fn http(source_name: &'static str, error: reqwest::Error) -> Self {
        ClientError::Http { source_name, error }
    }

    pub fn decode(source_name: &'static str, detail: impl std::fmt::Display) -> Self {
        ClientError::Decode {
            source_name,
            detail: detail.to_string(),
        }
    }

    /// True for failures that are expected to clear up on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http { .. } | ClientError::CircuitOpen { .. } => true,
            ClientError::Status { status, .. } => *status == 429 || *status >= 500,
            ClientError::Decode { .. } => true,
            ClientError::Dispatch { .. } => true,
            ClientError::ChannelUnavailable { .. } => false,
        }
    }
}
