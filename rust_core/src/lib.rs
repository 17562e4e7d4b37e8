//! FRC Watch Core - shared plumbing for the championship watch bot.
//!
//! This crate provides:
//! - Domain models for live queue, results, rankings and predictions
//! - Clients for the results, live queue, prediction and chat services
//! - Match identity parsing between the two event data sources
//! - Circuit breaker for best-effort upstreams

pub mod circuit_breaker;
pub mod clients;
pub mod error;
pub mod matching;
pub mod models;

pub use error::{ClientError, ClientResult};
pub use matching::{CompLevel, MatchId};
pub use models::*;
