//! Circuit breaker for best-effort external sources.
//!
//! A source that keeps failing is skipped for a cool-down period instead of
//! adding a full request timeout to every poll tick. Callers map the
//! short-circuit error to whatever neutral value the source stands in for.

use crate::error::{ClientError, ClientResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// States for the API circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests flow normally
    Closed,
    /// Requests are refused until the recovery timeout elapses
    Open,
    /// Probing whether the source has recovered
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing again
    pub recovery_timeout: Duration,
    /// Successful probes needed to close the circuit again
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

pub struct ApiCircuitBreaker {
    source_name: &'static str,
    config: BreakerConfig,
    state: RwLock<BreakerState>,
    failures: AtomicU32,
    probe_successes: AtomicU32,
    opened_at: RwLock<Option<Instant>>,
}

impl std::fmt::Debug for ApiCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCircuitBreaker")
            .field("source", &self.source_name)
            .field("state", &self.state())
            .finish()
    }
}

impl ApiCircuitBreaker {
    pub fn new(source_name: &'static str, config: BreakerConfig) -> Self {
        Self {
            source_name,
            config,
            state: RwLock::new(BreakerState::Closed),
            failures: AtomicU32::new(0),
            probe_successes: AtomicU32::new(0),
            opened_at: RwLock::new(None),
        }
    }

    /// Fails fast with `CircuitOpen` while the circuit is open.
    pub fn check(&self) -> ClientResult<()> {
        let mut state = self.state.write();
        match *state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let opened_at = *self.opened_at.read();
                let cooled_down = opened_at
                    .map(|t| t.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if cooled_down {
                    *state = BreakerState::HalfOpen;
                    self.probe_successes.store(0, Ordering::SeqCst);
                    Ok(())
                } else {
                    Err(ClientError::CircuitOpen {
                        source_name: self.source_name,
                    })
                }
            }
        }
    }

    /// Feed the outcome of a guarded call back into the breaker.
    pub fn record<T>(&self, outcome: &ClientResult<T>) {
        match outcome {
            Err(e) if e.is_transient() => self.record_failure(),
            // A 4xx means the source answered; it just has nothing for us.
            Ok(_) | Err(_) => self.record_success(),
        }
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
        let mut state = self.state.write();
        if *state == BreakerState::HalfOpen {
            let probes = self.probe_successes.fetch_add(1, Ordering::SeqCst) + 1;
            if probes >= self.config.success_threshold {
                *state = BreakerState::Closed;
                tracing::info!("{} circuit closed after {} probes", self.source_name, probes);
            }
        } else {
            *state = BreakerState::Closed;
        }
    }

    pub fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write();
        match *state {
            BreakerState::Closed if failures >= self.config.failure_threshold => {
                *state = BreakerState::Open;
                *self.opened_at.write() = Some(Instant::now());
                tracing::warn!(
                    "{} circuit OPENED after {} consecutive failures",
                    self.source_name,
                    failures
                );
            }
            BreakerState::HalfOpen => {
                *state = BreakerState::Open;
                *self.opened_at.write() = Some(Instant::now());
                tracing::warn!("{} circuit re-opened during probe", self.source_name);
            }
            _ => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        *self.state.read()
    }
}
