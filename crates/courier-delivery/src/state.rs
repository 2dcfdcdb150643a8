// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle state machine.
//!
//! Transport callbacks are translated into [`TransportEvent`] values by the
//! adapter; this machine consumes them through a single transition function
//! and returns the [`Effect`] the supervisor must execute. The machine
//! itself performs no I/O, which keeps every transition unit-testable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier_config::model::TransportConfig;
use courier_core::types::{ConnectionState, TransportEvent};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// What the supervisor must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing beyond the state change.
    None,
    /// Surface a pairing challenge to the operator.
    SurfacePairing(String),
    /// Surface one last pairing challenge, then tear down and reconnect.
    SurfacePairingThenRestart { data: String, delay: Duration },
    /// The connection became Ready; signal the drain loop (idempotent).
    StartDrain,
    /// Tear down and reconnect the transport after `delay`.
    ScheduleRestart { delay: Duration },
    /// Automatic recovery is exhausted; stop retrying.
    GiveUp,
}

/// Tracks the transport lifecycle and applies the restart policy.
///
/// The readiness flag is shared as an `Arc<AtomicBool>` so concurrent
/// senders observe `Ready -> Disconnected` the instant the transition
/// completes, with no stale reads.
pub struct ConnectionStateMachine {
    state: ConnectionState,
    ready: Arc<AtomicBool>,
    pairing_retries: u32,
    restart_attempts: u32,
    last_auth_failure: Option<Instant>,
    pairing_retry_limit: u32,
    max_reconnect_attempts: u32,
    restart_base_delay: Duration,
    auth_failure_window: Duration,
}

impl ConnectionStateMachine {
    pub fn new(config: &TransportConfig, ready: Arc<AtomicBool>) -> Self {
        Self {
            state: ConnectionState::Initializing,
            ready,
            pairing_retries: 0,
            restart_attempts: 0,
            last_auth_failure: None,
            pairing_retry_limit: config.pairing_retry_limit,
            max_reconnect_attempts: config.max_reconnect_attempts,
            restart_base_delay: Duration::from_millis(config.restart_base_delay_ms),
            auth_failure_window: Duration::from_millis(config.auth_failure_window_ms),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn restart_attempts(&self) -> u32 {
        self.restart_attempts
    }

    /// Called by the supervisor once a scheduled restart has re-established
    /// the transport and a fresh bootstrap begins.
    pub fn mark_initializing(&mut self) {
        self.state = ConnectionState::Initializing;
    }

    /// The single transition function: consume one lifecycle event, mutate
    /// state, and return the effect the supervisor must execute.
    pub fn apply(&mut self, event: &TransportEvent) -> Effect {
        match event {
            TransportEvent::PairingChallenge(data) => {
                self.pairing_retries += 1;
                if self.pairing_retries > self.pairing_retry_limit {
                    warn!(
                        retries = self.pairing_retries,
                        "pairing retry limit exceeded, restarting session"
                    );
                    self.state = ConnectionState::Restarting;
                    // The operator still gets this challenge before the
                    // session is torn down.
                    return Effect::SurfacePairingThenRestart {
                        data: data.clone(),
                        delay: self.restart_base_delay,
                    };
                }
                self.state = ConnectionState::AwaitingPairing;
                Effect::SurfacePairing(data.clone())
            }

            TransportEvent::Ready(info) => {
                self.state = ConnectionState::Ready;
                self.ready.store(true, Ordering::SeqCst);
                self.pairing_retries = 0;
                self.restart_attempts = 0;
                info!(
                    user = info.display_name.as_str(),
                    user_id = info.user_id.as_str(),
                    "transport session ready"
                );
                Effect::StartDrain
            }

            TransportEvent::Authenticated => {
                info!("transport session authenticated");
                Effect::None
            }

            TransportEvent::AuthFailed(reason) => {
                self.ready.store(false, Ordering::SeqCst);
                error!(reason = reason.as_str(), "authentication failure");

                let now = Instant::now();
                let repeated = self
                    .last_auth_failure
                    .is_some_and(|prev| now.duration_since(prev) < self.auth_failure_window);
                self.last_auth_failure = Some(now);

                if repeated {
                    // A locked-out session would hot-loop here; fail fast.
                    self.state = ConnectionState::Failed;
                    return Effect::GiveUp;
                }
                self.state = ConnectionState::Restarting;
                Effect::ScheduleRestart {
                    delay: self.restart_base_delay,
                }
            }

            TransportEvent::Disconnected(reason) => {
                self.ready.store(false, Ordering::SeqCst);
                self.state = ConnectionState::Disconnected;
                warn!(reason = reason.as_str(), "transport disconnected");

                if self.restart_attempts >= self.max_reconnect_attempts {
                    error!(
                        attempts = self.restart_attempts,
                        "max reconnection attempts reached, manual intervention required"
                    );
                    self.state = ConnectionState::Failed;
                    return Effect::GiveUp;
                }

                self.restart_attempts += 1;
                self.state = ConnectionState::Restarting;
                info!(
                    attempt = self.restart_attempts,
                    max = self.max_reconnect_attempts,
                    "attempting to reconnect"
                );
                Effect::ScheduleRestart {
                    delay: self.restart_base_delay * self.restart_attempts,
                }
            }

            TransportEvent::LoadProgress { percent, stage } => {
                if *percent < 100 {
                    info!(percent, stage = stage.as_str(), "session loading");
                }
                Effect::None
            }

            TransportEvent::Error(err) => {
                error!(error = err.as_str(), "transport error");
                Effect::None
            }
        }
    }
}
