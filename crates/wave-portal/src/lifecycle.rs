//! The wave submission state machine.
//!
//! ```text
//! Idle ──submit──▶ Approving ──broadcast──▶ Mining ──mined──▶ Idle
//!  ▲                  │  │                     │
//!  └────declined──────┘  └──failed──▶ Error ◀──┘ failed
//!                                       │
//!                                       └──submit──▶ Approving
//! ```

use crate::{
    contract::{ContractClient, WaveBackend, WaveReceipt},
    error::{ErrorInfo, WaveError},
};
use alloy_primitives::TxHash;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future};
use tokio::sync::watch;

/// The phase of the current submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Waiting for the wallet to sign and broadcast.
    Approving,
    /// Broadcast, waiting to be mined.
    Mining,
    /// The last submission failed.
    Error,
}

impl Phase {
    /// Whether a new submission may start.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    pub fn is_in_flight(&self) -> bool {
        !self.accepts_submission()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "ready",
            Self::Approving => "waiting for approval",
            Self::Mining => "mining",
            Self::Error => "error",
        })
    }
}

/// The in-flight, or most recently finished, submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLifecycle {
    pub phase: Phase,
    pub pending_message: Option<String>,
    pub tx_hash: Option<TxHash>,
    pub error: Option<ErrorInfo>,
    /// Incremented by every submission that starts.
    pub attempt: u64,
}

/// How a submission ended, when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The wave was mined.
    Confirmed(WaveReceipt),
    /// The user declined to sign.
    Declined,
}

/// Owns the [`TransactionLifecycle`] and enforces that at most one submission is in flight.
#[derive(Debug)]
pub struct LifecycleController {
    state: watch::Sender<TransactionLifecycle>,
    /// The error an attempt was aborted with, keyed by attempt.
    aborted: Mutex<Option<(u64, WaveError)>>,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(TransactionLifecycle::default()),
            aborted: Mutex::new(None),
        }
    }

    pub fn current(&self) -> TransactionLifecycle {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn watch(&self) -> watch::Receiver<TransactionLifecycle> {
        self.state.subscribe()
    }

    /// Drives one wave through `Approving` and `Mining`.
    ///
    /// `checkpoint` runs after each suspension, before the next transition; it may
    /// [`abort`](Self::abort) the submission. `on_mined` runs after confirmation and before the
    /// lifecycle settles back to `Idle`.
    ///
    /// Rejected with [`WaveError::InvalidState`], without touching the lifecycle or the
    /// chain, if a submission is already in flight.
    pub async fn submit<B, C, R>(
        &self,
        client: &ContractClient<B>,
        message: &str,
        checkpoint: C,
        on_mined: R,
    ) -> Result<SubmitOutcome, WaveError>
    where
        B: WaveBackend,
        C: Fn(),
        R: Future<Output = ()>,
    {
        let mut attempt = self.begin(message)?;

        let sent = client.wave(message).await;
        checkpoint();
        let tx_hash = match sent {
            Ok(tx_hash) => tx_hash,
            Err(err) if err.is_user_rejection() => {
                debug!(%err, "wave declined");
                attempt.finish(|state| {
                    *state = TransactionLifecycle { attempt: state.attempt, ..Default::default() }
                })?;
                return Ok(SubmitOutcome::Declined);
            }
            Err(err) => return Err(attempt.fail(err)),
        };
        // broadcast already happened, keep the hash even if the attempt was aborted meanwhile
        attempt.record_hash(tx_hash);
        attempt.advance(|state| {
            state.phase = Phase::Mining;
            state.tx_hash = Some(tx_hash);
        })?;

        let mined = client.await_confirmation(tx_hash).await;
        checkpoint();
        let receipt = match mined {
            Ok(receipt) => receipt,
            Err(err) => return Err(attempt.fail(err)),
        };

        on_mined.await;

        attempt.finish(|state| {
            state.phase = Phase::Idle;
            state.pending_message = None;
        })?;
        Ok(SubmitOutcome::Confirmed(receipt))
    }

    /// Fails the in-flight submission, if any. Returns whether one was in flight.
    pub fn abort(&self, err: &WaveError) -> bool {
        self.abort_if(err, |_| true)
    }

    /// Clears a failed lifecycle back to `Idle`. No-op in any other phase.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if state.phase != Phase::Error {
                return false;
            }
            *state = TransactionLifecycle { attempt: state.attempt, ..Default::default() };
            true
        });
    }

    /// Moves to `Approving` if nothing is in flight, discarding any earlier error.
    fn begin(&self, message: &str) -> Result<Attempt<'_>, WaveError> {
        let mut started = Err(Phase::Idle);
        self.state.send_if_modified(|state| {
            if state.phase.is_in_flight() {
                started = Err(state.phase);
                return false;
            }
            *state = TransactionLifecycle {
                phase: Phase::Approving,
                pending_message: Some(message.to_string()),
                tx_hash: None,
                error: None,
                attempt: state.attempt + 1,
            };
            started = Ok(state.attempt);
            true
        });
        match started {
            Ok(id) => {
                debug!(pending = message, attempt = id, "submitting wave");
                Ok(Attempt { controller: self, id, armed: true })
            }
            Err(phase) => Err(WaveError::invalid_state(format!("a wave is already {phase}"))),
        }
    }

    fn abort_if(&self, err: &WaveError, owns: impl FnOnce(&TransactionLifecycle) -> bool) -> bool {
        let aborted = self.state.send_if_modified(|state| {
            if !state.phase.is_in_flight() || !owns(state) {
                return false;
            }
            state.phase = Phase::Error;
            state.error = Some(err.into());
            *self.aborted.lock() = Some((state.attempt, err.clone()));
            true
        });
        if aborted {
            warn!(%err, "aborted in-flight wave");
        }
        aborted
    }
}

/// One submission's claim on the lifecycle.
///
/// Transitions only apply while the lifecycle is still in flight for this attempt. Dropping an
/// unfinished attempt fails it.
struct Attempt<'a> {
    controller: &'a LifecycleController,
    id: u64,
    armed: bool,
}

impl Attempt<'_> {
    fn advance(&mut self, update: impl FnOnce(&mut TransactionLifecycle)) -> Result<(), WaveError> {
        let id = self.id;
        let owned = self.controller.state.send_if_modified(|state| {
            if state.attempt != id || !state.phase.is_in_flight() {
                return false;
            }
            update(state);
            true
        });
        if !owned {
            self.armed = false;
            return Err(self.aborted_with());
        }
        trace!(phase = %self.controller.phase(), attempt = id, "lifecycle transition");
        Ok(())
    }

    /// Records the broadcast hash while this attempt still owns the lifecycle, in any phase.
    fn record_hash(&self, tx_hash: TxHash) {
        let id = self.id;
        self.controller.state.send_if_modified(|state| {
            if state.attempt != id {
                return false;
            }
            state.tx_hash = Some(tx_hash);
            true
        });
    }

    /// The error this attempt was aborted with.
    fn aborted_with(&self) -> WaveError {
        match &*self.controller.aborted.lock() {
            Some((id, err)) if *id == self.id => err.clone(),
            _ => WaveError::network("wave was aborted before it completed"),
        }
    }

    fn finish(&mut self, update: impl FnOnce(&mut TransactionLifecycle)) -> Result<(), WaveError> {
        self.advance(update)?;
        self.armed = false;
        Ok(())
    }

    /// Records `err` on the lifecycle and returns it. If the attempt was aborted first, the
    /// abort error stays recorded and is returned instead.
    fn fail(&mut self, err: WaveError) -> WaveError {
        debug!(%err, attempt = self.id, "wave failed");
        match self.finish(|state| {
            state.phase = Phase::Error;
            state.error = Some((&err).into());
        }) {
            Ok(()) => err,
            Err(aborted) => {
                debug!(%err, %aborted, "wave failed after it was aborted");
                aborted
            }
        }
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.armed {
            let id = self.id;
            self.controller.abort_if(
                &WaveError::network("submission dropped before it completed"),
                |state| state.attempt == id,
            );
        }
    }
}
