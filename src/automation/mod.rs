//! Auto-answer automation: repeatedly asks the oracle to answer the current
//! question, applies the suggestion, and advances, until the interview ends
//! or the operator cancels.
//!
//! Cancellation is cooperative. The stop flag is checked before the oracle
//! round trip, after it, and again after the settle delay, so a stop request
//! takes effect before the next tree mutation. A restart bumps the session
//! epoch; a cycle that started against the old epoch discards its result
//! instead of applying it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::session::SessionController;

/// Why an automation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationOutcome {
    /// The traversal surfaced no further question.
    Complete,
    /// The operator cancelled, or the session was restarted mid-cycle.
    Stopped,
    /// The oracle produced no usable suggestion for the current question.
    NoSuggestion,
    /// The question budget ran out.
    Exhausted,
}

/// Shared cancel flag for a running automation loop. Cloneable, so the
/// operator side can keep one while the loop owns another.
#[derive(Debug, Clone, Default)]
pub struct AutomationHandle {
    stop: Arc<AtomicBool>,
}

impl AutomationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Drives auto-answer cycles against one session.
pub struct AutomationLoop {
    settle: Duration,
}

impl AutomationLoop {
    /// Create a loop with the session's configured settle delay.
    pub fn new(session: &SessionController) -> Self {
        Self {
            settle: Duration::from_millis(session.settings().auto_settle_ms),
        }
    }

    /// Create a loop with an explicit settle delay.
    pub fn with_settle(settle: Duration) -> Self {
        Self { settle }
    }

    /// Run cycles until the interview ends, the oracle dries up, or the
    /// handle is stopped. At most one run may drive a session at a time.
    pub async fn run(
        &self,
        session: &mut SessionController,
        handle: &AutomationHandle,
    ) -> AppResult<AutomationOutcome> {
        if session.is_in_flight() {
            return Err(AppError::Internal {
                message: "automation is already running for this session".to_string(),
            });
        }
        session.set_in_flight(true);
        let result = self.drive(session, handle).await;
        session.set_in_flight(false);
        result
    }

    async fn drive(
        &self,
        session: &mut SessionController,
        handle: &AutomationHandle,
    ) -> AppResult<AutomationOutcome> {
        let epoch = session.epoch();
        info!(session_id = %session.id(), "Automation started");

        loop {
            if handle.is_stopped() {
                info!("Automation stopped before cycle");
                return Ok(AutomationOutcome::Stopped);
            }
            let Some(request) = session.suggestion_request() else {
                return Ok(AutomationOutcome::Complete);
            };

            let reply = session.oracle().request_next(request).await;

            if handle.is_stopped() || session.epoch() != epoch {
                info!("Automation stopped during oracle round trip");
                return Ok(AutomationOutcome::Stopped);
            }
            if reply.fallback {
                warn!(error = ?reply.error, "Oracle fell back, stopping automation");
                return Ok(AutomationOutcome::NoSuggestion);
            }
            let Some(answer) = reply
                .suggested_answer
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
            else {
                debug!("Oracle returned no suggestion");
                return Ok(AutomationOutcome::NoSuggestion);
            };

            // Settle window: give the operator a chance to cancel before the
            // suggestion is committed to the tree.
            tokio::time::sleep(self.settle).await;
            if handle.is_stopped() || session.epoch() != epoch {
                info!("Automation stopped during settle window");
                return Ok(AutomationOutcome::Stopped);
            }

            let next = session.apply_suggestion(answer).await?;
            if next.is_none() {
                return Ok(if session.at_question_cap() {
                    AutomationOutcome::Exhausted
                } else {
                    AutomationOutcome::Complete
                });
            }
        }
    }
}
