//! Human confirmation flow.
//!
//! A paused execution waits behind a one-time token with a validity
//! window. Confirming a live token resumes the plan; a token past its
//! window is reported as expired — a distinct signal, not a generic
//! failure — and an unknown or already-consumed token as unknown. Either
//! way the token is gone after one attempt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ConfirmError;
use crate::plan::interpreter::PlanInterpreter;

/// Result value stored under the confirming action's name.
pub const CONFIRMED_VALUE: &str = "confirmed";

struct PendingConfirmation {
    interpreter: Arc<PlanInterpreter>,
    action_name: String,
    expires_at: DateTime<Utc>,
}

/// Issues and validates confirmation tokens for paused executions.
pub struct ConfirmationService {
    ttl: TimeDelta,
    pending: Mutex<HashMap<String, PendingConfirmation>>,
}

impl ConfirmationService {
    /// Create a service whose tokens are valid for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a token for an execution paused at `action_name`.
    pub async fn issue(&self, interpreter: Arc<PlanInterpreter>, action_name: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!(
            execution = %interpreter.execution_id(),
            action = action_name,
            %expires_at,
            "issued confirmation token"
        );
        self.pending.lock().await.insert(
            token.clone(),
            PendingConfirmation {
                interpreter,
                action_name: action_name.to_string(),
                expires_at,
            },
        );
        token
    }

    /// Validate a token and resume the paused execution.
    ///
    /// The token is consumed regardless of the outcome.
    pub async fn confirm(&self, token: &str) -> Result<(), ConfirmError> {
        let pending = self.pending.lock().await.remove(token);
        let Some(pending) = pending else {
            return Err(ConfirmError::Unknown {
                token: token.to_string(),
            });
        };
        if Utc::now() > pending.expires_at {
            return Err(ConfirmError::Expired {
                token: token.to_string(),
            });
        }
        info!(
            execution = %pending.interpreter.execution_id(),
            action = %pending.action_name,
            "confirmation received; resuming plan"
        );
        pending
            .interpreter
            .advance(Some(CONFIRMED_VALUE.to_string()))
            .await?;
        Ok(())
    }

    /// Number of confirmations currently awaited.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
