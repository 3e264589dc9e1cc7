use super::payment::{PaymentId, PaymentStatus};
use crate::error::{PaymentError, Result};

/// Outcome of applying a polled status to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// The status was stored and is not terminal.
    Progress,
    /// The status was stored and ends the session.
    Terminal,
    /// The session already reached a terminal status; nothing changed.
    Ignored,
}

/// State record of one create-to-terminal payment lifecycle.
///
/// The `has_navigated` and `has_dispatched_terminal` guards live here rather
/// than in side tables so every observer of the session sees the same answer
/// to "has this already happened?".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentSession {
    identifier: Option<PaymentId>,
    status: PaymentStatus,
    details: Option<serde_json::Value>,
    observed: Vec<PaymentStatus>,
    creating: bool,
    polling: bool,
    abandoned_after: Option<u32>,
    has_navigated: bool,
    has_dispatched_terminal: bool,
}

impl PaymentSession {
    pub fn identifier(&self) -> Option<&PaymentId> {
        self.identifier.as_ref()
    }

    pub fn status(&self) -> &PaymentStatus {
        &self.status
    }

    /// Extra data from the most recent status report.
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Every status returned by the poller, in the order it was applied.
    pub fn observed(&self) -> &[PaymentStatus] {
        &self.observed
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// A create call is outstanding or the poller is still running.
    pub fn is_active(&self) -> bool {
        self.creating || self.polling
    }

    /// Number of consecutive failures after which polling gave up, if it did.
    pub fn abandoned_after(&self) -> Option<u32> {
        self.abandoned_after
    }

    pub fn has_navigated(&self) -> bool {
        self.has_navigated
    }

    pub fn has_dispatched_terminal(&self) -> bool {
        self.has_dispatched_terminal
    }

    /// Claims the session for a new create call, discarding any finished one.
    pub fn begin(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(PaymentError::SessionInProgress);
        }
        *self = Self {
            creating: true,
            ..Self::default()
        };
        Ok(())
    }

    /// Releases the claim taken by [`begin`](Self::begin) after a failed create.
    pub fn abort(&mut self) {
        self.creating = false;
    }

    pub fn created(&mut self, id: PaymentId) {
        self.identifier = Some(id);
        self.status = PaymentStatus::WaitingUserInput;
        self.creating = false;
        self.polling = true;
    }

    /// Applies a polled status. Terminal statuses are final.
    pub fn record(
        &mut self,
        status: PaymentStatus,
        details: Option<serde_json::Value>,
    ) -> Recorded {
        if self.status.is_terminal() {
            return Recorded::Ignored;
        }
        self.observed.push(status.clone());
        self.status = status;
        self.details = details;
        if self.status.is_terminal() {
            Recorded::Terminal
        } else {
            Recorded::Progress
        }
    }

    /// Marks the poller as stopped. Returns whether anything changed.
    pub fn stop_polling(&mut self) -> bool {
        std::mem::replace(&mut self.polling, false)
    }

    pub fn abandon(&mut self, attempts: u32) {
        self.polling = false;
        self.abandoned_after = Some(attempts);
    }

    /// Returns `true` the first time it is called for `id`.
    pub fn mark_navigated(&mut self, id: &PaymentId) -> bool {
        if self.identifier.as_ref() != Some(id) || self.has_navigated {
            return false;
        }
        self.has_navigated = true;
        true
    }

    /// Allows one more navigation for `id` after its surface was lost.
    pub fn reset_navigation(&mut self, id: &PaymentId) {
        if self.identifier.as_ref() == Some(id) && !self.has_dispatched_terminal {
            self.has_navigated = false;
        }
    }

    /// Returns `true` the first time it is called for `id`.
    pub fn mark_terminal_dispatched(&mut self, id: &PaymentId) -> bool {
        if self.identifier.as_ref() != Some(id) || self.has_dispatched_terminal {
            return false;
        }
        self.has_dispatched_terminal = true;
        true
    }
}
