use crate::config::{ClientConfig, PaymentDefaults, PollConfig};
use crate::domain::payment::{CreatePaymentOptions, PaymentId, PaymentRequest, PaymentStatus};
use crate::domain::ports::PaymentGatewayRef;
use crate::domain::session::{PaymentSession, Recorded};
use crate::error::Result;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Drives one payment at a time from creation to a terminal status.
///
/// `PaymentCoordinator` owns the session record and the poll task. The
/// session is published through a `watch` channel so observers (the surface
/// manager, a UI) always read the latest state, in the order the poller
/// applied it. Dropping the coordinator cancels polling.
pub struct PaymentCoordinator {
    gateway: PaymentGatewayRef,
    defaults: PaymentDefaults,
    poll: PollConfig,
    session: Arc<watch::Sender<PaymentSession>>,
    poller: Mutex<Option<DropGuard>>,
}

impl PaymentCoordinator {
    /// Creates a coordinator using the defaults and poll policy of `config`.
    pub fn new(gateway: PaymentGatewayRef, config: &ClientConfig) -> Self {
        let (session, _) = watch::channel(PaymentSession::default());
        Self {
            gateway,
            defaults: config.defaults.clone(),
            poll: config.poll.clone(),
            session: Arc::new(session),
            poller: Mutex::new(None),
        }
    }

    /// Creates a payment and starts polling its status.
    ///
    /// Fails with `SessionInProgress` while another payment of this
    /// coordinator is being created or polled. Validation and transport
    /// errors are returned unchanged and leave no polling behind. If
    /// [`teardown`](Self::teardown) runs while the service is still creating
    /// the payment, the identifier is returned and recorded but never polled.
    pub async fn start_payment(&self, options: CreatePaymentOptions) -> Result<PaymentId> {
        let request = PaymentRequest::resolve(options, &self.defaults)?;
        let claim = CreateClaim::acquire(&self.session)?;

        // Armed before the create call so a teardown during it is not lost.
        let token = CancellationToken::new();
        self.replace_poller(Some(token.clone().drop_guard()));

        let id = self.gateway.create_payment(&request).await?;
        info!(payment_id = %id, amount = %request.amount(), "payment created");

        let mut torn_down = false;
        self.session.send_modify(|session| {
            session.created(id.clone());
            torn_down = token.is_cancelled();
            if torn_down {
                session.stop_polling();
            }
        });
        claim.disarm();

        if torn_down {
            info!(payment_id = %id, "torn down during creation, not polling");
        } else {
            self.spawn_poller(id.clone(), token);
        }
        Ok(id)
    }

    /// Stops polling regardless of the session status. Calling it again is a no-op.
    pub fn teardown(&self) {
        self.replace_poller(None);
        self.session.send_if_modified(PaymentSession::stop_polling);
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> PaymentSession {
        self.session.borrow().clone()
    }

    pub fn status(&self) -> PaymentStatus {
        self.session.borrow().status().clone()
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.session.borrow().identifier().cloned()
    }

    /// Receives every session change, starting from the current state.
    pub fn subscribe(&self) -> watch::Receiver<PaymentSession> {
        self.session.subscribe()
    }

    /// Waits until no create call is outstanding and polling has stopped.
    pub async fn settled(&self) -> PaymentSession {
        let mut updates = self.subscribe();
        let settled = updates
            .wait_for(|session| !session.is_active())
            .await
            .map(|session| session.clone());
        settled.unwrap_or_else(|_| self.session())
    }

    /// Returns `true` only the first time it is called for `id`.
    ///
    /// Guard updates do not wake subscribers.
    pub fn mark_navigated(&self, id: &PaymentId) -> bool {
        let mut first = false;
        self.session.send_if_modified(|session| {
            first = session.mark_navigated(id);
            false
        });
        first
    }

    /// Returns `true` only the first time it is called for `id`.
    pub fn mark_terminal_dispatched(&self, id: &PaymentId) -> bool {
        let mut first = false;
        self.session.send_if_modified(|session| {
            first = session.mark_terminal_dispatched(id);
            false
        });
        first
    }

    /// Re-arms navigation for `id` after its surface was lost.
    pub fn reset_navigation(&self, id: &PaymentId) {
        self.session.send_if_modified(|session| {
            session.reset_navigation(id);
            false
        });
    }

    fn spawn_poller(&self, id: PaymentId, token: CancellationToken) {
        let task = PollTask {
            gateway: Arc::clone(&self.gateway),
            session: Arc::clone(&self.session),
            policy: self.poll.clone(),
            id,
            token,
        };
        tokio::spawn(task.run());
    }

    /// Dropping the previous guard cancels whatever it was guarding.
    fn replace_poller(&self, guard: Option<DropGuard>) {
        let previous = std::mem::replace(
            &mut *self.poller.lock().unwrap_or_else(PoisonError::into_inner),
            guard,
        );
        drop(previous);
    }
}

impl Drop for PaymentCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Claim on the session for the duration of a create call.
///
/// Released on every exit path, including the caller dropping the future,
/// unless the payment was created.
struct CreateClaim<'a> {
    session: &'a watch::Sender<PaymentSession>,
    armed: bool,
}

impl<'a> CreateClaim<'a> {
    fn acquire(session: &'a watch::Sender<PaymentSession>) -> Result<Self> {
        let mut claimed = Ok(());
        session.send_if_modified(|state| {
            claimed = state.begin();
            claimed.is_ok()
        });
        claimed.map(|()| Self {
            session,
            armed: true,
        })
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CreateClaim<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.send_modify(PaymentSession::abort);
        }
    }
}

struct PollTask {
    gateway: PaymentGatewayRef,
    session: Arc<watch::Sender<PaymentSession>>,
    policy: PollConfig,
    id: PaymentId,
    token: CancellationToken,
}

impl PollTask {
    /// Polls at a fixed interval, one request at a time.
    ///
    /// Stops on a terminal status, on cancellation, when the session moved on
    /// to another payment, or when the failure budget runs out.
    async fn run(self) {
        let interval = self.policy.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                outcome = self.gateway.payment_status(&self.id) => outcome,
            };

            match outcome {
                Ok(report) => {
                    failures = 0;
                    let status = normalize(&self.policy, report.status);
                    debug!(payment_id = %self.id, %status, "polled payment status");

                    let mut recorded = Recorded::Ignored;
                    self.session.send_if_modified(|session| {
                        if session.identifier() != Some(&self.id) {
                            return false;
                        }
                        recorded = session.record(status, report.details);
                        recorded != Recorded::Ignored
                    });

                    match recorded {
                        Recorded::Progress => {}
                        Recorded::Terminal => {
                            let status = self.session.borrow().status().clone();
                            info!(payment_id = %self.id, %status, "payment reached terminal");
                            break;
                        }
                        Recorded::Ignored => break,
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(payment_id = %self.id, failures, "status poll failed: {e}");

                    if let Some(max) = self.policy.max_consecutive_failures
                        && failures >= max
                    {
                        warn!(payment_id = %self.id, failures, "giving up on status polling");
                        self.session.send_if_modified(|session| {
                            if session.identifier() != Some(&self.id) {
                                return false;
                            }
                            session.abandon(failures);
                            true
                        });
                        break;
                    }
                }
            }
        }

        self.token.cancel();
        self.session.send_if_modified(|session| {
            session.identifier() == Some(&self.id) && session.stop_polling()
        });
    }
}

fn normalize(policy: &PollConfig, status: PaymentStatus) -> PaymentStatus {
    match status {
        PaymentStatus::Other(raw) if policy.approved_aliases.contains(&raw) => {
            PaymentStatus::Approved
        }
        other => other,
    }
}
