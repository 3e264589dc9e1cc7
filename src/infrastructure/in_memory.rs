use crate::domain::payment::{PaymentId, PaymentRequest, PaymentStatus, StatusReport};
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One scripted answer of the in-memory status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedStatus {
    Report(StatusReport),
    /// The request fails with a `RemoteError` carrying this HTTP status.
    Unavailable(u16),
}

impl From<&str> for ScriptedStatus {
    fn from(status: &str) -> Self {
        Self::Report(StatusReport::new(status))
    }
}

#[derive(Default)]
struct GatewayState {
    next_id: u64,
    create_failure: Option<(u16, String)>,
    created: Vec<PaymentRequest>,
    scripts: HashMap<PaymentId, VecDeque<ScriptedStatus>>,
    default_script: Vec<ScriptedStatus>,
    status_calls: HashMap<PaymentId, usize>,
}

/// A scripted payment service held in memory.
///
/// Payments are numbered `p1`, `p2`, ... Each status request pops the next
/// scripted answer for the payment; the last answer repeats once the script
/// runs out, and a payment without a script reports `waiting_user_input`.
///
/// Uses `Arc<RwLock<..>>` so clones share state, which lets a test keep a
/// handle for assertions while the coordinator owns another.
#[derive(Default, Clone)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new, empty in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payment created from now on answers status requests with `script`.
    pub async fn script_all<S: Into<ScriptedStatus>>(&self, script: impl IntoIterator<Item = S>) {
        let mut state = self.state.write().await;
        state.default_script = script.into_iter().map(Into::into).collect();
    }

    /// Replaces the script of one payment.
    pub async fn script<S: Into<ScriptedStatus>>(
        &self,
        id: &PaymentId,
        script: impl IntoIterator<Item = S>,
    ) {
        let mut state = self.state.write().await;
        state
            .scripts
            .insert(id.clone(), script.into_iter().map(Into::into).collect());
    }

    /// Makes every following create call fail like a non-2xx response.
    pub async fn fail_creation(&self, status: u16, message: impl Into<String>) {
        let mut state = self.state.write().await;
        state.create_failure = Some((status, message.into()));
    }

    /// Requests accepted by `create_payment`, oldest first.
    pub async fn created(&self) -> Vec<PaymentRequest> {
        self.state.read().await.created.clone()
    }

    pub async fn status_calls(&self, id: &PaymentId) -> usize {
        let state = self.state.read().await;
        state.status_calls.get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentId> {
        let mut state = self.state.write().await;
        if let Some((status, message)) = state.create_failure.clone() {
            return Err(PaymentError::RemoteError { status, message });
        }

        state.next_id += 1;
        let id = PaymentId::new(format!("p{}", state.next_id))?;
        state.created.push(request.clone());
        if !state.scripts.contains_key(&id) {
            let script = state.default_script.iter().cloned().collect();
            state.scripts.insert(id.clone(), script);
        }
        Ok(id)
    }

    async fn payment_status(&self, id: &PaymentId) -> Result<StatusReport> {
        let mut state = self.state.write().await;
        *state.status_calls.entry(id.clone()).or_default() += 1;

        let script = state.scripts.entry(id.clone()).or_default();
        let answer = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        match answer {
            Some(ScriptedStatus::Report(report)) => Ok(report),
            Some(ScriptedStatus::Unavailable(status)) => Err(PaymentError::RemoteError {
                status,
                message: format!("status fetch failed ({status})"),
            }),
            None => Ok(StatusReport::new(PaymentStatus::WaitingUserInput)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaymentDefaults;
    use crate::domain::payment::CreatePaymentOptions;
    use rust_decimal_macros::dec;

    fn request() -> PaymentRequest {
        PaymentRequest::resolve(
            CreatePaymentOptions::new(dec!(5))
                .with_api_key("key")
                .with_callback_url("https://cb"),
            &PaymentDefaults::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let gateway = InMemoryPaymentGateway::new();
        assert_eq!(gateway.create_payment(&request()).await.unwrap().as_str(), "p1");
        assert_eq!(gateway.create_payment(&request()).await.unwrap().as_str(), "p2");
        assert_eq!(gateway.created().await.len(), 2);
    }

    #[tokio::test]
    async fn test_script_last_answer_repeats() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.script_all(["waiting_user_input", "approved"]).await;
        let id = gateway.create_payment(&request()).await.unwrap();

        let statuses = [
            gateway.payment_status(&id).await.unwrap().status,
            gateway.payment_status(&id).await.unwrap().status,
            gateway.payment_status(&id).await.unwrap().status,
        ];
        assert_eq!(
            statuses,
            [
                PaymentStatus::WaitingUserInput,
                PaymentStatus::Approved,
                PaymentStatus::Approved
            ]
        );
        assert_eq!(gateway.status_calls(&id).await, 3);
    }

    #[tokio::test]
    async fn test_unscripted_payment_waits() {
        let gateway = InMemoryPaymentGateway::new();
        let id = gateway.create_payment(&request()).await.unwrap();
        let report = gateway.payment_status(&id).await.unwrap();
        assert_eq!(report.status, PaymentStatus::WaitingUserInput);
    }

    #[tokio::test]
    async fn test_unavailable_answer_is_remote_error() {
        let gateway = InMemoryPaymentGateway::new();
        let id = gateway.create_payment(&request()).await.unwrap();
        gateway.script(&id, [ScriptedStatus::Unavailable(503)]).await;
        let err = gateway.payment_status(&id).await.unwrap_err();
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_creation_failure() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.fail_creation(400, "insufficient funds").await;
        let err = gateway.create_payment(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "insufficient funds");
        assert!(gateway.created().await.is_empty());
    }
}
