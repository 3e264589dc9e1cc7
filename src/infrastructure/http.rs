//! HTTP transport to the payment service.
//!
//! Two JSON endpoints are used:
//!
//! - `POST <base>/create-payment-request` with `{amount, note?, callbackUrl, apiKey}`
//!   and the credential repeated in the `x-api-key` header.
//! - `GET <base>/payment-status/<id>` returning `{status, details?}`.
//!
//! No retries happen here. The coordinator's poll loop is the only place a
//! request is repeated.

use crate::config::ClientConfig;
use crate::domain::payment::{PaymentId, PaymentRequest, StatusReport};
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
    callback_url: &'a str,
    api_key: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    #[serde(default)]
    payment_id: Option<String>,
}

/// [`PaymentGateway`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPaymentGateway {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, config.service_base_url.clone()))
    }

    /// Uses a caller-built client, e.g. one with a proxy or custom TLS roots.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PaymentError::ConfigError(format!(
                    "service base {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentId> {
        let api_key = HeaderValue::from_str(request.api_key()).map_err(|_| {
            PaymentError::ValidationError(
                "apiKey contains characters that cannot be sent in a header".to_string(),
            )
        })?;
        let url = self.endpoint(&["create-payment-request"])?;
        let body = CreatePaymentBody {
            amount: request.amount().value(),
            note: request.note(),
            callback_url: request.callback_url(),
            api_key: request.api_key(),
        };

        debug!(%url, amount = %request.amount(), "creating payment");
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // An unreadable error body counts as empty.
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::RemoteError {
                status: status.as_u16(),
                message: remote_message(&text, || {
                    format!("createPayment failed ({})", status.as_u16())
                }),
            });
        }
        let text = response.text().await?;

        // A body that does not parse is treated like an empty object.
        let parsed = serde_json::from_str::<CreatePaymentResponse>(&text)
            .unwrap_or(CreatePaymentResponse { payment_id: None });
        match parsed.payment_id.filter(|id| !id.is_empty()) {
            Some(id) => PaymentId::new(id),
            None => Err(PaymentError::RemoteError {
                status: status.as_u16(),
                message: "createPayment response did not include a paymentId".to_string(),
            }),
        }
    }

    async fn payment_status(&self, id: &PaymentId) -> Result<StatusReport> {
        let url = self.endpoint(&["payment-status", id.as_str()])?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::RemoteError {
                status: status.as_u16(),
                message: format!("status fetch failed ({})", status.as_u16()),
            });
        }
        Ok(response.json::<StatusReport>().await?)
    }
}

/// The service's `error` field, else the raw body, else `fallback()`.
fn remote_message(body: &str, fallback: impl FnOnce() -> String) -> String {
    let reported = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.is_empty());

    match reported {
        Some(message) => message,
        None if !body.trim().is_empty() => body.to_string(),
        None => fallback(),
    }
}
