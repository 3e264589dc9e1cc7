use crate::config::PaymentDefaults;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const INVALID_AMOUNT: &str = "Missing or invalid `amount` (must be a positive number).";

/// Represents a positive monetary amount for a payment request.
///
/// Construction is the only place the positivity rule is checked, so any
/// `Amount` that exists is safe to send.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(INVALID_AMOUNT.to_string()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Amount {
    type Err = PaymentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|_| PaymentError::ValidationError(INVALID_AMOUNT.to_string()))?;
        Self::new(decimal)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Identifier the payment service assigns to a created payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(PaymentError::ValidationError(
                "paymentId is required".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PaymentId {
    type Error = PaymentError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaymentId> for String {
    fn from(id: PaymentId) -> Self {
        id.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a payment as reported by the service.
///
/// The service does not promise a closed set of values, so anything that is
/// not recognised is carried verbatim in `Other` and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    /// No payment has been created yet.
    #[default]
    None,
    WaitingUserInput,
    Approved,
    Failed,
    Other(String),
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::WaitingUserInput => "waiting_user_input",
            Self::Approved => "approved",
            Self::Failed => "failed",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "none" => Self::None,
            "waiting_user_input" => Self::WaitingUserInput,
            "approved" => Self::Approved,
            "failed" => Self::Failed,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a successful `payment-status` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StatusReport {
    pub fn new(status: impl Into<PaymentStatus>) -> Self {
        Self {
            status: status.into(),
            details: None,
        }
    }
}

/// Per-call payment parameters. Missing credential and callback URL fall back
/// to the configured [`PaymentDefaults`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreatePaymentOptions {
    pub amount: Decimal,
    pub note: Option<String>,
    pub callback_url: Option<String>,
    pub api_key: Option<String>,
}

impl CreatePaymentOptions {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// A fully resolved and validated payment request. Immutable once built.
#[derive(Clone, PartialEq)]
pub struct PaymentRequest {
    amount: Amount,
    note: Option<String>,
    callback_url: String,
    api_key: String,
}

impl PaymentRequest {
    /// Validates `options` and fills the credential and callback URL from
    /// `defaults` where the call did not supply them.
    ///
    /// The amount is checked first, then the credential, then the callback URL.
    pub fn resolve(options: CreatePaymentOptions, defaults: &PaymentDefaults) -> Result<Self> {
        let amount = Amount::new(options.amount)?;
        let api_key = ensure_present(
            "apiKey",
            options.api_key.as_deref().or(defaults.api_key.as_deref()),
        )?;
        let callback_url = ensure_present(
            "callbackUrl",
            options
                .callback_url
                .as_deref()
                .or(defaults.callback_url.as_deref()),
        )?;

        Ok(Self {
            amount,
            note: options.note,
            callback_url,
            api_key,
        })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

// The credential never shows up in logs.
impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("amount", &self.amount)
            .field("note", &self.note)
            .field("callback_url", &self.callback_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn ensure_present(name: &str, value: Option<&str>) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(PaymentError::ValidationError(format!(
            "{name} is required and must be a non-empty string"
        ))),
    }
}
