use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    /// Malformed or missing input, detected before any network call.
    #[error("{0}")]
    ValidationError(String),
    /// The payment service answered with a non-success status.
    #[error("{message}")]
    RemoteError { status: u16, message: String },
    /// The popup could not be opened or navigated.
    #[error("{0}")]
    SurfaceError(String),
    /// The service reported a legitimate terminal failure.
    #[error("Payment failed")]
    PaymentFailed { payment_id: String },
    #[error("a payment is already in progress")]
    SessionInProgress,
    #[error("gave up polling payment {payment_id} after {attempts} consecutive failures")]
    PollingAbandoned { payment_id: String, attempts: u32 },
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PaymentError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteError { .. })
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
