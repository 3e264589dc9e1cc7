use super::payment::{PaymentId, PaymentRequest, StatusReport};
use super::surface::{Placeholder, WindowFeatures};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Transport to the remote payment service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment and returns the identifier the service assigned.
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentId>;
    /// Fetches the current status. The status string is not validated.
    async fn payment_status(&self, id: &PaymentId) -> Result<StatusReport>;
}

pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;

/// The current browsing context, used by the redirect strategy.
pub trait Navigator: Send {
    fn navigate(&mut self, url: &Url) -> Result<()>;
}

/// A secondary window holding the payment page.
pub trait SurfaceWindow: Send {
    fn navigate(&mut self, url: &Url) -> Result<()>;
    fn render(&mut self, placeholder: &Placeholder);
    fn close(&mut self);
    /// The user (or the page) closed the window.
    fn is_closed(&self) -> bool;
}

/// Opens secondary windows. `None` means the window could not be opened,
/// typically because a popup blocker intervened.
pub trait WindowOpener: Send {
    fn open(
        &mut self,
        url: Option<&Url>,
        name: &str,
        features: &WindowFeatures,
    ) -> Option<Box<dyn SurfaceWindow>>;
}

/// Host application callbacks.
///
/// `on_created` and the terminal outcome (`on_approved`, or `on_error` with
/// [`PaymentError::PaymentFailed`]) are delivered at most once per session.
/// Surface failures are reported through `on_error` as they happen.
pub trait PaymentCallbacks: Send + Sync {
    fn on_created(&self, _id: &PaymentId) {}

    fn on_approved(&self, _id: &PaymentId) {}

    /// Without a host handler the error is only logged.
    fn on_error(&self, error: &PaymentError) {
        tracing::error!("payment error: {error}");
    }
}

pub type PaymentCallbacksRef = Arc<dyn PaymentCallbacks>;
