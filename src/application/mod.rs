//! Application layer orchestrating a payment from click to outcome.
//!
//! [`coordinator::PaymentCoordinator`] owns the session and the status poller.
//! [`surface::SurfaceManager`] watches that session and drives the page the
//! user completes the payment on.

pub mod coordinator;
pub mod surface;
