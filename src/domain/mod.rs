//! Domain types and the ports the application layer depends on.

pub mod payment;
pub mod ports;
pub mod session;
pub mod surface;
