//! Terminal adapters used by the `adeypay` binary.
//!
//! There is no browsing context in a terminal, so "navigating" prints the
//! payment page address for the user to open.

use crate::domain::payment::PaymentId;
use crate::domain::ports::{Navigator, PaymentCallbacks};
use crate::error::{PaymentError, Result};
use std::io::Write;
use std::sync::Mutex;
use tracing::debug;
use url::Url;

/// Writes the payment page address to `W`.
pub struct TerminalNavigator<W> {
    out: W,
}

impl<W: Write + Send> TerminalNavigator<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Navigator for TerminalNavigator<W> {
    fn navigate(&mut self, url: &Url) -> Result<()> {
        writeln!(self.out, "Complete the payment at {url}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Prints one line per lifecycle event.
///
/// Errors are left to the caller, which reports them once on exit.
pub struct TerminalCallbacks<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> TerminalCallbacks<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, event: &str, id: &PaymentId) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{event} {id}").and_then(|()| out.flush()) {
            debug!("could not write {event} event: {e}");
        }
    }
}

impl<W: Write + Send> PaymentCallbacks for TerminalCallbacks<W> {
    fn on_created(&self, id: &PaymentId) {
        self.line("created", id);
    }

    fn on_approved(&self, id: &PaymentId) {
        self.line("approved", id);
    }

    fn on_error(&self, error: &PaymentError) {
        debug!("payment error: {error}");
    }
}
