use crate::application::coordinator::PaymentCoordinator;
use crate::domain::payment::{CreatePaymentOptions, PaymentId, PaymentStatus};
use crate::domain::ports::{Navigator, PaymentCallbacksRef, SurfaceWindow, WindowOpener};
use crate::domain::session::PaymentSession;
use crate::domain::surface::{FailureDisplay, Placeholder, PopupOptions, payment_url, window_name};
use crate::error::{PaymentError, Result};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use url::Url;

const POPUP_BLOCKED: &str = "Popup blocked or failed to open";

/// Presents the payment page for the coordinator's session and reports its
/// outcome to the host.
///
/// The manager reacts to two things: the identifier being assigned (navigate
/// once, fire `on_created`) and the status reaching a terminal value (close or
/// update the surface, fire `on_approved` or `on_error`). Both reactions are
/// guarded by the session's own flags, so feeding the same snapshot twice is
/// harmless.
pub struct SurfaceManager {
    coordinator: Arc<PaymentCoordinator>,
    surface_base: Url,
    callbacks: PaymentCallbacksRef,
    presenter: Presenter,
}

enum Presenter {
    Redirect(Box<dyn Navigator>),
    Popup(Popup),
}

enum Outcome {
    Approved,
    Failed,
    Abandoned(u32),
}

impl SurfaceManager {
    /// Navigates the current browsing context to the payment page.
    pub fn redirect(
        coordinator: Arc<PaymentCoordinator>,
        surface_base: Url,
        navigator: Box<dyn Navigator>,
        callbacks: PaymentCallbacksRef,
    ) -> Self {
        Self {
            coordinator,
            surface_base,
            callbacks,
            presenter: Presenter::Redirect(navigator),
        }
    }

    /// Shows the payment page in a secondary window opened at click time.
    pub fn popup(
        coordinator: Arc<PaymentCoordinator>,
        surface_base: Url,
        options: PopupOptions,
        opener: Box<dyn WindowOpener>,
        callbacks: PaymentCallbacksRef,
    ) -> Self {
        Self {
            coordinator,
            surface_base,
            callbacks,
            presenter: Presenter::Popup(Popup {
                opener,
                options,
                window: None,
            }),
        }
    }

    pub fn coordinator(&self) -> &Arc<PaymentCoordinator> {
        &self.coordinator
    }

    /// Handles a click on the pay control.
    ///
    /// Returns `Ok(None)` when the click is ignored because a payment is still
    /// in progress. Creation failures are passed to `on_error` and returned.
    pub async fn pay(&mut self, options: CreatePaymentOptions) -> Result<Option<PaymentId>> {
        if self.coordinator.session().is_active() {
            debug!("payment already in progress, ignoring click");
            return Ok(None);
        }

        // Popup blockers only allow windows opened synchronously with the click.
        if let Presenter::Popup(popup) = &mut self.presenter {
            popup.open_blank();
        }

        match self.coordinator.start_payment(options).await {
            Ok(id) => {
                self.refresh();
                Ok(Some(id))
            }
            Err(PaymentError::SessionInProgress) => {
                self.close_surface();
                Ok(None)
            }
            Err(e) => {
                self.close_surface();
                self.callbacks.on_error(&e);
                Err(e)
            }
        }
    }

    /// Follows the session until polling stops, reacting to every change.
    pub async fn settle(&mut self) -> PaymentSession {
        let mut updates = self.coordinator.subscribe();
        loop {
            let session = updates.borrow_and_update().clone();
            self.handle_session(&session);
            if !session.is_active() || updates.changed().await.is_err() {
                return session;
            }
        }
    }

    /// Reacts to the coordinator's current state.
    pub fn refresh(&mut self) {
        let session = self.coordinator.session();
        self.handle_session(&session);
    }

    /// Reacts to one session snapshot.
    pub fn handle_session(&mut self, session: &PaymentSession) {
        let Some(id) = session.identifier() else {
            return;
        };

        if self.coordinator.mark_navigated(id) {
            if !session.status().is_terminal() {
                self.present(id);
            }
            self.callbacks.on_created(id);
        }

        let outcome = match session.status() {
            PaymentStatus::Approved => Some(Outcome::Approved),
            PaymentStatus::Failed => Some(Outcome::Failed),
            _ => session.abandoned_after().map(Outcome::Abandoned),
        };
        if let Some(outcome) = outcome
            && self.coordinator.mark_terminal_dispatched(id)
        {
            self.finish(id, outcome);
        }
    }

    /// Brings back a popup the user closed while the payment is unresolved.
    ///
    /// Returns `false` when there is nothing to reopen.
    pub fn reopen(&mut self) -> bool {
        let session = self.coordinator.session();
        let Some(id) = session.identifier() else {
            return false;
        };
        let lost = match &self.presenter {
            Presenter::Popup(popup) => popup.is_lost(),
            Presenter::Redirect(_) => false,
        };
        if !lost || !session.is_polling() || session.status().is_terminal() {
            return false;
        }

        self.coordinator.reset_navigation(id);
        if self.coordinator.mark_navigated(id) {
            self.present(id);
        }
        true
    }

    fn present(&mut self, id: &PaymentId) {
        let url = match payment_url(&self.surface_base, id) {
            Ok(url) => url,
            Err(e) => {
                self.callbacks.on_error(&e);
                return;
            }
        };

        let shown = match &mut self.presenter {
            Presenter::Redirect(navigator) => navigator.navigate(&url),
            Presenter::Popup(popup) => popup.show(&url, id),
        };
        if let Err(e) = shown {
            warn!(payment_id = %id, "could not present payment page: {e}");
            self.callbacks.on_error(&e);
        }
    }

    fn finish(&mut self, id: &PaymentId, outcome: Outcome) {
        match outcome {
            Outcome::Approved => {
                self.close_surface();
                self.callbacks.on_approved(id);
            }
            Outcome::Failed => {
                if let Presenter::Popup(popup) = &mut self.presenter {
                    popup.show_failure();
                }
                self.callbacks.on_error(&PaymentError::PaymentFailed {
                    payment_id: id.to_string(),
                });
            }
            Outcome::Abandoned(attempts) => {
                self.callbacks.on_error(&PaymentError::PollingAbandoned {
                    payment_id: id.to_string(),
                    attempts,
                });
            }
        }
    }

    fn close_surface(&mut self) {
        if let Presenter::Popup(popup) = &mut self.presenter {
            popup.close();
        }
    }
}

struct Popup {
    opener: Box<dyn WindowOpener>,
    options: PopupOptions,
    window: Option<Box<dyn SurfaceWindow>>,
}

impl Popup {
    fn open_blank(&mut self) {
        self.close();
        let name = window_name(unix_millis());
        self.window = self.opener.open(None, &name, &self.options.features);
        if self.options.show_creating
            && let Some(window) = self.window.as_mut()
        {
            window.render(&Placeholder::Creating);
        }
    }

    fn show(&mut self, url: &Url, id: &PaymentId) -> Result<()> {
        if let Some(window) = self.window.as_mut().filter(|window| !window.is_closed()) {
            match window.navigate(url) {
                Ok(()) => return Ok(()),
                Err(e) => debug!("popup navigation failed, reopening: {e}"),
            }
        }
        self.close();

        let name = window_name(id);
        match self.opener.open(Some(url), &name, &self.options.features) {
            Some(window) => {
                self.window = Some(window);
                Ok(())
            }
            None => Err(PaymentError::SurfaceError(POPUP_BLOCKED.to_string())),
        }
    }

    fn show_failure(&mut self) {
        match self.options.on_failure {
            FailureDisplay::Close => self.close(),
            FailureDisplay::Placeholder => {
                if let Some(window) = self.window.as_mut().filter(|window| !window.is_closed()) {
                    window.render(&Placeholder::Failed {
                        message: PaymentError::PaymentFailed {
                            payment_id: String::new(),
                        }
                        .to_string(),
                    });
                }
            }
        }
    }

    fn is_lost(&self) -> bool {
        self.window.as_ref().is_none_or(|window| window.is_closed())
    }

    fn close(&mut self) {
        if let Some(mut window) = self.window.take()
            && !window.is_closed()
        {
            window.close();
        }
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
