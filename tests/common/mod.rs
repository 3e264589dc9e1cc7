#![allow(dead_code)]

use adeypay::config::ClientConfig;
use adeypay::domain::payment::PaymentId;
use adeypay::domain::ports::{Navigator, PaymentCallbacks, SurfaceWindow, WindowOpener};
use adeypay::domain::surface::{Placeholder, WindowFeatures};
use adeypay::error::{PaymentError, Result};
use std::sync::{Arc, Mutex};
use url::Url;

pub const API_KEY: &str = "test-key";
pub const CALLBACK_URL: &str = "https://shop.example/callback";

/// Default configuration with credentials filled in.
pub fn config() -> ClientConfig {
    ClientConfig::default()
        .with_api_key(API_KEY)
        .with_callback_url(CALLBACK_URL)
}

pub fn page(id: &str) -> Url {
    Url::parse(&format!("https://adey.pages.dev/pay/{id}")).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created(String),
    Approved(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingCallbacks {
    events: Mutex<Vec<Event>>,
}

impl RecordingCallbacks {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl PaymentCallbacks for RecordingCallbacks {
    fn on_created(&self, id: &PaymentId) {
        self.events.lock().unwrap().push(Event::Created(id.to_string()));
    }

    fn on_approved(&self, id: &PaymentId) {
        self.events.lock().unwrap().push(Event::Approved(id.to_string()));
    }

    fn on_error(&self, error: &PaymentError) {
        self.events.lock().unwrap().push(Event::Error(error.to_string()));
    }
}

#[derive(Default, Clone)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<Url>>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<Url> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, url: &Url) -> Result<()> {
        self.visits.lock().unwrap().push(url.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WindowState {
    pub name: String,
    pub features: String,
    pub visits: Vec<Url>,
    pub rendered: Vec<Placeholder>,
    pub closed: bool,
}

#[derive(Default)]
struct ScreenState {
    windows: Vec<WindowState>,
    block_popups: bool,
    refuse_navigation: bool,
}

/// A fake desktop that records every window opened on it.
#[derive(Default, Clone)]
pub struct FakeScreen {
    state: Arc<Mutex<ScreenState>>,
}

impl FakeScreen {
    pub fn opener(&self) -> Box<dyn WindowOpener> {
        Box::new(FakeOpener {
            screen: self.clone(),
        })
    }

    pub fn block_popups(&self, blocked: bool) {
        self.state.lock().unwrap().block_popups = blocked;
    }

    /// Existing windows reject navigation, like a cross-origin popup would.
    pub fn refuse_navigation(&self, refused: bool) {
        self.state.lock().unwrap().refuse_navigation = refused;
    }

    pub fn windows(&self) -> Vec<WindowState> {
        self.state.lock().unwrap().windows.clone()
    }

    /// The user closes window `index`.
    pub fn close_window(&self, index: usize) {
        self.state.lock().unwrap().windows[index].closed = true;
    }
}

struct FakeOpener {
    screen: FakeScreen,
}

impl WindowOpener for FakeOpener {
    fn open(
        &mut self,
        url: Option<&Url>,
        name: &str,
        features: &WindowFeatures,
    ) -> Option<Box<dyn SurfaceWindow>> {
        let mut state = self.screen.state.lock().unwrap();
        if state.block_popups {
            return None;
        }
        state.windows.push(WindowState {
            name: name.to_string(),
            features: features.to_string(),
            visits: url.into_iter().cloned().collect(),
            rendered: Vec::new(),
            closed: false,
        });
        Some(Box::new(FakeWindow {
            screen: self.screen.clone(),
            index: state.windows.len() - 1,
        }))
    }
}

struct FakeWindow {
    screen: FakeScreen,
    index: usize,
}

impl SurfaceWindow for FakeWindow {
    fn navigate(&mut self, url: &Url) -> Result<()> {
        let mut state = self.screen.state.lock().unwrap();
        if state.refuse_navigation || state.windows[self.index].closed {
            return Err(PaymentError::SurfaceError("navigation refused".into()));
        }
        state.windows[self.index].visits.push(url.clone());
        Ok(())
    }

    fn render(&mut self, placeholder: &Placeholder) {
        let mut state = self.screen.state.lock().unwrap();
        state.windows[self.index].rendered.push(placeholder.clone());
    }

    fn close(&mut self) {
        self.screen.state.lock().unwrap().windows[self.index].closed = true;
    }

    fn is_closed(&self) -> bool {
        self.screen.state.lock().unwrap().windows[self.index].closed
    }
}
