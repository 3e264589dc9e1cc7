//! Client configuration.
//!
//! A [`ClientConfig`] is built once at startup and handed to the gateway,
//! coordinator and surface manager. Nothing in the crate reads configuration
//! from global state; per-call [`CreatePaymentOptions`] override [`PaymentDefaults`].
//!
//! [`CreatePaymentOptions`]: crate::domain::payment::CreatePaymentOptions

use crate::domain::surface::{FailureDisplay, PopupOptions, ScreenGeometry, WindowFeatures};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVICE_BASE: &str = "https://deveback.adey.lol";
pub const DEFAULT_SURFACE_BASE: &str = "https://adey.pages.dev/pay";

/// Library configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the payment service API.
    #[serde(default = "default_service_base")]
    pub service_base_url: Url,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Credential and callback URL used when a call does not supply its own.
    #[serde(default)]
    pub defaults: PaymentDefaults,

    /// Status polling policy.
    #[serde(default)]
    pub poll: PollConfig,

    /// Payment page presentation.
    #[serde(default)]
    pub surface: SurfaceConfig,
}

/// Fallback values for per-call payment options.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDefaults {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl std::fmt::Debug for PaymentDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDefaults")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// Status polling policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status requests, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    /// Stop polling after this many failed requests in a row. `None` retries forever.
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,

    /// Service status strings to treat as `approved` (e.g. `"Paid"`).
    #[serde(default)]
    pub approved_aliases: Vec<String>,
}

/// Payment page presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// The payment page is served at `<base_url>/<payment id>`.
    #[serde(default = "default_surface_base")]
    pub base_url: Url,

    #[serde(default = "default_popup_width")]
    pub popup_width: u32,

    #[serde(default = "default_popup_height")]
    pub popup_height: u32,

    /// What the popup does when the payment fails.
    #[serde(default)]
    pub failure_display: FailureDisplay,

    /// Render a "creating" page into the popup while the payment is created.
    #[serde(default)]
    pub show_creating: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_base_url: default_service_base(),
            log_level: default_log_level(),
            defaults: PaymentDefaults::default(),
            poll: PollConfig::default(),
            surface: SurfaceConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_consecutive_failures: None,
            approved_aliases: Vec::new(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_surface_base(),
            popup_width: default_popup_width(),
            popup_height: default_popup_height(),
            failure_display: FailureDisplay::default(),
            show_creating: false,
        }
    }
}

fn default_service_base() -> Url {
    Url::parse(DEFAULT_SERVICE_BASE).unwrap_or_else(|_| unreachable!("valid constant URL"))
}

fn default_surface_base() -> Url {
    Url::parse(DEFAULT_SURFACE_BASE).unwrap_or_else(|_| unreachable!("valid constant URL"))
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_poll_interval() -> u64 {
    3000
}

const fn default_popup_width() -> u32 {
    900
}

const fn default_popup_height() -> u32 {
    700
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PaymentError::ConfigError(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PaymentError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_service_base_url(mut self, url: Url) -> Self {
        self.service_base_url = url;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.defaults.api_key = Some(key.into());
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.defaults.callback_url = Some(url.into());
        self
    }
}

impl PollConfig {
    /// Never zero; a timer cannot tick at a zero period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl SurfaceConfig {
    /// Popup strategy centred over the host window.
    pub fn popup(&self, host: ScreenGeometry) -> PopupOptions {
        PopupOptions {
            features: WindowFeatures::centered(self.popup_width, self.popup_height, host),
            on_failure: self.failure_display,
            show_creating: self.show_creating,
        }
    }
}
