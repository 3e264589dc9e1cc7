//! Presentation surface vocabulary: placeholders, popup options and geometry.

use super::payment::PaymentId;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Prefix of every popup window name.
pub const WINDOW_NAME_PREFIX: &str = "_adeypay_";

/// What the popup shows once the service reports `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureDisplay {
    #[default]
    Close,
    Placeholder,
}

/// Content rendered into a popup before or instead of the payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Creating,
    Failed { message: String },
}

impl Placeholder {
    pub fn html(&self) -> String {
        match self {
            Self::Creating => {
                "<!doctype html><title>Creating payment</title><p>Creating payment...</p>"
                    .to_string()
            }
            Self::Failed { message } => format!(
                "<!doctype html><title>Payment failed</title><p>{}</p>",
                escape_html(message)
            ),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Position and size of the host window, used to centre popups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenGeometry {
    pub screen_x: i32,
    pub screen_y: i32,
    pub outer_width: u32,
    pub outer_height: u32,
}

/// Feature string passed to the window opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFeatures {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
}

impl WindowFeatures {
    /// Centres a `width` x `height` popup over `host`, clamped to the screen origin.
    pub fn centered(width: u32, height: u32, host: ScreenGeometry) -> Self {
        let offset = |origin: i32, outer: u32, inner: u32| -> u32 {
            let free = (i64::from(outer) - i64::from(inner)).div_euclid(2);
            (i64::from(origin) + free).clamp(0, i64::from(u32::MAX)) as u32
        };
        Self {
            width,
            height,
            left: offset(host.screen_x, host.outer_width, width),
            top: offset(host.screen_y, host.outer_height, height),
        }
    }
}

impl fmt::Display for WindowFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={},height={},left={},top={},resizable=yes,scrollbars=yes,toolbar=no,location=no,status=no,menubar=no",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Popup strategy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupOptions {
    pub features: WindowFeatures,
    pub on_failure: FailureDisplay,
    /// Render [`Placeholder::Creating`] while the payment is being created.
    pub show_creating: bool,
}

/// `<surface_base>/<percent-encoded id>`.
pub fn payment_url(surface_base: &Url, id: &PaymentId) -> Result<Url> {
    let mut url = surface_base.clone();
    url.path_segments_mut()
        .map_err(|()| {
            PaymentError::ConfigError(format!("surface base {surface_base} cannot carry a path"))
        })?
        .pop_if_empty()
        .push(id.as_str());
    Ok(url)
}

pub fn window_name(suffix: impl fmt::Display) -> String {
    format!("{WINDOW_NAME_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_url_appends_encoded_segment() {
        let base = Url::parse("https://adey.pages.dev/pay").unwrap();
        let id = PaymentId::new("p 1/2").unwrap();
        assert_eq!(
            payment_url(&base, &id).unwrap().as_str(),
            "https://adey.pages.dev/pay/p%201%2F2"
        );
    }

    #[test]
    fn test_payment_url_with_trailing_slash() {
        let base = Url::parse("http://pay.localhost:5174/").unwrap();
        let id = PaymentId::new("abc").unwrap();
        assert_eq!(
            payment_url(&base, &id).unwrap().as_str(),
            "http://pay.localhost:5174/abc"
        );
    }

    #[test]
    fn test_payment_url_rejects_opaque_base() {
        let base = Url::parse("mailto:pay@example.com").unwrap();
        let id = PaymentId::new("abc").unwrap();
        assert!(payment_url(&base, &id).is_err());
    }

    #[test]
    fn test_window_features_centered() {
        let host = ScreenGeometry {
            screen_x: 100,
            screen_y: 50,
            outer_width: 1900,
            outer_height: 1100,
        };
        let features = WindowFeatures::centered(900, 700, host);
        assert_eq!(features.left, 600);
        assert_eq!(features.top, 250);
        assert_eq!(
            features.to_string(),
            "width=900,height=700,left=600,top=250,resizable=yes,scrollbars=yes,toolbar=no,location=no,status=no,menubar=no"
        );
    }

    #[test]
    fn test_window_features_clamped_on_small_hosts() {
        let host = ScreenGeometry {
            screen_x: 0,
            screen_y: 0,
            outer_width: 400,
            outer_height: 300,
        };
        let features = WindowFeatures::centered(900, 700, host);
        assert_eq!((features.left, features.top), (0, 0));
    }

    #[test]
    fn test_failed_placeholder_is_escaped() {
        let html = Placeholder::Failed {
            message: "<b>declined</b>".to_string(),
        }
        .html();
        assert!(html.contains("&lt;b&gt;declined&lt;/b&gt;"));
    }
}
