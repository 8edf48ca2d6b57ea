//! Redirect responses
//!
//! A [`Redirect`] is only ever produced after navigation state has been
//! flushed and committed; turning it into an HTTP response is the last
//! thing a page handler does.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::types::{NavError, Result};

/// Display name of the link a redirect adds for its own target
pub const REDIRECT_LINK_NAME: &str = "Redirection";

/// How redirects are emitted
#[derive(Debug, Clone)]
pub struct RedirectSettings {
    /// Prefix of every target, e.g. `/` or `/game/index`
    pub base_url: String,
    /// Serve a "Continue" page instead of a `Location` header
    pub manual: bool,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            manual: false,
        }
    }
}

/// Terminal response of a page that navigated away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// `302 Found` with a `Location` header
    Location { target: String, location: String },
    /// `200 OK` page with a link the user follows by hand
    Manual { target: String, location: String },
}

impl Redirect {
    pub fn new(settings: &RedirectSettings, target: &str) -> Self {
        let target = target.to_string();
        let location = format!("{}?{}", settings.base_url, target);

        if settings.manual {
            Redirect::Manual { target, location }
        } else {
            Redirect::Location { target, location }
        }
    }

    /// Navigation URL (query string) the client is sent to
    pub fn target(&self) -> &str {
        match self {
            Redirect::Location { target, .. } | Redirect::Manual { target, .. } => target,
        }
    }

    /// Absolute location including the base URL
    pub fn location(&self) -> &str {
        match self {
            Redirect::Location { location, .. } | Redirect::Manual { location, .. } => location,
        }
    }

    /// HTML body served for manual redirects. The target is inserted
    /// unescaped, so it must already be markup-safe.
    pub fn manual_body(&self) -> String {
        format!(
            "Forward to {} <br />\n<a href='{}'>Continue</a>",
            self.target(),
            self.location()
        )
    }

    /// Build the HTTP response
    pub fn into_response(self) -> Result<Response<Full<Bytes>>> {
        let response = match &self {
            Redirect::Location { location, .. } => Response::builder()
                .status(StatusCode::FOUND)
                .header("Location", location.as_str())
                .header("Cache-Control", "no-store")
                .body(Full::new(Bytes::new())),
            Redirect::Manual { .. } => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/html; charset=utf-8")
                .header("Cache-Control", "no-store")
                .body(Full::new(Bytes::from(self.manual_body()))),
        };

        response.map_err(|e| NavError::Config(format!("Invalid redirect response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_redirect() {
        let settings = RedirectSettings {
            base_url: "/game".to_string(),
            manual: false,
        };
        let redirect = Redirect::new(&settings, "page=town");
        assert_eq!(redirect.location(), "/game?page=town");

        let response = redirect.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["Location"], "/game?page=town");
    }

    #[test]
    fn test_manual_redirect() {
        let settings = RedirectSettings {
            base_url: "/".to_string(),
            manual: true,
        };
        let redirect = Redirect::new(&settings, "page=home");
        assert!(matches!(redirect, Redirect::Manual { .. }));
        assert_eq!(
            redirect.manual_body(),
            "Forward to page=home <br />\n<a href='/?page=home'>Continue</a>"
        );

        let response = redirect.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("Location").is_none());
    }

    #[test]
    fn test_invalid_header_is_an_error() {
        let redirect = Redirect::new(&RedirectSettings::default(), "page=home\r\nSet-Cookie: x");
        assert!(matches!(redirect.into_response(), Err(NavError::Config(_))));
    }
}
