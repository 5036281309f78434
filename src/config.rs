use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_STATE_DIR: &str = ".storefront";

/// Which surface the client authenticates for. The shop and the admin
/// dashboard share the token format but validate sessions against
/// different endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    #[default]
    Shop,
    Admin,
}

impl Realm {
    /// Session-validation endpoint for this realm.
    pub fn me_path(self) -> &'static str {
        match self {
            Realm::Shop => "/auth/me",
            Realm::Admin => "/admin/me",
        }
    }

    /// Login endpoint for this realm (exempt from request augmentation).
    pub fn login_path(self) -> &'static str {
        match self {
            Realm::Shop => "/auth/login",
            Realm::Admin => "/admin/login",
        }
    }
}

/// Client configuration.
///
/// Environment variables read by [`ClientConfig::from_env`]:
/// - `STOREFRONT_API_URL`: API origin (default `http://127.0.0.1:5000`)
/// - `STOREFRONT_REALM`: `shop` (default) or `admin`
/// - `STOREFRONT_STATE_DIR`: directory for session state files
///   (default `.storefront`)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub realm: Realm,
    pub state_dir: PathBuf,
    pub request_timeout: Duration,
    pub logout_delay: Duration,
}

impl ClientConfig {
    /// Configuration for the given API origin, everything else defaulted.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            realm: Realm::default(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            request_timeout: Duration::from_secs(10),
            logout_delay: Duration::from_millis(500),
        }
    }

    /// Build configuration from environment variables, falling back to
    /// the defaults above for anything unset.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("STOREFRONT_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut cfg = Self::new(base_url.parse()?);

        if let Ok(realm) = std::env::var("STOREFRONT_REALM") {
            if realm.eq_ignore_ascii_case("admin") {
                cfg.realm = Realm::Admin;
            }
        }
        if let Ok(dir) = std::env::var("STOREFRONT_STATE_DIR") {
            if !dir.is_empty() {
                cfg.state_dir = PathBuf::from(dir);
            }
        }
        Ok(cfg)
    }

    #[must_use]
    pub fn with_realm(mut self, realm: Realm) -> Self {
        self.realm = realm;
        self
    }

    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Delay between client cleanup and the redirect event, so a
    /// "logging out" state stays visible.
    #[must_use]
    pub fn with_logout_delay(mut self, delay: Duration) -> Self {
        self.logout_delay = delay;
        self
    }
}
