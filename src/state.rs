//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the retrying [`Store`] over the Postgres pool plus the handful of
//! config values request handlers read (cookie flags, session lifetime).

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::retry::RetryPolicy;
use crate::store::Store;

/// Request-facing settings copied out of [`AppConfig`] at startup.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub cookie_secure: bool,
    pub session_ttl_hours: i64,
}

impl From<&AppConfig> for WebSettings {
    fn from(config: &AppConfig) -> Self {
        Self { cookie_secure: config.cookie_secure, session_ttl_hours: config.session_ttl_hours }
    }
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum: all inner fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub settings: Arc<WebSettings>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, retry: RetryPolicy, settings: WebSettings) -> Self {
        Self { store: Store::new(pool, retry), settings: Arc::new(settings) }
    }
}

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
