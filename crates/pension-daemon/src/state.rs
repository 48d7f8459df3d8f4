//! Shared application state.
//!
//! The engine itself is stateless per request; the only thing worth sharing
//! across requests is the scheme-rate client, which owns the process-wide
//! accrual-rate cache.

use std::sync::Arc;

use pension_scheme_registry::{DefaultSchemeRateClient, RemoteSchemeRateClient, SchemeRateClient};

use crate::config::Config;

pub struct AppState {
    pub scheme_rates: Arc<dyn SchemeRateClient>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let scheme_rates: Arc<dyn SchemeRateClient> = match &config.scheme_registry_url {
            Some(url) => Arc::new(RemoteSchemeRateClient::new(url.clone())),
            None => Arc::new(DefaultSchemeRateClient),
        };
        Self { scheme_rates }
    }
}
