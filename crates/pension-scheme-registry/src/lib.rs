//! Accrual-rate resolution for pension schemes.
//!
//! The engine only ever sees [`SchemeRateClient::get_accrual_rates`]: a set of
//! scheme ids in, a rate per id out. [`DefaultSchemeRateClient`] always
//! returns the flat default rate; [`RemoteSchemeRateClient`] consults a
//! process-wide cache and falls back to the default per id on any failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::RwLock;

/// Flat accrual rate used when no registry endpoint is configured, and as
/// the per-id fallback when a remote fetch fails.
pub const DEFAULT_ACCRUAL_RATE: f64 = 0.02;

/// Resolves accrual rates for a set of scheme ids.
///
/// Implementations must never block longer than their own configured
/// timeout and must never fail the caller; an unresolvable id degrades to
/// [`DEFAULT_ACCRUAL_RATE`] rather than propagating an error.
#[async_trait::async_trait]
pub trait SchemeRateClient: Send + Sync {
    async fn get_accrual_rates(&self, scheme_ids: &[String]) -> HashMap<String, f64>;
}

/// Always returns [`DEFAULT_ACCRUAL_RATE`] for every id. Used when
/// `SCHEME_REGISTRY_URL` is unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemeRateClient;

#[async_trait::async_trait]
impl SchemeRateClient for DefaultSchemeRateClient {
    async fn get_accrual_rates(&self, scheme_ids: &[String]) -> HashMap<String, f64> {
        scheme_ids
            .iter()
            .map(|id| (id.clone(), DEFAULT_ACCRUAL_RATE))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SchemeRateResponse {
    #[serde(rename = "scheme_id")]
    #[allow(dead_code)]
    scheme_id: String,
    accrual_rate: f64,
}

/// Fetches accrual rates from a remote scheme registry over HTTP, caching
/// resolved rates for the lifetime of the process.
///
/// The cache is write-once-per-id: once a rate is recorded for a scheme id,
/// later requests for that id are served from the cache and never refetched.
pub struct RemoteSchemeRateClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<RwLock<HashMap<String, f64>>>,
}

impl RemoteSchemeRateClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("reqwest client builds with a static timeout");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn fetch_one(&self, scheme_id: &str) -> f64 {
        let url = format!("{}/schemes/{scheme_id}", self.base_url);
        let result = self.http.get(&url).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<SchemeRateResponse>().await
            {
                Ok(body) => body.accrual_rate,
                Err(err) => {
                    tracing::warn!(scheme_id, error = %err, "malformed scheme-rate response, using default");
                    DEFAULT_ACCRUAL_RATE
                }
            },
            Ok(resp) => {
                tracing::warn!(scheme_id, status = %resp.status(), "scheme registry returned non-success, using default");
                DEFAULT_ACCRUAL_RATE
            }
            Err(err) => {
                tracing::warn!(scheme_id, error = %err, "scheme registry request failed, using default");
                DEFAULT_ACCRUAL_RATE
            }
        }
    }
}

#[async_trait::async_trait]
impl SchemeRateClient for RemoteSchemeRateClient {
    async fn get_accrual_rates(&self, scheme_ids: &[String]) -> HashMap<String, f64> {
        let missing: Vec<String> = {
            let cache = self.cache.read().await;
            scheme_ids
                .iter()
                .filter(|id| !cache.contains_key(id.as_str()))
                .cloned()
                .collect()
        };

        if !missing.is_empty() {
            let fetches = missing
                .iter()
                .map(|id| async move { (id.clone(), self.fetch_one(id).await) });
            let fetched = futures_util::future::join_all(fetches).await;

            let mut cache = self.cache.write().await;
            for (id, rate) in fetched {
                cache.entry(id).or_insert(rate);
            }
        }

        let cache = self.cache.read().await;
        scheme_ids
            .iter()
            .map(|id| {
                let rate = cache.get(id).copied().unwrap_or(DEFAULT_ACCRUAL_RATE);
                (id.clone(), rate)
            })
            .collect()
    }
}
