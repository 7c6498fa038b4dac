use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use log::{error, info, warn};
use reqwest::Client as HttpClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use super::cache::KeySetCache;
use super::fetch::{redact_jwks_uri, KeySetFetcher};
use crate::config::AuthConfig;
use crate::constants::{DEFAULT_FRESH_TTL, DEFAULT_STALE_TTL, MIN_ROTATION_REFRESH_INTERVAL};
use crate::error::{unexpected, Error};

/// Owns the key set lifecycle: deciding when a refresh is required, running
/// at most one fetch at a time, and resolving header kids to key records.
#[derive(Debug)]
pub struct JwksProvider {
    jwks_uri: Url,
    fetcher: KeySetFetcher,
    cache: Arc<KeySetCache>,
    fresh_ttl: Duration,
    stale_ttl: Duration,
    fetch_lock: Mutex<()>,
}

impl JwksProvider {
    pub fn new(jwks_uri: impl AsRef<str>) -> Result<Self, Error> {
        let jwks_uri = Url::parse(jwks_uri.as_ref())?;
        Ok(Self {
            jwks_uri,
            fetcher: KeySetFetcher::new()?,
            cache: Arc::new(KeySetCache::new(DEFAULT_FRESH_TTL, DEFAULT_STALE_TTL)),
            fresh_ttl: DEFAULT_FRESH_TTL,
            stale_ttl: DEFAULT_STALE_TTL,
            fetch_lock: Mutex::new(()),
        })
    }

    pub fn from_config(config: &AuthConfig, jwks_uri: impl AsRef<str>) -> Result<Self, Error> {
        Ok(Self::new(jwks_uri)?
            .with_fresh_ttl(config.fresh_ttl)
            .with_stale_ttl(config.stale_ttl)
            .with_timeout(config.fetch_timeout))
    }

    /// Age below which the cached set is served with no network call.
    pub fn with_fresh_ttl(mut self, ttl: Duration) -> Self {
        self.fresh_ttl = ttl;
        self.cache = Arc::new(KeySetCache::new(self.fresh_ttl, self.stale_ttl));
        self
    }

    /// Age beyond which the cached set may no longer back a fetch failure.
    pub fn with_stale_ttl(mut self, ttl: Duration) -> Self {
        self.stale_ttl = ttl;
        self.cache = Arc::new(KeySetCache::new(self.fresh_ttl, self.stale_ttl));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher = self.fetcher.with_timeout(timeout);
        self
    }

    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.fetcher = self.fetcher.with_http_client(http);
        self
    }

    /// Seeds the cache as if a fetch had just succeeded.
    pub fn with_preloaded(self, keys: HashMap<String, Jwk>) -> Self {
        self.cache.replace(keys);
        self
    }

    /// Brings the cache up to date when required.
    ///
    /// A fresh cache returns immediately with no I/O. Otherwise one fetch
    /// runs (concurrent callers collapse onto it); on fetch failure the
    /// stale-but-usable cache is kept with a warning, and only an unusable
    /// cache makes the failure hard.
    pub async fn refresh_if_needed(&self) -> Result<(), Error> {
        if self.cache.is_fresh() {
            return Ok(());
        }
        let _guard = self.fetch_lock.lock().await;
        if self.cache.is_fresh() {
            return Ok(());
        }
        self.fetch_and_store().await
    }

    /// Resolves the key for a token header's kid, compatible with `alg`.
    ///
    /// An unknown kid triggers one forced refetch, since it usually means
    /// the signing key rotated after our last fetch. The refetch is
    /// rate-limited so tokens signed with genuinely unknown keys cannot
    /// turn into an outbound request per validation.
    pub async fn resolve(&self, kid: &str, alg: &str) -> Result<Jwk, Error> {
        self.refresh_if_needed().await?;
        if let Some(key) = self.lookup_matching(kid, alg) {
            return Ok(key);
        }
        self.refresh_for_rotation().await?;
        self.lookup_matching(kid, alg)
            .ok_or_else(|| Error::UnknownKeyId(kid.to_string()))
    }

    fn lookup_matching(&self, kid: &str, alg: &str) -> Option<Jwk> {
        self.cache
            .lookup(kid)
            .filter(|jwk| jwk_matches_constraints(jwk, alg))
    }

    async fn refresh_for_rotation(&self) -> Result<(), Error> {
        if self.fetched_within(MIN_ROTATION_REFRESH_INTERVAL) {
            return Ok(());
        }
        let _guard = self.fetch_lock.lock().await;
        if self.fetched_within(MIN_ROTATION_REFRESH_INTERVAL) {
            return Ok(());
        }
        self.fetch_and_store().await
    }

    fn fetched_within(&self, interval: Duration) -> bool {
        matches!(self.cache.age(), Some(age) if age < interval)
    }

    async fn fetch_and_store(&self) -> Result<(), Error> {
        let fetcher = self.fetcher.clone();
        let jwks_uri = self.jwks_uri.clone();
        let cache = Arc::clone(&self.cache);
        // Detached: a caller abandoning its validation mid-fetch must not
        // abort the fetch other waiters are queued behind. The task writes
        // the cache itself, so the keys land even if nobody is left to
        // receive the result.
        let fetched = tokio::spawn(async move {
            let keys = fetcher.fetch(&jwks_uri).await?;
            info!(
                "jwks refreshed: uri {} key_count {}",
                redact_jwks_uri(&jwks_uri),
                keys.len()
            );
            cache.replace(keys);
            Ok::<(), Error>(())
        })
        .await;

        match fetched {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                if self.cache.is_usable_stale() {
                    warn!(
                        "jwks refresh failed; serving cached keys (age {:?}): {err}",
                        self.cache.age()
                    );
                    Ok(())
                } else {
                    error!("jwks refresh failed with no usable cache: {err}");
                    Err(Error::KeySetUnavailable(Box::new(err)))
                }
            }
            Err(join_err) => Err(unexpected("jwks refresh task failed", join_err)),
        }
    }
}

fn jwk_allows_use(jwk: &Jwk) -> bool {
    match jwk.common.public_key_use.as_ref() {
        None => true,
        Some(PublicKeyUse::Signature) => true,
        Some(_) => false,
    }
}

fn jwk_allows_alg(jwk: &Jwk, alg: &str) -> bool {
    match jwk.common.key_algorithm.as_ref() {
        None => true,
        Some(key_alg) => key_alg.to_string() == alg,
    }
}

fn jwk_matches_constraints(jwk: &Jwk, alg: &str) -> bool {
    jwk_allows_use(jwk) && jwk_allows_alg(jwk, alg)
}
