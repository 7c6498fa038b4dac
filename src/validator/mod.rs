mod claims;
mod header;
mod options;

pub use header::TokenHeader;
pub use options::ValidationOptions;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{crypto, Algorithm, DecodingKey};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AuthConfig;
use crate::constants::{ALLOWED_ALG_NAMES, DEFAULT_ISSUER_LABEL};
use crate::error::{unexpected, Error};
use crate::jwks::JwksProvider;
use crate::observe::{NoopObserver, ValidationObserver};
use crate::principal::TrustPrincipal;

use claims::validate_claims;
use header::{base64_url_decode, decode_header, split_token, validate_token_typ};

/// Validates bearer tokens end to end and derives trust principals.
///
/// There is exactly one validation path. It is async because resolving an
/// unknown or stale key may fetch the published key set; when the cache is
/// fresh no I/O happens at all.
pub struct TokenValidator {
    jwks: JwksProvider,
    options: ValidationOptions,
    observer: Arc<dyn ValidationObserver>,
}

impl TokenValidator {
    pub fn new(jwks: JwksProvider) -> Self {
        Self {
            jwks,
            options: ValidationOptions::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Builds a validator from configuration. Fails when no JWKS URL is
    /// configured or it does not parse.
    pub fn from_config(config: &AuthConfig) -> Result<Self, Error> {
        let jwks_url = config.jwks_url.clone().unwrap_or_default();
        let jwks = JwksProvider::from_config(config, jwks_url)?;
        Ok(Self::new(jwks).with_options(ValidationOptions::from_config(config)))
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ValidationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validates a token and derives its principal.
    ///
    /// Every exit path, success or failure, is reported to the observer
    /// with an end-to-end duration and a low-cardinality outcome label.
    pub async fn validate(&self, token: &str) -> Result<TrustPrincipal, Error> {
        let started = Instant::now();
        let result = self.validate_inner(token).await;
        let issuer_label = self
            .options
            .issuer
            .as_deref()
            .unwrap_or(DEFAULT_ISSUER_LABEL);
        match &result {
            Ok(_) => self
                .observer
                .record(issuer_label, "valid", None, started.elapsed()),
            Err(err) => self.observer.record(
                issuer_label,
                err.reason(),
                Some(err.reason()),
                started.elapsed(),
            ),
        }
        result
    }

    async fn validate_inner(&self, token: &str) -> Result<TrustPrincipal, Error> {
        let parts = split_token(token)?;
        let header = decode_header(parts.header)?;
        validate_token_typ(header.typ.as_deref())?;

        // The allow-list check runs before any network I/O: a header alg
        // outside the fixed set fails identically whether or not a
        // matching key exists.
        if !ALLOWED_ALG_NAMES.contains(&header.alg.as_str()) {
            return Err(Error::UnsupportedAlgorithm(header.alg.clone()));
        }
        let alg = Algorithm::from_str(&header.alg)
            .map_err(|_| Error::UnsupportedAlgorithm(header.alg.clone()))?;
        if !self.options.resolve_allowed_algs()?.contains(&alg) {
            return Err(Error::UnsupportedAlgorithm(header.alg.clone()));
        }

        let key = self.jwks.resolve(&header.kid, &header.alg).await?;
        let decoding_key = DecodingKey::from_jwk(&key)
            .map_err(|err| unexpected("could not build decoding key", err))?;
        match crypto::verify(
            parts.signature,
            parts.signing_input().as_bytes(),
            &decoding_key,
            alg,
        ) {
            Ok(true) => {}
            Ok(false) => return Err(Error::InvalidSignature),
            Err(err) => {
                return Err(match err.kind() {
                    ErrorKind::Base64(_) => {
                        Error::MalformedToken("signature is not base64url".to_string())
                    }
                    _ => unexpected("signature verification failed", err),
                })
            }
        }

        let payload_bytes = base64_url_decode(parts.payload)?;
        let claims: Value = serde_json::from_slice(&payload_bytes)
            .map_err(|err| Error::MalformedToken(format!("claims are not json: {err}")))?;
        validate_claims(&claims, &self.options)?;

        TrustPrincipal::from_claims(claims)
    }
}
