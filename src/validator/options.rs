use jsonwebtoken::Algorithm;

use crate::config::AuthConfig;
use crate::constants::ALLOWED_ALGS;
use crate::error::Error;

/// Knobs for claim validation.
///
/// Issuer and audience checks run only when an expectation is configured.
/// `allowed_algs` can narrow the crate-wide allowlist but never widen it.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    pub leeway: u64,
    pub validate_exp: bool,
    pub validate_nbf: bool,
    pub allowed_algs: Vec<Algorithm>,
}

impl ValidationOptions {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ..Self::default()
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// The effective algorithm set, rejecting configurations that try to
    /// widen past the crate allowlist.
    pub(crate) fn resolve_allowed_algs(&self) -> Result<&[Algorithm], Error> {
        if self.allowed_algs.is_empty() {
            return Err(Error::UnsupportedAlgorithm(
                "no allowed algorithms configured".to_string(),
            ));
        }
        for alg in &self.allowed_algs {
            if !ALLOWED_ALGS.contains(alg) {
                return Err(Error::UnsupportedAlgorithm(format!("{alg:?}")));
            }
        }
        Ok(&self.allowed_algs)
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: Vec::new(),
            leeway: 0,
            validate_exp: true,
            validate_nbf: true,
            allowed_algs: ALLOWED_ALGS.to_vec(),
        }
    }
}
