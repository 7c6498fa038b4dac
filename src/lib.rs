#![forbid(unsafe_code)]

//! Bearer-token trust derivation against a remotely published key set.
//!
//! Tokens are validated with a fixed asymmetric-algorithm allowlist and a
//! key cache that bounds both rotation lag (fresh window) and the blast
//! radius of a key-endpoint outage (stale window). Validated claims are
//! mapped to a [`TrustPrincipal`].

mod config;
mod constants;
mod error;
mod jwks;
mod observe;
mod principal;
mod validator;

pub use config::AuthConfig;
pub use constants::ALLOWED_ALGS;
pub use error::Error;
pub use jwks::{keys_from_slice, JwksProvider, KeySetCache, KeySetFetcher};
pub use observe::{LogObserver, NoopObserver, ValidationObserver};
pub use principal::TrustPrincipal;
pub use validator::{TokenHeader, TokenValidator, ValidationOptions};
