use jsonwebtoken::Algorithm;
use std::time::Duration;

/// Fixed allowlist for token validation. Asymmetric RSA signatures only;
/// the header can never widen this set, options can only narrow it.
pub const ALLOWED_ALGS: &[Algorithm] = &[Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
pub(crate) const ALLOWED_ALG_NAMES: &[&str] = &["RS256", "RS384", "RS512"];
pub(crate) const ALLOWED_TOKEN_TYPES: &[&str] = &["at+jwt", "jwt"];

/// Claims that must be present in every accepted token.
pub(crate) const REQUIRED_CLAIMS: &[&str] = &["exp", "sub"];

/// `alg` values `jsonwebtoken` can deserialize from a JWKS entry. Keys
/// advertising anything else get the field stripped before parsing so one
/// exotic key cannot poison the whole set.
pub(crate) const SUPPORTED_JWK_ALGS: &[&str] = &[
    "HS256",
    "HS384",
    "HS512",
    "ES256",
    "ES384",
    "RS256",
    "RS384",
    "RS512",
    "PS256",
    "PS384",
    "PS512",
    "EdDSA",
    "RSA1_5",
    "RSA-OAEP",
    "RSA-OAEP-256",
];

/// Age below which the cached key set is served without any network call.
pub(crate) const DEFAULT_FRESH_TTL: Duration = Duration::from_secs(300);
/// Age beyond which the cached key set may no longer be used as a fallback
/// when the endpoint is unreachable.
pub(crate) const DEFAULT_STALE_TTL: Duration = Duration::from_secs(3600);
pub(crate) const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Floor between rotation-triggered refetches. Tokens signed with a
/// genuinely unknown kid must not turn into an outbound request per call.
pub(crate) const MIN_ROTATION_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Cap on the JWKS response body.
pub(crate) const MAX_JWKS_BODY_BYTES: usize = 1024 * 1024;

/// Issuer label reported to instrumentation when no expected issuer is
/// configured.
pub(crate) const DEFAULT_ISSUER_LABEL: &str = "supabase";

pub(crate) const DEFAULT_PLAN: &str = "FREE";
pub(crate) const EMAIL_CLAIM: &str = "email";
pub(crate) const PLAN_CLAIM: &str = "plan";
pub(crate) const CUSTOMER_ID_CLAIM: &str = "stripe_customer_id";

/// Claim scopes searched for provider-specific attributes, most
/// authoritative first. `None` is the top level of the claim map.
pub(crate) const CLAIM_SCOPE_PRECEDENCE: &[Option<&str>] =
    &[Some("app_metadata"), Some("user_metadata"), None];
