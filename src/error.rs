use std::fmt;

/// Failure taxonomy for token validation and key-set maintenance.
///
/// Every failure is surfaced to the direct caller as one of these kinds;
/// none are silently swallowed. Callers map kinds to protocol responses
/// themselves; the crate never decides between e.g. 401 and 403.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("token header missing kid")]
    MissingKeyId,
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("no key published for kid: {0}")]
    UnknownKeyId(String),
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("missing required claim: {0}")]
    MissingRequiredClaim(&'static str),
    #[error("token has expired")]
    TokenExpired,
    #[error("token is not yet valid")]
    TokenNotYetValid,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("invalid subject claim: {0}")]
    InvalidSubject(String),
    #[error("jwks fetch timed out")]
    FetchTimeout,
    #[error("jwks fetch failed: status {0}")]
    FetchHttpError(u16),
    #[error("jwks response malformed: {0}")]
    FetchMalformed(String),
    #[error("jwks fetch failed: {0}")]
    FetchFailed(String),
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(#[source] Box<Error>),
    #[error("invalid jwks url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected validation error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Stable low-cardinality label for this failure kind.
    ///
    /// These feed metric labels and log fields; they carry no token or
    /// claim contents.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::MalformedToken(_) => "malformed_token",
            Error::MissingKeyId => "missing_kid",
            Error::UnsupportedAlgorithm(_) => "invalid_algorithm",
            Error::UnknownKeyId(_) => "unknown_kid",
            Error::InvalidSignature => "invalid_signature",
            Error::MissingRequiredClaim(_) => "missing_claim",
            Error::TokenExpired => "expired",
            Error::TokenNotYetValid => "not_yet_valid",
            Error::InvalidIssuer => "invalid_issuer",
            Error::InvalidAudience => "invalid_audience",
            Error::InvalidSubject(_) => "invalid_sub",
            Error::FetchTimeout => "jwks_timeout",
            Error::FetchHttpError(_) => "jwks_http_error",
            Error::FetchMalformed(_) => "jwks_malformed",
            Error::FetchFailed(_) => "jwks_error",
            Error::KeySetUnavailable(_) => "jwks_unavailable",
            Error::Url(_) => "invalid_url",
            Error::Unexpected(_) => "unknown_error",
        }
    }

    /// True for failures of the key-set fetch itself, as opposed to
    /// failures of the presented token.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::FetchTimeout
                | Error::FetchHttpError(_)
                | Error::FetchMalformed(_)
                | Error::FetchFailed(_)
        )
    }
}

pub(crate) fn unexpected(context: &str, err: impl fmt::Display) -> Error {
    log::error!("{context}: {err}");
    Error::Unexpected(format!("{context}: {err}"))
}
