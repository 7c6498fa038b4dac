use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use crate::constants::ALLOWED_TOKEN_TYPES;
use crate::error::Error;

/// Header fields extracted before any cryptographic work.
///
/// Both `alg` and `kid` are attacker-controlled: they drive the allow-list
/// check and the key lookup, nothing else.
#[derive(Debug, Clone)]
pub struct TokenHeader {
    pub alg: String,
    pub kid: String,
    pub typ: Option<String>,
    pub raw: Value,
}

#[derive(Debug)]
pub(crate) struct TokenParts<'a> {
    pub(crate) header: &'a str,
    pub(crate) payload: &'a str,
    pub(crate) signature: &'a str,
}

impl TokenParts<'_> {
    /// The bytes the signature covers.
    pub(crate) fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

pub(crate) fn split_token(token: &str) -> Result<TokenParts<'_>, Error> {
    let mut iter = token.split('.');
    let header = iter.next().ok_or_else(malformed_structure)?;
    let payload = iter.next().ok_or_else(malformed_structure)?;
    let signature = iter.next().ok_or_else(malformed_structure)?;
    if iter.next().is_some() {
        return Err(malformed_structure());
    }
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(malformed_structure());
    }
    Ok(TokenParts {
        header,
        payload,
        signature,
    })
}

fn malformed_structure() -> Error {
    Error::MalformedToken("expected three dot-separated segments".to_string())
}

pub(crate) fn decode_header(encoded: &str) -> Result<TokenHeader, Error> {
    let header_bytes = base64_url_decode(encoded)?;
    let raw: Value = serde_json::from_slice(&header_bytes)
        .map_err(|err| Error::MalformedToken(format!("header is not json: {err}")))?;
    let alg = raw
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedToken("header missing alg".to_string()))?
        .to_string();
    // A kid is mandatory: the provider publishes multiple concurrently
    // valid signing keys, and lookup is by kid alone.
    let kid = raw
        .get("kid")
        .and_then(Value::as_str)
        .filter(|kid| !kid.is_empty())
        .ok_or(Error::MissingKeyId)?
        .to_string();
    let typ = match raw.get("typ") {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value.to_string()),
        Some(_) => return Err(Error::MalformedToken("header typ is not a string".to_string())),
    };
    Ok(TokenHeader { alg, kid, typ, raw })
}

pub(crate) fn validate_token_typ(typ: Option<&str>) -> Result<(), Error> {
    let Some(typ) = typ else {
        return Ok(());
    };
    if ALLOWED_TOKEN_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(typ))
    {
        return Ok(());
    }
    Err(Error::MalformedToken(format!("unexpected typ: {typ}")))
}

pub(crate) fn base64_url_decode(data: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(data)
        .map_err(|err| Error::MalformedToken(format!("base64url decode error: {err}")))
}
