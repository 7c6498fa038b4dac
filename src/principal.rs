use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::constants::{
    CLAIM_SCOPE_PRECEDENCE, CUSTOMER_ID_CLAIM, DEFAULT_PLAN, EMAIL_CLAIM, PLAN_CLAIM,
};
use crate::error::Error;

/// Application-level identity derived from a validated token.
///
/// The full claim map is retained so callers can read provider-specific
/// attributes this crate does not model.
#[derive(Debug, Clone, Serialize)]
pub struct TrustPrincipal {
    pub subject: Uuid,
    pub email: String,
    pub plan: String,
    pub customer_id: Option<String>,
    pub claims: Map<String, Value>,
}

impl TrustPrincipal {
    /// Maps validated claims to a principal.
    ///
    /// The subject must parse as the identity provider's canonical UUID
    /// format. Plan and billing-customer id are looked up through the
    /// provider's metadata sub-maps before the top level; email defaults
    /// to empty rather than failing.
    pub fn from_claims(claims: Value) -> Result<Self, Error> {
        let map = match claims {
            Value::Object(map) => map,
            _ => return Err(Error::MalformedToken("claims are not a json object".to_string())),
        };

        let subject = map
            .get("sub")
            .and_then(Value::as_str)
            .ok_or(Error::MissingRequiredClaim("sub"))?;
        let subject = Uuid::parse_str(subject)
            .map_err(|_| Error::InvalidSubject(subject.to_string()))?;

        let email = map
            .get(EMAIL_CLAIM)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let plan = scoped_claim(&map, PLAN_CLAIM)
            .unwrap_or(DEFAULT_PLAN)
            .to_string();
        let customer_id = scoped_claim(&map, CUSTOMER_ID_CLAIM).map(String::from);

        Ok(Self {
            subject,
            email,
            plan,
            customer_id,
            claims: map,
        })
    }
}

/// Resolves a claim through the fixed scope precedence: the provider's
/// application-metadata sub-map, then user-metadata, then the top level.
/// Non-string and empty values fall through to the next scope.
fn scoped_claim<'a>(claims: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    CLAIM_SCOPE_PRECEDENCE.iter().find_map(|scope| {
        let holder = match scope {
            Some(sub_map) => claims.get(*sub_map)?.as_object()?,
            None => claims,
        };
        holder
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    })
}
