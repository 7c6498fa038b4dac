use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use super::options::ValidationOptions;
use crate::constants::REQUIRED_CLAIMS;
use crate::error::Error;

/// Lenient projection of the claims relevant to structural validation.
///
/// A claim of the wrong JSON type parses as `FailedToParse` rather than
/// failing the whole map; presence checks then treat it as absent.
#[derive(serde::Deserialize)]
struct ClaimsForValidation {
    #[serde(deserialize_with = "numeric_type", default)]
    exp: TryParse<u64>,
    #[serde(deserialize_with = "numeric_type", default)]
    nbf: TryParse<u64>,
    #[serde(default)]
    sub: TryParse<String>,
    #[serde(default)]
    iss: TryParse<String>,
    #[serde(default)]
    aud: TryParse<Audience>,
}

#[derive(Debug, Default)]
enum TryParse<T> {
    Parsed(T),
    FailedToParse,
    #[default]
    NotPresent,
}

impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for TryParse<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer) {
            Ok(Some(value)) => TryParse::Parsed(value),
            Ok(None) => TryParse::NotPresent,
            Err(_) => TryParse::FailedToParse,
        })
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(HashSet<String>),
}

/// Checks structural claims after the signature has been verified:
/// required-claim presence, temporal bounds, and issuer/audience
/// expectations when configured.
pub(crate) fn validate_claims(claims: &Value, options: &ValidationOptions) -> Result<(), Error> {
    if !claims.is_object() {
        return Err(Error::MalformedToken("claims are not a json object".to_string()));
    }
    let parsed: ClaimsForValidation = serde::Deserialize::deserialize(claims)
        .map_err(|err| Error::MalformedToken(format!("claims not deserializable: {err}")))?;

    for required in REQUIRED_CLAIMS {
        let present = match *required {
            "exp" => matches!(parsed.exp, TryParse::Parsed(_)),
            "sub" => matches!(parsed.sub, TryParse::Parsed(_)),
            _ => continue,
        };
        if !present {
            return Err(Error::MissingRequiredClaim(required));
        }
    }

    if options.validate_exp || options.validate_nbf {
        let now = jsonwebtoken::get_current_timestamp();
        if options.validate_exp {
            if let TryParse::Parsed(exp) = parsed.exp {
                if exp < now.saturating_sub(options.leeway) {
                    return Err(Error::TokenExpired);
                }
            }
        }
        if options.validate_nbf {
            if let TryParse::Parsed(nbf) = parsed.nbf {
                if nbf > now + options.leeway {
                    return Err(Error::TokenNotYetValid);
                }
            }
        }
    }

    if let Some(expected) = options.issuer.as_deref() {
        match &parsed.iss {
            TryParse::Parsed(iss) if iss == expected => {}
            TryParse::Parsed(_) | TryParse::FailedToParse => return Err(Error::InvalidIssuer),
            TryParse::NotPresent => return Err(Error::MissingRequiredClaim("iss")),
        }
    }

    if !options.audience.is_empty() {
        match &parsed.aud {
            TryParse::Parsed(Audience::Single(aud)) => {
                if !options.audience.iter().any(|expected| expected == aud) {
                    return Err(Error::InvalidAudience);
                }
            }
            TryParse::Parsed(Audience::Multiple(aud)) => {
                if !options.audience.iter().any(|expected| aud.contains(expected)) {
                    return Err(Error::InvalidAudience);
                }
            }
            TryParse::FailedToParse => return Err(Error::InvalidAudience),
            TryParse::NotPresent => return Err(Error::MissingRequiredClaim("aud")),
        }
    }

    Ok(())
}

fn numeric_type<'de, D>(deserializer: D) -> Result<TryParse<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NumericType;

    impl<'de> serde::de::Visitor<'de> for NumericType {
        type Value = TryParse<u64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a numeric value representable as u64")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.is_finite() && value >= 0.0 && value < (u64::MAX as f64) {
                Ok(TryParse::Parsed(value.round() as u64))
            } else {
                Err(serde::de::Error::custom(
                    "numeric value must be representable as u64",
                ))
            }
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(TryParse::Parsed(value))
        }
    }

    match deserializer.deserialize_any(NumericType) {
        Ok(ok) => Ok(ok),
        Err(_) => Ok(TryParse::FailedToParse),
    }
}
