use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::thread_rng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::OnceLock;
use std::time::Duration;
use trustgate::{Error, JwksProvider, TokenValidator, ValidationOptions};

mod common;
use common::{serve_json, serve_sequence};

const SUBJECT: &str = "7f1c3a52-14d8-4f5b-9f3f-2f2f4f1a9b10";

fn rsa_private_key_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        let mut rng = thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).expect("private key");
        key.to_pkcs1_pem(LineEnding::LF)
            .expect("private key pem")
            .to_string()
    })
    .as_str()
}

fn jwks_body(kids: &[&str]) -> String {
    let private_key = RsaPrivateKey::from_pkcs1_pem(rsa_private_key_pem()).expect("key");
    let public_key = RsaPublicKey::from(&private_key);
    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    let keys: Vec<_> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "kid": kid,
                "alg": "RS256",
                "n": n,
                "e": e,
            })
        })
        .collect();
    serde_json::to_string(&json!({ "keys": keys })).expect("jwks body")
}

fn valid_claims() -> Value {
    json!({
        "sub": SUBJECT,
        "email": "dev@example.com",
        "exp": jsonwebtoken::get_current_timestamp() + 3600,
        "app_metadata": {"plan": "PRO"},
    })
}

fn sign_token(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(rsa_private_key_pem().as_bytes()).expect("encoding key"),
    )
    .expect("token")
}

#[tokio::test]
async fn first_call_fetches_second_call_hits_cache() {
    let (base_url, hits) = serve_json(jwks_body(&["k1", "k2", "k3"])).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let token = sign_token("k2", &valid_claims());
    let first = validator.validate(&token).await.expect("first validate");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let second = validator.validate(&token).await.expect("second validate");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert_eq!(first.subject, second.subject);
    assert_eq!(first.subject.to_string(), SUBJECT);
    assert_eq!(first.email, second.email);
    assert_eq!(first.plan, "PRO");
    assert_eq!(second.plan, "PRO");
}

#[tokio::test]
async fn malformed_token_performs_no_fetch() {
    let (base_url, hits) = serve_json(jwks_body(&["k1"])).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let err = validator.validate("definitely.not").await.expect_err("fail");
    assert!(matches!(err, Error::MalformedToken(_)));
    assert_eq!(err.reason(), "malformed_token");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disallowed_alg_performs_no_fetch() {
    let (base_url, hits) = serve_json(jwks_body(&["k1"])).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let header =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"alg": "HS256", "kid": "k1"})).unwrap());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&valid_claims()).unwrap());
    let token = format!("{header}.{payload}.c2ln");

    let err = validator.validate(&token).await.expect_err("fail");
    assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_token_is_rejected_end_to_end() {
    let (base_url, _hits) = serve_json(jwks_body(&["k1"])).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let mut claims = valid_claims();
    claims["exp"] = json!(jsonwebtoken::get_current_timestamp() - 60);
    let err = validator
        .validate(&sign_token("k1", &claims))
        .await
        .expect_err("fail");
    assert!(matches!(err, Error::TokenExpired));
    assert_eq!(err.reason(), "expired");
}

#[tokio::test]
async fn token_signed_with_unpublished_key_is_unknown_kid() {
    let (base_url, hits) = serve_json(jwks_body(&["k2"])).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let err = validator
        .validate(&sign_token("k1", &valid_claims()))
        .await
        .expect_err("fail");
    match err {
        Error::UnknownKeyId(kid) => assert_eq!(kid, "k1"),
        other => panic!("unexpected error: {:?}", other),
    }
    // The refresh ran; the rotation refetch is rate-limited right after it.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_failure_falls_back_to_stale_keys() {
    let (base_url, hits) = serve_sequence(vec![
        (200, jwks_body(&["k1"])),
        (500, "upstream down".to_string()),
    ])
    .await;
    // A zero fresh window forces a refresh attempt on every call while the
    // hour-long stale window keeps the first response usable.
    let provider = JwksProvider::new(format!("{}/jwks", base_url))
        .expect("provider")
        .with_fresh_ttl(Duration::ZERO);
    let validator = TokenValidator::new(provider);

    let token = sign_token("k1", &valid_claims());
    validator.validate(&token).await.expect("first validate");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let principal = validator.validate(&token).await.expect("stale fallback");
    assert_eq!(principal.subject.to_string(), SUBJECT);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fetch_failure_with_empty_cache_is_key_set_unavailable() {
    let (base_url, _hits) = serve_sequence(vec![(503, "upstream down".to_string())]).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let err = validator
        .validate(&sign_token("k1", &valid_claims()))
        .await
        .expect_err("fail");
    match err {
        Error::KeySetUnavailable(source) => {
            assert!(matches!(*source, Error::FetchHttpError(503)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn fetch_failure_beyond_stale_window_is_key_set_unavailable() {
    let (base_url, _hits) = serve_sequence(vec![
        (200, jwks_body(&["k1"])),
        (500, "upstream down".to_string()),
    ])
    .await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url))
        .expect("provider")
        .with_fresh_ttl(Duration::ZERO)
        .with_stale_ttl(Duration::ZERO);
    let validator = TokenValidator::new(provider);

    let token = sign_token("k1", &valid_claims());
    validator.validate(&token).await.expect("first validate");

    let err = validator.validate(&token).await.expect_err("fail");
    assert!(matches!(err, Error::KeySetUnavailable(_)));
    assert_eq!(err.reason(), "jwks_unavailable");
}

#[tokio::test]
async fn issuer_and_audience_checks_run_when_configured() {
    let (base_url, _hits) = serve_json(jwks_body(&["k1"])).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let options = ValidationOptions::default()
        .with_issuer("https://auth.example.com")
        .with_audience("api");
    let validator = TokenValidator::new(provider).with_options(options);

    let mut claims = valid_claims();
    claims["iss"] = json!("https://auth.example.com");
    claims["aud"] = json!("api");
    validator
        .validate(&sign_token("k1", &claims))
        .await
        .expect("valid");

    claims["aud"] = json!("billing");
    let err = validator
        .validate(&sign_token("k1", &claims))
        .await
        .expect_err("fail");
    assert!(matches!(err, Error::InvalidAudience));
}

#[tokio::test]
async fn malformed_jwks_body_with_empty_cache_is_key_set_unavailable() {
    let (base_url, _hits) = serve_json(r#"{"keys": []}"#.to_string()).await;
    let provider = JwksProvider::new(format!("{}/jwks", base_url)).expect("provider");
    let validator = TokenValidator::new(provider);

    let err = validator
        .validate(&sign_token("k1", &valid_claims()))
        .await
        .expect_err("fail");
    match err {
        Error::KeySetUnavailable(source) => {
            assert!(matches!(*source, Error::FetchMalformed(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
