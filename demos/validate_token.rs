use std::sync::Arc;
use trustgate::{AuthConfig, LogObserver, TokenValidator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let token = match std::env::var("AUTH_TOKEN") {
        Ok(value) => value,
        Err(_) => {
            eprintln!("AUTH_TOKEN is not set. Skipping.");
            eprintln!("Example: AUTH_TOKEN=eyJhbGciOi... AUTH_JWKS_URL=https://... cargo run --example validate_token");
            return Ok(());
        }
    };

    let config = AuthConfig::from_env();
    let validator = TokenValidator::from_config(&config)?.with_observer(Arc::new(LogObserver));

    let principal = validator.validate(&token).await?;
    println!("subject: {}", principal.subject);
    println!("email:   {}", principal.email);
    println!("plan:    {}", principal.plan);
    Ok(())
}
