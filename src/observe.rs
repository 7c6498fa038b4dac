use std::time::Duration;

/// Receives the outcome of every validation attempt.
///
/// `outcome` is `"valid"` or a failure-kind label; `reason` repeats the
/// failure kind and is absent on success. Implementations bridge to
/// whatever metrics or tracing backend the host process runs; raw token
/// and key material never reach this interface.
pub trait ValidationObserver: Send + Sync {
    fn record(&self, issuer: &str, outcome: &str, reason: Option<&str>, duration: Duration);
}

/// Discards every observation. The default when no backend is wired up.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ValidationObserver for NoopObserver {
    fn record(&self, _issuer: &str, _outcome: &str, _reason: Option<&str>, _duration: Duration) {}
}

/// Emits one debug-level log line per validation.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ValidationObserver for LogObserver {
    fn record(&self, issuer: &str, outcome: &str, reason: Option<&str>, duration: Duration) {
        match reason {
            Some(reason) => log::debug!(
                "token validation: issuer {issuer} outcome {outcome} reason {reason} duration_ms {}",
                duration.as_millis()
            ),
            None => log::debug!(
                "token validation: issuer {issuer} outcome {outcome} duration_ms {}",
                duration.as_millis()
            ),
        }
    }
}
