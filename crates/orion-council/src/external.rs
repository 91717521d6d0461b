// crates/orion-council/src/external.rs
// ============================================================================
// Module: External Validator
// Description: Parallel cloud-provider validation with bounded retry.
// Purpose: Implement spec.md §4.7's External Validator: up to two
//          independent providers, 10 s per-call timeout, two retries with
//          exponential backoff on transient errors, no retry on auth or
//          rate-limit.
// Dependencies: async-trait, futures, orion-core, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! Cloud validation APIs are out of scope beyond their call shape
//! (spec.md §1). [`CloudValidator`] is that call shape; [`HttpCloudValidator`]
//! is a minimal HTTP implementation reading its endpoint and API key from
//! environment variables, skipped (not an error) when the key is absent.
//! [`ExternalValidator::validate_parallel`] fans the configured providers out
//! concurrently and returns their results in provider-registration order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orion_core::contracts::Decision;

/// Per-provider call timeout (spec.md §4.7, §5).
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff delays between retries of a transient failure.
pub const RETRY_BACKOFFS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

/// Failure modes for a single cloud-validator call.
#[derive(Debug, Clone)]
pub enum CloudError {
    /// The call exceeded [`CALL_TIMEOUT`].
    Timeout,
    /// A connection-level failure (DNS, TCP, TLS).
    Connection(String),
    /// The provider rejected credentials.
    Auth(String),
    /// The provider reported rate limiting.
    RateLimit(String),
    /// Any other provider-reported failure.
    Other(String),
}

impl CloudError {
    /// `Timeout` and `Connection` are transient and eligible for retry;
    /// `Auth` and `RateLimit` are not (spec.md §4.7).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }

    fn describe(&self) -> String {
        match self {
            Self::Timeout => "timed out".to_string(),
            Self::Connection(detail) => format!("connection error: {detail}"),
            Self::Auth(detail) => format!("authentication error: {detail}"),
            Self::RateLimit(detail) => format!("rate limited: {detail}"),
            Self::Other(detail) => detail.clone(),
        }
    }
}

/// Call shape for an independent cloud validation provider.
#[async_trait]
pub trait CloudValidator: Send + Sync {
    /// Stable provider name, used in logs and joined critiques.
    fn name(&self) -> &str;

    /// Runs one validation call, without retry or timeout handling — those
    /// are applied by [`validate_with_retry`].
    ///
    /// # Errors
    ///
    /// Returns [`CloudError`] describing why the call did not produce a
    /// `(confidence, critique)` pair.
    async fn validate(&self, decision: &Decision) -> Result<(f64, String), CloudError>;
}

/// Runs `provider.validate` under the 10 s timeout, retrying up to twice
/// with exponential backoff on transient errors only. Any terminal failure
/// collapses to `(0.0, "ERROR: ...")`, contributing a zero-confidence vote.
pub async fn validate_with_retry(provider: &dyn CloudValidator, decision: &Decision) -> (f64, String) {
    let mut attempt = 0usize;
    loop {
        let outcome = tokio::time::timeout(CALL_TIMEOUT, provider.validate(decision))
            .await
            .unwrap_or(Err(CloudError::Timeout));
        match outcome {
            Ok(result) => return result,
            Err(err) if err.is_transient() && attempt < RETRY_BACKOFFS.len() => {
                tracing::warn!(provider = provider.name(), attempt, error = %err.describe(), "retrying transient error");
                tokio::time::sleep(RETRY_BACKOFFS[attempt]).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(provider = provider.name(), error = %err.describe(), "external validator failed");
                return (0.0, format!("ERROR: {}", err.describe()));
            }
        }
    }
}

/// Minimal HTTP cloud validator: POSTs the decision to a configured
/// endpoint with bearer auth, parsing the same `CONFIDENCE:`/`CRITIQUE:`
/// shape the local validator uses.
pub struct HttpCloudValidator {
    name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpCloudValidator {
    /// Builds a validator for `name` against `endpoint`, authenticating
    /// with `api_key`.
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CloudValidator for HttpCloudValidator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate(&self, decision: &Decision) -> Result<(f64, String), CloudError> {
        let body = serde_json::json!({
            "incident_id": decision.incident_id.to_string(),
            "decision_type": format!("{:?}", decision.decision_type),
            "safety_classification": format!("{:?}", decision.safety_classification),
            "reasoning": decision.reasoning,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    CloudError::Timeout
                } else {
                    CloudError::Connection(err.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CloudError::Auth(status.to_string()));
        }
        if status.as_u16() == 429 {
            return Err(CloudError::RateLimit(status.to_string()));
        }
        if !status.is_success() {
            return Err(CloudError::Other(format!("http {status}")));
        }

        let text = response.text().await.map_err(|err| CloudError::Connection(err.to_string()))?;
        Ok(crate::local::parse_model_output(&text))
    }
}

/// Reads `ANTHROPIC_API_KEY`/`ANTHROPIC_API_URL` and builds a validator,
/// or returns `None` (not an error) if the key is absent.
#[must_use]
pub fn claude_validator_from_env() -> Option<HttpCloudValidator> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
    let endpoint = std::env::var("ANTHROPIC_API_URL")
        .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string());
    Some(HttpCloudValidator::new("claude", endpoint, api_key))
}

/// Reads `OPENAI_API_KEY`/`OPENAI_API_URL` and builds a validator, or
/// returns `None` (not an error) if the key is absent.
#[must_use]
pub fn openai_validator_from_env() -> Option<HttpCloudValidator> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let endpoint =
        std::env::var("OPENAI_API_URL").unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
    Some(HttpCloudValidator::new("openai", endpoint, api_key))
}

/// Fans a decision out to all configured providers concurrently.
#[derive(Default)]
pub struct ExternalValidator {
    providers: Vec<Arc<dyn CloudValidator>>,
}

impl ExternalValidator {
    /// Builds an external validator from explicit providers (for tests).
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn CloudValidator>>) -> Self {
        Self { providers }
    }

    /// Builds an external validator from environment-configured providers,
    /// skipping any whose credentials are absent.
    #[must_use]
    pub fn from_env() -> Self {
        let mut providers: Vec<Arc<dyn CloudValidator>> = Vec::new();
        if let Some(claude) = claude_validator_from_env() {
            providers.push(Arc::new(claude));
        } else {
            tracing::info!("claude external validator not configured; skipping");
        }
        if let Some(openai) = openai_validator_from_env() {
            providers.push(Arc::new(openai));
        } else {
            tracing::info!("openai external validator not configured; skipping");
        }
        Self { providers }
    }

    /// Runs `validate_with_retry` against every configured provider
    /// concurrently, returning results in registration order. If no
    /// provider is configured, returns a single zero-confidence error vote.
    pub async fn validate_parallel(&self, decision: &Decision) -> Vec<(f64, String)> {
        if self.providers.is_empty() {
            return vec![(0.0, "ERROR: No external APIs configured".to_string())];
        }
        let futures = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let decision = decision.clone();
            async move { validate_with_retry(provider.as_ref(), &decision).await }
        });
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use orion_core::contracts::AutonomyLevel;
    use orion_core::contracts::DecisionType;
    use orion_core::contracts::SafetyClassification;
    use orion_core::identifiers::IncidentId;
    use time::OffsetDateTime;

    use super::*;

    fn sample_decision() -> Decision {
        Decision::new(
            IncidentId::new(),
            DecisionType::NoAction,
            SafetyClassification::Safe,
            "observe only, N0 autonomy",
            AutonomyLevel::N0,
            None,
            OffsetDateTime::now_utc(),
        )
        .expect("decision")
    }

    struct FlakyProvider {
        attempts: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait]
    impl CloudValidator for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn validate(&self, _decision: &Decision) -> Result<(f64, String), CloudError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_until {
                Err(CloudError::Connection("simulated".to_string()))
            } else {
                Ok((0.8, "approved".to_string()))
            }
        }
    }

    struct AuthFailingProvider;

    #[async_trait]
    impl CloudValidator for AuthFailingProvider {
        fn name(&self) -> &str {
            "auth-failing"
        }

        async fn validate(&self, _decision: &Decision) -> Result<(f64, String), CloudError> {
            Err(CloudError::Auth("bad key".to_string()))
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_up_to_twice() {
        let provider = FlakyProvider { attempts: AtomicUsize::new(0), fail_until: 2 };
        let (confidence, _) = validate_with_retry(&provider, &sample_decision()).await;
        assert_eq!(confidence, 0.8);
        assert_eq!(provider.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_auth_errors() {
        let provider = AuthFailingProvider;
        let (confidence, critique) = validate_with_retry(&provider, &sample_decision()).await;
        assert_eq!(confidence, 0.0);
        assert!(critique.contains("authentication"));
    }

    #[tokio::test]
    async fn no_providers_configured_yields_single_error_vote() {
        let validator = ExternalValidator::new(vec![]);
        let results = validator.validate_parallel(&sample_decision()).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].1.contains("No external APIs configured"));
    }

    #[tokio::test]
    async fn validate_parallel_preserves_provider_order() {
        let first = Arc::new(FlakyProvider { attempts: AtomicUsize::new(0), fail_until: 0 });
        let second = Arc::new(AuthFailingProvider);
        let validator = ExternalValidator::new(vec![first, second]);
        let results = validator.validate_parallel(&sample_decision()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0.8);
        assert_eq!(results[1].0, 0.0);
    }
}
