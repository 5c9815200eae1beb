//! OpenAI-compatible client construction.
//!
//! Every model endpoint (primary, fallback, routing, embeddings) speaks the
//! OpenAI wire protocol, so they all share this builder and differ only in
//! base URL, credential and timeout.

use crate::error::{Result, TransmeetError};
use async_openai::{config::OpenAIConfig, Client};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Placeholder key sent to local servers that do not check credentials.
const NO_KEY: &str = "not-needed";

/// Read the API key named by `api_key_env`.
///
/// Returns `Ok(None)` when no variable is configured (local endpoints), and a
/// credential error when the variable is named but missing or empty.
pub fn resolve_api_key(api_key_env: Option<&str>) -> Result<Option<String>> {
    let Some(var) = api_key_env.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
        Ok(_) => Err(TransmeetError::Credential(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(TransmeetError::Credential(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

/// HTTP client bounding every request to an endpoint by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Backoff that gives up after the first attempt.
///
/// async-openai retries rate-limited requests by default; callers here own
/// the retry and fallback policy, so every call is made once.
pub fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Create an OpenAI-compatible client for the given endpoint.
pub fn create_client(
    base_url: Option<&str>,
    api_key_env: Option<&str>,
    http_client: reqwest::Client,
) -> Result<Client<OpenAIConfig>> {
    let api_key = resolve_api_key(api_key_env)?.unwrap_or_else(|| NO_KEY.to_string());

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = base_url.filter(|b| !b.is_empty()) {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(single_attempt()))
}
