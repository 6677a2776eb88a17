//! HTTP plumbing shared by the adapters.

use std::time::Duration;

use reqwest::{Client, Response};
use url::Url;

use lyricsmith_shared::{LyricsmithError, Result};

/// User-Agent string for every outbound request.
const USER_AGENT: &str = concat!("lyricsmith/", env!("CARGO_PKG_VERSION"));

/// Longest error body excerpt carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Build a reqwest client with the given request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LyricsmithError::Provider(format!("failed to build HTTP client: {e}")))
}

/// Join `path` onto a configured base URL, keeping any base path segment
/// (e.g. `https://api.openai.com/v1` + `chat/completions`).
pub(crate) fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let mut base = base_url.trim_end_matches('/').to_string();
    base.push('/');
    let base = Url::parse(&base)
        .map_err(|e| LyricsmithError::config(format!("invalid base URL '{base_url}': {e}")))?;
    base.join(path.trim_start_matches('/'))
        .map_err(|e| LyricsmithError::config(format!("invalid endpoint '{path}': {e}")))
}

/// Map a reqwest transport error, surfacing timeouts distinctly.
pub(crate) fn transport_error(
    operation: &str,
    timeout_secs: u64,
    err: reqwest::Error,
) -> LyricsmithError {
    if err.is_timeout() {
        LyricsmithError::Timeout {
            operation: operation.to_string(),
            after_secs: timeout_secs,
        }
    } else {
        LyricsmithError::Provider(format!("{operation}: {err}"))
    }
}

/// Turn a non-2xx response into a provider error with a body excerpt.
pub(crate) async fn check_status(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(LyricsmithError::Provider(format!(
        "{operation}: HTTP {status}: {excerpt}"
    )))
}
