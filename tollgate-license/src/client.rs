//! Remote verification against a running Tollgate server.

use serde::Deserialize;

use crate::error::{LicenseError, LicenseResult};
use crate::service::Verdict;

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Asks the server at `server_url` whether `token` is valid.
///
/// A verdict the server could not reach (unknown token, broken key) comes
/// back as `valid: false` with the server's message as the reason.
pub async fn verify_remotely(
    client: &reqwest::Client,
    server_url: &str,
    token: &str,
) -> LicenseResult<Verdict> {
    let url = format!("{}/license/verify", server_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .form(&[("token", token)])
        .send()
        .await
        .map_err(|e| LicenseError::Network(e.to_string()))?;

    let body: VerifyResponse = response
        .json()
        .await
        .map_err(|e| LicenseError::Network(format!("unexpected response: {e}")))?;

    if let Some(error) = body.error {
        return Err(LicenseError::Network(error));
    }
    Ok(Verdict {
        valid: body.valid,
        reason: if body.valid { None } else { body.message },
    })
}
