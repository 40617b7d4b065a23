//! Authenticated transport shared by every Nova API.
//!
//! Adds the token to each request and is the second writer of the shared
//! failure slot: a 401 or 403 from any endpoint poisons it, and a poisoned
//! slot refuses further requests before they hit the network.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use nimbus_core::constants::AUTH_TOKEN_HEADER;
use nimbus_core::error::{AuthorizationError, NimbusError, Result};
use nimbus_core::AuthFailureSlot;

use crate::config::NovaConfig;

/// HTTP client that authenticates requests and records denials.
#[derive(Clone)]
pub(crate) struct AuthenticatedClient {
    http: reqwest::Client,
    token: String,
    slot: AuthFailureSlot,
}

impl fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("token", &"<redacted>")
            .field("poisoned", &self.slot.is_poisoned())
            .finish_non_exhaustive()
    }
}

impl AuthenticatedClient {
    pub(crate) fn new(config: &NovaConfig, slot: AuthFailureSlot) -> Result<Self> {
        if config.auth_token.trim().is_empty() {
            return Err(NimbusError::ConfigError("auth token is not configured".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| NimbusError::HttpError(e.to_string()))?;

        Ok(Self {
            http,
            token: config.auth_token.clone(),
            slot,
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn failure_slot(&self) -> &AuthFailureSlot {
        &self.slot
    }

    /// Sends `request`, converting 401/403 into a stored denial.
    ///
    /// Every other status is handed back to the caller.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        if let Some(denial) = self.slot.get() {
            debug!("Failure slot poisoned, refusing request");
            return Err(NimbusError::AuthorizationDenied(denial));
        }

        let response = request
            .header(AUTH_TOKEN_HEADER, self.token.as_str())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            let message = fault_message(&body).unwrap_or_else(|| status.to_string());
            let denial = AuthorizationError::with_status(status.as_u16(), message);
            if self.slot.set_if_absent(denial.clone()) {
                warn!(status = status.as_u16(), error = %denial, "Authorization denied, poisoning shared failure slot");
            }
            return Err(NimbusError::AuthorizationDenied(denial));
        }

        Ok(response)
    }

    /// Sends `request` and deserializes the value under `key`.
    ///
    /// Returns `None` on 404.
    pub(crate) async fn fetch_selected<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        key: &str,
    ) -> Result<Option<T>> {
        let response = self.send(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(key, "Resource not found");
            return Ok(None);
        }

        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(NimbusError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let mut json: Value = serde_json::from_str(&body)?;
        let selected = json
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| NimbusError::ValidationError(format!("response is missing '{}'", key)))?;

        Ok(Some(serde_json::from_value(selected)?))
    }
}

fn transport_error(e: reqwest::Error) -> NimbusError {
    if e.is_timeout() {
        NimbusError::Timeout(e.to_string())
    } else {
        NimbusError::HttpError(e.to_string())
    }
}

/// Extracts `message` from a Nova fault body such as
/// `{"unauthorized": {"message": "...", "code": 401}}`.
fn fault_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.as_object()?
        .values()
        .find_map(|fault| fault.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
