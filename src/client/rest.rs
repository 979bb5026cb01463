//! Zenlayer Cloud REST transport
//!
//! Every vendor action is a JSON `POST` to `{endpoint}/api/v2/{service}` with
//! the action named in a header. Requests are signed with the access key
//! password; responses come back in one of two envelopes:
//!
//! - success: `{"requestId": "...", "response": {...}}`
//! - failure: `{"requestId": "...", "code": "...", "message": "..."}`
//!
//! Transport failures are mapped onto the well-known retryable codes so the
//! classifier can treat them like any other vendor error.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Instant;
use tracing::{debug, debug_span, warn, Instrument};

use crate::config::{Credentials, ProviderConfig};
use crate::constants::API_VERSION;
use crate::engine::error::{ErrorCode, ProviderError, ProviderResult, VendorError};
use crate::observability::metrics;

pub const HEADER_ACTION: &str = "X-ZC-Action";
pub const HEADER_VERSION: &str = "X-ZC-Version";
pub const HEADER_TIMESTAMP: &str = "X-ZC-Timestamp";
pub const HEADER_REQUEST_CLIENT: &str = "X-ZC-Request-Client";
pub const HEADER_REQUEST_ID: &str = "X-ZC-Request-Id";
pub const SIGNATURE_ALGORITHM: &str = "ZC2-HMAC-SHA256";

/// Response envelope shared by every action
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    request_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
    response: Option<serde_json::Value>,
}

/// Signed JSON client for the vendor API
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    endpoint: String,
    request_client: String,
    credentials: Credentials,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint)
            .field("request_client", &self.request_client)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build the client and its HTTP connection pool
    ///
    /// # Errors
    /// Returns [`ProviderError::Internal`] if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let http_client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ProviderError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            request_client: config.request_client.clone(),
            credentials: config.credentials.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Hex HMAC-SHA256 keyed with the password over `action \n timestamp \n body`
    ///
    /// # Errors
    /// Returns [`ProviderError::Internal`] if the MAC rejects the key.
    pub fn signature(password: &str, action: &str, timestamp: i64, body: &str) -> ProviderResult<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(password.as_bytes())
            .map_err(|err| ProviderError::Internal(format!("invalid signing key: {err}")))?;
        mac.update(action.as_bytes());
        mac.update(b"\n");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(body.as_bytes());
        Ok(format!("{:x}", mac.finalize().into_bytes()))
    }

    /// Value of the `Authorization` header
    #[must_use]
    pub fn authorization(access_key_id: &str, signature: &str) -> String {
        format!("{SIGNATURE_ALGORITHM} Credential={access_key_id}, Signature={signature}")
    }

    /// Build a signed request for one action
    fn make_request(
        &self,
        service: &str,
        action: &str,
        body: String,
    ) -> ProviderResult<reqwest::RequestBuilder> {
        let url = format!("{}/api/v2/{}", self.endpoint, service);
        let timestamp = chrono::Utc::now().timestamp();
        let signature = Self::signature(
            self.credentials.access_key_password(),
            action,
            timestamp,
            &body,
        )?;

        Ok(self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .header(HEADER_ACTION, action)
            .header(HEADER_VERSION, API_VERSION)
            .header(HEADER_TIMESTAMP, timestamp.to_string())
            .header(HEADER_REQUEST_CLIENT, &self.request_client)
            .header(HEADER_REQUEST_ID, uuid::Uuid::new_v4().to_string())
            .header(
                "Authorization",
                Self::authorization(self.credentials.access_key_id(), &signature),
            )
            .body(body))
    }

    /// Invoke `action` on `service` and decode the `response` payload
    ///
    /// # Errors
    /// Returns [`ProviderError::Vendor`] for error envelopes and transport
    /// failures, [`ProviderError::Serialization`] for undecodable payloads.
    pub async fn call<Req, Resp>(
        &self,
        service: &str,
        action: &str,
        request: &Req,
    ) -> ProviderResult<Resp>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let span = debug_span!("zenlayer.api", service = service, action = action);
        async move {
            let started = Instant::now();
            let result = self.send(service, action, request).await;
            metrics::record_api_call(service, action, started.elapsed().as_secs_f64());
            if let Err(err) = &result {
                metrics::increment_api_errors(err.code());
                warn!(code = err.code(), "vendor call failed: {}", err);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn send<Req, Resp>(&self, service: &str, action: &str, request: &Req) -> ProviderResult<Resp>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_string(request)?;
        debug!(body_len = body.len(), "sending request");

        let response = self
            .make_request(service, action, body)?
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        let envelope = match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(Self::handle_error_response(status, &text)),
            Err(e) => return Err(e.into()),
        };

        if let Some(code) = envelope.code {
            let mut err = VendorError::new(code.as_str(), envelope.message.unwrap_or_default());
            if let Some(request_id) = envelope.request_id {
                err = err.with_request_id(request_id);
            }
            return Err(err.into());
        }
        if !status.is_success() {
            return Err(Self::handle_error_response(status, &text));
        }

        let payload = envelope
            .response
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        Ok(serde_json::from_value(payload)?)
    }

    /// Map a non-2xx status without an error envelope
    fn handle_error_response(status: StatusCode, body: &str) -> ProviderError {
        let code = if status.is_server_error() {
            ErrorCode::InternalServerError
        } else {
            ErrorCode::Other(format!("HTTP_{}", status.as_u16()))
        };
        let message = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };
        ProviderError::Vendor(VendorError::new(code, message))
    }
}

/// Map a transport failure onto the retryable codes
fn transport_error(err: reqwest::Error) -> ProviderError {
    let code = if err.is_timeout() {
        ErrorCode::ReadTimedOut
    } else {
        ErrorCode::NetworkError
    };
    ProviderError::Vendor(VendorError::new(code, err.to_string()))
}
