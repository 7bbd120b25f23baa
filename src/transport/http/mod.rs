use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::core::error::{ConfigError, ProviderError};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Single-attempt HTTP layer under the provider adapter.
///
/// Exactly one outbound request corresponds to one invocation: there is no
/// retry loop, batching, or deduplication here. Any such policy belongs to
/// the host or the provider.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    request_timeout_ms: u64,
}

impl HttpTransport {
    /// Builds a transport with the given connect and total-request timeouts.
    ///
    /// The request timeout bounds non-streaming calls only; streaming bodies
    /// are bounded by the consumer dropping the stream.
    pub fn new(connect_timeout_ms: u64, request_timeout_ms: u64) -> Result<Self, ConfigError> {
        Self::validate_timeout(connect_timeout_ms)?;
        Self::validate_timeout(request_timeout_ms)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(connect_timeout_ms))
            .build()
            .map_err(|error| ConfigError::HttpClient {
                reason: error.to_string(),
            })?;

        Ok(Self {
            client,
            request_timeout_ms,
        })
    }

    /// Wraps a caller-supplied client. Test seam; the caller owns connect
    /// timeout configuration.
    pub fn with_client(client: reqwest::Client, request_timeout_ms: u64) -> Result<Self, ConfigError> {
        Self::validate_timeout(request_timeout_ms)?;

        Ok(Self {
            client,
            request_timeout_ms,
        })
    }

    pub async fn get_json<TResp>(
        &self,
        model: Option<&str>,
        url: &str,
        api_key: &str,
    ) -> Result<TResp, ProviderError>
    where
        TResp: DeserializeOwned,
    {
        let response = self
            .send(Method::GET, url, api_key, None, model, true)
            .await?;
        self.parse_json_body(response, model).await
    }

    pub async fn post_json<TReq, TResp>(
        &self,
        model: Option<&str>,
        url: &str,
        api_key: &str,
        body: &TReq,
    ) -> Result<TResp, ProviderError>
    where
        TReq: Serialize + ?Sized,
        TResp: DeserializeOwned,
    {
        let payload = encode_body(body, model)?;
        let response = self
            .send(Method::POST, url, api_key, Some(payload), model, true)
            .await?;
        self.parse_json_body(response, model).await
    }

    /// Issues a POST and hands back the raw response for incremental body
    /// decoding. No total-request timeout is applied: a healthy generation
    /// may outlive any fixed read budget, and cancellation is the consumer
    /// dropping the response.
    pub async fn post_stream<TReq>(
        &self,
        model: Option<&str>,
        url: &str,
        api_key: &str,
        body: &TReq,
    ) -> Result<Response, ProviderError>
    where
        TReq: Serialize + ?Sized,
    {
        let payload = encode_body(body, model)?;
        self.send(Method::POST, url, api_key, Some(payload), model, false)
            .await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        api_key: &str,
        body: Option<Vec<u8>>,
        model: Option<&str>,
        apply_request_timeout: bool,
    ) -> Result<Response, ProviderError> {
        debug!(%method, url, model = model.unwrap_or("-"), "dispatching provider request");

        let mut request_builder = self
            .client
            .request(method, url)
            .headers(auth_headers(api_key, model)?);

        if apply_request_timeout {
            request_builder =
                request_builder.timeout(Duration::from_millis(self.request_timeout_ms));
        }

        if let Some(payload) = body {
            request_builder = request_builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(payload);
        }

        let response = request_builder.send().await.map_err(|error| {
            warn!(url, error = %error, "provider request failed before a response was obtained");
            ProviderError::Connectivity {
                model: model.map(str::to_string),
                message: error.to_string(),
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        Err(self.build_status_error(model, response).await)
    }

    async fn build_status_error(&self, model: Option<&str>, response: Response) -> ProviderError {
        let status_code = response.status().as_u16();
        let request_id = extract_request_id(response.headers());
        let retry_after = extract_retry_after(response.headers());

        let message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => body,
            Ok(_) => format!("http status {status_code}"),
            Err(error) => {
                format!("http status {status_code}; failed to read response body: {error}")
            }
        };

        warn!(status_code, ?retry_after, "provider returned error status");
        ProviderError::classify_status(status_code, retry_after, model, request_id, message)
    }

    async fn parse_json_body<TResp>(
        &self,
        response: Response,
        model: Option<&str>,
    ) -> Result<TResp, ProviderError>
    where
        TResp: DeserializeOwned,
    {
        let request_id = extract_request_id(response.headers());

        response.json::<TResp>().await.map_err(|error| {
            if error.is_timeout() {
                // The response started arriving, so this is an upstream stall
                // rather than a connectivity failure.
                ProviderError::Upstream {
                    model: model.map(str::to_string),
                    request_id,
                    status_code: None,
                    message: format!("timed out reading response body: {error}"),
                }
            } else {
                ProviderError::Protocol {
                    model: model.map(str::to_string),
                    request_id,
                    message: error.to_string(),
                }
            }
        })
    }

    fn validate_timeout(timeout_ms: u64) -> Result<(), ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout { timeout_ms });
        }
        Ok(())
    }
}

fn auth_headers(api_key: &str, model: Option<&str>) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    let auth_value =
        HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|error| {
            ProviderError::Validation {
                model: model.map(str::to_string),
                message: format!("api key is not a valid header value: {error}"),
            }
        })?;
    headers.insert(AUTHORIZATION, auth_value);
    Ok(headers)
}

pub(crate) fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HeaderName::from_static(REQUEST_ID_HEADER))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// Integer-seconds form only; an HTTP-date value is carried as None.
fn extract_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn encode_body<TReq>(body: &TReq, model: Option<&str>) -> Result<Vec<u8>, ProviderError>
where
    TReq: Serialize + ?Sized,
{
    serde_json::to_vec(body).map_err(|error| ProviderError::Protocol {
        model: model.map(str::to_string),
        request_id: None,
        message: format!("failed to encode request body: {error}"),
    })
}
