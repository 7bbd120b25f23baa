pub(crate) mod translate;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::catalog;
use crate::core::error::{ConfigError, ProviderError};
use crate::core::traits::ProviderAdapter;
use crate::core::types::{
    ChatRequest, ChatResponse, ChatStream, ModelDescriptor, ProviderConfig,
};
use crate::stream;
use crate::transport::http::HttpTransport;
use crate::provider::translate::{format_error_message, parse_error_envelope};

const CEREBRAS_DEFAULT_BASE_URL: &str = "https://api.cerebras.ai/v1";
const CEREBRAS_API_KEY_ENV: &str = "CEREBRAS_API_KEY";

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Pass-through adapter for the Cerebras chat-completions API.
///
/// Stateless across calls: the only data it holds are the immutable endpoint
/// default and the HTTP client pool, both safe to share across concurrent
/// invocations.
pub struct CerebrasAdapter {
    transport: HttpTransport,
    base_url: String,
}

impl CerebrasAdapter {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_url(CEREBRAS_DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url)?;
        let transport = HttpTransport::new(DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS)?;
        Ok(Self {
            transport,
            base_url,
        })
    }

    pub(crate) fn with_transport(
        base_url: impl Into<String>,
        transport: HttpTransport,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            transport,
            base_url: normalize_base_url(base_url)?,
        })
    }

    fn chat_completions_url(&self, config: &ProviderConfig) -> String {
        format!("{}/chat/completions", self.effective_base_url(config))
    }

    fn models_url(&self, config: &ProviderConfig) -> String {
        format!("{}/models", self.effective_base_url(config))
    }

    fn effective_base_url(&self, config: &ProviderConfig) -> String {
        match config.base_url.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value.trim_end_matches('/').to_string(),
            _ => self.base_url.clone(),
        }
    }

    fn resolve_api_key(&self, config: &ProviderConfig) -> Result<String, ProviderError> {
        let key = config.api_key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }

        if let Some(key) = std::env::var(CEREBRAS_API_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            return Ok(key);
        }

        Err(ProviderError::Authentication {
            request_id: None,
            message: format!(
                "Cerebras API key is required; supply it in the provider config or via {CEREBRAS_API_KEY_ENV}"
            ),
        })
    }

    fn validate_request(
        &self,
        request: &ChatRequest,
        streaming: bool,
    ) -> Result<ModelDescriptor, ProviderError> {
        let descriptor = catalog::find_model(&request.model).ok_or_else(|| {
            ProviderError::Validation {
                model: Some(request.model.clone()),
                message: "unsupported model identifier".to_string(),
            }
        })?;

        if !request.tools.is_empty() && !descriptor.supports_tool_calls {
            return Err(ProviderError::Validation {
                model: Some(request.model.clone()),
                message: "model does not support tool calls".to_string(),
            });
        }

        if streaming && !descriptor.supports_streaming {
            return Err(ProviderError::Validation {
                model: Some(request.model.clone()),
                message: "model does not support streaming".to_string(),
            });
        }

        Ok(descriptor)
    }

    // Rewrites raw error bodies into the provider's error-envelope message
    // where one is present. Classification is untouched.
    fn normalize_provider_error(error: ProviderError) -> ProviderError {
        match error {
            ProviderError::Authentication {
                request_id,
                message,
            } => ProviderError::Authentication {
                request_id,
                message: prettify_error_body(message),
            },
            ProviderError::RateLimit {
                model,
                request_id,
                retry_after,
                message,
            } => ProviderError::RateLimit {
                model,
                request_id,
                retry_after,
                message: prettify_error_body(message),
            },
            ProviderError::Upstream {
                model,
                request_id,
                status_code,
                message,
            } => ProviderError::Upstream {
                model,
                request_id,
                status_code,
                message: prettify_error_body(message),
            },
            other => other,
        }
    }
}

#[async_trait]
impl ProviderAdapter for CerebrasAdapter {
    fn list_models(&self) -> Vec<ModelDescriptor> {
        catalog::supported_models()
    }

    async fn validate_credentials(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        let api_key = self.resolve_api_key(config)?;
        let url = self.models_url(config);
        debug!(url, "validating provider credentials");

        let _: Value = self
            .transport
            .get_json(None, &url, &api_key)
            .await
            .map_err(Self::normalize_provider_error)?;

        Ok(())
    }

    async fn chat(
        &self,
        config: &ProviderConfig,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let api_key = self.resolve_api_key(config)?;
        self.validate_request(request, false)?;
        let body = translate::encode_chat_request(request, false)?;
        let url = self.chat_completions_url(config);
        debug!(model = %request.model, url, "invoking chat completion");

        let response_body: Value = self
            .transport
            .post_json(Some(&request.model), &url, &api_key, &body)
            .await
            .map_err(Self::normalize_provider_error)?;

        translate::decode_chat_response(&response_body)
    }

    async fn chat_stream(
        &self,
        config: &ProviderConfig,
        request: &ChatRequest,
    ) -> Result<ChatStream, ProviderError> {
        let api_key = self.resolve_api_key(config)?;
        self.validate_request(request, true)?;
        let body = translate::encode_chat_request(request, true)?;
        let url = self.chat_completions_url(config);
        debug!(model = %request.model, url, "invoking streaming chat completion");

        let response = self
            .transport
            .post_stream(Some(&request.model), &url, &api_key, &body)
            .await
            .map_err(Self::normalize_provider_error)?;

        Ok(stream::decode_chat_stream(response, request.model.clone()))
    }
}

fn normalize_base_url(base_url: impl Into<String>) -> Result<String, ConfigError> {
    let value = base_url.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(CEREBRAS_DEFAULT_BASE_URL.to_string());
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ConfigError::InvalidBaseUrl {
            reason: format!("expected an http(s) url, got {trimmed}"),
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

fn prettify_error_body(message: String) -> String {
    match parse_error_envelope(&message) {
        Some(envelope) => format_error_message(&envelope),
        None => message,
    }
}

#[cfg(test)]
mod tests;
