use async_trait::async_trait;

use crate::core::error::ProviderError;
use crate::core::types::{ChatRequest, ChatResponse, ChatStream, ModelDescriptor, ProviderConfig};

/// Host-facing capability contract of the provider adapter.
///
/// The host plugin runtime calls this on whatever task it pleases; the
/// adapter holds no shared mutable state and is safe to invoke concurrently
/// without internal locking.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Returns the static model table. Deterministic, no network access.
    fn list_models(&self) -> Vec<ModelDescriptor>;

    /// Issues one lightweight authenticated probe against the provider.
    ///
    /// Succeeds silently. An invalid or missing key surfaces as
    /// [`ProviderError::Authentication`]; an unreachable endpoint as
    /// [`ProviderError::Connectivity`].
    async fn validate_credentials(&self, config: &ProviderConfig) -> Result<(), ProviderError>;

    /// Executes a single non-streaming invocation. Exactly one outbound call;
    /// no partial result is ever returned from this path.
    async fn chat(
        &self,
        config: &ProviderConfig,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError>;

    /// Executes a single streaming invocation, forwarding each provider chunk
    /// as soon as it is decoded. A mid-stream disconnect ends the sequence
    /// with [`ProviderError::Upstream`] so the host can distinguish complete
    /// from cut short.
    async fn chat_stream(
        &self,
        config: &ProviderConfig,
        request: &ChatRequest,
    ) -> Result<ChatStream, ProviderError>;
}
