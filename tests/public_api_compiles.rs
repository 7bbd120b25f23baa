use std::sync::Arc;

use cerebras_provider::core::error::{ConfigError, ProviderError};
use cerebras_provider::core::types::{ChatRequest, Message, MessageRole, ProviderConfig};
use cerebras_provider::{CerebrasAdapter, ProviderAdapter};

#[test]
fn test_public_api_compiles() {
    let adapter = CerebrasAdapter::new().expect("default adapter should build");
    let _adapter_as_trait: Arc<dyn ProviderAdapter> = Arc::new(adapter);

    let _config_error: ConfigError = CerebrasAdapter::with_base_url("ftp://nope")
        .err()
        .expect("non-http base url should be rejected");

    let models = cerebras_provider::catalog::supported_models();
    assert!(!models.is_empty());

    let config = ProviderConfig::new("test-key");
    let _ = format!("{config:?}");

    let request = ChatRequest::new(
        models[0].model_id.clone(),
        vec![Message {
            role: MessageRole::User,
            content: "hello".to_string(),
        }],
    );
    let _tokens: u64 = request.estimate_prompt_tokens();

    let _error: ProviderError = ProviderError::Validation {
        model: None,
        message: "shape check".to_string(),
    };
}
