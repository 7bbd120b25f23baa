use super::*;
use crate::core::types::{ChatRequest, Message};

fn request_for(model: &str) -> ChatRequest {
    ChatRequest::new(model, vec![Message::user("hello")])
}

#[test]
fn test_normalize_base_url() {
    assert_eq!(
        normalize_base_url("").expect("empty falls back"),
        CEREBRAS_DEFAULT_BASE_URL
    );
    assert_eq!(
        normalize_base_url("https://api.cerebras.ai/v1/").expect("trailing slash"),
        "https://api.cerebras.ai/v1"
    );
    assert_eq!(
        normalize_base_url("http://127.0.0.1:8080").expect("http allowed"),
        "http://127.0.0.1:8080"
    );
    assert!(matches!(
        normalize_base_url("ftp://example.com"),
        Err(ConfigError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn test_list_models_matches_catalog() {
    let adapter = CerebrasAdapter::new().expect("build adapter");
    assert_eq!(adapter.list_models(), catalog::supported_models());
}

#[test]
fn test_effective_base_url_prefers_config_override() {
    let adapter = CerebrasAdapter::new().expect("build adapter");

    let mut config = ProviderConfig::new("test-key");
    assert_eq!(
        adapter.effective_base_url(&config),
        CEREBRAS_DEFAULT_BASE_URL
    );

    config.base_url = Some("http://127.0.0.1:9999/v1/".to_string());
    assert_eq!(adapter.effective_base_url(&config), "http://127.0.0.1:9999/v1");
    assert_eq!(
        adapter.chat_completions_url(&config),
        "http://127.0.0.1:9999/v1/chat/completions"
    );
    assert_eq!(adapter.models_url(&config), "http://127.0.0.1:9999/v1/models");

    // Blank overrides are ignored rather than producing a relative url.
    config.base_url = Some("   ".to_string());
    assert_eq!(
        adapter.effective_base_url(&config),
        CEREBRAS_DEFAULT_BASE_URL
    );
}

#[tokio::test]
async fn test_unknown_model_is_rejected_before_any_network_call() {
    let adapter = CerebrasAdapter::with_base_url("http://127.0.0.1:1")
        .expect("build adapter");
    let config = ProviderConfig::new("test-key");

    let error = adapter
        .chat(&config, &request_for("gpt-5-mini"))
        .await
        .expect_err("unknown model should be rejected");
    match error {
        ProviderError::Validation { model, message } => {
            assert_eq!(model.as_deref(), Some("gpt-5-mini"));
            assert_eq!(message, "unsupported model identifier");
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    let error = match adapter.chat_stream(&config, &request_for("gpt-5-mini")).await {
        Ok(_) => panic!("unknown model should be rejected for streaming too"),
        Err(error) => error,
    };
    assert!(matches!(error, ProviderError::Validation { .. }));
}

#[tokio::test]
async fn test_out_of_range_parameters_are_rejected_locally() {
    let transport =
        HttpTransport::with_client(reqwest::Client::new(), 5_000).expect("build transport");
    let adapter = CerebrasAdapter::with_transport("http://127.0.0.1:1", transport)
        .expect("build adapter");
    let config = ProviderConfig::new("test-key");

    let mut request = request_for("llama3.1-8b");
    request.temperature = Some(9.0);

    let error = adapter
        .chat(&config, &request)
        .await
        .expect_err("out-of-range temperature should be rejected");
    assert!(matches!(error, ProviderError::Validation { .. }));
}

#[tokio::test]
async fn test_missing_api_key_is_an_authentication_error() {
    // The env fallback has to be cleared so the config is the only source.
    unsafe { std::env::remove_var(CEREBRAS_API_KEY_ENV) };

    let adapter = CerebrasAdapter::new().expect("build adapter");
    let config = ProviderConfig::new("   ");

    let error = adapter
        .chat(&config, &request_for("llama3.1-8b"))
        .await
        .expect_err("missing key should be rejected");
    match error {
        ProviderError::Authentication { message, .. } => {
            assert!(message.contains("Cerebras API key is required"));
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
}
