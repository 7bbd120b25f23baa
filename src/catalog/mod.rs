use crate::core::types::ModelDescriptor;

/// Static table of models served by the Cerebras inference API.
///
/// Built fresh on each call, requires no network access, and is the only
/// state shared across concurrent invocations (read-only).
pub fn supported_models() -> Vec<ModelDescriptor> {
    vec![
        model(
            "llama3.1-8b",
            "Llama 3.1 8B",
            Some(32_768),
            Some(8_192),
            true,
        ),
        model(
            "llama-3.3-70b",
            "Llama 3.3 70B",
            Some(65_536),
            Some(8_192),
            true,
        ),
        model(
            "llama-4-scout-17b-16e-instruct",
            "Llama 4 Scout 17B",
            Some(32_768),
            None,
            true,
        ),
        model("qwen-3-32b", "Qwen 3 32B", Some(65_536), None, true),
        model(
            "gpt-oss-120b",
            "GPT OSS 120B",
            Some(131_072),
            None,
            true,
        ),
    ]
}

/// Looks a model up by identifier. `None` means the host asked for an
/// identifier this adapter does not declare.
pub fn find_model(model_id: &str) -> Option<ModelDescriptor> {
    supported_models()
        .into_iter()
        .find(|descriptor| descriptor.model_id == model_id)
}

fn model(
    model_id: &str,
    display_name: &str,
    context_window: Option<u32>,
    max_output_tokens: Option<u32>,
    supports_tool_calls: bool,
) -> ModelDescriptor {
    ModelDescriptor {
        model_id: model_id.to_string(),
        display_name: display_name.to_string(),
        context_window,
        max_output_tokens,
        supports_streaming: true,
        supports_tool_calls,
    }
}
