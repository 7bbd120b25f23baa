use serde_json::{Map, Value, json};

use crate::core::error::ProviderError;
use crate::core::types::{
    AssistantMessage, ChatRequest, ChatResponse, FinishReason, StreamDelta, ToolCall,
    ToolCallDelta, ToolDefinition, Usage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CerebrasErrorEnvelope {
    pub message: String,
    pub error_type: Option<String>,
    pub code: Option<String>,
}

/// Fragments decoded from one streamed chunk. A chunk may carry any subset;
/// usage-only chunks (empty `choices`) are valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct StreamChunk {
    pub delta: Option<StreamDelta>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

pub(crate) fn encode_chat_request(
    req: &ChatRequest,
    stream: bool,
) -> Result<Value, ProviderError> {
    validate_model_id(req)?;
    validate_messages(req)?;
    validate_sampling_controls(req)?;
    validate_stop(req)?;

    let mut messages = Vec::with_capacity(req.messages.len());
    for message in &req.messages {
        messages.push(json!({
            "role": message.role.as_str(),
            "content": message.content,
        }));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(req.model.clone()));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert("stream".to_string(), Value::Bool(stream));

    if let Some(temperature) = req.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = req.top_p {
        body.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(max_tokens) = req.max_tokens {
        body.insert("max_tokens".to_string(), json!(max_tokens));
    }
    if !req.stop.is_empty() {
        body.insert("stop".to_string(), json!(req.stop));
    }
    if let Some(user) = &req.user {
        body.insert("user".to_string(), Value::String(user.clone()));
    }

    if !req.tools.is_empty() {
        let mut tools = Vec::with_capacity(req.tools.len());
        for tool in &req.tools {
            tools.push(map_tool_definition(tool, &req.model)?);
        }
        body.insert("tools".to_string(), Value::Array(tools));
        body.insert("tool_choice".to_string(), Value::String("auto".to_string()));
    }

    Ok(Value::Object(body))
}

pub(crate) fn decode_chat_response(body: &Value) -> Result<ChatResponse, ProviderError> {
    let root = body
        .as_object()
        .ok_or_else(|| protocol_error(None, "response payload must be a JSON object"))?;

    if let Some(envelope) = parse_error_value(root) {
        return Err(ProviderError::Upstream {
            model: None,
            request_id: None,
            status_code: None,
            message: format_error_message(&envelope),
        });
    }

    let model = root
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("<unknown-model>")
        .to_string();

    let choices = root
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| protocol_error(Some(&model), "response missing choices array"))?;

    let choice = choices
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| protocol_error(Some(&model), "response choices array must not be empty"))?;

    let message_obj = choice
        .get("message")
        .and_then(Value::as_object)
        .ok_or_else(|| protocol_error(Some(&model), "response missing choice message"))?;

    if let Some(role) = message_obj.get("role").and_then(Value::as_str) {
        if role != "assistant" {
            return Err(protocol_error(
                Some(&model),
                format!("response message role must be assistant, got {role}"),
            ));
        }
    }

    let content = match message_obj.get("content") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            return Err(protocol_error(
                Some(&model),
                "response message content must be a string or null",
            ));
        }
    };

    let tool_calls = decode_tool_calls(message_obj.get("tool_calls"), &model)?;
    let finish_reason = map_finish_reason(choice.get("finish_reason").and_then(Value::as_str));
    let usage = decode_usage(root.get("usage"), &model)?;

    Ok(ChatResponse {
        model,
        message: AssistantMessage {
            content,
            tool_calls,
        },
        finish_reason,
        usage,
    })
}

/// Decodes one SSE `data:` payload. `Ok(None)` means the chunk was not
/// decodable JSON and should be skipped, matching the provider's tolerance
/// for keep-alive noise between real chunks.
pub(crate) fn decode_stream_chunk(data: &str) -> Result<Option<StreamChunk>, ProviderError> {
    let Ok(payload) = serde_json::from_str::<Value>(data) else {
        return Ok(None);
    };

    let root = payload
        .as_object()
        .ok_or_else(|| protocol_error(None, "stream chunk must be a JSON object"))?;

    if let Some(envelope) = parse_error_value(root) {
        return Err(ProviderError::Upstream {
            model: None,
            request_id: None,
            status_code: None,
            message: format_error_message(&envelope),
        });
    }

    let mut chunk = StreamChunk::default();

    if let Some(usage) = root.get("usage") {
        if !usage.is_null() {
            chunk.usage = Some(decode_usage(Some(usage), "<stream>")?);
        }
    }

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(Value::as_object)
    else {
        // Usage-only chunks carry an empty choices array.
        return Ok(Some(chunk));
    };

    if let Some(finish) = choice.get("finish_reason").and_then(Value::as_str) {
        chunk.finish_reason = Some(map_finish_reason(Some(finish)));
    }

    if let Some(delta_obj) = choice.get("delta").and_then(Value::as_object) {
        let content = delta_obj
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);
        let tool_calls = decode_tool_call_deltas(delta_obj.get("tool_calls"))?;

        if content.is_some() || !tool_calls.is_empty() {
            chunk.delta = Some(StreamDelta {
                content,
                tool_calls,
            });
        }
    }

    Ok(Some(chunk))
}

pub(crate) fn parse_error_envelope(body: &str) -> Option<CerebrasErrorEnvelope> {
    let payload = serde_json::from_str::<Value>(body).ok()?;
    let root = payload.as_object()?;
    parse_error_value(root)
}

pub(crate) fn format_error_message(envelope: &CerebrasErrorEnvelope) -> String {
    let mut context = Vec::new();

    if let Some(error_type) = &envelope.error_type {
        context.push(format!("type={error_type}"));
    }
    if let Some(code) = &envelope.code {
        context.push(format!("code={code}"));
    }

    if context.is_empty() {
        format!("cerebras error: {}", envelope.message)
    } else {
        format!("cerebras error: {} [{}]", envelope.message, context.join(", "))
    }
}

fn validate_model_id(req: &ChatRequest) -> Result<(), ProviderError> {
    if req.model.trim().is_empty() {
        return Err(validation_error(None, "missing model id"));
    }

    Ok(())
}

fn validate_messages(req: &ChatRequest) -> Result<(), ProviderError> {
    if req.messages.is_empty() {
        return Err(validation_error(Some(&req.model), "empty messages"));
    }

    Ok(())
}

fn validate_sampling_controls(req: &ChatRequest) -> Result<(), ProviderError> {
    if let Some(temperature) = req.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(validation_error(
                Some(&req.model),
                format!("temperature must be in [0.0, 2.0], got {temperature}"),
            ));
        }
    }

    if let Some(top_p) = req.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            return Err(validation_error(
                Some(&req.model),
                format!("top_p must be in [0.0, 1.0], got {top_p}"),
            ));
        }
    }

    if req.max_tokens == Some(0) {
        return Err(validation_error(
            Some(&req.model),
            "max_tokens must be at least 1",
        ));
    }

    Ok(())
}

fn validate_stop(req: &ChatRequest) -> Result<(), ProviderError> {
    if req.stop.len() > 4 {
        return Err(validation_error(
            Some(&req.model),
            "stop supports at most 4 entries",
        ));
    }

    Ok(())
}

fn map_tool_definition(tool: &ToolDefinition, model_id: &str) -> Result<Value, ProviderError> {
    if !is_valid_tool_name(&tool.name) {
        return Err(validation_error(
            Some(model_id),
            format!(
                "tool '{}' name must match ^[A-Za-z0-9_-]{{1,64}}$",
                tool.name
            ),
        ));
    }

    if !tool.parameters_schema.is_object() {
        return Err(validation_error(
            Some(model_id),
            format!(
                "tool '{}' parameters_schema must be a JSON object",
                tool.name
            ),
        ));
    }

    let mut function = Map::new();
    function.insert("name".to_string(), Value::String(tool.name.clone()));
    if let Some(description) = &tool.description {
        function.insert(
            "description".to_string(),
            Value::String(description.clone()),
        );
    }
    function.insert("parameters".to_string(), tool.parameters_schema.clone());

    Ok(json!({
        "type": "function",
        "function": Value::Object(function),
    }))
}

fn is_valid_tool_name(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > 64 {
        return false;
    }
    name.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn decode_tool_calls(value: Option<&Value>, model: &str) -> Result<Vec<ToolCall>, ProviderError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    if value.is_null() {
        return Ok(Vec::new());
    }

    let calls = value
        .as_array()
        .ok_or_else(|| protocol_error(Some(model), "tool_calls must be an array"))?;

    let mut decoded = Vec::with_capacity(calls.len());
    for call in calls {
        let call_obj = call
            .as_object()
            .ok_or_else(|| protocol_error(Some(model), "tool_call entry must be an object"))?;

        let id = call_obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol_error(Some(model), "tool_call missing id"))?;

        let function = call_obj
            .get("function")
            .and_then(Value::as_object)
            .ok_or_else(|| protocol_error(Some(model), "tool_call missing function object"))?;
        let name = function
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol_error(Some(model), "tool_call function missing name"))?;
        let args_raw = function
            .get("arguments")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol_error(Some(model), "tool_call function missing arguments"))?;

        // Providers occasionally emit arguments that are not valid JSON;
        // carried through as a string rather than dropped.
        let arguments_json = serde_json::from_str::<Value>(args_raw)
            .unwrap_or_else(|_| Value::String(args_raw.to_string()));

        decoded.push(ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments_json,
        });
    }

    Ok(decoded)
}

fn decode_tool_call_deltas(value: Option<&Value>) -> Result<Vec<ToolCallDelta>, ProviderError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    let calls = value
        .as_array()
        .ok_or_else(|| protocol_error(None, "stream delta tool_calls must be an array"))?;

    let mut decoded = Vec::with_capacity(calls.len());
    for (position, call) in calls.iter().enumerate() {
        let call_obj = call.as_object().ok_or_else(|| {
            protocol_error(None, "stream delta tool_call entry must be an object")
        })?;

        let index = call_obj
            .get("index")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(position as u32);

        let function = call_obj.get("function").and_then(Value::as_object);

        decoded.push(ToolCallDelta {
            index,
            id: call_obj
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            name: function
                .and_then(|f| f.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            arguments_fragment: function
                .and_then(|f| f.get("arguments"))
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    Ok(decoded)
}

fn decode_usage(usage_value: Option<&Value>, model: &str) -> Result<Usage, ProviderError> {
    let Some(usage_value) = usage_value else {
        return Ok(Usage::default());
    };

    if usage_value.is_null() {
        return Ok(Usage::default());
    }

    let usage_obj = usage_value
        .as_object()
        .ok_or_else(|| protocol_error(Some(model), "usage must be an object or null"))?;

    Ok(Usage {
        prompt_tokens: usage_obj.get("prompt_tokens").and_then(number_to_u64),
        completion_tokens: usage_obj.get("completion_tokens").and_then(number_to_u64),
        total_tokens: usage_obj.get("total_tokens").and_then(number_to_u64),
    })
}

fn map_finish_reason(finish_reason: Option<&str>) -> FinishReason {
    match finish_reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}

fn parse_error_value(root: &Map<String, Value>) -> Option<CerebrasErrorEnvelope> {
    let error_obj = root.get("error")?.as_object()?;
    let message = error_obj
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)?;

    Some(CerebrasErrorEnvelope {
        message,
        error_type: error_obj
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string),
        code: error_obj
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn number_to_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_i64().and_then(|value| u64::try_from(value).ok()))
}

fn protocol_error(model: Option<&str>, message: impl Into<String>) -> ProviderError {
    ProviderError::Protocol {
        model: model.map(str::to_string),
        request_id: None,
        message: message.into(),
    }
}

fn validation_error(model: Option<&str>, message: impl Into<String>) -> ProviderError {
    ProviderError::Validation {
        model: model.map(str::to_string),
        message: message.into(),
    }
}
