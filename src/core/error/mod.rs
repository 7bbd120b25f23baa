use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid timeout: {timeout_ms} ms")]
    InvalidTimeout { timeout_ms: u64 },
    #[error("invalid base url: {reason}")]
    InvalidBaseUrl { reason: String },
    #[error("failed to build http client: {reason}")]
    HttpClient { reason: String },
}

/// Failure taxonomy for a single provider invocation.
///
/// Every failure is classified exactly once and surfaced to the host verbatim.
/// The adapter never retries; retry/backoff policy belongs to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error(
        "authentication failed{context}: {message}",
        context = format_context(None, .request_id.as_deref(), None, None)
    )]
    Authentication {
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "rate limited{context}: {message}",
        context = format_context(.model.as_deref(), .request_id.as_deref(), None, *.retry_after)
    )]
    RateLimit {
        model: Option<String>,
        request_id: Option<String>,
        retry_after: Option<u64>,
        message: String,
    },
    #[error(
        "connectivity error{context}: {message}",
        context = format_context(.model.as_deref(), None, None, None)
    )]
    Connectivity {
        model: Option<String>,
        message: String,
    },
    #[error(
        "upstream error{context}: {message}",
        context = format_context(.model.as_deref(), .request_id.as_deref(), *.status_code, None)
    )]
    Upstream {
        model: Option<String>,
        request_id: Option<String>,
        status_code: Option<u16>,
        message: String,
    },
    #[error(
        "protocol error{context}: {message}",
        context = format_context(.model.as_deref(), .request_id.as_deref(), None, None)
    )]
    Protocol {
        model: Option<String>,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "validation error{context}: {message}",
        context = format_context(.model.as_deref(), None, None, None)
    )]
    Validation {
        model: Option<String>,
        message: String,
    },
}

impl ProviderError {
    /// Classifies a non-2xx response status into the error taxonomy.
    ///
    /// 401/403 are credential rejections, 429 carries the provider's
    /// `Retry-After` hint verbatim, and everything else (including all 5xx)
    /// is an upstream failure tagged with the status code.
    pub fn classify_status(
        status_code: u16,
        retry_after: Option<u64>,
        model: Option<&str>,
        request_id: Option<String>,
        message: String,
    ) -> Self {
        match status_code {
            401 | 403 => Self::Authentication {
                request_id,
                message,
            },
            429 => Self::RateLimit {
                model: model.map(str::to_string),
                request_id,
                retry_after,
                message,
            },
            _ => Self::Upstream {
                model: model.map(str::to_string),
                request_id,
                status_code: Some(status_code),
                message,
            },
        }
    }
}

fn format_context(
    model: Option<&str>,
    request_id: Option<&str>,
    status_code: Option<u16>,
    retry_after: Option<u64>,
) -> String {
    let mut context = Vec::new();

    if let Some(model) = model {
        context.push(format!("model={model}"));
    }
    if let Some(request_id) = request_id {
        context.push(format!("request_id={request_id}"));
    }
    if let Some(status_code) = status_code {
        context.push(format!("status_code={status_code}"));
    }
    if let Some(retry_after) = retry_after {
        context.push(format!("retry_after={retry_after}s"));
    }

    if context.is_empty() {
        String::new()
    } else {
        format!(" [{}]", context.join(", "))
    }
}
