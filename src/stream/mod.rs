//! SSE decoding for streamed chat completions.
//!
//! Converts a `reqwest` response byte stream into [`StreamEvent`] items. Each
//! provider chunk is forwarded as soon as it is decoded; nothing is buffered.
//! The `[DONE]` marker terminates the sequence with one final
//! [`StreamEvent::Completed`] record, and a connection that ends without the
//! marker terminates it with [`ProviderError::Upstream`] instead, so the
//! consumer can always distinguish complete from cut short.

use std::pin::Pin;

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, Stream, StreamExt};

use crate::core::error::ProviderError;
use crate::core::types::{ChatStream, FinishReason, StreamEvent, Usage};
use crate::provider::translate;

const END_OF_STREAM_MARKER: &str = "[DONE]";

type SseEvents =
    Pin<Box<dyn Stream<Item = Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

struct DecodeState {
    events: SseEvents,
    model: String,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    finished: bool,
}

/// Decodes a streaming chat-completions response into a [`ChatStream`].
///
/// Dropping the returned stream drops the underlying response and releases
/// the connection, which is how the consumer cancels a generation.
pub fn decode_chat_stream(response: reqwest::Response, model: String) -> ChatStream {
    let events: SseEvents = Box::pin(response.bytes_stream().eventsource());

    let state = DecodeState {
        events,
        model,
        finish_reason: None,
        usage: None,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            match state.events.next().await {
                Some(Ok(event)) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        continue;
                    }

                    if data == END_OF_STREAM_MARKER {
                        state.finished = true;
                        let completed = StreamEvent::Completed {
                            finish_reason: state
                                .finish_reason
                                .take()
                                .unwrap_or(FinishReason::Other),
                            usage: state.usage.take().unwrap_or_default(),
                        };
                        return Some((Ok(completed), state));
                    }

                    match translate::decode_stream_chunk(data) {
                        Ok(Some(chunk)) => {
                            if let Some(finish_reason) = chunk.finish_reason {
                                state.finish_reason = Some(finish_reason);
                            }
                            if let Some(usage) = chunk.usage {
                                state.usage = Some(usage);
                            }
                            if let Some(delta) = chunk.delta {
                                return Some((Ok(StreamEvent::Delta(delta)), state));
                            }
                        }
                        Ok(None) => {}
                        Err(error) => {
                            state.finished = true;
                            return Some((Err(error), state));
                        }
                    }
                }
                Some(Err(error)) => {
                    state.finished = true;
                    let error = ProviderError::Upstream {
                        model: Some(state.model.clone()),
                        request_id: None,
                        status_code: None,
                        message: format!("stream dropped mid-response: {error}"),
                    };
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    let error = ProviderError::Upstream {
                        model: Some(state.model.clone()),
                        request_id: None,
                        status_code: None,
                        message: "connection closed before end-of-stream marker".to_string(),
                    };
                    return Some((Err(error), state));
                }
            }
        }
    }))
}
