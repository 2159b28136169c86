//! Chat completion request and result types.
//!
//! A completion call runs in one of two modes, and the result type records
//! which one: [`CompletionResult::Single`] holds the whole response body of a
//! blocking call, [`CompletionResult::Chunks`] holds the decoded events of a
//! streamed call in arrival order. Both payloads are passed through untouched.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::models::{self, ModelPreset};

/// Sampling temperature used when none is given.
pub const DEFAULT_TEMPERATURE: f64 = 0.6;

/// Body of a `POST /chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier, drawn from [`models::SUPPORTED_MODELS`].
    pub model: String,
    /// Conversation, oldest message first.
    pub messages: Vec<Message>,
    /// Sampling temperature. Not validated.
    pub temperature: f64,
    /// Whether the server should stream the response as server-sent events.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// Optional completion token cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a non-streaming request with the default temperature.
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            stream: false,
            max_tokens: None,
        }
    }

    /// Create a request configured from a [`ModelPreset`].
    #[must_use]
    pub fn from_preset(preset: ModelPreset, messages: Vec<Message>) -> Self {
        Self {
            model: preset.model().to_string(),
            messages,
            temperature: preset.temperature(),
            stream: false,
            max_tokens: preset.max_tokens(),
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Select streaming or single-response mode.
    #[must_use]
    pub const fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the completion token cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Check the request before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedModel`] for a model outside the allow-list
    /// and [`Error::InvalidRequest`] for an empty conversation.
    pub fn validate(&self) -> Result<()> {
        models::ensure_supported(&self.model)?;
        if self.messages.is_empty() {
            return Err(Error::invalid_request("messages must not be empty"));
        }
        Ok(())
    }
}

/// Outcome of a chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    /// The full response body of a non-streaming call.
    Single(Value),
    /// Decoded stream events, in arrival order.
    Chunks(Vec<Value>),
}

impl CompletionResult {
    /// Whether this result came from a streaming call.
    #[must_use]
    pub const fn is_streamed(&self) -> bool {
        matches!(self, Self::Chunks(_))
    }

    /// The response body of a non-streaming call.
    #[must_use]
    pub const fn single(&self) -> Option<&Value> {
        match self {
            Self::Single(value) => Some(value),
            Self::Chunks(_) => None,
        }
    }

    /// The chunks of a streaming call.
    #[must_use]
    pub fn chunks(&self) -> Option<&[Value]> {
        match self {
            Self::Single(_) => None,
            Self::Chunks(chunks) => Some(chunks),
        }
    }

    /// Convert into a list of JSON values.
    ///
    /// A single response becomes a one-element list.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Single(value) => vec![value],
            Self::Chunks(chunks) => chunks,
        }
    }

    /// Assistant text carried by the result.
    ///
    /// Reads `choices[0].message.content` from a single response and joins
    /// `choices[0].delta.content` across chunks. Missing fields contribute
    /// nothing.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Single(value) => message_content(value).unwrap_or_default().to_string(),
            Self::Chunks(chunks) => chunks.iter().filter_map(delta_content).collect(),
        }
    }
}

/// `choices[0].message.content` of a chat completion body.
#[must_use]
pub fn message_content(value: &Value) -> Option<&str> {
    value["choices"][0]["message"]["content"].as_str()
}

/// `choices[0].delta.content` of a chat completion chunk.
#[must_use]
pub fn delta_content(chunk: &Value) -> Option<&str> {
    chunk["choices"][0]["delta"]["content"].as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_stream_when_false() {
        let request = CompletionRequest::new("llama3.1:8b", vec![Message::user("Hi")]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama3.1:8b",
                "messages": [{"role": "user", "content": "Hi"}],
                "temperature": 0.6
            })
        );
    }

    #[test]
    fn test_request_sets_stream_when_true() {
        let request = CompletionRequest::new("llama3.1:8b", vec![Message::user("Hi")])
            .with_stream(true)
            .with_temperature(0.0);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["temperature"], json!(0.0));
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_from_preset() {
        let request = CompletionRequest::from_preset(ModelPreset::LongContext, vec![]);
        assert_eq!(request.model, "phi4:14b");
        assert_eq!(request.max_tokens, Some(16384));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["max_tokens"], json!(16384));
    }

    #[test]
    fn test_validate() {
        let ok = CompletionRequest::new("mistral:7b", vec![Message::user("Hi")]);
        assert!(ok.validate().is_ok());

        let bad_model = CompletionRequest::new("gpt-4o", vec![Message::user("Hi")]);
        assert!(matches!(
            bad_model.validate(),
            Err(Error::UnsupportedModel { .. })
        ));

        let empty = CompletionRequest::new("mistral:7b", vec![]);
        assert!(matches!(empty.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_model_checked_before_messages() {
        let request = CompletionRequest::new("gpt-4o", vec![]);
        assert!(matches!(
            request.validate(),
            Err(Error::UnsupportedModel { .. })
        ));
    }

    #[test]
    fn test_single_text() {
        let result = CompletionResult::Single(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello there"}}]
        }));
        assert!(!result.is_streamed());
        assert_eq!(result.text(), "Hello there");
        assert!(result.chunks().is_none());
    }

    #[test]
    fn test_chunks_text_skips_missing_deltas() {
        let result = CompletionResult::Chunks(vec![
            json!({"choices": [{"delta": {"role": "assistant"}}]}),
            json!({"choices": [{"delta": {"content": "Hel"}}]}),
            json!({"choices": [{"delta": {"content": "lo"}}]}),
            json!({"choices": [{"delta": {}, "finish_reason": "stop"}]}),
        ]);
        assert!(result.is_streamed());
        assert_eq!(result.text(), "Hello");
        assert_eq!(result.chunks().map(<[Value]>::len), Some(4));
    }

    #[test]
    fn test_into_values() {
        let single = CompletionResult::Single(json!({"id": 1}));
        assert_eq!(single.into_values(), vec![json!({"id": 1})]);

        let chunks = CompletionResult::Chunks(vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(chunks.into_values().len(), 2);
    }
}
