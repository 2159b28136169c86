//! Supported model identifiers and task presets.
//!
//! The allow-list is declared exactly once, here. The client, the presets and
//! the CLI all validate against [`SUPPORTED_MODELS`].

use crate::error::{Error, Result};

/// Models accepted by the Lilypad chat completion endpoint.
pub const SUPPORTED_MODELS: &[&str] = &[
    "deepscaler:1.5b",
    "gemma3:4b",
    "llama3.1:8b",
    "llava:7b",
    "mistral:7b",
    "openthinker:7b",
    "phi4-mini:3.8b",
    "deepseek-r1:7b",
    "phi4:14b",
    "qwen2.5:7b",
    "qwen2.5-coder:7b",
];

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Check whether a model identifier is in the allow-list.
#[must_use]
pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// Validate a model identifier against the allow-list.
///
/// # Errors
///
/// Returns [`Error::UnsupportedModel`] if `model` is not supported.
pub fn ensure_supported(model: &str) -> Result<()> {
    if is_supported(model) {
        Ok(())
    } else {
        Err(Error::unsupported_model(model, SUPPORTED_MODELS))
    }
}

/// Task-oriented model profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPreset {
    /// Quick interactive responses.
    Fast,
    /// Large context windows.
    LongContext,
    /// Multimodal vision-language model.
    Vision,
    /// Code generation.
    Code,
}

impl ModelPreset {
    /// All presets, in declaration order.
    pub const ALL: [Self; 4] = [Self::Fast, Self::LongContext, Self::Vision, Self::Code];

    /// The model identifier for this preset.
    #[must_use]
    pub const fn model(self) -> &'static str {
        match self {
            Self::Fast => "llama3.1:8b",
            Self::LongContext => "phi4:14b",
            Self::Vision => "llava:7b",
            Self::Code => "qwen2.5-coder:7b",
        }
    }

    /// The sampling temperature for this preset.
    #[must_use]
    pub const fn temperature(self) -> f64 {
        match self {
            Self::Fast => 0.3,
            Self::LongContext => 0.1,
            Self::Vision => 0.2,
            Self::Code => 0.4,
        }
    }

    /// Completion token cap, where the preset sets one.
    #[must_use]
    pub const fn max_tokens(self) -> Option<u32> {
        match self {
            Self::LongContext => Some(16384),
            Self::Fast | Self::Vision | Self::Code => None,
        }
    }

    /// Short lowercase name, as accepted by [`ModelPreset::from_name`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::LongContext => "long-context",
            Self::Vision => "vision",
            Self::Code => "code",
        }
    }

    /// Look up a preset by its short name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl std::fmt::Display for ModelPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported("llama3.1:8b"));
        assert!(is_supported("qwen2.5-coder:7b"));
        assert!(!is_supported("gpt-4o"));
        assert!(!is_supported("LLAMA3.1:8B"));
        assert!(!is_supported(""));
    }

    #[test]
    fn test_ensure_supported_rejects_unknown() {
        assert!(ensure_supported(DEFAULT_MODEL).is_ok());

        match ensure_supported("claude-3-5-sonnet") {
            Err(Error::UnsupportedModel { model, supported }) => {
                assert_eq!(model, "claude-3-5-sonnet");
                assert_eq!(supported, SUPPORTED_MODELS);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_presets_use_supported_models() {
        for preset in ModelPreset::ALL {
            assert!(is_supported(preset.model()), "{preset} is not supported");
        }
    }

    #[test]
    fn test_preset_names_round_trip() {
        for preset in ModelPreset::ALL {
            assert_eq!(ModelPreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(ModelPreset::from_name("turbo"), None);
    }

    #[test]
    fn test_long_context_caps_tokens() {
        assert_eq!(ModelPreset::LongContext.max_tokens(), Some(16384));
        assert_eq!(ModelPreset::Fast.max_tokens(), None);
    }
}
