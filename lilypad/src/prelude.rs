//! Commonly used types.

pub use crate::client::LilypadClient;
pub use crate::completion::{CompletionRequest, CompletionResult};
pub use crate::error::{Error, Result};
pub use crate::message::{Message, Role};
pub use crate::models::ModelPreset;
