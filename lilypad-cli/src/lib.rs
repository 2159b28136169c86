//! Command-line tools for the Lilypad inference API.
//!
//! The binary wraps [`lilypad::LilypadClient`]; this library holds the
//! interactive chat session so it can be reused and tested.

pub mod chat;

pub use chat::{ChatConfig, ChatSession};
