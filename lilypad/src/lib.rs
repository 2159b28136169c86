#![cfg_attr(docsrs, feature(doc_cfg))]
//! Lilypad is a Rust client for the Lilypad inference marketplace.
//!
//! The centre of the crate is [`LilypadClient::chat_completion`], which runs
//! a chat completion either as a single blocking call or as a server-sent
//! event stream, and returns both through one [`CompletionResult`] type.
//! The client also covers model listing, image generation, job status and
//! cowsay jobs.
//!
//! ```rust,ignore
//! use lilypad::prelude::*;
//!
//! let client = LilypadClient::from_env()?;
//! let result = client
//!     .chat_completion(vec![Message::user("Tell me a joke")], "llama3.1:8b", 0.6, true)
//!     .await?;
//! for chunk in result.chunks().unwrap_or_default() {
//!     println!("{chunk}");
//! }
//! ```

pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod message;
pub mod models;
pub mod prelude;
pub mod streaming;

pub use client::{LilypadClient, LilypadClientBuilder};
pub use completion::{CompletionRequest, CompletionResult};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use models::{ModelPreset, SUPPORTED_MODELS};
pub use streaming::ChunkStream;
