//! Interactive chat sessions against the Lilypad API.
//!
//! Keeps the conversation history between turns and prints responses as
//! they arrive.

use std::io::{self, Write};

use futures::StreamExt;
use lilypad::completion::{self, CompletionRequest, DEFAULT_TEMPERATURE};
use lilypad::models::DEFAULT_MODEL;
use lilypad::{LilypadClient, Message, ModelPreset};

/// Settings for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,
    /// Stream responses token by token.
    pub stream: bool,
    /// Print raw JSON instead of assistant text.
    pub raw: bool,
    /// System prompt sent before the history.
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            stream: true,
            raw: false,
            system_prompt: None,
        }
    }
}

impl ChatConfig {
    /// Start from a preset's model, temperature and token cap.
    #[must_use]
    pub fn from_preset(preset: ModelPreset) -> Self {
        Self {
            model: preset.model().to_string(),
            temperature: preset.temperature(),
            max_tokens: preset.max_tokens(),
            ..Self::default()
        }
    }
}

/// A chat conversation with history.
#[derive(Debug)]
pub struct ChatSession {
    client: LilypadClient,
    config: ChatConfig,
    history: Vec<Message>,
}

impl ChatSession {
    /// Create a new session.
    #[must_use]
    pub const fn new(client: LilypadClient, config: ChatConfig) -> Self {
        Self {
            client,
            config,
            history: Vec::new(),
        }
    }

    /// Build the request for the next turn.
    #[must_use]
    pub fn build_request(&self, prompt: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.config.system_prompt {
            messages.push(Message::system(system.as_str()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(prompt));

        let mut request = CompletionRequest::new(self.config.model.as_str(), messages)
            .with_temperature(self.config.temperature)
            .with_stream(self.config.stream);
        request.max_tokens = self.config.max_tokens;
        request
    }

    /// Send one prompt, print the answer and record the exchange.
    ///
    /// # Errors
    ///
    /// Returns the client error; the history is left untouched in that case.
    pub async fn chat(&mut self, prompt: &str) -> lilypad::Result<String> {
        let request = self.build_request(prompt);
        let mut stdout = io::stdout();

        let response = if self.config.stream {
            let mut stream = self.client.stream_completion(request).await?;
            let mut response = String::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                if self.config.raw {
                    println!("{chunk}");
                }
                if let Some(text) = completion::delta_content(&chunk) {
                    if !self.config.raw {
                        print!("{text}");
                        stdout.flush().ok();
                    }
                    response.push_str(text);
                }
            }
            if !self.config.raw {
                println!();
            }
            response
        } else {
            let result = self.client.complete(request).await?;
            if self.config.raw {
                for value in result.clone().into_values() {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
            }
            let text = result.text();
            if !self.config.raw {
                println!("{text}");
            }
            text
        };

        self.record(prompt, &response);
        Ok(response)
    }

    /// Run the interactive REPL loop.
    ///
    /// # Errors
    ///
    /// Returns the first client error.
    pub async fn run(&mut self) -> lilypad::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        println!(
            "Lilypad chat with {} (type 'exit' to quit, 'clear' to reset history)",
            self.config.model
        );
        println!();

        loop {
            print!("> ");
            stdout.flush().ok();

            let mut input = String::new();
            if stdin.read_line(&mut input)? == 0 {
                break;
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match input {
                "exit" | "quit" => break,
                "clear" => {
                    self.clear_history();
                    println!("History cleared.");
                    continue;
                }
                _ => {}
            }

            println!();
            self.chat(input).await?;
            println!();
        }

        Ok(())
    }

    fn record(&mut self, prompt: &str, response: &str) {
        self.history.push(Message::user(prompt));
        self.history.push(Message::assistant(response));
    }

    /// Conversation so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Clear the conversation history.
    #[inline]
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
