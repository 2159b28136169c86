//! Lilypad CLI - chat, models and jobs on the Lilypad inference API.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lilypad::config::{API_KEY_ENV, BASE_URL_ENV, LILYPAD_API_BASE_URL, TIMEOUT_ENV};
use lilypad::{LilypadClient, ModelPreset, SUPPORTED_MODELS};
use lilypad_cli::{ChatConfig, ChatSession};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Task-oriented model presets.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Preset {
    /// Small general model, low temperature
    Fast,
    /// Large context window
    LongContext,
    /// Image understanding
    Vision,
    /// Code generation
    Code,
}

impl From<Preset> for ModelPreset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self::Fast,
            Preset::LongContext => Self::LongContext,
            Preset::Vision => Self::Vision,
            Preset::Code => Self::Code,
        }
    }
}

/// Lilypad CLI - chat with models on the Lilypad network
#[derive(Parser, Debug)]
#[command(name = "lilypad-cli")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: String,

    /// API base URL
    #[arg(long, env = BASE_URL_ENV, default_value = LILYPAD_API_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds
    #[arg(long, env = TIMEOUT_ENV)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chat with a model; starts a REPL when no prompt is given
    Chat(ChatArgs),
    /// List available chat models
    Models,
    /// List available image models
    ImageModels,
    /// Generate an image and write it to a file
    Image(ImageArgs),
    /// Show the status of a job
    Job {
        /// Job identifier
        id: String,
    },
    /// Submit a cowsay job
    Cowsay {
        /// Message for the cow
        message: String,
    },
    /// Fetch the results of a cowsay job
    CowsayResults {
        /// Job identifier
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// One-shot prompt
    prompt: Option<String>,

    /// Model name
    #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(SUPPORTED_MODELS.iter().copied()))]
    model: Option<String>,

    /// Model preset; an explicit model or temperature wins over it
    #[arg(short, long, value_enum)]
    preset: Option<Preset>,

    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f64>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Wait for the whole response instead of streaming
    #[arg(long)]
    no_stream: bool,

    /// Print raw JSON responses
    #[arg(long)]
    raw: bool,
}

impl ChatArgs {
    fn config(&self) -> ChatConfig {
        let mut config = self
            .preset
            .map(|preset| ChatConfig::from_preset(preset.into()))
            .unwrap_or_default();
        if let Some(model) = &self.model {
            config.model.clone_from(model);
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        config.stream = !self.no_stream;
        config.raw = self.raw;
        config.system_prompt.clone_from(&self.system);
        config
    }
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Text prompt
    #[arg(short, long)]
    prompt: String,

    /// Image model name
    #[arg(short, long, default_value = "sdxl-turbo")]
    model: String,

    /// Output file
    #[arg(short, long, default_value = "image.png")]
    output: PathBuf,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lilypad=debug,lilypad_cli=debug")
    } else {
        EnvFilter::new("lilypad=warn,lilypad_cli=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut builder = LilypadClient::builder()
        .api_key(cli.api_key.as_str())
        .base_url(cli.base_url.as_str());
    if let Some(timeout) = cli.timeout {
        builder = builder.timeout_secs(timeout);
    }
    let client = builder.build().context("failed to build Lilypad client")?;

    match cli.command {
        Command::Chat(args) => {
            let mut session = ChatSession::new(client, args.config());
            match args.prompt.as_deref() {
                Some(prompt) => {
                    session.chat(prompt).await?;
                }
                None => session.run().await?,
            }
        }
        Command::Models => {
            for model in client.list_models().await? {
                println!("{model}");
            }
        }
        Command::ImageModels => {
            for model in client.list_image_models().await? {
                println!("{model}");
            }
        }
        Command::Image(args) => {
            let image = client
                .generate_image_to_file(&args.prompt, &args.model, &args.output)
                .await
                .with_context(|| format!("failed to write image to {}", args.output.display()))?;
            info!(path = %args.output.display(), bytes = image.len(), "Image saved");
        }
        Command::Job { id } => print_json(&client.job_status(&id).await?)?,
        Command::Cowsay { message } => print_json(&client.cowsay(&message).await?)?,
        Command::CowsayResults { id } => print_json(&client.cowsay_results(&id).await?)?,
    }

    Ok(())
}
