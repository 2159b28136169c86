//! Lilypad API client.
//!
//! [`LilypadClient`] wraps every Lilypad REST endpoint: chat completions
//! (blocking and streamed), model listings, image generation, job status and
//! cowsay jobs. The client only holds static configuration and is cheap to
//! clone; clones share one connection pool.
//!
//! # Example
//!
//! ```rust,ignore
//! use lilypad::{LilypadClient, Message};
//!
//! let client = LilypadClient::from_env()?;
//! let result = client
//!     .chat_completion(vec![Message::user("Hello!")], "llama3.1:8b", 0.6, false)
//!     .await?;
//! println!("{}", result.text());
//! ```

use std::path::Path;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::completion::{CompletionRequest, CompletionResult};
use crate::config::{API_KEY_ENV, BASE_URL_ENV, ClientConfig, LILYPAD_API_BASE_URL};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::streaming::{ByteStream, ChunkStream};

/// Longest prompt accepted by the image generation endpoint, in characters.
pub const MAX_IMAGE_PROMPT_CHARS: usize = 1000;

/// Client for the Lilypad inference API.
#[derive(Clone)]
pub struct LilypadClient {
    http_client: reqwest::Client,
    authorization: HeaderValue,
    base_url: Url,
}

impl std::fmt::Debug for LilypadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LilypadClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct CowsayRequest<'a> {
    message: &'a str,
}

/// `{"data": {"models": [...]}}` envelope used by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
struct ModelsEnvelope {
    #[serde(default)]
    data: ModelsData,
}

#[derive(Debug, Default, Deserialize)]
struct ModelsData {
    #[serde(default)]
    models: Vec<String>,
}

impl LilypadClient {
    /// Create a client with the given API key and the default base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the key cannot be used as a header value.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> LilypadClientBuilder {
        LilypadClientBuilder::default()
    }

    /// Create a client from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LILYPAD_API_KEY` (required): the API key
    /// - `LILYPAD_BASE_URL` (optional): custom base URL
    /// - `LILYPAD_TIMEOUT_SECS` (optional): request timeout
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the key is missing or a value is malformed.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::config(format!("{API_KEY_ENV} environment variable not set")))?;

        let mut builder = Self::builder()
            .api_key(api_key)
            .config(ClientConfig::from_env()?);

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            builder = builder.base_url(base_url);
        }

        builder.build()
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Headers attached to every request.
    #[must_use]
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Run a chat completion.
    ///
    /// With `stream` unset the parsed response body is returned unchanged as
    /// [`CompletionResult::Single`]. With `stream` set the response is decoded
    /// line by line into [`CompletionResult::Chunks`].
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedModel`] if `model` is not in the allow-list; no
    ///   request is made.
    /// - [`Error::Request`] on a non-2xx status.
    /// - [`Error::StreamDecode`] if a streamed line is not valid JSON.
    pub async fn chat_completion(
        &self,
        messages: Vec<Message>,
        model: &str,
        temperature: f64,
        stream: bool,
    ) -> Result<CompletionResult> {
        let request = CompletionRequest::new(model, messages)
            .with_temperature(temperature)
            .with_stream(stream);
        self.complete(request).await
    }

    /// Run a chat completion described by a [`CompletionRequest`].
    ///
    /// # Errors
    ///
    /// See [`LilypadClient::chat_completion`].
    #[instrument(skip(self, request), fields(model = %request.model, stream = request.stream))]
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult> {
        request.validate()?;

        if request.stream {
            let chunks = self.stream_validated(&request).await?.collect_chunks().await?;
            debug!(chunks = chunks.len(), "Streaming completion finished");
            return Ok(CompletionResult::Chunks(chunks));
        }

        debug!("Sending chat completion request");
        let response = self
            .send(self.request(Method::POST, &["chat", "completions"])?.json(&request))
            .await?;
        Ok(CompletionResult::Single(read_json(response).await?))
    }

    /// Open a streaming chat completion and return its chunks as they arrive.
    ///
    /// The request is sent in streaming mode whatever its `stream` field says.
    /// Dropping the returned stream closes the connection.
    ///
    /// # Errors
    ///
    /// Fails like [`LilypadClient::chat_completion`] before the first chunk;
    /// decoding errors are yielded by the stream itself.
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn stream_completion(
        &self,
        mut request: CompletionRequest,
    ) -> Result<ChunkStream<ByteStream>> {
        request.stream = true;
        request.validate()?;
        self.stream_validated(&request).await
    }

    async fn stream_validated(&self, request: &CompletionRequest) -> Result<ChunkStream<ByteStream>> {
        debug!("Sending streaming chat completion request");
        let response = self
            .send(self.request(Method::POST, &["chat", "completions"])?.json(request))
            .await?;
        let body: ByteStream = Box::pin(response.bytes_stream());
        Ok(ChunkStream::new(body))
    }

    /// List the chat models the server currently offers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] on a non-2xx status.
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let envelope: ModelsEnvelope = self.get_json(&["models"]).await?;
        Ok(envelope.data.models)
    }

    /// List the image generation models the server currently offers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] on a non-2xx status.
    #[instrument(skip(self))]
    pub async fn list_image_models(&self) -> Result<Vec<String>> {
        let envelope: ModelsEnvelope = self.get_json(&["image", "models"]).await?;
        Ok(envelope.data.models)
    }

    /// Generate an image and return its raw bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if the prompt is empty or longer than
    ///   [`MAX_IMAGE_PROMPT_CHARS`]; no request is made.
    /// - [`Error::Request`] on a non-2xx status.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn generate_image(&self, prompt: &str, model: &str) -> Result<Bytes> {
        validate_image_prompt(prompt)?;

        let response = self
            .send(
                self.request(Method::POST, &["image", "generate"])?
                    .json(&ImageRequest { prompt, model }),
            )
            .await?;
        let image = response.bytes().await?;
        debug!(bytes = image.len(), "Image generated");
        Ok(image)
    }

    /// Generate an image and write it to `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`LilypadClient::generate_image`], or with [`Error::Io`] if
    /// the file cannot be written.
    pub async fn generate_image_to_file(
        &self,
        prompt: &str,
        model: &str,
        path: impl AsRef<Path>,
    ) -> Result<Bytes> {
        let image = self.generate_image(prompt, model).await?;
        tokio::fs::write(path.as_ref(), &image).await?;
        Ok(image)
    }

    /// Fetch the status and details of a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty id and
    /// [`Error::Request`] on a non-2xx status.
    #[instrument(skip(self))]
    pub async fn job_status(&self, job_id: &str) -> Result<Value> {
        validate_job_id(job_id)?;
        self.get_json(&["jobs", job_id]).await
    }

    /// Start a cowsay job.
    ///
    /// The response includes the job id used by [`LilypadClient::cowsay_results`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] on a non-2xx status.
    #[instrument(skip(self, message))]
    pub async fn cowsay(&self, message: &str) -> Result<Value> {
        let response = self
            .send(self.request(Method::POST, &["cowsay"])?.json(&CowsayRequest { message }))
            .await?;
        read_json(response).await
    }

    /// Fetch the results of a cowsay job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty id and
    /// [`Error::Request`] on a non-2xx status.
    #[instrument(skip(self))]
    pub async fn cowsay_results(&self, job_id: &str) -> Result<Value> {
        validate_job_id(job_id)?;
        self.get_json(&["cowsay", job_id, "results"]).await
    }

    /// Resolve path segments against the base URL.
    ///
    /// Segments are percent-encoded, so ids cannot escape their position.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("base URL {} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        Ok(self
            .http_client
            .request(method, url)
            .headers(self.auth_headers()))
    }

    /// Send a request and turn non-2xx answers into [`Error::Request`].
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "Failed to read error response body");
                format!("failed to read response body: {e}")
            }
        };
        warn!(status = status.as_u16(), "Lilypad API error");
        Err(Error::request(status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = self.send(self.request(Method::GET, segments)?).await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

fn validate_image_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::invalid_request("image prompt must not be empty"));
    }
    let len = prompt.chars().count();
    if len > MAX_IMAGE_PROMPT_CHARS {
        return Err(Error::invalid_request(format!(
            "image prompt is {len} characters, the limit is {MAX_IMAGE_PROMPT_CHARS}"
        )));
    }
    Ok(())
}

fn validate_job_id(job_id: &str) -> Result<()> {
    if job_id.trim().is_empty() {
        return Err(Error::invalid_request("job id must not be empty"));
    }
    Ok(())
}

/// Builder for [`LilypadClient`].
#[derive(Debug, Default)]
pub struct LilypadClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    config: ClientConfig,
    http_client: Option<reqwest::Client>,
}

impl LilypadClientBuilder {
    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set a custom base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Replace the transport configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout in seconds.
    ///
    /// Default is no timeout.
    #[must_use]
    pub const fn timeout_secs(mut self, timeout: u64) -> Self {
        self.config.timeout_secs = Some(timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Use an existing HTTP client instead of building one.
    ///
    /// Timeout and user agent settings are ignored in that case.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the API key is missing or empty, or the
    /// base URL is not an absolute `http`/`https` URL.
    pub fn build(self) -> Result<LilypadClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::config("API key is required"))?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| Error::config(format!("API key is not a valid header value: {e}")))?;
        authorization.set_sensitive(true);

        let raw_url = self
            .base_url
            .unwrap_or_else(|| LILYPAD_API_BASE_URL.to_string());
        let base_url = parse_base_url(&raw_url)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => self.config.build_client()?,
        };

        Ok(LilypadClient {
            http_client,
            authorization,
            base_url,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::config(format!("invalid base URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::config(format!(
            "base URL {raw:?} must be an http or https URL"
        )));
    }
    Ok(url)
}
