//! Speech client: single-shot speech and stream calls plus the synthesis task lifecycle.

use super::options::{SpeechOptions, StreamOptions, SynthesisOptions};
use super::poller::TaskPoller;
use super::progress::{noop_sink, ProgressSink};
use super::types::{AudioFormat, AudioOutput, SpeechResponse, SynthesisTask, TaskId};
use crate::config::{ClientConfig, PollConfig};
use crate::transport::{HttpTransport, TransportError};
use crate::{BoxStream, Error, ErrorContext, Result};
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::debug;

pub const SPEECH_PATH: &str = "/speech";
pub const STREAM_PATH: &str = "/stream";

/// Client for the text-to-speech service.
///
/// Cheap to share behind an `Arc`; the only state is the HTTP client and the
/// read-only bearer token.
pub struct SpeechClient {
    transport: Arc<HttpTransport>,
    poller: TaskPoller<Arc<HttpTransport>>,
}

impl SpeechClient {
    pub fn builder() -> SpeechClientBuilder {
        SpeechClientBuilder::new()
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::with_sink(config, noop_sink())
    }

    fn with_sink(config: &ClientConfig, progress: Arc<dyn ProgressSink>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let poller =
            TaskPoller::new(Arc::clone(&transport), config.poll).with_progress_sink(progress);
        Ok(Self { transport, poller })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn poll_config(&self) -> &PollConfig {
        self.poller.config()
    }

    /// Submit a synthesis task and return its id without waiting.
    pub async fn create_task(&self, text: &str, options: &SynthesisOptions) -> Result<TaskId> {
        let request = options.to_request(text)?;
        self.poller.create_task(&request).await
    }

    /// Current snapshot of a task; a single query.
    pub async fn fetch_task(&self, task_id: &TaskId) -> Result<SynthesisTask> {
        self.poller.fetch_status(task_id).await
    }

    /// Poll a task until it completes or the attempt budget runs out.
    pub async fn await_completion(&self, task_id: &TaskId) -> Result<SynthesisTask> {
        self.poller.await_completion(task_id).await
    }

    /// Create a task and wait for it to complete.
    pub async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<SynthesisTask> {
        let request = options.to_request(text)?;
        self.poller.run(&request).await
    }

    /// Single-shot synthesis returning output locations.
    pub async fn speech(&self, text: &str, options: &SpeechOptions) -> Result<SpeechResponse> {
        let body = options.to_request(text)?;
        let response = self.transport.post(SPEECH_PATH, &body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::malformed_with_context(
                format!("unreadable speech response: {}", e),
                ErrorContext::new().with_source("speech"),
            )
        })
    }

    /// Low-latency synthesis returning the whole audio body.
    pub async fn stream(&self, text: &str, options: &StreamOptions) -> Result<AudioOutput> {
        let body = options.to_request(text)?;
        let response = self.transport.post(STREAM_PATH, &body).await?;
        let format = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(AudioFormat::from_content_type)
            .unwrap_or_else(|| AudioFormat::from_codec(&options.codec));
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        debug!(bytes = data.len(), ?format, "stream audio received");
        Ok(AudioOutput { data, format })
    }

    /// Like [`stream`](Self::stream) but yields audio chunks as they arrive.
    pub async fn stream_chunks(
        &self,
        text: &str,
        options: &StreamOptions,
    ) -> Result<BoxStream<'static, bytes::Bytes>> {
        let body = options.to_request(text)?;
        let response = self.transport.post(STREAM_PATH, &body).await?;
        let chunks = response
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(chunks))
    }
}

pub struct SpeechClientBuilder {
    config: Option<ClientConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    proxy_url: Option<String>,
    poll: Option<PollConfig>,
    progress: Arc<dyn ProgressSink>,
}

impl SpeechClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            api_key: None,
            base_url: None,
            timeout_secs: None,
            proxy_url: None,
            poll: None,
            progress: noop_sink(),
        }
    }

    /// Start from a loaded configuration instead of the defaults.
    /// Environment variables and explicit builder calls still apply on top.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    pub fn poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Resolved configuration, without building the HTTP client.
    pub fn resolve(&self) -> ClientConfig {
        let mut cfg = self.config.clone().unwrap_or_default().with_env_overrides();
        if let Some(key) = &self.api_key {
            cfg.api_key = Some(key.clone());
        }
        if let Some(url) = &self.base_url {
            cfg.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout_secs = secs;
        }
        if let Some(proxy) = &self.proxy_url {
            cfg.proxy_url = Some(proxy.clone());
        }
        if let Some(poll) = self.poll {
            cfg.poll = poll;
        }
        cfg
    }

    pub fn build(self) -> Result<SpeechClient> {
        let cfg = self.resolve();
        SpeechClient::with_sink(&cfg, self.progress)
    }
}

impl Default for SpeechClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
