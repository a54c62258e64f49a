//! # unreal-speech
//!
//! Async client for the Unreal Speech text-to-speech API.
//!
//! ## Overview
//!
//! Three ways to get audio out of the service:
//!
//! - **Stream** (`POST /stream`): low-latency, returns audio bytes directly.
//! - **Speech** (`POST /speech`): single request, returns output URIs.
//! - **Synthesis tasks** (`POST /synthesisTasks`): long texts; the service
//!   returns a task id which is polled until the audio is ready.
//!
//! Task polling is bounded: at most [`config::DEFAULT_POLL_MAX_ATTEMPTS`]
//! status queries, [`config::DEFAULT_POLL_INTERVAL_MS`] apart. Only the
//! `completed` status ends the wait early; a transport failure on any query
//! ends it with that error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unreal_speech::{SpeechClient, SynthesisOptions};
//!
//! #[tokio::main]
//! async fn main() -> unreal_speech::Result<()> {
//!     let client = SpeechClient::builder()
//!         .api_key("your-api-key")
//!         .build()?;
//!
//!     let task_id = client
//!         .create_task("Hello from Rust", &SynthesisOptions::default())
//!         .await?;
//!     let task = client.await_completion(&task_id).await?;
//!     println!("audio at {:?}", task.output_uri());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | Authenticated HTTP executor and response gate |
//! | [`tts`] | Speech client, options, task poller, progress sinks |
//! | [`config`] | Client configuration (defaults, YAML, environment) |
//! | [`session`] | Observable request state for front ends |

pub mod config;
pub mod session;
pub mod transport;
pub mod tts;

pub use config::{ClientConfig, PollConfig};
pub use session::{RequestState, SessionSnapshot, SessionStatus, SpeechSession};
pub use tts::{
    AudioFormat, AudioOutput, SpeechClient, SpeechClientBuilder, SpeechOptions, SpeechResponse,
    StreamOptions, SynthesisOptions, SynthesisTask, TaskId, TaskStatus, TimestampType,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
