//! Text-to-speech: single-shot speech/stream calls and asynchronous synthesis tasks.

mod client;
mod options;
pub mod poller;
pub mod progress;
mod types;

pub use client::{SpeechClient, SpeechClientBuilder, SPEECH_PATH, STREAM_PATH};
pub use options::{
    SpeechOptions, StreamOptions, SynthesisOptions, DEFAULT_BITRATE, DEFAULT_CODEC,
    DEFAULT_SPEECH_BITRATE, DEFAULT_VOICE_ID, SUPPORTED_BITRATES, SUPPORTED_CODECS,
};
pub use poller::{TaskPoller, TaskService, SYNTHESIS_TASKS_PATH};
pub use progress::{
    FnProgressSink, InMemoryProgressSink, NoopProgressSink, PollProgress, ProgressSink,
};
pub use types::{
    to_data_uri, AudioFormat, AudioOutput, SpeechResponse, SynthesisRequest, SynthesisTask,
    TaskId, TaskStatus, TimestampType,
};
