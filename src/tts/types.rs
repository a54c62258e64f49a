//! Wire and result types for speech synthesis.

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque synthesis task identifier issued by the service.
///
/// Used verbatim for every status query of the task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Status of a synthesis task.
///
/// The service reports an open-ended set of strings; only `"completed"` is
/// terminal. Anything that is not `"pending"` lands in `Unknown` and is polled
/// exactly like `Pending`, including failure-looking values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Completed,
    Unknown(String),
}

impl TaskStatus {
    pub const COMPLETED: &'static str = "completed";
    pub const PENDING: &'static str = "pending";

    pub fn parse(s: &str) -> Self {
        match s {
            Self::COMPLETED => Self::Completed,
            Self::PENDING => Self::Pending,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => Self::PENDING,
            Self::Completed => Self::COMPLETED,
            Self::Unknown(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Timestamp granularity returned alongside the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampType {
    #[default]
    Word,
    Sentence,
}

/// Snapshot of a synthesis task as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SynthesisTask {
    pub task_id: TaskId,
    pub task_status: TaskStatus,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub request_characters: Option<u64>,
    #[serde(default, deserialize_with = "de_uris")]
    pub output_uri: Vec<String>,
    #[serde(default, deserialize_with = "de_uris")]
    pub timestamps_uri: Vec<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

impl SynthesisTask {
    /// First output location; present once the task has completed.
    pub fn output_uri(&self) -> Option<&str> {
        self.output_uri.first().map(String::as_str)
    }

    pub fn is_completed(&self) -> bool {
        self.task_status.is_completed()
    }
}

/// `{"SynthesisTask": {...}}` envelope used by create and status calls.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SynthesisTaskEnvelope {
    #[serde(rename = "SynthesisTask")]
    pub synthesis_task: SynthesisTask,
}

/// Request body for `POST /synthesisTasks`. Built once per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SynthesisRequest {
    pub text: Vec<String>,
    pub voice_id: String,
    pub bitrate: String,
    pub timestamp_type: TimestampType,
}

/// Result of a single-shot `POST /speech` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechResponse {
    #[serde(default, deserialize_with = "de_uris")]
    pub output_uri: Vec<String>,
    #[serde(default, deserialize_with = "de_uris")]
    pub timestamps_uri: Vec<String>,
    /// Remaining fields, kept as reported.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SpeechResponse {
    pub fn output_uri(&self) -> Option<&str> {
        self.output_uri.first().map(String::as_str)
    }
}

/// Audio output from the streaming endpoint.
#[derive(Debug, Clone)]
pub struct AudioOutput {
    pub data: Bytes,
    pub format: AudioFormat,
}

impl AudioOutput {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `data:<mime>;base64,<payload>` form, suitable for embedding.
    pub fn to_data_uri(&self) -> String {
        to_data_uri(self.format.mime_type(), &self.data)
    }
}

pub fn to_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// Supported audio formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Mulaw,
    Pcm,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Mulaw => "audio/basic",
            Self::Pcm => "audio/pcm",
        }
    }

    /// Format produced by a given stream codec.
    pub fn from_codec(codec: &str) -> Self {
        match codec.to_lowercase().as_str() {
            "pcm_mulaw" => Self::Mulaw,
            "pcm_s16le" => Self::Pcm,
            _ => Self::Mp3,
        }
    }

    /// Best guess from a response `Content-Type` header.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next()?.trim().to_lowercase();
        match mime.as_str() {
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/basic" | "audio/mulaw" | "audio/x-mulaw" => Some(Self::Mulaw),
            "audio/pcm" | "audio/l16" | "audio/wav" => Some(Self::Pcm),
            _ => None,
        }
    }
}

/// `RequestCharacters` is informational; anything that is not a whole
/// non-negative count reads as `None` instead of failing the envelope.
fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn de_uris<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Input>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Input::One(s)) if s.is_empty() => Vec::new(),
        Some(Input::One(s)) => vec![s],
        Some(Input::Many(v)) => v.into_iter().filter(|s| !s.is_empty()).collect(),
    })
}
