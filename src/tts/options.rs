//! Per-call synthesis options with documented defaults.
//!
//! Options are checked by `validate` before anything is sent, so a bad
//! bitrate or an out-of-range pitch never costs a round trip.

use super::types::{SynthesisRequest, TimestampType};
use crate::{Error, ErrorContext, Result};
use serde::Serialize;

pub const DEFAULT_VOICE_ID: &str = "Scarlett";
pub const DEFAULT_BITRATE: &str = "192k";
pub const DEFAULT_SPEECH_BITRATE: &str = "320k";
pub const DEFAULT_CODEC: &str = "libmp3lame";

pub const SUPPORTED_BITRATES: &[&str] = &["16k", "32k", "48k", "64k", "128k", "192k", "256k", "320k"];
pub const SUPPORTED_CODECS: &[&str] = &["libmp3lame", "pcm_mulaw", "pcm_s16le"];

const SPEED_RANGE: (f32, f32) = (-1.0, 1.0);
const PITCH_RANGE: (f32, f32) = (0.5, 1.5);
const TEMPERATURE_RANGE: (f32, f32) = (0.1, 0.8);

/// Options for `POST /synthesisTasks`.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    /// Defaults to `Scarlett`.
    pub voice_id: String,
    /// Defaults to `192k`.
    pub bitrate: String,
    /// Defaults to word-level timestamps.
    pub timestamp_type: TimestampType,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            bitrate: DEFAULT_BITRATE.to_string(),
            timestamp_type: TimestampType::Word,
        }
    }
}

impl SynthesisOptions {
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    pub fn with_timestamp_type(mut self, timestamp_type: TimestampType) -> Self {
        self.timestamp_type = timestamp_type;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_voice(&self.voice_id)?;
        validate_bitrate(&self.bitrate)
    }

    /// Validate and freeze into the request body.
    pub fn to_request(&self, text: &str) -> Result<SynthesisRequest> {
        validate_text(text)?;
        self.validate()?;
        Ok(SynthesisRequest {
            text: vec![text.to_string()],
            voice_id: self.voice_id.clone(),
            bitrate: self.bitrate.clone(),
            timestamp_type: self.timestamp_type,
        })
    }
}

/// Options for the single-shot `POST /speech` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub voice_id: String,
    /// Defaults to `320k`.
    pub bitrate: String,
    /// Defaults to sentence-level timestamps.
    pub timestamp_type: TimestampType,
    pub speed: f32,
    pub pitch: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            bitrate: DEFAULT_SPEECH_BITRATE.to_string(),
            timestamp_type: TimestampType::Sentence,
            speed: 0.0,
            pitch: 1.0,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpeechRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    bitrate: &'a str,
    output_format: &'static str,
    timestamp_type: TimestampType,
    #[serde(skip_serializing_if = "is_default_speed")]
    speed: f32,
    #[serde(skip_serializing_if = "is_default_pitch")]
    pitch: f32,
}

fn is_default_speed(speed: &f32) -> bool {
    *speed == 0.0
}

fn is_default_pitch(pitch: &f32) -> bool {
    *pitch == 1.0
}

impl SpeechOptions {
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_voice(&self.voice_id)?;
        validate_bitrate(&self.bitrate)?;
        validate_range("speed", self.speed, SPEED_RANGE)?;
        validate_range("pitch", self.pitch, PITCH_RANGE)
    }

    pub(crate) fn to_request<'a>(&'a self, text: &'a str) -> Result<SpeechRequest<'a>> {
        validate_text(text)?;
        self.validate()?;
        Ok(SpeechRequest {
            text,
            voice_id: &self.voice_id,
            bitrate: &self.bitrate,
            output_format: "uri",
            timestamp_type: self.timestamp_type,
            speed: self.speed,
            pitch: self.pitch,
        })
    }
}

/// Options for the low-latency `POST /stream` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    pub voice_id: String,
    pub bitrate: String,
    /// `0.0` is normal speed.
    pub speed: f32,
    pub pitch: f32,
    /// One of [`SUPPORTED_CODECS`]; defaults to `libmp3lame`.
    pub codec: String,
    pub temperature: f32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            bitrate: DEFAULT_BITRATE.to_string(),
            speed: 0.0,
            pitch: 1.0,
            codec: DEFAULT_CODEC.to_string(),
            temperature: 0.25,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StreamRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    bitrate: &'a str,
    speed: f32,
    pitch: f32,
    codec: &'a str,
    temperature: f32,
}

impl StreamOptions {
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_voice(&self.voice_id)?;
        validate_bitrate(&self.bitrate)?;
        validate_range("speed", self.speed, SPEED_RANGE)?;
        validate_range("pitch", self.pitch, PITCH_RANGE)?;
        validate_range("temperature", self.temperature, TEMPERATURE_RANGE)?;
        if !SUPPORTED_CODECS.contains(&self.codec.as_str()) {
            return Err(invalid(
                "codec",
                format!("unsupported codec '{}'", self.codec),
                SUPPORTED_CODECS.join(", "),
            ));
        }
        Ok(())
    }

    pub(crate) fn to_request<'a>(&'a self, text: &'a str) -> Result<StreamRequest<'a>> {
        validate_text(text)?;
        self.validate()?;
        Ok(StreamRequest {
            text,
            voice_id: &self.voice_id,
            bitrate: &self.bitrate,
            speed: self.speed,
            pitch: self.pitch,
            codec: &self.codec,
            temperature: self.temperature,
        })
    }
}

fn invalid(field: &str, msg: String, expected: String) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(format!("options.{}", field))
            .with_details(format!("expected: {}", expected)),
    )
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(invalid("text", "text must not be empty".into(), "non-blank text".into()));
    }
    Ok(())
}

fn validate_voice(voice_id: &str) -> Result<()> {
    if voice_id.trim().is_empty() {
        return Err(invalid("voice_id", "voice id must not be empty".into(), "a voice name".into()));
    }
    Ok(())
}

fn validate_bitrate(bitrate: &str) -> Result<()> {
    if !SUPPORTED_BITRATES.contains(&bitrate) {
        return Err(invalid(
            "bitrate",
            format!("unsupported bitrate '{}'", bitrate),
            SUPPORTED_BITRATES.join(", "),
        ));
    }
    Ok(())
}

fn validate_range(field: &str, value: f32, (min, max): (f32, f32)) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(
            field,
            format!("{} {} out of range", field, value),
            format!("{}..={}", min, max),
        ));
    }
    Ok(())
}
