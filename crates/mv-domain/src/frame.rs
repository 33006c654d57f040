//! Client/server WebSocket frame contract (spec §6).
//!
//! Mirrors the teacher's `node_protocol::WsMessage` tagged-enum
//! convention: `#[serde(tag = "event")]` so every frame on the wire
//! carries an explicit `event` discriminator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientFrame {
    Hello {
        user_id: String,
        #[serde(default)]
        source: Option<String>,
    },
    AudioChunk {
        session_id: String,
        /// Base64-encoded audio payload.
        data: String,
        sample_rate: u32,
        format: AudioFormat,
        is_final: bool,
    },
    Text {
        session_id: String,
        text: String,
    },
    Heartbeat {
        session_id: String,
    },
    Interrupt {
        session_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Settings {
        session_id: String,
        #[serde(default)]
        settings: HashMap<String, serde_json::Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Opus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerFrame {
    Connected {
        session_id: String,
    },
    Transcription {
        text: String,
    },
    VoiceResponse {
        text: String,
        sentiment: Sentiment,
        insights: Vec<String>,
    },
    TtsChunk {
        seq: u64,
        data: String,
        is_final: bool,
    },
    StreamingComplete,
    StreamingInterrupted,
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Recognized per-session settings (spec §6 "Recognized settings").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    #[serde(default)]
    pub voice_type: VoiceType,
    #[serde(default = "d_speech_rate")]
    pub speech_rate: f32,
    #[serde(default)]
    pub vad_sensitivity: VadSensitivity,
    #[serde(default = "d_true")]
    pub interruption_enabled: bool,
    #[serde(default)]
    pub use_audio_compression: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            voice_type: VoiceType::default(),
            speech_rate: d_speech_rate(),
            vad_sensitivity: VadSensitivity::default(),
            interruption_enabled: true,
            use_audio_compression: false,
        }
    }
}

impl SessionSettings {
    /// Apply a raw key/value settings map from a `Settings` frame,
    /// ignoring unrecognized keys and out-of-range values (best effort —
    /// malformed settings never fail the turn).
    pub fn apply(&mut self, raw: &HashMap<String, serde_json::Value>) {
        if let Some(v) = raw.get("voice_type").and_then(|v| v.as_str()) {
            if let Some(vt) = VoiceType::parse(v) {
                self.voice_type = vt;
            }
        }
        if let Some(v) = raw.get("speech_rate").and_then(|v| v.as_f64()) {
            let v = v as f32;
            if (0.5..=2.0).contains(&v) {
                self.speech_rate = v;
            }
        }
        if let Some(v) = raw.get("vad_sensitivity").and_then(|v| v.as_str()) {
            if let Some(vs) = VadSensitivity::parse(v) {
                self.vad_sensitivity = vs;
            }
        }
        if let Some(v) = raw.get("interruption_enabled").and_then(|v| v.as_bool()) {
            self.interruption_enabled = v;
        }
        if let Some(v) = raw.get("use_audio_compression").and_then(|v| v.as_bool()) {
            self.use_audio_compression = v;
        }
    }

    pub fn audio_format(&self) -> AudioFormat {
        if self.use_audio_compression {
            AudioFormat::Opus
        } else {
            AudioFormat::Wav
        }
    }
}

fn d_speech_rate() -> f32 {
    1.0
}
fn d_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    Calm,
    Casual,
    #[default]
    Professional,
    Energetic,
}

impl VoiceType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "calm" => Some(Self::Calm),
            "casual" => Some(Self::Casual),
            "professional" => Some(Self::Professional),
            "energetic" => Some(Self::Energetic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VadSensitivity {
    Low,
    #[default]
    Balanced,
    High,
}

impl VadSensitivity {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "balanced" => Some(Self::Balanced),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_apply_ignores_out_of_range_speech_rate() {
        let mut s = SessionSettings::default();
        let mut raw = HashMap::new();
        raw.insert("speech_rate".to_string(), serde_json::json!(5.0));
        s.apply(&raw);
        assert_eq!(s.speech_rate, 1.0);
    }

    #[test]
    fn settings_apply_accepts_valid_values() {
        let mut s = SessionSettings::default();
        let mut raw = HashMap::new();
        raw.insert("voice_type".to_string(), serde_json::json!("energetic"));
        raw.insert("speech_rate".to_string(), serde_json::json!(1.5));
        raw.insert("use_audio_compression".to_string(), serde_json::json!(true));
        s.apply(&raw);
        assert_eq!(s.voice_type, VoiceType::Energetic);
        assert_eq!(s.speech_rate, 1.5);
        assert_eq!(s.audio_format(), AudioFormat::Opus);
    }

    #[test]
    fn settings_apply_ignores_unknown_keys() {
        let mut s = SessionSettings::default();
        let mut raw = HashMap::new();
        raw.insert("bogus".to_string(), serde_json::json!("x"));
        s.apply(&raw);
        assert_eq!(s, SessionSettings::default());
    }

    #[test]
    fn client_frame_roundtrip() {
        let frame = ClientFrame::Text {
            session_id: "s1".into(),
            text: "hi".into(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"event\":\"text\""));
        let back: ClientFrame = serde_json::from_str(&json).unwrap();
        matches!(back, ClientFrame::Text { .. });
    }
}
