use std::sync::Mutex;

use serde::Serialize;

use super::{build_http_client, VoiceError};
use crate::config::TtsConfig;

/// Turns text into spoken audio (MP3 bytes).
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// ElevenLabs text-to-speech over its HTTP API.
pub struct ElevenLabsClient {
    api_key: Option<String>,
    voice_id: String,
    model_id: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ElevenLabsClient {
    /// Must be built outside an async context.
    pub fn new(config: &TtsConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            api_key: config.api_key.clone(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: build_http_client()?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl SpeechSynthesizer for ElevenLabsClient {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoiceError::NotConfigured("ELEVENLABS_API_KEY"))?;

        let body = TtsRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .map_err(|e| VoiceError::from_reqwest("ElevenLabs", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VoiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response
            .bytes()
            .map_err(|e| VoiceError::Http(e.to_string()))?;
        tracing::debug!(chars = text.len(), bytes = audio.len(), "Synthesized speech");
        Ok(audio.to_vec())
    }
}

/// Mock synthesizer for tests: returns fixed audio or a configured failure.
pub struct MockSpeechSynthesizer {
    audio: Vec<u8>,
    failure: Option<(u16, String)>,
    configured: bool,
    requests: Mutex<Vec<String>>,
}

impl MockSpeechSynthesizer {
    pub fn new(audio: &[u8]) -> Self {
        Self {
            audio: audio.to_vec(),
            failure: None,
            configured: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(b"")
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            ..Self::new(b"")
        }
    }

    /// Texts received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl SpeechSynthesizer for MockSpeechSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        if !self.configured {
            return Err(VoiceError::NotConfigured("ELEVENLABS_API_KEY"));
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(text.to_string());
        }
        match &self.failure {
            Some((status, body)) => Err(VoiceError::Upstream {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(self.audio.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClinicConfig;

    #[test]
    fn client_builds_voice_endpoint() {
        let mut config = ClinicConfig::default().tts;
        config.base_url = "https://tts.example.com/".into();
        config.voice_id = "voice123".into();
        let client = ElevenLabsClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "https://tts.example.com/v1/text-to-speech/voice123");
    }

    #[test]
    fn client_without_key_is_not_configured() {
        let client = ElevenLabsClient::new(&ClinicConfig::default().tts).unwrap();
        let err = client.synthesize("Hello").unwrap_err();
        assert!(matches!(err, VoiceError::NotConfigured("ELEVENLABS_API_KEY")));
    }

    #[test]
    fn request_body_carries_voice_settings() {
        let body = TtsRequest {
            text: "Good morning",
            model_id: "eleven_multilingual_v2",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }

    #[test]
    fn mock_records_requests_and_failures() {
        let mock = MockSpeechSynthesizer::new(b"ID3");
        assert_eq!(mock.synthesize("one").unwrap(), b"ID3".to_vec());
        assert_eq!(mock.requests(), vec!["one".to_string()]);

        let failing = MockSpeechSynthesizer::failing(429, "quota");
        assert!(matches!(
            failing.synthesize("two").unwrap_err(),
            VoiceError::Upstream { status: 429, .. }
        ));
    }
}
