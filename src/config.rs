use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Clinic Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// ElevenLabs "Rachel".
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";
pub const DEFAULT_TTS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_EMAIL_BASE_URL: &str = "https://api.resend.com";

const DEFAULT_SUMMARY_TTL_SECS: u64 = 600;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinic_desk=info,tower_http=warn"
}

/// Text-to-speech provider settings.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub base_url: String,
    /// Conversational agent id handed to the UI for voice sessions.
    pub agent_id: Option<String>,
}

/// Email delivery provider settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from: String,
    pub base_url: String,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ClinicConfig {
    pub bind_addr: SocketAddr,
    /// `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    pub clinic_name: String,
    pub summary_ttl: Duration,
    pub tts: TtsConfig,
    pub email: EmailConfig,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_path: None,
            clinic_name: "Dr.'s Clinic".to_string(),
            summary_ttl: Duration::from_secs(DEFAULT_SUMMARY_TTL_SECS),
            tts: TtsConfig {
                api_key: None,
                voice_id: DEFAULT_VOICE_ID.to_string(),
                model_id: DEFAULT_TTS_MODEL.to_string(),
                base_url: DEFAULT_TTS_BASE_URL.to_string(),
                agent_id: None,
            },
            email: EmailConfig {
                api_key: None,
                from: "clinic@example.com".to_string(),
                base_url: DEFAULT_EMAIL_BASE_URL.to_string(),
            },
        }
    }
}

impl ClinicConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            bind_addr: parse_or(get("CLINIC_BIND_ADDR"), "CLINIC_BIND_ADDR", defaults.bind_addr),
            db_path: get("CLINIC_DB_PATH").map(PathBuf::from),
            clinic_name: get("CLINIC_NAME").unwrap_or(defaults.clinic_name),
            summary_ttl: Duration::from_secs(parse_or(
                get("SUMMARY_CACHE_TTL_SECS"),
                "SUMMARY_CACHE_TTL_SECS",
                DEFAULT_SUMMARY_TTL_SECS,
            )),
            tts: TtsConfig {
                api_key: get("ELEVENLABS_API_KEY"),
                voice_id: get("ELEVENLABS_VOICE_ID").unwrap_or(defaults.tts.voice_id),
                model_id: get("ELEVENLABS_MODEL_ID").unwrap_or(defaults.tts.model_id),
                base_url: get("ELEVENLABS_BASE_URL").unwrap_or(defaults.tts.base_url),
                agent_id: get("ELEVENLABS_AGENT_ID"),
            },
            email: EmailConfig {
                api_key: get("EMAIL_API_KEY"),
                from: get("EMAIL_FROM").unwrap_or(defaults.email.from),
                base_url: get("EMAIL_BASE_URL").unwrap_or(defaults.email.base_url),
            },
        }
    }
}

/// Parse `value`, falling back to `default` (with a warning) when it is malformed.
fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = value else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid setting: {e}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ClinicConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert!(config.db_path.is_none());
        assert_eq!(config.summary_ttl, Duration::from_secs(600));
        assert_eq!(config.tts.voice_id, DEFAULT_VOICE_ID);
        assert!(config.tts.api_key.is_none());
        assert_eq!(config.email.base_url, DEFAULT_EMAIL_BASE_URL);
    }

    #[test]
    fn reads_overrides() {
        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("CLINIC_BIND_ADDR", "0.0.0.0:8080"),
            ("CLINIC_DB_PATH", "/tmp/clinic.db"),
            ("SUMMARY_CACHE_TTL_SECS", "30"),
            ("ELEVENLABS_API_KEY", "xi-test"),
            ("EMAIL_FROM", "desk@clinic.in"),
        ]));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/clinic.db")));
        assert_eq!(config.summary_ttl, Duration::from_secs(30));
        assert_eq!(config.tts.api_key.as_deref(), Some("xi-test"));
        assert_eq!(config.email.from, "desk@clinic.in");
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("CLINIC_BIND_ADDR", "not-an-addr"),
            ("SUMMARY_CACHE_TTL_SECS", "ten"),
        ]));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.summary_ttl, Duration::from_secs(600));
    }

    #[test]
    fn blank_key_counts_as_unset() {
        let config = ClinicConfig::from_lookup(lookup_from(&[("ELEVENLABS_API_KEY", "  ")]));
        assert!(config.tts.api_key.is_none());
    }

    #[test]
    fn app_name_is_clinic_desk() {
        assert_eq!(APP_NAME, "Clinic Desk");
    }
}
