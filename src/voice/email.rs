use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{build_http_client, VoiceError};
use crate::config::EmailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers email. Returns the provider's message id.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<String, VoiceError>;
}

/// Resend-compatible transactional email API.
pub struct HttpMailer {
    api_key: Option<String>,
    from: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpMailer {
    /// Must be built outside an async context.
    pub fn new(config: &EmailConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: build_http_client()?,
        })
    }
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    id: String,
}

impl Mailer for HttpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<String, VoiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoiceError::NotConfigured("EMAIL_API_KEY"))?;

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to: [&email.to],
                subject: &email.subject,
                text: &email.body,
            })
            .send()
            .map_err(|e| VoiceError::from_reqwest("email provider", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VoiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendEmailResponse = response
            .json()
            .map_err(|e| VoiceError::Http(format!("Unexpected email provider response: {e}")))?;
        Ok(parsed.id)
    }
}

/// Mock mailer for tests: records every message it is asked to send.
pub struct MockMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failure: Option<(u16, String)>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for MockMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<String, VoiceError> {
        if let Some((status, body)) = &self.failure {
            return Err(VoiceError::Upstream {
                status: *status,
                body: body.clone(),
            });
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| VoiceError::Http("mock mailer lock poisoned".into()))?;
        sent.push(email.clone());
        Ok(format!("mock_{}", sent.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClinicConfig;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "kavitha.s@example.com".into(),
            subject: "Lab Results Follow-up".into(),
            body: "Your results are ready.".into(),
        }
    }

    #[test]
    fn http_mailer_requires_key() {
        let mailer = HttpMailer::new(&ClinicConfig::default().email).unwrap();
        assert!(matches!(
            mailer.send(&email()).unwrap_err(),
            VoiceError::NotConfigured("EMAIL_API_KEY")
        ));
    }

    #[test]
    fn request_body_shape() {
        let e = email();
        let json = serde_json::to_value(SendEmailRequest {
            from: "clinic@example.com",
            to: [&e.to],
            subject: &e.subject,
            text: &e.body,
        })
        .unwrap();
        assert_eq!(json["to"][0], "kavitha.s@example.com");
        assert_eq!(json["text"], "Your results are ready.");
    }

    #[test]
    fn mock_mailer_numbers_messages() {
        let mailer = MockMailer::new();
        assert_eq!(mailer.send(&email()).unwrap(), "mock_1");
        assert_eq!(mailer.send(&email()).unwrap(), "mock_2");
        assert_eq!(mailer.sent().len(), 2);

        let failing = MockMailer::failing(503, "down");
        assert!(failing.send(&email()).is_err());
        assert!(failing.sent().is_empty());
    }
}
