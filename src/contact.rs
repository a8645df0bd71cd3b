//! Contact form validation and submission to a mail relay.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ContactConfig;
use crate::error::FolioError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

const MIN_NAME_CHARS: usize = 2;
const MIN_MESSAGE_CHARS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub service: String,
    pub message: String,
}

impl ContactMessage {
    /// Trimmed copy of the message, or the first validation failure.
    pub fn validate(&self) -> Result<ContactMessage, FolioError> {
        let trimmed = ContactMessage {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            service: self.service.trim().to_string(),
            message: self.message.trim().to_string(),
        };
        if trimmed.name.is_empty()
            || trimmed.email.is_empty()
            || trimmed.service.is_empty()
            || trimmed.message.is_empty()
        {
            return Err(FolioError::Validation(
                "please fill in all required fields".to_string(),
            ));
        }
        if trimmed.name.chars().count() < MIN_NAME_CHARS {
            return Err(FolioError::Validation(
                "please enter a valid name".to_string(),
            ));
        }
        if !is_valid_email(&trimmed.email) {
            return Err(FolioError::Validation(
                "please enter a valid email address".to_string(),
            ));
        }
        if trimmed.message.chars().count() < MIN_MESSAGE_CHARS {
            return Err(FolioError::Validation(format!(
                "please enter a message with at least {MIN_MESSAGE_CHARS} characters"
            )));
        }
        Ok(trimmed)
    }

    pub fn subject(&self) -> String {
        format!("Portfolio Contact: {} - {}", self.service, self.name)
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

#[derive(Debug, Clone, Serialize)]
struct RelayPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_key: Option<&'a str>,
    name: &'a str,
    email: &'a str,
    service: &'a str,
    message: &'a str,
    subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactResult {
    pub sent: bool,
    pub message: String,
}

pub trait ContactRelay: Send + Sync {
    fn submit(&self, message: &ContactMessage) -> Result<ContactResult, FolioError>;
}

#[derive(Clone)]
pub struct ContactHttpClient {
    client: Client,
    config: ContactConfig,
}

impl ContactHttpClient {
    pub fn new(config: ContactConfig, timeout: Duration) -> Result<Self, FolioError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("folio/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FolioError::ContactRelay(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| FolioError::ContactRelay(err.to_string()))?;
        Ok(Self { client, config })
    }
}

impl ContactRelay for ContactHttpClient {
    fn submit(&self, message: &ContactMessage) -> Result<ContactResult, FolioError> {
        let message = message.validate()?;
        let payload = RelayPayload {
            access_key: self.config.access_key.as_deref(),
            name: &message.name,
            email: &message.email,
            service: &message.service,
            message: &message.message,
            subject: message.subject(),
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .map_err(|err| FolioError::ContactRelay(err.to_string()))?;
        let ok = response.status().is_success();
        let body: RelayResponse = response
            .json()
            .map_err(|err| FolioError::ContactRelay(format!("unexpected relay response: {err}")))?;
        interpret_response(ok, body)
    }
}

pub fn interpret_response(status_ok: bool, body: RelayResponse) -> Result<ContactResult, FolioError> {
    if status_ok && body.success {
        info!("contact message sent");
        return Ok(ContactResult {
            sent: true,
            message: body
                .message
                .unwrap_or_else(|| "Message sent successfully".to_string()),
        });
    }
    Err(FolioError::ContactRejected(body.message.unwrap_or_else(|| {
        "There was a problem sending your message. Please try again.".to_string()
    })))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn message() -> ContactMessage {
        ContactMessage {
            name: " Ada ".to_string(),
            email: "ada@example.com".to_string(),
            service: "Web App".to_string(),
            message: "I would like a dashboard built.".to_string(),
        }
    }

    #[test]
    fn valid_message_is_trimmed() {
        let checked = message().validate().unwrap();
        assert_eq!(checked.name, "Ada");
        assert_eq!(checked.subject(), "Portfolio Contact: Web App - Ada");
    }

    #[test]
    fn short_message_is_rejected() {
        let mut input = message();
        input.message = "hi".to_string();
        assert_matches!(input.validate(), Err(FolioError::Validation(_)));
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn relay_failure_keeps_its_message() {
        let body = RelayResponse {
            success: false,
            message: Some("Invalid access key".to_string()),
        };
        let err = interpret_response(true, body).unwrap_err();
        assert_matches!(err, FolioError::ContactRejected(message) if message == "Invalid access key");
    }
}
