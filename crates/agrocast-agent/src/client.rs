use std::sync::Arc;
use std::time::Duration;

use agrocast_core::{NetworkError, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::envelope::{AgentEnvelope, AgentSession};

/// Agent client errors
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Agent returned status {0}")]
    Status(u16),
    #[error("Agent reply is not a JSON object: {0}")]
    Decode(String),
    #[error("Invalid agent URL: {0}")]
    InvalidUrl(String),
}

/// A decoded agent reply: a JSON object whose fields carry advisory payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    fields: Map<String, Value>,
}

impl AgentReply {
    /// Interpret a raw reply body. Anything other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, AgentError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(AgentError::Decode(format!(
                "expected object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Raw field as the agent sent it (string-encoded JSON, native JSON or text)
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field decoded with [`decode_alert`]
    pub fn alert(&self, name: &str) -> Option<Value> {
        self.field(name).and_then(decode_alert)
    }
}

/// Decode an alert field that is either a JSON-encoded string or native JSON.
///
/// Empty, null and undecodable strings all yield `None`.
pub fn decode_alert(raw: &Value) -> Option<Value> {
    match raw {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match decode_json_text(text) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Failed to decode agent alert payload: {}", e);
                None
            }
        },
        other => Some(other.clone()),
    }
}

/// Parse JSON text with no nesting limit.
///
/// The recursion limit is lifted and the stack grows on demand, so payload
/// depth is bounded only by memory.
pub fn decode_json_text(text: &str) -> Result<Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HTTP client for the advisory agent.
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Arc<Client>,
    session: AgentSession,
}

impl AgentClient {
    pub fn new(session: AgentSession, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            session,
        })
    }

    pub fn session(&self) -> &AgentSession {
        &self.session
    }

    /// Send a prompt to `endpoint` and return the decoded reply.
    pub async fn ask(&self, endpoint: &str, prompt: &str) -> Result<AgentReply, AgentError> {
        self.send(endpoint, &self.session.envelope(prompt)).await
    }

    /// Send a prompt together with base64-encoded images.
    pub async fn ask_with_images(
        &self,
        endpoint: &str,
        prompt: &str,
        images: Vec<String>,
    ) -> Result<AgentReply, AgentError> {
        self.send(endpoint, &self.session.envelope_with_images(prompt, images))
            .await
    }

    async fn send(
        &self,
        endpoint: &str,
        envelope: &AgentEnvelope,
    ) -> Result<AgentReply, AgentError> {
        let url = Url::parse(endpoint).map_err(|e| AgentError::InvalidUrl(e.to_string()))?;

        tracing::debug!("Sending agent prompt to {}", url);

        let response = self
            .client
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| AgentError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Agent returned status {}", status);
            return Err(AgentError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Decode(e.to_string()))?;

        AgentReply::from_value(body)
    }
}
