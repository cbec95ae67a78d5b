//! Crop disease diagnosis from photos, and the remedies that follow it.
//!
//! The agent first names the disease in a free-text `summary`. Asking for a
//! remedy usually returns every remedy at once as
//! `[{"diagnosis": {"Home Remedy": .., "Pesticide": .., "Fertilizer": ..}}]`;
//! those are kept so later remedy lookups need no request.

use std::fmt;
use std::str::FromStr;

use agrocast_agent::{
    decode_json_text, diagnosis_prompt, remedy_prompt, AgentClient, AgentReply,
};
use base64::{engine::general_purpose, Engine};
use parking_lot::Mutex;
use serde_json::{Map, Value};

pub const SUMMARY_FIELD: &str = "summary";
pub const DIAGNOSIS_KEY: &str = "diagnosis";
pub const NO_SUMMARY: &str = "No summary found";

/// Photos the agent expects for one diagnosis
pub const DIAGNOSIS_IMAGE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    HomeRemedy,
    Pesticide,
    Fertilizer,
}

impl Remedy {
    /// Word sent to the agent when asking for this remedy
    pub fn request_word(self) -> &'static str {
        match self {
            Self::HomeRemedy => "HomeRemedy",
            Self::Pesticide => "Pesticide",
            Self::Fertilizer => "Fertilizer",
        }
    }

    /// Key of this remedy in the agent's diagnosis record
    pub fn key(self) -> &'static str {
        match self {
            Self::HomeRemedy => "Home Remedy",
            Self::Pesticide => "Pesticide",
            Self::Fertilizer => "Fertilizer",
        }
    }
}

impl fmt::Display for Remedy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Remedy {
    type Err = String;

    /// Accepts any spelling that reduces to the letters of a remedy,
    /// e.g. `home-remedy`, `Home Remedy` or `HOME_REMEDY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letters: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match letters.as_str() {
            "homeremedy" => Ok(Self::HomeRemedy),
            "pesticide" => Ok(Self::Pesticide),
            "fertilizer" => Ok(Self::Fertilizer),
            _ => Err(format!(
                "unknown remedy '{}'; expected home-remedy, pesticide or fertilizer",
                s
            )),
        }
    }
}

/// Base64 form of a photo, as the agent expects it
pub fn encode_image(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// How the `summary` of a remedy reply was read.
#[derive(Debug, Clone, PartialEq)]
pub enum RemedySummary {
    /// Every remedy, keyed by [`Remedy::key`]
    Remedies(Map<String, Value>),
    /// Any other shape is shown as the agent wrote it
    Text(String),
}

impl RemedySummary {
    pub fn from_reply(reply: &AgentReply) -> Self {
        match reply.field(SUMMARY_FIELD) {
            Some(Value::String(summary)) if !summary.trim().is_empty() => Self::parse(summary),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                Self::Text(NO_SUMMARY.to_string())
            }
            Some(native) => Self::from_decoded(native.clone())
                .unwrap_or_else(|| Self::Text(native.to_string())),
        }
    }

    /// Read summary text that may hold encoded JSON.
    pub fn parse(summary: &str) -> Self {
        decode_json_text(summary)
            .ok()
            .and_then(Self::from_decoded)
            .unwrap_or_else(|| Self::Text(summary.to_string()))
    }

    fn from_decoded(value: Value) -> Option<Self> {
        let Value::Array(items) = value else {
            return None;
        };
        let Some(Value::Object(mut first)) = items.into_iter().next() else {
            return None;
        };
        match first.remove(DIAGNOSIS_KEY) {
            Some(Value::Object(remedies)) => Some(Self::Remedies(remedies)),
            _ => None,
        }
    }
}

/// `"<key>: <content>"`, or a note that the agent gave nothing for it
pub fn remedy_text(remedies: &Map<String, Value>, remedy: Remedy) -> String {
    let content = match remedies.get(remedy.key()) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };
    match content {
        Some(content) => format!("{}: {}", remedy.key(), content),
        None => format!("No information found for {}.", remedy.key()),
    }
}

fn summary_text(reply: &AgentReply) -> String {
    match reply.field(SUMMARY_FIELD) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => NO_SUMMARY.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Asks the diagnosis agent about a crop and remembers its remedies.
pub struct DiagnosisAdvisor {
    client: AgentClient,
    endpoint: String,
    // Filled by the first remedy reply in the expected shape
    remedies: Mutex<Option<Map<String, Value>>>,
}

impl DiagnosisAdvisor {
    pub fn new(client: AgentClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            remedies: Mutex::new(None),
        }
    }

    /// Name the disease shown in `images` (base64, see [`encode_image`]).
    ///
    /// Starts a fresh diagnosis, so remedies kept from an earlier one are
    /// dropped. `None` when the request fails.
    pub async fn diagnose(&self, crop: &str, images: Vec<String>) -> Option<String> {
        self.clear();
        tracing::info!("Diagnosing {} from {} image(s)", crop, images.len());

        match self
            .client
            .ask_with_images(&self.endpoint, &diagnosis_prompt(crop), images)
            .await
        {
            Ok(reply) => Some(summary_text(&reply)),
            Err(e) => {
                tracing::error!("Diagnosis failed: {}", e);
                None
            }
        }
    }

    /// Text for one remedy. Served from the kept remedies when present,
    /// otherwise fetched. `None` when the request fails.
    pub async fn remedy(&self, remedy: Remedy) -> Option<String> {
        let kept = self.remedies.lock().as_ref().map(|r| remedy_text(r, remedy));
        if let Some(text) = kept {
            tracing::debug!("Serving {} from kept remedies", remedy);
            return Some(text);
        }

        let prompt = remedy_prompt(remedy.request_word());
        let reply = match self.client.ask(&self.endpoint, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Remedy request failed: {}", e);
                return None;
            }
        };

        let text = match RemedySummary::from_reply(&reply) {
            RemedySummary::Remedies(remedies) => {
                let text = remedy_text(&remedies, remedy);
                *self.remedies.lock() = Some(remedies);
                text
            }
            RemedySummary::Text(text) => text,
        };
        Some(text)
    }

    pub fn has_remedies(&self) -> bool {
        self.remedies.lock().is_some()
    }

    /// Forget kept remedies, as when new photos are taken.
    pub fn clear(&self) {
        *self.remedies.lock() = None;
    }
}
