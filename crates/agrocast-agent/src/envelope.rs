//! Request envelope understood by the advisory agent.

use serde::{Deserialize, Serialize};

/// Identifies the agent application, user and conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl AgentSession {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// Wrap a user prompt in this session's envelope
    pub fn envelope(&self, prompt: impl Into<String>) -> AgentEnvelope {
        self.envelope_with_images(prompt, Vec::new())
    }

    /// Envelope whose single part also carries base64-encoded images
    pub fn envelope_with_images(
        &self,
        prompt: impl Into<String>,
        images: Vec<String>,
    ) -> AgentEnvelope {
        AgentEnvelope {
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            new_message: AgentMessage::user_with_images(prompt, images),
        }
    }
}

/// `{appName, userId, sessionId, newMessage: {role, parts: [{text}]}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEnvelope {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: AgentMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    pub parts: Vec<MessagePart>,
}

impl AgentMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::user_with_images(text, Vec::new())
    }

    pub fn user_with_images(text: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![MessagePart {
                text: text.into(),
                images,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
    /// Base64 image data; omitted from the wire when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

fn location_sentence(latitude: f64, longitude: f64) -> String {
    format!("My location is latitude: {latitude} and longitude: {longitude}.")
}

/// Prompt asking for weather warnings at a coordinate
pub fn weather_alert_prompt(latitude: f64, longitude: f64) -> String {
    format!(
        "{} Provide the warning alerts for weather.",
        location_sentence(latitude, longitude)
    )
}

/// Prompt asking for soil, crop, grower service and fertilizer advice at a coordinate
pub fn grower_prompt(latitude: f64, longitude: f64) -> String {
    format!(
        "Provide a brief soil analysis, crop recommendations for large and small scale farmers, \
         general considerations, grower services and fertilizer recommendations based on my location. {}",
        location_sentence(latitude, longitude)
    )
}

/// Free-form question, with the location sentence appended when known
pub fn question_prompt(question: &str, coordinate: Option<(f64, f64)>) -> String {
    match coordinate {
        Some((latitude, longitude)) => {
            format!("{}. {}", question, location_sentence(latitude, longitude))
        }
        None => question.to_string(),
    }
}

/// Prompt asking which disease the photographed crop has
pub fn diagnosis_prompt(crop: &str) -> String {
    format!("Identify the disease for the crop - {}", crop)
}

/// Follow-up asking for one kind of remedy for the diagnosed disease
pub fn remedy_prompt(remedy: &str) -> String {
    format!("{}. For disease diagnosis.", remedy)
}
