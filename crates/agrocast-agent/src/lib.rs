//! Advisory agent client for Agrocast
//!
//! Wraps the agent's session envelope and the alert fields its replies carry.

pub mod client;
pub mod envelope;

pub use client::{decode_alert, decode_json_text, AgentClient, AgentError, AgentReply};
pub use envelope::{
    diagnosis_prompt, grower_prompt, question_prompt, remedy_prompt, weather_alert_prompt,
    AgentEnvelope, AgentMessage, AgentSession, MessagePart,
};
