//! Free-form questions answered by the advisory agent.

use agrocast_agent::{question_prompt, AgentClient};
use serde_json::Value;

pub const ANSWER_FIELD: &str = "answer";

/// Shown when the agent replies without an answer
pub const NO_RESPONSE: &str = "Sorry, I couldn't get a response.";
/// Shown when the request itself fails
pub const REQUEST_FAILED: &str = "Sorry, something went wrong.";

/// Puts a grower's questions to the agent.
pub struct QuestionAdvisor {
    client: AgentClient,
    endpoint: String,
}

impl QuestionAdvisor {
    pub fn new(client: AgentClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Answer to `question`, or `None` when it is blank and nothing was sent.
    ///
    /// The location sentence is appended when a coordinate is known. A failed
    /// request or an empty reply becomes an apology line, never an error.
    pub async fn answer(&self, question: &str, coordinate: Option<(f64, f64)>) -> Option<String> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let prompt = question_prompt(question, coordinate);
        let answer = match self.client.ask(&self.endpoint, &prompt).await {
            Ok(reply) => answer_text(reply.field(ANSWER_FIELD)).unwrap_or_else(|| {
                tracing::warn!("Agent reply has no '{}' field", ANSWER_FIELD);
                NO_RESPONSE.to_string()
            }),
            Err(e) => {
                tracing::error!("Question to agent failed: {}", e);
                REQUEST_FAILED.to_string()
            }
        };
        Some(answer)
    }
}

fn answer_text(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
