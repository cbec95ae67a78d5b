//! Grower services report: soil, crop and fertilizer advice for a location.

use agrocast_agent::{grower_prompt, AgentClient, AgentReply};
use serde::Serialize;
use serde_json::Value;

use crate::normalize::{ColonSplit, ResponseNormalizer, TextParser};
use crate::tree::{Leaf, PresentationTree};

pub const SOIL_FIELD: &str = "soil_alert";
pub const CROP_FIELD: &str = "crop_alert";
pub const FERTILIZER_FIELD: &str = "fertilizer_alert";

struct CardSpec {
    field: &'static str,
    title: &'static str,
    fallback: &'static str,
}

const CARDS: [CardSpec; 3] = [
    CardSpec {
        field: SOIL_FIELD,
        title: "Soil Analysis",
        fallback: "Could not retrieve soil analysis data.",
    },
    CardSpec {
        field: CROP_FIELD,
        title: "Grower Crop Recommendation",
        fallback: "Could not retrieve crop recommendation data.",
    },
    CardSpec {
        field: FERTILIZER_FIELD,
        title: "Fertilizer Recommendation",
        fallback: "Could not retrieve fertilizer recommendation data.",
    },
];

/// One titled block of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowerCard {
    pub title: String,
    pub content: PresentationTree,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrowerReport {
    pub cards: Vec<GrowerCard>,
}

impl GrowerReport {
    /// Build the three cards from an agent reply.
    ///
    /// A missing, null or blank field becomes a fallback leaf for its card.
    pub fn from_reply<P: TextParser>(reply: &AgentReply, normalizer: &ResponseNormalizer<P>) -> Self {
        let cards = CARDS
            .iter()
            .map(|spec| {
                let content = match reply.field(spec.field) {
                    Some(raw) if has_content(raw) => normalizer.normalize(raw),
                    _ => {
                        tracing::warn!("Grower reply has no '{}' payload", spec.field);
                        PresentationTree::Leaf(Leaf::titled(spec.fallback))
                    }
                };
                GrowerCard {
                    title: spec.title.to_string(),
                    content,
                }
            })
            .collect();

        Self { cards }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card(&self, title: &str) -> Option<&GrowerCard> {
        self.cards.iter().find(|c| c.title == title)
    }
}

fn has_content(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Asks the grower agent for advice and normalizes its reply.
pub struct GrowerAdvisor<P = ColonSplit> {
    client: AgentClient,
    endpoint: String,
    normalizer: ResponseNormalizer<P>,
}

impl GrowerAdvisor<ColonSplit> {
    pub fn new(client: AgentClient, endpoint: impl Into<String>) -> Self {
        Self::with_normalizer(client, endpoint, ResponseNormalizer::default())
    }
}

impl<P: TextParser> GrowerAdvisor<P> {
    pub fn with_normalizer(
        client: AgentClient,
        endpoint: impl Into<String>,
        normalizer: ResponseNormalizer<P>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            normalizer,
        }
    }

    /// Report for a coordinate. A failed request yields an empty report.
    pub async fn report(&self, latitude: f64, longitude: f64) -> GrowerReport {
        let prompt = grower_prompt(latitude, longitude);
        match self.client.ask(&self.endpoint, &prompt).await {
            Ok(reply) => GrowerReport::from_reply(&reply, &self.normalizer),
            Err(e) => {
                tracing::error!("Failed to fetch grower services: {}", e);
                GrowerReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn report(body: Value) -> GrowerReport {
        let reply = AgentReply::from_value(body).unwrap();
        GrowerReport::from_reply(&reply, &ResponseNormalizer::<ColonSplit>::default())
    }

    #[test]
    fn test_three_cards_in_order() {
        let r = report(json!({
            "soil_alert": "{\"soil_type_detected\": \"Black cotton soil\"}",
            "crop_alert": {"1": "Soybean: Suits medium rainfall"},
            "fertilizer_alert": "Apply DAP at sowing"
        }));

        let titles: Vec<_> = r.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Soil Analysis", "Grower Crop Recommendation", "Fertilizer Recommendation"]
        );

        let soil = r.card("Soil Analysis").unwrap().content.as_section().unwrap();
        assert_eq!(
            soil.children[0].as_section().unwrap().label.as_deref(),
            Some("Soil Type Detected")
        );

        let crop = r.card("Grower Crop Recommendation").unwrap();
        assert_eq!(
            crop.content,
            PresentationTree::section(
                None,
                vec![PresentationTree::leaf("Soybean", Some("Suits medium rainfall".into()))],
                true
            )
        );

        assert_eq!(
            r.card("Fertilizer Recommendation").unwrap().content,
            PresentationTree::leaf("Apply DAP at sowing", None)
        );
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let r = report(json!({"soil_alert": null, "crop_alert": "  "}));
        assert_eq!(r.cards.len(), 3);
        assert_eq!(
            r.cards[0].content,
            PresentationTree::leaf("Could not retrieve soil analysis data.", None)
        );
        assert_eq!(
            r.cards[1].content,
            PresentationTree::leaf("Could not retrieve crop recommendation data.", None)
        );
        assert_eq!(
            r.cards[2].content,
            PresentationTree::leaf("Could not retrieve fertilizer recommendation data.", None)
        );
    }

    #[test]
    fn test_empty_report() {
        assert!(GrowerReport::default().is_empty());
        assert!(GrowerReport::default().card("Soil Analysis").is_none());
    }
}
