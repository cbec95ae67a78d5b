//! Grower report against a mock agent.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use agrocast_advisory::{GrowerAdvisor, PresentationTree};
use agrocast_agent::{AgentClient, AgentSession};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client() -> AgentClient {
    AgentClient::new(
        AgentSession::new("farm_agent", "u-1", "s-1"),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_report_from_agent_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grower"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "soil_alert": "{\"location_output\": \"Pune\", \"government_schemes\": [\"PM-KISAN: Income support\"]}",
            "crop_alert": "{\"large_scale_farmers\": {\"1\": \"Sugarcane: High water need\"}}",
            "fertilizer_alert": "not json: plain advice"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let advisor = GrowerAdvisor::new(client(), format!("{}/grower", server.uri()));
    let report = advisor.report(18.52, 73.85).await;

    assert_eq!(report.cards.len(), 3);

    let soil = report.card("Soil Analysis").unwrap().content.as_section().unwrap();
    let labels: Vec<_> = soil
        .children
        .iter()
        .map(|c| c.as_section().unwrap().label.clone().unwrap())
        .collect();
    assert_eq!(labels, ["Location Output", "Government Schemes"]);

    let crop = report.card("Grower Crop Recommendation").unwrap();
    assert_eq!(crop.content.leaf_count(), 1);

    assert_eq!(
        report.card("Fertilizer Recommendation").unwrap().content,
        PresentationTree::leaf("not json", Some("plain advice".into()))
    );
}

#[tokio::test]
async fn test_prompt_names_the_coordinate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grower"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = req.body_json().unwrap();
            let text = body["newMessage"]["parts"][0]["text"].as_str().unwrap_or_default();
            if text.contains("latitude: 18.52 and longitude: 73.85") {
                ResponseTemplate::new(200).set_body_json(json!({"crop_alert": "ok"}))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .mount(&server)
        .await;

    let advisor = GrowerAdvisor::new(client(), format!("{}/grower", server.uri()));
    let report = advisor.report(18.52, 73.85).await;

    assert_eq!(
        report.card("Grower Crop Recommendation").unwrap().content,
        PresentationTree::leaf("ok", None)
    );
}

#[tokio::test]
async fn test_failed_request_gives_empty_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grower"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let advisor = GrowerAdvisor::new(client(), format!("{}/grower", server.uri()));
    assert!(advisor.report(18.52, 73.85).await.is_empty());
}

#[tokio::test]
async fn test_non_object_reply_gives_empty_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grower"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["unexpected"])))
        .mount(&server)
        .await;

    let advisor = GrowerAdvisor::new(client(), format!("{}/grower", server.uri()));
    assert!(advisor.report(18.52, 73.85).await.is_empty());
}
