//! Disease diagnosis and remedies against a mock agent.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use agrocast_advisory::{encode_image, DiagnosisAdvisor, Remedy, NO_SUMMARY};
use agrocast_agent::{AgentClient, AgentSession};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REMEDIES: &str = r#"[{"disease": "Late blight", "diagnosis": {
    "Home Remedy": "Remove infected leaves and avoid overhead watering",
    "Pesticide": "Mancozeb 75% WP, 2 g per litre",
    "Fertilizer": "Potash to strengthen the plants"
}}]"#;

fn advisor(server: &MockServer) -> DiagnosisAdvisor {
    let client = AgentClient::new(
        AgentSession::new("farm_agent", "u-1", "s-1"),
        Duration::from_secs(5),
    )
    .unwrap();
    DiagnosisAdvisor::new(client, format!("{}/diagnose", server.uri()))
}

async fn mount_remedies(server: &MockServer, summary: &str, expect: u64) {
    Mock::given(method("POST"))
        .and(path("/diagnose"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": summary})))
        .expect(expect)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_diagnose_sends_crop_and_images() {
    let server = MockServer::start().await;
    let images: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|photo| encode_image(photo.as_bytes()))
        .collect();

    Mock::given(method("POST"))
        .and(path("/diagnose"))
        .and(body_partial_json(json!({
            "newMessage": {
                "parts": [{
                    "text": "Identify the disease for the crop - Tomato",
                    "images": ["b25l", "dHdv", "dGhyZWU="]
                }]
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"summary": "Early blight detected"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let summary = advisor(&server).diagnose("Tomato", images).await;
    assert_eq!(summary.as_deref(), Some("Early blight detected"));
}

#[tokio::test]
async fn test_diagnose_without_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/diagnose"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let summary = advisor(&server).diagnose("Potato", Vec::new()).await;
    assert_eq!(summary.as_deref(), Some(NO_SUMMARY));
}

#[tokio::test]
async fn test_remedies_are_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/diagnose"))
        .and(body_partial_json(json!({
            "newMessage": {"parts": [{"text": "Pesticide. For disease diagnosis."}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": REMEDIES})))
        .expect(1)
        .mount(&server)
        .await;

    let advisor = advisor(&server);
    assert_eq!(
        advisor.remedy(Remedy::Pesticide).await.as_deref(),
        Some("Pesticide: Mancozeb 75% WP, 2 g per litre")
    );
    assert!(advisor.has_remedies());

    // Served from the kept record; the mock allows only one request
    assert_eq!(
        advisor.remedy(Remedy::HomeRemedy).await.as_deref(),
        Some("Home Remedy: Remove infected leaves and avoid overhead watering")
    );
}

#[tokio::test]
async fn test_plain_text_remedy_is_not_kept() {
    let server = MockServer::start().await;
    mount_remedies(&server, "Spray neem oil weekly", 2).await;

    let advisor = advisor(&server);
    assert_eq!(
        advisor.remedy(Remedy::HomeRemedy).await.as_deref(),
        Some("Spray neem oil weekly")
    );
    assert!(!advisor.has_remedies());
    assert_eq!(
        advisor.remedy(Remedy::Fertilizer).await.as_deref(),
        Some("Spray neem oil weekly")
    );
}

#[tokio::test]
async fn test_new_diagnosis_drops_kept_remedies() {
    let server = MockServer::start().await;
    mount_remedies(&server, REMEDIES, 3).await;

    let advisor = advisor(&server);
    advisor.remedy(Remedy::Fertilizer).await.unwrap();
    assert!(advisor.has_remedies());

    advisor.diagnose("Corn", Vec::new()).await.unwrap();
    assert!(!advisor.has_remedies());
    assert_eq!(
        advisor.remedy(Remedy::Fertilizer).await.as_deref(),
        Some("Fertilizer: Potash to strengthen the plants")
    );
}

#[tokio::test]
async fn test_failed_remedy_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/diagnose"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let advisor = advisor(&server);
    assert_eq!(advisor.remedy(Remedy::Pesticide).await, None);
    assert!(!advisor.has_remedies());
}
