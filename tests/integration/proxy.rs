//! Backend proxy calls over real HTTP.

use crate::integration::mock_server::MockServerFixture;
use mockito::Matcher;
use serde_json::json;
use vespa_knack::proxy::{AiQuery, EmailMessage, ProxyClient};
use vespa_knack::SessionContext;

fn proxy(fixture: &MockServerFixture) -> ProxyClient {
    let config = fixture.config();
    let session = SessionContext::shared(config.dispatch.clone());
    ProxyClient::new(&config, session).unwrap()
}

#[tokio::test]
async fn email_is_posted_without_platform_credentials() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/api/send-email")
        .match_header("X-Knack-REST-API-Key", Matcher::Missing)
        .match_body(Matcher::Json(json!({
            "to": ["staff@example.com"],
            "subject": "Welcome",
            "template": "staff_welcome",
            "data": {"name": "Jane"}
        })))
        .with_status(200)
        .with_body(r#"{"sent":true}"#)
        .create_async()
        .await;

    let msg = EmailMessage::new("staff@example.com", "Welcome")
        .template("staff_welcome", json!({"name": "Jane"}));
    let resp = proxy(&fixture).send_email(&msg).await.unwrap();

    assert_eq!(resp["sent"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn notify_swallows_proxy_failures() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json("POST", "/api/send-email", 502, r#"{"error":"bad gateway"}"#)
        .await;

    let delivered = proxy(&fixture)
        .notify(&EmailMessage::new("staff@example.com", "Report ready"))
        .await;

    assert!(!delivered);
}

#[tokio::test]
async fn dashboard_and_ai_queries_pass_through() {
    let mut fixture = MockServerFixture::new().await;
    let _dash = fixture
        .mock_json("POST", "/api/dashboard-data", 200, r#"{"cycles":[1,2,3]}"#)
        .await;
    let ai = fixture
        .server
        .mock("POST", "/api/dashboard-ai-query")
        .match_body(Matcher::PartialJson(json!({"question": "Which group improved most?"})))
        .with_status(200)
        .with_body(r#"{"answer":"Group B"}"#)
        .create_async()
        .await;

    let client = proxy(&fixture);
    let data = client.dashboard_data(&json!({"establishment": "e1"})).await.unwrap();
    assert_eq!(data["cycles"], json!([1, 2, 3]));

    let answer = client
        .ai_query(&AiQuery {
            question: "Which group improved most?".to_string(),
            context: json!({"cycle": 2}),
        })
        .await
        .unwrap();
    assert_eq!(answer["answer"], "Group B");
    ai.assert_async().await;
}
