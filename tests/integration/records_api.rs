//! Records API calls over real HTTP.

use crate::integration::mock_server::{MockServerFixture, API_KEY, APP_ID};
use mockito::Matcher;
use serde_json::json;
use vespa_knack::records::{Filter, RecordQuery};
use vespa_knack::resilience::RetryPolicy;
use vespa_knack::{Error, KnackClient};

#[tokio::test]
async fn get_record_sends_credentials_and_caches_the_result() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/objects/object_6/records/r1")
        .match_header("X-Knack-Application-Id", APP_ID)
        .match_header("X-Knack-REST-API-Key", API_KEY)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"r1","field_90":"Jane Doe"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = fixture.client();
    let first = client.get_record("object_6", "r1").await.unwrap();
    let second = client.get_record("object_6", "r1").await.unwrap();

    assert_eq!(first.text("field_90"), "Jane Doe");
    assert_eq!(first, second);
    mock.assert_async().await;
}

#[tokio::test]
async fn user_token_is_sent_as_authorization() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/pages/scene_1/views/view_2/records")
        .match_query(Matcher::Any)
        .match_header("Authorization", "user-token-123")
        .with_status(200)
        .with_body(r#"{"records":[],"total_pages":1,"current_page":1,"total_records":0}"#)
        .create_async()
        .await;

    let mut config = fixture.config();
    config.user_token = Some("user-token-123".to_string());
    let client = KnackClient::new(config).unwrap();
    let page = client
        .view_records("scene_1", "view_2", &RecordQuery::new())
        .await
        .unwrap();

    assert!(page.records.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn filters_are_sent_as_a_json_query_parameter() {
    let mut fixture = MockServerFixture::new().await;
    let filter = Filter::and().eq("field_73", "Active");
    let mock = fixture
        .server
        .mock("GET", "/objects/object_3/records")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("rows_per_page".into(), "100".into()),
            Matcher::UrlEncoded("filters".into(), filter.to_query_value().unwrap()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"records":[{"id":"a"},{"id":"b"}],"total_pages":"1","current_page":1,"total_records":"2"}"#,
        )
        .create_async()
        .await;

    let page = fixture
        .client()
        .list_records("object_3", &RecordQuery::new().filter(filter))
        .await
        .unwrap();

    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total_records, 2);
    assert!(!page.has_more());
    mock.assert_async().await;
}

#[tokio::test]
async fn list_all_follows_every_page() {
    let mut fixture = MockServerFixture::new().await;
    let page1 = fixture
        .server
        .mock("GET", "/objects/object_3/records")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(r#"{"records":[{"id":"a"}],"total_pages":2,"current_page":1,"total_records":2}"#)
        .create_async()
        .await;
    let page2 = fixture
        .server
        .mock("GET", "/objects/object_3/records")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(r#"{"records":[{"id":"b"}],"total_pages":2,"current_page":2,"total_records":2}"#)
        .create_async()
        .await;

    let records = fixture
        .client()
        .list_all_records("object_3", None)
        .await
        .unwrap();

    let ids: Vec<_> = records.iter().filter_map(|r| r.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    page1.assert_async().await;
    page2.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_attempt_limit() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/objects/object_6/records/r1")
        .with_status(500)
        .with_body(r#"{"errors":["internal"]}"#)
        .expect(3)
        .create_async()
        .await;

    let err = fixture
        .client()
        .get_record("object_6", "r1")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    mock.assert_async().await;
}

#[tokio::test]
async fn error_body_is_carried_on_the_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json(
            "GET",
            "/objects/object_6/records/missing",
            404,
            r#"{"errors":["Record not found"]}"#,
        )
        .await;

    let client = KnackClient::builder(fixture.config())
        .retry_policy(RetryPolicy::single_attempt())
        .build()
        .unwrap();
    let err = client.get_record("object_6", "missing").await.unwrap_err();

    match err {
        Error::Remote { status, body, .. } => {
            assert_eq!(status, 404);
            assert!(body.contains("Record not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn create_and_update_send_json_bodies() {
    let mut fixture = MockServerFixture::new().await;
    let create = fixture
        .server
        .mock("POST", "/objects/object_6/records")
        .match_body(Matcher::Json(json!({"field_90": "Jane Doe"})))
        .with_status(200)
        .with_body(r#"{"id":"new1","field_90":"Jane Doe"}"#)
        .create_async()
        .await;
    let update = fixture
        .server
        .mock("PUT", "/objects/object_6/records/new1")
        .match_body(Matcher::Json(json!({"field_90": "Jane Smith"})))
        .with_status(200)
        .with_body(r#"{"id":"new1","field_90":"Jane Smith"}"#)
        .create_async()
        .await;

    let client = fixture.client();
    let created = client
        .create_record("object_6", &json!({"field_90": "Jane Doe"}))
        .await
        .unwrap();
    assert_eq!(created.id(), Some("new1"));

    client
        .update_record("object_6", "new1", &json!({"field_90": "Jane Smith"}))
        .await
        .unwrap();
    // served from the cache the update refreshed
    let cached = client.get_record("object_6", "new1").await.unwrap();
    assert_eq!(cached.text("field_90"), "Jane Smith");

    create.assert_async().await;
    update.assert_async().await;
}

#[tokio::test]
async fn view_records_are_created_through_the_page_view() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/pages/scene_12/views/view_34/records")
        .match_header("X-Knack-Application-Id", APP_ID)
        .match_body(Matcher::Json(json!({"field_150": "Reflection text"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"record":{"id":"v1"},"id":"v1","field_150":"Reflection text"}"#)
        .expect(1)
        .create_async()
        .await;

    let record = fixture
        .client()
        .create_view_record("scene_12", "view_34", &json!({"field_150": "Reflection text"}))
        .await
        .unwrap();

    assert_eq!(record.id(), Some("v1"));
    assert_eq!(record.text("field_150"), "Reflection text");
    mock.assert_async().await;
}
