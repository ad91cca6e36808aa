mod common;

use common::{client, url, ScriptedTransport, API_KEY, BASE_URL};
use jules_mcp::errors::ClientError;
use jules_mcp::services::jules_client::{CreateSession, JulesClient, PageQuery};
use jules_mcp::services::transport::HttpTransport;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn list_sources_is_a_plain_get() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, &url("sources"), 200, r#"{"sources":[]}"#);

    let result = client(transport.clone()).list_sources().await.unwrap();

    assert_eq!(result, json!({"sources": []}));
    let call = transport.last_call();
    assert_eq!(call.method, Method::GET);
    assert_eq!(call.path_and_query(), "/v1alpha/sources");
    assert!(call.body.is_none());
    assert_eq!(call.headers["x-goog-api-key"], API_KEY);
    assert_eq!(call.headers["content-type"], "application/json");
}

#[tokio::test]
async fn resource_names_are_used_as_paths() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, &url("sources/github/acme/app"), 200, r#"{"name":"sources/github/acme/app"}"#);
    transport.respond(Method::GET, &url("sessions/42"), 200, r#"{"name":"sessions/42","state":"PLANNING"}"#);
    transport.respond(Method::GET, &url("sessions/42/activities/7"), 200, r#"{"name":"sessions/42/activities/7"}"#);
    let client = client(transport.clone());

    let source = client.get_source("sources/github/acme/app").await.unwrap();
    let session = client.get_session("sessions/42").await.unwrap();
    let activity = client.get_activity("sessions/42/activities/7").await.unwrap();

    assert_eq!(source["name"], "sources/github/acme/app");
    assert_eq!(session["state"], "PLANNING");
    assert_eq!(activity["name"], "sessions/42/activities/7");
    let paths: Vec<String> = transport.calls().iter().map(|c| c.path_and_query()).collect();
    assert_eq!(
        paths,
        vec![
            "/v1alpha/sources/github/acme/app",
            "/v1alpha/sessions/42",
            "/v1alpha/sessions/42/activities/7",
        ]
    );
}

#[tokio::test]
async fn listing_without_pagination_sends_no_query() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, &url("sessions"), 200, r#"{"sessions":[]}"#);
    transport.respond(Method::GET, &url("sessions/1/activities"), 200, r#"{"activities":[]}"#);
    let client = client(transport.clone());

    client.list_sessions(&PageQuery::default()).await.unwrap();
    client
        .list_activities("sessions/1", &PageQuery::default())
        .await
        .unwrap();

    for call in transport.calls() {
        assert_eq!(call.query(), None, "unexpected query on {}", call.url);
    }
}

#[tokio::test]
async fn listing_sends_only_the_supplied_page_parameters() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, &url("sessions?pageSize=5"), 200, "{}");
    transport.respond(Method::GET, &url("sessions?pageToken=next"), 200, "{}");
    transport.respond(
        Method::GET,
        &url("sessions/1/activities?pageSize=3&pageToken=abc"),
        200,
        "{}",
    );
    let client = client(transport.clone());

    client
        .list_sessions(&PageQuery::new(Some(5), None))
        .await
        .unwrap();
    client
        .list_sessions(&PageQuery::new(None, Some("next")))
        .await
        .unwrap();
    client
        .list_activities("sessions/1", &PageQuery::new(Some(3), Some("abc")))
        .await
        .unwrap();

    let queries: Vec<Option<String>> = transport.calls().iter().map(|c| c.query()).collect();
    assert_eq!(
        queries,
        vec![
            Some("pageSize=5".to_string()),
            Some("pageToken=next".to_string()),
            Some("pageSize=3&pageToken=abc".to_string()),
        ]
    );
}

#[tokio::test]
async fn create_session_posts_only_required_fields_by_default() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::POST, &url("sessions"), 200, r#"{"name":"sessions/9"}"#);

    let created = client(transport.clone())
        .create_session(&CreateSession::new("sources/github/acme/app", "Add tests"))
        .await
        .unwrap();

    assert_eq!(created["name"], "sessions/9");
    let call = transport.last_call();
    assert_eq!(call.method, Method::POST);
    assert_eq!(
        call.body,
        Some(json!({"source": "sources/github/acme/app", "instruction": "Add tests"}))
    );
}

#[tokio::test]
async fn create_session_sends_plan_approval_when_requested() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::POST, &url("sessions"), 200, r#"{"name":"sessions/10"}"#);

    let request = CreateSession::new("sources/github/acme/app", "Refactor")
        .require_plan_approval(true);
    client(transport.clone())
        .create_session(&request)
        .await
        .unwrap();

    let body = transport.last_call().body.unwrap();
    assert_eq!(body["requirePlanApproval"], true);
    assert!(body.get("autoPr").is_none());
    assert!(body.get("branch").is_none());
}

#[tokio::test]
async fn approve_plan_posts_an_empty_object_to_the_custom_method() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::POST, &url("sessions/42:approvePlan"), 200, "{}");

    client(transport.clone())
        .approve_plan("sessions/42")
        .await
        .unwrap();

    let call = transport.last_call();
    assert!(call.path_and_query().ends_with("sessions/42:approvePlan"));
    assert_eq!(call.body, Some(json!({})));
}

#[tokio::test]
async fn send_message_posts_the_prompt() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::POST, &url("sessions/42:sendMessage"), 200, "{}");

    client(transport.clone())
        .send_message("sessions/42", "hello")
        .await
        .unwrap();

    let call = transport.last_call();
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.body, Some(json!({"prompt": "hello"})));
}

#[tokio::test]
async fn delete_without_content_is_an_empty_object() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::DELETE, &url("sessions/42"), 204, "");

    let result = client(transport.clone())
        .delete_session("sessions/42")
        .await
        .unwrap();

    assert_eq!(result, json!({}));
    assert_eq!(transport.last_call().method, Method::DELETE);
}

#[tokio::test]
async fn not_found_keeps_status_and_raw_body() {
    let transport = ScriptedTransport::new();
    let body = r#"{"error":{"code":404,"message":"Session not found"}}"#;
    transport.respond(Method::GET, &url("sessions/404"), 404, body);

    let err = client(transport.clone())
        .get_session("sessions/404")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::Backend {
            status: 404,
            body: body.to_string()
        }
    );
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn transport_failures_are_not_retried() {
    let transport = ScriptedTransport::new();
    transport.fail(
        Method::GET,
        &url("sources"),
        ClientError::timeout("request timed out after 2000ms"),
    );

    let err = client(transport.clone()).list_sources().await.unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn trailing_slash_on_the_base_url_is_ignored() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, &url("sources"), 200, "{}");
    let dyn_transport: Arc<dyn HttpTransport> = transport.clone();
    let client = JulesClient::new(
        common::logger(),
        dyn_transport,
        &format!("{}/", BASE_URL),
        API_KEY,
        Duration::from_secs(1),
    );

    client.list_sources().await.unwrap();

    assert_eq!(transport.last_call().url, url("sources"));
}

#[tokio::test]
async fn every_request_carries_the_configured_timeout() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, &url("sources"), 200, "{}");

    client(transport.clone()).list_sources().await.unwrap();

    assert_eq!(transport.last_call().timeout, Duration::from_secs(2));
}
