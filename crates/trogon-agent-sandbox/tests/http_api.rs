use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::ServiceExt;
use trogon_agent_sandbox::{AppState, PendingApprovals, Sandbox, router};
use trogon_llm::{ModelRouter, RouterConfig};
use trogon_query_tool::QueryExecutor;
use trogon_query_tool::mocks::MockDocumentStore;
use trogon_vault::{CredentialPolicy, CredentialVault, EncryptionKey, MemoryCredentialStore, ProviderTag};

const ANTHROPIC_KEY: &str = "sk-ant-acme-0123456789";

struct Harness {
    app: Router,
    credentials: MemoryCredentialStore,
    documents: MockDocumentStore,
}

fn harness(llm_base_url: &str) -> Harness {
    let credentials = MemoryCredentialStore::new();
    let documents = MockDocumentStore::new().with_results(vec![json!({"email": "a@x.io"})]);
    let vault = CredentialVault::new(
        &EncryptionKey::generate(),
        credentials.clone(),
        CredentialPolicy::default(),
    );
    let config = RouterConfig::default()
        .with_base_url(ProviderTag::Anthropic, llm_base_url)
        .with_retry_attempts(1)
        .with_initial_backoff(Duration::ZERO);
    let sandbox = Sandbox::new(
        vault,
        ModelRouter::new(config, reqwest::Client::new()),
        QueryExecutor::new(documents.clone()),
    );
    let app = router(AppState {
        sandbox: Arc::new(sandbox),
        approvals: Arc::new(PendingApprovals::new(Duration::from_secs(30))),
    });
    Harness {
        app,
        credentials,
        documents,
    }
}

fn request(method: &str, uri: &str, tenant: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn save_key(app: &Router, tenant: &str) {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/user/api-keys",
            Some(tenant),
            Some(json!({"provider": "anthropic", "apiKey": ANTHROPIC_KEY})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn api_key_lifecycle() {
    let h = harness("http://127.0.0.1:9");

    save_key(&h.app, "acme").await;
    assert_eq!(h.credentials.len(), 1);

    let (status, body) = send(&h.app, request("GET", "/api/user/api-keys", Some("acme"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"provider": "anthropic"}]));
    assert!(!body.to_string().contains(ANTHROPIC_KEY));

    let (_, other) = send(&h.app, request("GET", "/api/user/api-keys", Some("globex"), None)).await;
    assert_eq!(other, json!([]));

    let (status, _) = send(
        &h.app,
        request("DELETE", "/api/user/api-keys", Some("acme"), Some(json!({"provider": "anthropic"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.credentials.is_empty());
}

#[tokio::test]
async fn api_key_validation_errors() {
    let h = harness("http://127.0.0.1:9");
    let cases = [
        (json!({"provider": "anthropic"}), "Missing provider or apiKey"),
        (json!({"provider": "cohere", "apiKey": "0123456789abc"}), "Invalid provider"),
        (json!({"provider": "anthropic", "apiKey": "short"}), "API key must be at least 10 characters"),
    ];
    for (body, message) in cases {
        let (status, response) = send(&h.app, request("POST", "/api/user/api-keys", Some("acme"), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], "bad_request:api");
        assert_eq!(response["message"], message);
    }

    let (status, response) = send(
        &h.app,
        request(
            "POST",
            "/api/user/api-keys",
            Some("acme"),
            Some(json!({"provider": "openai", "apiKey": "sk-0123456789abc"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Provider 'openai' does not accept API keys");
    assert!(h.credentials.is_empty());
}

#[tokio::test]
async fn tenant_header_is_required() {
    let h = harness("http://127.0.0.1:9");
    let (status, body) = send(&h.app, request("GET", "/api/user/api-keys", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized:api");

    let (status, _) = send(&h.app, request("GET", "/api/user/api-keys", Some("a/b"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn models_catalog_is_public() {
    let h = harness("http://127.0.0.1:9");
    let (status, body) = send(&h.app, request("GET", "/api/models", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["defaultModel"], "openai/gpt-4.1-mini");
    assert!(body["models"].as_array().unwrap().iter().any(|m| m["id"] == "anthropic/claude-sonnet-4.5"));
}

#[tokio::test]
async fn respond_without_a_key_asks_the_tenant_to_configure_one() {
    let server = MockServer::start_async().await;
    let h = harness(&server.base_url());

    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/agent/respond",
            Some("acme"),
            Some(json!({"model": "anthropic/claude-sonnet-4.5", "messages": [{"role": "user", "content": "hi"}]})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "missing_credential:model");
    assert!(body["message"].as_str().unwrap().contains("anthropic"));
}

#[tokio::test]
async fn respond_uses_the_tenants_own_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages").header("x-api-key", ANTHROPIC_KEY);
            then.status(200).header("content-type", "application/json").json_body(json!({
                "content": [{"type": "text", "text": "<thinking>easy</thinking>Hello from Claude"}],
                "stop_reason": "end_turn"
            }));
        })
        .await;
    let h = harness(&server.base_url());
    save_key(&h.app, "acme").await;

    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/agent/respond",
            Some("acme"),
            Some(json!({
                "model": "anthropic/claude-3.7-sonnet-thinking",
                "messages": [{"role": "user", "content": "hi"}]
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["text"], "Hello from Claude");
    assert_eq!(body["reasoning"], "easy");
    assert_eq!(body["steps"], 1);
    mock.assert_async().await;

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            "/api/agent/respond",
            Some("globex"),
            Some(json!({"model": "anthropic/claude-sonnet-4.5", "messages": [{"role": "user", "content": "hi"}]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn tool_call_waits_for_approval_then_runs() {
    let server = MockServer::start_async().await;
    let mut proposal = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).header("content-type", "application/json").json_body(json!({
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_1",
                    "name": "queryMongo",
                    "input": {"collection": "leads", "operation": "find", "filter": "{\"status\":\"new\"}"}
                }],
                "stop_reason": "tool_use"
            }));
        })
        .await;
    let h = harness(&server.base_url());
    save_key(&h.app, "acme").await;

    let turn = {
        let app = h.app.clone();
        tokio::spawn(async move {
            send(
                &app,
                request(
                    "POST",
                    "/api/agent/respond",
                    Some("acme"),
                    Some(json!({
                        "model": "anthropic/claude-sonnet-4.5",
                        "messages": [{"role": "user", "content": "list new leads"}]
                    })),
                ),
            )
            .await
        })
    };

    let pending = loop {
        let (_, body) = send(&h.app, request("GET", "/api/agent/approvals", Some("acme"), None)).await;
        if let Some(first) = body.as_array().and_then(|items| items.first()).cloned() {
            break first;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(pending["tool"], "queryMongo");
    assert_eq!(pending["toolCallId"], "toolu_1");
    assert!(h.documents.calls().is_empty());

    let (_, others) = send(&h.app, request("GET", "/api/agent/approvals", Some("globex"), None)).await;
    assert_eq!(others, json!([]));

    proposal.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages").body_contains("tool_result");
            then.status(200).header("content-type", "application/json").json_body(json!({
                "content": [{"type": "text", "text": "One new lead: a@x.io"}],
                "stop_reason": "end_turn"
            }));
        })
        .await;

    let id = pending["id"].as_str().unwrap();
    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/agent/approvals/{id}"),
            Some("acme"),
            Some(json!({"approved": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = turn.await.unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["text"], "One new lead: a@x.io");
    assert_eq!(body["toolResults"][0]["outcome"]["count"], 1);
    assert_eq!(h.documents.calls().len(), 1);
}

#[tokio::test]
async fn deciding_unknown_approval_is_not_found() {
    let h = harness("http://127.0.0.1:9");
    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/agent/approvals/00000000-0000-4000-8000-000000000000",
            Some("acme"),
            Some(json!({"approved": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found:approval");
}
