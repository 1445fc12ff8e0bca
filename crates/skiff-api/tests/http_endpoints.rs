//! Endpoint implementations against a mock HTTP server.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use skiff_api::{
    ApiError, App, Apps, Client, ClientConfig, ErrorKind, Project, Projects, RegistryCredentials,
    Service, lets_chat_project,
};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> Client {
    client_with_token(server, Some(TOKEN))
}

fn client_with_token(server: &MockServer, token: Option<&str>) -> Client {
    let mut config = ClientConfig::new(&format!("{}/v1", server.base_url()))
        .expect("valid base url")
        .with_request_timeout(Duration::from_secs(5))
        .expect("positive timeout")
        .with_log_idle_timeout(Duration::from_secs(5))
        .expect("positive timeout");
    if let Some(token) = token {
        config = config.with_access_token(token);
    }
    Client::new(config).expect("client builds")
}

fn node() -> App {
    App::new("node", "mikemichel/lets-chat")
        .with_memory(1024)
        .with_instances(1)
}

// ==================== Projects ====================

#[tokio::test]
async fn create_project_returns_server_entity() {
    let server = MockServer::start_async().await;
    let project = Project::new("letschat").with_service(Service::new("frontend").with_app(node()));
    let wire = json!({
        "project": "letschat",
        "services": [{
            "id": "frontend",
            "apps": [{"id": "node", "image": "mikemichel/lets-chat", "mem": 1024, "instances": 1}]
        }]
    });

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects")
            .header("authorization", format!("Bearer {TOKEN}"))
            .json_body(wire.clone());
        then.status(201).json_body(wire.clone());
    });

    let response = Projects::create(&client(&server), &project)
        .await
        .expect("create succeeds");
    mock.assert();

    assert_eq!(response.status().map(|s| s.as_u16()), Some(201));
    let app = &response.body.services[0].apps[0];
    assert_eq!(app.id, "node");
    assert_eq!(app.image.as_deref(), Some("mikemichel/lets-chat"));
    assert_eq!(app.memory, Some(1024));
    assert_eq!(app.instances, Some(1));
}

#[tokio::test]
async fn create_preserves_every_app_field_over_the_wire() {
    let server = MockServer::start_async().await;
    let project = lets_chat_project();
    let wire = serde_json::to_value(&project).expect("project serializes");
    assert_eq!(wire["services"][0]["apps"][0]["dependencies"][0], "../backend/mongodb");

    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/projects").json_body(wire.clone());
        then.status(201).json_body(wire.clone());
    });

    let created = Projects::create(&client(&server), &project)
        .await
        .expect("create succeeds")
        .into_body();
    mock.assert();
    assert_eq!(created, project);
}

#[tokio::test]
async fn get_unknown_project_is_not_found() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1/projects/ghost");
        then.status(404).json_body(json!({
            "status": "error",
            "message": "Project with id \"ghost\" could not be found"
        }));
    });

    let err = Projects::get(&client(&server), "ghost")
        .await
        .expect_err("project is missing");

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status_code().map(|s| s.as_u16()), Some(404));
    assert!(err.message().contains("Project with id \"ghost\" could not be found"));
}

#[tokio::test]
async fn forced_delete_sends_force_flag() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/v1/projects/letschat")
            .query_param("force", "true");
        then.status(200).json_body(json!({
            "status": "success",
            "message": "Project letschat successfully deleted."
        }));
    });

    let response = Projects::delete(&client(&server), "letschat", true)
        .await
        .expect("delete succeeds");
    mock.assert();
    assert!(response.body.is_success());
    assert!(response.body.message.contains("successfully deleted."));
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_server() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(500);
    });

    let project = Project::new("letschat")
        .with_service(Service::new("frontend").with_app(App::new("node", "")));
    let err = Projects::create(&client(&server), &project)
        .await
        .expect_err("empty image is rejected");

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.status_code().is_none());
    mock.assert_hits(0);
}

#[tokio::test]
async fn missing_token_never_reaches_the_server() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let err = Projects::list(&client_with_token(&server, None))
        .await
        .expect_err("token is required");

    assert!(err.is_missing_access_token());
    mock.assert_hits(0);
}

#[tokio::test]
async fn plain_text_server_error_is_remote() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1/projects");
        then.status(502).body("bad gateway");
    });

    let err = Projects::list(&client(&server)).await.expect_err("server fails");
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.message(), "bad gateway");
}

// ==================== Apps ====================

#[tokio::test]
async fn scale_patches_instance_count() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/v1/projects/letschat/services/frontend/apps/node")
            .json_body(json!({"instances": 3}));
        then.status(200)
            .json_body(json!({"id": "node", "image": "mikemichel/lets-chat", "instances": 3}));
    });

    let app = Apps::scale(&client(&server), "letschat", "frontend", "node", 3)
        .await
        .expect("scale succeeds")
        .into_body();
    mock.assert();
    assert_eq!(app.instances, Some(3));
}

#[tokio::test]
async fn scale_unknown_app_names_the_app() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(PATCH)
            .path("/v1/projects/letschat/services/frontend/apps/ghost");
        then.status(404).json_body(json!({
            "status": "error",
            "message": "App with id \"ghost\" could not be found"
        }));
    });

    let err = Apps::scale(&client(&server), "letschat", "frontend", "ghost", 3)
        .await
        .expect_err("app is missing");
    assert!(err.is_not_found());
    assert!(err.message().contains("\"ghost\""));
}

#[tokio::test]
async fn rollback_posts_target_version() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/letschat/services/frontend/apps/node/rollback")
            .json_body(json!({"version": "2015-12-20T08:01:12.532Z"}));
        then.status(200).json_body(json!({
            "id": "node",
            "version": "2015-12-20T08:01:12.532Z"
        }));
    });

    let app = Apps::rollback(
        &client(&server),
        "letschat",
        "frontend",
        "node",
        "2015-12-20T08:01:12.532Z",
    )
    .await
    .expect("rollback succeeds")
    .into_body();
    mock.assert();
    assert_eq!(app.version.as_deref(), Some("2015-12-20T08:01:12.532Z"));
}

#[tokio::test]
async fn empty_segment_is_local_validation() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let err = Apps::restart(&client(&server), "letschat", "", "node")
        .await
        .expect_err("service id is empty");
    assert_eq!(err.kind(), ErrorKind::Validation);
    mock.assert_hits(0);
}

#[tokio::test]
async fn metrics_decode_series() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/letschat/services/frontend/apps/node/metrics");
        then.status(200).json_body(json!({
            "container_memory_usage_bytes": {
                "user-letschat_frontend_node.1": [
                    {"x": "2015-11-04T14:17:19Z", "y": 134217728.0}
                ]
            }
        }));
    });

    let metrics = Apps::get_metrics(&client(&server), "letschat", "frontend", "node")
        .await
        .expect("metrics succeed")
        .into_body();
    let point = metrics
        .latest("container_memory_usage_bytes", "user-letschat_frontend_node.1")
        .expect("point present");
    assert!((point.value - 134_217_728.0).abs() < f64::EPSILON);
}

// ==================== Logs ====================

#[tokio::test]
async fn project_logs_stream_entries_up_to_limit() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/letschat/logs")
            .query_param("lines", "2");
        then.status(200).body(concat!(
            r#"{"project":"letschat","service":"frontend","app":"node","createdAt":"2015-11-04T14:17:19Z","log":"one"}"#,
            "\n\n",
            r#"{"project":"letschat","service":"frontend","app":"node","createdAt":"2015-11-04T14:17:20Z","log":"two"}"#,
            "\n",
            r#"{"project":"letschat","service":"frontend","app":"node","createdAt":"2015-11-04T14:17:21Z","log":"three"}"#,
            "\n",
        ));
    });

    let (entries, error) = Projects::get_logs(&client(&server), "letschat", 2)
        .collect()
        .await;
    mock.assert();

    assert!(error.is_none(), "unexpected error: {error:?}");
    let lines: Vec<_> = entries.iter().map(|e| e.log.as_str()).collect();
    assert_eq!(lines, ["one", "two"]);
    assert!(entries.iter().all(|e| e.service == "frontend" && e.app == "node"));
}

#[tokio::test]
async fn draining_errors_before_logs_completes_for_large_streams() {
    let server = MockServer::start_async().await;
    let body: String = (0..500)
        .map(|i| format!("{{\"app\":\"node\",\"service\":\"frontend\",\"log\":\"line {i}\"}}\n"))
        .collect();
    server.mock(|when, then| {
        when.method(GET).path("/v1/projects/letschat/logs");
        then.status(200).body(body.clone());
    });

    let mut stream = Projects::get_logs(&client(&server), "letschat", 0);
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        let mut errors = Vec::new();
        while let Some(error) = stream.errors.recv().await {
            errors.push(error);
        }
        errors
    })
    .await
    .expect("error channel completes without reading logs");
    assert!(drained.is_empty(), "unexpected errors: {drained:?}");

    let mut lines = Vec::new();
    while let Some(entry) = stream.logs.recv().await {
        lines.push(entry.log);
    }
    assert_eq!(lines.len(), 500);
    assert_eq!(lines[0], "line 0");
    assert_eq!(lines[499], "line 499");
}

#[tokio::test]
async fn app_logs_on_unknown_scope_yield_one_error() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/letschat/services/frontend/apps/ghost/logs");
        then.status(404).json_body(json!({
            "status": "error",
            "message": "App with id \"ghost\" could not be found"
        }));
    });

    let mut stream = Apps::get_logs(&client(&server), "letschat", "frontend", "ghost", 0);
    assert!(stream.logs.recv().await.is_none());
    let error = stream.errors.recv().await.expect("one error");
    assert!(error.is_not_found());
    assert!(stream.errors.recv().await.is_none());
}

#[tokio::test]
async fn malformed_log_line_ends_stream_with_decode_error() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1/projects/letschat/logs");
        then.status(200).body("{\"log\":\"fine\"}\n{oops\n");
    });

    let (entries, error) = Projects::get_logs(&client(&server), "letschat", 0)
        .collect()
        .await;
    assert_eq!(entries.len(), 1);
    assert!(matches!(error, Some(ApiError::Decode(_))));
}

// ==================== Registry credentials ====================

#[tokio::test]
async fn upload_forwards_body_verbatim() {
    let server = MockServer::start_async().await;
    let document = r#"{"auth":"success"}"#;
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/v1/registrycredentials")
            .header("content-type", "application/json")
            .body(document);
        then.status(200).json_body(json!({
            "status": "success",
            "message": "Uploaded docker credentials"
        }));
    });

    let response = RegistryCredentials::upload(&client(&server), document.as_bytes())
        .await
        .expect("upload succeeds");
    mock.assert();
    assert_eq!(response.body.message, "Uploaded docker credentials");
}

#[tokio::test]
async fn rejected_upload_is_validation_class() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(PUT).path("/v1/registrycredentials");
        then.status(400).json_body(json!({
            "status": "error",
            "message": "Unable to upload docker credentials"
        }));
    });

    let err = RegistryCredentials::upload(&client(&server), &b"nope"[..])
        .await
        .expect_err("server rejects");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.status_code().map(|s| s.as_u16()), Some(400));
}

#[tokio::test]
async fn remote_unauthorized_is_not_the_sentinel() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/v1/registrycredentials");
        then.status(401).json_body(json!({
            "status": "error",
            "message": "token expired",
            "reason": "expired"
        }));
    });

    let err = RegistryCredentials::check(&client(&server))
        .await
        .expect_err("token rejected");
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(!err.is_missing_access_token());
    assert_eq!(err.reason(), Some("expired"));
}

#[tokio::test]
async fn check_without_token_is_the_sentinel() {
    let server = MockServer::start_async().await;
    let err = RegistryCredentials::check(&client_with_token(&server, None))
        .await
        .expect_err("token is required");
    assert!(err.is_missing_access_token());
}
