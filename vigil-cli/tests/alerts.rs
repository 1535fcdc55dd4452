use assert_cmd::Command;
use httpmock::prelude::*;

#[tokio::test]
async fn alerts_command_lists_open_alerts() {
    let server = MockServer::start_async().await;
    let _m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/monitoring/alerts")
                .query_param("include_resolved", "false");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"[{"id":1,"kind":"CPU","message":"High CPU usage: 95.0%","created_at":"2026-08-21T12:00:00Z","is_resolved":false,"resolved_at":null}]"#,
                );
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "alerts"])
        .assert()
        .success()
        .stdout(predicates::str::contains("High CPU usage: 95.0%"))
        .stdout(predicates::str::contains("open"));
}

#[tokio::test]
async fn alerts_command_requests_resolved_with_all() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/monitoring/alerts")
                .query_param("include_resolved", "true");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[]"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "alerts", "--all"])
        .assert()
        .success()
        .stdout(predicates::str::contains("No alerts."));

    mock.assert_async().await;
}

#[tokio::test]
async fn resolve_command_posts_to_daemon() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/monitoring/alerts/7/resolve");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"resolved":7}"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "resolve", "7"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Alert 7 resolved."));

    mock.assert_async().await;
}

#[tokio::test]
async fn resolve_command_reports_missing_alert() {
    let server = MockServer::start_async().await;
    let _m = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/monitoring/alerts/42/resolve");
            then.status(404)
                .header("content-type", "application/json")
                .body(r#"{"error":"alert not found or already resolved"}"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "resolve", "42"])
        .assert()
        .success()
        .stderr(predicates::str::contains("not found or already resolved"));
}
