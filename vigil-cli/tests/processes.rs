use assert_cmd::Command;
use httpmock::prelude::*;

#[tokio::test]
async fn processes_command_lists_processes() {
    let server = MockServer::start_async().await;
    let _m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/monitoring/processes");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"[{"pid":812,"user":"postgres","cpu_usage":42.0,"memory_usage":3.1,"command":"postgres: writer process"}]"#,
                );
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "processes"])
        .assert()
        .success()
        .stdout(predicates::str::contains("postgres: writer process"));
}

#[tokio::test]
async fn processes_command_passes_count() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/monitoring/processes")
                .query_param("count", "3");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[]"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "processes", "--count", "3"])
        .assert()
        .success();

    mock.assert_async().await;
}

#[tokio::test]
async fn processes_command_handles_empty_list() {
    let server = MockServer::start_async().await;
    let _m = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/monitoring/processes");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[]"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vigil-cli"))
        .args(["--url", &server.base_url(), "processes"])
        .assert()
        .success();
}
