//! Wire-contract tests for the DigitalOcean client against a local mock server

use droplet_client::{ActionStatus, DropletClient, DropletError, DropletStatus};
use mockito::{Matcher, Server};

const TOKEN: &str = "test-token";

fn client_for(server: &Server) -> DropletClient {
    DropletClient::new(server.url(), TOKEN.to_string()).expect("Failed to create client")
}

fn droplet_json(id: u64, name: &str, status: &str) -> String {
    format!(
        r#"{{"id": {id}, "name": "{name}", "status": "{status}",
            "kernel": {{"id": 7515, "name": "CentOS 7 x64 vmlinuz-3.10.0-123", "version": "3.10.0-123"}},
            "memory": 1024, "vcpus": 1}}"#
    )
}

#[tokio::test]
async fn test_list_droplets_sends_bearer_token_and_follows_pages() {
    let mut server = Server::new_async().await;
    let next = format!("{}/v2/droplets?page=2&per_page=100", server.url());

    let first = server
        .mock("GET", "/v2/droplets")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
        ]))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(format!(
            r#"{{"droplets": [{}], "links": {{"pages": {{"next": "{next}"}}}}, "meta": {{"total": 2}}}}"#,
            droplet_json(1, "web-1", "active")
        ))
        .create_async()
        .await;

    let second = server
        .mock("GET", "/v2/droplets")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(format!(
            r#"{{"droplets": [{}], "links": {{}}, "meta": {{"total": 2}}}}"#,
            droplet_json(2, "web-2", "off")
        ))
        .create_async()
        .await;

    let droplets = client_for(&server).list_droplets().await.expect("list should succeed");

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(droplets.len(), 2);
    assert_eq!(droplets[0].name, "web-1");
    assert_eq!(droplets[1].status, DropletStatus::Off);
    assert_eq!(droplets[1].kernel.as_ref().map(|k| k.id), Some(7515));
}

#[tokio::test]
async fn test_list_droplets_non_200_carries_raw_body() {
    let mut server = Server::new_async().await;
    let body = r#"{"id": "unauthorized", "message": "Unable to authenticate you."}"#;
    server
        .mock("GET", "/v2/droplets")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(body)
        .create_async()
        .await;

    let err = client_for(&server).list_droplets().await.expect_err("401 must fail");
    match err {
        DropletError::Api { status, body: raw, .. } => {
            assert_eq!(status, 401);
            assert_eq!(raw, body);
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_kernels_uses_kernel_page_size() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/droplets/42/kernels")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), "1000".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"kernels": [
                {"id": 1, "name": "CentOS 7 x64 vmlinuz-3.10.0-123", "version": "3.10.0-123"},
                {"id": 2, "name": "CentOS 7 x64 vmlinuz-3.10.0-456", "version": "3.10.0-456"}
            ], "links": {}}"#,
        )
        .create_async()
        .await;

    let kernels = client_for(&server).list_kernels(42).await.expect("list should succeed");

    mock.assert_async().await;
    assert_eq!(kernels.len(), 2);
    assert_eq!(kernels[1].version, "3.10.0-456");
}

#[tokio::test]
async fn test_change_kernel_posts_typed_body_and_accepts_201() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/droplets/42/actions")
        .match_header("authorization", "Bearer test-token")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(serde_json::json!({"type": "change_kernel", "kernel": 991})))
        .with_status(201)
        .with_body(r#"{"action": {"id": 500, "status": "in-progress", "type": "change_kernel"}}"#)
        .create_async()
        .await;

    let action = client_for(&server).change_kernel(42, 991).await.expect("201 is accepted");

    mock.assert_async().await;
    assert_eq!(action.id, 500);
    assert_eq!(action.status, ActionStatus::InProgress);
}

#[tokio::test]
async fn test_power_on_rejected_status_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v2/droplets/42/actions")
        .match_body(Matcher::Json(serde_json::json!({"type": "power_on"})))
        .with_status(422)
        .with_body(r#"{"id": "unprocessable_entity", "message": "Droplet is already powered on."}"#)
        .create_async()
        .await;

    let err = client_for(&server).power_on(42).await.expect_err("422 must fail");
    assert_eq!(err.status(), Some(422));
    assert!(err.to_string().contains("already powered on"));
}

#[tokio::test]
async fn test_get_action_in_progress_is_not_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/actions/500")
        .with_status(200)
        .with_body(r#"{"action": {"id": 500, "status": "in-progress", "type": "power_on"}}"#)
        .create_async()
        .await;

    let action = client_for(&server).get_action(500).await.expect("in-progress is fine");
    assert_eq!(action.status, ActionStatus::InProgress);
}

#[tokio::test]
async fn test_get_action_unexpected_status_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/actions/500")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let err = client_for(&server).get_action(500).await.expect_err("500 must fail");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_get_droplet_reads_power_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/droplets/42")
        .with_status(200)
        .with_body(format!(r#"{{"droplet": {}}}"#, droplet_json(42, "db-1", "off")))
        .create_async()
        .await;

    let droplet = client_for(&server).get_droplet(42).await.expect("read should succeed");
    assert_eq!(droplet.status, DropletStatus::Off);
}

#[tokio::test]
async fn test_pagination_link_to_another_host_is_refused() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/v2/droplets")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!(
            r#"{{"droplets": [{}], "links": {{"pages": {{"next": "https://elsewhere.example/v2/droplets?page=2"}}}}}}"#,
            droplet_json(1, "web-1", "active")
        ))
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server)
        .list_droplets()
        .await
        .expect_err("foreign next link must not be followed");

    first.assert_async().await;
    match err {
        DropletError::InvalidRequest(msg) => assert!(msg.contains("elsewhere.example")),
        other => panic!("expected InvalidRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_relative_pagination_link_is_resolved_against_base_url() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/droplets")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(format!(
            r#"{{"droplets": [{}], "links": {{"pages": {{"next": "/v2/droplets?page=2&per_page=100"}}}}}}"#,
            droplet_json(1, "web-1", "active")
        ))
        .create_async()
        .await;
    let second = server
        .mock("GET", "/v2/droplets")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(format!(r#"{{"droplets": [{}], "links": {{}}}}"#, droplet_json(2, "web-2", "active")))
        .create_async()
        .await;

    let droplets = client_for(&server).list_droplets().await.expect("list should succeed");

    second.assert_async().await;
    assert_eq!(droplets.len(), 2);
}
