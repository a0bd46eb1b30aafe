//! Integration tests using wiremock to simulate HTTP servers.

use restwright::{ClientFactory, Error, HttpClient, Method, Paginated, PaginatedCursor};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_json, body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

#[derive(Serialize)]
struct Lookup<'a> {
    id: &'a str,
    name: Option<&'a str>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::builder()
        .base_address(format!("{}/api", server.uri()))
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_get_request() {
    init_tracing();
    let mock_server = MockServer::start().await;

    let response_data = TestData {
        id: 1,
        name: "Test".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/api/users/1"))
        .and(query_param("id", "someId"))
        .and(header("authorization", "Bearer testToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_data))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["users", "1"])
        .add_queries(&Lookup {
            id: "someId",
            name: None,
        })
        .unwrap()
        .set_bearer_token("testToken")
        .unwrap()
        .get()
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());

    let typed = response.read_json_as::<TestData>().unwrap();
    assert_eq!(typed.data, response_data);
}

#[tokio::test]
async fn test_successful_post_request() {
    let mock_server = MockServer::start().await;

    let request_data = TestData {
        id: 0,
        name: "New".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/api/test"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "id": 0, "name": "New" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1, "name": "New" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["test"])
        .set_json_content(&request_data)
        .unwrap()
        .post()
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.json::<TestData>().unwrap().id, 1);
}

#[tokio::test]
async fn test_all_http_methods() {
    let mock_server = MockServer::start().await;

    for verb in ["GET", "POST", "PUT", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/api/resource"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = client_for(&mock_server);
    let request = || client.rest().unwrap().set_paths(["resource"]);

    assert_eq!(request().get().await.unwrap().status.as_u16(), 204);
    assert_eq!(request().post().await.unwrap().status.as_u16(), 204);
    assert_eq!(request().put().await.unwrap().status.as_u16(), 204);
    assert_eq!(request().patch().await.unwrap().status.as_u16(), 204);
    assert_eq!(request().delete().await.unwrap().status.as_u16(), 204);
}

#[tokio::test]
async fn test_http_error_is_returned_not_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["missing"])
        .send(Method::GET)
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 404);
    assert_eq!(response.text(), "Not found");

    match response.read_json_as::<TestData>() {
        Err(Error::HttpError {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(raw_response, "Not found");
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_on_503() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 503, third succeeds
    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(503).set_body_string("Unavailable")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "name": "Test" }))
            }
        })
        .mount(&mock_server)
        .await;

    let acknowledged = Arc::new(AtomicUsize::new(0));
    let acknowledged_clone = acknowledged.clone();

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["flaky"])
        .configure_retry(|retry| {
            retry.delay = Duration::from_millis(10);
            retry.set_acknowledgement(move |_, status| {
                assert_eq!(status.as_u16(), 503);
                acknowledged_clone.fetch_add(1, Ordering::SeqCst);
            });
        })
        .get()
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    assert_eq!(acknowledged.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retry_exhaustion_returns_last_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/down"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["down"])
        .configure_retry(|retry| {
            retry.maximum_attempts = 2;
            retry.delay = Duration::from_millis(5);
        })
        .get()
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 500);
    assert_eq!(response.attempts, 3);
}

#[tokio::test]
async fn test_form_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("grant_type=password&username=alice"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["token"])
        .set_form_content(&json!({
            "grant_type": "password",
            "username": "alice",
            "scope": null,
        }))
        .unwrap()
        .post()
        .await
        .unwrap();

    assert!(response.is_success());
}

#[tokio::test]
async fn test_multipart_upload() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("notes.txt");
    std::fs::write(&file_path, "file contents").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/uploads"))
        .and(header(
            "content-type",
            "multipart/form-data; boundary=----WebKitFormBoundary7GuI94hQ253xT0v",
        ))
        .and(body_string_contains(
            "Content-Disposition: form-data; name=\"title\"\r\n\r\nNotes\r\n",
        ))
        .and(body_string_contains(
            "name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: application/octet-stream\r\n\r\nfile contents\r\n",
        ))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .rest()
        .unwrap()
        .set_paths(["uploads"])
        .set_multipart_form_data(|form| {
            form.add_string("title", "Notes", None)?;
            form.add_file("file", &file_path, None)?;
            Ok(())
        })
        .unwrap()
        .post()
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
}

#[tokio::test]
async fn test_default_headers_and_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("user-agent", "restwright-tests"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-request-id", "abc-123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::builder()
        .base_address(mock_server.uri())
        .unwrap()
        .default_header("User-Agent", "restwright-tests")
        .unwrap()
        .build()
        .unwrap();

    let response = client
        .rest_with_base_address(&format!("{}/api", mock_server.uri()))
        .unwrap()
        .set_paths(["me"])
        .set_header("X-Request-Id", "abc-123")
        .unwrap()
        .set_basic_token("user", "pass")
        .unwrap()
        .get()
        .await
        .unwrap();

    assert!(response.is_success());
}

#[tokio::test]
async fn test_request_headers_override_defaults_on_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::builder()
        .base_address(format!("{}/api", mock_server.uri()))
        .unwrap()
        .default_header("X-Trace", "default")
        .unwrap()
        .build()
        .unwrap();

    let response = client
        .rest()
        .unwrap()
        .set_paths(["events"])
        .set_header("X-Trace", "override")
        .unwrap()
        .set_header("Content-Type", "application/vnd.api+json")
        .unwrap()
        .set_json_content(&json!({ "kind": "created" }))
        .unwrap()
        .post()
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 202);

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let headers = &received[0].headers;

    let traces: Vec<_> = headers.get_all("x-trace").iter().collect();
    assert_eq!(traces, vec!["override"]);

    let content_types: Vec<_> = headers.get_all("content-type").iter().collect();
    assert_eq!(content_types, vec!["application/json"]);
}

#[tokio::test]
async fn test_missing_base_address_is_a_configuration_error() {
    let client = HttpClient::builder().build().unwrap();

    match client.rest() {
        Err(Error::ConfigurationError(message)) => {
            assert!(message.contains("base address"));
        }
        other => panic!("Expected ConfigurationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_a_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::builder()
        .base_address(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let result = client.rest().unwrap().set_paths(["slow"]).use_retry().get().await;
    assert!(matches!(result, Err(Error::Network(_))));
}

#[tokio::test]
async fn test_paginated_cursor_over_http() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "1"))
        .and(query_param("size", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [1, 2, 3],
            "currentPage": 1,
            "hasMore": true,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [4],
            "currentPage": 2,
            "hasMore": false,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ClientFactory::create_url_client(&format!("{}/api", mock_server.uri())).unwrap();

    let mut cursor = PaginatedCursor::new(None, Some(3), |page, size| {
        let client = client.clone();
        async move {
            client
                .rest()?
                .set_paths(["items"])
                .add_query("page", page)
                .add_query("size", size)
                .get()
                .await?
                .json::<Paginated<u32>>()
        }
    });

    let mut items = Vec::new();
    while cursor.move_next().await {
        items.extend(cursor.current().unwrap().items.iter().copied());
    }

    assert_eq!(items, vec![1, 2, 3, 4]);
    assert_eq!(cursor.current().unwrap().current_page, 2);
    assert!(cursor.last_error().is_none());
}
