//! Integration tests for the collection API

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use shelf_db::Database;
use shelf_kernel::settings::{Environment, Settings};

async fn create_test_server_in(environment: Environment) -> TestServer {
    let settings = Settings {
        environment,
        ..Settings::default()
    };
    let db = Database::in_memory().await.unwrap();
    let registry = shelf_app::bootstrap(&settings, &db).await.unwrap();
    let app = shelf_http::build_router(&registry, &settings);
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_server() -> TestServer {
    create_test_server_in(Environment::Local).await
}

async fn add(server: &TestServer, body: Value) -> Value {
    let response = server.post("/api/books").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_health_and_request_id() {
    let server = create_test_server().await;

    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_text("ok");

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&request_id).is_ok());
}

#[tokio::test]
async fn test_list_empty() {
    let server = create_test_server().await;

    let response = server.get("/api/books").await;
    response.assert_status_ok();
    response.assert_json(&json!([]));
}

#[tokio::test]
async fn test_create_dune() {
    let server = create_test_server().await;

    let book = add(
        &server,
        json!({"title": "Dune", "author": "Frank Herbert", "year": 1965}),
    )
    .await;

    assert!(uuid::Uuid::parse_str(book["id"].as_str().unwrap()).is_ok());
    assert_eq!(book["title"], "Dune");
    assert_eq!(book["author"], "Frank Herbert");
    assert_eq!(book["year"], 1965);
    assert_eq!(book["coverUrl"], "default-cover.jpg");
    assert_eq!(book["createdAt"], book["updatedAt"]);

    let fetched = server.get(&format!("/api/books/{}", book["id"].as_str().unwrap())).await;
    fetched.assert_status_ok();
    fetched.assert_json(&book);
}

#[tokio::test]
async fn test_create_accepts_year_as_string() {
    let server = create_test_server().await;

    let book = add(
        &server,
        json!({"title": "The Hobbit", "author": "J.R.R. Tolkien", "year": "1937", "coverUrl": "https://covers.openlibrary.org/b/id/1-M.jpg"}),
    )
    .await;

    assert_eq!(book["year"], 1937);
    assert_eq!(book["coverUrl"], "https://covers.openlibrary.org/b/id/1-M.jpg");
}

#[tokio::test]
async fn test_create_accepts_whole_float_year() {
    let server = create_test_server().await;

    let book = add(
        &server,
        json!({"title": "Dune", "author": "Frank Herbert", "year": 1965.0}),
    )
    .await;
    assert_eq!(book["year"], 1965);

    let response = server
        .post("/api/books")
        .json(&json!({"title": "Dune", "author": "Frank Herbert", "year": 1965.5}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "Year must be a whole number");
}

#[tokio::test]
async fn test_create_missing_fields() {
    let server = create_test_server().await;

    for body in [
        json!({"author": "Frank Herbert", "year": 1965}),
        json!({"title": "Dune", "year": 1965}),
        json!({"title": "Dune", "author": "Frank Herbert"}),
        json!({"title": "", "author": "Frank Herbert", "year": 1965}),
        json!({"title": "Dune", "author": "Frank Herbert", "year": 0}),
    ] {
        let response = server.post("/api/books").json(&body).await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "Missing required fields"}));
    }

    server.get("/api/books").await.assert_json(&json!([]));
}

#[tokio::test]
async fn test_create_invalid_fields() {
    let server = create_test_server().await;

    let response = server
        .post("/api/books")
        .json(&json!({"title": "Dune", "author": "x".repeat(101), "year": 1965}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "Error adding book");
    assert_eq!(body["error"], "Author name cannot be more than 100 characters");

    let response = server
        .post("/api/books")
        .json(&json!({"title": "Dune", "author": "Frank Herbert", "year": 999}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "Year must be at least 1000");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = create_test_server().await;

    let response = server
        .post("/api/books")
        .content_type("application/json")
        .bytes("{\"title\": \"Dune\",".into())
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn test_list_newest_first() {
    let server = create_test_server().await;

    let first = add(&server, json!({"title": "First", "author": "A", "year": 1990})).await;
    let second = add(&server, json!({"title": "Second", "author": "B", "year": 1991})).await;
    let third = add(&server, json!({"title": "Third", "author": "C", "year": 1992})).await;

    let listed: Vec<Value> = server.get("/api/books").await.json();
    let ids: Vec<&Value> = listed.iter().map(|b| &b["id"]).collect();
    assert_eq!(ids, vec![&third["id"], &second["id"], &first["id"]]);
}

#[tokio::test]
async fn test_update_merges_fields() {
    let server = create_test_server().await;
    let book = add(&server, json!({"title": "Dune", "author": "Frank Herbert", "year": 1965})).await;
    let path = format!("/api/books/{}", book["id"].as_str().unwrap());

    let response = server
        .put(&path)
        .json(&json!({"title": "Dune Messiah", "year": 1969, "id": "ignored"}))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();

    assert_eq!(updated["id"], book["id"]);
    assert_eq!(updated["title"], "Dune Messiah");
    assert_eq!(updated["author"], "Frank Herbert");
    assert_eq!(updated["year"], 1969);
    assert_eq!(updated["createdAt"], book["createdAt"]);
}

#[tokio::test]
async fn test_update_future_year_leaves_record_unchanged() {
    let server = create_test_server().await;
    let book = add(&server, json!({"title": "Dune", "author": "Frank Herbert", "year": 1965})).await;
    let path = format!("/api/books/{}", book["id"].as_str().unwrap());

    let response = server.put(&path).json(&json!({"year": 2100})).await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "Error updating book");
    assert_eq!(body["error"], "Year cannot be in the future");

    server.get(&path).await.assert_json(&book);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let server = create_test_server().await;

    let response = server.get("/api/books/not-a-real-id-format").await;
    response.assert_status_not_found();
    response.assert_json(&json!({"message": "Book not found"}));

    let unknown = format!("/api/books/{}", uuid::Uuid::now_v7());
    server.get(&unknown).await.assert_status_not_found();
    server
        .put(&unknown)
        .json(&json!({"title": "x"}))
        .await
        .assert_status_not_found();
    server.delete(&unknown).await.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_then_get() {
    let server = create_test_server().await;
    let book = add(&server, json!({"title": "Dune", "author": "Frank Herbert", "year": 1965})).await;
    let path = format!("/api/books/{}", book["id"].as_str().unwrap());

    let response = server.delete(&path).await;
    response.assert_status_ok();
    response.assert_json(&json!({"message": "Book removed", "book": book}));

    server.get(&path).await.assert_status_not_found();
}

#[tokio::test]
async fn test_clear_collection() {
    let server = create_test_server().await;

    let response = server.delete("/api/books").await;
    response.assert_status_ok();
    response.assert_json(&json!({"message": "All books deleted", "deleted": 0}));

    add(&server, json!({"title": "Dune", "author": "Frank Herbert", "year": 1965})).await;
    add(&server, json!({"title": "Emma", "author": "Jane Austen", "year": 1815})).await;

    let response = server.delete("/api/books").await;
    response.assert_json(&json!({"message": "All books deleted", "deleted": 2}));
    server.get("/api/books").await.assert_json(&json!([]));
}

#[tokio::test]
async fn test_production_hides_error_details() {
    let server = create_test_server_in(Environment::Production).await;

    let response = server
        .post("/api/books")
        .json(&json!({"title": "Dune", "author": "Frank Herbert", "year": 999}))
        .await;
    response.assert_status_bad_request();
    response.assert_json(&json!({"message": "Error adding book", "error": "An error occurred"}));

    let response = server.get("/api/books/nope").await;
    response.assert_json(&json!({"message": "Book not found"}));
}

#[tokio::test]
async fn test_openapi_document_lists_module_paths() {
    let server = create_test_server().await;

    let doc: Value = server.get("/docs/openapi.json").await.json();
    assert_eq!(doc["openapi"], "3.1.0");
    assert!(doc["paths"]["/api/books"]["post"].is_object());
    assert!(doc["paths"]["/api/books/{id}"]["put"].is_object());
    assert!(doc["paths"]["/api/external/weather"]["get"].is_object());
    assert!(doc["components"]["schemas"]["Book"].is_object());
}
