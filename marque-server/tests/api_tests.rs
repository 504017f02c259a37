//! Integration tests for the MarquePage HTTP API
//!
//! Each test builds the real router over an in-memory database and a
//! temporary cover directory, then drives it with `oneshot`.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use marque_common::auth::hash_token;
use marque_common::db::{init_memory_database, users};
use marque_server::covers::FsCoverStore;
use marque_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const ALICE: &str = "alice-test-token";
const BOB: &str = "bob-test-token";
const BOUNDARY: &str = "marque-test-boundary";

struct TestApp {
    app: Router,
    pool: SqlitePool,
    covers: TempDir,
}

impl TestApp {
    fn covers_root(&self) -> PathBuf {
        self.covers.path().to_path_buf()
    }
}

/// Test helper: router with two users (alice and bob)
async fn setup() -> TestApp {
    let pool = init_memory_database().await.expect("in-memory database");
    users::insert_user(&pool, "Alice", "alice@example.com", &hash_token(ALICE))
        .await
        .unwrap();
    users::insert_user(&pool, "Bob", "bob@example.com", &hash_token(BOB))
        .await
        .unwrap();

    let covers = tempfile::tempdir().unwrap();
    let state = AppState::new(
        pool.clone(),
        Arc::new(FsCoverStore::new(covers.path())),
        5120,
    );

    TestApp {
        app: build_router(state),
        pool,
        covers,
    }
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn send_multipart(
    app: &Router,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    cover: Option<&[u8]>,
) -> (StatusCode, Value) {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = cover {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"cover_image\"; filename=\"cover.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([30u8, 90, 160]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

async fn create_book(app: &Router, token: &str, body: Value) -> Value {
    let (status, json) = send(app, "POST", "/api/books", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
    json["data"].clone()
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let t = setup().await;
    let (status, body) = send(&t.app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "marque-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let t = setup().await;

    let (status, body) = send(&t.app, "GET", "/api/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unauthenticated.");

    let (status, _) = send(&t.app, "GET", "/api/books", Some("wrong-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user() {
    let t = setup().await;
    let (status, body) = send(&t.app, "GET", "/api/user", Some(ALICE), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("api_token_hash").is_none());
}

// =============================================================================
// Book Record Manager
// =============================================================================

#[tokio::test]
async fn test_create_book_defaults() {
    let t = setup().await;
    let book = create_book(
        &t.app,
        ALICE,
        json!({"title": "Dune", "author": "Frank Herbert", "total_pages": 412}),
    )
    .await;

    assert_eq!(book["title"], "Dune");
    assert_eq!(book["status"], "to_read");
    assert_eq!(book["current_page"], 0);
    assert_eq!(book["progress_percentage"], 0);
    assert_eq!(book["started_at"], Value::Null);
    assert_eq!(book["bookmarks"], json!([]));
    assert_eq!(book["quotes"], json!([]));
}

#[tokio::test]
async fn test_create_book_validation() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        "POST",
        "/api/books",
        Some(ALICE),
        Some(json!({"title": "", "author": "A", "rating": 6})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "The given data was invalid.");
    assert_eq!(body["errors"]["title"][0], "The title field is required.");
    assert_eq!(
        body["errors"]["rating"][0],
        "The rating field must not be greater than 5."
    );
    assert!(body["errors"].get("author").is_none());
}

#[tokio::test]
async fn test_create_with_initial_status_sets_dates() {
    let t = setup().await;

    let reading = create_book(
        &t.app,
        ALICE,
        json!({"title": "A", "author": "B", "status": "reading"}),
    )
    .await;
    assert_eq!(reading["started_at"], today());
    assert_eq!(reading["completed_at"], Value::Null);

    let done = create_book(
        &t.app,
        ALICE,
        json!({"title": "A", "author": "B", "status": "completed", "completed_at": "2025-03-01"}),
    )
    .await;
    assert_eq!(done["completed_at"], "2025-03-01");
    assert_eq!(done["started_at"], "2025-03-01");
}

#[tokio::test]
async fn test_other_users_books_are_not_found() {
    let t = setup().await;
    let book = create_book(&t.app, ALICE, json!({"title": "Mine", "author": "Me"})).await;
    let uri = format!("/api/books/{}", book["id"]);

    let (status, body) = send(&t.app, "GET", &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book not found");

    let (status, _) = send(&t.app, "PUT", &uri, Some(BOB), Some(json!({"title": "Stolen"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "PUT",
        &format!("{}/progress", uri),
        Some(BOB),
        Some(json!({"current_page": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "DELETE", &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "GET", &format!("{}/bookmarks", uri), Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Still intact for the owner
    let (status, body) = send(&t.app, "GET", &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Mine");
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let t = setup().await;
    let (status, _) = send(&t.app, "GET", "/api/books/abc", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let t = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/books")
        .header(header::AUTHORIZATION, format!("Bearer {}", ALICE))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_partial_update() {
    let t = setup().await;
    let book = create_book(
        &t.app,
        ALICE,
        json!({"title": "Dune", "author": "Frank Herbert", "isbn": "9780441013593"}),
    )
    .await;
    let uri = format!("/api/books/{}", book["id"]);

    let (status, body) = send(
        &t.app,
        "PATCH",
        &uri,
        Some(ALICE),
        Some(json!({"genre": "Science Fiction", "isbn": null, "status": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully");
    assert_eq!(body["data"]["title"], "Dune");
    assert_eq!(body["data"]["genre"], "Science Fiction");
    assert_eq!(body["data"]["isbn"], Value::Null);
    assert_eq!(body["data"]["status"], "to_read");

    let (status, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"title": null}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());
}

#[tokio::test]
async fn test_status_update_sets_dates_once() {
    let t = setup().await;
    let book = create_book(&t.app, ALICE, json!({"title": "A", "author": "B"})).await;
    let uri = format!("/api/books/{}", book["id"]);

    let (_, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"status": "reading"}))).await;
    assert_eq!(body["data"]["started_at"], today());

    // Backdate, then move back and forth: nothing may overwrite it
    sqlx::query("UPDATE books SET started_at = '2024-01-01'")
        .execute(&t.pool)
        .await
        .unwrap();
    send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"status": "to_read"}))).await;
    let (_, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"status": "reading"}))).await;
    assert_eq!(body["data"]["started_at"], "2024-01-01");

    let (_, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"status": "completed"}))).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["completed_at"], today());

    let (status, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"status": "done"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["status"][0],
        "The status field must be one of: to_read, reading, completed."
    );
}

#[tokio::test]
async fn test_progress_lifecycle() {
    let t = setup().await;
    let book = create_book(
        &t.app,
        ALICE,
        json!({"title": "A", "author": "B", "total_pages": 100}),
    )
    .await;
    let uri = format!("/api/books/{}/progress", book["id"]);

    let (status, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"current_page": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "reading");
    assert_eq!(body["data"]["progress_percentage"], 1);

    let (_, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"current_page": "50"}))).await;
    assert_eq!(body["data"]["current_page"], 50);
    assert_eq!(body["data"]["progress_percentage"], 50);

    let (_, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"current_page": 100}))).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["progress_percentage"], 100);

    sqlx::query("UPDATE books SET completed_at = '2024-06-01'")
        .execute(&t.pool)
        .await
        .unwrap();
    let (_, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"current_page": 120}))).await;
    assert_eq!(body["data"]["current_page"], 120);
    assert_eq!(body["data"]["progress_percentage"], 100);

    let (_, body) = send(&t.app, "GET", &format!("/api/books/{}", book["id"]), Some(ALICE), None).await;
    assert_eq!(body["data"]["completed_at"], "2024-06-01");
    assert_eq!(body["data"]["started_at"], today());
}

#[tokio::test]
async fn test_progress_validation() {
    let t = setup().await;
    let book = create_book(&t.app, ALICE, json!({"title": "A", "author": "B"})).await;
    let uri = format!("/api/books/{}/progress", book["id"]);

    let (status, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["current_page"][0], "The current page field is required.");

    let (status, body) = send(&t.app, "PUT", &uri, Some(ALICE), Some(json!({"current_page": -1}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["current_page"][0], "The current page field must be at least 0.");
}

// =============================================================================
// Query/Filter Builder
// =============================================================================

async fn seed_library(app: &Router) {
    for (title, author, genre, status) in [
        ("Dune", "Frank Herbert", "Science Fiction", "reading"),
        ("Dune Messiah", "Frank Herbert", "Science Fiction", "to_read"),
        ("The Hobbit", "J.R.R. Tolkien", "Fantasy", "completed"),
        ("Neuromancer", "William Gibson", "science fiction", "to_read"),
        ("100% Pure", "Someone Else", "Cooking", "to_read"),
    ] {
        create_book(
            app,
            ALICE,
            json!({"title": title, "author": author, "genre": genre, "status": status}),
        )
        .await;
    }
    create_book(app, BOB, json!({"title": "Dune (Bob's copy)", "author": "Frank Herbert"})).await;
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]["data"]
        .as_array()
        .expect("data.data array")
        .iter()
        .map(|b| b["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_list_is_scoped_and_newest_first() {
    let t = setup().await;
    seed_library(&t.app).await;

    let (status, body) = send(&t.app, "GET", "/api/books", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["per_page"], 15);
    assert_eq!(body["data"]["last_page"], 1);
    assert_eq!(
        titles(&body),
        vec!["100% Pure", "Neuromancer", "The Hobbit", "Dune Messiah", "Dune"]
    );
    assert!(body["data"]["data"][0]["bookmarks"].is_array());
}

#[tokio::test]
async fn test_list_search_and_filters() {
    let t = setup().await;
    seed_library(&t.app).await;

    let (_, body) = send(&t.app, "GET", "/api/books?search=DUNE", Some(ALICE), None).await;
    assert_eq!(titles(&body), vec!["Dune Messiah", "Dune"]);

    // Search covers genre too
    let (_, body) = send(&t.app, "GET", "/api/books?search=fiction", Some(ALICE), None).await;
    assert_eq!(body["data"]["total"], 3);

    // Genre filter is exact and case-sensitive
    let (_, body) = send(
        &t.app,
        "GET",
        "/api/books?genre=Science%20Fiction",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(titles(&body), vec!["Dune Messiah", "Dune"]);

    let (_, body) = send(
        &t.app,
        "GET",
        "/api/books?status=to_read&author=herbert",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(titles(&body), vec!["Dune Messiah"]);

    // Wildcards match literally
    let (_, body) = send(&t.app, "GET", "/api/books?search=%25", Some(ALICE), None).await;
    assert_eq!(titles(&body), vec!["100% Pure"]);
}

#[tokio::test]
async fn test_list_sorting_and_pagination() {
    let t = setup().await;
    seed_library(&t.app).await;

    let (_, body) = send(
        &t.app,
        "GET",
        "/api/books?sort=title&order=asc&per_page=2&page=2",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(titles(&body), vec!["Dune Messiah", "Neuromancer"]);
    assert_eq!(body["data"]["current_page"], 2);
    assert_eq!(body["data"]["last_page"], 3);
    assert_eq!(body["data"]["from"], 3);
    assert_eq!(body["data"]["to"], 4);

    let (status, body) = send(&t.app, "GET", "/api/books?page=9", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"], json!([]));
    assert_eq!(body["data"]["from"], Value::Null);

    let (status, body) = send(&t.app, "GET", "/api/books?sort=isbn", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["sort"].is_array());

    let (status, _) = send(&t.app, "GET", "/api/books?per_page=0", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&t.app, "GET", "/api/books?per_page=101", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["per_page"][0],
        "The per page field must not be greater than 100."
    );
}

#[tokio::test]
async fn test_list_search_folds_non_ascii_case() {
    let t = setup().await;
    create_book(
        &t.app,
        ALICE,
        json!({"title": "Élise et les ÉTOILES", "author": "Ørsted"}),
    )
    .await;
    create_book(&t.app, ALICE, json!({"title": "Dune", "author": "Frank Herbert"})).await;

    // étoiles
    let (_, body) = send(&t.app, "GET", "/api/books?search=%C3%A9toiles", Some(ALICE), None).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(titles(&body), vec!["Élise et les ÉTOILES"]);

    // ørsted
    let (_, body) = send(&t.app, "GET", "/api/books?author=%C3%B8rsted", Some(ALICE), None).await;
    assert_eq!(body["data"]["total"], 1);

    // ÉLISE
    let (_, body) = send(&t.app, "GET", "/api/books?search=%C3%89LISE", Some(ALICE), None).await;
    assert_eq!(body["data"]["total"], 1);
}

// =============================================================================
// Annotation Manager
// =============================================================================

#[tokio::test]
async fn test_bookmark_crud() {
    let t = setup().await;
    let book = create_book(&t.app, ALICE, json!({"title": "A", "author": "B"})).await;
    let base = format!("/api/books/{}/bookmarks", book["id"]);

    for page in [42, 7] {
        let (status, body) = send(
            &t.app,
            "POST",
            &base,
            Some(ALICE),
            Some(json!({"page_number": page, "color": "#FFAA00"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Bookmark created successfully");
    }

    let (_, body) = send(&t.app, "GET", &base, Some(ALICE), None).await;
    let pages: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["page_number"].as_i64().unwrap())
        .collect();
    assert_eq!(pages, vec![7, 42]);

    let id = body["data"][0]["id"].clone();
    let item = format!("{}/{}", base, id);

    let (status, body) = send(&t.app, "PATCH", &item, Some(ALICE), Some(json!({"note": "Good bit", "color": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["note"], "Good bit");
    assert_eq!(body["data"]["color"], Value::Null);
    assert_eq!(body["data"]["page_number"], 7);

    let (status, body) = send(&t.app, "POST", &base, Some(ALICE), Some(json!({"page_number": 0, "color": "orange"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["color"][0], "The color field format is invalid.");
    assert!(body["errors"]["page_number"].is_array());

    let (status, body) = send(&t.app, "DELETE", &item, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bookmark deleted successfully");

    let (status, _) = send(&t.app, "GET", &item, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_annotation_under_wrong_book_is_not_found() {
    let t = setup().await;
    let a = create_book(&t.app, ALICE, json!({"title": "A", "author": "B"})).await;
    let b = create_book(&t.app, ALICE, json!({"title": "C", "author": "D"})).await;

    let (_, body) = send(
        &t.app,
        "POST",
        &format!("/api/books/{}/quotes", a["id"]),
        Some(ALICE),
        Some(json!({"content": "A line worth keeping"})),
    )
    .await;
    let quote_id = body["data"]["id"].clone();

    let (status, body) = send(
        &t.app,
        "GET",
        &format!("/api/books/{}/quotes/{}", b["id"], quote_id),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Quote not found for this book");

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/books/{}/quotes/{}", b["id"], quote_id),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quote_crud() {
    let t = setup().await;
    let book = create_book(&t.app, ALICE, json!({"title": "A", "author": "B"})).await;
    let base = format!("/api/books/{}/quotes", book["id"]);

    let (status, body) = send(&t.app, "POST", &base, Some(ALICE), Some(json!({"content": ""}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["content"][0], "The content field is required.");

    let (_, first) = send(&t.app, "POST", &base, Some(ALICE), Some(json!({"content": "First", "page_number": 3}))).await;
    let (_, second) = send(&t.app, "POST", &base, Some(ALICE), Some(json!({"content": "Second"}))).await;

    let (_, body) = send(&t.app, "GET", &base, Some(ALICE), None).await;
    assert_eq!(body["data"][0]["id"], second["data"]["id"]);
    assert_eq!(body["data"][1]["id"], first["data"]["id"]);

    let item = format!("{}/{}", base, first["data"]["id"]);
    let (status, body) = send(&t.app, "PUT", &item, Some(ALICE), Some(json!({"context": "Opening", "page_number": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "First");
    assert_eq!(body["data"]["context"], "Opening");
    assert_eq!(body["data"]["page_number"], Value::Null);

    // Attached to the book view, newest first
    let (_, body) = send(&t.app, "GET", &format!("/api/books/{}", book["id"]), Some(ALICE), None).await;
    assert_eq!(body["data"]["quotes"].as_array().map(Vec::len), Some(2));
}

// =============================================================================
// Covers and deletion
// =============================================================================

#[tokio::test]
async fn test_cover_upload_resize_serve_and_delete() {
    let t = setup().await;

    let (status, body) = send_multipart(
        &t.app,
        "/api/books",
        ALICE,
        &[("title", "Dune"), ("author", "Frank Herbert"), ("total_pages", "412")],
        Some(&png(800, 1200)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["total_pages"], 412);

    let cover = body["data"]["cover_image"].as_str().unwrap().to_string();
    assert!(cover.starts_with("books/") && cover.ends_with(".jpg"));
    let stored = t.covers_root().join(&cover);
    let decoded = image::open(&stored).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 600));

    // Served without authentication
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/storage/{}", cover))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let book_id = body["data"]["id"].clone();
    send(
        &t.app,
        "POST",
        &format!("/api/books/{}/bookmarks", book_id),
        Some(ALICE),
        Some(json!({"page_number": 12})),
    )
    .await;

    let uri = format!("/api/books/{}", book_id);
    let (status, body) = send(&t.app, "DELETE", &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book deleted successfully");
    assert!(!stored.exists());

    let (status, _) = send(&t.app, "GET", &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let bookmarks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks")
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(bookmarks, 0);
}

#[tokio::test]
async fn test_cover_replacement_removes_old_file() {
    let t = setup().await;
    let (_, body) = send_multipart(
        &t.app,
        "/api/books",
        ALICE,
        &[("title", "A"), ("author", "B")],
        Some(&png(100, 100)),
    )
    .await;
    let old = t.covers_root().join(body["data"]["cover_image"].as_str().unwrap());
    assert!(old.exists());

    let uri = format!("/api/books/{}", body["data"]["id"]);
    let (status, body) = send_multipart(&t.app, &uri, ALICE, &[("genre", "Poetry")], Some(&png(50, 80))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["genre"], "Poetry");

    let new = t.covers_root().join(body["data"]["cover_image"].as_str().unwrap());
    assert!(new.exists());
    assert!(!old.exists());
}

#[tokio::test]
async fn test_invalid_cover_rejected_without_side_effects() {
    let t = setup().await;
    let (status, body) = send_multipart(
        &t.app,
        "/api/books",
        ALICE,
        &[("title", "A"), ("author", "B")],
        Some(b"not an image at all"),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["cover_image"][0], "The cover image field must be an image.");

    // A PNG header with the image data cut off passes the type check but
    // cannot be decoded
    let truncated = png(100, 100)[..60].to_vec();
    let (status, body) = send_multipart(
        &t.app,
        "/api/books",
        ALICE,
        &[("title", "A"), ("author", "B")],
        Some(&truncated),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
    assert_eq!(body["success"], false);

    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(books, 0);
    assert_eq!(std::fs::read_dir(t.covers_root()).unwrap().count(), 0);
}
