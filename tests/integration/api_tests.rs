//! API integration tests against a running server
//!
//! Expects an `admin` account with password `admin`.

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn login(client: &Client, username: &str, password: &str) -> Value {
    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse login response")
}

async fn admin_token(client: &Client) -> String {
    let body = login(client, "admin", "admin").await;
    body["access_token"].as_str().expect("No token in response").to_string()
}

/// Sign up a fresh regular user and return its access token
async fn regular_token(client: &Client) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    let username = format!("reader{}", suffix);

    let response = client
        .post(format!("{}/users/signup", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "secret",
            "email": format!("{}@example.com", username)
        }))
        .send()
        .await
        .expect("Failed to send signup request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = login(client, &username, "secret").await;
    body["access_token"].as_str().expect("No token in response").to_string()
}

/// Create an author and a book, returning the book id
async fn create_book(client: &Client, token: &str) -> i64 {
    let suffix: u32 = rand::thread_rng().gen();

    let author: Value = client
        .post(format!("{}/authors", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "name": format!("Author {}", suffix) }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let isbn = format!("{:013}", rand::thread_rng().gen_range(0..10_000_000_000_000u64));
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": format!("Book {}", suffix),
            "isbn": isbn,
            "author_id": author["id"],
            "published_date": "2020-01-01"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["available"], true);
    book["id"].as_i64().expect("No book id")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_returns_token_pair() {
    let client = Client::new();

    let body = login(&client, "admin", "admin").await;
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_refresh_token_not_accepted_as_access() {
    let client = Client::new();
    let body = login(&client, "admin", "admin").await;
    let refresh = body["refresh_token"].as_str().expect("No refresh token");

    let response = client
        .get(format!("{}/users/me", BASE_URL))
        .bearer_auth(refresh)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{}/users/refresh", BASE_URL))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books/1/borrow", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_regular_user_cannot_create_books() {
    let client = Client::new();
    let token = regular_token(&client).await;

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Nobody" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin).await;

    let alice = regular_token(&client).await;
    let bob = regular_token(&client).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["available"], false);

    // Held by someone else
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Bob never held it
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let held: Value = client
        .get(format!("{}/borrowers/me/books", BASE_URL))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(held["books"].as_array().map(Vec::len), Some(1));

    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["available"], true);
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let reader = regular_token(&client).await;

    for _ in 0..3 {
        let book_id = create_book(&client, &admin).await;
        let response = client
            .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
            .bearer_auth(&reader)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let book_id = create_book(&client, &admin).await;
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_borrow_unknown_book() {
    let client = Client::new();
    let reader = regular_token(&client).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, i32::MAX))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_accessible_ticket_ids_sorted() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/tickets/accessible-ids", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let ids: Vec<i64> = response.json().await.expect("Failed to parse response");
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
#[ignore]
async fn test_notification_rules() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let rules: Vec<Value> = client
        .get(format!("{}/notifications/rules", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(rules.len(), 11);
    assert!(rules.iter().any(|rule| rule["event"] == "task_assigned"));
}
