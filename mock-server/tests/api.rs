use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Send one request through a clone of `app`; clones share state.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json");
            body.to_string()
        }
        None => String::new(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = body_bytes(resp).await;
    // Extractor rejections are plain text.
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

async fn sign_up(app: &Router, username: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users/signup",
        None,
        Some(json!({ "username": username, "email": email, "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap().to_string();
    let id = body["data"]["user"]["_id"].as_str().unwrap().to_string();
    (token, id)
}

async fn seeded() -> (Router, String) {
    let state = AppState::new();
    let community = state.seed_community("rust", "systems programming").await;
    (app_with(state), community)
}

// --- auth ---

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/communities", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = send(&app, "GET", "/api/v1/posts", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_then_sign_in() {
    let app = app();
    let (_, id) = sign_up(&app, "ann", "ann@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/signin",
        None,
        Some(json!({ "email": "ann@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["_id"], id.as_str());
    assert!(body["data"]["user"].get("password").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_sign_up_conflicts() {
    let app = app();
    sign_up(&app, "ann", "ann@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/signup",
        None,
        Some(json!({ "username": "other", "email": "ann@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = app();
    sign_up(&app, "ann", "ann@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/signin",
        None,
        Some(json!({ "email": "ann@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_missing_field_is_422() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/signup",
        None,
        Some(json!({ "email": "a@b.c" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.as_str().unwrap().contains("username"));
}

// --- users ---

#[tokio::test]
async fn user_envelope_and_self_update() {
    let app = app();
    let (token, id) = sign_up(&app, "ann", "ann@example.com").await;
    let (_, other) = sign_up(&app, "bob", "bob@example.com").await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/users/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "ann");
    assert_eq!(body["data"]["user"]["upvotedComments"], json!([]));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/users/{id}"),
        Some(&token),
        Some(json!({ "about": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["about"], "hi");

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/users/{other}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/v1/users/missing", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_yourself_revokes_tokens() {
    let app = app();
    let (token, id) = sign_up(&app, "ann", "ann@example.com").await;

    let (status, body) = send(&app, "DELETE", &format!("/api/v1/users/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, "GET", "/api/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- communities and posts ---

#[tokio::test]
async fn communities_are_listed_in_documents_envelope() {
    let (app, community) = seeded().await;
    let (token, _) = sign_up(&app, "ann", "ann@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/communities", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let docs = body["data"]["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["_id"], community.as_str());

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/communities/{community}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "rust");
}

#[tokio::test]
async fn posts_filter_by_community_and_only_creator_deletes() {
    let (app, community) = seeded().await;
    let (ann, ann_id) = sign_up(&app, "ann", "ann@example.com").await;
    let (bob, _) = sign_up(&app, "bob", "bob@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/posts",
        Some(&ann),
        Some(json!({
            "title": "T",
            "description": "D",
            "mediaURLs": ["http://x/y.jpg"],
            "community": community,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = body["data"]["_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["creator"]["_id"], ann_id.as_str());
    assert_eq!(body["data"]["mediaURLs"][0], "http://x/y.jpg");

    let uri = format!("/api/v1/posts?community={community}");
    let (_, body) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(body["data"]["documents"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/v1/posts?community=elsewhere", Some(&bob), None).await;
    assert!(body["data"]["documents"].as_array().unwrap().is_empty());

    let post_uri = format!("/api/v1/posts/{post_id}");
    let (status, _) = send(&app, "DELETE", &post_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &post_uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &post_uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_in_unknown_community_is_404() {
    let app = app();
    let (token, _) = sign_up(&app, "ann", "ann@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/posts",
        Some(&token),
        Some(json!({ "title": "T", "description": "", "mediaURLs": [], "community": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_votes_keep_one_direction_per_user() {
    let (app, community) = seeded().await;
    let (token, user_id) = sign_up(&app, "ann", "ann@example.com").await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/posts",
        Some(&token),
        Some(json!({ "title": "T", "description": "", "mediaURLs": [], "community": community })),
    )
    .await;
    let post_id = body["data"]["_id"].as_str().unwrap().to_string();

    let up = format!("/api/v1/posts/{post_id}/upvote");
    let down = format!("/api/v1/posts/{post_id}/downvote");

    let (status, body) = send(&app, "POST", &up, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((body["data"]["upvotes"].as_i64(), body["data"]["downvotes"].as_i64()), (Some(1), Some(0)));

    let (_, body) = send(&app, "POST", &up, Some(&token), None).await;
    assert_eq!(body["data"]["upvotes"], 1);

    let (_, body) = send(&app, "POST", &down, Some(&token), None).await;
    assert_eq!((body["data"]["upvotes"].as_i64(), body["data"]["downvotes"].as_i64()), (Some(0), Some(1)));
    assert_eq!(body["data"]["score"], -1);

    let (_, body) = send(&app, "GET", &format!("/api/v1/users/{user_id}"), Some(&token), None).await;
    assert_eq!(body["data"]["user"]["downvotedPosts"], json!([post_id]));
    assert_eq!(body["data"]["user"]["upvotedPosts"], json!([]));
}

// --- comments ---

#[tokio::test]
async fn comment_lifecycle() {
    let (app, community) = seeded().await;
    let (token, user_id) = sign_up(&app, "ann", "ann@example.com").await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/posts",
        Some(&token),
        Some(json!({ "title": "T", "description": "", "mediaURLs": [], "community": community })),
    )
    .await;
    let post_id = body["data"]["_id"].as_str().unwrap().to_string();
    let comments_uri = format!("/api/v1/posts/{post_id}/comments");

    // no comments yet
    let (status, _) = send(&app, "GET", &comments_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &comments_uri,
        Some(&token),
        Some(json!({ "content": "  ", "parent": post_id, "creator": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &comments_uri,
        Some(&token),
        Some(json!({ "content": "first", "parent": post_id, "creator": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["data"]["_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["creator"]["username"], "ann");
    assert!(body["data"]["createdAt"].is_string());

    let (status, body) = send(&app, "GET", &comments_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["documents"][0]["content"], "first");

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/v1/comments/{comment_id}/downvote"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"]["downvotes"], 1);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/comments/{comment_id}"),
        Some(&token),
        Some(json!({ "content": "edited" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "edited");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/comments/{comment_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &comments_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
