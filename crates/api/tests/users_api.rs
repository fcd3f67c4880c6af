//! `/users` validation, self-deletion and uniqueness.

mod common;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use common::{body_json, build_db_app, build_test_app, get, sample_document, send, token_for};
use npuwatch_api::auth::password::hash_password;
use npuwatch_api::error::AppError;
use npuwatch_db::models::user::{CreateUser, User};
use npuwatch_db::repositories::UserRepo;
use serde_json::json;
use sqlx::PgPool;

async fn create_user(pool: &PgPool, username: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        password_hash: hash_password("secret-123").expect("hashing should succeed"),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

#[tokio::test]
async fn self_deletion_is_rejected() {
    let app = build_test_app(sample_document(false));
    let token = token_for(7, "ops");
    let response = send(app.app(), Method::DELETE, "/api/v1/users/7", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "cannot delete current user");
}

#[tokio::test]
async fn non_numeric_user_id_is_400() {
    let app = build_test_app(sample_document(false));
    let token = token_for(7, "ops");
    let response = send(app.app(), Method::DELETE, "/api/v1/users/abc", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_validates_username_and_password() {
    let app = build_test_app(sample_document(false));
    let token = token_for(1, "admin");

    let long_name = "u".repeat(51);
    for body in [
        json!({"username": "   ", "password": "secret1"}),
        json!({"username": long_name, "password": "secret1"}),
        json!({"username": "ops", "password": "12345"}),
    ] {
        let response = send(
            app.app(),
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(body.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
    }
}

#[tokio::test]
async fn short_new_password_is_rejected() {
    let app = build_test_app(sample_document(false));
    let token = token_for(1, "admin");
    let response = send(
        app.app(),
        Method::PUT,
        "/api/v1/users/2/password",
        Some(&token),
        Some(json!({"password": "123"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "password must be at least 6 characters"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_self_delete_leaves_the_row_unchanged(pool: PgPool) {
    let user = create_user(&pool, "ops").await;
    let app = build_db_app(pool.clone());
    let token = token_for(user.id, "ops");

    let response = send(
        app.app(),
        Method::DELETE,
        &format!("/api/v1/users/{}", user.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "cannot delete current user");

    let after = UserRepo::find_by_id(&pool, user.id)
        .await
        .unwrap()
        .expect("row still present");
    assert_eq!(after.username, user.username);
    assert_eq!(after.password_hash, user.password_hash);
    assert_eq!(after.created_at, user.created_at);
    assert_eq!(after.updated_at, user.updated_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_another_user_removes_the_row(pool: PgPool) {
    let admin = create_user(&pool, "admin").await;
    let other = create_user(&pool, "viewer").await;
    let app = build_db_app(pool.clone());
    let token = token_for(admin.id, "admin");

    let response = send(
        app.app(),
        Method::DELETE,
        &format!("/api/v1/users/{}", other.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(UserRepo::find_by_id(&pool, other.id).await.unwrap().is_none());

    let response = get(app.app(), "/api/v1/users", Some(&token)).await;
    let users = body_json(response).await["data"].clone();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert!(users[0].get("passwordHash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_username_is_400(pool: PgPool) {
    let admin = create_user(&pool, "admin").await;
    let app = build_db_app(pool.clone());
    let token = token_for(admin.id, "admin");

    let response = send(
        app.app(),
        Method::POST,
        "/api/v1/users",
        Some(&token),
        Some(json!({"username": "admin", "password": "another-pass"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "username already exists");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unique_violation_from_a_racing_insert_is_400(pool: PgPool) {
    create_user(&pool, "twin").await;
    let input = CreateUser {
        username: "twin".into(),
        password_hash: "unused".into(),
    };
    let err = UserRepo::create(&pool, &input)
        .await
        .expect_err("second insert must violate the unique constraint");

    let response = AppError::Database(err).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "username already exists");
}
