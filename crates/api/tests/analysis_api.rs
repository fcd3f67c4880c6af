//! `/jobs/{job_id}/analyze` and `/jobs/{job_id}/analysis` behaviour.

mod common;

use axum::http::{Method, StatusCode};
use common::{admin_token, body_json, build_db_app, build_test_app, get, sample_document, send};
use npuwatch_db::repositories::JobAnalysisRepo;
use serde_json::json;
use sqlx::PgPool;

#[tokio::test]
async fn disabled_llm_fails_before_touching_the_database() {
    let app = build_test_app(sample_document(false));
    let token = admin_token();
    let response = send(
        app.app(),
        Method::POST,
        "/api/v1/jobs/job-123/analyze",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], 500);
    let message = json["message"].as_str().unwrap();
    assert!(message.contains("not enabled"), "{message}");
    // A database round trip would have produced a database error instead.
    assert!(!message.contains("Database error"), "{message}");
}

#[tokio::test]
async fn analyze_requires_a_token() {
    let app = build_test_app(sample_document(true));
    let response = send(
        app.app(),
        Method::POST,
        "/api/v1/jobs/job-123/analyze",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn enabling_at_runtime_moves_past_the_enabled_check() {
    let app = build_test_app(sample_document(false));
    let token = admin_token();
    let response = send(
        app.app(),
        Method::PUT,
        "/api/v1/config/llm",
        Some(&token),
        Some(serde_json::json!({"enabled": true})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Now the pipeline proceeds to load the job, which hits the (absent)
    // database.
    let response = send(
        app.app(),
        Method::POST,
        "/api/v1/jobs/job-123/analyze",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = body_json(response).await["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("Database error: find job: "), "{message}");
}

#[tokio::test]
async fn unknown_model_is_rejected_before_touching_the_database() {
    let app = build_test_app(sample_document(true));
    let token = admin_token();
    let response = send(
        app.app(),
        Method::POST,
        "/api/v1/jobs/job-123/analyze",
        Some(&token),
        Some(serde_json::json!({"modelId": "missing"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "AI analysis failed: model not found: missing");
}

#[tokio::test]
async fn malformed_analyze_body_is_a_bad_request() {
    let app = build_test_app(sample_document(true));
    let token = admin_token();
    let response = send(
        app.app(),
        Method::POST,
        "/api/v1/jobs/job-123/analyze",
        Some(&token),
        Some(serde_json::json!({"modelId": 7})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = body_json(response).await["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("invalid request body"), "{message}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_analysis_keeps_one_row_per_job(pool: PgPool) {
    let first = json!({"summary": "first pass", "issues": []}).to_string();
    let second = json!({"summary": "second pass", "issues": []}).to_string();

    JobAnalysisRepo::upsert(&pool, "job-7", "completed", &first)
        .await
        .unwrap();
    let stored = JobAnalysisRepo::upsert(&pool, "job-7", "completed", &second)
        .await
        .unwrap();
    assert_eq!(stored.result, second);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_analysis WHERE job_id = $1")
        .bind("job-7")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let app = build_db_app(pool);
    let token = admin_token();
    let response = get(app.app(), "/api/v1/jobs/job-7/analysis", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["summary"], "second pass");

    let response = get(app.app(), "/api/v1/jobs/job-8/analysis", Some(&token)).await;
    assert!(body_json(response).await["data"].is_null());
}
