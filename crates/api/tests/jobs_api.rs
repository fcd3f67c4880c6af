//! `/jobs` query validation and database error reporting.

mod common;

use axum::http::StatusCode;
use common::{admin_token, body_json, build_test_app, get, sample_document};

#[tokio::test]
async fn invalid_card_count_is_400() {
    let app = build_test_app(sample_document(false));
    let token = admin_token();
    let response = get(
        app.app(),
        "/api/v1/jobs/grouped?cardCounts=8,eight",
        Some(&token),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "invalid card count: eight");
}

#[tokio::test]
async fn grouped_list_reports_the_failing_step() {
    let app = build_test_app(sample_document(false));
    let token = admin_token();
    let response = get(
        app.app(),
        "/api/v1/jobs/grouped?cardCounts%5B%5D=unknown&page=2",
        Some(&token),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = body_json(response).await["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.starts_with("Database error: find filtered: "), "{message}");
}

#[tokio::test]
async fn static_segments_win_over_job_ids() {
    let app = build_test_app(sample_document(false));
    let token = admin_token();
    for uri in [
        "/api/v1/jobs/stats",
        "/api/v1/jobs/distinct-card-counts",
        "/api/v1/jobs/grouped/card-counts",
        "/api/v1/nodes/stats",
    ] {
        // Every route reaches its handler (and then the absent database);
        // none is mistaken for a lookup by id.
        let response = get(app.app(), uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        let message = body_json(response).await["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(!message.contains("not found"), "{uri}: {message}");
    }
}
