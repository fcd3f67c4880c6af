use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list).post(users::create))
        .route("/{id}/password", put(users::update_password))
        .route("/{id}", delete(users::delete))
}
