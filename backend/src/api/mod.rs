pub mod auth;
pub mod health;
pub mod organizations;

use axum::{routing::get, Router};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        // Auth
        .route("/me", get(auth::me))
        // Organizations
        .route("/organizations", get(organizations::list).post(organizations::create))
        .route("/organizations/search/:query", get(organizations::search))
        .route(
            "/organizations/:id",
            get(organizations::get)
                .put(organizations::update)
                .delete(organizations::delete),
        )
        .with_state(state)
}
