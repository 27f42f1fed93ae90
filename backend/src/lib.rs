pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

use auth::TokenDecoder;
use store::DynStore;

/// Shared application state available to all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub tokens: TokenDecoder,
}

impl axum::extract::FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl axum::extract::FromRef<AppState> for TokenDecoder {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
