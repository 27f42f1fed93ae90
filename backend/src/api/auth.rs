use axum::Json;

use crate::{auth::Identity, models::user::UserProfile};

pub async fn me(identity: Identity) -> Json<UserProfile> {
    Json(UserProfile::from(identity))
}
