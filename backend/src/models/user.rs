use serde::Serialize;

use crate::auth::Identity;

/// Profile returned by `/me`.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
}

impl From<Identity> for UserProfile {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.user_id,
            email: identity.email,
        }
    }
}
