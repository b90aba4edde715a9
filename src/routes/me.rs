use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{ActorRole, RequireAuth};

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub role: ActorRole,
    pub email: Option<String>,
    pub issuer: String,
    pub audience: String,
}

/// Get current authenticated user info
pub async fn get_me(auth: RequireAuth) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: auth.actor.id,
        role: auth.actor.role,
        email: auth.email.clone(),
        issuer: auth.issuer.clone(),
        audience: auth.audience.clone(),
    })
}
