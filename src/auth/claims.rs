use serde::{Deserialize, Serialize};

/// Claims carried by an identity-provider JWT.
///
/// Besides the registered claims, tokens carry the portal `role` that
/// determines what the user may do (see [`ActorRole`](super::ActorRole)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,
    pub aud: String,
    pub iss: String,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    /// Portal role: municipality, developer or integrator
    #[serde(default)]
    pub role: Option<String>,
}
