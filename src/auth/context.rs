use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::Claims;

/// Portal role carried by every authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Municipality,
    Developer,
    Integrator,
}

impl FromStr for ActorRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "municipality" => Ok(Self::Municipality),
            "developer" => Ok(Self::Developer),
            "integrator" => Ok(Self::Integrator),
            _ => Err(()),
        }
    }
}

/// The acting user, passed explicitly into every procurement operation.
///
/// Routes build this from the verified JWT; tests construct it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn municipality(id: Uuid) -> Self {
        Self::new(id, ActorRole::Municipality)
    }

    pub fn developer(id: Uuid) -> Self {
        Self::new(id, ActorRole::Developer)
    }
}

/// Authenticated user context extracted from the JWT.
/// Attached to requests by the `RequireAuth` extractor.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The acting user (id from `sub`, role from the `role` claim)
    pub actor: Actor,

    /// User email if available
    pub email: Option<String>,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: String,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        let role = claims
            .role
            .as_deref()
            .ok_or("Token is missing the portal role")?
            .parse::<ActorRole>()
            .map_err(|_| "Unknown portal role in token")?;

        Ok(Self {
            actor: Actor::new(id, role),
            email: claims.email.clone(),
            issuer: claims.iss.clone(),
            audience: claims.aud.clone(),
        })
    }
}
