use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project status. Awarded projects always start in planning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Planning
    }
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Initial project content derived from an RFP and its winning bid.
///
/// Produced by the materializer; the award coordinator turns it into a
/// persisted `Project`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFields {
    pub rfp_id: Uuid,
    pub winning_bid_id: Uuid,
    pub solution_id: Option<Uuid>,
    pub municipality_id: Uuid,
    pub developer_id: Uuid,
    pub budget: i64, // cents
    pub currency: String,
    pub status: ProjectStatus,
}

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub winning_bid_id: Uuid,
    pub solution_id: Option<Uuid>,
    pub municipality_id: Uuid,
    pub developer_id: Uuid,
    pub budget: i64, // cents
    pub currency: String,
    pub status: ProjectStatus,
    /// Caller-supplied idempotency key recorded at award time
    pub award_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Assigns an identity and timestamps to materialized project fields.
    pub fn from_fields(fields: ProjectFields, award_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            rfp_id: fields.rfp_id,
            winning_bid_id: fields.winning_bid_id,
            solution_id: fields.solution_id,
            municipality_id: fields.municipality_id,
            developer_id: fields.developer_id,
            budget: fields.budget,
            currency: fields.currency,
            status: fields.status,
            award_key,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Response DTO for project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub winning_bid_id: Uuid,
    pub solution_id: Option<Uuid>,
    pub municipality_id: Uuid,
    pub developer_id: Uuid,
    pub budget: i64,
    pub currency: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            rfp_id: p.rfp_id,
            winning_bid_id: p.winning_bid_id,
            solution_id: p.solution_id,
            municipality_id: p.municipality_id,
            developer_id: p.developer_id,
            budget: p.budget,
            currency: p.currency,
            status: p.status,
            created_at: p.created_at,
        }
    }
}
