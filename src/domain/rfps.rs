use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smart-city solution category for an RFP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RfpCategory {
    Mobility,
    Energy,
    Water,
    Waste,
    PublicSafety,
    Lighting,
    Environment,
    Connectivity,
    Governance,
    Other,
}

impl Default for RfpCategory {
    fn default() -> Self {
        Self::Other
    }
}

/// RFP status. Only ever advances draft -> published -> closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RfpStatus {
    Draft,
    Published,
    Closed,
}

impl Default for RfpStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl RfpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Weighted evaluation criterion attached to an RFP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationCriterion {
    pub name: String,
    /// Relative weight, interpreted by the evaluating municipality
    pub weight: u16,
}

/// RFP entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rfp {
    pub id: Uuid,
    pub municipality_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub category: RfpCategory,
    pub budget_min: Option<i64>, // cents
    pub budget_max: Option<i64>, // cents
    pub currency: String,
    pub deadline: Option<DateTime<Utc>>,
    pub requirements: Vec<String>,
    pub evaluation_criteria: Vec<EvaluationCriterion>,
    pub status: RfpStatus,
    pub published_at: Option<DateTime<Utc>>,
    /// Set only when the RFP closes through an award
    pub selected_bid_id: Option<Uuid>,
    /// Set only when the RFP closes through an award
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating an RFP draft
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRfpRequest {
    pub municipality_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: RfpCategory,
    #[serde(default)]
    pub budget_min: Option<i64>,
    #[serde(default)]
    pub budget_max: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub evaluation_criteria: Vec<EvaluationCriterion>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Response DTO for RFP
#[derive(Debug, Clone, Serialize)]
pub struct RfpResponse {
    pub id: Uuid,
    pub municipality_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: RfpCategory,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub currency: String,
    pub deadline: Option<DateTime<Utc>>,
    pub requirements: Vec<String>,
    pub evaluation_criteria: Vec<EvaluationCriterion>,
    pub status: RfpStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub selected_bid_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rfp> for RfpResponse {
    fn from(r: Rfp) -> Self {
        Self {
            id: r.id,
            municipality_id: r.municipality_id,
            title: r.title,
            description: r.description,
            category: r.category,
            budget_min: r.budget_min,
            budget_max: r.budget_max,
            currency: r.currency,
            deadline: r.deadline,
            requirements: r.requirements,
            evaluation_criteria: r.evaluation_criteria,
            status: r.status,
            published_at: r.published_at,
            selected_bid_id: r.selected_bid_id,
            project_id: r.project_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
