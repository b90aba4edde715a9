use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bid status. Terminal once accepted or rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Submitted,
    Accepted,
    Rejected,
}

impl Default for BidStatus {
    fn default() -> Self {
        Self::Submitted
    }
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(Self::Submitted),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Bid entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub developer_id: Uuid,
    pub solution_id: Option<Uuid>,
    pub proposal: String,
    pub price: i64, // cents
    pub currency: String,
    pub timeline: String,
    pub status: BidStatus,
    /// Set only when this bid wins an award
    pub project_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for submitting a bid
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBidRequest {
    #[serde(default)]
    pub solution_id: Option<Uuid>,
    pub proposal: String,
    pub price: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub timeline: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Response DTO for bid
#[derive(Debug, Clone, Serialize)]
pub struct BidResponse {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub developer_id: Uuid,
    pub solution_id: Option<Uuid>,
    pub proposal: String,
    pub price: i64,
    pub currency: String,
    pub timeline: String,
    pub status: BidStatus,
    pub project_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
}

impl From<Bid> for BidResponse {
    fn from(b: Bid) -> Self {
        Self {
            id: b.id,
            rfp_id: b.rfp_id,
            developer_id: b.developer_id,
            solution_id: b.solution_id,
            proposal: b.proposal,
            price: b.price,
            currency: b.currency,
            timeline: b.timeline,
            status: b.status,
            project_id: b.project_id,
            submitted_at: b.submitted_at,
        }
    }
}
