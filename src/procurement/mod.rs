//! The procurement lifecycle: RFP -> bids -> award -> project.
//!
//! Everything here takes the acting user as an explicit [`Actor`] and runs
//! against the [`ProcurementStore`](crate::store::ProcurementStore)
//! abstraction. The award coordinator is the only component with a
//! multi-entity commit; see [`award`] for its protocol.

pub mod award;
pub mod error;
pub mod lifecycle;
pub mod materializer;
pub mod registry;

pub use award::{AwardCoordinator, AwardOutcome};
pub use error::{ProcurementError, ProcurementResult};
pub use lifecycle::RfpLifecycle;
pub use registry::BidRegistry;

use crate::auth::{Actor, ActorRole};
use crate::domain::Rfp;

/// An RFP may only be published or awarded by the municipality that owns it.
fn authorize_owner(actor: &Actor, rfp: &Rfp) -> ProcurementResult<()> {
    if actor.role != ActorRole::Municipality {
        return Err(ProcurementError::Authorization(
            "only a municipality can manage an RFP".to_string(),
        ));
    }
    if actor.id != rfp.created_by && actor.id != rfp.municipality_id {
        return Err(ProcurementError::Authorization(
            "RFP belongs to a different municipality".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    use crate::auth::Actor;
    use crate::domain::{
        Bid, BidStatus, CreateRfpRequest, EvaluationCriterion, Rfp, RfpCategory, SubmitBidRequest,
    };
    use crate::store::MemoryStore;

    pub fn store() -> (Arc<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (Arc::new(store.clone()), store)
    }

    pub fn create_request(municipality_id: Uuid) -> CreateRfpRequest {
        CreateRfpRequest {
            municipality_id,
            title: "City-wide air quality sensing".to_string(),
            description: "Deploy and operate an air quality sensor network".to_string(),
            category: RfpCategory::Environment,
            budget_min: Some(100_000),
            budget_max: Some(500_000),
            currency: "USD".to_string(),
            deadline: Some(Utc::now() + Duration::days(7)),
            requirements: vec!["LoRaWAN backhaul".to_string(), "Open data API".to_string()],
            evaluation_criteria: vec![
                EvaluationCriterion {
                    name: "price".to_string(),
                    weight: 40,
                },
                EvaluationCriterion {
                    name: "maintenance plan".to_string(),
                    weight: 60,
                },
            ],
        }
    }

    pub fn bid_request(price: i64) -> SubmitBidRequest {
        SubmitBidRequest {
            solution_id: Some(Uuid::new_v4()),
            proposal: "Sensor mesh with solar-powered nodes".to_string(),
            price,
            currency: "USD".to_string(),
            timeline: "16 weeks".to_string(),
        }
    }

    /// A published RFP inserted directly, bypassing the lifecycle. Used to
    /// set up states the lifecycle would not produce (e.g. past deadlines).
    pub fn published_rfp(owner: &Actor, deadline_offset: Duration) -> Rfp {
        let now = Utc::now();
        Rfp {
            id: Uuid::new_v4(),
            municipality_id: owner.id,
            created_by: owner.id,
            title: "Smart parking guidance".to_string(),
            description: "Occupancy detection for downtown parking".to_string(),
            category: RfpCategory::Mobility,
            budget_min: Some(100_000),
            budget_max: Some(500_000),
            currency: "USD".to_string(),
            deadline: Some(now + deadline_offset),
            requirements: vec![],
            evaluation_criteria: vec![],
            status: crate::domain::RfpStatus::Published,
            published_at: Some(now),
            selected_bid_id: None,
            project_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn submitted_bid(rfp_id: Uuid, developer: &Actor, price: i64) -> Bid {
        let now = Utc::now();
        Bid {
            id: Uuid::new_v4(),
            rfp_id,
            developer_id: developer.id,
            solution_id: Some(Uuid::new_v4()),
            proposal: "Camera-based occupancy detection".to_string(),
            price,
            currency: "USD".to_string(),
            timeline: "10 weeks".to_string(),
            status: BidStatus::Submitted,
            project_id: None,
            submitted_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}
