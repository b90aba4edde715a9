//! RFP lifecycle manager.
//!
//! Owns RFP creation and the draft -> published transition. No other
//! component moves an RFP to published, and only the award coordinator
//! moves one to closed.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{Actor, ActorRole};
use crate::domain::{CreateRfpRequest, Rfp, RfpStatus};
use crate::store::{CasOutcome, ProcurementStore, RfpTransition};

use super::{authorize_owner, ProcurementError, ProcurementResult};

#[derive(Clone)]
pub struct RfpLifecycle {
    store: Arc<dyn ProcurementStore>,
}

impl RfpLifecycle {
    pub fn new(store: Arc<dyn ProcurementStore>) -> Self {
        Self { store }
    }

    /// Creates an RFP in `draft`. Only required-field checks here; budget and
    /// deadline rules are enforced at publish time.
    pub async fn create_draft(
        &self,
        actor: &Actor,
        req: CreateRfpRequest,
    ) -> ProcurementResult<Rfp> {
        if actor.role != ActorRole::Municipality {
            return Err(ProcurementError::Authorization(
                "only a municipality can create an RFP".to_string(),
            ));
        }
        if req.title.trim().is_empty() {
            return Err(ProcurementError::validation("title must not be empty"));
        }
        if req.description.trim().is_empty() {
            return Err(ProcurementError::validation("description must not be empty"));
        }

        let now = Utc::now();
        let rfp = Rfp {
            id: Uuid::new_v4(),
            municipality_id: req.municipality_id,
            created_by: actor.id,
            title: req.title,
            description: req.description,
            category: req.category,
            budget_min: req.budget_min,
            budget_max: req.budget_max,
            currency: req.currency,
            deadline: req.deadline,
            requirements: req.requirements,
            evaluation_criteria: req.evaluation_criteria,
            status: RfpStatus::Draft,
            published_at: None,
            selected_bid_id: None,
            project_id: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_rfp(&rfp).await?;

        tracing::info!(rfp_id = %rfp.id, municipality_id = %rfp.municipality_id, "RFP draft created");
        Ok(rfp)
    }

    /// Publishes a draft RFP, opening its bidding window.
    pub async fn publish(&self, actor: &Actor, rfp_id: Uuid) -> ProcurementResult<Rfp> {
        let rfp = self
            .store
            .get_rfp(rfp_id)
            .await?
            .ok_or_else(|| ProcurementError::validation("unknown RFP"))?;

        authorize_owner(actor, &rfp)?;

        if rfp.status != RfpStatus::Draft {
            return Err(ProcurementError::state_conflict(format!(
                "cannot publish an RFP in status {}",
                rfp.status.as_str()
            )));
        }

        if let (Some(min), Some(max)) = (rfp.budget_min, rfp.budget_max) {
            if min > max {
                return Err(ProcurementError::validation(
                    "budget_min must not exceed budget_max",
                ));
            }
        }

        let now = Utc::now();
        let deadline = rfp
            .deadline
            .ok_or_else(|| ProcurementError::validation("RFP has no deadline"))?;
        if deadline <= now {
            return Err(ProcurementError::validation(
                "deadline must be in the future",
            ));
        }

        match self
            .store
            .update_rfp_if_status(
                rfp_id,
                RfpStatus::Draft,
                RfpTransition::Publish { published_at: now },
            )
            .await?
        {
            CasOutcome::Applied => {}
            // Lost a race with another publish of the same draft
            CasOutcome::Conflict => {
                return Err(ProcurementError::state_conflict(
                    "RFP is no longer in draft",
                ));
            }
        }

        tracing::info!(rfp_id = %rfp_id, deadline = %deadline, "RFP published");

        self.store
            .get_rfp(rfp_id)
            .await?
            .ok_or(ProcurementError::OperationFailed { retryable: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procurement::testutil;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn lifecycle() -> (RfpLifecycle, Actor) {
        let (store, _) = testutil::store();
        (RfpLifecycle::new(store), Actor::municipality(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn create_draft_starts_in_draft_status() {
        let (lifecycle, owner) = lifecycle();
        let rfp = lifecycle
            .create_draft(&owner, testutil::create_request(owner.id))
            .await
            .unwrap();

        assert_eq!(rfp.status, RfpStatus::Draft);
        assert_eq!(rfp.created_by, owner.id);
        assert_eq!(rfp.published_at, None);
        assert_eq!(rfp.selected_bid_id, None);
        assert_eq!(rfp.project_id, None);
    }

    #[tokio::test]
    async fn create_draft_rejects_developer_actor() {
        let (lifecycle, owner) = lifecycle();
        let developer = Actor::developer(Uuid::new_v4());
        let err = lifecycle
            .create_draft(&developer, testutil::create_request(owner.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::Authorization(_)));
    }

    #[tokio::test]
    async fn create_draft_requires_title_and_description() {
        let (lifecycle, owner) = lifecycle();
        let mut req = testutil::create_request(owner.id);
        req.title = "   ".to_string();
        let err = lifecycle.create_draft(&owner, req).await.unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));
    }

    #[tokio::test]
    async fn publish_sets_status_and_published_at() {
        let (lifecycle, owner) = lifecycle();
        let rfp = lifecycle
            .create_draft(&owner, testutil::create_request(owner.id))
            .await
            .unwrap();

        let published = lifecycle.publish(&owner, rfp.id).await.unwrap();

        assert_eq!(published.status, RfpStatus::Published);
        assert!(published.published_at.is_some());
    }

    #[tokio::test]
    async fn publish_without_deadline_is_a_validation_error() {
        let (lifecycle, owner) = lifecycle();
        let mut req = testutil::create_request(owner.id);
        req.deadline = None;
        let rfp = lifecycle.create_draft(&owner, req).await.unwrap();

        let err = lifecycle.publish(&owner, rfp.id).await.unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));

        // The RFP must remain a draft
        let reloaded = lifecycle.store.get_rfp(rfp.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, RfpStatus::Draft);
    }

    #[tokio::test]
    async fn publish_with_past_deadline_is_a_validation_error() {
        let (lifecycle, owner) = lifecycle();
        let mut req = testutil::create_request(owner.id);
        req.deadline = Some(Utc::now() - Duration::hours(1));
        let rfp = lifecycle.create_draft(&owner, req).await.unwrap();

        let err = lifecycle.publish(&owner, rfp.id).await.unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));
    }

    #[tokio::test]
    async fn publish_with_inverted_budget_is_a_validation_error() {
        let (lifecycle, owner) = lifecycle();
        let mut req = testutil::create_request(owner.id);
        req.budget_min = Some(500_000);
        req.budget_max = Some(100_000);
        let rfp = lifecycle.create_draft(&owner, req).await.unwrap();

        let err = lifecycle.publish(&owner, rfp.id).await.unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));
    }

    #[tokio::test]
    async fn publish_twice_is_a_state_conflict() {
        let (lifecycle, owner) = lifecycle();
        let rfp = lifecycle
            .create_draft(&owner, testutil::create_request(owner.id))
            .await
            .unwrap();

        lifecycle.publish(&owner, rfp.id).await.unwrap();
        let err = lifecycle.publish(&owner, rfp.id).await.unwrap_err();
        assert!(matches!(err, ProcurementError::StateConflict(_)));
    }

    #[tokio::test]
    async fn publish_by_non_owner_is_forbidden() {
        let (lifecycle, owner) = lifecycle();
        let other = Actor::municipality(Uuid::new_v4());
        let rfp = lifecycle
            .create_draft(&owner, testutil::create_request(owner.id))
            .await
            .unwrap();

        let err = lifecycle.publish(&other, rfp.id).await.unwrap_err();
        assert!(matches!(err, ProcurementError::Authorization(_)));
    }
}
