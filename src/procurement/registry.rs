//! Bid registry.
//!
//! Accepts bid submissions against published RFPs, enforcing the bidding
//! window and the one-live-bid-per-developer rule.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{Actor, ActorRole};
use crate::domain::{Bid, BidStatus, RfpStatus, SubmitBidRequest};
use crate::store::{BidTransition, ProcurementStore, StoreError};

use super::{ProcurementError, ProcurementResult};

#[derive(Clone)]
pub struct BidRegistry {
    store: Arc<dyn ProcurementStore>,
}

impl BidRegistry {
    pub fn new(store: Arc<dyn ProcurementStore>) -> Self {
        Self { store }
    }

    /// Submits a bid against a published RFP whose deadline has not passed.
    ///
    /// A developer may hold at most one `submitted` bid per RFP; replacing a
    /// bid is an explicit separate operation, never implied by re-submission.
    pub async fn submit_bid(
        &self,
        actor: &Actor,
        rfp_id: Uuid,
        req: SubmitBidRequest,
    ) -> ProcurementResult<Bid> {
        if actor.role != ActorRole::Developer {
            return Err(ProcurementError::Authorization(
                "only a developer can submit a bid".to_string(),
            ));
        }
        if req.proposal.trim().is_empty() {
            return Err(ProcurementError::validation("proposal must not be empty"));
        }
        if req.price <= 0 {
            return Err(ProcurementError::validation("price must be positive"));
        }
        if req.timeline.trim().is_empty() {
            return Err(ProcurementError::validation("timeline must not be empty"));
        }

        let rfp = self
            .store
            .get_rfp(rfp_id)
            .await?
            .ok_or_else(|| ProcurementError::validation("unknown RFP"))?;

        let now = Utc::now();
        if !Self::window_open(&rfp, now) {
            return Err(ProcurementError::WindowClosed);
        }

        if self
            .store
            .find_submitted_bid(rfp_id, actor.id)
            .await?
            .is_some()
        {
            return Err(ProcurementError::DuplicateBid);
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            rfp_id,
            developer_id: actor.id,
            solution_id: req.solution_id,
            proposal: req.proposal,
            price: req.price,
            currency: req.currency,
            timeline: req.timeline,
            status: BidStatus::Submitted,
            project_id: None,
            submitted_at: now,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_bid(&bid).await {
            Ok(()) => {}
            // Unique index caught a concurrent duplicate submission
            Err(StoreError::UniqueViolation) => return Err(ProcurementError::DuplicateBid),
            Err(e) => return Err(e.into()),
        }

        // The insert may have raced an in-flight award. A bid that lands
        // after the RFP is observed closed must not stay in the submitted
        // set, so re-check and retract it.
        let rfp_after = self.store.get_rfp(rfp_id).await?;
        if rfp_after.map_or(true, |r| r.status != RfpStatus::Published) {
            let _ = self
                .store
                .update_bid_if_status(bid.id, BidStatus::Submitted, BidTransition::Reject)
                .await?;
            return Err(ProcurementError::WindowClosed);
        }

        tracing::info!(
            rfp_id = %rfp_id,
            bid_id = %bid.id,
            developer_id = %actor.id,
            price = bid.price,
            "Bid submitted"
        );
        Ok(bid)
    }

    /// Lists bids on an RFP. The owning municipality sees all bids; a
    /// developer sees only their own.
    pub async fn list_bids(&self, actor: &Actor, rfp_id: Uuid) -> ProcurementResult<Vec<Bid>> {
        let rfp = self
            .store
            .get_rfp(rfp_id)
            .await?
            .ok_or_else(|| ProcurementError::validation("unknown RFP"))?;

        let bids = self.store.list_bids(rfp_id).await?;

        let is_owner = actor.role == ActorRole::Municipality
            && (actor.id == rfp.created_by || actor.id == rfp.municipality_id);
        if is_owner {
            return Ok(bids);
        }

        if actor.role == ActorRole::Developer {
            return Ok(bids
                .into_iter()
                .filter(|b| b.developer_id == actor.id)
                .collect());
        }

        Err(ProcurementError::Authorization(
            "not permitted to view bids on this RFP".to_string(),
        ))
    }

    fn window_open(rfp: &crate::domain::Rfp, now: chrono::DateTime<Utc>) -> bool {
        if rfp.status != RfpStatus::Published {
            return false;
        }
        // A published RFP always carries a deadline; treat a missing one as
        // closed rather than open-ended.
        rfp.deadline.map_or(false, |deadline| now < deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Project, Rfp};
    use crate::procurement::{testutil, AwardCoordinator};
    use crate::store::{CasOutcome, MemoryStore, RfpTransition, StoreResult};
    use async_trait::async_trait;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    async fn published_setup() -> (BidRegistry, Actor, Uuid) {
        let (store, _) = testutil::store();
        let owner = Actor::municipality(Uuid::new_v4());
        let rfp = testutil::published_rfp(&owner, Duration::days(7));
        let rfp_id = rfp.id;
        store.insert_rfp(&rfp).await.unwrap();
        (BidRegistry::new(store), owner, rfp_id)
    }

    #[tokio::test]
    async fn submit_bid_on_published_rfp_succeeds() {
        let (registry, _, rfp_id) = published_setup().await;
        let developer = Actor::developer(Uuid::new_v4());

        let bid = registry
            .submit_bid(&developer, rfp_id, testutil::bid_request(300_000))
            .await
            .unwrap();

        assert_eq!(bid.status, BidStatus::Submitted);
        assert_eq!(bid.rfp_id, rfp_id);
        assert_eq!(bid.developer_id, developer.id);
    }

    #[tokio::test]
    async fn submit_bid_on_draft_rfp_fails_window_closed() {
        let (store, _) = testutil::store();
        let owner = Actor::municipality(Uuid::new_v4());
        let mut rfp = testutil::published_rfp(&owner, Duration::days(7));
        rfp.status = RfpStatus::Draft;
        rfp.published_at = None;
        store.insert_rfp(&rfp).await.unwrap();
        let registry = BidRegistry::new(store);

        let developer = Actor::developer(Uuid::new_v4());
        let err = registry
            .submit_bid(&developer, rfp.id, testutil::bid_request(300_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::WindowClosed));
    }

    #[tokio::test]
    async fn submit_bid_after_deadline_fails_window_closed() {
        let (store, _) = testutil::store();
        let owner = Actor::municipality(Uuid::new_v4());
        let rfp = testutil::published_rfp(&owner, Duration::hours(-1));
        store.insert_rfp(&rfp).await.unwrap();
        let registry = BidRegistry::new(store);

        let developer = Actor::developer(Uuid::new_v4());
        let err = registry
            .submit_bid(&developer, rfp.id, testutil::bid_request(300_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::WindowClosed));
    }

    #[tokio::test]
    async fn second_live_bid_by_same_developer_is_a_duplicate() {
        let (registry, _, rfp_id) = published_setup().await;
        let developer = Actor::developer(Uuid::new_v4());

        registry
            .submit_bid(&developer, rfp_id, testutil::bid_request(300_000))
            .await
            .unwrap();
        let err = registry
            .submit_bid(&developer, rfp_id, testutil::bid_request(250_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::DuplicateBid));
    }

    #[tokio::test]
    async fn municipality_actor_cannot_bid() {
        let (registry, owner, rfp_id) = published_setup().await;
        let err = registry
            .submit_bid(&owner, rfp_id, testutil::bid_request(300_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::Authorization(_)));
    }

    #[tokio::test]
    async fn submit_bid_after_award_fails_window_closed() {
        let (store, raw) = testutil::store();
        let owner = Actor::municipality(Uuid::new_v4());
        let rfp = testutil::published_rfp(&owner, Duration::days(7));
        store.insert_rfp(&rfp).await.unwrap();

        let dev_a = Actor::developer(Uuid::new_v4());
        let bid_a = testutil::submitted_bid(rfp.id, &dev_a, 300_000);
        store.insert_bid(&bid_a).await.unwrap();

        let coordinator = AwardCoordinator::new(store.clone());
        coordinator
            .select_winner(&owner, rfp.id, bid_a.id, None)
            .await
            .unwrap();

        let registry = BidRegistry::new(store);
        let dev_c = Actor::developer(Uuid::new_v4());
        let err = registry
            .submit_bid(&dev_c, rfp.id, testutil::bid_request(200_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::WindowClosed));

        // The awarded set is untouched: only the winner's bid, no submitted
        // bid from the late developer.
        let bids = raw.list_bids(rfp.id).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert!(bids.iter().all(|b| b.status != BidStatus::Submitted));
    }

    /// Closes the RFP right after a bid insert, standing in for an award
    /// that commits between the registry's window check and its re-check.
    struct AwardRacingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ProcurementStore for AwardRacingStore {
        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }

        async fn insert_rfp(&self, rfp: &Rfp) -> StoreResult<()> {
            self.inner.insert_rfp(rfp).await
        }

        async fn get_rfp(&self, id: Uuid) -> StoreResult<Option<Rfp>> {
            self.inner.get_rfp(id).await
        }

        async fn list_rfps(&self, status: Option<RfpStatus>) -> StoreResult<Vec<Rfp>> {
            self.inner.list_rfps(status).await
        }

        async fn update_rfp_if_status(
            &self,
            id: Uuid,
            expected: RfpStatus,
            transition: RfpTransition,
        ) -> StoreResult<CasOutcome> {
            self.inner.update_rfp_if_status(id, expected, transition).await
        }

        async fn insert_bid(&self, bid: &Bid) -> StoreResult<()> {
            self.inner.insert_bid(bid).await?;
            let _ = self
                .inner
                .update_rfp_if_status(
                    bid.rfp_id,
                    RfpStatus::Published,
                    RfpTransition::Close {
                        selected_bid_id: Uuid::new_v4(),
                        project_id: Uuid::new_v4(),
                    },
                )
                .await?;
            Ok(())
        }

        async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>> {
            self.inner.get_bid(id).await
        }

        async fn list_bids(&self, rfp_id: Uuid) -> StoreResult<Vec<Bid>> {
            self.inner.list_bids(rfp_id).await
        }

        async fn find_submitted_bid(
            &self,
            rfp_id: Uuid,
            developer_id: Uuid,
        ) -> StoreResult<Option<Bid>> {
            self.inner.find_submitted_bid(rfp_id, developer_id).await
        }

        async fn update_bid_if_status(
            &self,
            id: Uuid,
            expected: BidStatus,
            transition: BidTransition,
        ) -> StoreResult<CasOutcome> {
            self.inner.update_bid_if_status(id, expected, transition).await
        }

        async fn insert_project(&self, project: &Project) -> StoreResult<()> {
            self.inner.insert_project(project).await
        }

        async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
            self.inner.get_project(id).await
        }

        async fn find_award_project(
            &self,
            rfp_id: Uuid,
            winning_bid_id: Uuid,
        ) -> StoreResult<Option<Project>> {
            self.inner.find_award_project(rfp_id, winning_bid_id).await
        }

        async fn delete_project(&self, id: Uuid) -> StoreResult<()> {
            self.inner.delete_project(id).await
        }
    }

    #[tokio::test]
    async fn bid_landing_during_an_award_is_retracted() {
        let owner = Actor::municipality(Uuid::new_v4());
        let inner = MemoryStore::new();
        let rfp = testutil::published_rfp(&owner, Duration::days(7));
        inner.insert_rfp(&rfp).await.unwrap();

        let registry = BidRegistry::new(Arc::new(AwardRacingStore {
            inner: inner.clone(),
        }));

        let developer = Actor::developer(Uuid::new_v4());
        let err = registry
            .submit_bid(&developer, rfp.id, testutil::bid_request(300_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::WindowClosed));

        // The landed bid must not remain in the submitted set
        let bids = inner.list_bids(rfp.id).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].status, BidStatus::Rejected);
    }

    #[tokio::test]
    async fn owner_sees_all_bids_developer_sees_own() {
        let (registry, owner, rfp_id) = published_setup().await;
        let dev_a = Actor::developer(Uuid::new_v4());
        let dev_b = Actor::developer(Uuid::new_v4());

        registry
            .submit_bid(&dev_a, rfp_id, testutil::bid_request(300_000))
            .await
            .unwrap();
        registry
            .submit_bid(&dev_b, rfp_id, testutil::bid_request(450_000))
            .await
            .unwrap();

        let all = registry.list_bids(&owner, rfp_id).await.unwrap();
        assert_eq!(all.len(), 2);

        let own = registry.list_bids(&dev_a, rfp_id).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].developer_id, dev_a.id);
    }
}
