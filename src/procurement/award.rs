//! Award coordinator.
//!
//! Executes the multi-entity award transition: close the RFP, create the
//! project, accept the winning bid, reject the rest. The commit protocol is
//! a resumable saga whose serialization point is the CAS moving the RFP from
//! `published` to `closed`:
//!
//! 1. Materialize and insert the project. Until step 2 lands, nothing
//!    references it, so an interrupted attempt leaves no visible state. A
//!    retry finds and reuses it instead of materializing a second one.
//! 2. CAS the RFP `published -> closed`, recording the selected bid and the
//!    project id. Exactly one caller per RFP wins this CAS; a loser whose
//!    bid differs from the recorded winner gets `AlreadyAwarded` and its
//!    provisional project is deleted as compensation.
//! 3. Accept the winning bid, then reject every other submitted bid. These
//!    are status CAS updates, so replaying them is harmless.
//!
//! Replaying a completed award (same RFP, same bid) re-runs step 3 and
//! returns the existing project. Transient store failures are retried with
//! bounded backoff; every other error is surfaced immediately.

use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::Actor;
use crate::domain::{BidStatus, Project, Rfp, RfpStatus};
use crate::store::{BidTransition, CasOutcome, ProcurementStore, RfpTransition, StoreError};

use super::materializer::materialize;
use super::{authorize_owner, ProcurementError, ProcurementResult};

/// Budget for internal retries of transient store failures.
const RETRY_WINDOW: Duration = Duration::from_secs(3);

/// Outcome of a `select_winner` call.
#[derive(Debug, Clone)]
pub struct AwardOutcome {
    pub project: Project,
    /// False when this call replayed an award that had already committed.
    /// Post-award side effects (the completion event) fire only on a fresh
    /// commit.
    pub fresh: bool,
}

#[derive(Clone)]
pub struct AwardCoordinator {
    store: Arc<dyn ProcurementStore>,
}

impl AwardCoordinator {
    pub fn new(store: Arc<dyn ProcurementStore>) -> Self {
        Self { store }
    }

    /// Awards `bid_id` on `rfp_id`, atomically closing the RFP and spawning
    /// its project. Idempotent per (rfp, bid); a replay returns the existing
    /// project with `fresh = false`, and a different bid after a completed
    /// award fails with `AlreadyAwarded`.
    pub async fn select_winner(
        &self,
        actor: &Actor,
        rfp_id: Uuid,
        bid_id: Uuid,
        idempotency_key: Option<String>,
    ) -> ProcurementResult<AwardOutcome> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(50),
            max_elapsed_time: Some(RETRY_WINDOW),
            ..ExponentialBackoff::default()
        };

        backoff::future::retry(backoff, || {
            let key = idempotency_key.clone();
            async move {
                self.try_award(actor, rfp_id, bid_id, key)
                    .await
                    .map_err(|e| match e {
                        ProcurementError::OperationFailed { retryable: true } => {
                            tracing::warn!(rfp_id = %rfp_id, "Transient failure during award, retrying");
                            backoff::Error::transient(e)
                        }
                        other => backoff::Error::permanent(other),
                    })
            }
        })
        .await
    }

    async fn try_award(
        &self,
        actor: &Actor,
        rfp_id: Uuid,
        bid_id: Uuid,
        idempotency_key: Option<String>,
    ) -> ProcurementResult<AwardOutcome> {
        let rfp = self
            .store
            .get_rfp(rfp_id)
            .await?
            .ok_or_else(|| ProcurementError::validation("unknown RFP"))?;

        authorize_owner(actor, &rfp)?;

        match rfp.status {
            RfpStatus::Closed => {
                let project = self.replay_or_conflict(&rfp, bid_id).await?;
                return Ok(AwardOutcome {
                    project,
                    fresh: false,
                });
            }
            RfpStatus::Draft => {
                return Err(ProcurementError::state_conflict(
                    "cannot award an unpublished RFP",
                ))
            }
            RfpStatus::Published => {}
        }

        let bid = self
            .store
            .get_bid(bid_id)
            .await?
            .filter(|b| b.rfp_id == rfp_id)
            .ok_or_else(|| ProcurementError::validation("bid does not belong to this RFP"))?;
        if bid.status != BidStatus::Submitted {
            // The bid may have been finalized by an award that committed
            // between our RFP read and our bid read; report that as a lost
            // race rather than a state conflict.
            let current = self
                .store
                .get_rfp(rfp_id)
                .await?
                .ok_or(ProcurementError::OperationFailed { retryable: false })?;
            if current.status == RfpStatus::Closed {
                let project = self.replay_or_conflict(&current, bid_id).await?;
                return Ok(AwardOutcome {
                    project,
                    fresh: false,
                });
            }
            return Err(ProcurementError::state_conflict(
                "bid is no longer open for award",
            ));
        }

        // Step 1: project creation, reusing the work of an interrupted
        // attempt for this same (rfp, bid) pair.
        let project = match self.store.find_award_project(rfp_id, bid_id).await? {
            Some(existing) => existing,
            None => {
                let project = Project::from_fields(materialize(&rfp, &bid), idempotency_key);
                match self.store.insert_project(&project).await {
                    Ok(()) => project,
                    // A concurrent attempt for this same (rfp, bid) pair
                    // inserted first; adopt its project.
                    Err(StoreError::UniqueViolation) => self
                        .store
                        .find_award_project(rfp_id, bid_id)
                        .await?
                        .ok_or(ProcurementError::OperationFailed { retryable: true })?,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        // Step 2: the serialization point. Only one caller per RFP applies
        // this transition.
        let outcome = self
            .store
            .update_rfp_if_status(
                rfp_id,
                RfpStatus::Published,
                RfpTransition::Close {
                    selected_bid_id: bid_id,
                    project_id: project.id,
                },
            )
            .await?;

        let fresh = outcome == CasOutcome::Applied;
        if outcome == CasOutcome::Conflict {
            let current = self
                .store
                .get_rfp(rfp_id)
                .await?
                .ok_or(ProcurementError::OperationFailed { retryable: false })?;
            let same_award =
                current.status == RfpStatus::Closed && current.selected_bid_id == Some(bid_id);
            if !same_award {
                // A concurrent award won; retract the provisional project.
                if let Err(e) = self.store.delete_project(project.id).await {
                    tracing::warn!(
                        project_id = %project.id,
                        error = %e,
                        "Failed to retract provisional project after lost award race"
                    );
                }
                return Err(ProcurementError::AlreadyAwarded);
            }
            // Our own prior attempt (or retry) already committed; fall
            // through to finish the remaining sub-effects.
        }

        // Steps 3 and 4.
        self.finalize_bids(rfp_id, bid_id, project.id).await?;

        tracing::info!(
            rfp_id = %rfp_id,
            bid_id = %bid_id,
            project_id = %project.id,
            "RFP awarded"
        );
        Ok(AwardOutcome { project, fresh })
    }

    /// Handles a call against an already-closed RFP: an exact replay returns
    /// the existing project (completing any unfinished bid updates first),
    /// anything else lost the race.
    async fn replay_or_conflict(&self, rfp: &Rfp, bid_id: Uuid) -> ProcurementResult<Project> {
        if rfp.selected_bid_id != Some(bid_id) {
            return Err(ProcurementError::AlreadyAwarded);
        }

        // Closed implies both award references are set.
        let project_id = rfp
            .project_id
            .ok_or(ProcurementError::OperationFailed { retryable: false })?;

        self.finalize_bids(rfp.id, bid_id, project_id).await?;

        self.store
            .get_project(project_id)
            .await?
            .ok_or(ProcurementError::OperationFailed { retryable: false })
    }

    /// Accepts the winner and rejects every other submitted bid. Safe to
    /// replay: a CAS conflict means that bid was already finalized.
    async fn finalize_bids(
        &self,
        rfp_id: Uuid,
        winning_bid_id: Uuid,
        project_id: Uuid,
    ) -> ProcurementResult<()> {
        let _ = self
            .store
            .update_bid_if_status(
                winning_bid_id,
                BidStatus::Submitted,
                BidTransition::Accept { project_id },
            )
            .await?;

        for bid in self.store.list_bids(rfp_id).await? {
            if bid.id != winning_bid_id && bid.status == BidStatus::Submitted {
                let _ = self
                    .store
                    .update_bid_if_status(bid.id, BidStatus::Submitted, BidTransition::Reject)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procurement::testutil;
    use crate::store::MemoryStore;
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;

    struct Fixture {
        coordinator: AwardCoordinator,
        raw: MemoryStore,
        owner: Actor,
        rfp_id: Uuid,
        bid_a: Uuid,
        bid_b: Uuid,
    }

    /// Published RFP with two submitted bids: A at 3000_00, B at 4500_00.
    async fn fixture() -> Fixture {
        let (store, raw) = testutil::store();
        let owner = Actor::municipality(Uuid::new_v4());
        let rfp = testutil::published_rfp(&owner, ChronoDuration::days(7));
        let rfp_id = rfp.id;
        store.insert_rfp(&rfp).await.unwrap();

        let dev_a = Actor::developer(Uuid::new_v4());
        let dev_b = Actor::developer(Uuid::new_v4());
        let bid_a = testutil::submitted_bid(rfp_id, &dev_a, 300_000);
        let bid_b = testutil::submitted_bid(rfp_id, &dev_b, 450_000);
        let (bid_a_id, bid_b_id) = (bid_a.id, bid_b.id);
        store.insert_bid(&bid_a).await.unwrap();
        store.insert_bid(&bid_b).await.unwrap();

        Fixture {
            coordinator: AwardCoordinator::new(store),
            raw,
            owner,
            rfp_id,
            bid_a: bid_a_id,
            bid_b: bid_b_id,
        }
    }

    #[tokio::test]
    async fn award_closes_rfp_and_finalizes_all_bids() {
        let f = fixture().await;

        let award = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_a, None)
            .await
            .unwrap();

        assert!(award.fresh);
        let project = award.project;
        assert_eq!(project.rfp_id, f.rfp_id);
        assert_eq!(project.winning_bid_id, f.bid_a);
        assert_eq!(project.budget, 300_000);
        assert_eq!(project.status, crate::domain::ProjectStatus::Planning);

        let rfp = f.raw.get_rfp(f.rfp_id).await.unwrap().unwrap();
        assert_eq!(rfp.status, RfpStatus::Closed);
        assert_eq!(rfp.selected_bid_id, Some(f.bid_a));
        assert_eq!(rfp.project_id, Some(project.id));

        let winner = f.raw.get_bid(f.bid_a).await.unwrap().unwrap();
        assert_eq!(winner.status, BidStatus::Accepted);
        assert_eq!(winner.project_id, Some(project.id));

        let loser = f.raw.get_bid(f.bid_b).await.unwrap().unwrap();
        assert_eq!(loser.status, BidStatus::Rejected);
    }

    #[tokio::test]
    async fn replaying_a_completed_award_returns_the_same_project() {
        let f = fixture().await;

        let first = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_a, None)
            .await
            .unwrap();
        let second = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_a, None)
            .await
            .unwrap();

        assert_eq!(first.project.id, second.project.id);
        assert!(first.fresh);
        assert!(!second.fresh, "a replay is not a fresh commit");
        assert_eq!(f.raw.projects_for_rfp(f.rfp_id), 1);
    }

    #[tokio::test]
    async fn awarding_a_different_bid_after_completion_fails() {
        let f = fixture().await;

        f.coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_a, None)
            .await
            .unwrap();
        let err = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_b, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcurementError::AlreadyAwarded));
        assert_eq!(f.raw.projects_for_rfp(f.rfp_id), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_awards_produce_exactly_one_winner() {
        let f = fixture().await;

        let c1 = f.coordinator.clone();
        let c2 = f.coordinator.clone();
        let (owner, rfp_id, bid_a, bid_b) = (f.owner, f.rfp_id, f.bid_a, f.bid_b);

        let t1 = tokio::spawn(async move { c1.select_winner(&owner, rfp_id, bid_a, None).await });
        let t2 = tokio::spawn(async move { c2.select_winner(&owner, rfp_id, bid_b, None).await });

        let r1 = t1.await.unwrap();
        let r2 = t2.await.unwrap();

        let successes = [r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1, "exactly one concurrent award must succeed");

        let loser = if r1.is_ok() { r2 } else { r1 };
        assert!(matches!(
            loser.unwrap_err(),
            ProcurementError::AlreadyAwarded
        ));

        // One project, referenced by the closed RFP
        assert_eq!(f.raw.projects_for_rfp(f.rfp_id), 1);
        let rfp = f.raw.get_rfp(f.rfp_id).await.unwrap().unwrap();
        assert_eq!(rfp.status, RfpStatus::Closed);
        let winning_bid = rfp.selected_bid_id.unwrap();
        let project = f.raw.get_project(rfp.project_id.unwrap()).await.unwrap();
        assert_eq!(project.unwrap().winning_bid_id, winning_bid);
    }

    #[tokio::test]
    async fn retry_reuses_a_project_left_by_an_interrupted_attempt() {
        let f = fixture().await;

        // Simulate a crash after step 1: the project exists but the RFP is
        // still published and no bid was touched.
        let rfp = f.raw.get_rfp(f.rfp_id).await.unwrap().unwrap();
        let bid = f.raw.get_bid(f.bid_a).await.unwrap().unwrap();
        let orphan = Project::from_fields(materialize(&rfp, &bid), None);
        f.raw.insert_project(&orphan).await.unwrap();

        let award = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_a, None)
            .await
            .unwrap();

        assert!(award.fresh, "the award had never committed before");
        assert_eq!(award.project.id, orphan.id, "materialization must not re-run");
        assert_eq!(f.raw.projects_for_rfp(f.rfp_id), 1);
        let rfp = f.raw.get_rfp(f.rfp_id).await.unwrap().unwrap();
        assert_eq!(rfp.status, RfpStatus::Closed);
    }

    #[tokio::test]
    async fn retry_completes_bid_updates_left_by_an_interrupted_attempt() {
        let f = fixture().await;

        // Simulate a crash after step 2: RFP closed and project created, but
        // no bid status was finalized yet.
        let rfp = f.raw.get_rfp(f.rfp_id).await.unwrap().unwrap();
        let bid = f.raw.get_bid(f.bid_a).await.unwrap().unwrap();
        let project = Project::from_fields(materialize(&rfp, &bid), None);
        f.raw.insert_project(&project).await.unwrap();
        f.raw
            .update_rfp_if_status(
                f.rfp_id,
                RfpStatus::Published,
                RfpTransition::Close {
                    selected_bid_id: f.bid_a,
                    project_id: project.id,
                },
            )
            .await
            .unwrap();

        let replay = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, f.bid_a, None)
            .await
            .unwrap();

        assert!(!replay.fresh);
        assert_eq!(replay.project.id, project.id);
        let winner = f.raw.get_bid(f.bid_a).await.unwrap().unwrap();
        assert_eq!(winner.status, BidStatus::Accepted);
        let loser = f.raw.get_bid(f.bid_b).await.unwrap().unwrap();
        assert_eq!(loser.status, BidStatus::Rejected);
    }

    #[tokio::test]
    async fn awarding_a_draft_rfp_is_a_state_conflict() {
        let (store, _) = testutil::store();
        let owner = Actor::municipality(Uuid::new_v4());
        let mut rfp = testutil::published_rfp(&owner, ChronoDuration::days(7));
        rfp.status = RfpStatus::Draft;
        rfp.published_at = None;
        store.insert_rfp(&rfp).await.unwrap();
        let coordinator = AwardCoordinator::new(store);

        let err = coordinator
            .select_winner(&owner, rfp.id, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::StateConflict(_)));
    }

    #[tokio::test]
    async fn awarding_a_foreign_bid_is_a_validation_error() {
        let f = fixture().await;
        let err = f
            .coordinator
            .select_winner(&f.owner, f.rfp_id, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::Validation(_)));
    }

    #[tokio::test]
    async fn award_by_non_owner_is_forbidden() {
        let f = fixture().await;
        let stranger = Actor::municipality(Uuid::new_v4());
        let err = f
            .coordinator
            .select_winner(&stranger, f.rfp_id, f.bid_a, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcurementError::Authorization(_)));
    }
}
