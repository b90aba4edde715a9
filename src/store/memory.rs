//! In-memory store backend.
//!
//! Same semantics as the Postgres backend, including the live-bid uniqueness
//! rule and atomic status CAS (every conditional update runs under the write
//! lock). Selected with `STORE=memory` for local development; the procurement
//! tests run against it.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Bid, BidStatus, Project, Rfp, RfpStatus};

use super::{
    BidTransition, CasOutcome, ProcurementStore, RfpTransition, StoreError, StoreResult,
};

#[derive(Default)]
struct Tables {
    rfps: HashMap<Uuid, Rfp>,
    bids: HashMap<Uuid, Bid>,
    projects: HashMap<Uuid, Project>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcurementStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_rfp(&self, rfp: &Rfp) -> StoreResult<()> {
        let mut tables = self.inner.write();
        if tables.rfps.contains_key(&rfp.id) {
            return Err(StoreError::UniqueViolation);
        }
        tables.rfps.insert(rfp.id, rfp.clone());
        Ok(())
    }

    async fn get_rfp(&self, id: Uuid) -> StoreResult<Option<Rfp>> {
        Ok(self.inner.read().rfps.get(&id).cloned())
    }

    async fn list_rfps(&self, status: Option<RfpStatus>) -> StoreResult<Vec<Rfp>> {
        let tables = self.inner.read();
        let mut rfps: Vec<Rfp> = tables
            .rfps
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rfps.sort_by_key(|r| r.created_at);
        Ok(rfps)
    }

    async fn update_rfp_if_status(
        &self,
        id: Uuid,
        expected: RfpStatus,
        transition: RfpTransition,
    ) -> StoreResult<CasOutcome> {
        let mut tables = self.inner.write();
        let Some(rfp) = tables.rfps.get_mut(&id) else {
            return Ok(CasOutcome::Conflict);
        };
        if rfp.status != expected {
            return Ok(CasOutcome::Conflict);
        }
        match transition {
            RfpTransition::Publish { published_at } => {
                rfp.status = RfpStatus::Published;
                rfp.published_at = Some(published_at);
            }
            RfpTransition::Close {
                selected_bid_id,
                project_id,
            } => {
                rfp.status = RfpStatus::Closed;
                rfp.selected_bid_id = Some(selected_bid_id);
                rfp.project_id = Some(project_id);
            }
        }
        rfp.updated_at = Utc::now();
        Ok(CasOutcome::Applied)
    }

    async fn insert_bid(&self, bid: &Bid) -> StoreResult<()> {
        let mut tables = self.inner.write();
        if tables.bids.contains_key(&bid.id) {
            return Err(StoreError::UniqueViolation);
        }
        let live_duplicate = tables.bids.values().any(|b| {
            b.rfp_id == bid.rfp_id
                && b.developer_id == bid.developer_id
                && b.status == BidStatus::Submitted
        });
        if live_duplicate {
            return Err(StoreError::UniqueViolation);
        }
        tables.bids.insert(bid.id, bid.clone());
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>> {
        Ok(self.inner.read().bids.get(&id).cloned())
    }

    async fn list_bids(&self, rfp_id: Uuid) -> StoreResult<Vec<Bid>> {
        let tables = self.inner.read();
        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.rfp_id == rfp_id)
            .cloned()
            .collect();
        bids.sort_by_key(|b| b.submitted_at);
        Ok(bids)
    }

    async fn find_submitted_bid(
        &self,
        rfp_id: Uuid,
        developer_id: Uuid,
    ) -> StoreResult<Option<Bid>> {
        let tables = self.inner.read();
        Ok(tables
            .bids
            .values()
            .find(|b| {
                b.rfp_id == rfp_id
                    && b.developer_id == developer_id
                    && b.status == BidStatus::Submitted
            })
            .cloned())
    }

    async fn update_bid_if_status(
        &self,
        id: Uuid,
        expected: BidStatus,
        transition: BidTransition,
    ) -> StoreResult<CasOutcome> {
        let mut tables = self.inner.write();
        let Some(bid) = tables.bids.get_mut(&id) else {
            return Ok(CasOutcome::Conflict);
        };
        if bid.status != expected {
            return Ok(CasOutcome::Conflict);
        }
        match transition {
            BidTransition::Accept { project_id } => {
                bid.status = BidStatus::Accepted;
                bid.project_id = Some(project_id);
            }
            BidTransition::Reject => {
                bid.status = BidStatus::Rejected;
            }
        }
        bid.updated_at = Utc::now();
        Ok(CasOutcome::Applied)
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        let mut tables = self.inner.write();
        if tables.projects.contains_key(&project.id) {
            return Err(StoreError::UniqueViolation);
        }
        let duplicate_award = tables
            .projects
            .values()
            .any(|p| p.rfp_id == project.rfp_id && p.winning_bid_id == project.winning_bid_id);
        if duplicate_award {
            return Err(StoreError::UniqueViolation);
        }
        tables.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.inner.read().projects.get(&id).cloned())
    }

    async fn find_award_project(
        &self,
        rfp_id: Uuid,
        winning_bid_id: Uuid,
    ) -> StoreResult<Option<Project>> {
        let tables = self.inner.read();
        Ok(tables
            .projects
            .values()
            .find(|p| p.rfp_id == rfp_id && p.winning_bid_id == winning_bid_id)
            .cloned())
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<()> {
        self.inner.write().projects.remove(&id);
        Ok(())
    }
}

impl MemoryStore {
    /// Number of stored projects referencing an RFP. Test support.
    pub fn projects_for_rfp(&self, rfp_id: Uuid) -> usize {
        self.inner
            .read()
            .projects
            .values()
            .filter(|p| p.rfp_id == rfp_id)
            .count()
    }
}
