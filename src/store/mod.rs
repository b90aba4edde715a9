//! Persistent store abstraction for the procurement subsystem.
//!
//! The award coordinator is written against `get` / `insert` / conditional
//! update primitives rather than a concrete database, so its commit protocol
//! can be exercised in tests without Postgres. Conditional updates are
//! compare-and-swap operations on an entity's status field and report whether
//! they applied.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Bid, BidStatus, Project, Rfp, RfpStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient backend failure; safe to retry under the coordinator's
    /// idempotency discipline.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated")]
    UniqueViolation,

    /// A stored row could not be converted into a domain value. Not
    /// retryable; the row itself is bad.
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a conditional (compare-and-swap) update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The row was missing or its status no longer matched the expectation.
    Conflict,
}

/// Mutation applied to an RFP only while its status matches the expected one.
#[derive(Debug, Clone)]
pub enum RfpTransition {
    Publish { published_at: DateTime<Utc> },
    Close { selected_bid_id: Uuid, project_id: Uuid },
}

/// Mutation applied to a bid only while its status matches the expected one.
#[derive(Debug, Clone)]
pub enum BidTransition {
    Accept { project_id: Uuid },
    Reject,
}

#[async_trait]
pub trait ProcurementStore: Send + Sync {
    /// Lightweight connectivity probe for health reporting.
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_rfp(&self, rfp: &Rfp) -> StoreResult<()>;
    async fn get_rfp(&self, id: Uuid) -> StoreResult<Option<Rfp>>;
    async fn list_rfps(&self, status: Option<RfpStatus>) -> StoreResult<Vec<Rfp>>;

    /// CAS on `status`: applies the transition only if the RFP's current
    /// status equals `expected`.
    async fn update_rfp_if_status(
        &self,
        id: Uuid,
        expected: RfpStatus,
        transition: RfpTransition,
    ) -> StoreResult<CasOutcome>;

    /// Inserting a second `submitted` bid for the same (rfp, developer) pair
    /// fails with `UniqueViolation`.
    async fn insert_bid(&self, bid: &Bid) -> StoreResult<()>;
    async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>>;
    async fn list_bids(&self, rfp_id: Uuid) -> StoreResult<Vec<Bid>>;
    async fn find_submitted_bid(
        &self,
        rfp_id: Uuid,
        developer_id: Uuid,
    ) -> StoreResult<Option<Bid>>;

    /// CAS on `status`: applies the transition only if the bid's current
    /// status equals `expected`.
    async fn update_bid_if_status(
        &self,
        id: Uuid,
        expected: BidStatus,
        transition: BidTransition,
    ) -> StoreResult<CasOutcome>;

    async fn insert_project(&self, project: &Project) -> StoreResult<()>;
    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Looks up a project created by an earlier (possibly interrupted) award
    /// attempt for this (rfp, bid) pair.
    async fn find_award_project(
        &self,
        rfp_id: Uuid,
        winning_bid_id: Uuid,
    ) -> StoreResult<Option<Project>>;

    /// Compensation for an award attempt that lost the commit race: removes
    /// the provisional project it materialized.
    async fn delete_project(&self, id: Uuid) -> StoreResult<()>;
}
