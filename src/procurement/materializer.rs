//! Project materializer.
//!
//! Pure derivation of a project's initial fields from an RFP and its winning
//! bid. Kept free of I/O so the award coordinator's commit has a single,
//! testable point producing the project's content.

use crate::domain::{Bid, ProjectFields, ProjectStatus, Rfp};

/// Derives the initial fields of the project spawned by awarding
/// `winning_bid` on `rfp`. The budget is the winning bid's price.
pub fn materialize(rfp: &Rfp, winning_bid: &Bid) -> ProjectFields {
    ProjectFields {
        rfp_id: rfp.id,
        winning_bid_id: winning_bid.id,
        solution_id: winning_bid.solution_id,
        municipality_id: rfp.municipality_id,
        developer_id: winning_bid.developer_id,
        budget: winning_bid.price,
        currency: winning_bid.currency.clone(),
        status: ProjectStatus::Planning,
    }
}
