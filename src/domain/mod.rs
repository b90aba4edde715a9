//! Domain types and DTOs
//!
//! These types define the data structures for the procurement entities:
//! RFPs issued by municipalities, bids from solution developers, and the
//! projects created when a bid is awarded.

pub mod bids;
pub mod projects;
pub mod rfps;

// Re-export commonly used types
pub use bids::*;
pub use projects::*;
pub use rfps::*;
