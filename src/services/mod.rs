//! Service layer modules for external integrations.

pub mod events;

pub use events::{AwardCompleted, EventPublisher};
