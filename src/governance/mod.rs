//! Governance Module
//!
//! The in-memory governance data model and its queries:
//! - Team data snapshots (the raw document, immutable once fetched)
//! - Team / deliverable / repository views with derived properties
//! - The shared release liaison cache
//! - Filtered repository enumeration

pub mod data;
pub mod liaison;
pub mod model;
pub mod query;

pub use data::{TagSet, TeamData};
pub use liaison::{Liaison, LiaisonCache};
pub use model::{Team, MISSING};
pub use query::{enumerate_repositories, RepositoryFilter};
