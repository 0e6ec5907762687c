//! # Entity Placement
//!
//! Searches world geometry for spots to place entities and queues their
//! construction for the host.
//!
//! ## Architecture
//!
//! - [`Pathfinder`]: parallel exploration, scoring and approval
//! - [`EggConcept`]: what gets placed
//! - [`TaskQueue`]: deferred entity construction run on the host thread

pub mod concept;
pub mod pathfinder;
pub mod tasks;

pub use concept::{EggConcept, EntityDesc, DAMAGEABLE_HEALTH};
pub use pathfinder::{penalize_slope, score_location, Pathfinder, Prospect, INVALID_SCORE};
pub use tasks::{EntityHost, Task, TaskQueue};
