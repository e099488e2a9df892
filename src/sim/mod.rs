//! Deterministic simulation module
//!
//! Everything that moves lives here:
//! - Stable iteration order (pucks sorted by id)
//! - Signed timestep so the exact engine can run backward
//! - No rendering or platform dependencies

pub mod collision;
#[cfg(feature = "rapier")]
pub mod delegate;
pub mod engine;
pub mod fence;
pub mod integrate;
pub mod puck;
pub mod spring;
pub mod table;
pub mod throw;
pub mod vector;
pub mod wall;

pub use collision::{Contact, HitEvent, a_and_b_normal_after, normal_after};
#[cfg(feature = "rapier")]
pub use delegate::RapierEngine;
pub use engine::{ApproximateEngine, CollisionEngine, EngineKind, ExactEngine, StepContext, StepOutcome};
pub use fence::resolve_wall_collisions;
pub use puck::{ForceChannel, Puck, PuckDesc, PuckId};
pub use spring::{Spring, SpringDesc, SpringEnd, SpringId};
pub use table::{PuckSnapshot, SpringSnapshot, Table, TableSnapshot, TickReport};
pub use vector::VecExt;
pub use wall::{Bounds, Wall, WallId};
