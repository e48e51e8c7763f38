//! Collision module
//!
//! Read-only collision world для kinematic resolver:
//! - filters: категории + симметричные collides-with маски
//! - shape: закрытый вариант формы агента {Capsule, Sphere, Box}
//! - query: контракт запросов (sweep / distance / ray) + hit records
//! - snapshot: per-tick snapshot collider'ов (parry narrow phase)

pub mod filters;
pub mod query;
pub mod shape;
pub mod snapshot;

// Re-export основных типов
pub use filters::CollisionFilter;
pub use query::{
    closest_by_fraction, smallest_distance, sort_by_fraction, trim_by_filter, CollisionQuery,
    DistanceHit, FilterLookup, QueryHit, RayHit, SweepHit,
};
pub use shape::AgentShape;
pub use snapshot::{CollisionSnapshot, SnapshotCollider};

#[cfg(test)]
mod query_tests;
