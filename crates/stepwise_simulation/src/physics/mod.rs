//! Physics simulation module
//!
//! Kinematic контроллер: resolver (чистая логика) + ECS glue.

pub mod movement;
pub mod resolver;

// Re-export основных типов
pub use movement::{
    rebuild_collision_snapshot, resolve_character_movement, spawn_kinematic_character,
    spawn_static_box, KinematicControllerPlugin, LiveFilters,
};
pub use resolver::{
    correct_penetration, resolve_horizontal, resolve_tick, resolve_vertical, ResolveContext,
    TickOutcome,
};
