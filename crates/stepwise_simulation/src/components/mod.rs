//! ECS Components для kinematic агентов
//!
//! - movement: MovementInput, KinematicController, KinematicState

pub mod movement;

// Re-exports для удобного импорта
pub use movement::*;
