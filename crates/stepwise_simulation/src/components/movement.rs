//! Movement компоненты: input, параметры контроллера, persistent state

use bevy::prelude::*;

/// Входные данные для движения на текущий тик
///
/// Пишется внешним источником (player input, `steer_towards_target`),
/// resolver только читает.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct MovementInput {
    /// Направление в плоскости XZ (ожидается нормализованным, y = 0)
    pub direction: Vec3,
    /// Доля от `speed`, [0, 1]
    pub magnitude: f32,
    /// Прыжок запрошен (срабатывает только с земли)
    pub jump: bool,
}

impl MovementInput {
    pub fn towards(direction: Vec3, magnitude: f32) -> Self {
        Self {
            direction,
            magnitude,
            jump: false,
        }
    }

    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Default::default()
        }
    }
}

/// Kinematic контроллер (параметры фиксируются при spawn)
///
/// Собирается из `CharacterConfig::controller()`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct KinematicController {
    /// Гравитация (m/s²)
    pub gravity: Vec3,
    /// Скорость движения (m/s)
    pub speed: f32,
    /// Вертикальная скорость прыжка (m/s)
    pub jump_strength: f32,
    /// Максимальная высота ступеньки (m)
    pub max_step: f32,
    /// Затухание вертикальной скорости в воздухе (1/s), 0 = без drag
    pub drag: f32,
    /// Поворачивать Transform по направлению движения
    pub face_movement: bool,
}

impl Default for KinematicController {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            speed: 5.0,
            jump_strength: 5.0,
            max_step: 0.3,
            drag: 0.0,
            face_movement: true,
        }
    }
}

/// Persistent state между тиками (меняет только resolver)
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct KinematicState {
    pub is_grounded: bool,
    /// Последняя resolved горизонтальная скорость (m/s)
    pub horizontal_velocity: Vec3,
    /// Вертикальная скорость, переносится между тиками (m/s)
    pub vertical_velocity: Vec3,
}
