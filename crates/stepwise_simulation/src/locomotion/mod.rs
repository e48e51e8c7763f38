//! Locomotion: источник MovementInput для AI агентов
//!
//! Arrive steering: направление на цель в плоскости XZ, magnitude 0 внутри
//! stopping distance. Обход препятствий: три луча (текущий курс, ±45°)
//! против `OBSTACLE_PROBE` геометрии, ближайший hit подменяет цель точкой
//! `hit + normal * avoidance_distance`. Курс поворачивается к новому
//! направлению через lerp со скоростью `rotation_speed`.

use bevy::prelude::*;

use crate::collision::{CollisionFilter, CollisionQuery, CollisionSnapshot, RayHit};
use crate::components::movement::MovementInput;
use crate::math::{flatten, orientation_to_vector, safe_normalize, vector_to_orientation, DEG_TO_RAD};

/// Угол боковых лучей обхода (градусы)
pub const AVOIDANCE_ANGLE: f32 = 45.0;

/// Цель движения агента
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct ArriveTarget {
    pub target: Vec3,
    /// Внутри этого радиуса (XZ) агент стоит
    pub stopping_distance: f32,
    /// Дальность лучей обхода; 0 — без обхода
    pub avoidance_distance: f32,
    /// Скорость поворота курса (доля за секунду); 0 — поворот мгновенный
    pub rotation_speed: f32,
}

impl ArriveTarget {
    pub fn new(target: Vec3, stopping_distance: f32) -> Self {
        Self {
            target,
            stopping_distance,
            avoidance_distance: 0.0,
            rotation_speed: 0.0,
        }
    }

    pub fn with_avoidance(mut self, distance: f32) -> Self {
        self.avoidance_distance = distance;
        self
    }

    pub fn with_rotation_speed(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }
}

/// Arrive: (direction, magnitude) из позиции агента к цели
pub fn arrive_input(position: Vec3, target: &ArriveTarget) -> (Vec3, f32) {
    let to_target = flatten(target.target - position);
    if to_target.length_squared() <= target.stopping_distance * target.stopping_distance {
        return (Vec3::ZERO, 0.0);
    }
    match safe_normalize(to_target) {
        Some(direction) => (direction, 1.0),
        None => (Vec3::ZERO, 0.0),
    }
}

/// Ближайшее препятствие по трём лучам: курс и ±45° от него
pub fn find_obstacle(
    world: &dyn CollisionQuery,
    origin: Vec3,
    heading: Vec3,
    distance: f32,
    exclude: Option<Entity>,
) -> Option<RayHit> {
    if distance <= 0.0 || !distance.is_finite() {
        return None;
    }
    let heading = safe_normalize(flatten(heading))?;
    let orientation = vector_to_orientation(heading);

    let directions = [
        heading,
        orientation_to_vector(orientation + AVOIDANCE_ANGLE * DEG_TO_RAD),
        orientation_to_vector(orientation - AVOIDANCE_ANGLE * DEG_TO_RAD),
    ];

    let mut closest: Option<RayHit> = None;
    for direction in directions {
        let hit = world.closest_ray(
            origin,
            origin + direction * distance,
            CollisionFilter::OBSTACLE_PROBE,
            exclude,
        );
        if let Some(hit) = hit {
            if closest.map_or(true, |best| hit.fraction < best.fraction) {
                closest = Some(hit);
            }
        }
    }
    closest
}

/// Точка обхода: от препятствия по его нормали на `distance`
///
/// None — путь свободен, агент идёт к исходной цели.
pub fn avoid_obstacles(
    world: &dyn CollisionQuery,
    origin: Vec3,
    heading: Vec3,
    distance: f32,
    exclude: Option<Entity>,
) -> Option<Vec3> {
    let hit = find_obstacle(world, origin, heading, distance, exclude)?;
    Some(hit.position + flatten(hit.normal) * distance)
}

/// Плавный поворот курса: lerp(current, desired, t), t в [0, 1]
///
/// Вырожденный результат (разворот ровно назад) → сразу desired.
pub fn smooth_direction(current: Vec3, desired: Vec3, t: f32) -> Vec3 {
    let Some(current) = safe_normalize(flatten(current)) else {
        return desired;
    };
    if !t.is_finite() || t >= 1.0 {
        return desired;
    }
    if t <= 0.0 {
        return current;
    }
    safe_normalize(current.lerp(desired, t)).unwrap_or(desired)
}

/// Система: ArriveTarget → MovementInput
///
/// Работает в FixedUpdate перед resolver'ом.
pub fn steer_towards_target(
    mut agents: Query<(Entity, &ArriveTarget, &Transform, &mut MovementInput)>,
    snapshot: Res<CollisionSnapshot>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    for (entity, target, transform, mut input) in agents.iter_mut() {
        let position = transform.translation;
        let (direction, magnitude) = arrive_input(position, target);
        if magnitude <= 0.0 {
            input.direction = direction;
            input.magnitude = magnitude;
            continue;
        }

        let heading = safe_normalize(flatten(input.direction)).unwrap_or(direction);
        let desired = avoid_obstacles(
            &*snapshot,
            position,
            heading,
            target.avoidance_distance,
            Some(entity),
        )
        .and_then(|detour| safe_normalize(flatten(detour - position)))
        .unwrap_or(direction);

        input.direction = if target.rotation_speed > 0.0 {
            smooth_direction(heading, desired, delta * target.rotation_speed)
        } else {
            desired
        };
        input.magnitude = magnitude;
    }
}
