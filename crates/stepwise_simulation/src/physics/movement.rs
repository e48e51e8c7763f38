//! Kinematic контроллер для агентов (ECS glue)
//!
//! Архитектура:
//! - Rapier только как описание геометрии (RigidBody::KinematicPositionBased + Collider)
//! - Collision world = `CollisionSnapshot`, перестраивается в начале тика
//! - Resolver (`physics::resolver`) — чистая функция, агенты резолвятся
//!   параллельно через `par_iter_mut`
//!
//! Детерминизм: fixed timestep (60Hz), запросы только к snapshot прошлого
//! состояния, поэтому порядок обработки агентов не влияет на результат.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::resolver::{resolve_tick, ResolveContext};
use crate::collision::{AgentShape, CollisionFilter, CollisionSnapshot, FilterLookup};
use crate::components::movement::{KinematicController, KinematicState, MovementInput};
use crate::config::{CharacterConfig, ConfigError, ResolverSettings};
use crate::locomotion::steer_towards_target;

/// Live фильтры collider'ов (CollisionGroups на момент resolve)
///
/// Collider без CollisionGroups коллайдит со всем (дефолт rapier).
pub struct LiveFilters<'q, 'w, 's> {
    pub colliders: &'q Query<'w, 's, (&'static Collider, Option<&'static CollisionGroups>)>,
}

impl FilterLookup for LiveFilters<'_, '_, '_> {
    fn filter_of(&self, entity: Entity) -> Option<CollisionFilter> {
        self.colliders
            .get(entity)
            .ok()
            .map(|(_, groups)| groups.map_or(CollisionFilter::ALL, CollisionFilter::from_groups))
    }
}

/// Система: перестроить collision snapshot из ECS collider'ов
///
/// Первая в цепочке тика, дальше snapshot только читается.
/// Поза collider'а собирается по цепочке `ChildOf` из локальных Transform:
/// GlobalTransform в FixedUpdate ещё не пропагирован за этот тик.
pub fn rebuild_collision_snapshot(
    mut snapshot: ResMut<CollisionSnapshot>,
    colliders: Query<(Entity, &Collider, Option<&CollisionGroups>)>,
    transforms: Query<&Transform>,
    parents: Query<&ChildOf>,
) {
    snapshot.clear();
    for (entity, collider, groups) in colliders.iter() {
        let Some(pose) = world_pose(entity, &transforms, &parents) else {
            continue;
        };
        snapshot.insert_entity(entity, collider, &pose, groups);
    }
    snapshot.generation += 1;
}

/// Мировая поза entity: локальный Transform, умноженный на всех предков
///
/// None если у самой entity нет Transform.
pub fn world_pose(
    entity: Entity,
    transforms: &Query<&Transform>,
    parents: &Query<&ChildOf>,
) -> Option<Transform> {
    let mut pose = *transforms.get(entity).ok()?;
    let mut current = entity;
    while let Ok(child_of) = parents.get(current) {
        current = child_of.parent();
        if let Ok(parent) = transforms.get(current) {
            pose = parent.mul_transform(pose);
        }
    }
    Some(pose)
}

/// Система: один тик resolver'а для всех агентов
///
/// Работает в FixedUpdate (60Hz), агенты независимы → par_iter_mut.
pub fn resolve_character_movement(
    mut agents: Query<(
        Entity,
        &KinematicController,
        &MovementInput,
        &mut KinematicState,
        &mut Transform,
        &Collider,
    )>,
    live_colliders: Query<(&'static Collider, Option<&'static CollisionGroups>)>,
    snapshot: Res<CollisionSnapshot>,
    settings: Res<ResolverSettings>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }

    let world: &CollisionSnapshot = &snapshot;
    let settings: &ResolverSettings = &settings;
    let filters = LiveFilters {
        colliders: &live_colliders,
    };

    agents.par_iter_mut().for_each(
        |(entity, controller, input, mut state, mut transform, collider)| {
            let Some(shape) = AgentShape::from_collider(collider) else {
                crate::log_warning(&format!(
                    "resolve_character_movement: unsupported collider shape on {:?}",
                    entity
                ));
                return;
            };

            let ctx = ResolveContext {
                world,
                filters: &filters,
                settings,
                entity: Some(entity),
                shape,
            };
            resolve_tick(&ctx, controller, input, &mut state, &mut transform, delta);
        },
    );
}

/// Plugin для kinematic контроллера
///
/// Регистрирует системы в FixedUpdate для детерминизма:
/// snapshot → steering → resolve.
pub struct KinematicControllerPlugin;

impl Plugin for KinematicControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CollisionSnapshot>()
            .init_resource::<ResolverSettings>()
            .register_type::<KinematicController>()
            .register_type::<KinematicState>()
            .register_type::<MovementInput>()
            .add_systems(
                FixedUpdate,
                (
                    rebuild_collision_snapshot,
                    steer_towards_target,
                    resolve_character_movement,
                )
                    .chain(), // Последовательное выполнение
            );
    }
}

/// Spawn helper для создания kinematic агента
///
/// Создает entity с полным набором компонентов:
/// - Transform (GlobalTransform — required component)
/// - KinematicController / KinematicState / MovementInput
/// - Rapier: RigidBody + Collider (капсула из config) + CollisionGroups агента
pub fn spawn_kinematic_character(
    commands: &mut Commands,
    position: Vec3,
    config: &CharacterConfig,
) -> Result<Entity, ConfigError> {
    config.validate()?;

    let entity = commands
        .spawn((
            Transform::from_translation(position),
            config.controller(),
            KinematicState::default(),
            MovementInput::default(),
            RigidBody::KinematicPositionBased,
            config.shape().to_collider(),
            CollisionFilter::AGENT.to_groups(),
        ))
        .id();

    Ok(entity)
}

/// Spawn helper для статической геометрии уровня (пол, стены, ступеньки)
pub fn spawn_static_box(
    commands: &mut Commands,
    center: Vec3,
    half_extents: Vec3,
    filter: CollisionFilter,
) -> Entity {
    commands
        .spawn((
            Transform::from_translation(center),
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            filter.to_groups(),
        ))
        .id()
}
