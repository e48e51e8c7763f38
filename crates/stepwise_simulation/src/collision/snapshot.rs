//! Immutable collision world snapshot
//!
//! Архитектура:
//! - Snapshot перестраивается ОДИН раз в начале тика (`rebuild_collision_snapshot`)
//! - Пока работает resolver — только чтение (`Res<CollisionSnapshot>`)
//! - Broad phase: AABB overlap против кешированных AABB collider'ов
//! - Narrow phase: parry (`cast_shapes`, `contact`, `cast_ray_and_get_normal`)
//!
//! Агент A, сдвинутый в этом тике, НЕ влияет на запросы агента B до
//! следующего rebuild (one-tick staleness ради параллельности).

use std::collections::HashMap;

use bevy::prelude::*;
use bevy_rapier3d::parry::math::{Isometry, Point, Real, Vector};
use bevy_rapier3d::parry::na::{Quaternion, Translation3, UnitQuaternion};
use bevy_rapier3d::parry::query::{cast_shapes, contact, Ray, ShapeCastOptions};
use bevy_rapier3d::parry::shape::SharedShape;
use bevy_rapier3d::prelude::{Collider, CollisionGroups};

use super::filters::CollisionFilter;
use super::query::{
    CollisionQuery, DistanceHit, FilterLookup, RayHit, SweepHit, MIN_QUERY_LENGTH,
};
use super::shape::AgentShape;
use crate::log_warning;

/// Один collider в snapshot
#[derive(Debug, Clone)]
pub struct SnapshotCollider {
    /// Владелец (None — статическая геометрия уровня)
    pub entity: Option<Entity>,
    pub shape: SharedShape,
    pub pose: Isometry<Real>,
    pub filter: CollisionFilter,
    aabb_min: Vec3,
    aabb_max: Vec3,
}

impl SnapshotCollider {
    pub fn new(
        entity: Option<Entity>,
        shape: SharedShape,
        translation: Vec3,
        rotation: Quat,
        filter: CollisionFilter,
    ) -> Self {
        let pose = to_isometry(translation, rotation);
        let aabb = shape.compute_aabb(&pose);
        Self {
            entity,
            shape,
            pose,
            filter,
            aabb_min: from_point(&aabb.mins),
            aabb_max: from_point(&aabb.maxs),
        }
    }

    fn overlaps(&self, min: Vec3, max: Vec3) -> bool {
        self.aabb_min.cmple(max).all() && self.aabb_max.cmpge(min).all()
    }
}

/// Read-only snapshot collision world на один тик
#[derive(Resource, Debug, Default)]
pub struct CollisionSnapshot {
    colliders: Vec<SnapshotCollider>,
    by_entity: HashMap<Entity, usize>,
    /// Сколько раз snapshot перестраивался (debug)
    pub generation: u64,
}

impl CollisionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Очистить перед rebuild
    pub fn clear(&mut self) {
        self.colliders.clear();
        self.by_entity.clear();
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn colliders(&self) -> &[SnapshotCollider] {
        &self.colliders
    }

    /// Добавить collider (entity или статика)
    pub fn insert(&mut self, collider: SnapshotCollider) {
        if let Some(entity) = collider.entity {
            self.by_entity.insert(entity, self.colliders.len());
        }
        self.colliders.push(collider);
    }

    /// Добавить ECS collider (rapier `Collider` + `Transform`)
    ///
    /// Без CollisionGroups → all-with-all (дефолт rapier).
    pub fn insert_entity(
        &mut self,
        entity: Entity,
        collider: &Collider,
        transform: &Transform,
        groups: Option<&CollisionGroups>,
    ) {
        let filter = groups.map_or(CollisionFilter::ALL, CollisionFilter::from_groups);
        self.insert(SnapshotCollider::new(
            Some(entity),
            collider.raw.clone(),
            transform.translation,
            transform.rotation,
            filter,
        ));
    }

    /// Статический box уровня (стены, пол, ступеньки)
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, filter: CollisionFilter) {
        self.add_rotated_box(center, half_extents, Quat::IDENTITY, filter);
    }

    pub fn add_rotated_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        filter: CollisionFilter,
    ) {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        self.insert(SnapshotCollider::new(None, shape, center, rotation, filter));
    }

    /// Кандидаты broad phase: фильтр + exclude + AABB overlap
    fn candidates(
        &self,
        filter: CollisionFilter,
        exclude: Option<Entity>,
        min: Vec3,
        max: Vec3,
    ) -> impl Iterator<Item = &SnapshotCollider> + '_ {
        self.colliders.iter().filter(move |collider| {
            let excluded = exclude.is_some() && collider.entity == exclude;
            !excluded && filter.collides(collider.filter) && collider.overlaps(min, max)
        })
    }
}

impl FilterLookup for CollisionSnapshot {
    fn filter_of(&self, entity: Entity) -> Option<CollisionFilter> {
        self.by_entity
            .get(&entity)
            .and_then(|&index| self.colliders.get(index))
            .map(|collider| collider.filter)
    }
}

impl CollisionQuery for CollisionSnapshot {
    fn sweep_all(
        &self,
        shape: &AgentShape,
        from: Vec3,
        to: Vec3,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Vec<SweepHit> {
        let delta = to - from;
        // Нулевой/NaN сегмент — без обращения к broad phase
        if !from.is_finite() || !delta.is_finite() || delta.length() < MIN_QUERY_LENGTH {
            return Vec::new();
        }

        let half = shape.half_extents();
        let sweep_min = from.min(to) - half;
        let sweep_max = from.max(to) + half;

        let query_shape = shape.to_shared_shape();
        let query_pose = to_isometry(from, Quat::IDENTITY);
        let velocity = to_vector(delta);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };

        let mut hits = Vec::new();
        for collider in self.candidates(filter, exclude, sweep_min, sweep_max) {
            let result = cast_shapes(
                &query_pose,
                &velocity,
                query_shape.as_ref(),
                &collider.pose,
                &Vector::zeros(),
                collider.shape.as_ref(),
                options,
            );

            match result {
                Ok(Some(hit)) => {
                    // witness2/normal2 — в локальных координатах collider'а
                    let position = collider.pose * hit.witness2;
                    let normal = collider.pose * hit.normal2.into_inner();
                    hits.push(SweepHit {
                        entity: collider.entity,
                        position: from_point(&position),
                        normal: from_vector(&normal),
                        fraction: hit.time_of_impact.clamp(0.0, 1.0),
                    });
                }
                Ok(None) => {}
                Err(_) => {
                    log_warning(&format!(
                        "sweep_all: unsupported shape pair (collider {:?})",
                        collider.entity
                    ));
                }
            }
        }

        hits
    }

    fn distance_all(
        &self,
        shape: &AgentShape,
        max_distance: f32,
        pose: &Transform,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Vec<DistanceHit> {
        if !pose.translation.is_finite() || !max_distance.is_finite() || max_distance < 0.0 {
            return Vec::new();
        }

        // Bounding sphere формы (поза может быть повёрнута)
        let reach = Vec3::splat(shape.half_extents().length() + max_distance);
        let min = pose.translation - reach;
        let max = pose.translation + reach;

        let query_shape = shape.to_shared_shape();
        let query_pose = to_isometry(pose.translation, pose.rotation);

        let mut hits = Vec::new();
        for collider in self.candidates(filter, exclude, min, max) {
            let result = contact(
                &query_pose,
                query_shape.as_ref(),
                &collider.pose,
                collider.shape.as_ref(),
                max_distance,
            );

            match result {
                Ok(Some(found)) => {
                    // contact() отдаёт точки и нормали уже в world space
                    hits.push(DistanceHit {
                        entity: collider.entity,
                        position: from_point(&found.point2),
                        surface_normal: from_vector(&found.normal2.into_inner()),
                        distance: found.dist,
                    });
                }
                Ok(None) => {}
                Err(_) => {
                    log_warning(&format!(
                        "distance_all: unsupported shape pair (collider {:?})",
                        collider.entity
                    ));
                }
            }
        }

        hits
    }

    fn ray_all(
        &self,
        from: Vec3,
        to: Vec3,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Vec<RayHit> {
        let delta = to - from;
        if !from.is_finite() || !delta.is_finite() || delta.length() < MIN_QUERY_LENGTH {
            return Vec::new();
        }

        let ray = Ray::new(to_point(from), to_vector(delta));
        let min = from.min(to);
        let max = from.max(to);

        let mut hits = Vec::new();
        for collider in self.candidates(filter, exclude, min, max) {
            // max_time_of_impact = 1.0 → time_of_impact и есть fraction
            if let Some(intersection) =
                collider
                    .shape
                    .cast_ray_and_get_normal(&collider.pose, &ray, 1.0, true)
            {
                let fraction = intersection.time_of_impact.clamp(0.0, 1.0);
                hits.push(RayHit {
                    entity: collider.entity,
                    position: from + delta * fraction,
                    normal: from_vector(&intersection.normal),
                    fraction,
                });
            }
        }

        hits
    }
}

// ============================================================================
// glam ↔ nalgebra
// ============================================================================

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub(crate) fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

pub(crate) fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn from_point(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub(crate) fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::new_normalize(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry::from_parts(
        Translation3::new(translation.x, translation.y, translation.z),
        rotation,
    )
}
