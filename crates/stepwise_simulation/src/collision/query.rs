//! Collision Query Layer
//!
//! Три примитива поверх read-only collision world:
//! - swept shape cast (`sweep_all` / `closest_sweep`)
//! - fixed shape distance (`distance_all`)
//! - ray cast (`ray_all` / `closest_ray`)
//!
//! Каждый запрос фильтруется по `CollisionFilter` и исключает одну entity
//! (обычно сам агент). Результаты — owned `Vec`, живут до конца scope
//! вызывающего шага алгоритма.

use bevy::prelude::*;

use super::filters::CollisionFilter;
use super::shape::AgentShape;

/// Минимальная длина sweep/ray сегмента (короче — запрос не выполняется)
pub const MIN_QUERY_LENGTH: f32 = 1.0e-5;

/// Результат swept shape cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Во что попали (None — статическая геометрия без entity)
    pub entity: Option<Entity>,
    /// Точка контакта (world space)
    pub position: Vec3,
    /// Нормаль поверхности препятствия (world space, наружу)
    pub normal: Vec3,
    /// 0 = касание на старте, 1 = конец сегмента
    pub fraction: f32,
}

/// Результат distance query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceHit {
    pub entity: Option<Entity>,
    /// Ближайшая точка на препятствии (world space)
    pub position: Vec3,
    /// Нормаль препятствия, смотрит на query shape
    pub surface_normal: Vec3,
    /// Знаковое расстояние: < 0 — пенетрация
    pub distance: f32,
}

/// Результат ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Option<Entity>,
    pub position: Vec3,
    pub normal: Vec3,
    pub fraction: f32,
}

/// Общий доступ к entity hit'а (для post-hoc фильтрации)
pub trait QueryHit {
    fn entity(&self) -> Option<Entity>;
}

/// Hit с параметрической позицией вдоль сегмента
pub trait FractionalHit {
    fn fraction(&self) -> f32;
}

impl QueryHit for SweepHit {
    fn entity(&self) -> Option<Entity> {
        self.entity
    }
}

impl QueryHit for DistanceHit {
    fn entity(&self) -> Option<Entity> {
        self.entity
    }
}

impl QueryHit for RayHit {
    fn entity(&self) -> Option<Entity> {
        self.entity
    }
}

impl FractionalHit for SweepHit {
    fn fraction(&self) -> f32 {
        self.fraction
    }
}

impl FractionalHit for RayHit {
    fn fraction(&self) -> f32 {
        self.fraction
    }
}

/// Live lookup фильтра по entity
///
/// Фильтр, доступный запросу в момент построения snapshot, может отличаться
/// от актуального per-entity фильтра (например CollisionGroups поменяли
/// в этом же тике). Второй проход фильтрации идёт через этот trait.
pub trait FilterLookup {
    fn filter_of(&self, entity: Entity) -> Option<CollisionFilter>;
}

/// Read-only collision world
///
/// Реализуется `CollisionSnapshot`. Resolver зависит только от этого trait.
pub trait CollisionQuery {
    /// Все контакты при линейном перемещении `shape` из `from` в `to`
    fn sweep_all(
        &self,
        shape: &AgentShape,
        from: Vec3,
        to: Vec3,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Vec<SweepHit>;

    /// Все collider'ы в пределах `max_distance` от `shape` в позе `pose`
    fn distance_all(
        &self,
        shape: &AgentShape,
        max_distance: f32,
        pose: &Transform,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Vec<DistanceHit>;

    /// Все пересечения бесконечно тонкого луча `from → to`
    fn ray_all(
        &self,
        from: Vec3,
        to: Vec3,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Vec<RayHit>;

    /// Ближайший hit = `sweep_all` + min по fraction (ties → первый)
    fn closest_sweep(
        &self,
        shape: &AgentShape,
        from: Vec3,
        to: Vec3,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Option<SweepHit> {
        closest_by_fraction(self.sweep_all(shape, from, to, filter, exclude))
    }

    fn closest_ray(
        &self,
        from: Vec3,
        to: Vec3,
        filter: CollisionFilter,
        exclude: Option<Entity>,
    ) -> Option<RayHit> {
        closest_by_fraction(self.ray_all(from, to, filter, exclude))
    }
}

/// Min-by-fraction редукция; при равенстве побеждает первый встреченный
pub fn closest_by_fraction<H: FractionalHit>(hits: impl IntoIterator<Item = H>) -> Option<H> {
    let mut closest: Option<H> = None;
    for hit in hits {
        let is_closer = closest
            .as_ref()
            .map_or(true, |best| hit.fraction() < best.fraction());
        if is_closer {
            closest = Some(hit);
        }
    }
    closest
}

/// Стабильная сортировка по fraction (равные сохраняют входной порядок)
pub fn sort_by_fraction<H: FractionalHit>(hits: &mut [H]) {
    hits.sort_by(|a, b| a.fraction().total_cmp(&b.fraction()));
}

/// Минимальный по знаковому расстоянию distance hit (ties → первый)
pub fn smallest_distance(hits: &[DistanceHit]) -> Option<DistanceHit> {
    let mut smallest: Option<DistanceHit> = None;
    for hit in hits {
        if smallest.map_or(true, |best| hit.distance < best.distance) {
            smallest = Some(*hit);
        }
    }
    smallest
}

/// Второй проход фильтрации по live фильтру каждой entity
///
/// Удаляет hit'ы entity, у которых нет live фильтра или фильтр не
/// совместим с `filter`. Hit'ы без entity (статика) остаются.
pub fn trim_by_filter<H, L>(hits: &mut Vec<H>, lookup: &L, filter: CollisionFilter)
where
    H: QueryHit,
    L: FilterLookup + ?Sized,
{
    hits.retain(|hit| match hit.entity() {
        None => true,
        Some(entity) => lookup
            .filter_of(entity)
            .is_some_and(|live| CollisionFilter::is_collision_enabled(filter, live)),
    });
}
