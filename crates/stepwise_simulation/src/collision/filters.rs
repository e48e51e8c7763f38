//! Collision categories и фильтры
//!
//! ## Архитектура:
//! - **belongs_to (битовая маска):** К какой категории относится collider
//! - **collides_with (битовая маска):** С какими категориями он может коллидировать
//! - Пара коллидирует только если обе стороны "согласны" (симметричная проверка)
//!
//! ## Категории (rapier Group):
//! - GROUP_1: Solid (статика: стены, препятствия)
//! - GROUP_2: Agent (kinematic персонажи/NPC)
//! - GROUP_3: Terrain (ландшафт)
//! - GROUP_4: ObstacleProbe (сенсоры obstacle avoidance)
//!
//! Предвычисленные фильтры симметричны: если A.collides_with содержит B,
//! то B.collides_with содержит A.

use bevy_rapier3d::prelude::{CollisionGroups, Group};
use serde::{Deserialize, Serialize};

// ============================================================================
// Категории
// ============================================================================

pub const CATEGORY_SOLID: Group = Group::GROUP_1;
pub const CATEGORY_AGENT: Group = Group::GROUP_2;
pub const CATEGORY_TERRAIN: Group = Group::GROUP_3;
pub const CATEGORY_OBSTACLE_PROBE: Group = Group::GROUP_4;

/// Фильтр collider'а / запроса
///
/// Семантика как у Unity/rapier: пара коллидирует если
/// `a.belongs_to & b.collides_with != 0 && b.belongs_to & a.collides_with != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub belongs_to: u32,
    pub collides_with: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionFilter {
    /// Всё со всем (дефолт rapier для collider без CollisionGroups)
    pub const ALL: Self = Self::new(Group::ALL, Group::ALL);

    /// Ни с чем
    pub const NONE: Self = Self::new(Group::NONE, Group::NONE);

    /// Статика: блокирует агентов и obstacle probes
    pub const SOLID: Self = Self::new(
        CATEGORY_SOLID,
        CATEGORY_AGENT.union(CATEGORY_OBSTACLE_PROBE),
    );

    /// Агенты: статика + другие агенты + terrain
    pub const AGENT: Self = Self::new(
        CATEGORY_AGENT,
        CATEGORY_SOLID.union(CATEGORY_AGENT).union(CATEGORY_TERRAIN),
    );

    /// Terrain: только агенты
    pub const TERRAIN: Self = Self::new(CATEGORY_TERRAIN, CATEGORY_AGENT);

    /// Obstacle probe: только статика
    pub const OBSTACLE_PROBE: Self = Self::new(CATEGORY_OBSTACLE_PROBE, CATEGORY_SOLID);

    /// Фильтр движения агента: {Agent, Solid, Terrain}
    ///
    /// Используется resolver'ом для горизонтальных/вертикальных sweep'ов.
    pub const MOVEMENT_QUERY: Self = Self::AGENT;

    pub const fn new(belongs_to: Group, collides_with: Group) -> Self {
        Self {
            belongs_to: belongs_to.bits(),
            collides_with: collides_with.bits(),
        }
    }

    /// Симметричная проверка "могут ли два фильтра коллидировать"
    pub const fn is_collision_enabled(a: Self, b: Self) -> bool {
        (a.belongs_to & b.collides_with) != 0 && (b.belongs_to & a.collides_with) != 0
    }

    pub const fn collides(self, other: Self) -> bool {
        Self::is_collision_enabled(self, other)
    }

    /// В rapier CollisionGroups (для spawn collider'ов)
    pub fn to_groups(self) -> CollisionGroups {
        CollisionGroups::new(
            Group::from_bits_truncate(self.belongs_to),
            Group::from_bits_truncate(self.collides_with),
        )
    }

    /// Из rapier CollisionGroups (snapshot rebuild, live lookup)
    pub fn from_groups(groups: &CollisionGroups) -> Self {
        Self::new(groups.memberships, groups.filters)
    }
}

/// Все предвычисленные фильтры категорий (для проверки симметрии)
pub const CATEGORY_FILTERS: [CollisionFilter; 4] = [
    CollisionFilter::SOLID,
    CollisionFilter::AGENT,
    CollisionFilter::TERRAIN,
    CollisionFilter::OBSTACLE_PROBE,
];

/// Название категории для debug логов
pub fn get_category_name(bits: u32) -> &'static str {
    if bits == CATEGORY_SOLID.bits() {
        "Solid"
    } else if bits == CATEGORY_AGENT.bits() {
        "Agent"
    } else if bits == CATEGORY_TERRAIN.bits() {
        "Terrain"
    } else if bits == CATEGORY_OBSTACLE_PROBE.bits() {
        "ObstacleProbe"
    } else {
        "Unknown"
    }
}
