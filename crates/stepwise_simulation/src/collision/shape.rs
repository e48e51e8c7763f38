//! Форма агента для collision запросов
//!
//! Закрытый набор вариантов {Capsule, Sphere, Box}. Конвертация из
//! rapier `Collider` через tagged dispatch (`as_capsule`/`as_ball`/`as_cuboid`),
//! без reinterpret сырых указателей на геометрию.

use bevy::prelude::*;
use bevy_rapier3d::parry::shape::SharedShape;
use bevy_rapier3d::prelude::Collider;

use crate::math::EPSILON;

/// Вертикально ориентированная выпуклая форма агента
///
/// Все размеры "полные": `half_height` у капсулы включает полусферы
/// (расстояние от центра до самой верхней точки).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentShape {
    Capsule { radius: f32, half_height: f32 },
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

impl AgentShape {
    /// Капсула по радиусу и полной высоте (0.4, 1.8 → стандартный humanoid)
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::Capsule {
            radius,
            half_height: (height * 0.5).max(radius),
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Box { half_extents }
    }

    /// Латеральный радиус (XZ)
    ///
    /// Для Box — большая из горизонтальных полуосей.
    pub fn radius(&self) -> f32 {
        match *self {
            Self::Capsule { radius, .. } => radius,
            Self::Sphere { radius } => radius,
            Self::Box { half_extents } => half_extents.x.max(half_extents.z),
        }
    }

    /// Расстояние от центра до верхней/нижней точки
    pub fn half_height(&self) -> f32 {
        match *self {
            Self::Capsule { half_height, .. } => half_height,
            Self::Sphere { radius } => radius,
            Self::Box { half_extents } => half_extents.y,
        }
    }

    /// Полуразмеры AABB (для broad phase)
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Self::Box { half_extents } => half_extents,
            _ => {
                let r = self.radius();
                Vec3::new(r, self.half_height(), r)
            }
        }
    }

    /// parry shape для narrow phase
    pub fn to_shared_shape(&self) -> SharedShape {
        match *self {
            Self::Capsule { radius, half_height } => {
                // parry капсула задаётся половиной цилиндрической части
                SharedShape::capsule_y((half_height - radius).max(0.0), radius)
            }
            Self::Sphere { radius } => SharedShape::ball(radius),
            Self::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
    }

    /// rapier Collider с той же геометрией (spawn helper)
    pub fn to_collider(&self) -> Collider {
        match *self {
            Self::Capsule { radius, half_height } => {
                Collider::capsule_y((half_height - radius).max(0.0), radius)
            }
            Self::Sphere { radius } => Collider::ball(radius),
            Self::Box { half_extents } => {
                Collider::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
    }

    /// Tagged dispatch из rapier Collider
    ///
    /// None для неподдерживаемых форм (trimesh, compound, наклонная капсула).
    pub fn from_collider(collider: &Collider) -> Option<Self> {
        let raw = &collider.raw;

        if let Some(capsule) = raw.as_capsule() {
            let a = capsule.segment.a;
            let b = capsule.segment.b;
            // Только вертикальные капсулы (сегмент вдоль Y)
            if (a.x - b.x).abs() > EPSILON || (a.z - b.z).abs() > EPSILON {
                return None;
            }
            return Some(Self::Capsule {
                radius: capsule.radius,
                half_height: capsule.half_height() + capsule.radius,
            });
        }

        if let Some(ball) = raw.as_ball() {
            return Some(Self::Sphere { radius: ball.radius });
        }

        if let Some(cuboid) = raw.as_cuboid() {
            let he = cuboid.half_extents;
            return Some(Self::Box {
                half_extents: Vec3::new(he.x, he.y, he.z),
            });
        }

        None
    }
}
