//! Vector/scalar утилиты для kinematic resolver
//!
//! Все сравнения epsilon-tolerant (EPSILON = 1mm).
//! Leaf-модуль: ни от чего в крейте не зависит.

use bevy::prelude::*;

/// Общий epsilon для сравнения float (метры / безразмерные fraction)
pub const EPSILON: f32 = 0.001;

/// Градусы → радианы
pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

/// |a - b| <= EPSILON
pub fn float_equals(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

/// Строгий вариант: |a - b| < EPSILON
pub fn is_approximately(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Скаляр равен 0 (в пределах EPSILON)
pub fn is_zero(a: f32) -> bool {
    float_equals(a, 0.0)
}

/// Все компоненты вектора равны 0 (в пределах EPSILON)
///
/// NaN компоненты НЕ считаются нулём — для NaN есть `has_nan`.
pub fn vec_is_zero(v: Vec3) -> bool {
    is_zero(v.x) && is_zero(v.y) && is_zero(v.z)
}

/// Покомпонентное сравнение векторов
pub fn vec_is_equal_to(a: Vec3, b: Vec3) -> bool {
    is_approximately(a.x, b.x) && is_approximately(a.y, b.y) && is_approximately(a.z, b.z)
}

/// Обнуляет компоненты, которые меньше EPSILON по модулю
pub fn zero_out(v: Vec3) -> Vec3 {
    let clean = |c: f32| if c.abs() < EPSILON { 0.0 } else { c };
    Vec3::new(clean(v.x), clean(v.y), clean(v.z))
}

pub fn has_nan(v: Vec3) -> bool {
    v.x.is_nan() || v.y.is_nan() || v.z.is_nan()
}

/// Проекция на горизонтальную плоскость (X, Z) как Vec2
pub fn to_xz(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Обнуляет Y компоненту (вектор остаётся в XZ плоскости)
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Нормализация с защитой от нуля и NaN
///
/// Возвращает None для нулевых/бесконечных/NaN векторов — вызывающий
/// код пропускает фазу вместо того чтобы протащить NaN дальше.
pub fn safe_normalize(v: Vec3) -> Option<Vec3> {
    if !v.is_finite() || v.length_squared() < EPSILON * EPSILON {
        return None;
    }
    Some(v.normalize())
}

/// Знаковый угол между 2D векторами (градусы, против часовой > 0)
pub fn angle_between_2d(a: Vec2, b: Vec2) -> f32 {
    let sin = a.x * b.y - b.x * a.y;
    let cos = a.x * b.x + a.y * b.y;
    sin.atan2(cos).to_degrees()
}

/// Горизонтальное направление → yaw orientation (радианы)
///
/// Конвенция: orientation = -atan2(z, x), т.е. +X → 0, +Z → -PI/2.
pub fn vector_to_orientation(direction: Vec3) -> f32 {
    -direction.z.atan2(direction.x)
}

/// Yaw orientation (радианы) → единичный горизонтальный вектор
///
/// Обратная функция к `vector_to_orientation`.
pub fn orientation_to_vector(orientation: f32) -> Vec3 {
    Vec3::new((-orientation).cos(), 0.0, (-orientation).sin())
}

/// Rotation вокруг +Y, при которой forward (-Z) смотрит вдоль `direction`
///
/// None если direction вырожденный в XZ плоскости.
pub fn yaw_rotation(direction: Vec3) -> Option<Quat> {
    let flat = safe_normalize(flatten(direction))?;
    // Bevy forward = -Z; yaw=0 смотрит в -Z
    let yaw = (-flat.x).atan2(-flat.z);
    Some(Quat::from_rotation_y(yaw))
}

#[cfg(test)]
mod math_tests;
