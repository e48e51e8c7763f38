//! Tests for math utilities.

use super::*;

#[test]
fn test_float_equals_within_epsilon() {
    assert!(float_equals(1.0, 1.0005));
    assert!(!float_equals(1.0, 1.01));
}

#[test]
fn test_vec_is_zero() {
    assert!(vec_is_zero(Vec3::ZERO));
    assert!(vec_is_zero(Vec3::new(0.0005, -0.0005, 0.0)));
    assert!(!vec_is_zero(Vec3::new(0.0, 0.1, 0.0)));
    // NaN никогда не "ноль"
    assert!(!vec_is_zero(Vec3::NAN));
}

#[test]
fn test_zero_out_small_components() {
    let v = zero_out(Vec3::new(0.0004, 1.0, -0.0009));
    assert_eq!(v, Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_safe_normalize_guards() {
    assert!(safe_normalize(Vec3::ZERO).is_none());
    assert!(safe_normalize(Vec3::NAN).is_none());
    assert!(safe_normalize(Vec3::new(f32::INFINITY, 0.0, 0.0)).is_none());

    let n = safe_normalize(Vec3::new(3.0, 0.0, 4.0)).unwrap();
    assert!((n.length() - 1.0).abs() < 1e-6);
}

#[test]
fn test_angle_between_2d_signed() {
    let angle = angle_between_2d(Vec2::X, Vec2::Y);
    assert!((angle - 90.0).abs() < 1e-4, "angle = {}", angle);

    let angle = angle_between_2d(Vec2::Y, Vec2::X);
    assert!((angle + 90.0).abs() < 1e-4, "angle = {}", angle);
}

#[test]
fn test_orientation_roundtrip() {
    for degrees in [0.0_f32, 45.0, 90.0, 135.0, -60.0] {
        let direction = orientation_to_vector(degrees * DEG_TO_RAD);
        let back = vector_to_orientation(direction);
        let again = orientation_to_vector(back);
        assert!(vec_is_equal_to(direction, again), "{} → {:?} vs {:?}", degrees, direction, again);
        assert!(is_zero(direction.y));
    }
}

#[test]
fn test_yaw_rotation_faces_direction() {
    let rotation = yaw_rotation(Vec3::X).unwrap();
    let forward = rotation * Vec3::NEG_Z;
    assert!(vec_is_equal_to(forward, Vec3::X), "forward = {:?}", forward);

    // Вертикальный вектор не даёт yaw
    assert!(yaw_rotation(Vec3::Y).is_none());
}
