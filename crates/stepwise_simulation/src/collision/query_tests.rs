//! Tests for the collision query layer.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bevy_rapier3d::prelude::Collider;

    use super::super::filters::CollisionFilter;
    use super::super::query::*;
    use super::super::shape::AgentShape;
    use super::super::snapshot::CollisionSnapshot;

    const TOLERANCE: f32 = 0.01;

    /// Стена x ∈ [1.5, 2.5], высокая и широкая
    fn wall_world() -> CollisionSnapshot {
        let mut snapshot = CollisionSnapshot::new();
        snapshot.add_box(
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.5, 2.0, 2.0),
            CollisionFilter::SOLID,
        );
        snapshot
    }

    fn spawn_entities(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_sweep_hits_wall_at_expected_fraction() {
        let snapshot = wall_world();
        let shape = AgentShape::sphere(0.5);

        let hits = snapshot.sweep_all(
            &shape,
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );

        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        // Центр сферы останавливается на x=1.0 → fraction 1/3
        assert!((hit.fraction - 1.0 / 3.0).abs() < TOLERANCE, "fraction = {}", hit.fraction);
        assert!((hit.position.x - 1.5).abs() < TOLERANCE, "position = {:?}", hit.position);
        assert!((hit.normal - Vec3::NEG_X).length() < TOLERANCE, "normal = {:?}", hit.normal);
        assert!(hit.entity.is_none());
    }

    #[test]
    fn test_sweep_miss_returns_empty() {
        let snapshot = wall_world();
        let hits = snapshot.sweep_all(
            &AgentShape::sphere(0.5),
            Vec3::ZERO,
            Vec3::new(-3.0, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_zero_length_sweep_returns_no_hits() {
        let snapshot = wall_world();
        // Сфера уже касается стены, но сегмент нулевой
        let start = Vec3::new(1.0, 0.0, 0.0);
        let hits = snapshot.sweep_all(
            &AgentShape::sphere(0.5),
            start,
            start,
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        assert!(hits.is_empty());
        assert!(snapshot
            .closest_sweep(&AgentShape::sphere(0.5), start, start, CollisionFilter::ALL, None)
            .is_none());
    }

    #[test]
    fn test_nan_sweep_returns_no_hits() {
        let snapshot = wall_world();
        let hits = snapshot.sweep_all(
            &AgentShape::sphere(0.5),
            Vec3::ZERO,
            Vec3::NAN,
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_touching_at_start_is_fraction_zero_not_none() {
        let snapshot = wall_world();
        // Сфера слегка внутри стены → hit на fraction 0
        let hit = snapshot.closest_sweep(
            &AgentShape::sphere(0.5),
            Vec3::new(1.01, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        let hit = hit.expect("касание на старте должно быть hit'ом");
        assert_eq!(hit.fraction, 0.0);
    }

    #[test]
    fn test_sweep_excludes_self_entity() {
        let entities = spawn_entities(2);
        let (agent, other) = (entities[0], entities[1]);

        let mut snapshot = CollisionSnapshot::new();
        let collider = Collider::ball(0.5);
        // Свой collider — прямо на пути
        snapshot.insert_entity(
            agent,
            &collider,
            &Transform::from_xyz(0.0, 0.0, 0.0),
            Some(&CollisionFilter::AGENT.to_groups()),
        );
        snapshot.insert_entity(
            other,
            &collider,
            &Transform::from_xyz(3.0, 0.0, 0.0),
            Some(&CollisionFilter::AGENT.to_groups()),
        );

        let hits = snapshot.sweep_all(
            &AgentShape::sphere(0.5),
            Vec3::ZERO,
            Vec3::new(4.0, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            Some(agent),
        );

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, Some(other));
    }

    #[test]
    fn test_sweep_respects_filter() {
        let mut snapshot = CollisionSnapshot::new();
        // Probe-only геометрия не блокирует агентов
        snapshot.add_box(
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.5, 2.0, 2.0),
            CollisionFilter::OBSTACLE_PROBE,
        );

        let hits = snapshot.sweep_all(
            &AgentShape::sphere(0.5),
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_closest_sweep_matches_sweep_all_min() {
        let mut snapshot = wall_world();
        // Вторая стена дальше
        snapshot.add_box(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(0.5, 2.0, 2.0),
            CollisionFilter::SOLID,
        );
        let shape = AgentShape::sphere(0.5);
        let to = Vec3::new(8.0, 0.0, 0.0);

        let all = snapshot.sweep_all(&shape, Vec3::ZERO, to, CollisionFilter::MOVEMENT_QUERY, None);
        let closest = snapshot
            .closest_sweep(&shape, Vec3::ZERO, to, CollisionFilter::MOVEMENT_QUERY, None)
            .unwrap();

        assert_eq!(all.len(), 2);
        let min_fraction = all.iter().map(|h| h.fraction).fold(f32::MAX, f32::min);
        assert_eq!(closest.fraction, min_fraction);
    }

    #[test]
    fn test_tie_break_first_encountered() {
        let a = SweepHit {
            entity: None,
            position: Vec3::X,
            normal: Vec3::NEG_X,
            fraction: 0.5,
        };
        let b = SweepHit {
            position: Vec3::Z,
            normal: Vec3::NEG_Z,
            ..a
        };
        let c = SweepHit { fraction: 0.7, ..a };

        let closest = closest_by_fraction(vec![c, a, b]).unwrap();
        assert_eq!(closest.position, Vec3::X);

        let mut hits = vec![c, b, a];
        sort_by_fraction(&mut hits);
        // Стабильная сортировка: b раньше a, как во входе
        assert_eq!(hits[0].position, Vec3::Z);
        assert_eq!(hits[1].position, Vec3::X);
        assert_eq!(hits[2].fraction, 0.7);
    }

    #[test]
    fn test_distance_all_reports_penetration() {
        let snapshot = wall_world();
        // Сфера r=0.5 в x=1.3 → пенетрация 0.3
        let hits = snapshot.distance_all(
            &AgentShape::sphere(0.5),
            0.1,
            &Transform::from_xyz(1.3, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );

        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert!((hit.distance + 0.3).abs() < TOLERANCE, "distance = {}", hit.distance);
        assert!((hit.surface_normal - Vec3::NEG_X).length() < TOLERANCE);

        let smallest = smallest_distance(&hits).unwrap();
        assert_eq!(smallest.distance, hit.distance);
    }

    #[test]
    fn test_distance_all_respects_max_distance() {
        let snapshot = wall_world();
        let near = snapshot.distance_all(
            &AgentShape::sphere(0.5),
            0.6,
            &Transform::from_xyz(0.5, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        let far = snapshot.distance_all(
            &AgentShape::sphere(0.5),
            0.1,
            &Transform::from_xyz(0.5, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );

        assert_eq!(near.len(), 1);
        assert!((near[0].distance - 0.5).abs() < TOLERANCE);
        assert!(far.is_empty());
    }

    #[test]
    fn test_ray_all_and_closest_ray() {
        let snapshot = wall_world();
        let hit = snapshot
            .closest_ray(
                Vec3::ZERO,
                Vec3::new(3.0, 0.0, 0.0),
                CollisionFilter::MOVEMENT_QUERY,
                None,
            )
            .unwrap();

        assert!((hit.fraction - 0.5).abs() < TOLERANCE, "fraction = {}", hit.fraction);
        assert!((hit.position.x - 1.5).abs() < TOLERANCE);
        assert!((hit.normal - Vec3::NEG_X).length() < TOLERANCE);

        let miss = snapshot.ray_all(
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            CollisionFilter::MOVEMENT_QUERY,
            None,
        );
        assert!(miss.is_empty());
    }

    #[test]
    fn test_trim_by_filter_uses_live_filters() {
        let entities = spawn_entities(2);
        let (terrain, probe) = (entities[0], entities[1]);

        let mut snapshot = CollisionSnapshot::new();
        let collider = Collider::cuboid(0.5, 0.5, 0.5);
        snapshot.insert_entity(
            terrain,
            &collider,
            &Transform::from_xyz(2.0, 0.0, 0.0),
            Some(&CollisionFilter::TERRAIN.to_groups()),
        );
        snapshot.insert_entity(
            probe,
            &collider,
            &Transform::from_xyz(4.0, 0.0, 0.0),
            Some(&CollisionFilter::OBSTACLE_PROBE.to_groups()),
        );

        // Broad query видит всё
        let mut hits = snapshot.sweep_all(
            &AgentShape::sphere(0.25),
            Vec3::ZERO,
            Vec3::new(6.0, 0.0, 0.0),
            CollisionFilter::ALL,
            None,
        );
        assert_eq!(hits.len(), 2);

        // Post-hoc: только то, что совместимо с фильтром агента
        trim_by_filter(&mut hits, &snapshot, CollisionFilter::AGENT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, Some(terrain));
    }

    #[test]
    fn test_trim_by_filter_keeps_static_geometry() {
        let mut hits = vec![SweepHit {
            entity: None,
            position: Vec3::ZERO,
            normal: Vec3::Y,
            fraction: 0.0,
        }];
        let snapshot = CollisionSnapshot::new();
        trim_by_filter(&mut hits, &snapshot, CollisionFilter::NONE);
        assert_eq!(hits.len(), 1);
    }
}
