//! Headless симуляция Stepwise
//!
//! Сцена: пол, стена, ступенька и несколько агентов с ArriveTarget.
//! Прогоняет фиксированное число тиков и печатает позиции агентов.

use bevy::prelude::*;
use rand::Rng;
use stepwise_simulation::{
    create_headless_app, log_error, log_info, run_fixed_ticks, spawn_kinematic_character,
    spawn_static_box, ArriveTarget, CharacterConfig, CollisionFilter, DeterministicRng,
    KinematicState,
};

const AGENT_COUNT: usize = 8;
const TICK_COUNT: usize = 600;

fn main() {
    let seed = 42;
    let mut app = create_headless_app(seed);
    log_info(&format!("Starting Stepwise headless simulation (seed: {})", seed));

    let config = CharacterConfig::default();
    {
        let world = app.world_mut();
        let mut positions = Vec::with_capacity(AGENT_COUNT);
        {
            let mut rng = world.resource_mut::<DeterministicRng>();
            for _ in 0..AGENT_COUNT {
                let x = rng.rng.gen_range(-8.0..-2.0);
                let z = rng.rng.gen_range(-4.0..4.0);
                positions.push(Vec3::new(x, 0.9, z));
            }
        }

        let mut commands = world.commands();
        // Пол (верх на y=0), стена с проходом, ступенька 0.2m
        spawn_static_box(
            &mut commands,
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(30.0, 0.5, 30.0),
            CollisionFilter::SOLID,
        );
        spawn_static_box(
            &mut commands,
            Vec3::new(0.0, 1.5, 3.0),
            Vec3::new(0.25, 1.5, 2.0),
            CollisionFilter::SOLID,
        );
        spawn_static_box(
            &mut commands,
            Vec3::new(4.0, 0.1, 0.0),
            Vec3::new(1.0, 0.1, 6.0),
            CollisionFilter::SOLID,
        );

        for position in positions {
            match spawn_kinematic_character(&mut commands, position, &config) {
                Ok(entity) => {
                    commands.entity(entity).insert(
                        ArriveTarget::new(Vec3::new(8.0, 0.0, 0.0), 0.5)
                            .with_avoidance(2.0)
                            .with_rotation_speed(8.0),
                    );
                }
                Err(err) => {
                    log_error(&format!("spawn failed: {}", err));
                    return;
                }
            }
        }
    }

    for chunk in 0..(TICK_COUNT / 100) {
        run_fixed_ticks(&mut app, 100);

        let world = app.world_mut();
        let mut agents = world.query::<(Entity, &Transform, &KinematicState)>();
        let grounded = agents.iter(world).filter(|(_, _, state)| state.is_grounded).count();
        log_info(&format!(
            "Tick {}: {} agents, {} grounded",
            (chunk + 1) * 100,
            AGENT_COUNT,
            grounded
        ));
    }

    let world = app.world_mut();
    let mut agents = world.query_filtered::<(Entity, &Transform), With<KinematicState>>();
    let mut rows: Vec<_> = agents
        .iter(world)
        .map(|(entity, transform)| (entity.index(), transform.translation))
        .collect();
    rows.sort_by_key(|(index, _)| *index);
    for (index, position) in rows {
        log_info(&format!("agent {}: {:?}", index, position));
    }

    log_info("Simulation complete!");
}
