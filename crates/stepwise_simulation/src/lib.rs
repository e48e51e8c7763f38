//! Stepwise Simulation Core
//!
//! Kinematic character movement на Bevy 0.16:
//! - collision: read-only snapshot мира + sweep/distance/ray запросы (parry)
//! - physics: resolver (step-up, slide, ground/ceiling) + ECS glue
//! - locomotion: arrive steering как источник MovementInput
//!
//! Всё в FixedUpdate (60Hz), детерминистично при одинаковом seed.

use std::time::Duration;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod collision;
pub mod components;
pub mod config;
pub mod locomotion;
pub mod logger;
pub mod math;
pub mod physics;

// Re-export базовых типов для удобства
pub use collision::{AgentShape, CollisionFilter, CollisionQuery, CollisionSnapshot};
pub use components::*;
pub use config::{CharacterConfig, ConfigError, ResolverSettings};
pub use locomotion::{steer_towards_target, ArriveTarget};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel,
    LogPrinter,
};
pub use physics::{
    resolve_tick, spawn_kinematic_character, spawn_static_box, KinematicControllerPlugin,
    ResolveContext,
};

/// Частота fixed тика симуляции
pub const SIMULATION_HZ: f64 = 60.0;

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ))
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            .add_plugins(KinematicControllerPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .add_plugins(KinematicControllerPlugin)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ)); // 60Hz FixedUpdate

    app
}

/// Прогоняет ровно `ticks` fixed тиков, независимо от wall clock
///
/// `app.update()` крутит FixedUpdate столько раз, сколько накопилось
/// реального времени; для тестов и headless прогонов нужен точный счёт.
pub fn run_fixed_ticks(app: &mut App, ticks: usize) {
    let timestep: Duration = app.world().resource::<Time<Fixed>>().timestep();
    for _ in 0..ticks {
        // Команды spawn'а из тестов/сцены применяем до тика
        app.world_mut().flush();
        app.world_mut()
            .resource_mut::<Time<Fixed>>()
            .advance_by(timestep);
        app.world_mut().run_schedule(FixedUpdate);
    }
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    // Собираем все компоненты в детерминированный формат
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
