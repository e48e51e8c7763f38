//! Kinematic movement resolver (один агент, один тик)
//!
//! Чистая функция над read-only collision world:
//! 1. desired vertical velocity (gravity, drag, ground reset, jump)
//! 2. desired horizontal displacement (input * speed * dt)
//! 3. horizontal phase: side-wall band → step-up probe → slide
//! 4. vertical phase: sweep вдоль v*dt (или skin probe вдоль gravity)
//! 5. commit position + state
//! 6. penetration correction (distance probe у основания)
//! 7. orientation по направлению движения
//!
//! Порядок фаз зафиксирован: горизонталь, затем вертикаль из уже
//! сдвинутой позиции. Resolver не пишет в collision world, поэтому
//! агенты одного тика можно резолвить параллельно.

use bevy::prelude::*;

use crate::collision::{
    smallest_distance, sort_by_fraction, trim_by_filter, AgentShape, CollisionFilter,
    CollisionQuery, FilterLookup, SweepHit,
};
use crate::components::movement::{KinematicController, KinematicState, MovementInput};
use crate::config::ResolverSettings;
use crate::logger::{is_enabled, LogLevel};
use crate::math::{
    flatten, is_zero, safe_normalize, to_xz, vec_is_equal_to, vec_is_zero, yaw_rotation, EPSILON,
};

/// Минимальная длина вертикального смещения, при которой делаем настоящий sweep
const MIN_VERTICAL_TRAVEL: f32 = 1.0e-5;

/// Всё, что нужно resolver'у кроме самого агента
pub struct ResolveContext<'a> {
    pub world: &'a dyn CollisionQuery,
    /// Live фильтры entity (второй проход фильтрации)
    pub filters: &'a dyn FilterLookup,
    pub settings: &'a ResolverSettings,
    /// Сам агент (исключается из запросов)
    pub entity: Option<Entity>,
    pub shape: AgentShape,
}

/// Результат горизонтальной фазы
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HorizontalResolution {
    /// Итоговое горизонтальное смещение
    pub displacement: Vec3,
    /// Подъём на ступеньку (0 если не шагали)
    pub step_raise: f32,
    /// Препятствие, на которое упёрлись (после band фильтра)
    pub blocking: Option<SweepHit>,
    pub stepped: bool,
    pub slid: bool,
}

/// Результат вертикальной фазы
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VerticalResolution {
    pub displacement: Vec3,
    /// Скорость, которая переносится в следующий тик
    pub velocity: Vec3,
    pub grounded: bool,
    pub hit: Option<SweepHit>,
}

/// Сводка тика (для тестов и debug логов)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutcome {
    pub horizontal: HorizontalResolution,
    pub vertical: VerticalResolution,
    pub penetration_push: Vec3,
}

/// Полный тик одного агента
///
/// Мутирует только `state` и `transform`. dt <= 0 или NaN → no-op.
pub fn resolve_tick(
    ctx: &ResolveContext,
    controller: &KinematicController,
    input: &MovementInput,
    state: &mut KinematicState,
    transform: &mut Transform,
    dt: f32,
) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    if !dt.is_finite() || dt <= 0.0 {
        return outcome;
    }

    let start = transform.translation;
    let velocity = desired_vertical_velocity(controller, input, state, dt);

    // Горизонталь
    let mut position = start;
    if let Some(desired) = desired_horizontal_displacement(controller, input, dt) {
        outcome.horizontal = resolve_horizontal(ctx, controller, position, desired);
        position.y += outcome.horizontal.step_raise;
        position += outcome.horizontal.displacement;
    }

    // Вертикаль — из уже сдвинутой позиции
    outcome.vertical = resolve_vertical(ctx, controller, position, velocity, dt);
    position += outcome.vertical.displacement;

    outcome.penetration_push = correct_penetration(ctx, controller, position);
    position += outcome.penetration_push;

    if !position.is_finite() {
        crate::log_warning(&format!(
            "resolve_tick: non-finite position for {:?}, tick dropped",
            ctx.entity
        ));
        return TickOutcome::default();
    }

    transform.translation = position;
    state.is_grounded = outcome.vertical.grounded;
    state.vertical_velocity = outcome.vertical.velocity;
    state.horizontal_velocity = outcome.horizontal.displacement / dt;

    if controller.face_movement {
        if let Some(rotation) = yaw_rotation(outcome.horizontal.displacement) {
            transform.rotation = rotation;
        }
    }

    if outcome.horizontal.stepped && is_enabled(LogLevel::Debug) {
        crate::log(&format!(
            "{:?} stepped up {:.3}m",
            ctx.entity, outcome.horizontal.step_raise
        ));
    }

    outcome
}

/// Шаг 1: вертикальная скорость до коллизий
///
/// На земле скорость сбрасывается (не clamp), прыжок заменяет её целиком.
pub fn desired_vertical_velocity(
    controller: &KinematicController,
    input: &MovementInput,
    state: &KinematicState,
    dt: f32,
) -> Vec3 {
    if state.is_grounded {
        return if input.jump {
            up_direction(controller.gravity) * controller.jump_strength
        } else {
            Vec3::ZERO
        };
    }

    let mut velocity = state.vertical_velocity + controller.gravity * dt;
    if controller.drag > 0.0 {
        velocity *= (1.0 - controller.drag * dt).max(0.0);
    }

    if velocity.is_finite() {
        velocity
    } else {
        Vec3::ZERO
    }
}

/// Шаг 2: желаемое горизонтальное смещение
///
/// None — фаза пропускается (нулевой или NaN input).
pub fn desired_horizontal_displacement(
    controller: &KinematicController,
    input: &MovementInput,
    dt: f32,
) -> Option<Vec3> {
    let magnitude = input.magnitude.clamp(0.0, 1.0);
    let displacement = flatten(input.direction) * magnitude * controller.speed * dt;
    if !displacement.is_finite() || vec_is_zero(displacement) {
        return None;
    }
    Some(displacement)
}

/// Шаг 3: горизонтальная фаза
pub fn resolve_horizontal(
    ctx: &ResolveContext,
    controller: &KinematicController,
    position: Vec3,
    desired: Vec3,
) -> HorizontalResolution {
    let free = HorizontalResolution {
        displacement: desired,
        ..Default::default()
    };

    let mut hits = side_wall_hits(ctx, position, desired);
    if hits.is_empty() {
        return free;
    }
    sort_by_fraction(&mut hits);
    let nearest = hits[0];

    if let Some(raise) = probe_step(ctx, controller, position, &nearest) {
        // С поднятой позиции путь заново: за ступенькой может стоять стена
        let raised = position + Vec3::Y * raise;
        let mut ahead = side_wall_hits(ctx, raised, desired);
        sort_by_fraction(&mut ahead);
        let displacement = match ahead.first() {
            Some(wall) => slide_along(ctx, raised, desired, wall),
            None => desired,
        };
        return HorizontalResolution {
            displacement,
            step_raise: raise,
            blocking: ahead.first().copied().or(Some(nearest)),
            stepped: true,
            slid: !ahead.is_empty(),
        };
    }

    HorizontalResolution {
        displacement: slide_along(ctx, position, desired, &nearest),
        step_raise: 0.0,
        blocking: Some(nearest),
        stepped: false,
        slid: true,
    }
}

/// Sweep вдоль `displacement`, только hit'ы в side-wall band агента,
/// нормаль которых смотрит против движения
fn side_wall_hits(ctx: &ResolveContext, position: Vec3, displacement: Vec3) -> Vec<SweepHit> {
    let half_height = ctx.shape.half_height();
    let tolerance = ctx.settings.side_wall_tolerance;
    let top = position.y + half_height - tolerance;
    let bottom = position.y - half_height + tolerance;

    let mut hits = ctx.world.sweep_all(
        &ctx.shape,
        position,
        position + displacement,
        CollisionFilter::MOVEMENT_QUERY,
        ctx.entity,
    );
    trim_by_filter(&mut hits, ctx.filters, CollisionFilter::MOVEMENT_QUERY);
    hits.retain(|hit| {
        hit.position.y < top && hit.position.y > bottom && hit.normal.dot(displacement) < 0.0
    });
    hits
}

/// Step-up probe: sweep вниз над точкой контакта
///
/// Some(raise) если препятствие ниже `max_step` (старт probe свободен).
fn probe_step(
    ctx: &ResolveContext,
    controller: &KinematicController,
    position: Vec3,
    obstacle: &SweepHit,
) -> Option<f32> {
    if controller.max_step <= 0.0 || !controller.max_step.is_finite() {
        return None;
    }

    let probe_top = Vec3::new(
        obstacle.position.x,
        position.y + controller.max_step,
        obstacle.position.z,
    );
    let probe_bottom = Vec3::new(obstacle.position.x, position.y, obstacle.position.z);

    let mut hits = ctx.world.sweep_all(
        &ctx.shape,
        probe_top,
        probe_bottom,
        CollisionFilter::MOVEMENT_QUERY,
        ctx.entity,
    );
    trim_by_filter(&mut hits, ctx.filters, CollisionFilter::MOVEMENT_QUERY);
    sort_by_fraction(&mut hits);

    let fraction = hits.first().map_or(1.0, |hit| hit.fraction);
    // fraction 0 — probe стартует внутри препятствия: слишком высоко
    if fraction <= 0.0 {
        return None;
    }
    Some(controller.max_step * (1.0 - fraction))
}

/// Slide: сдвиг вдоль стены на оставшуюся часть пути
///
/// `|slide| <= |desired|`, направление не разворачивается назад.
/// Второе (другое) препятствие на пути slide обрезает его.
fn slide_along(
    ctx: &ResolveContext,
    position: Vec3,
    desired: Vec3,
    obstacle: &SweepHit,
) -> Vec3 {
    let length = desired.length();
    let normal = flatten(obstacle.normal);
    let mut slide = desired + normal * (1.0 - obstacle.fraction) * length;

    let slide_length = slide.length();
    if slide_length > length && slide_length > 0.0 {
        slide *= length / slide_length;
    }

    if !slide.is_finite() || vec_is_zero(slide) {
        return Vec3::ZERO;
    }

    let direction = slide / slide.length();
    let mut hits = side_wall_hits(ctx, position, slide);
    sort_by_fraction(&mut hits);
    for hit in &hits {
        // Та же поверхность — её уже учли
        if vec_is_equal_to(hit.normal, obstacle.normal) {
            continue;
        }
        // Касание на старте поверхности, от которой уходим
        if hit.fraction < EPSILON && hit.normal.dot(direction) >= 0.0 {
            continue;
        }
        slide *= hit.fraction;
        break;
    }

    // Slide не может утянуть агента по вертикали
    if !is_zero(slide.y) {
        return Vec3::ZERO;
    }
    slide
}

/// Шаг 4: вертикальная фаза
pub fn resolve_vertical(
    ctx: &ResolveContext,
    controller: &KinematicController,
    position: Vec3,
    velocity: Vec3,
    dt: f32,
) -> VerticalResolution {
    let displacement = velocity * dt;

    // Нулевое смещение — короткий skin probe вдоль gravity, чтобы
    // стоящий агент оставался grounded
    let sweep = if displacement.length() >= MIN_VERTICAL_TRAVEL {
        displacement
    } else if let Some(down) = safe_normalize(controller.gravity) {
        down * ctx.settings.ground_probe_skin
    } else {
        return VerticalResolution {
            displacement,
            velocity,
            grounded: false,
            hit: None,
        };
    };

    let radius = ctx.shape.radius();
    let lateral = (radius - EPSILON).max(EPSILON);
    let center = to_xz(position);

    let mut hits = ctx.world.sweep_all(
        &ctx.shape,
        position,
        position + sweep,
        CollisionFilter::MOVEMENT_QUERY,
        ctx.entity,
    );
    trim_by_filter(&mut hits, ctx.filters, CollisionFilter::MOVEMENT_QUERY);
    hits.retain(|hit| {
        // Контакт сзади по ходу движения
        if sweep.y > 0.0 && hit.position.y < position.y {
            return false;
        }
        if sweep.y < 0.0 && hit.position.y > position.y {
            return false;
        }
        // Только контакты в пределах латерального радиуса
        to_xz(hit.position).distance_squared(center) < lateral * lateral
    });
    sort_by_fraction(&mut hits);

    let Some(nearest) = hits.first().copied() else {
        return VerticalResolution {
            displacement,
            velocity,
            grounded: false,
            hit: None,
        };
    };

    let travel = sweep.length() * nearest.fraction;
    let grounded = travel <= ctx.settings.contact_epsilon && velocity.y <= 0.0;
    let resolved = displacement * nearest.fraction;

    let carried = if grounded {
        Vec3::ZERO
    } else if nearest.position.y > position.y {
        // Потолок гасит скорость вверх
        velocity * nearest.fraction
    } else {
        velocity
    };

    VerticalResolution {
        displacement: resolved,
        velocity: carried,
        grounded,
        hit: Some(nearest),
    }
}

/// Шаг 6: выталкивание из геометрии
///
/// Маленькая сфера чуть выше основания агента; если она в пенетрации —
/// сдвигаем вдоль нормали поверхности на глубину.
pub fn correct_penetration(
    ctx: &ResolveContext,
    controller: &KinematicController,
    position: Vec3,
) -> Vec3 {
    let settings = ctx.settings;
    if !settings.penetration_correction {
        return Vec3::ZERO;
    }
    let Some(down) = safe_normalize(controller.gravity) else {
        return Vec3::ZERO;
    };

    let base = position + down * ctx.shape.half_height();
    let probe_center = base - down * settings.probe_offset;
    let probe = AgentShape::sphere(settings.probe_radius);

    let mut hits = ctx.world.distance_all(
        &probe,
        settings.probe_max_distance,
        &Transform::from_translation(probe_center),
        CollisionFilter::MOVEMENT_QUERY,
        ctx.entity,
    );
    trim_by_filter(&mut hits, ctx.filters, CollisionFilter::MOVEMENT_QUERY);

    match smallest_distance(&hits) {
        Some(hit) if hit.distance < 0.0 && hit.surface_normal.is_finite() => {
            hit.surface_normal * -hit.distance
        }
        _ => Vec3::ZERO,
    }
}

/// Направление "вверх" = против гравитации (Y при нулевой гравитации)
fn up_direction(gravity: Vec3) -> Vec3 {
    safe_normalize(-gravity).unwrap_or(Vec3::Y)
}
