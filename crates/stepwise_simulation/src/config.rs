//! Конфигурация kinematic контроллера и resolver'а
//!
//! - `CharacterConfig`: параметры агента, задаются при spawn (serde, data-driven)
//! - `ResolverSettings`: tolerances resolver'а (Resource, общий на все агенты)
//!
//! Загрузка из файлов — забота внешнего authoring слоя; здесь только
//! типы с дефолтами и валидация.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::AgentShape;
use crate::components::movement::KinematicController;
use crate::math::EPSILON;

/// Ошибка валидации конфигурации
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{field}` must be finite")]
    NonFinite { field: &'static str },

    #[error("`{field}` must be >= 0 (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("`{field}` must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("capsule height {height} is shorter than its diameter (radius {radius})")]
    CapsuleTooShort { height: f32, radius: f32 },
}

fn finite(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(value)
}

fn positive(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    let value = finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(value)
}

/// Параметры агента (fixed at spawn)
///
/// Vec3 поля хранятся массивами — serde не зависит от glam features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Гравитация (m/s²)
    pub gravity: [f32; 3],
    /// Скорость движения (m/s)
    pub speed: f32,
    /// Начальная вертикальная скорость прыжка (m/s)
    pub jump_strength: f32,
    /// Максимальная высота ступеньки (m)
    pub max_step: f32,
    /// Затухание вертикальной скорости в воздухе (1/s)
    pub drag: f32,
    /// Поворачивать агента по направлению движения
    pub face_movement: bool,
    /// Радиус капсулы (m)
    pub radius: f32,
    /// Полная высота капсулы, включая полусферы (m)
    pub height: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0], // Earth gravity
            speed: 5.0,                 // 5 m/s (бег трусцой)
            jump_strength: 5.0,
            max_step: 0.3,
            drag: 0.0,
            face_movement: true,
            radius: 0.4,
            height: 1.8, // humanoid
        }
    }
}

impl CharacterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, component) in self.gravity.iter().enumerate() {
            let field = ["gravity.x", "gravity.y", "gravity.z"][i];
            finite(field, *component)?;
        }
        non_negative("speed", self.speed)?;
        non_negative("jump_strength", self.jump_strength)?;
        non_negative("max_step", self.max_step)?;
        non_negative("drag", self.drag)?;
        let radius = positive("radius", self.radius)?;
        let height = positive("height", self.height)?;
        if height + EPSILON < radius * 2.0 {
            return Err(ConfigError::CapsuleTooShort { height, radius });
        }
        Ok(())
    }

    /// ECS компонент контроллера
    pub fn controller(&self) -> KinematicController {
        KinematicController {
            gravity: Vec3::from_array(self.gravity),
            speed: self.speed,
            jump_strength: self.jump_strength,
            max_step: self.max_step,
            drag: self.drag,
            face_movement: self.face_movement,
        }
    }

    pub fn shape(&self) -> AgentShape {
        AgentShape::capsule(self.radius, self.height)
    }
}

/// Tolerances resolver'а
///
/// Общие для всех агентов, меняются только внешним тюнингом.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Сужение side-wall band сверху и снизу (m): контакты у пола/потолка
    /// капсулы не блокируют горизонтальное движение
    pub side_wall_tolerance: f32,
    /// Путь до контакта, при котором считаем "касание" (m)
    pub contact_epsilon: f32,
    /// Длина probe вдоль гравитации, когда вертикальное смещение нулевое (m)
    pub ground_probe_skin: f32,
    /// Выталкивание из геометрии после commit
    pub penetration_correction: bool,
    /// Радиус probe сферы penetration correction (m)
    pub probe_radius: f32,
    /// Смещение probe от основания агента против гравитации (m)
    pub probe_offset: f32,
    /// Дальность distance query probe (m)
    pub probe_max_distance: f32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            side_wall_tolerance: 0.01,
            contact_epsilon: EPSILON,
            ground_probe_skin: 0.02,
            penetration_correction: true,
            probe_radius: 0.1,
            probe_offset: 0.1,
            probe_max_distance: 0.1,
        }
    }
}

impl ResolverSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("side_wall_tolerance", self.side_wall_tolerance)?;
        non_negative("contact_epsilon", self.contact_epsilon)?;
        positive("ground_probe_skin", self.ground_probe_skin)?;
        positive("probe_radius", self.probe_radius)?;
        non_negative("probe_offset", self.probe_offset)?;
        non_negative("probe_max_distance", self.probe_max_distance)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_are_valid() {
        assert_eq!(CharacterConfig::default().validate(), Ok(()));
        assert_eq!(ResolverSettings::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_negative_and_non_finite() {
        let config = CharacterConfig {
            speed: -1.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Negative { field: "speed", value: -1.0 })
        );

        let config = CharacterConfig {
            gravity: [0.0, f32::NAN, 0.0],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonFinite { field: "gravity.y" })
        );

        let settings = ResolverSettings {
            probe_radius: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::NonPositive { field: "probe_radius", .. })
        ));
    }

    #[test]
    fn test_rejects_short_capsule() {
        let config = CharacterConfig {
            radius: 0.5,
            height: 0.6,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::CapsuleTooShort { .. })));
    }

    #[test]
    fn test_controller_and_shape_from_config() {
        let config = CharacterConfig::default();
        let controller = config.controller();
        assert_eq!(controller.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(controller.max_step, 0.3);

        let shape = config.shape();
        assert_eq!(shape.radius(), 0.4);
        assert!((shape.half_height() - 0.9).abs() < 1e-6);
    }
}
