use super::errors::ConfigError;
use bevy::prelude::{Color, Resource, Vec2, Vec3};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

pub const CONFIG_PATH_DEFAULT: &str = "config/hero_scene.ron";
pub const MODEL_PATH_DEFAULT: &str = "models/battery-otp.glb";
pub const MAX_PARTICLES: usize = 20_000;
pub const MAX_HALF_EXTENT: f32 = 1.0e4;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroSettings {
    pub model_path: String,
    pub clear_color: u32,
    pub bloom_enabled: bool,
    pub camera: CameraSettings,
    pub particles: ParticleSettings,
    pub lighting: LightingSettings,
    pub drift: DriftSettings,
}

impl Default for HeroSettings {
    fn default() -> Self {
        Self {
            model_path: MODEL_PATH_DEFAULT.to_string(),
            clear_color: 0x0a0a0a,
            bloom_enabled: true,
            camera: CameraSettings::default(),
            particles: ParticleSettings::default(),
            lighting: LightingSettings::default(),
            drift: DriftSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub start_distance: f32,
    pub target_distance: f32,
    pub decay: f32,
    pub epsilon: f32,
    pub pointer_follow: (f32, f32),
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            start_distance: 30.0,
            target_distance: 15.0,
            decay: 0.08,
            epsilon: 0.01,
            pointer_follow: (3.0, 2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub enabled: bool,
    pub count: usize,
    pub half_extents: (f32, f32, f32),
    pub max_speed: f32,
    pub size: f32,
    pub color: u32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 600,
            half_extents: (20.0, 12.0, 10.0),
            max_speed: 0.02,
            size: 0.05,
            color: 0x66ccff,
        }
    }
}

impl ParticleSettings {
    pub fn bounds(&self) -> Vec3 {
        Vec3::new(self.half_extents.0, self.half_extents.1, self.half_extents.2)
    }
}

/// Conversion factors from the authored light table units to Bevy units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub point_lumens_per_unit: f32,
    pub ambient_brightness_per_unit: f32,
    pub directional_lux: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            point_lumens_per_unit: 150_000.0,
            ambient_brightness_per_unit: 120.0,
            directional_lux: 6_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftSettings {
    pub pointer_follow: (f32, f32),
    pub easing: f32,
    pub float_amplitude: f32,
    pub float_frequency: f32,
}

impl Default for DriftSettings {
    fn default() -> Self {
        Self {
            pointer_follow: (2.0, 1.0),
            easing: 0.02,
            float_amplitude: 0.25,
            float_frequency: 2.0,
        }
    }
}

impl DriftSettings {
    pub fn follow(&self) -> Vec2 {
        Vec2::new(self.pointer_follow.0, self.pointer_follow.1)
    }
}

impl HeroSettings {
    pub fn clear_color(&self) -> Color {
        hex_color(self.clear_color)
    }

    /// Pulls out-of-range values back to something the animators can run with.
    /// Returns the name of every field that had to change.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let mut adjusted = Vec::new();
        let defaults = CameraSettings::default();

        if !(self.camera.decay > 0.0 && self.camera.decay <= 1.0) {
            self.camera.decay = defaults.decay;
            adjusted.push("camera.decay");
        }
        if !(self.camera.epsilon > 0.0 && self.camera.epsilon.is_finite()) {
            self.camera.epsilon = defaults.epsilon;
            adjusted.push("camera.epsilon");
        }
        if !(self.camera.target_distance > 0.0 && self.camera.target_distance.is_finite()) {
            self.camera.target_distance = defaults.target_distance;
            adjusted.push("camera.target_distance");
        }
        if !(self.camera.start_distance >= self.camera.target_distance
            && self.camera.start_distance.is_finite())
        {
            self.camera.start_distance = self.camera.target_distance;
            adjusted.push("camera.start_distance");
        }
        if !(self.camera.fov_degrees > 1.0 && self.camera.fov_degrees < 179.0) {
            self.camera.fov_degrees = defaults.fov_degrees;
            adjusted.push("camera.fov_degrees");
        }

        if self.particles.count > MAX_PARTICLES {
            self.particles.count = MAX_PARTICLES;
            adjusted.push("particles.count");
        }
        let (x, y, z) = self.particles.half_extents;
        if ![x, y, z].iter().all(|extent| valid_half_extent(*extent)) {
            self.particles.half_extents = ParticleSettings::default().half_extents;
            adjusted.push("particles.half_extents");
        }
        let (x, y, z) = self.particles.half_extents;
        if !(self.particles.max_speed >= 0.0 && self.particles.max_speed <= x.min(y).min(z)) {
            self.particles.max_speed = ParticleSettings::default().max_speed;
            adjusted.push("particles.max_speed");
        }

        if !(self.drift.easing >= 0.0 && self.drift.easing <= 1.0) {
            self.drift.easing = DriftSettings::default().easing;
            adjusted.push("drift.easing");
        }

        adjusted
    }
}

/// Finite, positive and no larger than [`MAX_HALF_EXTENT`].
pub fn valid_half_extent(extent: f32) -> bool {
    extent > 0.0 && extent <= MAX_HALF_EXTENT
}

pub fn hex_color(rgb: u32) -> Color {
    Color::srgb_u8(
        ((rgb >> 16) & 0xff) as u8,
        ((rgb >> 8) & 0xff) as u8,
        (rgb & 0xff) as u8,
    )
}

pub fn load_settings(path: &Path) -> Result<HeroSettings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::de::from_str::<HeroSettings>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings(path: &Path, settings: &HeroSettings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialized = ron::ser::to_string_pretty(settings, PrettyConfig::default())?;
    fs::write(path, serialized).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads settings from disk, writing the defaults when the file is missing
/// and falling back to them when it cannot be used.
pub fn load_or_init_settings(path: &Path) -> HeroSettings {
    let mut settings = if path.exists() {
        load_settings(path).unwrap_or_else(|err| {
            warn!("{err}; using built-in scene settings");
            HeroSettings::default()
        })
    } else {
        let defaults = HeroSettings::default();
        if let Err(err) = save_settings(path, &defaults) {
            warn!("could not write default settings: {err}");
        }
        defaults
    };

    for field in settings.sanitize() {
        warn!("setting {field} was out of range and has been reset");
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let text = "(model_path: \"models/other.glb\", camera: (target_distance: 12.0))";
        let settings: HeroSettings = ron::de::from_str(text).unwrap();

        assert_eq!(settings.model_path, "models/other.glb");
        assert_eq!(settings.camera.target_distance, 12.0);
        assert_eq!(settings.camera.start_distance, 30.0);
        assert_eq!(settings.particles, ParticleSettings::default());
    }

    #[test]
    fn pretty_written_config_reads_back() {
        let settings = HeroSettings::default();
        let text = ron::ser::to_string_pretty(&settings, PrettyConfig::default()).unwrap();
        let parsed: HeroSettings = ron::de::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let shipped: HeroSettings =
            ron::de::from_str(include_str!("../../config/hero_scene.ron")).unwrap();
        assert_eq!(shipped, HeroSettings::default());
    }

    #[test]
    fn sanitize_leaves_defaults_alone() {
        let mut settings = HeroSettings::default();
        assert!(settings.sanitize().is_empty());
        assert_eq!(settings, HeroSettings::default());
    }

    #[test]
    fn sanitize_repairs_camera_and_particles() {
        let mut settings = HeroSettings::default();
        settings.camera.decay = 1.5;
        settings.camera.start_distance = 5.0;
        settings.particles.count = MAX_PARTICLES * 2;
        settings.particles.half_extents = (0.0, 1.0, 1.0);

        let adjusted = settings.sanitize();

        assert_eq!(
            adjusted,
            vec![
                "camera.decay",
                "camera.start_distance",
                "particles.count",
                "particles.half_extents"
            ]
        );
        assert_eq!(settings.camera.decay, 0.08);
        assert_eq!(settings.camera.start_distance, settings.camera.target_distance);
        assert_eq!(settings.particles.count, MAX_PARTICLES);
    }

    #[test]
    fn nan_decay_is_rejected() {
        let mut settings = HeroSettings::default();
        settings.camera.decay = f32::NAN;
        assert_eq!(settings.sanitize(), vec!["camera.decay"]);
    }

    #[rstest]
    #[case((f32::INFINITY, 12.0, 10.0))]
    #[case((20.0, f32::NAN, 10.0))]
    #[case((3.0e38, 12.0, 10.0))]
    #[case((20.0, 12.0, -1.0))]
    fn unusable_particle_box_is_reset(#[case] half_extents: (f32, f32, f32)) {
        let mut settings = HeroSettings::default();
        settings.particles.half_extents = half_extents;

        assert_eq!(settings.sanitize(), vec!["particles.half_extents"]);
        assert_eq!(settings.particles.half_extents, ParticleSettings::default().half_extents);
    }

    #[rstest]
    #[case(f32::INFINITY)]
    #[case(f32::NAN)]
    #[case(50.0)]
    #[case(-0.5)]
    fn unusable_particle_speed_is_reset(#[case] max_speed: f32) {
        let mut settings = HeroSettings::default();
        settings.particles.max_speed = max_speed;

        assert_eq!(settings.sanitize(), vec!["particles.max_speed"]);
        assert_eq!(settings.particles.max_speed, ParticleSettings::default().max_speed);
    }

    #[test]
    fn infinite_camera_distances_are_reset() {
        let mut settings = HeroSettings::default();
        settings.camera.start_distance = f32::INFINITY;
        settings.camera.epsilon = f32::INFINITY;

        assert_eq!(
            settings.sanitize(),
            vec!["camera.epsilon", "camera.start_distance"]
        );
        assert_eq!(settings.camera.start_distance, settings.camera.target_distance);
    }

    #[test]
    fn sanitized_settings_scatter_without_panicking() {
        use crate::hero::particles::ParticleField;
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let mut settings = HeroSettings::default();
        settings.particles.half_extents = (3.0e38, 12.0, 10.0);
        settings.particles.max_speed = f32::INFINITY;
        settings.sanitize();

        let field = ParticleField::scatter(
            64,
            settings.particles.bounds(),
            settings.particles.max_speed,
            &mut StdRng::seed_from_u64(9),
        );
        assert_eq!(field.len(), 64);
    }

    #[test]
    fn broken_file_is_a_parse_error() {
        let dir = std::env::temp_dir().join(format!("hero_scene_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.ron");
        fs::write(&path, "(model_path: ").unwrap();

        let err = load_settings(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let _ = fs::remove_dir_all(&dir);
    }
}
