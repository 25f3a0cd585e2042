use super::HeroAnimator;
use super::components::{AnimatedLight, HeroEntity};
use super::pulse::{Pulse, Wave};
use super::responsive::PointerState;
use super::settings::{HeroSettings, hex_color};
use bevy::prelude::*;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightRole {
    Rim,
    Bloom,
    Core,
    OrangeRim,
    Perimeter,
    Atmosphere,
    PointerFollow,
    Ambient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightSpec {
    pub name: &'static str,
    pub role: LightRole,
    pub color: u32,
    pub range: f32,
    pub base_position: Vec3,
    pub intensity: Pulse,
    /// Per-axis offsets added to `base_position`.
    pub sway: [Wave; 3],
    pub pointer_follow: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFrame {
    pub intensity: f32,
    pub position: Vec3,
}

impl LightSpec {
    pub fn evaluate(&self, t: f32, pointer: Vec2) -> LightFrame {
        let sway = Vec3::new(
            self.sway[0].sample(t),
            self.sway[1].sample(t),
            self.sway[2].sample(t),
        );
        let follow = (pointer * self.pointer_follow).extend(0.0);
        LightFrame {
            intensity: self.intensity.sample(t, pointer),
            position: self.base_position + sway + follow,
        }
    }

    pub fn max_intensity(&self) -> f32 {
        self.intensity.max
    }
}

fn pulse(base: f32, primary: Wave, pointer_weight: f32) -> Pulse {
    let mut pulse = Pulse {
        base,
        primary,
        secondary: Wave::ZERO,
        pointer_weight,
        max: f32::MAX,
    };
    pulse.max = pulse.peak();
    pulse
}

fn point(
    name: &'static str,
    role: LightRole,
    color: u32,
    range: f32,
    base_position: Vec3,
    intensity: Pulse,
    sway: [Wave; 3],
) -> LightSpec {
    LightSpec {
        name,
        role,
        color,
        range,
        base_position,
        intensity,
        sway,
        pointer_follow: Vec2::ZERO,
    }
}

/// Every animated point light of the rig, in spawn order.
pub fn light_table() -> Vec<LightSpec> {
    use LightRole::*;
    use Wave as W;
    let still = W::ZERO;

    vec![
        point(
            "rim_left",
            Rim,
            0x00ddff,
            25.0,
            Vec3::new(-6.0, 0.0, 12.0),
            pulse(2.5, W::sin(1.0, 3.0, 0.0), 0.3),
            [W::sin(2.0, 1.5, 0.0), W::cos(1.5, 2.0, 0.0), still],
        ),
        point(
            "rim_right",
            Rim,
            0x0099ff,
            20.0,
            Vec3::new(6.0, 0.0, 12.0),
            pulse(2.0, W::cos(0.8, 2.5, 0.0), 0.3),
            [W::cos(2.0, 1.2, 0.0), W::sin(1.5, 1.8, 0.0), still],
        ),
        point(
            "bloom_front",
            Bloom,
            0xff6600,
            20.0,
            Vec3::new(0.0, 0.0, 2.0),
            pulse(5.0, W::sin(2.0, 2.0, 0.0), 0.5),
            [still, W::cos(0.8, 1.5, 0.0), W::sin(0.5, 1.3, 0.0)],
        ),
        point(
            "bloom_center",
            Bloom,
            0xff4400,
            18.0,
            Vec3::ZERO,
            pulse(4.5, W::cos(1.8, 1.7, PI / 3.0), 0.5),
            [still, W::sin(0.8, 1.8, 0.0), W::cos(0.3, 1.6, 0.0)],
        ),
        point(
            "core_back",
            Core,
            0xff7700,
            15.0,
            Vec3::new(0.0, 0.0, -2.0),
            pulse(3.0, W::sin(1.2, 1.6, PI / 2.0), 0.0),
            [W::cos(1.5, 1.1, 0.0), W::sin(1.2, 1.4, 0.0), still],
        ),
        point(
            "core_inner",
            Core,
            0xff5500,
            12.0,
            Vec3::new(0.0, 0.0, 1.0),
            pulse(2.8, W::cos(1.0, 1.9, PI / 5.0), 0.0),
            [W::sin(1.2, 1.3, 0.0), W::cos(1.0, 1.7, 0.0), still],
        ),
        point(
            "orange_rim_upper",
            OrangeRim,
            0xff8833,
            25.0,
            Vec3::new(-3.0, 4.0, 3.0),
            pulse(3.5, W::sin(1.5, 2.8, PI / 4.0), 0.0),
            [W::cos(2.0, 1.9, 0.0), W::sin(1.5, 2.1, 0.0), W::cos(1.0, 1.4, 0.0)],
        ),
        point(
            "orange_rim_lower",
            OrangeRim,
            0xff6633,
            22.0,
            Vec3::new(3.0, -4.0, 3.0),
            pulse(3.2, W::cos(1.3, 2.4, PI / 6.0), 0.0),
            [W::sin(2.0, 1.7, 0.0), W::cos(1.5, 2.0, 0.0), W::sin(1.0, 1.8, 0.0)],
        ),
        point(
            "perimeter_right",
            Perimeter,
            0xff9944,
            18.0,
            Vec3::new(4.0, 0.0, 6.0),
            pulse(2.5, W::sin(1.0, 3.1, 0.0), 0.0),
            [still, W::cos(2.0, 2.2, 0.0), W::sin(1.0, 1.6, 0.0)],
        ),
        point(
            "perimeter_left",
            Perimeter,
            0xff7733,
            16.0,
            Vec3::new(-4.0, 0.0, 6.0),
            pulse(2.3, W::cos(0.9, 2.7, 0.0), 0.0),
            [still, W::sin(2.0, 1.9, 0.0), W::cos(1.0, 1.8, 0.0)],
        ),
        point(
            "top_glow",
            Atmosphere,
            0x44aaff,
            20.0,
            Vec3::new(0.0, 8.0, 8.0),
            pulse(1.3, W::sin(0.5, 3.2, 0.0), 0.0),
            [W::sin(3.0, 1.3, 0.0), still, still],
        ),
        point(
            "bottom_glow",
            Atmosphere,
            0x2288cc,
            18.0,
            Vec3::new(0.0, -5.0, 8.0),
            pulse(1.0, W::cos(0.4, 2.8, 0.0), 0.0),
            [W::cos(2.5, 1.7, 0.0), still, still],
        ),
        LightSpec {
            pointer_follow: Vec2::new(15.0, 10.0),
            ..point(
                "pointer_glow",
                PointerFollow,
                0x8b5cf6,
                20.0,
                Vec3::new(0.0, 0.0, 10.0),
                Pulse::constant(1.0),
                [still; 3],
            )
        },
    ]
}

/// The neutral, blue and orange ambient terms folded into one.
pub fn ambient_spec() -> LightSpec {
    let mut intensity = Pulse::constant(1.1);
    intensity.pointer_weight = 0.15;
    intensity.max = intensity.peak();

    point(
        "ambient",
        LightRole::Ambient,
        0x3c342c,
        0.0,
        Vec3::ZERO,
        intensity,
        [Wave::ZERO; 3],
    )
}

pub(super) fn spawn_light_rig(commands: &mut Commands, settings: &HeroSettings) {
    commands.spawn((
        DirectionalLight {
            color: Color::WHITE,
            illuminance: settings.lighting.directional_lux,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(5.0, 5.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        HeroEntity,
    ));

    for spec in light_table() {
        let frame = spec.evaluate(0.0, Vec2::ZERO);
        commands.spawn((
            PointLight {
                color: hex_color(spec.color),
                intensity: frame.intensity * settings.lighting.point_lumens_per_unit,
                range: spec.range,
                shadows_enabled: false,
                ..default()
            },
            Transform::from_translation(frame.position),
            AnimatedLight(spec),
            HeroEntity,
        ));
    }
}

pub(super) fn ambient_light(settings: &HeroSettings, spec: &LightSpec) -> GlobalAmbientLight {
    GlobalAmbientLight {
        color: hex_color(spec.color),
        brightness: spec.evaluate(0.0, Vec2::ZERO).intensity
            * settings.lighting.ambient_brightness_per_unit,
        affects_lightmapped_meshes: true,
    }
}

pub(super) fn animate_lights(
    time: Res<Time>,
    pointer: Res<PointerState>,
    settings: Res<HeroSettings>,
    animator: Res<HeroAnimator>,
    mut ambient: ResMut<GlobalAmbientLight>,
    mut lights: Query<(&AnimatedLight, &mut PointLight, &mut Transform)>,
) {
    let t = time.elapsed_secs() - animator.mounted_at;

    for (AnimatedLight(spec), mut light, mut transform) in &mut lights {
        let frame = spec.evaluate(t, pointer.normalized);
        light.intensity = frame.intensity * settings.lighting.point_lumens_per_unit;
        transform.translation = frame.position;
    }

    ambient.brightness = animator.ambient.evaluate(t, pointer.normalized).intensity
        * settings.lighting.ambient_brightness_per_unit;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn table_has_every_rig_light() {
        let table = light_table();
        assert_eq!(table.len(), 13);

        let mut names: Vec<_> = table.iter().map(|spec| spec.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 13);
    }

    #[test]
    fn rim_left_matches_its_formula() {
        let spec = &light_table()[0];
        let t = 0.7;
        let frame = spec.evaluate(t, Vec2::ZERO);

        assert_relative_eq!(frame.intensity, 2.5 + (3.0 * t).sin(), epsilon = 1e-5);
        assert_relative_eq!(frame.position.x, -6.0 + (1.5 * t).sin() * 2.0, epsilon = 1e-5);
        assert_relative_eq!(frame.position.y, (2.0 * t).cos() * 1.5, epsilon = 1e-5);
        assert_relative_eq!(frame.position.z, 12.0);
    }

    #[test]
    fn pointer_light_tracks_pointer_directly() {
        let table = light_table();
        let spec = table
            .iter()
            .find(|spec| spec.role == LightRole::PointerFollow)
            .unwrap();
        let frame = spec.evaluate(42.0, Vec2::new(0.5, -1.0));

        assert_eq!(frame.position, Vec3::new(7.5, -10.0, 10.0));
        assert_eq!(frame.intensity, 1.0);
    }

    #[test]
    fn ambient_brightens_with_pointer_offset() {
        let spec = ambient_spec();
        let centered = spec.evaluate(3.0, Vec2::ZERO).intensity;
        let corner = spec.evaluate(3.0, Vec2::ONE).intensity;
        assert_relative_eq!(centered, 1.1);
        assert_relative_eq!(corner, 1.4, epsilon = 1e-5);
    }

    proptest! {
        #[test]
        fn intensities_stay_within_declared_max(
            t in 0.0f32..100_000.0,
            px in -1.0f32..=1.0,
            py in -1.0f32..=1.0,
        ) {
            let pointer = Vec2::new(px, py);
            for spec in light_table().iter().chain(std::iter::once(&ambient_spec())) {
                let intensity = spec.evaluate(t, pointer).intensity;
                prop_assert!(intensity >= 0.0, "{} went negative", spec.name);
                prop_assert!(intensity <= spec.max_intensity(), "{} exceeded max", spec.name);
            }
        }
    }
}
