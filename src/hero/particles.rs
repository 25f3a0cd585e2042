use super::HeroAnimator;
use super::components::{HeroEntity, ParticleSprite};
use super::settings::{HeroSettings, hex_color};
use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use rand::RngExt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleField {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub bounds: Vec3,
}

impl ParticleField {
    /// Uniform positions inside the box, uniform velocities in
    /// `[-max_speed, max_speed]` per axis.
    pub fn scatter<R: RngExt>(count: usize, bounds: Vec3, max_speed: f32, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        let speed = max_speed.max(f32::EPSILON);

        for _ in 0..count {
            positions.push(Vec3::new(
                rng.random_range(-bounds.x..=bounds.x),
                rng.random_range(-bounds.y..=bounds.y),
                rng.random_range(-bounds.z..=bounds.z),
            ));
            velocities.push(Vec3::new(
                rng.random_range(-speed..=speed),
                rng.random_range(-speed..=speed),
                rng.random_range(-speed..=speed),
            ));
        }

        Self {
            positions,
            velocities,
            bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn step(&mut self) {
        let bounds = self.bounds.to_array();
        for (position, velocity) in self.positions.iter_mut().zip(&self.velocities) {
            let mut axes = (*position + *velocity).to_array();
            for (value, bound) in axes.iter_mut().zip(bounds) {
                *value = wrap_axis(*value, bound);
            }
            *position = Vec3::from_array(axes);
        }
    }
}

/// Past `+bound` jumps to `-bound` and past `-bound` jumps to `+bound`.
pub fn wrap_axis(value: f32, bound: f32) -> f32 {
    if value > bound {
        -bound
    } else if value < -bound {
        bound
    } else {
        value
    }
}

pub fn sprite_scale(t: f32, x: f32) -> f32 {
    1.0 + 0.35 * (2.0 * t + 0.5 * x).sin()
}

pub(super) fn spawn_particle_sprites(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    settings: &HeroSettings,
    field: &ParticleField,
) {
    if field.is_empty() {
        return;
    }

    let mesh = meshes.add(Sphere::new(settings.particles.size).mesh().uv(8, 6));
    let material = materials.add(StandardMaterial {
        base_color: hex_color(settings.particles.color).with_alpha(0.8),
        emissive: hex_color(settings.particles.color).to_linear() * 2.0,
        unlit: true,
        alpha_mode: AlphaMode::Add,
        ..default()
    });

    for (index, position) in field.positions.iter().enumerate() {
        commands.spawn((
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(*position),
            NotShadowCaster,
            NotShadowReceiver,
            ParticleSprite(index),
            HeroEntity,
        ));
    }
}

pub(super) fn step_particles(
    time: Res<Time>,
    mut animator: ResMut<HeroAnimator>,
    mut sprites: Query<(&ParticleSprite, &mut Transform)>,
) {
    animator.particles.step();

    let t = time.elapsed_secs() - animator.mounted_at;
    for (sprite, mut transform) in &mut sprites {
        let Some(position) = animator.particles.positions.get(sprite.0) else {
            continue;
        };
        transform.translation = *position;
        transform.scale = Vec3::splat(sprite_scale(t, position.x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bounds() -> Vec3 {
        Vec3::new(20.0, 12.0, 10.0)
    }

    #[test]
    fn scatter_respects_count_and_box() {
        let mut rng = StdRng::seed_from_u64(7);
        let field = ParticleField::scatter(600, bounds(), 0.02, &mut rng);

        assert_eq!(field.len(), 600);
        assert_eq!(field.velocities.len(), 600);
        for (position, velocity) in field.positions.iter().zip(&field.velocities) {
            assert!(position.abs().cmple(bounds()).all());
            assert!(velocity.abs().max_element() <= 0.02);
        }
    }

    #[test]
    fn wrap_lands_exactly_on_opposite_bound() {
        assert_eq!(wrap_axis(20.01, 20.0), -20.0);
        assert_eq!(wrap_axis(-12.5, 12.0), 12.0);
        assert_eq!(wrap_axis(3.0, 10.0), 3.0);
        assert_eq!(wrap_axis(10.0, 10.0), 10.0);
    }

    #[test]
    fn axes_wrap_independently() {
        let mut field = ParticleField {
            positions: vec![Vec3::new(19.99, 0.0, -9.99)],
            velocities: vec![Vec3::new(0.02, 0.01, -0.02)],
            bounds: bounds(),
        };
        field.step();
        assert_eq!(field.positions[0], Vec3::new(-20.0, 0.01, 10.0));
    }

    #[test]
    fn sprite_scale_stays_positive() {
        for i in 0..100 {
            let scale = sprite_scale(i as f32 * 0.37, i as f32 - 50.0);
            assert!((0.64..=1.36).contains(&scale));
        }
    }

    proptest! {
        #[test]
        fn particles_never_leave_the_box(seed in any::<u64>(), steps in 1usize..3_000) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut field = ParticleField::scatter(32, bounds(), 0.5, &mut rng);
            for _ in 0..steps {
                field.step();
            }
            for position in &field.positions {
                prop_assert!(position.abs().cmple(bounds()).all());
            }
        }
    }
}
