use super::HeroAnimator;
use super::components::HeroCamera;
use super::responsive::PointerState;
use super::settings::{CameraSettings, HeroSettings};
use bevy::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomPhase {
    #[default]
    NotStarted,
    ZoomingIn,
    Settled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub phase: ZoomPhase,
    pub distance: f32,
    pub start_distance: f32,
    pub target_distance: f32,
    pub decay: f32,
    pub epsilon: f32,
    pub pointer_follow: Vec2,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default())
    }
}

impl CameraRig {
    pub fn from_settings(settings: &CameraSettings) -> Self {
        Self {
            phase: ZoomPhase::NotStarted,
            distance: settings.start_distance,
            start_distance: settings.start_distance,
            target_distance: settings.target_distance,
            decay: settings.decay,
            epsilon: settings.epsilon,
            pointer_follow: Vec2::new(settings.pointer_follow.0, settings.pointer_follow.1),
        }
    }

    /// One frame of the dolly-in. The first frame places the camera far
    /// out and already applies one decay step.
    pub fn advance(&mut self) -> f32 {
        match self.phase {
            ZoomPhase::NotStarted => {
                self.distance = self.start_distance;
                self.phase = ZoomPhase::ZoomingIn;
                self.decay_step();
            }
            ZoomPhase::ZoomingIn => self.decay_step(),
            ZoomPhase::Settled => {}
        }
        self.distance
    }

    fn decay_step(&mut self) {
        if (self.distance - self.target_distance).abs() < self.epsilon {
            self.distance = self.target_distance;
            self.phase = ZoomPhase::Settled;
            debug!("camera settled at {}", self.distance);
            return;
        }
        self.distance += (self.target_distance - self.distance) * self.decay;
    }

    pub fn position(&self, pointer: Vec2) -> Vec3 {
        Vec3::new(
            pointer.x * self.pointer_follow.x,
            pointer.y * self.pointer_follow.y,
            self.distance,
        )
    }
}

pub(super) fn hero_camera_bundle(settings: &HeroSettings) -> impl Bundle {
    let rig = CameraRig::from_settings(&settings.camera);
    (
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: settings.camera.fov_degrees.to_radians(),
            near: settings.camera.near,
            far: settings.camera.far,
            ..default()
        }),
        Transform::from_translation(rig.position(Vec2::ZERO)).looking_at(Vec3::ZERO, Vec3::Y),
        HeroCamera,
    )
}

pub(super) fn animate_camera(
    pointer: Res<PointerState>,
    mut animator: ResMut<HeroAnimator>,
    mut camera_query: Query<&mut Transform, With<HeroCamera>>,
) {
    animator.camera.advance();

    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    transform.translation = animator.camera.position(pointer.normalized);
    transform.look_at(Vec3::ZERO, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn first_frame_lands_at_28_8() {
        let mut rig = CameraRig::default();
        assert_eq!(rig.phase, ZoomPhase::NotStarted);

        let distance = rig.advance();

        assert_relative_eq!(distance, 28.8, epsilon = 1e-5);
        assert_eq!(rig.phase, ZoomPhase::ZoomingIn);
    }

    #[test]
    fn settles_exactly_on_target() {
        let mut rig = CameraRig::default();
        let mut frames = 0;
        while rig.phase != ZoomPhase::Settled {
            rig.advance();
            frames += 1;
            assert!(frames < 200, "camera never settled");
        }

        assert_eq!(rig.distance, 15.0);
    }

    #[test]
    fn settled_is_terminal() {
        let mut rig = CameraRig::default();
        for _ in 0..500 {
            rig.advance();
        }
        assert_eq!(rig.phase, ZoomPhase::Settled);

        rig.distance = 15.0;
        rig.advance();
        assert_eq!(rig.phase, ZoomPhase::Settled);
        assert_eq!(rig.distance, 15.0);
    }

    #[test]
    fn pointer_moves_laterally_only() {
        let rig = CameraRig::default();
        let position = rig.position(Vec2::new(1.0, -0.5));
        assert_eq!(position, Vec3::new(3.0, -1.0, 30.0));
    }

    proptest! {
        #[test]
        fn zoom_is_monotonic(start in 15.0f32..200.0, decay in 0.01f32..0.5) {
            let mut rig = CameraRig {
                start_distance: start,
                distance: start,
                decay,
                ..CameraRig::default()
            };
            let mut previous = f32::INFINITY;
            for _ in 0..2_000 {
                let distance = rig.advance();
                prop_assert!(distance <= previous);
                prop_assert!(distance >= rig.target_distance);
                previous = distance;
            }
            prop_assert_eq!(rig.phase, ZoomPhase::Settled);
            prop_assert_eq!(rig.distance, rig.target_distance);
        }
    }
}
