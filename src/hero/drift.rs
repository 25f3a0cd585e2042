use super::HeroAnimator;
use super::components::{HeroModelRoot, ModelDrift};
use super::responsive::PointerState;
use super::settings::{DriftSettings, HeroSettings};
use bevy::prelude::*;

/// Moves `offset` a fixed fraction of the way toward the pointer target.
pub fn ease_offset(offset: Vec2, pointer: Vec2, follow: Vec2, easing: f32) -> Vec2 {
    offset + (pointer * follow - offset) * easing
}

pub fn float_offset(settings: &DriftSettings, t: f32) -> f32 {
    settings.float_amplitude * (settings.float_frequency * t).sin()
}

pub(super) fn drift_model(
    time: Res<Time>,
    pointer: Res<PointerState>,
    settings: Res<HeroSettings>,
    animator: Res<HeroAnimator>,
    mut roots: Query<(&mut Transform, &mut ModelDrift), With<HeroModelRoot>>,
) {
    let t = time.elapsed_secs() - animator.mounted_at;
    let anchor = animator.bucket.transform().position;
    let drift = &settings.drift;

    for (mut transform, mut model) in &mut roots {
        model.offset = ease_offset(model.offset, pointer.normalized, drift.follow(), drift.easing);
        transform.translation =
            anchor + model.offset.extend(0.0) + Vec3::Y * float_offset(drift, t);
    }
}
