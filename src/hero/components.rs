use super::lighting::LightSpec;
use super::overlay::OverlayRole;
use bevy::prelude::*;

/// Everything spawned for a mount. Unmount despawns all of it.
#[derive(Component)]
pub struct HeroEntity;

#[derive(Component)]
pub struct HeroCamera;

#[derive(Component, Debug, Clone)]
pub struct AnimatedLight(pub LightSpec);

#[derive(Component)]
pub struct HeroModelRoot;

/// Eased pointer offset applied on top of the bucket anchor.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ModelDrift {
    pub offset: Vec2,
}

/// A mesh from the loaded model that has overlays attached.
#[derive(Component)]
pub struct OverlaySource;

#[derive(Component, Debug, Clone, Copy)]
pub struct OverlayLayer {
    pub role: OverlayRole,
    pub source: Entity,
    pub scale: f32,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct ParticleSprite(pub usize);

#[derive(Component)]
pub struct LoadStatusOverlay;

#[derive(Component)]
pub struct LoadStatusText;
