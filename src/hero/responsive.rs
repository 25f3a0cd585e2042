use super::HeroAnimator;
use super::components::HeroModelRoot;
use bevy::prelude::*;
use bevy::window::{CursorMoved, PrimaryWindow, WindowResized};
use tracing::{debug, info};

pub const NARROW_BREAKPOINT: f32 = 768.0;
pub const MEDIUM_BREAKPOINT: f32 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewportBucket {
    Narrow,
    Medium,
    #[default]
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsiveTransform {
    pub scale: f32,
    pub position: Vec3,
}

impl ViewportBucket {
    pub fn from_width(width: f32) -> Self {
        if width < NARROW_BREAKPOINT {
            Self::Narrow
        } else if width < MEDIUM_BREAKPOINT {
            Self::Medium
        } else {
            Self::Wide
        }
    }

    pub fn transform(self) -> ResponsiveTransform {
        match self {
            Self::Narrow => ResponsiveTransform {
                scale: 10.0,
                position: Vec3::new(-3.0, -1.0, 0.0),
            },
            Self::Medium => ResponsiveTransform {
                scale: 18.0,
                position: Vec3::new(-3.0, 2.0, 0.0),
            },
            Self::Wide => ResponsiveTransform {
                scale: 28.0,
                position: Vec3::new(-8.0, 7.0, 0.0),
            },
        }
    }
}

impl ResponsiveTransform {
    pub fn transform_component(self) -> Transform {
        Transform::from_translation(self.position).with_scale(Vec3::splat(self.scale))
    }
}

/// Latest pointer position, each axis in [-1, 1] with +y up.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub normalized: Vec2,
}

/// Maps a window-space cursor position to [-1, 1] on both axes. Returns
/// `None` for a zero-sized viewport.
pub fn normalize_pointer(position: Vec2, size: Vec2) -> Option<Vec2> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    let x = position.x / size.x * 2.0 - 1.0;
    let y = -(position.y / size.y) * 2.0 + 1.0;
    Some(Vec2::new(x, y).clamp(Vec2::splat(-1.0), Vec2::splat(1.0)))
}

pub(super) fn track_pointer(
    mut cursor_moved: MessageReader<CursorMoved>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut pointer: ResMut<PointerState>,
) {
    let Some(moved) = cursor_moved.read().last() else {
        return;
    };
    let Ok(window) = windows.get(moved.window) else {
        return;
    };

    match normalize_pointer(moved.position, window.size()) {
        Some(normalized) => pointer.normalized = normalized,
        None => debug!("ignoring pointer move on zero-sized viewport"),
    }
}

pub(super) fn handle_resize(
    mut resized: MessageReader<WindowResized>,
    mut animator: ResMut<HeroAnimator>,
    mut roots: Query<&mut Transform, With<HeroModelRoot>>,
) {
    let Some(event) = resized.read().last() else {
        return;
    };
    if event.width <= 0.0 || event.height <= 0.0 {
        debug!("ignoring zero-sized viewport");
        return;
    }

    let bucket = ViewportBucket::from_width(event.width);
    if bucket != animator.bucket {
        info!(
            "viewport {}x{} moved model into {:?} bucket",
            event.width, event.height, bucket
        );
        animator.bucket = bucket;
    }

    let placement = bucket.transform().transform_component();
    for mut transform in &mut roots {
        transform.scale = placement.scale;
        transform.translation = placement.translation;
    }
}
