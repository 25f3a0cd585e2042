use bevy::app::AppExit;
use bevy::post_process::bloom::Bloom;
use bevy::prelude::*;
use bevy::window::{PresentMode, PrimaryWindow, WindowResolution};
use tracing::{debug, info, warn};

pub mod camera;
pub mod cli;
pub mod components;
pub mod drift;
pub mod errors;
pub mod lighting;
pub mod loader;
pub mod overlay;
pub mod particles;
pub mod pulse;
pub mod responsive;
pub mod settings;
pub mod status;

use camera::{CameraRig, animate_camera, hero_camera_bundle};
use cli::parse_cli_options;
use components::HeroEntity;
use drift::drift_model;
use lighting::{LightSpec, ambient_light, ambient_spec, animate_lights, spawn_light_rig};
use loader::{LoadTicket, ModelLoad, poll_model_load, request_model};
use overlay::{OverlayMaterials, animate_overlays, sync_overlay_transforms};
use particles::{ParticleField, spawn_particle_sprites, step_particles};
use responsive::{PointerState, ViewportBucket, handle_resize, track_pointer};
use settings::{HeroSettings, load_or_init_settings};
use status::{spawn_status_overlay, update_status_overlay};

/// All per-frame animation state of one mounted scene.
#[derive(Resource, Debug, Clone)]
pub struct HeroAnimator {
    pub ticket: LoadTicket,
    /// Elapsed app time at mount; animations run on time since mount.
    pub mounted_at: f32,
    pub bucket: ViewportBucket,
    pub camera: CameraRig,
    pub particles: ParticleField,
    pub ambient: LightSpec,
}

impl HeroAnimator {
    pub fn new(
        settings: &HeroSettings,
        ticket: LoadTicket,
        mounted_at: f32,
        bucket: ViewportBucket,
        particles: ParticleField,
    ) -> Self {
        Self {
            ticket,
            mounted_at,
            bucket,
            camera: CameraRig::from_settings(&settings.camera),
            particles,
            ambient: ambient_spec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRequest {
    Mount,
    Unmount,
}

#[derive(Resource, Debug, Default)]
pub struct HeroFlowState {
    pub mounted: bool,
    pub pending: Option<FlowRequest>,
    mounts: u64,
}

impl HeroFlowState {
    pub fn starting(mount: bool) -> Self {
        Self {
            mounted: false,
            pending: mount.then_some(FlowRequest::Mount),
            mounts: 0,
        }
    }

    fn next_ticket(&mut self) -> LoadTicket {
        self.mounts += 1;
        LoadTicket(self.mounts)
    }
}

pub struct HeroScenePlugin;

impl Plugin for HeroScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HeroFlowState>()
            .init_resource::<HeroSettings>()
            .add_systems(
                Update,
                (handle_scene_keys, apply_unmount_request, apply_mount_request).chain(),
            )
            .add_systems(
                Update,
                (poll_model_load, update_status_overlay)
                    .chain()
                    .run_if(resource_exists::<ModelLoad>)
                    .run_if(resource_exists::<HeroAnimator>)
                    .after(apply_mount_request),
            )
            .add_systems(
                Update,
                (
                    track_pointer,
                    handle_resize,
                    animate_camera,
                    animate_lights,
                    step_particles,
                    drift_model,
                    animate_overlays,
                    sync_overlay_transforms,
                )
                    .chain()
                    .run_if(resource_exists::<HeroAnimator>)
                    .after(poll_model_load),
            );
    }
}

pub fn run() {
    let cli = parse_cli_options();

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "hero-scene".into(),
            resolution: WindowResolution::new(1920, 1080),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }));

    let mut settings = load_or_init_settings(&cli.config_path);
    cli.apply(&mut settings);
    for field in settings.sanitize() {
        warn!("command-line value for {field} was out of range and has been reset");
    }

    app.insert_resource(ClearColor(settings.clear_color()))
        .insert_resource(HeroFlowState::starting(!cli.start_unmounted))
        .insert_resource(settings)
        .add_plugins(HeroScenePlugin)
        .run();
}

pub(super) fn handle_scene_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut flow: ResMut<HeroFlowState>,
    mut app_exit: MessageWriter<AppExit>,
) {
    if keys.just_pressed(KeyCode::KeyM) {
        flow.pending = Some(if flow.mounted {
            FlowRequest::Unmount
        } else {
            FlowRequest::Mount
        });
    }
    if keys.just_pressed(KeyCode::Escape) {
        app_exit.write(AppExit::Success);
    }
}

pub(super) fn apply_unmount_request(
    mut commands: Commands,
    mut flow: ResMut<HeroFlowState>,
    entities: Query<Entity, With<HeroEntity>>,
) {
    if flow.pending != Some(FlowRequest::Unmount) {
        return;
    }
    flow.pending = None;
    if !flow.mounted {
        debug!("unmount requested while nothing is mounted");
        return;
    }

    for entity in &entities {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<HeroAnimator>();
    commands.remove_resource::<PointerState>();
    commands.remove_resource::<ModelLoad>();
    commands.remove_resource::<OverlayMaterials>();
    commands.insert_resource(GlobalAmbientLight::default());

    flow.mounted = false;
    info!("hero scene unmounted");
}

pub(super) fn apply_mount_request(
    mut commands: Commands,
    mut flow: ResMut<HeroFlowState>,
    settings: Res<HeroSettings>,
    asset_server: Res<AssetServer>,
    time: Res<Time>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if flow.pending != Some(FlowRequest::Mount) {
        return;
    }
    flow.pending = None;
    if flow.mounted {
        debug!("mount requested while already mounted");
        return;
    }

    let ticket = flow.next_ticket();
    let bucket = windows
        .single()
        .ok()
        .map(Window::width)
        .filter(|width| *width > 0.0)
        .map(ViewportBucket::from_width)
        .unwrap_or_default();

    let particles = if settings.particles.enabled {
        ParticleField::scatter(
            settings.particles.count,
            settings.particles.bounds(),
            settings.particles.max_speed,
            &mut rand::rng(),
        )
    } else {
        ParticleField::default()
    };

    let mut camera = commands.spawn((hero_camera_bundle(&settings), HeroEntity));
    if settings.bloom_enabled {
        camera.insert(Bloom::NATURAL);
    }

    spawn_light_rig(&mut commands, &settings);
    spawn_particle_sprites(&mut commands, &mut meshes, &mut materials, &settings, &particles);
    spawn_status_overlay(&mut commands);

    let animator = HeroAnimator::new(&settings, ticket, time.elapsed_secs(), bucket, particles);
    commands.insert_resource(ambient_light(&settings, &animator.ambient));
    commands.insert_resource(OverlayMaterials::new(&mut materials));
    commands.insert_resource(request_model(&asset_server, ticket, &settings.model_path));
    commands.insert_resource(PointerState::default());
    commands.insert_resource(animator);

    flow.mounted = true;
    info!(
        "hero scene mounted ({:?} bucket, {} particles)",
        bucket, settings.particles.count
    );
}
