use super::HeroAnimator;
use super::components::{HeroEntity, HeroModelRoot, ModelDrift, OverlayLayer, OverlaySource};
use super::errors::LoadError;
use super::overlay::{
    EDGE_THRESHOLD_DEGREES, OverlayMaterials, edge_line_mesh, feature_edges, mesh_triangles,
    overlay_transform, plan_overlays,
};
use super::responsive::ViewportBucket;
use bevy::asset::{LoadState, RecursiveDependencyLoadState};
use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};
use std::f32::consts::FRAC_PI_2;
use tracing::{debug, info, warn};

const MAX_NODE_DEPTH: usize = 64;

/// Identifies one mount. A load only lands if its ticket is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadTicket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    Loaded { meshes: usize, overlays: usize },
    Failed(LoadError),
}

impl LoadStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadStatus::Pending)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Resource, Debug)]
pub struct ModelLoad {
    pub ticket: LoadTicket,
    pub path: String,
    pub handle: Handle<Gltf>,
    pub status: LoadStatus,
}

impl ModelLoad {
    /// Stores the outcome of the single load attempt. Returns `false` when
    /// the attempt already finished or belongs to another mount.
    pub fn record(&mut self, current: LoadTicket, status: LoadStatus) -> bool {
        if self.ticket != current {
            debug!(
                "ignoring model result for stale mount {:?} (current {:?})",
                self.ticket, current
            );
            return false;
        }
        if !self.status.is_pending() {
            return false;
        }
        self.status = status;
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadProgress {
    Waiting,
    Ready,
    Failed(LoadError),
}

pub fn classify_load(
    path: &str,
    state: Option<LoadState>,
    dependencies: Option<RecursiveDependencyLoadState>,
) -> LoadProgress {
    let failed = |reason: String| {
        LoadProgress::Failed(LoadError::Failed {
            path: path.to_string(),
            reason,
        })
    };

    match (state, dependencies) {
        (Some(LoadState::Failed(err)), _) => failed(err.to_string()),
        (_, Some(RecursiveDependencyLoadState::Failed(err))) => failed(err.to_string()),
        (Some(LoadState::Loaded), Some(RecursiveDependencyLoadState::Loaded)) => LoadProgress::Ready,
        _ => LoadProgress::Waiting,
    }
}

pub fn request_model(asset_server: &AssetServer, ticket: LoadTicket, path: &str) -> ModelLoad {
    info!("requesting model '{path}'");
    ModelLoad {
        ticket,
        path: path.to_string(),
        handle: asset_server.load(path.to_string()),
        status: LoadStatus::Pending,
    }
}

/// Rotation that lays the model flat, facing the camera.
pub fn model_rotation() -> Quat {
    Quat::from_euler(EulerRot::XYZ, -FRAC_PI_2, 0.0, FRAC_PI_2)
}

pub fn model_root_transform(bucket: ViewportBucket) -> Transform {
    let placement = bucket.transform();
    Transform {
        translation: placement.position,
        rotation: model_rotation(),
        scale: Vec3::splat(placement.scale),
    }
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub mesh: Handle<Mesh>,
    pub material: Option<Handle<StandardMaterial>>,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub primitives: Vec<ModelPrimitive>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
            + self
                .children
                .iter()
                .map(ModelNode::primitive_count)
                .sum::<usize>()
    }
}

/// The node hierarchy of a loaded glTF, starting from every node that is
/// nobody's child.
pub fn collect_model_tree(
    gltf: &Gltf,
    nodes: &Assets<GltfNode>,
    gltf_meshes: &Assets<GltfMesh>,
) -> Vec<ModelNode> {
    let children: HashSet<AssetId<GltfNode>> = gltf
        .nodes
        .iter()
        .filter_map(|handle| nodes.get(handle))
        .flat_map(|node| node.children.iter().map(Handle::id))
        .collect();

    gltf.nodes
        .iter()
        .filter(|handle| !children.contains(&handle.id()))
        .filter_map(|handle| collect_node(handle, nodes, gltf_meshes, 0))
        .collect()
}

fn collect_node(
    handle: &Handle<GltfNode>,
    nodes: &Assets<GltfNode>,
    gltf_meshes: &Assets<GltfMesh>,
    depth: usize,
) -> Option<ModelNode> {
    if depth > MAX_NODE_DEPTH {
        warn!("glTF node hierarchy deeper than {MAX_NODE_DEPTH}, truncating");
        return None;
    }
    let node = nodes.get(handle)?;

    let primitives = node
        .mesh
        .as_ref()
        .and_then(|mesh| gltf_meshes.get(mesh))
        .map(|mesh| {
            mesh.primitives
                .iter()
                .map(|primitive| ModelPrimitive {
                    mesh: primitive.mesh.clone(),
                    material: primitive.material.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let children = node
        .children
        .iter()
        .filter_map(|child| collect_node(child, nodes, gltf_meshes, depth + 1))
        .collect();

    Some(ModelNode {
        name: node.name.clone(),
        transform: node.transform,
        primitives,
        children,
    })
}

fn transform_matrix(transform: &Transform) -> Mat4 {
    Mat4::from_scale_rotation_translation(transform.scale, transform.rotation, transform.translation)
}

/// Axis-aligned extents of every primitive after the root transform.
pub fn model_bounds(tree: &[ModelNode], root: &Transform, meshes: &Assets<Mesh>) -> Option<(Vec3, Vec3)> {
    fn visit(
        node: &ModelNode,
        parent: Mat4,
        meshes: &Assets<Mesh>,
        bounds: &mut Option<(Vec3, Vec3)>,
    ) {
        let world = parent * transform_matrix(&node.transform);
        for primitive in &node.primitives {
            let Some(mesh) = meshes.get(&primitive.mesh) else {
                continue;
            };
            let Some(VertexAttributeValues::Float32x3(positions)) =
                mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            else {
                continue;
            };
            for position in positions {
                let point = world.transform_point3(Vec3::from_array(*position));
                *bounds = Some(match *bounds {
                    Some((min, max)) => (min.min(point), max.max(point)),
                    None => (point, point),
                });
            }
        }
        for child in &node.children {
            visit(child, world, meshes, bounds);
        }
    }

    let mut bounds = None;
    let root = transform_matrix(root);
    for node in tree {
        visit(node, root, meshes, &mut bounds);
    }
    bounds
}

struct SourceSlot {
    entity: Entity,
    parent: Entity,
    mesh: Handle<Mesh>,
}

fn spawn_node(
    commands: &mut Commands,
    parent: Entity,
    node: &ModelNode,
    fallback_material: &mut impl FnMut() -> Handle<StandardMaterial>,
    sources: &mut Vec<SourceSlot>,
) {
    let entity = commands
        .spawn((
            Name::new(node.name.clone()),
            node.transform,
            Visibility::default(),
            ChildOf(parent),
        ))
        .id();

    for primitive in &node.primitives {
        let material = primitive
            .material
            .clone()
            .unwrap_or_else(&mut *fallback_material);
        let source = commands
            .spawn((
                Mesh3d(primitive.mesh.clone()),
                MeshMaterial3d(material),
                Transform::IDENTITY,
                OverlaySource,
                ChildOf(entity),
            ))
            .id();
        sources.push(SourceSlot {
            entity: source,
            parent: entity,
            mesh: primitive.mesh.clone(),
        });
    }

    for child in &node.children {
        spawn_node(commands, entity, child, fallback_material, sources);
    }
}

/// Shared line mesh of a source's feature edges, or `None` when it has none.
fn edge_mesh_for(
    source: &Handle<Mesh>,
    meshes: &mut Assets<Mesh>,
    cache: &mut HashMap<AssetId<Mesh>, Option<Handle<Mesh>>>,
) -> Option<Handle<Mesh>> {
    if let Some(cached) = cache.get(&source.id()) {
        return cached.clone();
    }

    let segments = meshes
        .get(source)
        .and_then(mesh_triangles)
        .map(|(positions, triangles)| feature_edges(&positions, &triangles, EDGE_THRESHOLD_DEGREES))
        .unwrap_or_default();
    let handle = if segments.is_empty() {
        debug!("mesh {:?} has no feature edges, skipping edge layers", source.id());
        None
    } else {
        Some(meshes.add(edge_line_mesh(&segments)))
    };
    cache.insert(source.id(), handle.clone());
    handle
}

/// Spawns the model hierarchy with its glow overlays. Returns the resulting
/// status; nothing is spawned for an empty scene.
pub(super) fn build_model(
    commands: &mut Commands,
    path: &str,
    tree: &[ModelNode],
    bucket: ViewportBucket,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    overlay_materials: &OverlayMaterials,
) -> LoadStatus {
    let primitive_count: usize = tree.iter().map(ModelNode::primitive_count).sum();
    if primitive_count == 0 {
        return LoadStatus::Failed(LoadError::EmptyScene {
            path: path.to_string(),
        });
    }

    let root_transform = model_root_transform(bucket);
    if let Some((min, max)) = model_bounds(tree, &root_transform, meshes) {
        info!("model horizontal (x) size: {:.3}", (max - min).x);
    }

    let root = commands
        .spawn((
            Name::new("hero_model"),
            root_transform,
            Visibility::default(),
            HeroModelRoot,
            ModelDrift::default(),
            HeroEntity,
        ))
        .id();

    let mut fallback: Option<Handle<StandardMaterial>> = None;
    let mut fallback_material = || {
        fallback
            .get_or_insert_with(|| materials.add(StandardMaterial::default()))
            .clone()
    };
    let mut sources = Vec::with_capacity(primitive_count);
    for node in tree {
        spawn_node(commands, root, node, &mut fallback_material, &mut sources);
    }

    let plan = plan_overlays(sources.len());
    let mut edge_cache = HashMap::new();
    let mut overlays = 0;
    for overlay in &plan {
        let Some(source) = sources.get(overlay.source) else {
            continue;
        };
        let mesh = if overlay.role.is_edge() {
            match edge_mesh_for(&source.mesh, meshes, &mut edge_cache) {
                Some(mesh) => mesh,
                None => continue,
            }
        } else {
            source.mesh.clone()
        };
        overlays += 1;
        commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(overlay_materials.handle(overlay.role)),
            overlay_transform(&Transform::IDENTITY, overlay.scale),
            OverlayLayer {
                role: overlay.role,
                source: source.entity,
                scale: overlay.scale,
            },
            NotShadowCaster,
            NotShadowReceiver,
            ChildOf(source.parent),
        ));
    }

    info!(
        "model '{path}' loaded: {} meshes, {} overlays",
        sources.len(),
        overlays
    );
    LoadStatus::Loaded {
        meshes: sources.len(),
        overlays,
    }
}

pub(super) fn poll_model_load(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    animator: Res<HeroAnimator>,
    mut load: ResMut<ModelLoad>,
    gltfs: Res<Assets<Gltf>>,
    nodes: Res<Assets<GltfNode>>,
    gltf_meshes: Res<Assets<GltfMesh>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    overlay_materials: Res<OverlayMaterials>,
) {
    if !load.status.is_pending() {
        return;
    }
    if load.ticket != animator.ticket {
        debug!("model load belongs to an earlier mount, skipping");
        return;
    }

    let id = load.handle.id();
    let state = asset_server.get_load_state(id);
    let dependencies = asset_server.get_recursive_dependency_load_state(id);
    let outcome = match classify_load(&load.path, state.clone(), dependencies.clone()) {
        LoadProgress::Waiting => {
            debug!(
                "model '{}' still loading (asset {:?}, dependencies {:?})",
                load.path, state, dependencies
            );
            return;
        }
        LoadProgress::Failed(err) => {
            warn!("{err}");
            LoadStatus::Failed(err)
        }
        LoadProgress::Ready => {
            let Some(gltf) = gltfs.get(&load.handle) else {
                return;
            };
            let tree = collect_model_tree(gltf, &nodes, &gltf_meshes);
            let status = build_model(
                &mut commands,
                &load.path,
                &tree,
                animator.bucket,
                &mut meshes,
                &mut materials,
                &overlay_materials,
            );
            if let Some(err) = status.error() {
                warn!("{err}");
            }
            status
        }
    };

    load.record(animator.ticket, outcome);
}
