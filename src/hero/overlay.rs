use super::HeroAnimator;
use super::components::{OverlayLayer, OverlaySource};
use super::pulse::{Pulse, Wave};
use super::responsive::PointerState;
use super::settings::hex_color;
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use bevy::render::render_resource::Face;
use std::collections::HashMap;
use std::f32::consts::PI;

pub const EDGE_THRESHOLD_DEGREES: f32 = 1.0;
const MERGE_PRECISION: f32 = 1e4;

/// Which glow layer an overlay entity belongs to. Each role owns one shared
/// material and animates with its own pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayRole {
    DeepestCore,
    DeepCore,
    CoreBloom,
    InnerBloom,
    MidBloom,
    InnerMidBloom,
    OuterMidBloom,
    FinalBloom,
    EdgeInner,
    EdgeOuter,
    EdgeGlow,
}

impl OverlayRole {
    /// Spawn order for every source mesh.
    pub const ALL: [OverlayRole; 11] = [
        OverlayRole::DeepestCore,
        OverlayRole::DeepCore,
        OverlayRole::CoreBloom,
        OverlayRole::InnerBloom,
        OverlayRole::MidBloom,
        OverlayRole::InnerMidBloom,
        OverlayRole::OuterMidBloom,
        OverlayRole::FinalBloom,
        OverlayRole::EdgeInner,
        OverlayRole::EdgeOuter,
        OverlayRole::EdgeGlow,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_edge(self) -> bool {
        matches!(
            self,
            OverlayRole::EdgeInner | OverlayRole::EdgeOuter | OverlayRole::EdgeGlow
        )
    }

    pub fn scale(self) -> f32 {
        match self {
            OverlayRole::DeepestCore => 0.65,
            OverlayRole::DeepCore => 0.70,
            OverlayRole::CoreBloom => 0.75,
            OverlayRole::InnerBloom => 0.78,
            OverlayRole::MidBloom => 0.82,
            OverlayRole::InnerMidBloom => 0.85,
            OverlayRole::OuterMidBloom => 0.88,
            OverlayRole::FinalBloom => 0.91,
            OverlayRole::EdgeInner => 1.004,
            OverlayRole::EdgeOuter => 1.008,
            OverlayRole::EdgeGlow => 1.012,
        }
    }

    pub fn color(self) -> u32 {
        match self {
            OverlayRole::DeepestCore => 0xff7700,
            OverlayRole::DeepCore => 0xff6600,
            OverlayRole::CoreBloom => 0xff4400,
            OverlayRole::InnerBloom => 0xcc3300,
            OverlayRole::MidBloom => 0xff5500,
            OverlayRole::InnerMidBloom => 0xff8800,
            OverlayRole::OuterMidBloom => 0xff6633,
            OverlayRole::FinalBloom => 0xff9955,
            OverlayRole::EdgeInner => 0x00ddff,
            OverlayRole::EdgeOuter => 0x0099ff,
            OverlayRole::EdgeGlow => 0x66ddff,
        }
    }

    pub fn initial_opacity(self) -> f32 {
        match self {
            OverlayRole::DeepestCore => 0.95,
            OverlayRole::DeepCore => 0.9,
            OverlayRole::CoreBloom => 0.8,
            OverlayRole::InnerBloom => 0.7,
            OverlayRole::MidBloom => 0.6,
            OverlayRole::InnerMidBloom => 0.5,
            OverlayRole::OuterMidBloom => 0.4,
            OverlayRole::FinalBloom => 0.3,
            OverlayRole::EdgeInner => 1.0,
            OverlayRole::EdgeOuter => 0.7,
            OverlayRole::EdgeGlow => 0.5,
        }
    }

    pub fn pulse(self) -> Pulse {
        // Inset layers read the pointer at 0.6, edges at 0.5.
        let inset = |base: f32, primary: Wave, secondary: Wave, weight: f32, max: f32| Pulse {
            base,
            primary,
            secondary,
            pointer_weight: weight * 0.6,
            max,
        };
        let edge = |base: f32, primary: Wave, weight: f32, max: f32| Pulse {
            base,
            primary,
            secondary: Wave::ZERO,
            pointer_weight: weight * 0.5,
            max,
        };

        match self {
            OverlayRole::DeepestCore => inset(
                0.8,
                Wave::sin(0.2, 1.5, 0.0),
                Wave::cos(0.1, 0.8, 0.0),
                0.9,
                1.0,
            ),
            OverlayRole::DeepCore => inset(
                0.7,
                Wave::sin(0.3, 2.2, PI / 8.0),
                Wave::cos(0.1, 1.1, 0.0),
                0.8,
                1.0,
            ),
            OverlayRole::CoreBloom => inset(
                0.6,
                Wave::sin(0.3, 2.8, PI / 6.0),
                Wave::cos(0.1, 1.4, 0.0),
                0.7,
                0.95,
            ),
            OverlayRole::InnerBloom => inset(
                0.5,
                Wave::sin(0.3, 3.5, PI / 4.0),
                Wave::cos(0.1, 1.7, 0.0),
                0.6,
                0.9,
            ),
            OverlayRole::MidBloom => inset(
                0.4,
                Wave::sin(0.25, 2.1, PI / 3.0),
                Wave::cos(0.15, 2.8, 0.0),
                0.5,
                0.8,
            ),
            OverlayRole::InnerMidBloom => inset(
                0.35,
                Wave::sin(0.25, 4.2, PI / 2.0),
                Wave::cos(0.1, 2.1, 0.0),
                0.5,
                0.7,
            ),
            OverlayRole::OuterMidBloom => inset(
                0.3,
                Wave::sin(0.2, 3.8, PI * 2.0 / 3.0),
                Wave::cos(0.15, 1.9, 0.0),
                0.4,
                0.6,
            ),
            OverlayRole::FinalBloom => inset(
                0.25,
                Wave::sin(0.2, 1.8, PI * 3.0 / 4.0),
                Wave::cos(0.1, 3.2, 0.0),
                0.4,
                0.5,
            ),
            OverlayRole::EdgeInner => edge(0.8, Wave::sin(0.2, 4.0, 0.0), 1.0, 1.0),
            OverlayRole::EdgeOuter => edge(0.5, Wave::sin(0.3, 3.2, 0.0), 0.7, 0.9),
            OverlayRole::EdgeGlow => edge(0.3, Wave::sin(0.25, 2.8, 0.0), 0.5, 0.7),
        }
    }

    fn material(self) -> StandardMaterial {
        let color = hex_color(self.color()).with_alpha(self.initial_opacity());
        StandardMaterial {
            base_color: color,
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            cull_mode: if self.is_edge() { None } else { Some(Face::Front) },
            ..default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedOverlay {
    pub source: usize,
    pub role: OverlayRole,
    pub scale: f32,
}

/// Overlays for `mesh_count` source meshes, grouped per source in
/// [`OverlayRole::ALL`] order.
pub fn plan_overlays(mesh_count: usize) -> Vec<PlannedOverlay> {
    (0..mesh_count)
        .flat_map(|source| {
            OverlayRole::ALL.into_iter().map(move |role| PlannedOverlay {
                source,
                role,
                scale: role.scale(),
            })
        })
        .collect()
}

/// Source transform with its scale multiplied by the layer factor.
pub fn overlay_transform(source: &Transform, scale: f32) -> Transform {
    Transform {
        translation: source.translation,
        rotation: source.rotation,
        scale: source.scale * scale,
    }
}

#[derive(Resource, Debug, Clone)]
pub struct OverlayMaterials {
    handles: [Handle<StandardMaterial>; 11],
}

impl OverlayMaterials {
    pub fn new(materials: &mut Assets<StandardMaterial>) -> Self {
        Self {
            handles: OverlayRole::ALL.map(|role| materials.add(role.material())),
        }
    }

    pub fn handle(&self, role: OverlayRole) -> Handle<StandardMaterial> {
        self.handles[role.index()].clone()
    }
}

type VertexKey = [i64; 3];

fn vertex_key(position: Vec3) -> VertexKey {
    (position * MERGE_PRECISION).round().as_i64vec3().to_array()
}

struct HalfEdge {
    start: Vec3,
    end: Vec3,
    normal: Vec3,
}

/// Segments where adjacent faces meet at more than `threshold_degrees`,
/// plus every edge with only one face. Vertices closer than 1e-4 count as
/// the same vertex.
pub fn feature_edges(
    positions: &[Vec3],
    triangles: &[[usize; 3]],
    threshold_degrees: f32,
) -> Vec<[Vec3; 2]> {
    let threshold_dot = threshold_degrees.to_radians().cos();
    let mut open: Vec<Option<HalfEdge>> = Vec::new();
    let mut lookup: HashMap<(VertexKey, VertexKey), usize> = HashMap::new();
    let mut segments = Vec::new();

    for triangle in triangles {
        let (Some(&a), Some(&b), Some(&c)) = (
            positions.get(triangle[0]),
            positions.get(triangle[1]),
            positions.get(triangle[2]),
        ) else {
            continue;
        };
        let corners = [a, b, c];
        let keys = corners.map(vertex_key);
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
            continue;
        }
        let normal = (b - a).cross(c - a).normalize_or_zero();

        for j in 0..3 {
            let next = (j + 1) % 3;
            let forward = (keys[j], keys[next]);
            let reverse = (keys[next], keys[j]);

            match lookup.get(&reverse).and_then(|&slot| open[slot].take()) {
                Some(twin) => {
                    if normal.dot(twin.normal) <= threshold_dot {
                        segments.push([twin.start, twin.end]);
                    }
                }
                None => {
                    if !lookup.contains_key(&forward) {
                        lookup.insert(forward, open.len());
                        open.push(Some(HalfEdge {
                            start: corners[j],
                            end: corners[next],
                            normal,
                        }));
                    }
                }
            }
        }
    }

    segments.extend(open.into_iter().flatten().map(|edge| [edge.start, edge.end]));
    segments
}

/// Positions and triangle corner indices of a triangle-list mesh.
pub fn mesh_triangles(mesh: &Mesh) -> Option<(Vec<Vec3>, Vec<[usize; 3]>)> {
    if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
        return None;
    }
    let Some(VertexAttributeValues::Float32x3(raw)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return None;
    };

    let positions: Vec<Vec3> = raw.iter().map(|p| Vec3::from_array(*p)).collect();
    let indices: Vec<usize> = match mesh.indices() {
        Some(indices) => indices.iter().collect(),
        None => (0..positions.len()).collect(),
    };
    let triangles = indices
        .chunks_exact(3)
        .map(|corner| [corner[0], corner[1], corner[2]])
        .collect();

    Some((positions, triangles))
}

pub fn edge_line_mesh(segments: &[[Vec3; 2]]) -> Mesh {
    let positions: Vec<[f32; 3]> = segments
        .iter()
        .flat_map(|[start, end]| [start.to_array(), end.to_array()])
        .collect();
    let normals = vec![[0.0, 0.0, 1.0]; positions.len()];

    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
}

pub(super) fn animate_overlays(
    time: Res<Time>,
    pointer: Res<PointerState>,
    animator: Res<HeroAnimator>,
    overlay_materials: Res<OverlayMaterials>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let t = time.elapsed_secs() - animator.mounted_at;
    for role in OverlayRole::ALL {
        let opacity = role.pulse().sample(t, pointer.normalized);
        if let Some(mut material) = materials.get_mut(&overlay_materials.handle(role)) {
            material.base_color = material.base_color.with_alpha(opacity);
        }
    }
}

pub(super) fn sync_overlay_transforms(
    sources: Query<&Transform, (With<OverlaySource>, Without<OverlayLayer>)>,
    mut layers: Query<(&OverlayLayer, &mut Transform), Without<OverlaySource>>,
) {
    for (layer, mut transform) in &mut layers {
        let Ok(source) = sources.get(layer.source) else {
            continue;
        };
        let next = overlay_transform(source, layer.scale);
        if *transform != next {
            *transform = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn plan_is_eleven_layers_per_mesh() {
        let plan = plan_overlays(3);
        assert_eq!(plan.len(), 33);
        assert_eq!(plan.iter().filter(|o| o.role.is_edge()).count(), 9);
        assert!(plan[..11].iter().all(|o| o.source == 0));
        assert_eq!(plan[11].source, 1);
    }

    #[test]
    fn plan_is_deterministic() {
        assert_eq!(plan_overlays(5), plan_overlays(5));
        assert!(plan_overlays(0).is_empty());
    }

    #[test]
    fn insets_shrink_and_edges_grow() {
        let scales: Vec<f32> = OverlayRole::ALL.iter().map(|role| role.scale()).collect();
        assert!(scales.windows(2).all(|pair| pair[0] < pair[1]));
        for role in OverlayRole::ALL {
            assert_eq!(role.scale() > 1.0, role.is_edge());
        }
    }

    #[test]
    fn roles_index_in_spawn_order() {
        for (position, role) in OverlayRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), position);
        }
    }

    #[test]
    fn layers_follow_their_source_every_frame() {
        let mut app = App::new();
        app.add_systems(Update, sync_overlay_transforms);
        let source = app
            .world_mut()
            .spawn((OverlaySource, Transform::IDENTITY))
            .id();
        let layers: Vec<(Entity, f32)> = OverlayRole::ALL
            .iter()
            .map(|role| {
                let layer = OverlayLayer {
                    role: *role,
                    source,
                    scale: role.scale(),
                };
                (app.world_mut().spawn((layer, Transform::IDENTITY)).id(), role.scale())
            })
            .collect();

        let moved = Transform::from_xyz(1.0, -2.0, 0.5)
            .with_rotation(Quat::from_rotation_y(0.3))
            .with_scale(Vec3::splat(2.0));
        *app.world_mut().get_mut::<Transform>(source).unwrap() = moved;
        app.update();

        for (layer, scale) in layers {
            assert_eq!(
                *app.world().get::<Transform>(layer).unwrap(),
                overlay_transform(&moved, scale)
            );
        }
    }

    #[test]
    fn overlay_transform_scales_source() {
        let source = Transform::from_xyz(1.0, 2.0, 3.0)
            .with_rotation(Quat::from_rotation_y(0.4))
            .with_scale(Vec3::new(2.0, 1.0, 1.0));
        let overlay = overlay_transform(&source, 0.5);

        assert_eq!(overlay.translation, source.translation);
        assert_eq!(overlay.rotation, source.rotation);
        assert_eq!(overlay.scale, Vec3::new(1.0, 0.5, 0.5));
    }

    #[test]
    fn cuboid_has_twelve_feature_edges() {
        let mesh = Mesh::from(Cuboid::new(2.0, 1.0, 1.0));
        let (positions, triangles) = mesh_triangles(&mesh).unwrap();
        let edges = feature_edges(&positions, &triangles, EDGE_THRESHOLD_DEGREES);
        assert_eq!(edges.len(), 12);
    }

    #[test]
    fn lone_triangle_is_all_boundary() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let edges = feature_edges(&positions, &[[0, 1, 2]], EDGE_THRESHOLD_DEGREES);
        assert_eq!(
            edges,
            vec![[Vec3::ZERO, Vec3::X], [Vec3::X, Vec3::Y], [Vec3::Y, Vec3::ZERO]]
        );
    }

    #[test]
    fn coplanar_quad_drops_its_diagonal() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let edges = feature_edges(&positions, &[[0, 1, 2], [0, 2, 3]], EDGE_THRESHOLD_DEGREES);
        assert_eq!(edges.len(), 4);
        assert!(!edges.contains(&[Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)]));
    }

    #[test]
    fn near_duplicate_vertices_are_merged() {
        // Second triangle's shared corners are off by less than the merge step.
        let positions = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.000_01, 0.0, 0.0),
            Vec3::new(1.0, 1.000_01, 0.0),
            Vec3::Y,
        ];
        let edges = feature_edges(&positions, &[[0, 1, 2], [3, 4, 5]], EDGE_THRESHOLD_DEGREES);
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn degenerate_triangles_are_skipped() {
        let positions = [Vec3::ZERO, Vec3::ZERO, Vec3::X];
        assert!(feature_edges(&positions, &[[0, 1, 2]], EDGE_THRESHOLD_DEGREES).is_empty());
    }

    #[test]
    fn line_mesh_has_two_vertices_per_segment() {
        let mesh = edge_line_mesh(&[[Vec3::ZERO, Vec3::X], [Vec3::X, Vec3::Y]]);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineList);
        assert_eq!(mesh.count_vertices(), 4);
    }

    proptest! {
        #[test]
        fn opacity_stays_within_role_max(
            t in 0.0f32..100_000.0,
            px in -1.0f32..=1.0,
            py in -1.0f32..=1.0,
        ) {
            for role in OverlayRole::ALL {
                let pulse = role.pulse();
                let opacity = pulse.sample(t, Vec2::new(px, py));
                prop_assert!(opacity >= 0.0);
                prop_assert!(opacity <= pulse.max);
                prop_assert!(pulse.max <= 1.0);
            }
        }
    }
}
