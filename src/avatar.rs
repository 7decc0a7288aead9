use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3};
use log::info;
use smallvec::SmallVec;

use crate::{
    animation::{AnimationClip, ClipSample},
    asset::AssetT,
    error::ModelError,
    Aabb, Color, Transform,
};

/// Surface parameters of one mesh primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: Color,
    pub roughness: f32,
    pub metalness: f32,
    /// has a base color texture
    pub textured: bool,
}

impl Material {
    /// Neutral grey for meshes whose textures are missing.
    pub fn fallback() -> Self {
        Material {
            base_color: Color::from_rgb_hex(0xbbbbbb),
            roughness: 0.6,
            metalness: 0.1,
            textured: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// in the owning node's space
    pub bounds: Aabb,
    pub material: Material,
    pub shadows: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(SmallVec<[Surface; 1]>),
    SkinnedMesh(SmallVec<[Surface; 1]>),
    Bone,
}

impl NodeKind {
    pub fn surfaces(&self) -> &[Surface] {
        match self {
            NodeKind::Mesh(s) | NodeKind::SkinnedMesh(s) => s,
            NodeKind::Group | NodeKind::Bone => &[],
        }
    }

    fn surfaces_mut(&mut self) -> &mut [Surface] {
        match self {
            NodeKind::Mesh(s) | NodeKind::SkinnedMesh(s) => s,
            NodeKind::Group | NodeKind::Bone => &mut [],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub kind: NodeKind,
    pub local: Transform,
    pub children: Vec<usize>,
}

/// Node hierarchy of a model. Indices point into `nodes`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelTree {
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
}

impl ModelTree {
    pub fn new() -> Self {
        ModelTree::default()
    }

    pub fn push(&mut self, parent: Option<usize>, node: ModelNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    /// Calls `f` with every node and its model-space transform, parents first.
    pub fn traverse(&self, mut f: impl FnMut(&ModelNode, Mat4)) {
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().rev().map(|r| (*r, Mat4::IDENTITY)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            let world = parent * node.local.matrix();
            f(node, world);
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// Union of all surface bounds in model space.
    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.traverse(|node, world| {
            let affine = glam::Affine3A::from_mat4(world);
            for surface in node.kind.surfaces() {
                bounds = bounds.union(&surface.bounds.transformed(&affine));
            }
        });
        bounds
    }

    pub fn count(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes.iter().filter(|n| predicate(&n.kind)).count()
    }

    /// Reads the default scene (or the first one) of a glTF binary.
    pub fn from_gltf(bytes: &[u8]) -> Result<Self, ModelError> {
        let (document, _buffers, _images) = gltf::import_slice(bytes)?;
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(ModelError::NoScene)?;

        let bones: HashSet<usize> = document
            .skins()
            .flat_map(|skin| skin.joints().map(|j| j.index()).collect::<Vec<_>>())
            .collect();

        let mut tree = ModelTree::new();
        let mut stack: Vec<(gltf::Node, Option<usize>)> = scene.nodes().map(|n| (n, None)).collect();
        stack.reverse();
        while let Some((node, parent)) = stack.pop() {
            let kind = match node.mesh() {
                Some(mesh) => {
                    let surfaces = mesh.primitives().map(|p| surface_of(&p)).collect();
                    if node.skin().is_some() {
                        NodeKind::SkinnedMesh(surfaces)
                    } else {
                        NodeKind::Mesh(surfaces)
                    }
                }
                None if bones.contains(&node.index()) => NodeKind::Bone,
                None => NodeKind::Group,
            };
            let index = tree.push(
                parent,
                ModelNode {
                    name: node.name().unwrap_or_default().to_string(),
                    kind,
                    local: local_transform(&node),
                    children: vec![],
                },
            );
            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(index)));
            }
        }
        Ok(tree)
    }
}

fn surface_of(primitive: &gltf::Primitive) -> Surface {
    let bounds = primitive.bounding_box();
    let pbr = primitive.material().pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    Surface {
        bounds: Aabb::new(Vec3::from(bounds.min), Vec3::from(bounds.max)),
        material: Material {
            base_color: Color { r, g, b, a },
            roughness: pbr.roughness_factor(),
            metalness: pbr.metallic_factor(),
            textured: pbr.base_color_texture().is_some(),
        },
        shadows: false,
    }
}

fn local_transform(node: &gltf::Node) -> Transform {
    match node.transform() {
        gltf::scene::Transform::Matrix { matrix } => {
            Transform::from_matrix(Mat4::from_cols_array_2d(&matrix))
        }
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => Transform {
            position: Vec3::from(translation),
            rotation: Quat::from_array(rotation).normalize(),
            scale: Vec3::from(scale),
        },
    }
}

/// The loaded avatar: its model plus the transform that makes it human-sized with its feet on the ground.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub tree: ModelTree,
    /// scale and ground offset, applied below the avatar pose
    pub base: Transform,
    /// clip blend for the skeletal sampler, refreshed every frame
    pub blend: SmallVec<[ClipSample; 2]>,
}

impl Avatar {
    pub fn new(tree: ModelTree) -> Self {
        Avatar {
            tree,
            base: Transform::IDENTITY,
            blend: SmallVec::new(),
        }
    }

    /// Scales uniformly to `target_height` and lifts the model so its lowest point sits at y = 0.
    pub fn normalize_height(&mut self, target_height: f32) {
        let raw = self.tree.bounds();
        if raw.is_empty() {
            return;
        }
        let raw_size = raw.size();
        info!("Avatar raw bounding box size: {raw_size}");
        let scale = if raw_size.y > 0.0 {
            let s = target_height / raw_size.y;
            info!("Avatar scaled by {s:.4} (raw height={:.2})", raw_size.y);
            s
        } else {
            1.0
        };
        self.base = Transform::IDENTITY.with_scale(scale);
        let scaled = raw.transformed(&self.base.affine());
        self.base.position.y -= scaled.min.y;
    }

    /// Turns on shadow casting and receiving for every surface and gives the untextured ones
    /// the neutral fallback material. Returns how many materials were replaced.
    pub fn prepare_surfaces(&mut self) -> usize {
        let mut replaced = 0;
        for node in self.tree.nodes.iter_mut() {
            for surface in node.kind.surfaces_mut() {
                surface.shadows = true;
                if !surface.material.textured {
                    surface.material = Material::fallback();
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Model bounds after normalisation, in the space of the avatar pose.
    pub fn world_bounds(&self) -> Aabb {
        let bounds = self.tree.bounds();
        if bounds.is_empty() {
            return bounds;
        }
        bounds.transformed(&self.base.affine())
    }

    /// Node transform for an avatar standing at `position` and facing `facing_yaw`.
    pub fn placement(position: Vec3, facing_yaw: f32) -> Transform {
        Transform {
            position,
            rotation: Quat::from_rotation_y(facing_yaw),
            scale: Vec3::ONE,
        }
    }
}

impl AssetT for Avatar {
    fn from_bytes(bytes: &[u8]) -> Result<Self, anyhow::Error> {
        let tree = ModelTree::from_gltf(bytes)?;
        info!(
            "Parsed avatar with {} nodes ({} skinned meshes, {} bones)",
            tree.nodes.len(),
            tree.count(|k| matches!(k, NodeKind::SkinnedMesh(_))),
            tree.count(|k| matches!(k, NodeKind::Bone)),
        );
        Ok(Avatar::new(tree))
    }
}

impl AnimationClip {
    /// First animation of a glTF binary. Its duration is the last keyframe time over all channels.
    pub fn from_gltf(bytes: &[u8]) -> Result<Self, ModelError> {
        let (document, buffers, _images) = gltf::import_slice(bytes)?;
        let animation = document.animations().next().ok_or(ModelError::NoAnimation)?;
        let mut duration = 0f32;
        for channel in animation.channels() {
            let reader = channel.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
            if let Some(inputs) = reader.read_inputs() {
                duration = inputs.fold(duration, f32::max);
            }
        }
        Ok(AnimationClip::new(
            animation.name().unwrap_or_default(),
            duration,
        ))
    }
}

impl AssetT for AnimationClip {
    fn from_bytes(bytes: &[u8]) -> Result<Self, anyhow::Error> {
        Ok(AnimationClip::from_gltf(bytes)?)
    }
}
