use glam::{Quat, Vec3};
use log::debug;
use slotmap::{new_key_type, SlotMap};

use crate::{avatar::Avatar, config::SceneConfig, splat::SplatCloud, Aabb, Color, Transform};

new_key_type! { pub struct NodeId; }

#[derive(Debug)]
pub enum NodeContent {
    Splat(SplatCloud),
    Avatar(Avatar),
}

impl NodeContent {
    /// Bounds in the node's local space, before the node transform.
    pub fn local_bounds(&self) -> Aabb {
        match self {
            NodeContent::Splat(cloud) => cloud.bounds(),
            NodeContent::Avatar(avatar) => avatar.world_bounds(),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub content: NodeContent,
}

impl Node {
    pub fn new(name: impl Into<String>, content: NodeContent) -> Self {
        Node {
            name: name.into(),
            transform: Transform::IDENTITY,
            content,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn world_bounds(&self) -> Aabb {
        let local = self.content.local_bounds();
        if local.is_empty() {
            return Aabb::EMPTY;
        }
        local.transformed(&self.transform.affine())
    }

    pub fn as_avatar_mut(&mut self) -> Option<&mut Avatar> {
        match &mut self.content {
            NodeContent::Avatar(avatar) => Some(avatar),
            NodeContent::Splat(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lights {
    pub ambient: f32,
    pub directional: f32,
    pub directional_position: Vec3,
}

#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    pub background: Color,
    pub lights: Lights,
}

impl Scene {
    pub fn new(config: &SceneConfig) -> Self {
        Scene {
            nodes: SlotMap::with_key(),
            background: config.background,
            lights: Lights {
                ambient: config.ambient_light,
                directional: config.directional_light,
                directional_position: config.directional_light_position,
            },
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        debug!("Adding node '{}' to the scene", node.name);
        self.nodes.insert(node)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Empty if the node does not exist (yet) or has no geometry.
    pub fn world_bounds(&self, id: Option<NodeId>) -> Aabb {
        id.and_then(|id| self.nodes.get(id))
            .map(Node::world_bounds)
            .unwrap_or(Aabb::EMPTY)
    }
}

/// Turns a Y-down point cloud upright: a half turn around X, quaternion `(1, 0, 0, 0)` in xyzw.
pub const SPLAT_FLIP: Quat = Quat::from_xyzw(1.0, 0.0, 0.0, 0.0);

#[cfg(test)]
mod tests {
    use glam::{vec3, Vec3};

    use super::{Node, NodeContent, Scene, SPLAT_FLIP};
    use crate::{config::SceneConfig, splat::SplatCloud, Aabb, Transform};

    #[test]
    fn absent_nodes_have_empty_bounds() {
        let mut scene = Scene::new(&SceneConfig::default());
        assert!(scene.world_bounds(None).is_empty());

        let cloud = SplatCloud::new(vec![Vec3::ZERO, vec3(1.0, 2.0, 3.0)]);
        let id = scene.add_node(Node::new("splat", NodeContent::Splat(cloud)));
        assert_eq!(scene.world_bounds(Some(id)), Aabb::new(Vec3::ZERO, vec3(1.0, 2.0, 3.0)));

        scene.remove_node(id);
        assert!(scene.world_bounds(Some(id)).is_empty());
        assert!(scene.is_empty());
    }

    #[test]
    fn splat_flip_mirrors_y_and_z() {
        let mut scene = Scene::new(&SceneConfig::default());
        let cloud = SplatCloud::new(vec![vec3(1.0, 1.0, 1.0), vec3(2.0, 3.0, 4.0)]);
        let node = Node::new("splat", NodeContent::Splat(cloud))
            .with_transform(Transform::IDENTITY.with_rotation(SPLAT_FLIP));
        let id = scene.add_node(node);
        let bounds = scene.world_bounds(Some(id));
        assert!((bounds.min - vec3(1.0, -3.0, -4.0)).length() < 1e-5);
        assert!((bounds.max - vec3(2.0, -1.0, -1.0)).length() < 1e-5);
    }
}
