//! Read-only evaluation context for one layer
//!
//! States and blend trees never hold references to their layer or to the
//! animator. Everything they need while being sampled is handed to them
//! through a [`LayerView`]: the layer's arenas, the live parameter table,
//! the joints the layer is masked to and the mesh bounds.

use glam::{Quat, Vec3};

use crate::layer::{AnimLayer, NodeRef};
use crate::types::{Aabb, JointPose};

#[derive(Debug, Clone, Copy)]
pub struct LayerView<'a> {
    layer: &'a AnimLayer,
    parameters: &'a [f32],
    mask_joints: &'a [usize],
    mesh_aabb: Aabb,
}

impl<'a> LayerView<'a> {
    /// `mask_joints` is the resolved joint list. An empty list writes no joint.
    pub fn new(layer: &'a AnimLayer, parameters: &'a [f32], mask_joints: &'a [usize], mesh_aabb: Aabb) -> Self {
        Self {
            layer,
            parameters,
            mask_joints,
            mesh_aabb,
        }
    }

    pub fn layer(&self) -> &'a AnimLayer {
        self.layer
    }

    pub fn mask_joints(&self) -> &'a [usize] {
        self.mask_joints
    }

    pub fn mesh_aabb(&self) -> Aabb {
        self.mesh_aabb
    }

    /// Parameter value, 0 for unbound or out of range indices
    pub fn parameter(&self, index: Option<usize>) -> f32 {
        index
            .and_then(|index| self.parameters.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    /// Duration in milliseconds
    pub fn node_duration(&self, node: NodeRef) -> f32 {
        match node {
            NodeRef::Leaf(key) => match self.layer.leaf(key) {
                Ok(leaf) => leaf.clip.as_ref().map_or(0.0, |clip| clip.length() as f32),
                Err(err) => {
                    log::debug!("Layer '{}': {}", self.layer.name(), err);
                    0.0
                }
            },
            NodeRef::Node(key) => match self.layer.node_blend_tree(key) {
                Ok(tree) => tree.duration(self),
                Err(err) => {
                    log::debug!("Layer '{}': {}", self.layer.name(), err);
                    0.0
                }
            },
        }
    }

    /// Write the pose of `node` at `normalized_time` into the masked joints of `out`
    pub fn node_frame(&self, node: NodeRef, normalized_time: f32, out: &mut [JointPose]) {
        match node {
            NodeRef::Leaf(key) => {
                if let Ok(Some(clip)) = self.layer.node_anim_clip(key) {
                    let time = (normalized_time * clip.length() as f32) as i32;
                    clip.frame(time, self.mask_joints, out);
                }
            }
            NodeRef::Node(key) => {
                if let Ok(tree) = self.layer.node_blend_tree(key) {
                    tree.frame(self, normalized_time, out);
                }
            }
        }
    }

    pub fn node_translation(&self, node: NodeRef, normalized_time: f32) -> Vec3 {
        match node {
            NodeRef::Leaf(key) => match self.layer.node_anim_clip(key) {
                Ok(Some(clip)) => clip.translation((normalized_time * clip.length() as f32) as i32),
                _ => Vec3::ZERO,
            },
            NodeRef::Node(key) => self
                .layer
                .node_blend_tree(key)
                .map_or(Vec3::ZERO, |tree| tree.translation(self, normalized_time)),
        }
    }

    pub fn node_rotation(&self, node: NodeRef, normalized_time: f32) -> Quat {
        match node {
            NodeRef::Leaf(key) => match self.layer.node_anim_clip(key) {
                Ok(Some(clip)) => clip.rotation((normalized_time * clip.length() as f32) as i32),
                _ => Quat::IDENTITY,
            },
            NodeRef::Node(key) => self
                .layer
                .node_blend_tree(key)
                .map_or(Quat::IDENTITY, |tree| tree.rotation(self, normalized_time)),
        }
    }

    /// Bounds of `node`. Clips report the mesh bounds.
    pub fn node_aabb(&self, node: NodeRef, normalized_time: f32) -> Aabb {
        match node {
            NodeRef::Leaf(key) => {
                if self.layer.leaf(key).is_ok() {
                    self.mesh_aabb
                } else {
                    Aabb::cleared()
                }
            }
            NodeRef::Node(key) => self
                .layer
                .node_blend_tree(key)
                .map_or_else(|_| Aabb::cleared(), |tree| tree.aabb(self, normalized_time)),
        }
    }
}
