//! Animation layer: states, blend tree nodes and the transition graph
//!
//! A layer exclusively owns everything reachable from it. States, blend
//! trees, leaves (clip references) and nodes (blend tree references) each
//! live in a generation-checked arena, so removing one never invalidates
//! another and a stale key resolves to [`AnimError::NotFound`].

use std::sync::Arc;

use glam::Vec3;
use slotmap::{SlotMap, new_key_type};

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::blend_tree::{AnimBlendTree, BlendType};
use crate::clip::AnimClip;
use crate::error::{AnimError, Result};
use crate::state::AnimState;

/// Maximum number of children of one blend tree
pub const MAX_BLEND_TREE_CHILDREN: usize = 17;

new_key_type! {
    pub struct StateKey;
    pub struct BlendTreeKey;
    pub struct LeafKey;
    pub struct NodeKey;
}

/// Motion reference: either a clip leaf or a nested blend tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Leaf(LeafKey),
    Node(NodeKey),
}

/// A clip positioned in blend space
#[derive(Debug, Clone)]
pub struct AnimLeaf {
    pub blend_space_vector: Vec3,
    pub clip: Option<Arc<AnimClip>>,
}

/// A blend tree positioned in blend space
#[derive(Debug, Clone)]
pub struct AnimNode {
    pub blend_space_vector: Vec3,
    pub blend_tree: BlendTreeKey,
}

/// How a layer combines with the layers below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum Blending {
    #[default]
    Override,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum CompareFunc {
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Equal,
}

/// Guard on a transition: `parameter <compare_func> value`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub parameter_index: usize,
    pub compare_func: CompareFunc,
    pub value: f32,
}

impl Condition {
    pub const fn new(parameter_index: usize, compare_func: CompareFunc, value: f32) -> Self {
        Self {
            parameter_index,
            compare_func,
            value,
        }
    }

    pub fn evaluate(&self, parameter: f32) -> bool {
        match self.compare_func {
            CompareFunc::GreaterThan => parameter > self.value,
            CompareFunc::GreaterEqual => parameter >= self.value,
            CompareFunc::LessThan => parameter < self.value,
            CompareFunc::LessEqual => parameter <= self.value,
            CompareFunc::Equal => parameter == self.value,
        }
    }
}

/// Directed edge of the state graph
#[derive(Debug, Clone, PartialEq)]
pub struct AnimTransition {
    pub src_state: StateKey,
    pub dst_state: StateKey,
    /// Normalized source time at which the transition may fire
    pub exit_time: f32,
    /// Normalized time the destination state starts at
    pub start_time: f32,
    /// Seconds when `fixed_duration`, otherwise a fraction of the source duration
    pub duration: f32,
    pub fixed_duration: bool,
    pub has_exit_time: bool,
    /// Cannot be interrupted until its cross-fade is done
    pub is_atomic: bool,
    pub conditions: Vec<Condition>,
}

impl AnimTransition {
    pub fn new(src_state: StateKey, dst_state: StateKey) -> Self {
        Self {
            src_state,
            dst_state,
            exit_time: 0.0,
            start_time: 0.0,
            duration: 0.25,
            fixed_duration: true,
            has_exit_time: false,
            is_atomic: false,
            conditions: Vec::new(),
        }
    }

    /// All conditions hold for the given parameter table. Missing parameters read as 0.
    pub fn conditions_hold(&self, parameters: &[f32]) -> bool {
        self.conditions.iter().all(|condition| {
            let value = parameters
                .get(condition.parameter_index)
                .copied()
                .unwrap_or(0.0);
            condition.evaluate(value)
        })
    }

    /// Cross-fade length in milliseconds for a source state lasting `src_duration` ms
    pub fn blend_duration(&self, src_duration: f32) -> i32 {
        if self.fixed_duration {
            (self.duration * 1000.0).round() as i32
        } else {
            (self.duration * src_duration) as i32
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimLayer {
    name: String,
    blending: Blending,
    weight: f32,
    mask_joints: Option<Vec<usize>>,
    states: SlotMap<StateKey, AnimState>,
    state_order: Vec<StateKey>,
    default_state: Option<StateKey>,
    blend_trees: SlotMap<BlendTreeKey, AnimBlendTree>,
    leaves: SlotMap<LeafKey, AnimLeaf>,
    nodes: SlotMap<NodeKey, AnimNode>,
    transitions: Vec<AnimTransition>,
}

impl AnimLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blending: Blending::Override,
            weight: 1.0,
            mask_joints: None,
            states: SlotMap::with_key(),
            state_order: Vec::new(),
            default_state: None,
            blend_trees: SlotMap::with_key(),
            leaves: SlotMap::with_key(),
            nodes: SlotMap::with_key(),
            transitions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn blending(&self) -> Blending {
        self.blending
    }

    pub fn set_blending(&mut self, blending: Blending) {
        self.blending = blending;
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, 1.0);
    }

    /// Joints this layer affects. `None` until a mask is set, which means every joint.
    /// An empty mask affects no joint at all.
    pub fn mask_joints(&self) -> Option<&[usize]> {
        self.mask_joints.as_deref()
    }

    pub fn set_mask_joints(&mut self, mut joints: Vec<usize>) {
        joints.sort_unstable();
        joints.dedup();
        self.mask_joints = Some(joints);
    }

    /// Whether the root joint is part of this layer's mask
    pub fn affects_root(&self) -> bool {
        match &self.mask_joints {
            None => true,
            Some(joints) => joints.first() == Some(&0),
        }
    }

    // States

    pub fn create_state(&mut self, name: impl Into<String>) -> Result<StateKey> {
        let name = name.into();
        if self.find_state(&name).is_some() {
            return Err(AnimError::duplicate("state", name));
        }
        let key = self.states.insert(AnimState::new(name));
        self.state_order.push(key);
        Ok(key)
    }

    pub fn find_state(&self, name: &str) -> Option<StateKey> {
        self.state_order
            .iter()
            .copied()
            .find(|&key| self.states.get(key).is_some_and(|state| state.name().eq_ignore_ascii_case(name)))
    }

    pub fn state(&self, key: StateKey) -> Result<&AnimState> {
        self.states
            .get(key)
            .ok_or_else(|| AnimError::not_found("state", format!("{:?}", key)))
    }

    pub fn state_mut(&mut self, key: StateKey) -> Result<&mut AnimState> {
        self.states
            .get_mut(key)
            .ok_or_else(|| AnimError::not_found("state", format!("{:?}", key)))
    }

    /// States in creation order
    pub fn states(&self) -> impl Iterator<Item = (StateKey, &AnimState)> {
        self.state_order
            .iter()
            .filter_map(|&key| self.states.get(key).map(|state| (key, state)))
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn rename_state(&mut self, key: StateKey, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.find_state(&name).is_some_and(|other| other != key) {
            return Err(AnimError::duplicate("state", name));
        }
        self.state_mut(key)?.set_name(name);
        Ok(())
    }

    /// Remove a state together with its motion and every transition touching it
    pub fn delete_state(&mut self, key: StateKey) -> Result<AnimState> {
        let state = self
            .states
            .remove(key)
            .ok_or_else(|| AnimError::not_found("state", format!("{:?}", key)))?;
        self.state_order.retain(|&other| other != key);
        self.transitions
            .retain(|transition| transition.src_state != key && transition.dst_state != key);
        if self.default_state == Some(key) {
            self.default_state = None;
        }
        if let Some(motion) = state.motion() {
            self.remove_node(motion);
        }
        Ok(state)
    }

    pub fn default_state(&self) -> Option<StateKey> {
        self.default_state.filter(|&key| self.states.contains_key(key))
    }

    pub fn set_default_state(&mut self, key: StateKey) -> Result<()> {
        self.state(key)?;
        self.default_state = Some(key);
        Ok(())
    }

    /// Play `clip` in `state`, replacing any previous motion
    pub fn set_state_anim_clip(&mut self, state: StateKey, clip: Arc<AnimClip>) -> Result<NodeRef> {
        self.state(state)?;
        let leaf = self.create_leaf(Vec3::ZERO, Some(clip));
        self.replace_state_motion(state, leaf)?;
        Ok(leaf)
    }

    /// Play `tree` in `state`, replacing any previous motion
    pub fn set_state_blend_tree(&mut self, state: StateKey, tree: BlendTreeKey) -> Result<NodeRef> {
        self.state(state)?;
        let node = self.create_node(Vec3::ZERO, tree)?;
        self.replace_state_motion(state, node)?;
        Ok(node)
    }

    fn replace_state_motion(&mut self, state: StateKey, motion: NodeRef) -> Result<()> {
        let previous = self.state_mut(state)?.set_motion(Some(motion));
        if let Some(previous) = previous {
            self.remove_node(previous);
        }
        Ok(())
    }

    // Blend trees and nodes

    pub fn create_blend_tree(&mut self, name: impl Into<String>, blend_type: BlendType) -> BlendTreeKey {
        self.blend_trees.insert(AnimBlendTree::new(name, blend_type))
    }

    /// Delete a tree. Nodes still pointing at it resolve to `NotFound` afterwards.
    pub fn delete_blend_tree(&mut self, key: BlendTreeKey) -> Result<AnimBlendTree> {
        let tree = self
            .blend_trees
            .remove(key)
            .ok_or_else(|| AnimError::not_found("blend tree", format!("{:?}", key)))?;
        for &child in tree.children() {
            self.remove_node(child);
        }
        Ok(tree)
    }

    pub fn blend_tree(&self, key: BlendTreeKey) -> Result<&AnimBlendTree> {
        self.blend_trees
            .get(key)
            .ok_or_else(|| AnimError::not_found("blend tree", format!("{:?}", key)))
    }

    pub fn blend_tree_mut(&mut self, key: BlendTreeKey) -> Result<&mut AnimBlendTree> {
        self.blend_trees
            .get_mut(key)
            .ok_or_else(|| AnimError::not_found("blend tree", format!("{:?}", key)))
    }

    pub fn blend_trees(&self) -> impl Iterator<Item = (BlendTreeKey, &AnimBlendTree)> {
        self.blend_trees.iter()
    }

    pub fn create_leaf(&mut self, blend_space_vector: Vec3, clip: Option<Arc<AnimClip>>) -> NodeRef {
        NodeRef::Leaf(self.leaves.insert(AnimLeaf {
            blend_space_vector,
            clip,
        }))
    }

    pub fn create_node(&mut self, blend_space_vector: Vec3, blend_tree: BlendTreeKey) -> Result<NodeRef> {
        self.blend_tree(blend_tree)?;
        Ok(NodeRef::Node(self.nodes.insert(AnimNode {
            blend_space_vector,
            blend_tree,
        })))
    }

    /// Release exactly one leaf or node slot. Returns whether it existed.
    pub fn remove_node(&mut self, node: NodeRef) -> bool {
        match node {
            NodeRef::Leaf(key) => self.leaves.remove(key).is_some(),
            NodeRef::Node(key) => self.nodes.remove(key).is_some(),
        }
    }

    pub fn leaf(&self, key: LeafKey) -> Result<&AnimLeaf> {
        self.leaves
            .get(key)
            .ok_or_else(|| AnimError::not_found("leaf", format!("{:?}", key)))
    }

    pub fn node(&self, key: NodeKey) -> Result<&AnimNode> {
        self.nodes
            .get(key)
            .ok_or_else(|| AnimError::not_found("node", format!("{:?}", key)))
    }

    pub fn contains_node(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Leaf(key) => self.leaves.contains_key(key),
            NodeRef::Node(key) => self.nodes.contains_key(key),
        }
    }

    pub fn node_blend_space_vector(&self, node: NodeRef) -> Result<Vec3> {
        match node {
            NodeRef::Leaf(key) => self.leaf(key).map(|leaf| leaf.blend_space_vector),
            NodeRef::Node(key) => self.node(key).map(|node| node.blend_space_vector),
        }
    }

    pub fn set_node_blend_space_vector(&mut self, node: NodeRef, vector: Vec3) -> Result<()> {
        let slot = match node {
            NodeRef::Leaf(key) => self.leaves.get_mut(key).map(|leaf| &mut leaf.blend_space_vector),
            NodeRef::Node(key) => self.nodes.get_mut(key).map(|node| &mut node.blend_space_vector),
        };
        match slot {
            Some(slot) => {
                *slot = vector;
                Ok(())
            }
            None => Err(AnimError::not_found("node", format!("{:?}", node))),
        }
    }

    /// The blend tree a node refers to
    pub fn node_blend_tree(&self, key: NodeKey) -> Result<&AnimBlendTree> {
        self.blend_tree(self.node(key)?.blend_tree)
    }

    /// The clip a leaf refers to, if one is assigned
    pub fn node_anim_clip(&self, key: LeafKey) -> Result<Option<&Arc<AnimClip>>> {
        self.leaf(key).map(|leaf| leaf.clip.as_ref())
    }

    // Blend tree children

    /// Whether `target` is `from` or nested somewhere below it
    fn tree_reaches(&self, from: BlendTreeKey, target: BlendTreeKey) -> bool {
        if from == target {
            return true;
        }
        let Ok(tree) = self.blend_tree(from) else {
            return false;
        };
        tree.children().iter().any(|child| match child {
            NodeRef::Node(key) => self
                .nodes
                .get(*key)
                .is_some_and(|node| self.tree_reaches(node.blend_tree, target)),
            NodeRef::Leaf(_) => false,
        })
    }

    fn check_child_capacity(&self, tree: BlendTreeKey) -> Result<()> {
        if self.blend_tree(tree)?.num_children() >= MAX_BLEND_TREE_CHILDREN {
            return Err(AnimError::CapacityExceeded {
                what: "blend tree children",
                max: MAX_BLEND_TREE_CHILDREN,
            });
        }
        Ok(())
    }

    fn insert_child(&mut self, tree: BlendTreeKey, index: usize, child: NodeRef) -> Result<NodeRef> {
        let children = self.blend_tree_mut(tree)?.children_mut();
        let index = index.min(children.len());
        children.insert(index, child);
        Ok(child)
    }

    pub fn insert_child_clip(
        &mut self,
        tree: BlendTreeKey,
        index: usize,
        clip: Arc<AnimClip>,
        blend_space_vector: Vec3,
    ) -> Result<NodeRef> {
        self.check_child_capacity(tree)?;
        let leaf = self.create_leaf(blend_space_vector, Some(clip));
        self.insert_child(tree, index, leaf)
    }

    pub fn add_child_clip(
        &mut self,
        tree: BlendTreeKey,
        clip: Arc<AnimClip>,
        blend_space_vector: Vec3,
    ) -> Result<NodeRef> {
        self.insert_child_clip(tree, usize::MAX, clip, blend_space_vector)
    }

    pub fn insert_child_blend_tree(
        &mut self,
        tree: BlendTreeKey,
        index: usize,
        child_tree: BlendTreeKey,
        blend_space_vector: Vec3,
    ) -> Result<NodeRef> {
        if self.tree_reaches(child_tree, tree) {
            return Err(AnimError::InvalidDefinition(
                "a blend tree cannot contain itself".to_string(),
            ));
        }
        self.check_child_capacity(tree)?;
        let node = self.create_node(blend_space_vector, child_tree)?;
        self.insert_child(tree, index, node)
    }

    pub fn add_child_blend_tree(
        &mut self,
        tree: BlendTreeKey,
        child_tree: BlendTreeKey,
        blend_space_vector: Vec3,
    ) -> Result<NodeRef> {
        self.insert_child_blend_tree(tree, usize::MAX, child_tree, blend_space_vector)
    }

    /// Detach the child at `index` and release its leaf or node slot
    pub fn remove_child(&mut self, tree: BlendTreeKey, index: usize) -> Result<()> {
        let children = self.blend_tree_mut(tree)?.children_mut();
        if index >= children.len() {
            return Err(AnimError::not_found("blend tree child", index.to_string()));
        }
        let child = children.remove(index);
        self.remove_node(child);
        Ok(())
    }

    fn child(&self, tree: BlendTreeKey, index: usize) -> Result<NodeRef> {
        self.blend_tree(tree)?
            .children()
            .get(index)
            .copied()
            .ok_or_else(|| AnimError::not_found("blend tree child", index.to_string()))
    }

    /// Swap the clip of a leaf child
    pub fn set_child_clip(&mut self, tree: BlendTreeKey, index: usize, clip: Arc<AnimClip>) -> Result<()> {
        match self.child(tree, index)? {
            NodeRef::Leaf(key) => {
                if let Some(leaf) = self.leaves.get_mut(key) {
                    leaf.clip = Some(clip);
                    Ok(())
                } else {
                    Err(AnimError::not_found("leaf", format!("{:?}", key)))
                }
            }
            NodeRef::Node(_) => Err(AnimError::InvalidDefinition(format!(
                "child {} of the blend tree is not a clip",
                index
            ))),
        }
    }

    pub fn child_blend_space_vector(&self, tree: BlendTreeKey, index: usize) -> Result<Vec3> {
        self.node_blend_space_vector(self.child(tree, index)?)
    }

    pub fn set_child_blend_space_vector(&mut self, tree: BlendTreeKey, index: usize, vector: Vec3) -> Result<()> {
        let child = self.child(tree, index)?;
        self.set_node_blend_space_vector(child, vector)
    }

    // Transitions

    pub fn create_transition(&mut self, src: StateKey, dst: StateKey) -> Result<&mut AnimTransition> {
        self.state(src)?;
        self.state(dst)?;
        if self.find_transition(src, dst).is_some() {
            let src_name = self.state(src)?.name().to_string();
            let dst_name = self.state(dst)?.name();
            return Err(AnimError::duplicate(
                "transition",
                format!("{} -> {}", src_name, dst_name),
            ));
        }
        self.transitions.push(AnimTransition::new(src, dst));
        let index = self.transitions.len() - 1;
        Ok(&mut self.transitions[index])
    }

    pub fn find_transition(&self, src: StateKey, dst: StateKey) -> Option<&AnimTransition> {
        self.transitions
            .iter()
            .find(|transition| transition.src_state == src && transition.dst_state == dst)
    }

    pub fn find_transition_mut(&mut self, src: StateKey, dst: StateKey) -> Option<&mut AnimTransition> {
        self.transitions
            .iter_mut()
            .find(|transition| transition.src_state == src && transition.dst_state == dst)
    }

    pub fn remove_transition(&mut self, src: StateKey, dst: StateKey) -> Result<AnimTransition> {
        let index = self
            .transitions
            .iter()
            .position(|transition| transition.src_state == src && transition.dst_state == dst)
            .ok_or_else(|| AnimError::not_found("transition", format!("{:?} -> {:?}", src, dst)))?;
        Ok(self.transitions.remove(index))
    }

    /// Outgoing edges of `src`, in creation order
    pub fn transitions_from(&self, src: StateKey) -> impl Iterator<Item = &AnimTransition> {
        self.transitions
            .iter()
            .filter(move |transition| transition.src_state == src)
    }

    /// Outgoing edges of the named state. Unknown names yield nothing.
    pub fn list_transitions_from(&self, name: &str) -> Vec<&AnimTransition> {
        match self.find_state(name) {
            Some(src) => self.transitions_from(src).collect(),
            None => Vec::new(),
        }
    }

    pub fn transitions(&self) -> &[AnimTransition] {
        &self.transitions
    }

    /// Fix up parameter indices after parameter `removed` was deleted
    pub(crate) fn remap_parameter_removal(&mut self, removed: usize) {
        for transition in &mut self.transitions {
            transition
                .conditions
                .retain(|condition| condition.parameter_index != removed);
            for condition in &mut transition.conditions {
                if condition.parameter_index > removed {
                    condition.parameter_index -= 1;
                }
            }
        }
        for tree in self.blend_trees.values_mut() {
            for axis in 0..3 {
                let remapped = match tree.parameter_index(axis) {
                    Some(index) if index == removed => None,
                    Some(index) if index > removed => Some(index - 1),
                    other => other,
                };
                tree.set_parameter_index(axis, remapped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::KeyframeAnim;
    use crate::types::JointPose;
    use test_case::test_case;

    fn clip(name: &str) -> Arc<AnimClip> {
        let anim = KeyframeAnim::still(name, &[JointPose::IDENTITY]);
        Arc::new(AnimClip::new(Arc::new(anim)))
    }

    #[test]
    fn test_state_names_are_unique_case_insensitive() {
        let mut layer = AnimLayer::new("Base");
        let idle = layer.create_state("Idle").unwrap();
        assert!(matches!(layer.create_state("IDLE"), Err(AnimError::Duplicate { .. })));
        assert_eq!(layer.find_state("idle"), Some(idle));
    }

    #[test]
    fn test_delete_state_drops_edges_and_default() {
        let mut layer = AnimLayer::new("Base");
        let idle = layer.create_state("Idle").unwrap();
        let run = layer.create_state("Run").unwrap();
        layer.set_default_state(idle).unwrap();
        layer.create_transition(idle, run).unwrap();
        layer.create_transition(run, idle).unwrap();
        let motion = layer.set_state_anim_clip(idle, clip("idle")).unwrap();

        layer.delete_state(idle).unwrap();

        assert!(layer.transitions().is_empty());
        assert_eq!(layer.default_state(), None);
        assert!(!layer.contains_node(motion));
        assert!(matches!(layer.state(idle), Err(AnimError::NotFound { .. })));
        assert_eq!(layer.states().count(), 1);
    }

    #[test]
    fn test_remove_child_keeps_other_handles_valid() {
        let mut layer = AnimLayer::new("Base");
        let tree = layer.create_blend_tree("Move", BlendType::Blend1D);
        let a = layer.add_child_clip(tree, clip("a"), Vec3::ZERO).unwrap();
        let b = layer.add_child_clip(tree, clip("b"), Vec3::X).unwrap();
        let c = layer.add_child_clip(tree, clip("c"), Vec3::X * 2.0).unwrap();

        layer.remove_child(tree, 1).unwrap();

        assert!(layer.contains_node(a));
        assert!(!layer.contains_node(b));
        assert!(layer.contains_node(c));
        assert_eq!(layer.blend_tree(tree).unwrap().children(), &[a, c]);
        assert_eq!(layer.child_blend_space_vector(tree, 1).unwrap(), Vec3::X * 2.0);
        assert!(layer.node_blend_space_vector(b).is_err());
    }

    #[test]
    fn test_child_cap_is_reported() {
        let mut layer = AnimLayer::new("Base");
        let tree = layer.create_blend_tree("Wide", BlendType::Blend1D);
        for i in 0..MAX_BLEND_TREE_CHILDREN {
            layer.add_child_clip(tree, clip("x"), Vec3::X * i as f32).unwrap();
        }
        let result = layer.add_child_clip(tree, clip("x"), Vec3::ZERO);
        assert_eq!(
            result,
            Err(AnimError::CapacityExceeded {
                what: "blend tree children",
                max: MAX_BLEND_TREE_CHILDREN
            })
        );
    }

    #[test]
    fn test_insert_child_at_front() {
        let mut layer = AnimLayer::new("Base");
        let tree = layer.create_blend_tree("Move", BlendType::Blend1D);
        let inner = layer.create_blend_tree("Inner", BlendType::Angle);
        let a = layer.add_child_clip(tree, clip("a"), Vec3::X).unwrap();
        let node = layer.insert_child_blend_tree(tree, 0, inner, Vec3::ZERO).unwrap();

        assert_eq!(layer.blend_tree(tree).unwrap().children(), &[node, a]);
        let NodeRef::Node(key) = node else {
            panic!("expected a blend tree node");
        };
        assert_eq!(layer.node_blend_tree(key).unwrap().name(), "Inner");
        assert!(layer.insert_child_blend_tree(tree, 0, tree, Vec3::ZERO).is_err());
        assert!(layer.add_child_blend_tree(inner, tree, Vec3::ZERO).is_err());
    }

    #[test]
    fn test_transition_lookup() {
        let mut layer = AnimLayer::new("Base");
        let idle = layer.create_state("Idle").unwrap();
        let run = layer.create_state("Run").unwrap();
        let jump = layer.create_state("Jump").unwrap();
        layer.create_transition(idle, run).unwrap();
        layer.create_transition(idle, jump).unwrap().is_atomic = true;

        assert!(matches!(layer.create_transition(idle, run), Err(AnimError::Duplicate { .. })));

        let outgoing = layer.list_transitions_from("idle");
        assert_eq!(outgoing.len(), 2);
        assert_eq!(outgoing[0].dst_state, run);
        assert!(outgoing[1].is_atomic);
        assert!(layer.list_transitions_from("nobody").is_empty());

        layer.remove_transition(idle, run).unwrap();
        assert_eq!(layer.transitions_from(idle).count(), 1);
    }

    #[test]
    fn test_transition_defaults() {
        let mut layer = AnimLayer::new("Base");
        let a = layer.create_state("A").unwrap();
        let b = layer.create_state("B").unwrap();
        let transition = layer.create_transition(a, b).unwrap();
        assert!(transition.fixed_duration);
        assert!(!transition.has_exit_time);
        assert_eq!(transition.blend_duration(1000.0), 250);
        transition.fixed_duration = false;
        transition.duration = 0.5;
        assert_eq!(transition.blend_duration(1000.0), 500);
    }

    #[test_case(CompareFunc::GreaterThan, 1.0, false)]
    #[test_case(CompareFunc::GreaterEqual, 1.0, true)]
    #[test_case(CompareFunc::LessThan, 0.5, true)]
    #[test_case(CompareFunc::LessEqual, 1.5, false)]
    #[test_case(CompareFunc::Equal, 1.0, true)]
    fn test_condition_evaluate(func: CompareFunc, value: f32, expected: bool) {
        let condition = Condition::new(0, func, 1.0);
        assert_eq!(condition.evaluate(value), expected);
    }

    #[test]
    fn test_missing_parameter_reads_as_zero() {
        let mut transition = AnimTransition::new(StateKey::default(), StateKey::default());
        transition
            .conditions
            .push(Condition::new(3, CompareFunc::LessThan, 0.5));
        assert!(transition.conditions_hold(&[]));
    }

    #[test]
    fn test_mask_affects_root() {
        let mut layer = AnimLayer::new("Upper");
        assert!(layer.affects_root());
        layer.set_mask_joints(vec![7, 5, 6, 5]);
        assert_eq!(layer.mask_joints(), Some(&[5, 6, 7][..]));
        assert!(!layer.affects_root());
        layer.set_mask_joints(vec![3, 0]);
        assert!(layer.affects_root());
    }

    #[test]
    fn test_empty_mask_is_not_full_body() {
        let mut layer = AnimLayer::new("Upper");
        assert_eq!(layer.mask_joints(), None);
        layer.set_mask_joints(Vec::new());
        assert_eq!(layer.mask_joints(), Some(&[][..]));
        assert!(!layer.affects_root());
    }
}
