//! Serializable rig descriptions
//!
//! A [`RigDef`] describes a skeleton, its keyframe anims and one controller
//! in plain data, so rigs can be authored as JSON (or anything else serde
//! reads) and turned into runtime objects with [`RigDef::build`].
//!
//! ```json
//! {
//!   "skeleton": { "name": "biped", "joints": [{ "name": "root" }, { "name": "spine", "parent": "root" }] },
//!   "anims": [{ "name": "idle", "frame_times": [0], "frames": [[{}, {}]] }],
//!   "controller": {
//!     "name": "biped",
//!     "parameters": [{ "name": "speed" }],
//!     "layers": [{
//!       "name": "Base Layer",
//!       "states": [{ "name": "Idle", "motion": { "clip": "idle" } }]
//!     }]
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::anim::{AnimSource, KeyframeAnim};
use crate::blend_tree::BlendType;
use crate::cache::ResourceCache;
use crate::clip::AnimClip;
use crate::controller::AnimController;
use crate::error::{AnimError, Result};
use crate::layer::{AnimLayer, BlendTreeKey, Blending, CompareFunc, Condition};
use crate::skeleton::{Joint, Skeleton};
use crate::types::JointPose;

const fn default_true() -> bool {
    true
}

const fn default_weight() -> f32 {
    1.0
}

const fn default_transition_duration() -> f32 {
    0.25
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigDef {
    pub skeleton: SkeletonDef,
    #[serde(default)]
    pub anims: Vec<KeyframeAnimDef>,
    pub controller: ControllerDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDef {
    pub name: String,
    pub joints: Vec<JointDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDef {
    pub name: String,
    /// Name of an earlier joint, absent for the root
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub bind_pose: JointPose,
}

/// Keyframe anim with one full pose per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeAnimDef {
    pub name: String,
    /// Milliseconds, starting at 0
    pub frame_times: Vec<i32>,
    /// `frames[frame][joint]`
    pub frames: Vec<Vec<JointPose>>,
    #[serde(default)]
    pub max_cycle_count: u32,
    #[serde(default = "default_true")]
    pub cyclic_translation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerDef {
    pub name: String,
    #[serde(default)]
    pub root_offset: Vec3,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    /// The first entry describes the base layer
    pub layers: Vec<LayerDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default)]
    pub default: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    #[serde(default)]
    pub blending: Blending,
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Joint mask expression, e.g. `"*spine -head"`
    #[serde(default)]
    pub mask: Option<String>,
    /// Defaults to the first state
    #[serde(default)]
    pub default_state: Option<String>,
    #[serde(default)]
    pub states: Vec<StateDef>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    pub name: String,
    #[serde(default)]
    pub motion: Option<MotionDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub editor_position: Vec2,
}

/// What a state or blend tree child plays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionDef {
    /// Anim by name
    Clip(String),
    BlendTree(BlendTreeDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendTreeDef {
    pub name: String,
    #[serde(default)]
    pub blend_type: BlendType,
    /// Parameter name per blend space axis
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub children: Vec<ChildDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDef {
    #[serde(default)]
    pub position: Vec3,
    #[serde(flatten)]
    pub motion: MotionDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDef {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
    /// Normalized source time the transition waits for
    #[serde(default)]
    pub exit_time: Option<f32>,
    #[serde(default)]
    pub start_time: f32,
    #[serde(default = "default_transition_duration")]
    pub duration: f32,
    #[serde(default = "default_true")]
    pub fixed_duration: bool,
    #[serde(default)]
    pub atomic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDef {
    pub parameter: String,
    pub compare: CompareFunc,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub time: f32,
    pub name: String,
}

/// Runtime objects built from a [`RigDef`]
#[derive(Debug)]
pub struct Rig {
    pub skeleton: Arc<Skeleton>,
    pub anims: ResourceCache<dyn AnimSource>,
    pub controller: AnimController,
}

impl RigDef {
    pub fn build(&self) -> Result<Rig> {
        let skeleton = Arc::new(self.skeleton.build()?);

        let mut anims: ResourceCache<dyn AnimSource> = ResourceCache::new();
        for def in &self.anims {
            if anims.contains(&def.name) {
                return Err(AnimError::duplicate("anim", def.name.clone()));
            }
            anims.insert(def.name.clone(), Arc::new(def.build()?));
        }

        let controller = self.controller.build(&skeleton, &anims)?;
        Ok(Rig {
            skeleton,
            anims,
            controller,
        })
    }
}

impl SkeletonDef {
    pub fn build(&self) -> Result<Skeleton> {
        let mut joints = Vec::with_capacity(self.joints.len());
        for (index, def) in self.joints.iter().enumerate() {
            let parent = match &def.parent {
                None => None,
                Some(parent) => Some(
                    self.joints[..index]
                        .iter()
                        .position(|joint| joint.name.eq_ignore_ascii_case(parent))
                        .ok_or_else(|| {
                            AnimError::InvalidDefinition(format!(
                                "joint '{}' names unknown or later parent '{}'",
                                def.name, parent
                            ))
                        })?,
                ),
            };
            joints.push(Joint::new(def.name.clone(), parent));
        }
        let bind_poses = self.joints.iter().map(|joint| joint.bind_pose).collect();
        Skeleton::new(self.name.clone(), joints, bind_poses)
    }
}

impl KeyframeAnimDef {
    pub fn build(&self) -> Result<KeyframeAnim> {
        let num_joints = self.frames.first().map_or(0, Vec::len);
        if let Some(frame) = self.frames.iter().position(|frame| frame.len() != num_joints) {
            return Err(AnimError::InvalidDefinition(format!(
                "anim '{}' frame {} has {} joints, expected {}",
                self.name,
                frame,
                self.frames[frame].len(),
                num_joints
            )));
        }
        let poses = self.frames.iter().flatten().copied().collect();
        Ok(KeyframeAnim::new(self.name.clone(), num_joints, self.frame_times.clone(), poses)?
            .with_max_cycle_count(self.max_cycle_count)
            .with_cyclic_translation(self.cyclic_translation))
    }
}

/// Name lookups shared by every layer of one controller
struct Resolver {
    clips: HashMap<String, Arc<AnimClip>>,
    parameters: Vec<String>,
}

impl Resolver {
    fn clip(&self, name: &str) -> Result<Arc<AnimClip>> {
        self.clips
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| AnimError::not_found("anim", name))
    }

    fn parameter(&self, name: &str) -> Result<usize> {
        self.parameters
            .iter()
            .position(|parameter| parameter.eq_ignore_ascii_case(name))
            .ok_or_else(|| AnimError::not_found("parameter", name))
    }
}

impl ControllerDef {
    /// Build the controller, registering every anim of `anims` as a clip
    pub fn build(&self, skeleton: &Arc<Skeleton>, anims: &ResourceCache<dyn AnimSource>) -> Result<AnimController> {
        if self.layers.is_empty() {
            return Err(AnimError::InvalidDefinition(format!(
                "controller '{}' has no layers",
                self.name
            )));
        }

        let mut controller = AnimController::new(self.name.clone());
        controller.set_skeleton(Arc::clone(skeleton));
        controller.set_root_offset(self.root_offset);
        for parameter in &self.parameters {
            controller.create_parameter(parameter.name.clone(), parameter.default)?;
        }

        let mut clips = HashMap::new();
        for name in anims.names() {
            let clip = controller.load_anim_clip(anims, name)?;
            clips.insert(name.to_ascii_lowercase(), clip);
        }
        let resolver = Resolver {
            clips,
            parameters: self.parameters.iter().map(|p| p.name.clone()).collect(),
        };

        for (index, def) in self.layers.iter().enumerate() {
            let layer_index = if index == 0 {
                0
            } else {
                controller.create_anim_layer(def.name.clone())?
            };
            let layer = controller
                .anim_layer_mut(layer_index)
                .ok_or_else(|| AnimError::not_found("layer", def.name.clone()))?;
            def.build_into(layer, &resolver)?;
            if let Some(mask) = &def.mask {
                controller.set_layer_mask(layer_index, mask)?;
            }
        }
        Ok(controller)
    }
}

impl LayerDef {
    fn build_into(&self, layer: &mut AnimLayer, resolver: &Resolver) -> Result<()> {
        layer.set_name(self.name.clone());
        layer.set_blending(self.blending);
        layer.set_weight(self.weight);

        for def in &self.states {
            let key = layer.create_state(def.name.clone())?;
            match &def.motion {
                Some(MotionDef::Clip(name)) => {
                    layer.set_state_anim_clip(key, resolver.clip(name)?)?;
                }
                Some(MotionDef::BlendTree(tree)) => {
                    let tree = tree.build_into(layer, resolver)?;
                    layer.set_state_blend_tree(key, tree)?;
                }
                None => {}
            }
            let state = layer.state_mut(key)?;
            state.set_editor_position(def.editor_position);
            for event in &def.events {
                state.add_event(event.time, event.name.clone());
            }
        }

        let default_state = match &self.default_state {
            Some(name) => Some(
                layer
                    .find_state(name)
                    .ok_or_else(|| AnimError::not_found("state", name.clone()))?,
            ),
            None => layer.states().next().map(|(key, _)| key),
        };
        if let Some(key) = default_state {
            layer.set_default_state(key)?;
        }

        for def in &self.transitions {
            let src = layer
                .find_state(&def.from)
                .ok_or_else(|| AnimError::not_found("state", def.from.clone()))?;
            let dst = layer
                .find_state(&def.to)
                .ok_or_else(|| AnimError::not_found("state", def.to.clone()))?;
            let conditions = def
                .conditions
                .iter()
                .map(|condition| {
                    Ok(Condition::new(
                        resolver.parameter(&condition.parameter)?,
                        condition.compare,
                        condition.value,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;

            let transition = layer.create_transition(src, dst)?;
            transition.has_exit_time = def.exit_time.is_some();
            transition.exit_time = def.exit_time.unwrap_or(0.0);
            transition.start_time = def.start_time;
            transition.duration = def.duration;
            transition.fixed_duration = def.fixed_duration;
            transition.is_atomic = def.atomic;
            transition.conditions = conditions;
        }
        Ok(())
    }
}

impl BlendTreeDef {
    fn build_into(&self, layer: &mut AnimLayer, resolver: &Resolver) -> Result<BlendTreeKey> {
        let dimensions = self.blend_type.dimensions();
        if self.parameters.len() > dimensions {
            return Err(AnimError::InvalidDefinition(format!(
                "blend tree '{}' binds {} parameters, {:?} has {} axes",
                self.name,
                self.parameters.len(),
                self.blend_type,
                dimensions
            )));
        }

        let key = layer.create_blend_tree(self.name.clone(), self.blend_type);
        for (axis, name) in self.parameters.iter().enumerate() {
            let index = resolver.parameter(name)?;
            layer.blend_tree_mut(key)?.set_parameter_index(axis, Some(index));
        }

        for child in &self.children {
            match &child.motion {
                MotionDef::Clip(name) => {
                    layer.add_child_clip(key, resolver.clip(name)?, child.position)?;
                }
                MotionDef::BlendTree(inner) => {
                    let inner = inner.build_into(layer, resolver)?;
                    layer.add_child_blend_tree(key, inner, child.position)?;
                }
            }
        }
        Ok(key)
    }
}
