//! Per-entity playback
//!
//! An [`Animator`] binds a shared [`AnimController`] and owns everything
//! that changes while playing it: live parameter values, a fixed grid of
//! `MAX_LAYERS x MAX_BLENDERS_PER_LAYER` cross-fade slots and the output
//! buffers.
//!
//! A tick is one [`Animator::update_frame`] followed by any of the read
//! calls ([`Animator::compute_frame`], [`Animator::translation`], ...).
//! Slot 0 of a layer is the current state. Entering a new state while slot
//! 0 is still audible pushes the stack down by one; whatever falls off the
//! end is dropped.
//!
//! Misconfiguration never fails a tick. Missing controllers, out of range
//! layers and unknown state names log a warning and leave the previous
//! output in place.

use std::{fmt, sync::Arc};

use custom_debug::Debug;
use glam::{Mat3, Mat4, Quat, Vec3};
use skel_utils::debug;

use crate::blender::AnimStateBlender;
use crate::cache::ResourceCache;
use crate::controller::{AnimController, MAX_LAYERS};
use crate::event::EventTarget;
use crate::layer::{AnimLayer, AnimTransition, Blending, StateKey};
use crate::pose::{
    additive_blend_joints, blend_joints, convert_joint_poses_to_mats, copy_joints, transform_joints,
};
use crate::types::{Aabb, JointPose, Lerp};
use crate::view::LayerView;

/// Cross-fade history depth of one layer
pub const MAX_BLENDERS_PER_LAYER: usize = 4;

type SlotStack = [AnimStateBlender; MAX_BLENDERS_PER_LAYER];

#[derive(Debug, Default)]
pub struct Animator {
    #[debug(with = controller_name_fmt)]
    controller: Option<Arc<AnimController>>,
    #[debug(with = debug::trimmed_collection_fmt)]
    parameters: Vec<f32>,
    #[debug(with = debug::trimmed_collection_fmt)]
    blenders: [SlotStack; MAX_LAYERS],
    #[debug(with = debug::trimmed_collection_fmt)]
    all_joints: Vec<usize>,
    #[debug(with = debug::trimmed_collection_fmt)]
    joint_mats: Vec<Mat4>,
    frame_aabb: Aabb,
    mesh_aabb: Aabb,
}

fn controller_name_fmt(controller: &Option<Arc<AnimController>>, f: &mut fmt::Formatter) -> fmt::Result {
    match controller {
        Some(controller) => write!(f, "Some({:?})", controller.name()),
        None => write!(f, "None"),
    }
}

/// Joints a layer writes. A layer without a mask writes the whole skeleton.
fn resolved_mask<'a>(layer: &'a AnimLayer, all_joints: &'a [usize]) -> &'a [usize] {
    layer.mask_joints().unwrap_or(all_joints)
}

fn state_name<'a>(layer: &'a AnimLayer, key: StateKey) -> &'a str {
    layer.state(key).map_or("<stale>", |state| state.name())
}

/// Shift every slot down by one, dropping the last, and fade out the old slot 0
fn push_slots(slots: &mut SlotStack, current_time: i32, blend_duration: i32) {
    for index in (1..MAX_BLENDERS_PER_LAYER).rev() {
        slots[index] = slots[index - 1];
    }
    slots[0].clear();
    slots[1].blend_out(current_time, blend_duration);
}

/// Start `state` in `slot` and stamp its duration
fn enter_state(
    slot: &mut AnimStateBlender,
    view: &LayerView,
    state: StateKey,
    current_time: i32,
    start_offset: f32,
    blend_duration: i32,
    is_atomic: bool,
) {
    slot.blend_in(state, current_time, start_offset, blend_duration, is_atomic);
    let duration = view
        .layer()
        .state(state)
        .map_or(0.0, |state| state.duration(view));
    slot.set_duration(current_time, duration as i32);
    slot.set_exit_time(0.0);
}

/// First outgoing edge of slot 0's state that may fire now, with its blend duration in ms
///
/// Arms the slot's exit time on the first edge that has one.
fn next_transition<'l>(
    view: &LayerView<'l>,
    slot: &mut AnimStateBlender,
    parameters: &[f32],
    current_time: i32,
) -> Option<(&'l AnimTransition, i32)> {
    let current = slot.state()?;
    if slot.is_atomic() && slot.is_in_blending(current_time) {
        return None;
    }

    let layer = view.layer();
    let anim_time = slot.normalized_time(current_time);
    for transition in layer.transitions_from(current) {
        if !transition.conditions_hold(parameters) {
            continue;
        }
        if transition.has_exit_time {
            if slot.exit_time() == 0.0 {
                slot.set_exit_time((anim_time - transition.exit_time).ceil() + transition.exit_time);
            }
            if anim_time < slot.exit_time() {
                continue;
            }
        }
        let source_duration = layer
            .state(current)
            .map_or(0.0, |state| state.duration(view));
        return Some((transition, transition.blend_duration(source_duration)));
    }
    None
}

/// Fold every audible slot's pose into `out`, returning the summed weight
fn blend_slots(
    slots: &SlotStack,
    view: &LayerView,
    current_time: i32,
    out: &mut [JointPose],
    scratch: &mut [JointPose],
) -> f32 {
    let mut weight = 0.0;
    for slot in slots {
        if slot.blend_frame(view, current_time, out, &mut weight, scratch) && weight >= 1.0 {
            break;
        }
    }
    weight
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    // Controller binding

    /// Bind the controller registered as `name`
    pub fn set_anim_controller(&mut self, controllers: &ResourceCache<AnimController>, name: &str) -> bool {
        match controllers.get(name) {
            Some(controller) => self.attach_anim_controller(controller),
            None => {
                log::warn!("Animation controller '{}' not found", name);
                self.clear_anim_controller();
                false
            }
        }
    }

    /// Bind `controller`. Controllers without a skeleton are rejected.
    pub fn attach_anim_controller(&mut self, controller: Arc<AnimController>) -> bool {
        self.clear_anim_controller();

        let Some(skeleton) = controller.skeleton() else {
            log::warn!("Animation controller '{}' has no skeleton", controller.name());
            return false;
        };
        let num_joints = skeleton.num_joints();

        self.parameters = controller
            .parameters()
            .iter()
            .map(|parm| parm.default_value)
            .collect();
        self.joint_mats = controller.build_bind_pose_mats();
        self.all_joints = (0..num_joints).collect();
        self.controller = Some(controller);
        true
    }

    pub fn clear_anim_controller(&mut self) {
        self.controller = None;
        self.parameters.clear();
        self.blenders = Default::default();
        self.all_joints.clear();
        self.joint_mats.clear();
        self.frame_aabb = Aabb::cleared();
    }

    pub fn anim_controller(&self) -> Option<&Arc<AnimController>> {
        self.controller.as_ref()
    }

    // Parameters

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.controller.as_ref()?.find_parameter_index(name)
    }

    pub fn parameter_value(&self, index: usize) -> f32 {
        self.parameters.get(index).copied().unwrap_or(0.0)
    }

    pub fn parameters(&self) -> &[f32] {
        &self.parameters
    }

    pub fn set_parameter_value(&mut self, index: usize, value: f32) {
        match self.parameters.get_mut(index) {
            Some(slot) => *slot = value,
            None => log::warn!("Parameter index {} out of range", index),
        }
    }

    pub fn set_parameter_value_by_name(&mut self, name: &str, value: f32) -> bool {
        match self.parameter_index(name) {
            Some(index) => {
                self.set_parameter_value(index, value);
                true
            }
            None => {
                log::warn!("Unknown parameter '{}'", name);
                false
            }
        }
    }

    // Layers and joints

    pub fn num_anim_layers(&self) -> usize {
        self.controller
            .as_ref()
            .map_or(0, |controller| controller.num_anim_layers().min(MAX_LAYERS))
    }

    pub fn anim_layer(&self, index: usize) -> Option<&AnimLayer> {
        self.controller.as_ref()?.anim_layer(index)
    }

    pub fn num_joints(&self) -> usize {
        self.all_joints.len()
    }

    pub fn joint_name(&self, index: usize) -> Option<&str> {
        self.controller.as_ref()?.skeleton()?.joint_name(index)
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.controller.as_ref()?.skeleton()?.joint_index(name)
    }

    /// Cross-fade slot `slot` of layer `layer`
    pub fn blender(&self, layer: usize, slot: usize) -> Option<&AnimStateBlender> {
        self.blenders.get(layer)?.get(slot)
    }

    fn view<'a>(&'a self, layer: &'a AnimLayer) -> LayerView<'a> {
        LayerView::new(
            layer,
            &self.parameters,
            resolved_mask(layer, &self.all_joints),
            self.mesh_aabb,
        )
    }

    // State machine

    /// Empty every slot and start each layer's default state at `current_time`
    pub fn reset_state(&mut self, current_time: i32) {
        self.blenders = Default::default();
        let Some(controller) = self.controller.clone() else {
            return;
        };

        for (index, layer) in controller.anim_layers().iter().enumerate().take(MAX_LAYERS) {
            let Some(default_state) = layer.default_state() else {
                continue;
            };
            let view = LayerView::new(
                layer,
                &self.parameters,
                resolved_mask(layer, &self.all_joints),
                self.mesh_aabb,
            );
            enter_state(&mut self.blenders[index][0], &view, default_state, current_time, 0.0, 0, false);
        }
    }

    pub fn current_anim_state(&self, layer: usize) -> Option<StateKey> {
        self.blenders.get(layer)?[0].state()
    }

    pub fn current_anim_state_name(&self, layer: usize) -> Option<&str> {
        let key = self.current_anim_state(layer)?;
        let state = self.anim_layer(layer)?.state(key).ok()?;
        Some(state.name())
    }

    /// Cross-fade layer `layer` into the state called `state_name`
    ///
    /// `start_offset` is the normalized time the state starts at and
    /// `blend_duration` the fade length in ms.
    pub fn transit_state(
        &mut self,
        layer: usize,
        state_name: &str,
        current_time: i32,
        start_offset: f32,
        blend_duration: i32,
        is_atomic: bool,
    ) {
        let Some(controller) = self.controller.clone() else {
            log::warn!("No animation controller to transit to '{}'", state_name);
            return;
        };
        let Some(anim_layer) = controller.anim_layer(layer).filter(|_| layer < MAX_LAYERS) else {
            log::warn!("Animation layer {} out of range", layer);
            return;
        };
        let Some(state) = anim_layer.find_state(state_name) else {
            log::warn!("Layer '{}' has no state '{}'", anim_layer.name(), state_name);
            return;
        };
        self.enter_layer_state(anim_layer, layer, state, current_time, start_offset, blend_duration, is_atomic);
    }

    #[allow(clippy::too_many_arguments)]
    fn enter_layer_state(
        &mut self,
        layer: &AnimLayer,
        layer_index: usize,
        state: StateKey,
        current_time: i32,
        start_offset: f32,
        blend_duration: i32,
        is_atomic: bool,
    ) {
        let slots = &mut self.blenders[layer_index];
        if current_time > slots[0].start_time() && slots[0].blend_weight(current_time) > 0.0 {
            push_slots(slots, current_time, blend_duration);
        }
        let view = LayerView::new(
            layer,
            &self.parameters,
            resolved_mask(layer, &self.all_joints),
            self.mesh_aabb,
        );
        enter_state(&mut slots[0], &view, state, current_time, start_offset, blend_duration, is_atomic);
    }

    /// Shift the slot stack of `layer` down by one and fade out the old slot 0
    pub fn push_state_blenders(&mut self, layer: usize, current_time: i32, blend_duration: i32) {
        match self.blenders.get_mut(layer) {
            Some(slots) => push_slots(slots, current_time, blend_duration),
            None => log::warn!("Animation layer {} out of range", layer),
        }
    }

    /// Advance every layer from `previous_time` to `current_time`
    ///
    /// Stamps durations of audible slots, fires crossed time events on
    /// `target` and takes at most one transition per layer.
    pub fn update_frame(&mut self, target: &mut dyn EventTarget, previous_time: i32, current_time: i32) {
        let Some(controller) = self.controller.clone() else {
            return;
        };

        for (layer_index, layer) in controller.anim_layers().iter().enumerate().take(MAX_LAYERS) {
            let view = LayerView::new(
                layer,
                &self.parameters,
                resolved_mask(layer, &self.all_joints),
                self.mesh_aabb,
            );
            let slots = &mut self.blenders[layer_index];

            for slot in slots.iter_mut() {
                let Some(key) = slot.state() else {
                    continue;
                };
                if slot.blend_weight(current_time) == 0.0 {
                    continue;
                }
                let duration = layer.state(key).map_or(0.0, |state| state.duration(&view));
                slot.set_duration(current_time, duration as i32);
                slot.call_events(&view, target, previous_time, current_time);
            }

            let Some((transition, blend_duration)) =
                next_transition(&view, &mut slots[0], &self.parameters, current_time)
            else {
                continue;
            };
            log::trace!(
                "Layer '{}': {} -> {} at {} ms, blend {} ms",
                layer.name(),
                state_name(layer, transition.src_state),
                state_name(layer, transition.dst_state),
                current_time,
                blend_duration
            );
            let (dst_state, start_time, is_atomic) =
                (transition.dst_state, transition.start_time, transition.is_atomic);
            self.enter_layer_state(
                layer,
                layer_index,
                dst_state,
                current_time,
                start_time,
                blend_duration,
                is_atomic,
            );
        }
    }

    // Outputs

    /// Blend all layers at `current_time` into model space joint matrices
    ///
    /// When no slot of any layer is audible the previous matrices are kept.
    pub fn compute_frame(&mut self, current_time: i32) {
        let Some(controller) = self.controller.clone() else {
            return;
        };
        let Some(skeleton) = controller.skeleton() else {
            return;
        };
        let bind_poses = skeleton.bind_poses();
        let mut frame = bind_poses.to_vec();
        let mut layer_frame = bind_poses.to_vec();
        let mut scratch = bind_poses.to_vec();
        let mut has_anim = false;

        for (layer_index, layer) in controller.anim_layers().iter().enumerate().take(MAX_LAYERS) {
            let view = self.view(layer);
            let slots = &self.blenders[layer_index];

            if layer_index == 0 {
                has_anim |= blend_slots(slots, &view, current_time, &mut frame, &mut scratch) > 0.0;
                continue;
            }

            if view.mask_joints().is_empty() {
                continue;
            }
            copy_joints(&mut layer_frame, bind_poses);
            let weight = blend_slots(slots, &view, current_time, &mut layer_frame, &mut scratch);
            if weight <= 0.0 {
                continue;
            }
            // Slot weights may sum past 1, a layer never exceeds its own weight
            let fraction = weight.min(1.0) * layer.weight();
            match layer.blending() {
                Blending::Override => blend_joints(&mut frame, &layer_frame, fraction, view.mask_joints()),
                Blending::Additive => {
                    additive_blend_joints(&mut frame, &layer_frame, fraction, view.mask_joints());
                }
            }
            has_anim = true;
        }

        if !has_anim {
            return;
        }

        let num_joints = frame.len();
        self.joint_mats.resize(num_joints, Mat4::IDENTITY);
        convert_joint_poses_to_mats(&mut self.joint_mats, &frame);
        if let Some(root) = self.joint_mats.first_mut() {
            root.w_axis += controller.root_offset().extend(0.0);
        }
        transform_joints(&mut self.joint_mats, skeleton.joint_parents(), 1, num_joints);
    }

    /// Model space joint matrices of the last computed frame
    pub fn frame(&self) -> &[Mat4] {
        &self.joint_mats
    }

    /// Blend a root motion quantity over the base layer and every layer that
    /// writes the root joint. `None` when no slot contributed.
    fn fold_root_motion<T: Lerp>(
        &self,
        identity: &T,
        mut fold: impl FnMut(&AnimStateBlender, &LayerView<'_>, &mut T, &mut f32) -> bool,
    ) -> Option<T> {
        let controller = self.controller.as_ref()?;
        let mut blended: Option<T> = None;

        for (layer_index, layer) in controller.anim_layers().iter().enumerate().take(MAX_LAYERS) {
            if layer_index > 0 && !layer.affects_root() {
                continue;
            }
            let view = self.view(layer);
            let mut value = identity.clone();
            let mut weight = 0.0;
            for slot in &self.blenders[layer_index] {
                fold(slot, &view, &mut value, &mut weight);
            }
            if weight <= 0.0 {
                continue;
            }

            blended = Some(if layer_index == 0 {
                value
            } else {
                let below = blended.unwrap_or_else(|| identity.clone());
                // Same capped layer fraction as compute_frame
                below.lerp(&value, weight.min(1.0) * layer.weight())
            });
        }
        blended
    }

    /// Root translation at `current_time`, root offset included
    pub fn translation(&self, current_time: i32) -> Vec3 {
        let Some(controller) = &self.controller else {
            return Vec3::ZERO;
        };
        let translation = self
            .fold_root_motion(&Vec3::ZERO, |slot, view, blended, weight| {
                slot.blend_translation(view, current_time, blended, weight)
            })
            .unwrap_or(Vec3::ZERO);
        translation + controller.root_offset()
    }

    /// Root displacement between two times
    pub fn translation_delta(&self, from_time: i32, to_time: i32) -> Vec3 {
        if from_time == to_time {
            return Vec3::ZERO;
        }
        self.fold_root_motion(&Vec3::ZERO, |slot, view, blended, weight| {
            slot.blend_translation_delta(view, from_time, to_time, blended, weight)
        })
        .unwrap_or(Vec3::ZERO)
    }

    /// Root rotation between two times. `None` stands for identity.
    pub fn rotation_delta(&self, from_time: i32, to_time: i32) -> Option<Mat3> {
        if from_time == to_time {
            return None;
        }
        self.fold_root_motion(&Quat::IDENTITY, |slot, view, blended, weight| {
            slot.blend_rotation_delta(view, from_time, to_time, blended, weight)
        })
        .map(Mat3::from_quat)
    }

    /// Union the bounds of every audible slot. Keeps the previous box when none is.
    pub fn compute_aabb(&mut self, current_time: i32) {
        let Some(controller) = &self.controller else {
            return;
        };

        let mut aabb = Aabb::cleared();
        let mut contributed = false;
        for (layer_index, layer) in controller.anim_layers().iter().enumerate().take(MAX_LAYERS) {
            let view = self.view(layer);
            for slot in &self.blenders[layer_index] {
                contributed |= slot.add_aabb(&view, current_time, &mut aabb);
            }
        }

        if contributed {
            aabb.translate(controller.root_offset());
            self.frame_aabb = aabb;
        }
    }

    pub fn aabb(&self) -> Aabb {
        self.frame_aabb
    }

    /// Set the mesh bounds clips report and reset the frame bounds to them
    pub fn compute_anim_aabbs(&mut self, mesh_aabb: Aabb) {
        self.mesh_aabb = mesh_aabb;
        self.frame_aabb = mesh_aabb;
    }

    pub fn mesh_aabb(&self) -> Aabb {
        self.mesh_aabb
    }
}
