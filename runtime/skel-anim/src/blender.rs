//! Cross-fade slot
//!
//! An [`AnimStateBlender`] plays one state with two independent clocks:
//!
//! - the playback clock maps frame time (ms) to normalized state time,
//!   `(t - start_time) * inv_duration + time_offset`
//! - the cross-fade clock ramps the slot weight linearly from
//!   `blend_start_weight` to `blend_end_weight` over
//!   `[blend_start_time, blend_start_time + blend_duration]`
//!
//! The `blend_*` methods fold this slot's output into a running weighted
//! average shared by all slots of a layer.

use glam::{Quat, Vec3};

use crate::event::EventTarget;
use crate::layer::StateKey;
use crate::pose::blend_joints;
use crate::state::AnimState;
use crate::types::{Aabb, JointPose, Lerp, fold_fraction};
use crate::view::LayerView;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimStateBlender {
    state: Option<StateKey>,
    is_atomic: bool,

    start_time: i32,
    time_offset: f32,
    inv_duration: f32,
    exit_time: f32,

    blend_start_time: i32,
    blend_duration: i32,
    blend_start_weight: f32,
    blend_end_weight: f32,
}

impl AnimStateBlender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> Option<StateKey> {
        self.state
    }

    pub fn is_atomic(&self) -> bool {
        self.is_atomic
    }

    pub fn start_time(&self) -> i32 {
        self.start_time
    }

    pub fn blend_duration(&self) -> i32 {
        self.blend_duration
    }

    /// Armed exit time, 0 while unarmed
    pub fn exit_time(&self) -> f32 {
        self.exit_time
    }

    pub fn set_exit_time(&mut self, exit_time: f32) {
        self.exit_time = exit_time;
    }

    pub fn normalized_time(&self, current_time: i32) -> f32 {
        (current_time - self.start_time) as f32 * self.inv_duration + self.time_offset
    }

    /// Change the playback length without moving the current normalized time
    ///
    /// A non-positive duration freezes the playback clock.
    pub fn set_duration(&mut self, current_time: i32, duration: i32) {
        let inv_duration = if duration > 0 { 1.0 / duration as f32 } else { 0.0 };
        if inv_duration == self.inv_duration {
            return;
        }

        let elapsed = (current_time - self.start_time) as f32;
        let time = self.normalized_time(current_time);
        self.time_offset = time - elapsed * inv_duration;
        self.inv_duration = inv_duration;
    }

    pub fn blend_weight(&self, current_time: i32) -> f32 {
        let delta = current_time - self.blend_start_time;
        if delta <= 0 {
            self.blend_start_weight
        } else if delta >= self.blend_duration {
            self.blend_end_weight
        } else {
            let fraction = (delta as f32 / self.blend_duration as f32).clamp(0.0, 1.0);
            self.blend_start_weight + (self.blend_end_weight - self.blend_start_weight) * fraction
        }
    }

    /// Ramp from the current weight to `weight` over `duration` ms
    pub fn set_blend_weight(&mut self, current_time: i32, weight: f32, duration: i32) {
        self.blend_start_weight = self.blend_weight(current_time);
        self.blend_end_weight = weight;
        self.blend_start_time = current_time - 1;
        self.blend_duration = duration;
    }

    /// Whether the cross-fade ramp is still running
    pub fn is_in_blending(&self, current_time: i32) -> bool {
        self.state.is_some()
            && self.blend_start_weight != self.blend_end_weight
            && current_time <= self.blend_start_time + self.blend_duration
    }

    /// Start playing `state` from `start_offset` and fade it in from 0 to 1
    ///
    /// The ramp starts one millisecond in the past so a zero duration is
    /// fully weighted on the same tick.
    pub fn blend_in(
        &mut self,
        state: StateKey,
        current_time: i32,
        start_offset: f32,
        duration: i32,
        is_atomic: bool,
    ) {
        *self = Self {
            state: Some(state),
            is_atomic,
            start_time: current_time,
            time_offset: start_offset,
            blend_start_time: current_time - 1,
            blend_duration: duration,
            blend_start_weight: 0.0,
            blend_end_weight: 1.0,
            ..Self::default()
        };
    }

    /// Fade out over `duration` ms. A zero duration empties the slot at once.
    pub fn blend_out(&mut self, current_time: i32, duration: i32) {
        if duration == 0 {
            self.clear();
        } else {
            self.set_blend_weight(current_time, 0.0, duration);
        }
    }

    fn active<'v>(&self, view: &LayerView<'v>, current_time: i32) -> Option<(&'v AnimState, f32)> {
        let key = self.state?;
        let weight = self.blend_weight(current_time);
        if weight == 0.0 {
            return None;
        }
        match view.layer().state(key) {
            Ok(state) => Some((state, weight)),
            Err(err) => {
                log::debug!("Layer '{}': {}", view.layer().name(), err);
                None
            }
        }
    }

    /// Fire events whose time was crossed between `from_time` and `to_time`
    ///
    /// Both times are wrapped into `[0, 1)`. When the interval wraps past the
    /// end of the loop, events at the tail and at the head both fire.
    pub fn call_events(&self, view: &LayerView, target: &mut dyn EventTarget, from_time: i32, to_time: i32) {
        let components = target.num_script_components();
        if components == 0 {
            return;
        }
        let Some(key) = self.state else {
            return;
        };
        let Ok(state) = view.layer().state(key) else {
            return;
        };

        let mut t1 = self.normalized_time(from_time);
        let mut t2 = self.normalized_time(to_time);
        t1 -= t1.floor();
        t2 -= t2.floor();

        for event in state.events() {
            let crossed = if t1 <= t2 {
                event.time >= t1 && event.time <= t2
            } else {
                event.time >= t1 || event.time <= t2
            };
            if !crossed {
                continue;
            }
            for component in 0..components {
                target.call_script_func(component, &event.name);
            }
        }
    }

    /// Fold this slot's pose into `blended`
    ///
    /// `scratch` must be as long as `blended`; it is only written when this
    /// slot is not the first contributor.
    pub fn blend_frame(
        &self,
        view: &LayerView,
        current_time: i32,
        blended: &mut [JointPose],
        blended_weight: &mut f32,
        scratch: &mut [JointPose],
    ) -> bool {
        let Some((state, weight)) = self.active(view, current_time) else {
            return false;
        };
        let time = self.normalized_time(current_time);

        match fold_fraction(blended_weight, weight) {
            None => state.frame(view, time, blended),
            Some(fraction) => {
                state.frame(view, time, scratch);
                blend_joints(blended, scratch, fraction, view.mask_joints());
            }
        }
        true
    }

    pub fn blend_translation(
        &self,
        view: &LayerView,
        current_time: i32,
        blended: &mut Vec3,
        blended_weight: &mut f32,
    ) -> bool {
        let Some((state, weight)) = self.active(view, current_time) else {
            return false;
        };
        let translation = state.translation(view, self.normalized_time(current_time));
        fold_value(blended, blended_weight, weight, translation);
        true
    }

    pub fn blend_translation_delta(
        &self,
        view: &LayerView,
        from_time: i32,
        to_time: i32,
        blended: &mut Vec3,
        blended_weight: &mut f32,
    ) -> bool {
        let Some((state, weight)) = self.active(view, to_time) else {
            return false;
        };
        let t1 = state.translation(view, self.normalized_time(from_time));
        let t2 = state.translation(view, self.normalized_time(to_time));
        fold_value(blended, blended_weight, weight, t2 - t1);
        true
    }

    pub fn blend_rotation_delta(
        &self,
        view: &LayerView,
        from_time: i32,
        to_time: i32,
        blended: &mut Quat,
        blended_weight: &mut f32,
    ) -> bool {
        let Some((state, weight)) = self.active(view, to_time) else {
            return false;
        };
        let q1 = state.rotation(view, self.normalized_time(from_time));
        let q2 = state.rotation(view, self.normalized_time(to_time));
        fold_value(blended, blended_weight, weight, q2 * q1.inverse());
        true
    }

    /// Grow `aabb` by this slot's bounds. Bounds are unioned, not blended.
    pub fn add_aabb(&self, view: &LayerView, current_time: i32, aabb: &mut Aabb) -> bool {
        let Some((state, _)) = self.active(view, current_time) else {
            return false;
        };
        aabb.add_aabb(&state.aabb(view, self.normalized_time(current_time)));
        true
    }
}

fn fold_value<T: Lerp>(blended: &mut T, blended_weight: &mut f32, weight: f32, value: T) {
    match fold_fraction(blended_weight, weight) {
        None => *blended = value,
        Some(fraction) => *blended = blended.lerp(&value, fraction),
    }
}
