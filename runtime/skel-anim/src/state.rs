//! A schedulable state of the transition graph

use glam::{Quat, Vec2, Vec3};

use crate::layer::NodeRef;
use crate::types::{Aabb, JointPose};
use crate::view::LayerView;

/// Named trigger at a normalized time of a state
#[derive(Debug, Clone, PartialEq)]
pub struct AnimEvent {
    /// Normalized time in `[0, 1]`
    pub time: f32,
    /// Script function called when playback crosses `time`
    pub name: String,
}

/// Plays a single clip or a blend tree and carries authored time events
#[derive(Debug, Clone)]
pub struct AnimState {
    name: String,
    motion: Option<NodeRef>,
    events: Vec<AnimEvent>,
    editor_position: Vec2,
}

impl AnimState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            motion: None,
            events: Vec::new(),
            editor_position: Vec2::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn motion(&self) -> Option<NodeRef> {
        self.motion
    }

    /// Returns the replaced motion so the owning layer can release it
    pub(crate) fn set_motion(&mut self, motion: Option<NodeRef>) -> Option<NodeRef> {
        std::mem::replace(&mut self.motion, motion)
    }

    pub fn events(&self) -> &[AnimEvent] {
        &self.events
    }

    pub fn add_event(&mut self, time: f32, name: impl Into<String>) {
        self.events.push(AnimEvent {
            time: time.clamp(0.0, 1.0),
            name: name.into(),
        });
    }

    pub fn remove_event(&mut self, index: usize) -> Option<AnimEvent> {
        (index < self.events.len()).then(|| self.events.remove(index))
    }

    pub fn editor_position(&self) -> Vec2 {
        self.editor_position
    }

    pub fn set_editor_position(&mut self, position: Vec2) {
        self.editor_position = position;
    }

    /// Playback length in milliseconds
    pub fn duration(&self, view: &LayerView) -> f32 {
        self.motion.map_or(0.0, |motion| view.node_duration(motion))
    }

    pub fn frame(&self, view: &LayerView, normalized_time: f32, out: &mut [JointPose]) {
        if let Some(motion) = self.motion {
            view.node_frame(motion, normalized_time, out);
        }
    }

    pub fn translation(&self, view: &LayerView, normalized_time: f32) -> Vec3 {
        self.motion
            .map_or(Vec3::ZERO, |motion| view.node_translation(motion, normalized_time))
    }

    pub fn rotation(&self, view: &LayerView, normalized_time: f32) -> Quat {
        self.motion
            .map_or(Quat::IDENTITY, |motion| view.node_rotation(motion, normalized_time))
    }

    pub fn aabb(&self, view: &LayerView, normalized_time: f32) -> Aabb {
        self.motion
            .map_or_else(Aabb::cleared, |motion| view.node_aabb(motion, normalized_time))
    }
}
