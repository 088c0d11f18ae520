//! Shared handle to keyframe data with cached locomotion info

use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::anim::{AnimSource, FrameInterpolation};
use crate::types::{Aabb, JointPose};

/// A playable clip
///
/// Wraps a shared [`AnimSource`] and caches its average root velocity,
/// which AI and locomotion code use to match movement speed.
#[derive(Debug, Clone, Default)]
pub struct AnimClip {
    anim: Option<Arc<dyn AnimSource>>,
    average_velocity: Vec3,
}

impl AnimClip {
    pub fn new(anim: Arc<dyn AnimSource>) -> Self {
        let mut clip = Self::default();
        clip.set_anim(anim);
        clip
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_anim(&mut self, anim: Arc<dyn AnimSource>) {
        self.anim = Some(anim);
        self.compute_average_velocity();
    }

    pub fn anim(&self) -> Option<&Arc<dyn AnimSource>> {
        self.anim.as_ref()
    }

    pub fn name(&self) -> &str {
        self.anim.as_ref().map_or("", |anim| anim.name())
    }

    /// Drop the keyframe data
    pub fn purge(&mut self) {
        self.anim = None;
        self.average_velocity = Vec3::ZERO;
    }

    /// Length in milliseconds, 0 without keyframe data
    pub fn length(&self) -> i32 {
        self.anim.as_ref().map_or(0, |anim| anim.length())
    }

    /// Root units per second
    pub fn average_velocity(&self) -> Vec3 {
        self.average_velocity
    }

    fn compute_average_velocity(&mut self) {
        let length = self.length();
        self.average_velocity = match &self.anim {
            Some(anim) if length > 0 => anim.total_movement_delta() * (1000.0 / length as f32),
            _ => Vec3::ZERO,
        };
    }

    pub fn time_to_frame_interpolation(&self, time: i32) -> FrameInterpolation {
        self.anim.as_ref().map_or(FrameInterpolation::hold(0, 0), |anim| {
            anim.time_to_frame_interpolation(time)
        })
    }

    pub fn single_frame(&self, frame: usize, indices: &[usize], out: &mut [JointPose]) {
        if let Some(anim) = &self.anim {
            anim.single_frame(frame, indices, out);
        }
    }

    pub fn interpolated_frame(&self, interp: &FrameInterpolation, indices: &[usize], out: &mut [JointPose]) {
        if let Some(anim) = &self.anim {
            anim.interpolated_frame(interp, indices, out);
        }
    }

    /// Sample the pose at `time` for the listed joints
    pub fn frame(&self, time: i32, indices: &[usize], out: &mut [JointPose]) {
        let interp = self.time_to_frame_interpolation(time);
        self.interpolated_frame(&interp, indices, out);
    }

    pub fn translation(&self, time: i32) -> Vec3 {
        self.anim.as_ref().map_or(Vec3::ZERO, |anim| anim.translation(time))
    }

    pub fn rotation(&self, time: i32) -> Quat {
        self.anim.as_ref().map_or(Quat::IDENTITY, |anim| anim.rotation(time))
    }

    pub fn aabb(&self, time: i32, frame_aabbs: &[Aabb]) -> Aabb {
        self.anim
            .as_ref()
            .map_or_else(Aabb::cleared, |anim| anim.aabb(time, frame_aabbs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::KeyframeAnim;

    fn walk() -> Arc<dyn AnimSource> {
        let frames = vec![
            JointPose::IDENTITY,
            JointPose::from_translation(Vec3::new(3.0, 0.0, 0.0)),
        ];
        Arc::new(KeyframeAnim::new("walk", 1, vec![0, 2000], frames).unwrap())
    }

    #[test]
    fn test_set_anim_keeps_identity() {
        let anim = walk();
        let clip = AnimClip::new(Arc::clone(&anim));
        assert!(Arc::ptr_eq(clip.anim().unwrap(), &anim));
        assert_eq!(clip.length(), anim.length());
        assert_eq!(clip.name(), "walk");
    }

    #[test]
    fn test_average_velocity() {
        let clip = AnimClip::new(walk());
        assert!((clip.average_velocity().x - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_zero_length_clip_has_zero_velocity() {
        let still = KeyframeAnim::still("idle", &[JointPose::from_translation(Vec3::X)]);
        let clip = AnimClip::new(Arc::new(still));
        assert_eq!(clip.length(), 0);
        assert_eq!(clip.average_velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_purge_resets() {
        let mut clip = AnimClip::new(walk());
        clip.purge();
        assert!(clip.anim().is_none());
        assert_eq!(clip.length(), 0);
        assert_eq!(clip.average_velocity(), Vec3::ZERO);
        assert_eq!(clip.rotation(10), Quat::IDENTITY);
    }
}
