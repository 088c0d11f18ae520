//! Keyframe resources
//!
//! [`AnimSource`] is everything the blending code needs from decoded
//! keyframe data. [`KeyframeAnim`] is a plain in-memory implementation that
//! stores a full joint pose for every frame.

use std::fmt;

use custom_debug::Debug;
use glam::{Quat, Vec3};
use skel_utils::debug;

use crate::error::{AnimError, Result};
use crate::types::{Aabb, JointPose};

/// Two neighbouring frames and the blend factor between them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInterpolation {
    pub frame1: usize,
    pub frame2: usize,
    /// Completed loops since time zero
    pub cycle_count: u32,
    /// Weight of `frame2`
    pub backlerp: f32,
    /// Weight of `frame1`
    pub frontlerp: f32,
}

impl FrameInterpolation {
    /// Holding `frame` with full weight
    pub const fn hold(frame: usize, cycle_count: u32) -> Self {
        Self {
            frame1: frame,
            frame2: frame,
            cycle_count,
            backlerp: 0.0,
            frontlerp: 1.0,
        }
    }
}

/// Read-only keyframe data shared between clips
///
/// All times are in milliseconds.
pub trait AnimSource: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn num_joints(&self) -> usize;

    fn num_frames(&self) -> usize;

    /// Playback length, which is the time of the last frame
    fn length(&self) -> i32;

    /// Number of loops after which the last frame is held, 0 for endless
    fn max_cycle_count(&self) -> u32 {
        0
    }

    /// Root displacement over one full loop
    fn total_movement_delta(&self) -> Vec3;

    fn time_to_frame_interpolation(&self, time: i32) -> FrameInterpolation;

    /// Write frame `frame` for the listed joints into `out`
    fn single_frame(&self, frame: usize, indices: &[usize], out: &mut [JointPose]);

    /// Write the blend of the two frames of `interp` for the listed joints into `out`
    fn interpolated_frame(&self, interp: &FrameInterpolation, indices: &[usize], out: &mut [JointPose]);

    /// Root translation, accumulated across loops
    fn translation(&self, time: i32) -> Vec3;

    /// Root rotation
    fn rotation(&self, time: i32) -> Quat;

    /// Bounds at `time` given per-frame bounds
    fn aabb(&self, time: i32, frame_aabbs: &[Aabb]) -> Aabb {
        let interp = self.time_to_frame_interpolation(time);
        let mut aabb = Aabb::cleared();
        for frame in [interp.frame1, interp.frame2] {
            if let Some(frame_aabb) = frame_aabbs.get(frame) {
                aabb.add_aabb(frame_aabb);
            }
        }
        aabb
    }
}

/// Frame times plus a complete pose per frame
#[derive(Debug, Clone)]
pub struct KeyframeAnim {
    name: String,
    num_joints: usize,
    #[debug(with = debug::trimmed_collection_fmt)]
    frame_times: Vec<i32>,
    #[debug(with = debug::trimmed_collection_fmt)]
    frames: Vec<JointPose>,
    max_cycle_count: u32,
    cyclic_translation: bool,
    total_delta: Vec3,
}

impl KeyframeAnim {
    /// Build an anim from ascending frame times and `frame_times.len() * num_joints` poses
    pub fn new(
        name: impl Into<String>,
        num_joints: usize,
        frame_times: Vec<i32>,
        frames: Vec<JointPose>,
    ) -> Result<Self> {
        let name = name.into();
        if frame_times.is_empty() {
            return Err(AnimError::InvalidDefinition(format!(
                "anim '{}' has no frames",
                name
            )));
        }
        if frames.len() != frame_times.len() * num_joints {
            return Err(AnimError::InvalidDefinition(format!(
                "anim '{}' expects {} poses, got {}",
                name,
                frame_times.len() * num_joints,
                frames.len()
            )));
        }
        if frame_times.windows(2).any(|pair| pair[1] <= pair[0]) || frame_times[0] != 0 {
            return Err(AnimError::InvalidDefinition(format!(
                "anim '{}' frame times must start at 0 and increase",
                name
            )));
        }

        let mut anim = Self {
            name,
            num_joints,
            frame_times,
            frames,
            max_cycle_count: 0,
            cyclic_translation: true,
            total_delta: Vec3::ZERO,
        };
        anim.total_delta = anim.root_at(anim.num_frames() - 1).translation - anim.root_at(0).translation;
        Ok(anim)
    }

    /// A one frame anim holding `pose` on every joint
    pub fn still(name: impl Into<String>, pose: &[JointPose]) -> Self {
        Self {
            name: name.into(),
            num_joints: pose.len(),
            frame_times: vec![0],
            frames: pose.to_vec(),
            max_cycle_count: 0,
            cyclic_translation: false,
            total_delta: Vec3::ZERO,
        }
    }

    #[must_use]
    pub fn with_max_cycle_count(mut self, count: u32) -> Self {
        self.max_cycle_count = count;
        self
    }

    /// Whether root translation keeps accumulating across loops
    #[must_use]
    pub fn with_cyclic_translation(mut self, cyclic: bool) -> Self {
        self.cyclic_translation = cyclic;
        self
    }

    pub fn frame_times(&self) -> &[i32] {
        &self.frame_times
    }

    fn pose_at(&self, frame: usize, joint: usize) -> JointPose {
        self.frames
            .get(frame * self.num_joints + joint)
            .copied()
            .unwrap_or_default()
    }

    fn root_at(&self, frame: usize) -> JointPose {
        self.pose_at(frame, 0)
    }
}

/// Index of the last frame whose time is at or before `time`
fn find_frame_index(frame_times: &[i32], time: i32) -> usize {
    frame_times
        .partition_point(|&frame_time| frame_time <= time)
        .saturating_sub(1)
}

impl AnimSource for KeyframeAnim {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_joints(&self) -> usize {
        self.num_joints
    }

    fn num_frames(&self) -> usize {
        self.frame_times.len()
    }

    fn length(&self) -> i32 {
        self.frame_times.last().copied().unwrap_or(0)
    }

    fn max_cycle_count(&self) -> u32 {
        self.max_cycle_count
    }

    fn total_movement_delta(&self) -> Vec3 {
        self.total_delta
    }

    fn time_to_frame_interpolation(&self, time: i32) -> FrameInterpolation {
        let num_frames = self.num_frames();
        if num_frames <= 1 {
            return FrameInterpolation::hold(0, 0);
        }
        if time <= 0 {
            return FrameInterpolation {
                frame1: 0,
                frame2: 1,
                cycle_count: 0,
                backlerp: 0.0,
                frontlerp: 1.0,
            };
        }

        let length = self.length();
        let cycle_count = (time / length) as u32;
        if self.max_cycle_count > 0 && cycle_count >= self.max_cycle_count {
            return FrameInterpolation::hold(num_frames - 1, self.max_cycle_count - 1);
        }

        let local = time % length;
        let frame1 = find_frame_index(&self.frame_times, local).min(num_frames - 2);
        let frame2 = frame1 + 1;
        let span = (self.frame_times[frame2] - self.frame_times[frame1]) as f32;
        let backlerp = ((local - self.frame_times[frame1]) as f32 / span).clamp(0.0, 1.0);

        FrameInterpolation {
            frame1,
            frame2,
            cycle_count,
            backlerp,
            frontlerp: 1.0 - backlerp,
        }
    }

    fn single_frame(&self, frame: usize, indices: &[usize], out: &mut [JointPose]) {
        let frame = frame.min(self.num_frames() - 1);
        for &joint in indices {
            if joint < self.num_joints
                && let Some(slot) = out.get_mut(joint)
            {
                *slot = self.pose_at(frame, joint);
            }
        }
    }

    fn interpolated_frame(&self, interp: &FrameInterpolation, indices: &[usize], out: &mut [JointPose]) {
        if interp.frame1 == interp.frame2 || interp.backlerp == 0.0 {
            self.single_frame(interp.frame1, indices, out);
            return;
        }
        for &joint in indices {
            if joint >= self.num_joints {
                continue;
            }
            let Some(slot) = out.get_mut(joint) else {
                continue;
            };
            let a = self.pose_at(interp.frame1, joint);
            let b = self.pose_at(interp.frame2, joint);
            *slot = JointPose {
                rotation: a.rotation.slerp(b.rotation, interp.backlerp),
                translation: a.translation.lerp(b.translation, interp.backlerp),
                scale: a.scale.lerp(b.scale, interp.backlerp),
            };
        }
    }

    fn translation(&self, time: i32) -> Vec3 {
        let interp = self.time_to_frame_interpolation(time);
        let a = self.root_at(interp.frame1).translation;
        let b = self.root_at(interp.frame2).translation;
        let mut translation = a * interp.frontlerp + b * interp.backlerp;
        if self.cyclic_translation && interp.cycle_count > 0 {
            translation += self.total_delta * interp.cycle_count as f32;
        }
        translation
    }

    fn rotation(&self, time: i32) -> Quat {
        let interp = self.time_to_frame_interpolation(time);
        let a = self.root_at(interp.frame1).rotation;
        let b = self.root_at(interp.frame2).rotation;
        a.slerp(b, interp.backlerp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const EPS: f32 = 1e-4;

    /// Two joints, root walks 0 -> 10 along x over 1000 ms
    fn walk() -> KeyframeAnim {
        let frames = vec![
            JointPose::IDENTITY,
            JointPose::IDENTITY,
            JointPose::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            JointPose::IDENTITY,
            JointPose::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            JointPose::IDENTITY,
        ];
        KeyframeAnim::new("walk", 2, vec![0, 500, 1000], frames).unwrap()
    }

    #[test_case(0, 0, 1, 0.0 ; "start")]
    #[test_case(250, 0, 1, 0.5 ; "first half")]
    #[test_case(500, 1, 2, 0.0 ; "exact key")]
    #[test_case(750, 1, 2, 0.5 ; "second half")]
    #[test_case(1250, 0, 1, 0.5 ; "wrapped")]
    fn test_time_to_frame_interpolation(time: i32, frame1: usize, frame2: usize, backlerp: f32) {
        let interp = walk().time_to_frame_interpolation(time);
        assert_eq!(interp.frame1, frame1);
        assert_eq!(interp.frame2, frame2);
        assert!((interp.backlerp - backlerp).abs() < EPS);
        assert!((interp.frontlerp + interp.backlerp - 1.0).abs() < EPS);
    }

    #[test]
    fn test_translation_accumulates_cycles() {
        let anim = walk();
        assert_eq!(anim.total_movement_delta(), Vec3::new(10.0, 0.0, 0.0));
        assert!((anim.translation(250).x - 2.5).abs() < EPS);
        assert!((anim.translation(1250).x - 12.5).abs() < EPS);
        assert!((anim.translation(2250).x - 22.5).abs() < EPS);
    }

    #[test]
    fn test_max_cycle_count_holds_last_frame() {
        let anim = walk().with_max_cycle_count(1);
        let interp = anim.time_to_frame_interpolation(1500);
        assert_eq!(interp, FrameInterpolation::hold(2, 0));
        assert!((anim.translation(1500).x - 10.0).abs() < EPS);
    }

    #[test]
    fn test_interpolated_frame_only_writes_listed_joints() {
        let anim = walk();
        let marker = JointPose::from_translation(Vec3::splat(-1.0));
        let mut out = vec![marker; 2];
        let interp = anim.time_to_frame_interpolation(250);
        anim.interpolated_frame(&interp, &[0], &mut out);
        assert!((out[0].translation.x - 2.5).abs() < EPS);
        assert_eq!(out[1], marker);
    }

    #[test]
    fn test_still_anim_has_zero_length() {
        let anim = KeyframeAnim::still("pose", &[JointPose::IDENTITY; 3]);
        assert_eq!(anim.length(), 0);
        assert_eq!(anim.time_to_frame_interpolation(100), FrameInterpolation::hold(0, 0));
        assert_eq!(anim.translation(100), Vec3::ZERO);
    }

    #[test]
    fn test_rejects_mismatched_pose_count() {
        let err = KeyframeAnim::new("bad", 2, vec![0, 100], vec![JointPose::IDENTITY; 3]);
        assert!(matches!(err, Err(AnimError::InvalidDefinition(_))));
    }

    #[test]
    fn test_aabb_unions_neighbouring_frames() {
        let anim = walk();
        let boxes = [
            Aabb::new(Vec3::ZERO, Vec3::ONE),
            Aabb::new(Vec3::splat(1.0), Vec3::splat(2.0)),
            Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0)),
        ];
        let aabb = anim.aabb(250, &boxes);
        assert_eq!(aabb, Aabb::new(Vec3::ZERO, Vec3::splat(2.0)));
    }
}
