//! Rig fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use glam::Vec3;
use skel_anim::{AnimController, Joint, JointPose, KeyframeAnim, Skeleton};

pub const EPS: f32 = 1e-4;

/// `count` joints named `j0..`, every joint but the root parented to joint 0
pub fn flat_skeleton(count: usize) -> Arc<Skeleton> {
    let joints = (0..count)
        .map(|index| Joint::new(format!("j{}", index), (index > 0).then_some(0)))
        .collect();
    let bind_poses = (0..count)
        .map(|index| JointPose::from_translation(Vec3::new(0.0, index as f32, 0.0)))
        .collect();
    Arc::new(Skeleton::new("flat", joints, bind_poses).unwrap())
}

/// One frame holding `pose` on every joint
pub fn still(name: &str, count: usize, pose: JointPose) -> Arc<KeyframeAnim> {
    Arc::new(KeyframeAnim::still(name, &vec![pose; count]))
}

/// Two frames over `length` ms. The root travels `distance`, other joints stay at identity.
pub fn travel(name: &str, count: usize, length: i32, distance: Vec3) -> Arc<KeyframeAnim> {
    let mut frames = vec![JointPose::IDENTITY; count * 2];
    frames[count] = JointPose::from_translation(distance);
    Arc::new(KeyframeAnim::new(name, count, vec![0, length], frames).unwrap())
}

/// A controller bound to a flat skeleton of `count` joints
pub fn controller(name: &str, count: usize) -> AnimController {
    let mut controller = AnimController::new(name);
    controller.set_skeleton(flat_skeleton(count));
    controller
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
