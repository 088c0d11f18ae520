//! Joint buffer math
//!
//! Masked pose blends, pose to matrix conversion and hierarchy propagation.
//! Every function takes an explicit joint index list so layers can restrict
//! their influence to a subset of the skeleton.

use glam::Mat4;

use crate::types::JointPose;

/// Override blend: move each listed joint of `joints` towards `blend` by `fraction`
pub fn blend_joints(joints: &mut [JointPose], blend: &[JointPose], fraction: f32, indices: &[usize]) {
    for &index in indices {
        let (Some(dst), Some(src)) = (joints.get_mut(index), blend.get(index)) else {
            continue;
        };
        dst.rotation = dst.rotation.slerp(src.rotation, fraction);
        dst.translation = dst.translation.lerp(src.translation, fraction);
        dst.scale = dst.scale.lerp(src.scale, fraction);
    }
}

/// Additive blend: layer `blend` on top of the listed joints of `joints`
///
/// Rotation moves towards `blend.rotation * rotation`, translation gains
/// `blend.translation * fraction` and scale moves towards `scale * blend.scale`.
pub fn additive_blend_joints(
    joints: &mut [JointPose],
    blend: &[JointPose],
    fraction: f32,
    indices: &[usize],
) {
    for &index in indices {
        let (Some(dst), Some(src)) = (joints.get_mut(index), blend.get(index)) else {
            continue;
        };
        let added = src.rotation * dst.rotation;
        dst.rotation = dst.rotation.slerp(added, fraction);
        dst.translation += src.translation * fraction;
        dst.scale = dst.scale.lerp(dst.scale * src.scale, fraction);
    }
}

/// Copy every joint of `src` into `dst`
pub fn copy_joints(dst: &mut [JointPose], src: &[JointPose]) {
    let count = dst.len().min(src.len());
    dst[..count].copy_from_slice(&src[..count]);
}

pub fn convert_joint_poses_to_mats(mats: &mut [Mat4], poses: &[JointPose]) {
    for (mat, pose) in mats.iter_mut().zip(poses) {
        *mat = Mat4::from_scale_rotation_translation(pose.scale, pose.rotation, pose.translation);
    }
}

/// Concatenate parent transforms for joints in `first..last`
///
/// Parents must precede their children. Joints with a negative parent index
/// are roots and keep their local matrix.
pub fn transform_joints(mats: &mut [Mat4], parents: &[i32], first: usize, last: usize) {
    let last = last.min(mats.len()).min(parents.len());
    for index in first..last {
        let parent = parents[index];
        if parent < 0 || parent as usize >= index {
            continue;
        }
        mats[index] = mats[parent as usize] * mats[index];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    const EPS: f32 = 1e-5;

    fn pose(x: f32) -> JointPose {
        JointPose::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_blend_joints_respects_mask() {
        let mut joints = vec![pose(0.0); 4];
        let blend = vec![pose(10.0); 4];
        blend_joints(&mut joints, &blend, 0.5, &[1, 3]);

        assert_eq!(joints[0], pose(0.0));
        assert!((joints[1].translation.x - 5.0).abs() < EPS);
        assert_eq!(joints[2], pose(0.0));
        assert!((joints[3].translation.x - 5.0).abs() < EPS);
    }

    #[test]
    fn test_additive_blend_adds_offsets() {
        let mut joints = vec![pose(1.0); 2];
        let mut blend = vec![pose(2.0); 2];
        blend[1].rotation = Quat::from_rotation_z(1.0);
        blend[1].scale = Vec3::splat(2.0);

        additive_blend_joints(&mut joints, &blend, 1.0, &[1]);

        assert_eq!(joints[0], pose(1.0));
        assert!((joints[1].translation.x - 3.0).abs() < EPS);
        assert!(joints[1].rotation.angle_between(Quat::from_rotation_z(1.0)) < 1e-3);
        assert!((joints[1].scale - Vec3::splat(2.0)).length() < EPS);
    }

    #[test]
    fn test_additive_blend_with_zero_fraction_is_noop() {
        let mut joints = vec![pose(1.0); 1];
        let blend = vec![pose(5.0); 1];
        additive_blend_joints(&mut joints, &blend, 0.0, &[0]);
        assert!((joints[0].translation.x - 1.0).abs() < EPS);
    }

    #[test]
    fn test_transform_joints_concatenates_chain() {
        let poses = vec![pose(1.0), pose(2.0), pose(3.0)];
        let mut mats = vec![Mat4::IDENTITY; 3];
        convert_joint_poses_to_mats(&mut mats, &poses);
        transform_joints(&mut mats, &[-1, 0, 1], 1, 3);

        assert!((mats[0].w_axis.x - 1.0).abs() < EPS);
        assert!((mats[1].w_axis.x - 3.0).abs() < EPS);
        assert!((mats[2].w_axis.x - 6.0).abs() < EPS);
    }
}
