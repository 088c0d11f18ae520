//! Animation controller resource
//!
//! An [`AnimController`] is the immutable description an [`Animator`] binds
//! to: skeleton, named parameters, the clips it plays and the layer stack.
//! Controllers are shared between animators through `Arc`; all per-entity
//! playback state lives in the animator.
//!
//! [`Animator`]: crate::animator::Animator

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::anim::AnimSource;
use crate::cache::ResourceCache;
use crate::clip::AnimClip;
use crate::error::{AnimError, Result};
use crate::layer::AnimLayer;
use crate::pose::{convert_joint_poses_to_mats, transform_joints};
use crate::skeleton::Skeleton;

/// Maximum number of layers per controller
pub const MAX_LAYERS: usize = 8;

/// Name of the layer every controller starts with
pub const BASE_LAYER_NAME: &str = "Base Layer";

/// Named float parameter
#[derive(Debug, Clone, PartialEq)]
pub struct AnimParm {
    pub name: String,
    pub default_value: f32,
}

#[derive(Debug, Clone)]
pub struct AnimController {
    name: String,
    skeleton: Option<Arc<Skeleton>>,
    root_offset: Vec3,
    parameters: Vec<AnimParm>,
    clips: Vec<Arc<AnimClip>>,
    layers: Vec<AnimLayer>,
}

impl AnimController {
    /// A controller with an empty base layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skeleton: None,
            root_offset: Vec3::ZERO,
            parameters: Vec::new(),
            clips: Vec::new(),
            layers: vec![AnimLayer::new(BASE_LAYER_NAME)],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drop skeleton, parameters, clips and all layers but an empty base layer
    pub fn purge(&mut self) {
        self.skeleton = None;
        self.root_offset = Vec3::ZERO;
        self.parameters.clear();
        self.clips.clear();
        self.layers = vec![AnimLayer::new(BASE_LAYER_NAME)];
    }

    // Skeleton

    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.skeleton.as_ref()
    }

    pub fn set_skeleton(&mut self, skeleton: Arc<Skeleton>) {
        self.skeleton = Some(skeleton);
    }

    pub fn num_joints(&self) -> usize {
        self.skeleton.as_ref().map_or(0, |skeleton| skeleton.num_joints())
    }

    pub fn joint_parents(&self) -> &[i32] {
        match &self.skeleton {
            Some(skeleton) => skeleton.joint_parents(),
            None => &[],
        }
    }

    pub fn root_offset(&self) -> Vec3 {
        self.root_offset
    }

    pub fn set_root_offset(&mut self, offset: Vec3) {
        self.root_offset = offset;
    }

    /// Resolve a mask expression against the skeleton
    pub fn joint_list_by_string(&self, expression: &str) -> Vec<usize> {
        match &self.skeleton {
            Some(skeleton) => skeleton.joint_list_by_string(expression),
            None => {
                log::warn!("Controller '{}' has no skeleton to resolve '{}'", self.name, expression);
                Vec::new()
            }
        }
    }

    /// Bind pose in model space, root offset applied
    pub fn build_bind_pose_mats(&self) -> Vec<Mat4> {
        let Some(skeleton) = &self.skeleton else {
            return Vec::new();
        };
        let mut mats = vec![Mat4::IDENTITY; skeleton.num_joints()];
        convert_joint_poses_to_mats(&mut mats, skeleton.bind_poses());
        if let Some(root) = mats.first_mut() {
            root.w_axis += self.root_offset.extend(0.0);
        }
        transform_joints(&mut mats, skeleton.joint_parents(), 1, skeleton.num_joints());
        mats
    }

    // Parameters

    pub fn create_parameter(&mut self, name: impl Into<String>, default_value: f32) -> Result<usize> {
        let name = name.into();
        if self.find_parameter_index(&name).is_some() {
            return Err(AnimError::duplicate("parameter", name));
        }
        self.parameters.push(AnimParm { name, default_value });
        Ok(self.parameters.len() - 1)
    }

    pub fn find_parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|parm| parm.name.eq_ignore_ascii_case(name))
    }

    pub fn parameter(&self, index: usize) -> Option<&AnimParm> {
        self.parameters.get(index)
    }

    pub fn parameters(&self) -> &[AnimParm] {
        &self.parameters
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Remove a parameter. Conditions on it are dropped, blend tree axes
    /// bound to it are unbound and later indices shift down by one.
    pub fn delete_parameter(&mut self, name: &str) -> Result<AnimParm> {
        let index = self
            .find_parameter_index(name)
            .ok_or_else(|| AnimError::not_found("parameter", name))?;
        for layer in &mut self.layers {
            layer.remap_parameter_removal(index);
        }
        Ok(self.parameters.remove(index))
    }

    // Clips

    /// Register keyframe data, reusing the clip if it is already known
    pub fn add_anim_clip(&mut self, anim: Arc<dyn AnimSource>) -> Arc<AnimClip> {
        if let Some(existing) = self
            .clips
            .iter()
            .find(|clip| clip.anim().is_some_and(|known| Arc::ptr_eq(known, &anim)))
        {
            return Arc::clone(existing);
        }
        let clip = Arc::new(AnimClip::new(anim));
        self.clips.push(Arc::clone(&clip));
        clip
    }

    /// Look `name` up in `anims` and register it
    pub fn load_anim_clip(&mut self, anims: &ResourceCache<dyn AnimSource>, name: &str) -> Result<Arc<AnimClip>> {
        let anim = anims
            .get(name)
            .ok_or_else(|| AnimError::not_found("anim", name))?;
        if self
            .skeleton
            .as_ref()
            .is_some_and(|skeleton| skeleton.num_joints() != anim.num_joints())
        {
            log::warn!(
                "Anim '{}' has {} joints, skeleton of '{}' has {}",
                name,
                anim.num_joints(),
                self.name,
                self.num_joints()
            );
        }
        Ok(self.add_anim_clip(anim))
    }

    pub fn anim_clip(&self, index: usize) -> Option<&Arc<AnimClip>> {
        self.clips.get(index)
    }

    pub fn anim_clips(&self) -> &[Arc<AnimClip>] {
        &self.clips
    }

    pub fn num_anim_clips(&self) -> usize {
        self.clips.len()
    }

    pub fn find_anim_clip_index(&self, name: &str) -> Option<usize> {
        self.clips
            .iter()
            .position(|clip| clip.name().eq_ignore_ascii_case(name))
    }

    /// Forget a clip. Layers that play it keep their own handle.
    pub fn release_anim_clip(&mut self, index: usize) -> Option<Arc<AnimClip>> {
        (index < self.clips.len()).then(|| self.clips.remove(index))
    }

    // Layers

    pub fn create_anim_layer(&mut self, name: impl Into<String>) -> Result<usize> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(AnimError::CapacityExceeded {
                what: "animation layers",
                max: MAX_LAYERS,
            });
        }
        let name = name.into();
        if self.find_anim_layer_index(&name).is_some() {
            return Err(AnimError::duplicate("layer", name));
        }
        self.layers.push(AnimLayer::new(name));
        Ok(self.layers.len() - 1)
    }

    pub fn delete_anim_layer(&mut self, index: usize) -> Result<AnimLayer> {
        if index == 0 {
            return Err(AnimError::InvalidDefinition(
                "the base layer cannot be deleted".to_string(),
            ));
        }
        if index >= self.layers.len() {
            return Err(AnimError::not_found("layer", index.to_string()));
        }
        Ok(self.layers.remove(index))
    }

    pub fn anim_layer(&self, index: usize) -> Option<&AnimLayer> {
        self.layers.get(index)
    }

    pub fn anim_layer_mut(&mut self, index: usize) -> Option<&mut AnimLayer> {
        self.layers.get_mut(index)
    }

    pub fn anim_layers(&self) -> &[AnimLayer] {
        &self.layers
    }

    pub fn num_anim_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn find_anim_layer_index(&self, name: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.name().eq_ignore_ascii_case(name))
    }

    /// Mask a layer with a joint expression, see [`Skeleton::joint_list_by_string`]
    pub fn set_layer_mask(&mut self, index: usize, expression: &str) -> Result<()> {
        if self.skeleton.is_none() {
            return Err(AnimError::not_found("skeleton", self.name.clone()));
        }
        let joints = self.joint_list_by_string(expression);
        let layer = self
            .layers
            .get_mut(index)
            .ok_or_else(|| AnimError::not_found("layer", index.to_string()))?;
        layer.set_mask_joints(joints);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::KeyframeAnim;
    use crate::skeleton::Joint;
    use crate::types::JointPose;

    fn skeleton() -> Arc<Skeleton> {
        let joints = vec![
            Joint::new("root", None),
            Joint::new("spine", Some(0)),
            Joint::new("head", Some(1)),
        ];
        let poses = vec![JointPose::from_translation(Vec3::Y); 3];
        Arc::new(Skeleton::new("biped", joints, poses).unwrap())
    }

    #[test]
    fn test_new_controller_has_base_layer() {
        let controller = AnimController::new("hero");
        assert_eq!(controller.num_anim_layers(), 1);
        assert_eq!(controller.anim_layer(0).unwrap().name(), BASE_LAYER_NAME);
    }

    #[test]
    fn test_layer_cap() {
        let mut controller = AnimController::new("hero");
        for i in 1..MAX_LAYERS {
            assert_eq!(controller.create_anim_layer(format!("layer{}", i)).unwrap(), i);
        }
        assert_eq!(
            controller.create_anim_layer("one too many"),
            Err(AnimError::CapacityExceeded {
                what: "animation layers",
                max: MAX_LAYERS
            })
        );
        assert!(controller.delete_anim_layer(0).is_err());
        assert!(controller.delete_anim_layer(3).is_ok());
    }

    #[test]
    fn test_parameters() {
        let mut controller = AnimController::new("hero");
        assert_eq!(controller.create_parameter("speed", 0.0).unwrap(), 0);
        assert_eq!(controller.create_parameter("direction", 90.0).unwrap(), 1);
        assert!(matches!(
            controller.create_parameter("SPEED", 1.0),
            Err(AnimError::Duplicate { .. })
        ));
        assert_eq!(controller.find_parameter_index("Direction"), Some(1));

        controller.delete_parameter("speed").unwrap();
        assert_eq!(controller.find_parameter_index("direction"), Some(0));
    }

    #[test]
    fn test_clips_are_deduplicated() {
        let mut anims: ResourceCache<dyn AnimSource> = ResourceCache::new();
        anims.insert("idle", Arc::new(KeyframeAnim::still("idle", &[JointPose::IDENTITY; 3])));

        let mut controller = AnimController::new("hero");
        controller.set_skeleton(skeleton());
        let a = controller.load_anim_clip(&anims, "idle").unwrap();
        let b = controller.load_anim_clip(&anims, "IDLE").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(controller.num_anim_clips(), 1);
        assert_eq!(controller.find_anim_clip_index("idle"), Some(0));
        assert!(matches!(
            controller.load_anim_clip(&anims, "walk"),
            Err(AnimError::NotFound { .. })
        ));
    }

    #[test]
    fn test_bind_pose_mats_apply_offset_and_hierarchy() {
        let mut controller = AnimController::new("hero");
        controller.set_skeleton(skeleton());
        controller.set_root_offset(Vec3::new(0.0, 0.0, 5.0));
        let mats = controller.build_bind_pose_mats();

        assert_eq!(mats.len(), 3);
        assert!((mats[0].w_axis.truncate() - Vec3::new(0.0, 1.0, 5.0)).length() < 1e-5);
        assert!((mats[2].w_axis.truncate() - Vec3::new(0.0, 3.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_set_layer_mask() {
        let mut controller = AnimController::new("hero");
        assert!(controller.set_layer_mask(0, "*spine").is_err());
        controller.set_skeleton(skeleton());
        let upper = controller.create_anim_layer("Upper").unwrap();
        controller.set_layer_mask(upper, "*spine").unwrap();
        assert_eq!(controller.anim_layer(upper).unwrap().mask_joints(), Some(&[1, 2][..]));
    }
}
