//! Joint hierarchy and bind pose

use custom_debug::Debug;
use skel_utils::debug;

use crate::error::{AnimError, Result};
use crate::types::JointPose;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }
}

/// Joint hierarchy with one bind pose per joint
///
/// Joints are ordered so that every parent precedes its children and joint 0
/// is the root.
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: String,
    #[debug(with = debug::trimmed_collection_fmt)]
    joints: Vec<Joint>,
    #[debug(with = debug::trimmed_collection_fmt)]
    parents: Vec<i32>,
    #[debug(with = debug::trimmed_collection_fmt)]
    bind_poses: Vec<JointPose>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>, joints: Vec<Joint>, bind_poses: Vec<JointPose>) -> Result<Self> {
        let name = name.into();
        if joints.is_empty() {
            return Err(AnimError::InvalidDefinition(format!(
                "skeleton '{}' has no joints",
                name
            )));
        }
        if joints.len() != bind_poses.len() {
            return Err(AnimError::InvalidDefinition(format!(
                "skeleton '{}' has {} joints but {} bind poses",
                name,
                joints.len(),
                bind_poses.len()
            )));
        }
        for (index, joint) in joints.iter().enumerate() {
            match joint.parent {
                None if index != 0 => {
                    return Err(AnimError::InvalidDefinition(format!(
                        "joint '{}' has no parent but is not the root",
                        joint.name
                    )));
                }
                Some(_) if index == 0 => {
                    return Err(AnimError::InvalidDefinition(format!(
                        "root joint '{}' must not have a parent",
                        joint.name
                    )));
                }
                Some(parent) if parent >= index => {
                    return Err(AnimError::InvalidDefinition(format!(
                        "joint '{}' is listed before its parent",
                        joint.name
                    )));
                }
                _ => {}
            }
        }

        let parents = joints
            .iter()
            .map(|joint| joint.parent.map_or(-1, |parent| parent as i32))
            .collect();

        Ok(Self {
            name,
            joints,
            parents,
            bind_poses,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Parent index per joint, -1 for the root
    pub fn joint_parents(&self) -> &[i32] {
        &self.parents
    }

    pub fn bind_poses(&self) -> &[JointPose] {
        &self.bind_poses
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints
            .iter()
            .position(|joint| joint.name.eq_ignore_ascii_case(name))
    }

    pub fn joint_name(&self, index: usize) -> Option<&str> {
        self.joints.get(index).map(|joint| joint.name.as_str())
    }

    /// Indices of `root` and everything below it
    pub fn subtree(&self, root: usize) -> Vec<usize> {
        let mut inside = vec![false; self.joints.len()];
        let mut result = Vec::new();
        for index in root..self.joints.len() {
            let below = index == root || self.joints[index].parent.is_some_and(|parent| inside[parent]);
            if below {
                inside[index] = true;
                result.push(index);
            }
        }
        result
    }

    /// Resolve a mask expression into sorted joint indices
    ///
    /// The expression is a whitespace separated list of joint names. A `-`
    /// prefix removes the joint, a `*` prefix applies to the joint and its
    /// whole subtree. Both may be combined as `-*name`. Unknown names are
    /// skipped with a warning.
    pub fn joint_list_by_string(&self, expression: &str) -> Vec<usize> {
        let mut selected = vec![false; self.joints.len()];

        for token in expression.split_whitespace() {
            let (subtract, rest) = match token.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, token),
            };
            let (children, joint_name) = match rest.strip_prefix('*') {
                Some(rest) => (true, rest),
                None => (false, rest),
            };

            let Some(index) = self.joint_index(joint_name) else {
                log::warn!(
                    "Unknown joint '{}' in '{}' for skeleton '{}'",
                    joint_name,
                    expression,
                    self.name
                );
                continue;
            };

            let targets = if children {
                self.subtree(index)
            } else {
                vec![index]
            };
            for target in targets {
                selected[target] = !subtract;
            }
        }

        selected
            .iter()
            .enumerate()
            .filter_map(|(index, &on)| on.then_some(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// root
    /// ├── spine
    /// │   ├── neck
    /// │   │   └── head
    /// │   └── arm
    /// └── leg
    fn humanoid() -> Skeleton {
        let joints = vec![
            Joint::new("root", None),
            Joint::new("spine", Some(0)),
            Joint::new("neck", Some(1)),
            Joint::new("head", Some(2)),
            Joint::new("arm", Some(1)),
            Joint::new("leg", Some(0)),
        ];
        Skeleton::new("humanoid", joints, vec![JointPose::IDENTITY; 6]).unwrap()
    }

    #[test]
    fn test_parents_are_flattened() {
        assert_eq!(humanoid().joint_parents(), &[-1, 0, 1, 2, 1, 0]);
    }

    #[test]
    fn test_mask_expression() {
        let skeleton = humanoid();
        assert_eq!(skeleton.joint_list_by_string("*spine"), vec![1, 2, 3, 4]);
        assert_eq!(skeleton.joint_list_by_string("*spine -*neck"), vec![1, 4]);
        assert_eq!(skeleton.joint_list_by_string("leg  ROOT"), vec![0, 5]);
        assert_eq!(skeleton.joint_list_by_string("head missing"), vec![3]);
        assert_eq!(skeleton.joint_list_by_string(""), Vec::<usize>::new());
    }

    #[test]
    fn test_rejects_child_before_parent() {
        let joints = vec![Joint::new("root", None), Joint::new("a", Some(2)), Joint::new("b", Some(0))];
        let result = Skeleton::new("bad", joints, vec![JointPose::IDENTITY; 3]);
        assert!(matches!(result, Err(AnimError::InvalidDefinition(_))));
    }

    #[test]
    fn test_joint_lookup() {
        let skeleton = humanoid();
        assert_eq!(skeleton.joint_index("Neck"), Some(2));
        assert_eq!(skeleton.joint_name(5), Some("leg"));
        assert_eq!(skeleton.joint_name(6), None);
    }
}
