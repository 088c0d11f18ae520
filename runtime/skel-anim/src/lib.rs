//! # skel_anim - Skeletal Animation Blending
//!
//! Computes a skeleton's pose once per tick by blending many concurrently
//! playing clips: layers of cross-fading state slots, where each state plays
//! either a single clip or a parametric blend tree, driven by a transition
//! graph with conditions, exit times and atomic transitions.
//!
//! ## Features
//!
//! - **Blend trees**: angle, 1D and 2D directional blend spaces, plus
//!   barycentric 2D and 3D variants, nestable up to any depth
//! - **State machines**: conditional transitions, exit times, atomic
//!   transitions and authored time events
//! - **Layers**: override or additive layers with joint masks and weights
//! - **Cross-fades**: a fixed depth slot stack per layer so rapid retriggers
//!   drop the oldest fade instead of popping
//! - **Root motion**: blended root translation, translation and rotation
//!   deltas and bounds
//! - **Rig files**: JSON rig descriptions with the `serde-support` feature
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use glam::Vec3;
//! use skel_anim::{
//!     AnimController, Animator, CompareFunc, Condition, Joint, JointPose, KeyframeAnim, NoopTarget,
//!     Skeleton,
//! };
//!
//! # fn main() -> skel_anim::Result<()> {
//! let skeleton = Skeleton::new(
//!     "biped",
//!     vec![Joint::new("root", None), Joint::new("spine", Some(0))],
//!     vec![JointPose::IDENTITY; 2],
//! )?;
//!
//! let mut controller = AnimController::new("biped");
//! controller.set_skeleton(Arc::new(skeleton));
//! let speed = controller.create_parameter("speed", 0.0)?;
//! let idle = controller.add_anim_clip(Arc::new(KeyframeAnim::still("idle", &[JointPose::IDENTITY; 2])));
//! let run = controller.add_anim_clip(Arc::new(KeyframeAnim::new(
//!     "run",
//!     2,
//!     vec![0, 1000],
//!     vec![
//!         JointPose::IDENTITY,
//!         JointPose::IDENTITY,
//!         JointPose::from_translation(Vec3::X),
//!         JointPose::IDENTITY,
//!     ],
//! )?));
//!
//! if let Some(layer) = controller.anim_layer_mut(0) {
//!     let idle_state = layer.create_state("Idle")?;
//!     let run_state = layer.create_state("Run")?;
//!     layer.set_state_anim_clip(idle_state, idle)?;
//!     layer.set_state_anim_clip(run_state, run)?;
//!     layer.set_default_state(idle_state)?;
//!     layer
//!         .create_transition(idle_state, run_state)?
//!         .conditions
//!         .push(Condition::new(speed, CompareFunc::GreaterThan, 1.0));
//! }
//!
//! let mut animator = Animator::new();
//! animator.attach_anim_controller(Arc::new(controller));
//! animator.reset_state(0);
//!
//! animator.set_parameter_value(speed, 2.0);
//! animator.update_frame(&mut NoopTarget, 0, 16);
//! animator.compute_frame(16);
//! assert_eq!(animator.current_anim_state_name(0), Some("Run"));
//! let _joint_mats = animator.frame();
//! # Ok(())
//! # }
//! ```

pub mod anim;
pub mod animator;
pub mod blend_tree;
pub mod blender;
pub mod cache;
pub mod clip;
pub mod controller;
#[cfg(feature = "serde-support")]
pub mod definition;
pub mod error;
pub mod event;
pub mod layer;
pub mod pose;
pub mod skeleton;
pub mod state;
pub mod types;
pub mod view;

// Re-export common types
pub use anim::{AnimSource, FrameInterpolation, KeyframeAnim};
pub use animator::{Animator, MAX_BLENDERS_PER_LAYER};
pub use blend_tree::{AnimBlendTree, BlendType};
pub use blender::AnimStateBlender;
pub use cache::ResourceCache;
pub use clip::AnimClip;
pub use controller::{AnimController, AnimParm, MAX_LAYERS};
#[cfg(feature = "serde-support")]
pub use definition::{Rig, RigDef};
pub use error::{AnimError, Result};
pub use event::{EventTarget, NoopTarget, RecordingTarget};
pub use layer::{
    AnimLayer, AnimTransition, BlendTreeKey, Blending, CompareFunc, Condition, LeafKey, MAX_BLEND_TREE_CHILDREN,
    NodeKey, NodeRef, StateKey,
};
pub use skeleton::{Joint, Skeleton};
pub use state::{AnimEvent, AnimState};
pub use types::{Aabb, JointPose};
pub use view::LayerView;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
