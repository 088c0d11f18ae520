//! Integration tests for JSON rig descriptions

#![cfg(feature = "serde-support")]

use std::sync::Arc;

use glam::Vec3;
use pretty_assertions::assert_eq;
use skel_anim::{Animator, RecordingTarget, RigDef};

const RIG: &str = r#"{
    "skeleton": {
        "name": "biped",
        "joints": [
            { "name": "root" },
            { "name": "spine", "parent": "root", "bind_pose": { "translation": [0.0, 1.0, 0.0] } },
            { "name": "head", "parent": "spine", "bind_pose": { "translation": [0.0, 0.5, 0.0] } }
        ]
    },
    "anims": [
        { "name": "idle", "frame_times": [0], "frames": [[{}, {}, {}]] },
        {
            "name": "walk",
            "frame_times": [0, 1000],
            "frames": [[{}, {}, {}], [{ "translation": [2.0, 0.0, 0.0] }, {}, {}]]
        }
    ],
    "controller": {
        "name": "biped",
        "parameters": [{ "name": "speed" }, { "name": "jump", "default": 0.0 }],
        "layers": [
            {
                "name": "Locomotion",
                "states": [
                    { "name": "Idle", "motion": { "clip": "idle" } },
                    {
                        "name": "Walk",
                        "motion": { "clip": "walk" },
                        "events": [{ "time": 0.5, "name": "OnStep" }]
                    }
                ],
                "transitions": [
                    {
                        "from": "Idle",
                        "to": "Walk",
                        "duration": 0.1,
                        "conditions": [{ "parameter": "speed", "compare": "GreaterThan", "value": 0.5 }]
                    },
                    {
                        "from": "Walk",
                        "to": "Idle",
                        "conditions": [{ "parameter": "speed", "compare": "LessEqual", "value": 0.5 }]
                    }
                ]
            }
        ]
    }
}"#;

#[test]
fn test_rig_from_json_drives_animator() {
    let def: RigDef = serde_json::from_str(RIG).unwrap();
    let rig = def.build().unwrap();

    let mut animator = Animator::new();
    assert!(animator.attach_anim_controller(Arc::new(rig.controller)));
    animator.reset_state(0);
    assert_eq!(animator.current_anim_state_name(0), Some("Idle"));
    assert_eq!(animator.num_joints(), 3);
    assert_eq!(animator.joint_index("HEAD"), Some(2));

    let mut target = RecordingTarget::new(1);
    assert!(animator.set_parameter_value_by_name("speed", 1.0));
    animator.update_frame(&mut target, 0, 100);
    assert_eq!(animator.current_anim_state_name(0), Some("Walk"));
    assert_eq!(animator.blender(0, 1).unwrap().blend_duration(), 100);

    animator.update_frame(&mut target, 100, 700);
    assert_eq!(target.names(), vec!["OnStep"]);

    animator.compute_frame(700);
    // Walk keys every joint, so only the root's 60% of travel remains
    let head = animator.frame()[2].w_axis.truncate();
    assert!((head - Vec3::new(1.2, 0.0, 0.0)).length() < 1e-4, "{head:?}");

    animator.set_parameter_value_by_name("speed", 0.0);
    animator.update_frame(&mut target, 700, 716);
    assert_eq!(animator.current_anim_state_name(0), Some("Idle"));
}

#[test]
fn test_rig_round_trips_through_json() {
    let def: RigDef = serde_json::from_str(RIG).unwrap();
    let json = serde_json::to_string(&def).unwrap();
    let again: RigDef = serde_json::from_str(&json).unwrap();
    assert_eq!(def, again);
}
