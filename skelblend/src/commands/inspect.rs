//! Rig inspection

use anyhow::Result;
use skel_anim::{Aabb, AnimController, AnimLayer, AnimTransition, CompareFunc, LayerView, NodeRef, StateKey};
use std::path::Path;

use super::load_rig;

pub fn execute(path: &Path) -> Result<()> {
    let rig = load_rig(path)?;
    let controller = &rig.controller;

    println!("=== Rig: {} ===", controller.name());
    println!(
        "Skeleton: {} ({} joints)",
        rig.skeleton.name(),
        rig.skeleton.num_joints()
    );

    println!("\nClips: {}", controller.num_anim_clips());
    for clip in controller.anim_clips() {
        println!("  {:<20} {:>6} ms", clip.name(), clip.length());
    }

    println!("\nParameters: {}", controller.num_parameters());
    for (index, parameter) in controller.parameters().iter().enumerate() {
        println!("  [{}] {} = {}", index, parameter.name, parameter.default_value);
    }

    println!("\nLayers: {}", controller.num_anim_layers());
    let defaults: Vec<f32> = controller
        .parameters()
        .iter()
        .map(|parameter| parameter.default_value)
        .collect();
    for (index, layer) in controller.anim_layers().iter().enumerate() {
        print_layer(controller, index, layer, &defaults);
    }

    Ok(())
}

fn print_layer(controller: &AnimController, index: usize, layer: &AnimLayer, defaults: &[f32]) {
    let mask = match layer.mask_joints() {
        None => "all joints".to_string(),
        Some(joints) => format!("{} joints", joints.len()),
    };
    println!(
        "  [{}] {} ({:?}, weight {:.2}, mask: {})",
        index,
        layer.name(),
        layer.blending(),
        layer.weight(),
        mask
    );

    // Blend tree durations are shown at the parameter defaults
    let view = LayerView::new(layer, defaults, layer.mask_joints().unwrap_or_default(), Aabb::cleared());

    println!("    States:");
    for (key, state) in layer.states() {
        let marker = if layer.default_state() == Some(key) { '*' } else { ' ' };
        let events = match state.events().len() {
            0 => String::new(),
            1 => " (1 event)".to_string(),
            count => format!(" ({} events)", count),
        };
        println!(
            "      {} {} -> {}, {:.0} ms{}",
            marker,
            state.name(),
            describe_motion(layer, state.motion()),
            state.duration(&view),
            events
        );
    }

    if !layer.transitions().is_empty() {
        println!("    Transitions:");
        for transition in layer.transitions() {
            println!("      {}", describe_transition(controller, layer, transition));
        }
    }
}

fn describe_motion(layer: &AnimLayer, motion: Option<NodeRef>) -> String {
    match motion {
        None => "nothing".to_string(),
        Some(NodeRef::Leaf(key)) => match layer.node_anim_clip(key) {
            Ok(Some(clip)) => format!("clip {}", clip.name()),
            _ => "empty clip".to_string(),
        },
        Some(NodeRef::Node(key)) => match layer.node_blend_tree(key) {
            Ok(tree) => format!(
                "blend tree {} ({:?}, {} children)",
                tree.name(),
                tree.blend_type(),
                tree.num_children()
            ),
            Err(_) => "missing blend tree".to_string(),
        },
    }
}

fn state_name(layer: &AnimLayer, key: StateKey) -> &str {
    layer.state(key).map_or("?", |state| state.name())
}

fn compare_symbol(func: CompareFunc) -> &'static str {
    match func {
        CompareFunc::GreaterThan => ">",
        CompareFunc::GreaterEqual => ">=",
        CompareFunc::LessThan => "<",
        CompareFunc::LessEqual => "<=",
        CompareFunc::Equal => "==",
    }
}

fn describe_transition(controller: &AnimController, layer: &AnimLayer, transition: &AnimTransition) -> String {
    let mut text = format!(
        "{} -> {}",
        state_name(layer, transition.src_state),
        state_name(layer, transition.dst_state)
    );

    if transition.fixed_duration {
        text.push_str(&format!("  duration {:.2} s", transition.duration));
    } else {
        text.push_str(&format!("  duration {:.0}%", transition.duration * 100.0));
    }
    if transition.has_exit_time {
        text.push_str(&format!("  exit {:.2}", transition.exit_time));
    }
    if transition.is_atomic {
        text.push_str("  atomic");
    }

    if !transition.conditions.is_empty() {
        let conditions: Vec<String> = transition
            .conditions
            .iter()
            .map(|condition| {
                let name = controller
                    .parameter(condition.parameter_index)
                    .map_or("?", |parameter| parameter.name.as_str());
                format!(
                    "{} {} {}",
                    name,
                    compare_symbol(condition.compare_func),
                    condition.value
                )
            })
            .collect();
        text.push_str(&format!("  [{}]", conditions.join(" && ")));
    }

    text
}
