//! Fixed-step playback of a rig's state machines

use anyhow::{Result, anyhow, bail};
use clap::Args;
use glam::Vec3;
use skel_anim::{Animator, EventTarget, MAX_BLENDERS_PER_LAYER};
use std::{path::PathBuf, sync::Arc};

use super::load_rig;

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the JSON rig description
    pub file: PathBuf,

    /// Number of ticks to run
    #[arg(short, long, default_value = "10")]
    pub ticks: u32,

    /// Milliseconds per tick
    #[arg(short, long, default_value = "33")]
    pub step: i32,

    /// Set a parameter at a given time, as `name=value` or `name=value@ms`
    #[arg(long = "set", value_name = "NAME=VALUE[@MS]", value_parser = parse_assignment)]
    pub assignments: Vec<Assignment>,

    /// Number of script components receiving events
    #[arg(long, default_value = "1")]
    pub components: usize,
}

/// Parameter write scheduled at `time`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: f32,
    pub time: i32,
}

/// Prints every script call as it happens
struct ConsoleTarget {
    components: usize,
}

impl EventTarget for ConsoleTarget {
    fn num_script_components(&self) -> usize {
        self.components
    }

    fn call_script_func(&mut self, component: usize, func: &str) {
        println!("         event {} -> component {}", func, component);
    }
}

fn parse_assignment(text: &str) -> Result<Assignment, String> {
    let (name, rest) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE[@MS], got '{}'", text))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", text));
    }

    let (value, time) = match rest.split_once('@') {
        Some((value, time)) => (
            value,
            time.parse::<i32>()
                .map_err(|e| format!("invalid time '{}': {}", time, e))?,
        ),
        None => (rest, 0),
    };
    let value = value
        .parse::<f32>()
        .map_err(|e| format!("invalid value '{}': {}", value, e))?;

    Ok(Assignment {
        name: name.to_string(),
        value,
        time,
    })
}

pub fn execute(args: &SimulateArgs) -> Result<()> {
    if args.step <= 0 {
        bail!("--step must be positive, got {}", args.step);
    }

    let rig = load_rig(&args.file)?;
    let mut animator = Animator::new();
    if !animator.attach_anim_controller(Arc::new(rig.controller)) {
        bail!("Rig controller cannot be bound to an animator");
    }
    animator.reset_state(0);

    let mut pending = Vec::with_capacity(args.assignments.len());
    for assignment in &args.assignments {
        let index = animator
            .parameter_index(&assignment.name)
            .ok_or_else(|| anyhow!("Unknown parameter '{}'", assignment.name))?;
        pending.push((assignment.time, index, assignment.value));
    }
    pending.sort_by_key(|&(time, _, _)| time);
    let mut pending = pending.into_iter().peekable();

    let mut target = ConsoleTarget {
        components: args.components,
    };
    let mut previous = 0;
    for tick in 1..=args.ticks {
        let current = previous + args.step;

        while let Some((time, index, value)) = pending.next_if(|&(time, _, _)| time <= current) {
            log::debug!("t={}: parameter {} = {}", time, index, value);
            animator.set_parameter_value(index, value);
        }

        animator.update_frame(&mut target, previous, current);
        animator.compute_frame(current);
        let delta = animator.translation_delta(previous, current);
        let root = animator
            .frame()
            .first()
            .map_or(Vec3::ZERO, |mat| mat.w_axis.truncate());

        println!(
            "[{:>4}] t={:>6} ms  {}  root ({:.3}, {:.3}, {:.3}) delta ({:.3}, {:.3}, {:.3})",
            tick,
            current,
            describe_layers(&animator, current),
            root.x,
            root.y,
            root.z,
            delta.x,
            delta.y,
            delta.z
        );

        previous = current;
    }

    let total = animator.translation(previous);
    println!(
        "\nRoot translation after {} ms: ({:.3}, {:.3}, {:.3})",
        previous, total.x, total.y, total.z
    );
    Ok(())
}

/// `Layer: Current [State weight, ...]` for every layer
fn describe_layers(animator: &Animator, current_time: i32) -> String {
    (0..animator.num_anim_layers())
        .filter_map(|index| {
            let layer = animator.anim_layer(index)?;
            let slots: Vec<String> = (0..MAX_BLENDERS_PER_LAYER)
                .filter_map(|slot| {
                    let blender = animator.blender(index, slot)?;
                    let state = layer.state(blender.state()?).ok()?;
                    Some(format!(
                        "{} {:.2}",
                        state.name(),
                        blender.blend_weight(current_time)
                    ))
                })
                .collect();
            Some(format!(
                "{}: {} [{}]",
                layer.name(),
                animator.current_anim_state_name(index).unwrap_or("-"),
                slots.join(", ")
            ))
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("speed=1.5@200").unwrap(),
            Assignment {
                name: "speed".to_string(),
                value: 1.5,
                time: 200
            }
        );
        assert_eq!(parse_assignment("speed=2").unwrap().time, 0);
    }

    #[test]
    fn test_parse_assignment_rejects_garbage() {
        assert!(parse_assignment("speed").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("speed=fast").is_err());
        assert!(parse_assignment("speed=1@soon").is_err());
    }
}
