//! CLI integration tests for rig inspection and simulation

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const RIG: &str = r#"{
    "skeleton": {
        "name": "biped",
        "joints": [
            { "name": "root" },
            { "name": "spine", "parent": "root", "bind_pose": { "translation": [0.0, 1.0, 0.0] } }
        ]
    },
    "anims": [
        { "name": "idle", "frame_times": [0], "frames": [[{}, {}]] },
        {
            "name": "walk",
            "frame_times": [0, 1000],
            "frames": [[{}, {}], [{ "translation": [2.0, 0.0, 0.0] }, {}]]
        }
    ],
    "controller": {
        "name": "biped",
        "parameters": [{ "name": "speed" }],
        "layers": [
            {
                "name": "Locomotion",
                "states": [
                    { "name": "Idle", "motion": { "clip": "idle" } },
                    {
                        "name": "Walk",
                        "motion": { "clip": "walk" },
                        "events": [{ "time": 0.1, "name": "OnStep" }]
                    }
                ],
                "transitions": [
                    {
                        "from": "Idle",
                        "to": "Walk",
                        "duration": 0.0,
                        "conditions": [{ "parameter": "speed", "compare": "GreaterThan", "value": 0.5 }]
                    }
                ]
            }
        ]
    }
}"#;

fn skelblend() -> Command {
    Command::new(env!("CARGO_BIN_EXE_skelblend"))
}

fn write_rig(dir: &TempDir, contents: &str) -> Result<PathBuf> {
    let path = dir.path().join("rig.json");
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn test_cli_help() {
    skelblend()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_cli_inspect() -> Result<()> {
    let dir = TempDir::new()?;
    let rig = write_rig(&dir, RIG)?;

    skelblend()
        .arg("inspect")
        .arg(&rig)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skeleton: biped (2 joints)"))
        .stdout(predicate::str::contains("[0] speed = 0"))
        .stdout(predicate::str::contains("* Idle -> clip idle, 0 ms"))
        .stdout(predicate::str::contains("Walk -> clip walk, 1000 ms (1 event)"))
        .stdout(predicate::str::contains("Idle -> Walk"))
        .stdout(predicate::str::contains("[speed > 0.5]"));
    Ok(())
}

#[test]
fn test_cli_simulate_switches_state() -> Result<()> {
    let dir = TempDir::new()?;
    let rig = write_rig(&dir, RIG)?;

    skelblend()
        .args(["simulate", "--ticks", "5", "--step", "50", "--set", "speed=1@100"])
        .arg(&rig)
        .assert()
        .success()
        .stdout(predicate::str::contains("t=    50 ms  Locomotion: Idle"))
        .stdout(predicate::str::contains("t=   100 ms  Locomotion: Walk"))
        .stdout(predicate::str::contains("event OnStep -> component 0"));
    Ok(())
}

#[test]
fn test_cli_simulate_rejects_unknown_parameter() -> Result<()> {
    let dir = TempDir::new()?;
    let rig = write_rig(&dir, RIG)?;

    skelblend()
        .args(["simulate", "--set", "jump=1"])
        .arg(&rig)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown parameter 'jump'"));
    Ok(())
}

#[test]
fn test_cli_reports_broken_rig() -> Result<()> {
    let dir = TempDir::new()?;
    let rig = write_rig(&dir, r#"{ "skeleton": "#)?;

    skelblend()
        .arg("inspect")
        .arg(&rig)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse rig description"));
    Ok(())
}

#[test]
fn test_cli_missing_file() {
    skelblend()
        .args(["inspect", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
