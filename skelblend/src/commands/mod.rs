//! Command implementations

pub mod inspect;
pub mod simulate;

use anyhow::{Context, Result};
use skel_anim::{Rig, RigDef};
use std::{fs, path::Path};

/// Read and build a JSON rig description
pub fn load_rig(path: &Path) -> Result<Rig> {
    log::info!("Loading rig: {}", path.display());

    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let def: RigDef =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse rig description {}", path.display()))?;
    def.build()
        .with_context(|| format!("Failed to build rig from {}", path.display()))
}
