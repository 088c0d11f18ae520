//! Root CLI structure for skelblend

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "skelblend")]
#[command(about = "Inspect and simulate skeletal animation rigs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the parameters, layers, states and transitions of a rig
    Inspect {
        /// Path to the JSON rig description
        file: PathBuf,
    },

    /// Drive a rig's state machines over a number of ticks
    Simulate(SimulateArgs),
}
