//! Small helpers shared by the skelblend crates.
//!
//! At the moment this is only [`debug`], which keeps `Debug` output of joint
//! buffers and keyframe tables readable.

pub mod debug;
