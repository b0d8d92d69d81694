//! Passes.

pub mod seeds;
