//! Misc utilities.
pub mod probability;
pub mod shape;
