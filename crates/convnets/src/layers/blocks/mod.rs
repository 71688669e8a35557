//! # Composite Blocks
//!
//! * [`conv_norm`] - ``Conv2d + BatchNorm2d`` block.
//! * [`cna`] - ``Conv2d + BatchNorm2d + Activation`` block.
pub mod cna;
pub mod conv_norm;
