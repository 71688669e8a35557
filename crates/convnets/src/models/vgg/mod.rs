//! # VGG
//!
//! Plain conv/pool stacks described by a [`width_table`], with a
//! fully-connected [`classifier`] head.

pub mod classifier;
pub mod features;
pub mod vgg_model;
pub mod width_table;

pub use vgg_model::{
    Vgg, VggConfig, build_vgg, build_vgg11, build_vgg13, build_vgg16, build_vgg19,
};
pub use width_table::{VggVariant, WidthEntry};
