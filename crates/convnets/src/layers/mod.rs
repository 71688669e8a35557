//! Common low-level modules for adding layers and operations in Burn.
pub mod activation;
pub mod blocks;
pub mod layer_spec;
