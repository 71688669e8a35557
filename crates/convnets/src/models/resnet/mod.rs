//! # `ResNet`
//!
//! Residual networks built from [`basic_block`] and [`bottleneck_block`]
//! units, grouped into [`layer_block`] stages by [`resnet_model`].

pub mod basic_block;
pub mod bottleneck_block;
pub mod layer_block;
pub mod residual_block;
pub mod resnet_model;
pub mod util;

pub use resnet_model::{
    ResNet, ResNetAbstractConfig, ResNetConfig, ResNetVariant, build_resnet, build_resnet18,
    build_resnet34, build_resnet50, build_resnet101, build_resnet152,
};
