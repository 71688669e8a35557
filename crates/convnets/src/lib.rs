#![warn(missing_docs)]
//!# convnets - Convolutional Image Classifiers
//!
//! `ResNet` and VGG classifiers for [burn](https://burn.dev).
//!
//! ## Notable Components
//!
//! * [`layers`] - reusable neural network modules.
//!   * [`layers::activation`] - activation layer abstraction wrapper.
//!   * [`layers::blocks`] - miscellaneous blocks.
//!     * [`layers::blocks::conv_norm`] - ``Conv2d + BatchNorm2d`` block.
//!     * [`layers::blocks::cna`] - ``Conv2d + BatchNorm2d + Activation`` block.
//!   * [`layers::layer_spec`] - flat descriptions of the primitive layers of a model.
//! * [`models`] - complete model families.
//!   * [`models::resnet`] - `ResNet`
//!   * [`models::vgg`] - VGG
//!   * [`models::convnet`] - any named architecture.
//! * [`utility`] - shape and probability helpers.

/// Test-only macro import.
#[cfg(test)]
#[allow(unused_imports)]
#[macro_use]
extern crate hamcrest;

pub mod layers;
pub mod models;
pub mod utility;

pub use models::convnet::{ConvNet, ConvNetArchitecture, ConvNetConfig};
pub use models::resnet::{
    build_resnet18, build_resnet34, build_resnet50, build_resnet101, build_resnet152,
};
pub use models::vgg::{build_vgg11, build_vgg13, build_vgg16, build_vgg19};
