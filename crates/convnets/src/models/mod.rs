//! Complete model families.
pub mod convnet;
pub mod resnet;
pub mod vgg;
