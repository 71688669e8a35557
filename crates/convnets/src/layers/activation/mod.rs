//! # Activation Layers
pub mod activation_wrapper;
pub mod softmax;

pub use activation_wrapper::{Activation, ActivationConfig};
pub use softmax::Softmax;
