//! # Softmax Layer
use burn::module::Module;
use burn::prelude::{Backend, Tensor};
use burn::tensor::activation::softmax;

/// Softmax over the last dimension.
///
/// Stateless; exists so softmax can sit in an [`super::Activation`] slot.
#[derive(Module, Clone, Debug, Default)]
pub struct Softmax;

impl Softmax {
    /// Create the layer.
    pub fn new() -> Self {
        Self
    }

    /// Forward pass; normalizes the last dimension.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        softmax(input, D - 1)
    }
}
