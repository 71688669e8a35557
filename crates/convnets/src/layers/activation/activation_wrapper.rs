//! # Activation Layer Wrapper
//!
//! [`ActivationConfig`] / [`Activation`] select one of the stateless
//! activations used by the conv/norm/act blocks and classifier heads.
use crate::layers::activation::softmax::Softmax;
use crate::layers::layer_spec::LayerSpec;
use burn::nn::{Gelu, LeakyRelu, LeakyReluConfig, PRelu, PReluConfig, Relu, Sigmoid, Tanh};
use burn::prelude::{Backend, Config, Module, Tensor};

/// [`Activation`] Configuration.
#[derive(Config, Debug)]
#[non_exhaustive]
pub enum ActivationConfig {
    /// [`Relu`] activation layer.
    Relu,

    /// [`LeakyRelu`] activation layer.
    LeakyRelu(LeakyReluConfig),

    /// [`PRelu`] activation layer; learnable slope.
    PRelu(PReluConfig),

    /// [`Gelu`] activation layer.
    Gelu,

    /// [`Tanh`] activation layer.
    Tanh,

    /// [`Sigmoid`] activation layer.
    Sigmoid,

    /// [`Softmax`] over the last dimension.
    Softmax,
}

impl From<LeakyReluConfig> for ActivationConfig {
    fn from(config: LeakyReluConfig) -> Self {
        Self::LeakyRelu(config)
    }
}

impl From<PReluConfig> for ActivationConfig {
    fn from(config: PReluConfig) -> Self {
        Self::PRelu(config)
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self::Relu
    }
}

impl ActivationConfig {
    /// Initialize a wrapped activation layer.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Activation<B> {
        match self {
            ActivationConfig::Relu => Activation::Relu(Relu),
            ActivationConfig::LeakyRelu(conf) => Activation::LeakyRelu(conf.init()),
            ActivationConfig::PRelu(conf) => Activation::PRelu(conf.init(device)),
            ActivationConfig::Gelu => Activation::Gelu(Gelu),
            ActivationConfig::Tanh => Activation::Tanh(Tanh),
            ActivationConfig::Sigmoid => Activation::Sigmoid(Sigmoid),
            ActivationConfig::Softmax => Activation::Softmax(Softmax),
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            ActivationConfig::Relu => "Relu",
            ActivationConfig::LeakyRelu(_) => "LeakyRelu",
            ActivationConfig::PRelu(_) => "PRelu",
            ActivationConfig::Gelu => "Gelu",
            ActivationConfig::Tanh => "Tanh",
            ActivationConfig::Sigmoid => "Sigmoid",
            ActivationConfig::Softmax => "Softmax",
        }
    }

    /// The [`LayerSpec`] for this activation.
    pub fn layer_spec(&self) -> LayerSpec {
        LayerSpec::Activation {
            name: self.name().to_string(),
        }
    }
}

/// Activation Layer Wrapper.
#[derive(Module, Debug)]
#[non_exhaustive]
pub enum Activation<B: Backend> {
    /// [`Relu`] activation layer.
    Relu(Relu),

    /// [`LeakyRelu`] activation layer.
    LeakyRelu(LeakyRelu),

    /// [`PRelu`] activation layer.
    PRelu(PRelu<B>),

    /// [`Gelu`] activation layer.
    Gelu(Gelu),

    /// [`Tanh`] activation layer.
    Tanh(Tanh),

    /// [`Sigmoid`] activation layer.
    Sigmoid(Sigmoid),

    /// [`Softmax`] activation layer.
    Softmax(Softmax),
}

impl<B: Backend> Activation<B> {
    /// Forward pass.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn forward<const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        match self {
            Activation::Relu(layer) => layer.forward(input),
            Activation::LeakyRelu(layer) => layer.forward(input),
            Activation::PRelu(layer) => layer.forward(input),
            Activation::Gelu(layer) => layer.forward(input),
            Activation::Tanh(layer) => layer.forward(input),
            Activation::Sigmoid(layer) => layer.forward(input),
            Activation::Softmax(layer) => layer.forward(input),
        }
    }

    /// Build a [`ActivationConfig`] for this module.
    pub fn to_config(&self) -> ActivationConfig {
        match self {
            Activation::Relu(_) => ActivationConfig::Relu,
            Activation::LeakyRelu(layer) => LeakyReluConfig::new()
                .with_negative_slope(layer.negative_slope)
                .into(),
            Activation::PRelu(layer) => PReluConfig::new()
                .with_alpha(layer.alpha_value)
                .with_num_parameters(layer.alpha.dims()[0])
                .into(),
            Activation::Gelu(_) => ActivationConfig::Gelu,
            Activation::Tanh(_) => ActivationConfig::Tanh,
            Activation::Sigmoid(_) => ActivationConfig::Sigmoid,
            Activation::Softmax(_) => ActivationConfig::Softmax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::activation::{relu, sigmoid};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_relu() {
        let device = Default::default();
        let input: Tensor<TestBackend, 2> =
            Tensor::from_floats([[-1.0, 0.5], [2.0, -3.0]], &device);

        let layer: Activation<TestBackend> = ActivationConfig::Relu.init(&device);
        let output = layer.forward(input.clone());
        output
            .to_data()
            .assert_eq(&relu(input).to_data(), true);

        assert!(matches!(layer.to_config(), ActivationConfig::Relu));
    }

    #[test]
    fn test_sigmoid() {
        let device = Default::default();
        let input: Tensor<TestBackend, 4> = Tensor::zeros([1, 2, 3, 3], &device);

        let layer: Activation<TestBackend> = ActivationConfig::Sigmoid.init(&device);
        let output = layer.forward(input.clone());
        output
            .to_data()
            .assert_eq(&sigmoid(input).to_data(), true);
    }

    #[test]
    fn test_leaky_relu_to_config() {
        let device = Default::default();
        let config: ActivationConfig = LeakyReluConfig::new().with_negative_slope(0.2).into();
        let layer: Activation<TestBackend> = config.init(&device);

        match layer.to_config() {
            ActivationConfig::LeakyRelu(inner) => assert_eq!(inner.negative_slope, 0.2),
            other => panic!("Unexpected config: {other:?}"),
        }
    }

    #[test]
    fn test_layer_spec() {
        assert_eq!(
            ActivationConfig::default().layer_spec(),
            LayerSpec::Activation {
                name: "Relu".to_string()
            }
        );
        assert_eq!(ActivationConfig::Softmax.name(), "Softmax");
    }
}
