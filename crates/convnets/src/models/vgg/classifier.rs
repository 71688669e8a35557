//! # VGG Classifier Head
//!
//! A stack of ``Linear -> act -> Dropout`` hidden layers, followed by a
//! final ``Linear`` projecting onto the class logits.
//!
//! Each hidden layer owns its activation.

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::layer_spec::LayerSpec;
use crate::utility::probability::{expect_probability, try_probability};
use anyhow::bail;
use bimm_contracts::{ShapeContract, shape_contract};
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PReluConfig};
use burn::prelude::{Backend, Config, Tensor};

/// Default hidden layer widths.
pub const VGG_CLASSIFIER_HIDDEN: [usize; 3] = [4096, 2048, 512];

/// Default dropout probability.
pub const VGG_CLASSIFIER_DROPOUT: f64 = 0.5;

/// [`VggClassifier`] Config.
#[derive(Config, Debug)]
pub struct VggClassifierConfig {
    /// Input features.
    pub d_input: usize,

    /// Number of classes.
    pub num_classes: usize,

    /// Hidden layer widths.
    #[config(default = "VGG_CLASSIFIER_HIDDEN.to_vec()")]
    pub hidden: Vec<usize>,

    /// Dropout probability after each hidden layer.
    #[config(default = "VGG_CLASSIFIER_DROPOUT")]
    pub dropout: f64,

    /// Activation after each hidden layer.
    #[config(default = "ActivationConfig::Relu")]
    pub activation: ActivationConfig,
}

impl VggClassifierConfig {
    /// Check if the config is valid.
    pub fn try_validate(&self) -> anyhow::Result<()> {
        if self.d_input == 0 {
            bail!("d_input must be > 0");
        }
        if self.num_classes == 0 {
            bail!("num_classes must be > 0");
        }
        if let Some(idx) = self.hidden.iter().position(|&width| width == 0) {
            bail!("hidden[{idx}] must be > 0");
        }
        try_probability(self.dropout)?;
        Ok(())
    }

    /// Panic if `try_validate` returns an error.
    pub fn expect_valid(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}\n{self:#?}");
        }
    }

    /// The ``[d_input, d_output]`` of every linear layer, head last.
    pub fn linear_dims(&self) -> Vec<[usize; 2]> {
        let mut dims = Vec::with_capacity(self.hidden.len() + 1);
        let mut d_input = self.d_input;
        for &width in &self.hidden {
            dims.push([d_input, width]);
            d_input = width;
        }
        dims.push([d_input, self.num_classes]);
        dims
    }

    /// The [`LayerSpec`]s of the head, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        let dims = self.linear_dims();
        let num_hidden = self.hidden.len();

        let mut specs = Vec::with_capacity(num_hidden * 3 + 1);
        for (idx, [d_input, d_output]) in dims.into_iter().enumerate() {
            specs.push(LayerSpec::Linear { d_input, d_output });
            if idx < num_hidden {
                specs.push(self.activation.layer_spec());
                specs.push(LayerSpec::Dropout { prob: self.dropout });
            }
        }
        specs
    }

    /// The activation config for a hidden layer of `width` features.
    ///
    /// A channel-wise [`PReluConfig`] is resized to `width`.
    pub fn hidden_activation(
        &self,
        width: usize,
    ) -> ActivationConfig {
        match &self.activation {
            ActivationConfig::PRelu(config) if config.num_parameters != 1 => {
                ActivationConfig::PRelu(config.clone().with_num_parameters(width))
            }
            other => other.clone(),
        }
    }

    /// Initialize a [`VggClassifier`].
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> VggClassifier<B> {
        self.expect_valid();

        let mut hidden = Vec::with_capacity(self.hidden.len());
        let mut acts = Vec::with_capacity(self.hidden.len());
        let mut d_input = self.d_input;
        for &width in &self.hidden {
            hidden.push(LinearConfig::new(d_input, width).init(device));
            acts.push(self.hidden_activation(width).init(device));
            d_input = width;
        }

        VggClassifier {
            hidden,
            acts,
            dropout: DropoutConfig::new(expect_probability(self.dropout)).init(),
            head: LinearConfig::new(d_input, self.num_classes).init(device),
        }
    }
}

/// VGG classifier head.
#[derive(Module, Debug)]
pub struct VggClassifier<B: Backend> {
    /// Hidden layers.
    pub hidden: Vec<Linear<B>>,

    /// One activation per hidden layer.
    pub acts: Vec<Activation<B>>,

    /// Shared hidden dropout.
    pub dropout: Dropout,

    /// Final projection onto the classes.
    pub head: Linear<B>,
}

impl<B: Backend> VggClassifier<B> {
    /// Input features.
    pub fn d_input(&self) -> usize {
        match self.hidden.first() {
            Some(linear) => linear.weight.dims()[0],
            None => self.head.weight.dims()[0],
        }
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.head.weight.dims()[1]
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, d_input]``.
    ///
    /// # Returns
    ///
    /// ``[batch, num_classes]`` logits.
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        static INPUT_CONTRACT: ShapeContract = shape_contract!["batch", "d_input"];
        let [_batch] = INPUT_CONTRACT.unpack_shape(
            &input,
            &["batch"],
            &[("d_input", self.d_input())],
        );

        let x = self
            .hidden
            .iter()
            .zip(self.acts.iter())
            .fold(input, |x, (linear, act)| {
                let x = linear.forward(x);
                let x = act.forward(x);
                self.dropout.forward(x)
            });
        self.head.forward(x)
    }
}
