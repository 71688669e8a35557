//! # `CNA2d` - conv/norm/activation block.
//!
//! A [`CNA2d`] module is:
//! * a [`ConvNorm2d`] (conv + batch norm) layer,
//! * an [`Activation`] layer.
//!
//! With support for hooking the forward method,
//! to run code between the norm and activation layers;
//! which is where residual blocks add their shortcut.

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::blocks::conv_norm::{ConvNorm2d, ConvNorm2dConfig, ConvNorm2dMeta};
use crate::layers::layer_spec::LayerSpec;
use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::prelude::{Backend, Tensor};

/// [`CNA2d`] Config.
#[derive(Config, Debug)]
pub struct CNA2dConfig {
    /// The conv/norm config.
    pub conv_norm: ConvNorm2dConfig,

    /// The [`Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub act: ActivationConfig,
}

impl From<Conv2dConfig> for CNA2dConfig {
    fn from(conv: Conv2dConfig) -> Self {
        Self::new(conv.into())
    }
}

impl ConvNorm2dMeta for CNA2dConfig {
    fn in_channels(&self) -> usize {
        self.conv_norm.in_channels()
    }

    fn out_channels(&self) -> usize {
        self.conv_norm.out_channels()
    }

    fn stride(&self) -> [usize; 2] {
        self.conv_norm.stride()
    }
}

impl CNA2dConfig {
    /// Predict ``[out_height, out_width]`` for an input resolution.
    ///
    /// # Panics
    ///
    /// If the conv window does not fit the input.
    pub fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        self.conv_norm.output_resolution(input_resolution)
    }

    /// The conv, norm, and activation [`LayerSpec`]s.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        let mut specs = self.conv_norm.layer_specs();
        specs.push(self.act.layer_spec());
        specs
    }

    /// Initialize a [`CNA2d`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> CNA2d<B> {
        CNA2d {
            act: self.act.init(device),
            conv_norm: self.conv_norm.init(device),
        }
    }
}

/// Sequenced conv/norm/activation block.
#[derive(Module, Debug)]
pub struct CNA2d<B: Backend> {
    /// Conv/norm layers.
    pub conv_norm: ConvNorm2d<B>,

    /// Activation layer.
    pub act: Activation<B>,
}

impl<B: Backend> ConvNorm2dMeta for CNA2d<B> {
    fn in_channels(&self) -> usize {
        self.conv_norm.in_channels()
    }

    fn out_channels(&self) -> usize {
        self.conv_norm.out_channels()
    }

    fn stride(&self) -> [usize; 2] {
        self.conv_norm.stride()
    }
}

impl<B: Backend> CNA2d<B> {
    /// Forward Pass.
    ///
    /// ```rust,ignore
    /// let x = self.conv_norm.forward(input);
    /// let x = self.act.forward(x);
    /// ```
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.hook_forward(input, |x| x)
    }

    /// Hooked Forward Pass.
    ///
    /// Applies the hook after normalization but before activation.
    ///
    /// ```rust,ignore
    /// let x = self.conv_norm.forward(input);
    /// let x = hook(x);
    /// let x = self.act.forward(x);
    /// ```
    pub fn hook_forward<F>(
        &self,
        input: Tensor<B, 4>,
        hook: F,
    ) -> Tensor<B, 4>
    where
        F: FnOnce(Tensor<B, 4>) -> Tensor<B, 4>,
    {
        let x = self.conv_norm.forward(input);
        let x = hook(x);
        self.act.forward(x)
    }
}
