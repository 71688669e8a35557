//! # `ConvNorm2d` Module
//!
//! A [`ConvNorm2d`] module is a [`Conv2d`] layer followed by a [`BatchNorm`] layer.
//!
//! Used directly for residual projections, and as the body of
//! [`crate::layers::blocks::cna::CNA2d`].

use crate::layers::layer_spec::LayerSpec;
use crate::utility::shape::{expect_window_output_resolution, maybe_window_output_resolution};
use bimm_contracts::{ShapeContract, run_every_nth, shape_contract};
use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, PaddingConfig2d};
use burn::prelude::{Backend, Tensor};

/// [`ConvNorm2d`] Meta.
pub trait ConvNorm2dMeta {
    /// Number of input channels.
    fn in_channels(&self) -> usize;

    /// Number of output channels.
    fn out_channels(&self) -> usize;

    /// Get the stride.
    fn stride(&self) -> [usize; 2];
}

/// [`ConvNorm2d`] Config.
///
/// The norm layer is always sized to the conv output channels.
#[derive(Config, Debug)]
pub struct ConvNorm2dConfig {
    /// The [`Conv2d`] config.
    pub conv: Conv2dConfig,
}

impl ConvNorm2dMeta for ConvNorm2dConfig {
    fn in_channels(&self) -> usize {
        self.conv.channels[0]
    }

    fn out_channels(&self) -> usize {
        self.conv.channels[1]
    }

    fn stride(&self) -> [usize; 2] {
        self.conv.stride
    }
}

impl From<Conv2dConfig> for ConvNorm2dConfig {
    fn from(conv: Conv2dConfig) -> Self {
        Self { conv }
    }
}

impl ConvNorm2dConfig {
    /// Symmetric padding of the conv.
    pub fn padding(&self) -> usize {
        match &self.conv.padding {
            PaddingConfig2d::Explicit(height, _) => *height,
            PaddingConfig2d::Same => self.conv.kernel_size[0] / 2,
            PaddingConfig2d::Valid => 0,
        }
    }

    /// Predict ``[out_height, out_width]`` for an input resolution.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` if the conv window does not fit.
    pub fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        maybe_window_output_resolution(
            input_resolution,
            self.conv.kernel_size[0],
            self.conv.stride[0],
            self.padding(),
        )
    }

    /// Predict ``[out_height, out_width]`` for an input resolution.
    ///
    /// # Panics
    ///
    /// If the conv window does not fit the input.
    pub fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        expect_window_output_resolution(
            input_resolution,
            self.conv.kernel_size[0],
            self.conv.stride[0],
            self.padding(),
        )
    }

    /// The conv and norm [`LayerSpec`]s.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        vec![
            LayerSpec::from_conv2d(&self.conv),
            LayerSpec::BatchNorm2d {
                num_features: self.out_channels(),
            },
        ]
    }

    /// Initialize a [`ConvNorm2d`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ConvNorm2d<B> {
        ConvNorm2d {
            norm: BatchNormConfig::new(self.out_channels()).init(device),
            conv: self.conv.init(device),
        }
    }
}

/// Grouped [`Conv2d`] and [`BatchNorm`] layer.
#[derive(Module, Debug)]
pub struct ConvNorm2d<B: Backend> {
    /// Internal Conv2d layer.
    pub conv: Conv2d<B>,

    /// Internal Norm Layer.
    pub norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvNorm2dMeta for ConvNorm2d<B> {
    fn in_channels(&self) -> usize {
        self.conv.weight.shape().dims[1] * self.conv.groups
    }

    fn out_channels(&self) -> usize {
        self.conv.weight.shape().dims[0]
    }

    fn stride(&self) -> [usize; 2] {
        self.conv.stride
    }
}

impl<B: Backend> ConvNorm2d<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, in_height, in_width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_channels, out_height, out_width]``
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        static INPUT_CONTRACT: ShapeContract = shape_contract![
            "batch",
            "in_channels",
            "in_height",
            "in_width",
        ];
        let [batch] = INPUT_CONTRACT.unpack_shape(
            &input,
            &["batch"],
            &[("in_channels", self.in_channels())],
        );

        let x = self.conv.forward(input);
        let x = self.norm.forward(x);

        run_every_nth!({
            static OUTPUT_CONTRACT: ShapeContract = shape_contract![
                "batch",
                "out_channels",
                "out_height",
                "out_width",
            ];
            OUTPUT_CONTRACT.assert_shape(
                &x,
                &[("batch", batch), ("out_channels", self.out_channels())],
            );
        });

        x
    }
}
