//! # VGG Feature Extractor
//!
//! [`VggFeaturesConfig`] expands a width table into a flat sequence of
//! [`VggLayer`]s: 3x3 conv/norm/act stages, and 2x2 max-pools.

use crate::layers::activation::ActivationConfig;
use crate::layers::blocks::cna::{CNA2d, CNA2dConfig};
use crate::layers::layer_spec::LayerSpec;
use crate::models::vgg::width_table::WidthEntry;
use crate::utility::shape::{maybe_window_output_resolution, square};
use anyhow::bail;
use bimm_contracts::{ShapeContract, run_every_nth, shape_contract};
use burn::module::Module;
use burn::nn::PaddingConfig2d;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::prelude::{Backend, Config, Tensor};

/// Square kernel of every VGG conv.
pub const VGG_CONV_KERNEL: usize = 3;

/// Square window and stride of every VGG max-pool.
pub const VGG_POOL_SIZE: usize = 2;

/// [`VggLayer`] Config.
#[derive(Config, Debug)]
pub enum VggLayerConfig {
    /// A conv/norm/act stage.
    Conv(CNA2dConfig),

    /// A max-pool.
    Pool(MaxPool2dConfig),
}

impl VggLayerConfig {
    /// Predict ``[out_height, out_width]``.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` if the window does not fit.
    pub fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        match self {
            Self::Conv(config) => config.conv_norm.maybe_output_resolution(input_resolution),
            Self::Pool(_) => {
                maybe_window_output_resolution(input_resolution, VGG_POOL_SIZE, VGG_POOL_SIZE, 0)
            }
        }
    }

    /// The [`LayerSpec`]s of this layer.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        match self {
            Self::Conv(config) => config.layer_specs(),
            Self::Pool(_) => vec![LayerSpec::MaxPool2d {
                kernel_size: VGG_POOL_SIZE,
                stride: VGG_POOL_SIZE,
            }],
        }
    }

    /// Initialize a [`VggLayer`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> VggLayer<B> {
        match self {
            Self::Conv(config) => VggLayer::Conv(config.init(device)),
            Self::Pool(config) => VggLayer::Pool(config.init()),
        }
    }
}

/// One layer of a VGG feature extractor.
#[derive(Module, Debug)]
pub enum VggLayer<B: Backend> {
    /// A conv/norm/act stage.
    Conv(CNA2d<B>),

    /// A max-pool.
    Pool(MaxPool2d),
}

impl<B: Backend> VggLayer<B> {
    /// Forward pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            Self::Conv(layer) => layer.forward(input),
            Self::Pool(layer) => layer.forward(input),
        }
    }
}

/// [`VggFeatures`] Config.
#[derive(Config, Debug)]
pub struct VggFeaturesConfig {
    /// The width table.
    pub widths: Vec<WidthEntry>,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Activation following every conv/norm.
    #[config(default = "ActivationConfig::Relu")]
    pub activation: ActivationConfig,
}

impl VggFeaturesConfig {
    /// Check if the config is valid.
    pub fn try_validate(&self) -> anyhow::Result<()> {
        if self.in_channels == 0 {
            bail!("in_channels must be > 0");
        }
        if self.widths.is_empty() {
            bail!("widths is empty");
        }
        if let Some(idx) = self
            .widths
            .iter()
            .position(|entry| *entry == WidthEntry::Conv(0))
        {
            bail!("widths[{idx}] is a zero-width conv");
        }
        if self.conv_count() == 0 {
            bail!("widths has no conv entries");
        }
        Ok(())
    }

    /// Panic if `try_validate` returns an error.
    pub fn expect_valid(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}\n{self:#?}");
        }
    }

    /// Number of conv stages.
    pub fn conv_count(&self) -> usize {
        self.widths
            .iter()
            .filter(|entry| matches!(entry, WidthEntry::Conv(_)))
            .count()
    }

    /// Number of max-pools.
    pub fn pool_count(&self) -> usize {
        self.widths.len() - self.conv_count()
    }

    /// Channels of the final feature map.
    pub fn out_channels(&self) -> usize {
        self.widths
            .iter()
            .rev()
            .find_map(|entry| match entry {
                WidthEntry::Conv(width) => Some(*width),
                WidthEntry::MaxPool => None,
            })
            .unwrap_or(self.in_channels)
    }

    /// Expand the width table into per-layer configs.
    pub fn layer_configs(&self) -> Vec<VggLayerConfig> {
        let mut in_channels = self.in_channels;
        self.widths
            .iter()
            .map(|entry| match entry {
                WidthEntry::Conv(width) => {
                    let conv = Conv2dConfig::new([in_channels, *width], square(VGG_CONV_KERNEL))
                        .with_padding(PaddingConfig2d::Explicit(1, 1))
                        .with_bias(false);
                    in_channels = *width;
                    VggLayerConfig::Conv(
                        CNA2dConfig::from(conv).with_act(self.activation.clone()),
                    )
                }
                WidthEntry::MaxPool => VggLayerConfig::Pool(
                    MaxPool2dConfig::new(square(VGG_POOL_SIZE))
                        .with_strides(square(VGG_POOL_SIZE)),
                ),
            })
            .collect()
    }

    /// Predict ``[out_height, out_width]`` of the final feature map.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` if a pool runs out of input.
    pub fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        self.layer_configs()
            .iter()
            .try_fold(input_resolution, |resolution, layer| {
                layer.maybe_output_resolution(resolution)
            })
    }

    /// The [`LayerSpec`]s of every layer, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        self.layer_configs()
            .iter()
            .flat_map(|layer| layer.layer_specs())
            .collect()
    }

    /// Initialize a [`VggFeatures`].
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> VggFeatures<B> {
        self.expect_valid();

        VggFeatures {
            in_channels: self.in_channels,
            out_channels: self.out_channels(),
            layers: self
                .layer_configs()
                .into_iter()
                .map(|c| c.init(device))
                .collect(),
        }
    }
}

/// VGG feature extractor.
#[derive(Module, Debug)]
pub struct VggFeatures<B: Backend> {
    /// The layers, in forward order.
    pub layers: Vec<VggLayer<B>>,

    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> VggFeatures<B> {
    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Number of max-pool layers.
    pub fn pool_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|layer| matches!(layer, VggLayer::Pool(_)))
            .count()
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
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
            "height",
            "width",
        ];
        let [batch] = INPUT_CONTRACT.unpack_shape(
            &input,
            &["batch"],
            &[("in_channels", self.in_channels)],
        );

        let x = self.layers.iter().fold(input, |x, layer| layer.forward(x));

        run_every_nth!({
            static OUTPUT_CONTRACT: ShapeContract = shape_contract![
                "batch",
                "out_channels",
                "out_height",
                "out_width",
            ];
            OUTPUT_CONTRACT.assert_shape(
                &x,
                &[("batch", batch), ("out_channels", self.out_channels)],
            );
        });

        x
    }
}
