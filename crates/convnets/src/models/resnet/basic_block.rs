//! # Basic Block for `ResNet`
//!
//! [`BasicBlock`] is the two-conv `ResNet` unit used by the 18 and 34 layer
//! models.
//!
//! [`BasicBlockMeta`] defines a common meta API for [`BasicBlock`]
//! and [`BasicBlockConfig`].
//!
//! [`BasicBlockConfig`] implements [`Config`], and provides
//! [`BasicBlockConfig::init`] to initialize a [`BasicBlock`].
//!
//! ## Shortcut behavior
//!
//! By default the block reproduces the reference model weights layout:
//! the first 3x3 conv is unpadded, a 1x1 projection is constructed whenever
//! the shape changes, and the forward pass returns the two-conv path
//! without adding the shortcut.
//!
//! With [`BasicBlockConfig::skip_connection`] set, the block is the standard
//! residual unit: the first conv is padded, the projection follows the block
//! stride, and the (projected) input is added before the final activation.

use crate::layers::activation::ActivationConfig;
use crate::layers::blocks::cna::{CNA2d, CNA2dConfig};
use crate::layers::blocks::conv_norm::{ConvNorm2d, ConvNorm2dConfig, ConvNorm2dMeta};
use crate::layers::layer_spec::LayerSpec;
use crate::models::resnet::util::{needs_projection, projection_config};
use crate::utility::shape::{maybe_window_output_resolution, square};
use bimm_contracts::{ShapeContract, run_every_nth, shape_contract};
use burn::nn::PaddingConfig2d;
use burn::nn::conv::Conv2dConfig;
use burn::prelude::{Backend, Config, Module, Tensor};

/// Channel expansion of [`BasicBlock`].
pub const BASIC_BLOCK_EXPANSION: usize = 1;

/// [`BasicBlock`] Meta trait.
pub trait BasicBlockMeta {
    /// The size of the in channels dimension.
    fn in_planes(&self) -> usize;

    /// The base channel width.
    fn planes(&self) -> usize;

    /// The stride of the first convolution.
    fn stride(&self) -> usize;

    /// Is the shortcut added to the main path?
    fn skip_connection(&self) -> bool;

    /// Control factor for `out_planes()`.
    fn expansion_factor(&self) -> usize {
        BASIC_BLOCK_EXPANSION
    }

    /// The size of the out channels dimension.
    ///
    /// ``out_planes = planes * expansion_factor``
    fn out_planes(&self) -> usize {
        self.planes() * self.expansion_factor()
    }

    /// Padding of the first convolution.
    fn first_padding(&self) -> usize {
        if self.skip_connection() { 1 } else { 0 }
    }

    /// Does the block carry a projection shortcut?
    fn has_projection(&self) -> bool {
        needs_projection(self.in_planes(), self.out_planes(), self.stride())
    }

    /// Get the output resolution for a given input resolution.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` if the first conv does not fit.
    fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        // The second conv is padded; only the first changes the resolution.
        maybe_window_output_resolution(input_resolution, 3, self.stride(), self.first_padding())
    }
}

/// [`BasicBlock`] Config.
///
/// Implements [`BasicBlockMeta`].
#[derive(Config, Debug)]
pub struct BasicBlockConfig {
    /// The size of the in channels dimension.
    pub in_planes: usize,

    /// The base channel width; ``out_planes = planes``.
    pub planes: usize,

    /// The stride of the first conv.
    #[config(default = 1)]
    pub stride: usize,

    /// Add the shortcut to the main path.
    #[config(default = "false")]
    pub skip_connection: bool,

    /// [`crate::layers::activation::Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub activation: ActivationConfig,
}

impl BasicBlockMeta for BasicBlockConfig {
    fn in_planes(&self) -> usize {
        self.in_planes
    }

    fn planes(&self) -> usize {
        self.planes
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn skip_connection(&self) -> bool {
        self.skip_connection
    }
}

impl BasicBlockConfig {
    fn cna1_config(&self) -> CNA2dConfig {
        let padding = self.first_padding();
        CNA2dConfig::new(
            Conv2dConfig::new([self.in_planes(), self.planes()], square(3))
                .with_stride(square(self.stride()))
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .with_bias(false)
                .into(),
        )
        .with_act(self.activation.clone())
    }

    fn cna2_config(&self) -> CNA2dConfig {
        CNA2dConfig::new(
            Conv2dConfig::new([self.planes(), self.out_planes()], square(3))
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .into(),
        )
        .with_act(self.activation.clone())
    }

    fn projection_config(&self) -> Option<ConvNorm2dConfig> {
        if !self.has_projection() {
            return None;
        }
        // Without the skip connection the projection is never applied,
        // and keeps the unstrided reference layout.
        let stride = if self.skip_connection { self.stride } else { 1 };
        Some(projection_config(self.in_planes, self.out_planes(), stride))
    }

    /// The [`LayerSpec`]s of the block, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        let mut specs = self.cna1_config().layer_specs();
        let mut cna2 = self.cna2_config().layer_specs();
        let act = cna2.pop();

        specs.extend(cna2);
        if let Some(projection) = self.projection_config() {
            specs.push(LayerSpec::Projection {
                in_channels: projection.in_channels(),
                out_channels: projection.out_channels(),
                stride: projection.stride()[0],
            });
        }
        if self.skip_connection {
            specs.push(LayerSpec::ResidualAdd);
        }
        specs.extend(act);
        specs
    }

    /// Initialize a [`BasicBlock`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> BasicBlock<B> {
        BasicBlock {
            projection: self.projection_config().map(|cfg| cfg.init(device)),
            cna1: self.cna1_config().init(device),
            cna2: self.cna2_config().init(device),
            skip_connection: self.skip_connection,
        }
    }
}

/// Basic Block for `ResNet`.
///
/// Implements [`BasicBlockMeta`].
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    /// Optional projection shortcut.
    pub projection: Option<ConvNorm2d<B>>,

    /// First Conv/Norm/Act Block.
    pub cna1: CNA2d<B>,

    /// Second Conv/Norm/Act Block.
    pub cna2: CNA2d<B>,

    /// Is the shortcut added to the main path?
    pub skip_connection: bool,
}

impl<B: Backend> BasicBlockMeta for BasicBlock<B> {
    fn in_planes(&self) -> usize {
        self.cna1.in_channels()
    }

    fn planes(&self) -> usize {
        self.cna1.out_channels()
    }

    fn stride(&self) -> usize {
        self.cna1.stride()[0]
    }

    fn skip_connection(&self) -> bool {
        self.skip_connection
    }

    fn out_planes(&self) -> usize {
        self.cna2.out_channels()
    }

    fn has_projection(&self) -> bool {
        self.projection.is_some()
    }
}

impl<B: Backend> BasicBlock<B> {
    /// Apply the shortcut path to the block input.
    ///
    /// Identity when the block has no projection.
    pub fn shortcut(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match &self.projection {
            Some(projection) => projection.forward(input),
            None => input,
        }
    }

    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_planes, in_height, in_width]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, out_planes, out_height, out_width]`` tensor.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        run_every_nth!({
            static INPUT_CONTRACT: ShapeContract = shape_contract![
                "batch",
                "in_planes",
                "in_height",
                "in_width",
            ];
            INPUT_CONTRACT.assert_shape(&input, &[("in_planes", self.in_planes())]);
        });

        if !self.skip_connection {
            let x = self.cna1.forward(input);
            return self.cna2.forward(x);
        }

        let identity = self.shortcut(input.clone());
        let x = self.cna1.forward(input);
        self.cna2.hook_forward(x, |x| x + identity)
    }
}
