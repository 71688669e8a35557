//! # Bottleneck Block for `ResNet`
//!
//! [`BottleneckBlock`] is the three-conv `ResNet` unit used by the 50, 101
//! and 152 layer models:
//!
//! ```text
//! 1x1 conv -> norm -> act -> 3x3/stride conv -> norm -> act
//!   -> 1x1 conv (planes * 4) -> norm -> + shortcut(input) -> act
//! ```
//!
//! The shortcut is the identity when the shape is unchanged, and a strided
//! 1x1 conv/norm projection otherwise.
//!
//! [`BottleneckBlockMeta`] defines a common meta API for [`BottleneckBlock`]
//! and [`BottleneckBlockConfig`].

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

/// Channel expansion of [`BottleneckBlock`].
pub const BOTTLENECK_BLOCK_EXPANSION: usize = 4;

/// [`BottleneckBlock`] Meta trait.
pub trait BottleneckBlockMeta {
    /// The number of input feature planes.
    fn in_planes(&self) -> usize;

    /// The internal (pinched) planes.
    fn planes(&self) -> usize;

    /// The stride of the 3x3 conv.
    fn stride(&self) -> usize;

    /// Control factor for `out_planes()`.
    fn expansion_factor(&self) -> usize {
        BOTTLENECK_BLOCK_EXPANSION
    }

    /// The number of output feature planes.
    ///
    /// ``out_planes = planes * expansion_factor``
    fn out_planes(&self) -> usize {
        self.planes() * self.expansion_factor()
    }

    /// Does the block carry a projection shortcut?
    fn has_projection(&self) -> bool {
        needs_projection(self.in_planes(), self.out_planes(), self.stride())
    }

    /// Get the output resolution for a given input resolution.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` for an empty input.
    fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        maybe_window_output_resolution(input_resolution, 3, self.stride(), 1)
    }
}

/// [`BottleneckBlock`] Config.
///
/// Implements [`BottleneckBlockMeta`].
#[derive(Config, Debug)]
pub struct BottleneckBlockConfig {
    /// The number of input feature planes.
    pub in_planes: usize,

    /// The internal planes; ``out_planes = planes * 4``.
    pub planes: usize,

    /// The stride of the 3x3 conv and the projection.
    #[config(default = 1)]
    pub stride: usize,

    /// [`crate::layers::activation::Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub activation: ActivationConfig,
}

impl BottleneckBlockMeta for BottleneckBlockConfig {
    fn in_planes(&self) -> usize {
        self.in_planes
    }

    fn planes(&self) -> usize {
        self.planes
    }

    fn stride(&self) -> usize {
        self.stride
    }
}

impl BottleneckBlockConfig {
    fn cna_configs(&self) -> [CNA2dConfig; 3] {
        let planes = self.planes();
        let act = self.activation.clone();
        [
            CNA2dConfig::new(
                Conv2dConfig::new([self.in_planes(), planes], square(1))
                    .with_bias(false)
                    .into(),
            )
            .with_act(act.clone()),
            CNA2dConfig::new(
                Conv2dConfig::new([planes, planes], square(3))
                    .with_stride(square(self.stride()))
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .with_bias(false)
                    .into(),
            )
            .with_act(act.clone()),
            CNA2dConfig::new(
                Conv2dConfig::new([planes, self.out_planes()], square(1))
                    .with_bias(false)
                    .into(),
            )
            .with_act(act),
        ]
    }

    fn projection_config(&self) -> Option<ConvNorm2dConfig> {
        if self.has_projection() {
            Some(projection_config(
                self.in_planes(),
                self.out_planes(),
                self.stride(),
            ))
        } else {
            None
        }
    }

    /// The [`LayerSpec`]s of the block, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        let [cna1, cna2, cna3] = self.cna_configs();

        let mut specs = cna1.layer_specs();
        specs.extend(cna2.layer_specs());
        specs.extend(cna3.conv_norm.layer_specs());
        if let Some(projection) = self.projection_config() {
            specs.push(LayerSpec::Projection {
                in_channels: projection.in_channels(),
                out_channels: projection.out_channels(),
                stride: projection.stride()[0],
            });
        }
        specs.push(LayerSpec::ResidualAdd);
        specs.push(cna3.act.layer_spec());
        specs
    }

    /// Initialize a [`BottleneckBlock`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> BottleneckBlock<B> {
        let [cna1, cna2, cna3] = self.cna_configs();
        BottleneckBlock {
            projection: self.projection_config().map(|cfg| cfg.init(device)),
            cna1: cna1.init(device),
            cna2: cna2.init(device),
            cna3: cna3.init(device),
        }
    }
}

/// Bottleneck Block for `ResNet`.
///
/// Implements [`BottleneckBlockMeta`].
#[derive(Module, Debug)]
pub struct BottleneckBlock<B: Backend> {
    /// Optional projection shortcut.
    pub projection: Option<ConvNorm2d<B>>,

    /// 1x1 reducing Conv/Norm/Act.
    pub cna1: CNA2d<B>,

    /// 3x3 strided Conv/Norm/Act.
    pub cna2: CNA2d<B>,

    /// 1x1 expanding Conv/Norm; the activation follows the shortcut add.
    pub cna3: CNA2d<B>,
}

impl<B: Backend> BottleneckBlockMeta for BottleneckBlock<B> {
    fn in_planes(&self) -> usize {
        self.cna1.in_channels()
    }

    fn planes(&self) -> usize {
        self.cna1.out_channels()
    }

    fn stride(&self) -> usize {
        self.cna2.stride()[0]
    }

    fn out_planes(&self) -> usize {
        self.cna3.out_channels()
    }

    fn has_projection(&self) -> bool {
        self.projection.is_some()
    }
}

impl<B: Backend> BottleneckBlock<B> {
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
    /// A ``[batch, out_planes=planes*4, out_height, out_width]`` tensor.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        static INPUT_CONTRACT: ShapeContract = shape_contract![
            "batch",
            "in_planes",
            "in_height",
            "in_width",
        ];
        let [batch] = INPUT_CONTRACT.unpack_shape(
            &input,
            &["batch"],
            &[("in_planes", self.in_planes())],
        );

        let identity = self.shortcut(input.clone());

        let x = self.cna1.forward(input);
        let x = self.cna2.forward(x);
        let x = self.cna3.hook_forward(x, |x| x + identity);

        run_every_nth!({
            static OUTPUT_CONTRACT: ShapeContract = shape_contract![
                "batch",
                "out_planes",
                "out_height",
                "out_width",
            ];
            OUTPUT_CONTRACT.assert_shape(
                &x,
                &[("batch", batch), ("out_planes", self.out_planes())],
            );
        });

        x
    }
}
