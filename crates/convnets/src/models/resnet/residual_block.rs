//! # Residual Block Wrapper
//!
//! [`ResidualBlockConfig`] / [`ResidualBlock`] wrap the two block forms,
//! so a stage can be built from a [`ResidualBlockKind`].

use crate::layers::activation::ActivationConfig;
use crate::layers::layer_spec::LayerSpec;
use crate::models::resnet::basic_block::{
    BASIC_BLOCK_EXPANSION, BasicBlock, BasicBlockConfig, BasicBlockMeta,
};
use crate::models::resnet::bottleneck_block::{
    BOTTLENECK_BLOCK_EXPANSION, BottleneckBlock, BottleneckBlockConfig, BottleneckBlockMeta,
};
use burn::config::Config;
use burn::prelude::{Backend, Module, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The block form used by a `ResNet` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidualBlockKind {
    /// Two 3x3 convs; expansion 1.
    Basic,

    /// 1x1 / 3x3 / 1x1 convs; expansion 4.
    Bottleneck,
}

impl ResidualBlockKind {
    /// Channel expansion factor of the block form.
    pub fn expansion_factor(&self) -> usize {
        match self {
            Self::Basic => BASIC_BLOCK_EXPANSION,
            Self::Bottleneck => BOTTLENECK_BLOCK_EXPANSION,
        }
    }
}

impl Display for ResidualBlockKind {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Bottleneck => write!(f, "bottleneck"),
        }
    }
}

/// [`ResidualBlock`] Meta API.
pub trait ResidualBlockMeta {
    /// The number of input feature planes.
    fn in_planes(&self) -> usize;

    /// The number of output feature planes.
    fn out_planes(&self) -> usize;

    /// The stride of the block.
    fn stride(&self) -> usize;

    /// Get the output resolution for a given input resolution.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` if the block does not fit.
    fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]>;
}

/// [`ResidualBlock`] Config.
#[derive(Config, Debug)]
pub enum ResidualBlockConfig {
    /// A `ResNet` [`BasicBlock`].
    Basic(BasicBlockConfig),

    /// A `ResNet` [`BottleneckBlock`].
    Bottleneck(BottleneckBlockConfig),
}

impl From<BasicBlockConfig> for ResidualBlockConfig {
    fn from(config: BasicBlockConfig) -> Self {
        Self::Basic(config)
    }
}

impl From<BottleneckBlockConfig> for ResidualBlockConfig {
    fn from(config: BottleneckBlockConfig) -> Self {
        Self::Bottleneck(config)
    }
}

impl ResidualBlockMeta for ResidualBlockConfig {
    fn in_planes(&self) -> usize {
        match self {
            Self::Basic(config) => config.in_planes(),
            Self::Bottleneck(config) => config.in_planes(),
        }
    }

    fn out_planes(&self) -> usize {
        match self {
            Self::Basic(config) => config.out_planes(),
            Self::Bottleneck(config) => config.out_planes(),
        }
    }

    fn stride(&self) -> usize {
        match self {
            Self::Basic(config) => config.stride(),
            Self::Bottleneck(config) => config.stride(),
        }
    }

    fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        match self {
            Self::Basic(config) => config.maybe_output_resolution(input_resolution),
            Self::Bottleneck(config) => config.maybe_output_resolution(input_resolution),
        }
    }
}

impl ResidualBlockConfig {
    /// Build a block of the given kind.
    ///
    /// # Arguments
    ///
    /// - `kind`: the block form.
    /// - `in_planes`: input channels.
    /// - `planes`: base width; the block emits ``planes * kind.expansion_factor()``.
    /// - `stride`: the block stride.
    pub fn build(
        kind: ResidualBlockKind,
        in_planes: usize,
        planes: usize,
        stride: usize,
    ) -> Self {
        match kind {
            ResidualBlockKind::Basic => BasicBlockConfig::new(in_planes, planes)
                .with_stride(stride)
                .into(),
            ResidualBlockKind::Bottleneck => BottleneckBlockConfig::new(in_planes, planes)
                .with_stride(stride)
                .into(),
        }
    }

    /// The block form.
    pub fn kind(&self) -> ResidualBlockKind {
        match self {
            Self::Basic(_) => ResidualBlockKind::Basic,
            Self::Bottleneck(_) => ResidualBlockKind::Bottleneck,
        }
    }

    /// Set the basic block skip connection; no-op for bottleneck blocks.
    pub fn with_skip_connection(
        self,
        skip_connection: bool,
    ) -> Self {
        match self {
            Self::Basic(config) => config.with_skip_connection(skip_connection).into(),
            other => other,
        }
    }

    /// Set the activation of every conv/norm/act stage in the block.
    pub fn with_activation(
        self,
        activation: ActivationConfig,
    ) -> Self {
        match self {
            Self::Basic(config) => config.with_activation(activation).into(),
            Self::Bottleneck(config) => config.with_activation(activation).into(),
        }
    }

    /// The [`LayerSpec`]s of the block, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        match self {
            Self::Basic(config) => config.layer_specs(),
            Self::Bottleneck(config) => config.layer_specs(),
        }
    }

    /// Initialize a [`ResidualBlock`].
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ResidualBlock<B> {
        match self {
            Self::Basic(config) => ResidualBlock::Basic(config.clone().init(device)),
            Self::Bottleneck(config) => ResidualBlock::Bottleneck(config.clone().init(device)),
        }
    }
}

/// A `ResNet` [`BasicBlock`] or [`BottleneckBlock`] wrapper.
#[derive(Module, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum ResidualBlock<B: Backend> {
    /// A `ResNet` [`BasicBlock`].
    Basic(BasicBlock<B>),

    /// A `ResNet` [`BottleneckBlock`].
    Bottleneck(BottleneckBlock<B>),
}

impl<B: Backend> From<BasicBlock<B>> for ResidualBlock<B> {
    fn from(block: BasicBlock<B>) -> Self {
        Self::Basic(block)
    }
}

impl<B: Backend> From<BottleneckBlock<B>> for ResidualBlock<B> {
    fn from(block: BottleneckBlock<B>) -> Self {
        Self::Bottleneck(block)
    }
}

impl<B: Backend> ResidualBlockMeta for ResidualBlock<B> {
    fn in_planes(&self) -> usize {
        match self {
            Self::Basic(block) => block.in_planes(),
            Self::Bottleneck(block) => block.in_planes(),
        }
    }

    fn out_planes(&self) -> usize {
        match self {
            Self::Basic(block) => block.out_planes(),
            Self::Bottleneck(block) => block.out_planes(),
        }
    }

    fn stride(&self) -> usize {
        match self {
            Self::Basic(block) => block.stride(),
            Self::Bottleneck(block) => block.stride(),
        }
    }

    fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        match self {
            Self::Basic(block) => block.maybe_output_resolution(input_resolution),
            Self::Bottleneck(block) => block.maybe_output_resolution(input_resolution),
        }
    }
}

impl<B: Backend> ResidualBlock<B> {
    /// The block form.
    pub fn kind(&self) -> ResidualBlockKind {
        match self {
            Self::Basic(_) => ResidualBlockKind::Basic,
            Self::Bottleneck(_) => ResidualBlockKind::Bottleneck,
        }
    }

    /// Forward Pass.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match self {
            Self::Basic(block) => block.forward(input),
            Self::Bottleneck(block) => block.forward(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_residual_block_kind() {
        assert_eq!(ResidualBlockKind::Basic.expansion_factor(), 1);
        assert_eq!(ResidualBlockKind::Bottleneck.expansion_factor(), 4);
        assert_eq!(ResidualBlockKind::Bottleneck.to_string(), "bottleneck");
    }

    #[test]
    fn test_build() {
        let basic = ResidualBlockConfig::build(ResidualBlockKind::Basic, 64, 128, 2);
        assert_eq!(basic.kind(), ResidualBlockKind::Basic);
        assert_eq!(basic.in_planes(), 64);
        assert_eq!(basic.out_planes(), 128);
        assert_eq!(basic.stride(), 2);
        assert_eq!(basic.maybe_output_resolution([108, 108]), Some([53, 53]));

        let bottleneck = ResidualBlockConfig::build(ResidualBlockKind::Bottleneck, 256, 128, 2);
        assert_eq!(bottleneck.kind(), ResidualBlockKind::Bottleneck);
        assert_eq!(bottleneck.out_planes(), 512);
        assert_eq!(bottleneck.maybe_output_resolution([56, 56]), Some([28, 28]));

        // Skip connection only applies to basic blocks.
        match basic.with_skip_connection(true) {
            ResidualBlockConfig::Basic(config) => assert!(config.skip_connection),
            other => panic!("Unexpected block: {other:?}"),
        }
        assert!(matches!(
            bottleneck.clone().with_skip_connection(true),
            ResidualBlockConfig::Bottleneck(_)
        ));

        match bottleneck.with_activation(ActivationConfig::Gelu) {
            ResidualBlockConfig::Bottleneck(config) => {
                assert!(matches!(config.activation, ActivationConfig::Gelu))
            }
            other => panic!("Unexpected block: {other:?}"),
        }
    }

    #[test]
    fn test_residual_block_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        for kind in [ResidualBlockKind::Basic, ResidualBlockKind::Bottleneck] {
            let config = ResidualBlockConfig::build(kind, 4, 2, 1);
            let expected_resolution = config.maybe_output_resolution([7, 7]).unwrap();

            let block: ResidualBlock<B> = config.init(&device);
            assert_eq!(block.kind(), kind);
            assert_eq!(block.in_planes(), 4);
            assert_eq!(block.out_planes(), 2 * kind.expansion_factor());

            let output = block.forward(Tensor::ones([1, 4, 7, 7], &device));
            assert_eq!(
                output.dims(),
                [
                    1,
                    block.out_planes(),
                    expected_resolution[0],
                    expected_resolution[1]
                ]
            );
        }
    }
}
