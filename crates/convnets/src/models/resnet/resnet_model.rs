//! # `ResNet` Core Model
//!
//! [`ResNet`] is the core `ResNet` module.
//!
//! [`ResNetAbstractConfig`] implements [`Config`], and provides
//! a high-level configuration interface: block form, per-stage block
//! counts, and classes. It provides [`ResNetAbstractConfig::to_structure`]
//! to convert to a [`ResNetConfig`].
//!
//! [`ResNetConfig`] implements [`Config`], and provides
//! [`ResNetConfig::init`] to initialize a [`ResNet`].
//!
//! [`ResNetVariant`] names the well-known depths.

use crate::layers::activation::ActivationConfig;
use crate::layers::blocks::cna::{CNA2d, CNA2dConfig};
use crate::layers::blocks::conv_norm::ConvNorm2dMeta;
use crate::layers::layer_spec::LayerSpec;
use crate::models::resnet::layer_block::{LayerBlock, LayerBlockConfig, LayerBlockMeta};
use crate::models::resnet::residual_block::ResidualBlockKind;
use crate::utility::shape::square;
use anyhow::bail;
use bimm_contracts::{ShapeContract, run_every_nth, shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Tensor};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// ResNet-18 block depths.
pub const RESNET18_BLOCKS: [usize; 4] = [2, 2, 2, 2];
/// ResNet-34 block depths.
pub const RESNET34_BLOCKS: [usize; 4] = [3, 4, 6, 3];
/// ResNet-50 block depths.
pub const RESNET50_BLOCKS: [usize; 4] = [3, 4, 6, 3];
/// ResNet-101 block depths.
pub const RESNET101_BLOCKS: [usize; 4] = [3, 4, 23, 3];
/// ResNet-152 block depths.
pub const RESNET152_BLOCKS: [usize; 4] = [3, 8, 36, 3];

/// Base planes of each stage.
pub const RESNET_STAGE_PLANES: [usize; 4] = [64, 128, 256, 512];
/// Stride of the first block of each stage.
pub const RESNET_STAGE_STRIDES: [usize; 4] = [1, 2, 2, 2];

/// Output channels of the stem.
pub const RESNET_STEM_WIDTH: usize = 64;

/// Well-known `ResNet` depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResNetVariant {
    /// 18 layers; basic blocks.
    ResNet18,
    /// 34 layers; basic blocks.
    ResNet34,
    /// 50 layers; bottleneck blocks.
    ResNet50,
    /// 101 layers; bottleneck blocks.
    ResNet101,
    /// 152 layers; bottleneck blocks.
    ResNet152,
}

impl ResNetVariant {
    /// All variants, shallowest first.
    pub const ALL: [ResNetVariant; 5] = [
        Self::ResNet18,
        Self::ResNet34,
        Self::ResNet50,
        Self::ResNet101,
        Self::ResNet152,
    ];

    /// The canonical lowercase name, e.g. ``"resnet50"``.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResNet18 => "resnet18",
            Self::ResNet34 => "resnet34",
            Self::ResNet50 => "resnet50",
            Self::ResNet101 => "resnet101",
            Self::ResNet152 => "resnet152",
        }
    }

    /// The block form.
    pub fn block_kind(&self) -> ResidualBlockKind {
        match self {
            Self::ResNet18 | Self::ResNet34 => ResidualBlockKind::Basic,
            _ => ResidualBlockKind::Bottleneck,
        }
    }

    /// The per-stage block counts.
    pub fn blocks(&self) -> [usize; 4] {
        match self {
            Self::ResNet18 => RESNET18_BLOCKS,
            Self::ResNet34 => RESNET34_BLOCKS,
            Self::ResNet50 => RESNET50_BLOCKS,
            Self::ResNet101 => RESNET101_BLOCKS,
            Self::ResNet152 => RESNET152_BLOCKS,
        }
    }

    /// Build the abstract config for this variant.
    pub fn to_config(
        &self,
        num_classes: usize,
    ) -> ResNetAbstractConfig {
        ResNetAbstractConfig::new(self.block_kind(), self.blocks(), num_classes)
    }
}

impl Display for ResNetVariant {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ResNetVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match Self::ALL.iter().find(|v| v.name() == name) {
            Some(variant) => Ok(*variant),
            None => bail!("Unknown ResNet variant: {s:?}"),
        }
    }
}

/// High-level `ResNet` model configuration.
#[derive(Config, Debug)]
pub struct ResNetAbstractConfig {
    /// The block form used by every stage.
    pub block_kind: ResidualBlockKind,

    /// Layer block depths.
    pub blocks: [usize; 4],

    /// Number of classification classes.
    pub num_classes: usize,

    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Add the shortcut in basic blocks.
    ///
    /// See [`crate::models::resnet::basic_block`].
    #[config(default = "false")]
    pub skip_connection: bool,

    /// Activation used throughout the network.
    #[config(default = "ActivationConfig::Relu")]
    pub activation: ActivationConfig,
}

impl From<ResNetAbstractConfig> for ResNetConfig {
    fn from(config: ResNetAbstractConfig) -> Self {
        let expansion = config.block_kind.expansion_factor();

        let stem: CNA2dConfig = CNA2dConfig::new(
            Conv2dConfig::new([config.in_channels, RESNET_STEM_WIDTH], square(7))
                .with_stride(square(2))
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .into(),
        )
        .with_act(config.activation.clone());

        let mut in_planes = RESNET_STEM_WIDTH;
        let mut layers = Vec::with_capacity(config.blocks.len());
        for (idx, num_blocks) in config.blocks.iter().enumerate() {
            let planes = RESNET_STAGE_PLANES[idx];
            let stride = RESNET_STAGE_STRIDES[idx];

            tracing::debug!(
                stage = idx,
                kind = %config.block_kind,
                num_blocks,
                in_planes,
                out_planes = planes * expansion,
                stride,
                "resnet stage"
            );

            let layer = LayerBlockConfig::build(
                config.block_kind,
                *num_blocks,
                in_planes,
                planes,
                stride,
            )
            .map_blocks(&mut |_, block| {
                block
                    .with_skip_connection(config.skip_connection)
                    .with_activation(config.activation.clone())
            });
            in_planes = planes * expansion;
            layers.push(layer);
        }

        ResNetConfig::new(stem, layers, config.num_classes)
    }
}

impl ResNetAbstractConfig {
    /// Convert to a [`ResNetConfig`].
    pub fn to_structure(self) -> ResNetConfig {
        self.into()
    }

    /// Create a ResNet-18 config.
    pub fn resnet18(num_classes: usize) -> Self {
        ResNetVariant::ResNet18.to_config(num_classes)
    }

    /// Create a ResNet-34 config.
    pub fn resnet34(num_classes: usize) -> Self {
        ResNetVariant::ResNet34.to_config(num_classes)
    }

    /// Create a ResNet-50 config.
    pub fn resnet50(num_classes: usize) -> Self {
        ResNetVariant::ResNet50.to_config(num_classes)
    }

    /// Create a ResNet-101 config.
    pub fn resnet101(num_classes: usize) -> Self {
        ResNetVariant::ResNet101.to_config(num_classes)
    }

    /// Create a ResNet-152 config.
    pub fn resnet152(num_classes: usize) -> Self {
        ResNetVariant::ResNet152.to_config(num_classes)
    }
}

/// [`ResNet`] Structure Config.
///
/// This config defines the concrete structure of a `ResNet` model;
/// [`ResNetConfig::try_validate`] checks the channel bookkeeping
/// between the stem and the stages.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// The stem conv/norm/act.
    pub stem: CNA2dConfig,

    /// The stage configs.
    pub layers: Vec<LayerBlockConfig>,

    /// The number of classes.
    pub num_classes: usize,
}

impl ResNetConfig {
    /// Channels of the final feature map.
    ///
    /// Empty stages are skipped.
    pub fn head_planes(&self) -> usize {
        match self.layers.iter().rev().find(|layer| !layer.is_empty()) {
            Some(layer) => layer.out_planes(),
            None => self.stem.out_channels(),
        }
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> anyhow::Result<()> {
        if self.num_classes == 0 {
            bail!("num_classes must be > 0");
        }
        if self.layers.is_empty() {
            bail!("layers is empty");
        }

        let mut in_planes = self.stem.out_channels();
        for (idx, layer) in self.layers.iter().enumerate() {
            if let Err(err) = layer.try_validate() {
                bail!("layer[{idx}]: {err}");
            }
            if layer.in_planes() != in_planes {
                bail!(
                    "layer[{idx}].in_planes({}) != previous out_planes({in_planes})",
                    layer.in_planes(),
                );
            }
            in_planes = layer.out_planes();
        }
        Ok(())
    }

    /// Panic if `try_validate` returns an error.
    pub fn expect_valid(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}");
        }
    }

    /// Predict the ``[height, width]`` of the final feature map.
    ///
    /// # Returns
    ///
    /// `Some([height, width])`; or `None` if the input is too small.
    pub fn maybe_feature_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        let stem_resolution = self.stem.conv_norm.maybe_output_resolution(input_resolution)?;
        self.layers
            .iter()
            .try_fold(stem_resolution, |resolution, layer| {
                layer.maybe_output_resolution(resolution)
            })
    }

    /// Predict the ``[batch, num_classes]`` output shape.
    ///
    /// # Panics
    ///
    /// If the input is too small to produce a feature map.
    pub fn output_shape(
        &self,
        batch: usize,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        match self.maybe_feature_resolution(input_resolution) {
            Some(_) => [batch, self.num_classes],
            None => panic!("Input resolution {input_resolution:?} is too small for this ResNet"),
        }
    }

    /// The [`LayerSpec`]s of the model, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        let mut specs = self.stem.layer_specs();
        for layer in &self.layers {
            specs.extend(layer.layer_specs());
        }
        specs.push(LayerSpec::AdaptiveAvgPool2d {
            output_size: [1, 1],
        });
        specs.push(LayerSpec::Flatten);
        specs.push(LayerSpec::Linear {
            d_input: self.head_planes(),
            d_output: self.num_classes,
        });
        specs
    }

    /// Initialize a [`ResNet`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    #[tracing::instrument(
        skip_all,
        fields(num_classes = self.num_classes, stages = self.layers.len())
    )]
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ResNet<B> {
        self.expect_valid();

        let head_planes = self.head_planes();
        tracing::debug!(head_planes, "initializing resnet");

        ResNet {
            stem: self.stem.init(device),
            layers: self
                .layers
                .into_iter()
                .map(|c| c.init(device))
                .collect::<Vec<_>>(),
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(head_planes, self.num_classes).init(device),
        }
    }
}

/// `ResNet` model.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    /// Stem conv/norm/act.
    pub stem: CNA2d<B>,

    /// Stages.
    pub layers: Vec<LayerBlock<B>>,

    /// Head pooling.
    pub avgpool: AdaptiveAvgPool2d,

    /// Head classifier.
    pub fc: Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// Number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.stem.in_channels()
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        self.fc.weight.dims()[1]
    }

    /// Stem and stages.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, head_planes, out_height, out_width]``
    pub fn features(
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
            &[("in_channels", self.in_channels())],
        );

        let x = self.stem.forward(input);
        let x = self.layers.iter().fold(x, |x, layer| layer.forward(x));

        run_every_nth!({
            static OUTPUT_CONTRACT: ShapeContract = shape_contract![
                "batch",
                "planes",
                "height",
                "width",
            ];
            OUTPUT_CONTRACT.assert_shape(&x, &[("batch", batch)]);
        });
        x
    }

    /// `ResNet` forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, num_classes]`` logits.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        let x = self.features(input);

        // Head
        let x = self.avgpool.forward(x);
        // Reshape [B, C, 1, 1] -> [B, C]
        let x = x.flatten(1, 3);
        self.fc.forward(x)
    }

    /// Re-initialize the last layer with the specified number of output classes.
    pub fn with_classes(
        mut self,
        num_classes: usize,
    ) -> Self {
        let [d_input, _d_output] = self.fc.weight.dims();
        self.fc = LinearConfig::new(d_input, num_classes).init(&self.fc.weight.device());
        self
    }
}

/// Build a named `ResNet` variant.
pub fn build_resnet<B: Backend>(
    variant: ResNetVariant,
    num_classes: usize,
    device: &B::Device,
) -> ResNet<B> {
    variant.to_config(num_classes).to_structure().init(device)
}

/// Build a ResNet-18.
pub fn build_resnet18<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> ResNet<B> {
    build_resnet(ResNetVariant::ResNet18, num_classes, device)
}

/// Build a ResNet-34.
pub fn build_resnet34<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> ResNet<B> {
    build_resnet(ResNetVariant::ResNet34, num_classes, device)
}

/// Build a ResNet-50.
pub fn build_resnet50<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> ResNet<B> {
    build_resnet(ResNetVariant::ResNet50, num_classes, device)
}

/// Build a ResNet-101.
pub fn build_resnet101<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> ResNet<B> {
    build_resnet(ResNetVariant::ResNet101, num_classes, device)
}

/// Build a ResNet-152.
pub fn build_resnet152<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> ResNet<B> {
    build_resnet(ResNetVariant::ResNet152, num_classes, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resnet::residual_block::{ResidualBlockConfig, ResidualBlockMeta};
    use bimm_contracts::{ShapeContract, shape_contract};
    use burn::backend::{Autodiff, NdArray};
    use hamcrest::prelude::*;

    fn count_specs(
        specs: &[LayerSpec],
        pred: impl Fn(&LayerSpec) -> bool,
    ) -> usize {
        specs.iter().filter(|&spec| pred(spec)).count()
    }

    #[test]
    fn test_variant_names() {
        for variant in ResNetVariant::ALL {
            assert_eq!(variant.name().parse::<ResNetVariant>().unwrap(), variant);
            assert_eq!(variant.to_string(), variant.name());
        }
        assert_eq!(
            "ResNet50".parse::<ResNetVariant>().unwrap(),
            ResNetVariant::ResNet50
        );

        let err = "resnet99".parse::<ResNetVariant>().unwrap_err();
        assert_that!(
            err.to_string(),
            is(equal_to("Unknown ResNet variant: \"resnet99\"".to_string()))
        );
    }

    #[test]
    fn test_variant_tables() {
        assert_eq!(ResNetVariant::ResNet18.block_kind(), ResidualBlockKind::Basic);
        assert_eq!(ResNetVariant::ResNet34.blocks(), [3, 4, 6, 3]);
        assert_eq!(
            ResNetVariant::ResNet101.block_kind(),
            ResidualBlockKind::Bottleneck
        );
        assert_eq!(ResNetVariant::ResNet152.blocks(), [3, 8, 36, 3]);
    }

    #[test]
    fn test_to_structure_channel_bookkeeping() {
        let config = ResNetAbstractConfig::resnet50(10).to_structure();
        config.expect_valid();

        assert_eq!(config.stem.in_channels(), 3);
        assert_eq!(config.stem.out_channels(), 64);
        assert!(config.stem.conv_norm.conv.bias);

        let planes: Vec<(usize, usize, usize)> = config
            .layers
            .iter()
            .map(|layer| (layer.in_planes(), layer.out_planes(), layer.stride()))
            .collect();
        assert_eq!(
            planes,
            vec![
                (64, 256, 1),
                (256, 512, 2),
                (512, 1024, 2),
                (1024, 2048, 2)
            ]
        );
        assert_eq!(config.head_planes(), 2048);

        let config = ResNetAbstractConfig::resnet34(10).to_structure();
        let lens: Vec<usize> = config.layers.iter().map(|layer| layer.len()).collect();
        assert_eq!(lens, vec![3, 4, 6, 3]);
        assert_eq!(config.layers[1].in_planes(), 64);
        assert_eq!(config.layers[1].blocks[1].in_planes(), 128);
        assert_eq!(config.head_planes(), 512);
    }

    #[test]
    fn test_feature_resolution() {
        let expected = [
            (ResNetVariant::ResNet18, [9, 9]),
            (ResNetVariant::ResNet34, [1, 1]),
            (ResNetVariant::ResNet50, [14, 14]),
            (ResNetVariant::ResNet101, [14, 14]),
            (ResNetVariant::ResNet152, [14, 14]),
        ];
        for (variant, resolution) in expected {
            let config = variant.to_config(7).to_structure();
            assert_eq!(
                config.maybe_feature_resolution([224, 224]),
                Some(resolution),
                "{variant}"
            );
            assert_eq!(config.output_shape(1, [224, 224]), [1, 7]);
        }

        // Unpadded basic blocks run out of spatial extent on small inputs.
        let config = ResNetAbstractConfig::resnet18(2).to_structure();
        assert_eq!(config.maybe_feature_resolution([32, 32]), None);

        let config = ResNetAbstractConfig::resnet18(2)
            .with_skip_connection(true)
            .to_structure();
        assert_eq!(config.maybe_feature_resolution([32, 32]), Some([2, 2]));
    }

    #[test]
    #[should_panic(expected = "too small for this ResNet")]
    fn test_output_shape_too_small() {
        ResNetAbstractConfig::resnet34(2)
            .to_structure()
            .output_shape(1, [64, 64]);
    }

    #[test]
    fn test_layer_specs() {
        let specs = ResNetAbstractConfig::resnet18(1000)
            .to_structure()
            .layer_specs();

        assert_eq!(
            specs[0],
            LayerSpec::Conv2d {
                in_channels: 3,
                out_channels: 64,
                kernel_size: 7,
                stride: 2,
                padding: 3,
                bias: true,
            }
        );
        assert_eq!(
            count_specs(&specs, |s| matches!(s, LayerSpec::Conv2d { .. })),
            1 + 8 * 2
        );
        assert_eq!(
            count_specs(&specs, |s| matches!(s, LayerSpec::Projection { .. })),
            3
        );
        assert_eq!(
            count_specs(&specs, |s| matches!(s, LayerSpec::ResidualAdd)),
            0
        );
        assert_eq!(
            specs[specs.len() - 1],
            LayerSpec::Linear {
                d_input: 512,
                d_output: 1000,
            }
        );

        let specs = ResNetAbstractConfig::resnet50(1).to_structure().layer_specs();
        assert_eq!(
            count_specs(&specs, |s| matches!(s, LayerSpec::Conv2d { .. })),
            1 + 16 * 3
        );
        assert_eq!(
            count_specs(&specs, |s| matches!(s, LayerSpec::Projection { .. })),
            4
        );
        assert_eq!(
            count_specs(&specs, |s| matches!(s, LayerSpec::ResidualAdd)),
            16
        );
        assert_eq!(
            specs[specs.len() - 1],
            LayerSpec::Linear {
                d_input: 2048,
                d_output: 1,
            }
        );
    }

    #[test]
    fn test_construction_is_deterministic() {
        type B = NdArray<f32>;
        let device = Default::default();

        for variant in [ResNetVariant::ResNet18, ResNetVariant::ResNet50] {
            let a = variant.to_config(5).to_structure();
            let b = variant.to_config(5).to_structure();
            assert_eq!(a.layer_specs(), b.layer_specs());
        }

        let a: ResNet<B> = build_resnet18(5, &device);
        let b: ResNet<B> = build_resnet18(5, &device);
        assert_eq!(a.num_params(), b.num_params());
    }

    #[test]
    fn test_try_validate() {
        let mut config = ResNetAbstractConfig::resnet18(2).to_structure();
        config.layers[2] = LayerBlockConfig::build(ResidualBlockKind::Basic, 2, 64, 256, 2);
        assert_eq!(
            config.try_validate().unwrap_err().to_string(),
            "layer[2].in_planes(64) != previous out_planes(128)"
        );

        let mut config = ResNetAbstractConfig::resnet18(2).to_structure();
        config.layers[0] = LayerBlockConfig::from(vec![
            ResidualBlockConfig::build(ResidualBlockKind::Basic, 64, 64, 1),
            ResidualBlockConfig::build(ResidualBlockKind::Basic, 32, 64, 1),
        ]);
        assert_eq!(
            config.try_validate().unwrap_err().to_string(),
            "layer[0]: block[0].out_planes(64) != block[1].in_planes(32)"
        );

        let config = ResNetAbstractConfig::resnet18(0).to_structure();
        assert!(config.try_validate().is_err());
    }

    #[test]
    fn test_empty_stage() {
        let config =
            ResNetAbstractConfig::new(ResidualBlockKind::Basic, [2, 2, 2, 0], 3).to_structure();
        assert_eq!(config.layers[3].len(), 0);
        assert_eq!(config.head_planes(), 256);

        let specs = config.layer_specs();
        assert_eq!(
            specs[specs.len() - 1],
            LayerSpec::Linear {
                d_input: 256,
                d_output: 3,
            }
        );

        assert_eq!(
            config.try_validate().unwrap_err().to_string(),
            "layer[3]: blocks is empty"
        );
    }

    #[test]
    fn test_head_widths() {
        type B = NdArray<f32>;
        let device = Default::default();

        for num_classes in [1, 1000] {
            let model: ResNet<B> = build_resnet18(num_classes, &device);
            assert_eq!(model.fc.weight.dims(), [512, num_classes]);
            assert_eq!(model.num_classes(), num_classes);
        }

        let model: ResNet<B> = build_resnet18(1000, &device).with_classes(3);
        assert_eq!(model.num_classes(), 3);
    }

    #[test]
    fn test_resnet18_forward_224() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: ResNet<B> = build_resnet18(2, &device);
        let input = Tensor::zeros([1, 3, 224, 224], &device);

        let features = model.features(input.clone());
        assert_eq!(features.dims(), [1, 512, 9, 9]);

        let output = model.forward(input);
        assert_eq!(output.dims(), [1, 2]);
    }

    #[test]
    fn test_small_resnet_forward_autodiff() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let config = ResNetAbstractConfig::new(ResidualBlockKind::Basic, [1, 1, 1, 1], 10)
            .with_skip_connection(true)
            .to_structure();
        let [height, width] = config.maybe_feature_resolution([64, 48]).unwrap();
        assert_eq!([height, width], [4, 3]);

        let model: ResNet<B> = config.init(&device);

        let input = Tensor::ones([2, 3, 64, 48], &device);
        let features = model.features(input.clone());
        static OUTPUT_CONTRACT: ShapeContract = shape_contract![
            "batch",
            "planes",
            "height",
            "width",
        ];
        OUTPUT_CONTRACT.assert_shape(
            &features,
            &[
                ("batch", 2),
                ("planes", 512),
                ("height", height),
                ("width", width)
            ]
        );

        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 10]);
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resnet.json");

        let config = ResNetAbstractConfig::resnet101(4).with_skip_connection(true);
        config.save(&path).unwrap();

        let loaded = ResNetAbstractConfig::load(&path).unwrap();
        assert_eq!(loaded.blocks, RESNET101_BLOCKS);
        assert_eq!(loaded.block_kind, ResidualBlockKind::Bottleneck);
        assert!(loaded.skip_connection);
        assert_eq!(
            loaded.to_structure().layer_specs(),
            config.to_structure().layer_specs()
        );
    }

    #[test]
    #[ignore = "allocates and runs a full ResNet-152"]
    fn test_resnet152_forward_224() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: ResNet<B> = build_resnet152(3, &device);
        let output = model.forward(Tensor::zeros([1, 3, 224, 224], &device));
        assert_eq!(output.dims(), [1, 3]);
    }

    #[test]
    #[ignore = "allocates and runs a full ResNet-34"]
    fn test_resnet34_forward_224() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: ResNet<B> = build_resnet34(3, &device);
        let features = model.features(Tensor::zeros([1, 3, 224, 224], &device));
        assert_eq!(features.dims(), [1, 512, 1, 1]);
    }

    #[test]
    fn test_block_metas() {
        let config = ResNetAbstractConfig::resnet50(2).to_structure();
        let strides: Vec<usize> = config.layers[1]
            .blocks
            .iter()
            .map(|block| block.stride())
            .collect();
        assert_eq!(strides, vec![2, 1, 1, 1]);
    }

    #[test]
    #[should_panic(expected = "Shape Error")]
    fn test_features_wrong_channels() {
        type B = NdArray<f32>;
        let device = Default::default();

        let config = ResNetAbstractConfig::new(ResidualBlockKind::Basic, [1, 1, 1, 1], 2)
            .with_skip_connection(true)
            .to_structure();
        let model: ResNet<B> = config.init(&device);
        let _features = model.features(Tensor::ones([1, 1, 32, 32], &device));
    }
}

