//! # VGG Core Model
//!
//! [`Vgg`] chains a [`VggFeatures`] extractor, an adaptive average pool,
//! and a [`VggClassifier`] head; followed by an optional output activation.
//!
//! [`VggConfig`] implements [`Config`], and provides [`VggConfig::init`]
//! to initialize a [`Vgg`]. [`VggVariant::to_config`] builds the config of
//! a named variant.
//!
//! The output activation defaults to a sigmoid, producing independent
//! per-class scores in ``(0, 1)``.

use crate::layers::activation::{Activation, ActivationConfig};
use crate::layers::layer_spec::LayerSpec;
use crate::models::vgg::classifier::{VggClassifier, VggClassifierConfig};
use crate::models::vgg::features::{VggFeatures, VggFeaturesConfig};
use crate::models::vgg::width_table::{VggVariant, WidthEntry};
use anyhow::bail;
use bimm_contracts::{ShapeContract, shape_contract};
use burn::module::Module;
use burn::nn::LinearConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::prelude::{Backend, Config, Tensor};

/// Resolution of the adaptive pool between features and classifier.
pub const VGG_POOL_RESOLUTION: [usize; 2] = [7, 7];

impl VggVariant {
    /// Build the config for this variant.
    pub fn to_config(
        &self,
        num_classes: usize,
    ) -> VggConfig {
        VggConfig::from_widths(self.width_table().to_vec(), num_classes)
    }
}

/// [`Vgg`] Config.
#[derive(Config, Debug)]
pub struct VggConfig {
    /// The feature extractor.
    pub features: VggFeaturesConfig,

    /// The classifier head.
    pub classifier: VggClassifierConfig,

    /// Resolution of the adaptive pool.
    #[config(default = "VGG_POOL_RESOLUTION")]
    pub pool_size: [usize; 2],

    /// Activation applied to the classifier logits, if any.
    #[config(default = "Some(ActivationConfig::Sigmoid)")]
    pub output_activation: Option<ActivationConfig>,
}

impl VggConfig {
    /// Build a config from a width table.
    ///
    /// The classifier input is sized from the last conv width and the
    /// default pool resolution.
    pub fn from_widths(
        widths: Vec<WidthEntry>,
        num_classes: usize,
    ) -> Self {
        let features = VggFeaturesConfig::new(widths);
        let [pool_h, pool_w] = VGG_POOL_RESOLUTION;
        let d_input = features.out_channels() * pool_h * pool_w;
        Self::new(features, VggClassifierConfig::new(d_input, num_classes))
    }

    /// Replace the pool resolution, resizing the classifier input to match.
    pub fn with_pool_resolution(
        mut self,
        pool_size: [usize; 2],
    ) -> Self {
        self.classifier.d_input = self.features.out_channels() * pool_size[0] * pool_size[1];
        self.pool_size = pool_size;
        self
    }

    /// Set the classifier hidden layer widths.
    pub fn with_hidden(
        mut self,
        hidden: Vec<usize>,
    ) -> Self {
        self.classifier.hidden = hidden;
        self
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.classifier.num_classes
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> anyhow::Result<()> {
        if let Err(err) = self.features.try_validate() {
            bail!("features: {err}");
        }
        if let Err(err) = self.classifier.try_validate() {
            bail!("classifier: {err}");
        }

        let [pool_h, pool_w] = self.pool_size;
        if pool_h == 0 || pool_w == 0 {
            bail!("pool_size must be non-zero: {:?}", self.pool_size);
        }

        let expected = self.features.out_channels() * pool_h * pool_w;
        if self.classifier.d_input != expected {
            bail!(
                "classifier.d_input({}) != features.out_channels({}) * pool area({})",
                self.classifier.d_input,
                self.features.out_channels(),
                pool_h * pool_w,
            );
        }
        Ok(())
    }

    /// Panic if `try_validate` returns an error.
    pub fn expect_valid(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}");
        }
    }

    /// Predict the ``[height, width]`` of the feature map, before pooling.
    ///
    /// # Returns
    ///
    /// `Some([height, width])`; or `None` if the input is too small.
    pub fn maybe_feature_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        self.features.maybe_output_resolution(input_resolution)
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
            Some(_) => [batch, self.num_classes()],
            None => panic!("Input resolution {input_resolution:?} is too small for this VGG"),
        }
    }

    /// The [`LayerSpec`]s of the model, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        let mut specs = self.features.layer_specs();
        specs.push(LayerSpec::AdaptiveAvgPool2d {
            output_size: self.pool_size,
        });
        specs.push(LayerSpec::Flatten);
        specs.extend(self.classifier.layer_specs());
        if let Some(act) = &self.output_activation {
            specs.push(act.layer_spec());
        }
        specs
    }

    /// Initialize a [`Vgg`] model.
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    #[tracing::instrument(
        skip_all,
        fields(num_classes = self.num_classes(), convs = self.features.conv_count())
    )]
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> Vgg<B> {
        self.expect_valid();

        tracing::debug!(
            pools = self.features.pool_count(),
            out_channels = self.features.out_channels(),
            d_input = self.classifier.d_input,
            output_activation = self.output_activation.as_ref().map(|act| act.name()),
            "initializing vgg"
        );

        Vgg {
            features: self.features.init(device),
            avgpool: AdaptiveAvgPool2dConfig::new(self.pool_size).init(),
            classifier: self.classifier.init(device),
            output_act: self.output_activation.map(|act| act.init(device)),
        }
    }
}

/// VGG model.
#[derive(Module, Debug)]
pub struct Vgg<B: Backend> {
    /// Conv/pool feature extractor.
    pub features: VggFeatures<B>,

    /// Pools the features to a fixed resolution.
    pub avgpool: AdaptiveAvgPool2d,

    /// Fully-connected head.
    pub classifier: VggClassifier<B>,

    /// Optional output activation.
    pub output_act: Option<Activation<B>>,
}

impl<B: Backend> Vgg<B> {
    /// Number of input image channels.
    pub fn in_channels(&self) -> usize {
        self.features.in_channels()
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        self.classifier.num_classes()
    }

    /// Classifier logits, before the output activation.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, num_classes]``
    pub fn logits(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        static INPUT_CONTRACT: ShapeContract = shape_contract![
            "batch",
            "in_channels",
            "height",
            "width",
        ];
        let [_batch] = INPUT_CONTRACT.unpack_shape(
            &input,
            &["batch"],
            &[("in_channels", self.in_channels())],
        );

        let x = self.features.forward(input);
        let x = self.avgpool.forward(x);
        // Reshape [B, C, H, W] -> [B, C*H*W]
        let x = x.flatten(1, 3);
        self.classifier.forward(x)
    }

    /// VGG forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, num_classes]``
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        let x = self.logits(input);
        match &self.output_act {
            Some(act) => act.forward(x),
            None => x,
        }
    }

    /// Re-initialize the last layer with the specified number of output classes.
    pub fn with_classes(
        mut self,
        num_classes: usize,
    ) -> Self {
        let [d_input, _d_output] = self.classifier.head.weight.dims();
        self.classifier.head =
            LinearConfig::new(d_input, num_classes).init(&self.classifier.head.weight.device());
        self
    }
}

/// Build a named VGG variant.
pub fn build_vgg<B: Backend>(
    variant: VggVariant,
    num_classes: usize,
    device: &B::Device,
) -> Vgg<B> {
    variant.to_config(num_classes).init(device)
}

/// Build a VGG-11.
pub fn build_vgg11<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> Vgg<B> {
    build_vgg(VggVariant::Vgg11, num_classes, device)
}

/// Build a VGG-13.
pub fn build_vgg13<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> Vgg<B> {
    build_vgg(VggVariant::Vgg13, num_classes, device)
}

/// Build a VGG-16.
pub fn build_vgg16<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> Vgg<B> {
    build_vgg(VggVariant::Vgg16, num_classes, device)
}

/// Build a VGG-19.
pub fn build_vgg19<B: Backend>(
    num_classes: usize,
    device: &B::Device,
) -> Vgg<B> {
    build_vgg(VggVariant::Vgg19, num_classes, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn tiny_config(num_classes: usize) -> VggConfig {
        VggConfig::from_widths(
            vec![
                WidthEntry::Conv(4),
                WidthEntry::MaxPool,
                WidthEntry::Conv(8),
                WidthEntry::MaxPool,
            ],
            num_classes,
        )
        .with_pool_resolution([2, 2])
        .with_hidden(vec![16, 8])
    }

    #[test]
    fn test_variant_configs() {
        for variant in VggVariant::ALL {
            let config = variant.to_config(2);
            config.expect_valid();

            assert_eq!(config.classifier.d_input, 512 * 7 * 7);
            assert_eq!(config.pool_size, [7, 7]);
            assert!(matches!(
                config.output_activation,
                Some(ActivationConfig::Sigmoid)
            ));
            assert_eq!(config.features.pool_count(), 5);
            assert_eq!(config.maybe_feature_resolution([224, 224]), Some([7, 7]));

            for k in [1, 1000] {
                assert_eq!(variant.to_config(k).output_shape(1, [224, 224]), [1, k]);
            }
        }
    }

    #[test]
    fn test_layer_specs() {
        for (variant, convs) in [
            (VggVariant::Vgg11, 8),
            (VggVariant::Vgg13, 10),
            (VggVariant::Vgg16, 13),
            (VggVariant::Vgg19, 16),
        ] {
            let specs = variant.to_config(10).layer_specs();
            assert_eq!(specs, variant.to_config(10).layer_specs());

            let count =
                |pred: &dyn Fn(&LayerSpec) -> bool| specs.iter().filter(|&s| pred(s)).count();
            assert_eq!(count(&|s| matches!(s, LayerSpec::Conv2d { .. })), convs);
            assert_eq!(count(&|s| matches!(s, LayerSpec::BatchNorm2d { .. })), convs);
            assert_eq!(count(&|s| matches!(s, LayerSpec::MaxPool2d { .. })), 5);
            assert_eq!(count(&|s| matches!(s, LayerSpec::Dropout { .. })), 3);
            assert_eq!(count(&|s| matches!(s, LayerSpec::Linear { .. })), 4);

            assert_eq!(
                specs[specs.len() - 2],
                LayerSpec::Linear {
                    d_input: 512,
                    d_output: 10,
                }
            );
            assert_eq!(
                specs[specs.len() - 1],
                LayerSpec::Activation {
                    name: "Sigmoid".to_string(),
                }
            );
        }

        let specs = VggVariant::Vgg11
            .to_config(10)
            .with_output_activation(None)
            .layer_specs();
        assert!(matches!(specs.last(), Some(LayerSpec::Linear { .. })));
    }

    #[test]
    fn test_with_pool_resolution() {
        let config = VggVariant::Vgg11
            .to_config(4)
            .with_pool_resolution([3, 2])
            .with_hidden(vec![64]);
        config.expect_valid();

        assert_eq!(config.pool_size, [3, 2]);
        assert_eq!(config.classifier.d_input, 512 * 3 * 2);
        assert_eq!(config.classifier.linear_dims(), vec![[3072, 64], [64, 4]]);
        let num_feature_specs = config.features.layer_specs().len();
        assert_eq!(num_feature_specs, 8 * 3 + 5);
        assert_eq!(
            config.layer_specs()[num_feature_specs],
            LayerSpec::AdaptiveAvgPool2d {
                output_size: [3, 2],
            }
        );
    }

    #[test]
    fn test_try_validate() {
        let mut config = VggVariant::Vgg16.to_config(2);
        config.classifier.d_input = 512;
        assert_eq!(
            config.try_validate().unwrap_err().to_string(),
            "classifier.d_input(512) != features.out_channels(512) * pool area(49)"
        );

        let config = VggVariant::Vgg16.to_config(0);
        assert_eq!(
            config.try_validate().unwrap_err().to_string(),
            "classifier: num_classes must be > 0"
        );
    }

    #[test]
    #[should_panic(expected = "too small for this VGG")]
    fn test_output_shape_too_small() {
        VggVariant::Vgg11.to_config(2).output_shape(1, [16, 16]);
    }

    #[test]
    fn test_forward_sigmoid() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: Vgg<B> = tiny_config(3).init(&device);
        assert_eq!(model.num_classes(), 3);

        let input = Tensor::random(
            [2, 3, 16, 12],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 3]);

        let values = output.into_data().to_vec::<f32>().unwrap();
        for v in values {
            assert!(v > 0.0 && v < 1.0, "{v}");
        }
    }

    #[test]
    fn test_forward_output_activation() {
        type B = NdArray<f32>;
        let device = Default::default();

        let input: Tensor<B, 4> = Tensor::ones([1, 3, 8, 8], &device);

        let model: Vgg<B> = tiny_config(4).with_output_activation(None).init(&device);
        let logits = model.logits(input.clone());
        let output = model.forward(input.clone());
        assert_eq!(
            logits.into_data().to_vec::<f32>().unwrap(),
            output.into_data().to_vec::<f32>().unwrap()
        );

        let model: Vgg<B> = tiny_config(4)
            .with_output_activation(Some(ActivationConfig::Softmax))
            .init(&device);
        let total: f32 = model
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .unwrap()
            .iter()
            .sum();
        assert!((total - 1.0).abs() < 1e-5, "{total}");
    }

    #[test]
    fn test_with_classes() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: Vgg<B> = tiny_config(3).init(&device).with_classes(7);
        assert_eq!(model.num_classes(), 7);

        let output = model.forward(Tensor::zeros([1, 3, 8, 8], &device));
        assert_eq!(output.dims(), [1, 7]);
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vgg.json");

        let config = VggVariant::Vgg13.to_config(5);
        config.save(&path).unwrap();

        let loaded = VggConfig::load(&path).unwrap();
        assert_eq!(loaded.features.widths, VggVariant::Vgg13.width_table().to_vec());
        assert!(matches!(
            loaded.output_activation,
            Some(ActivationConfig::Sigmoid)
        ));
        assert_eq!(loaded.layer_specs(), config.layer_specs());
    }

    #[test]
    #[ignore = "allocates and runs a full VGG-11"]
    fn test_vgg11_forward_224() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: Vgg<B> = build_vgg11(2, &device);
        let output = model.forward(Tensor::zeros([1, 3, 224, 224], &device));
        assert_eq!(output.dims(), [1, 2]);
    }

    #[test]
    #[ignore = "allocates and runs a full VGG-19"]
    fn test_vgg19_forward_224() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: Vgg<B> = build_vgg19(1000, &device);
        let output = model.forward(Tensor::zeros([1, 3, 224, 224], &device));
        assert_eq!(output.dims(), [1, 1000]);
    }
}
