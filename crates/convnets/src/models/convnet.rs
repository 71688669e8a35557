//! # `ConvNet` - any named architecture.
//!
//! [`ConvNetArchitecture`] enumerates every named `ResNet` and VGG
//! variant, and parses them from their names; [`ConvNetConfig`] and
//! [`ConvNet`] wrap either family behind one forward signature.

use crate::layers::layer_spec::LayerSpec;
use crate::models::resnet::{ResNet, ResNetConfig, ResNetVariant};
use crate::models::vgg::{Vgg, VggConfig, VggVariant};
use anyhow::bail;
use burn::module::Module;
use burn::prelude::{Backend, Config, Tensor};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Class count used when none is given.
pub const DEFAULT_NUM_CLASSES: usize = 2;

/// A named architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvNetArchitecture {
    /// A `ResNet` variant.
    ResNet(ResNetVariant),

    /// A VGG variant.
    Vgg(VggVariant),
}

impl From<ResNetVariant> for ConvNetArchitecture {
    fn from(variant: ResNetVariant) -> Self {
        Self::ResNet(variant)
    }
}

impl From<VggVariant> for ConvNetArchitecture {
    fn from(variant: VggVariant) -> Self {
        Self::Vgg(variant)
    }
}

impl ConvNetArchitecture {
    /// Every named architecture.
    pub const ALL: [ConvNetArchitecture; 9] = [
        Self::ResNet(ResNetVariant::ResNet18),
        Self::ResNet(ResNetVariant::ResNet34),
        Self::ResNet(ResNetVariant::ResNet50),
        Self::ResNet(ResNetVariant::ResNet101),
        Self::ResNet(ResNetVariant::ResNet152),
        Self::Vgg(VggVariant::Vgg11),
        Self::Vgg(VggVariant::Vgg13),
        Self::Vgg(VggVariant::Vgg16),
        Self::Vgg(VggVariant::Vgg19),
    ];

    /// The canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResNet(variant) => variant.name(),
            Self::Vgg(variant) => variant.name(),
        }
    }

    /// Build the structure config for this architecture.
    pub fn to_config(
        &self,
        num_classes: usize,
    ) -> ConvNetConfig {
        match self {
            Self::ResNet(variant) => variant.to_config(num_classes).to_structure().into(),
            Self::Vgg(variant) => variant.to_config(num_classes).into(),
        }
    }

    /// Build and initialize the model.
    pub fn init<B: Backend>(
        &self,
        num_classes: usize,
        device: &B::Device,
    ) -> ConvNet<B> {
        self.to_config(num_classes).init(device)
    }
}

impl Display for ConvNetArchitecture {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ConvNetArchitecture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match Self::ALL.iter().find(|arch| arch.name() == name) {
            Some(arch) => Ok(*arch),
            None => {
                let names = Self::ALL.map(|arch| arch.name()).join(", ");
                bail!("Unknown architecture: {s:?}; expected one of: {names}")
            }
        }
    }
}

/// [`ConvNet`] Config.
#[derive(Config, Debug)]
pub enum ConvNetConfig {
    /// A `ResNet`.
    ResNet(ResNetConfig),

    /// A VGG.
    Vgg(VggConfig),
}

impl From<ResNetConfig> for ConvNetConfig {
    fn from(config: ResNetConfig) -> Self {
        Self::ResNet(config)
    }
}

impl From<VggConfig> for ConvNetConfig {
    fn from(config: VggConfig) -> Self {
        Self::Vgg(config)
    }
}

impl ConvNetConfig {
    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        match self {
            Self::ResNet(config) => config.num_classes,
            Self::Vgg(config) => config.num_classes(),
        }
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> anyhow::Result<()> {
        match self {
            Self::ResNet(config) => config.try_validate(),
            Self::Vgg(config) => config.try_validate(),
        }
    }

    /// Predict the ``[height, width]`` of the final feature map.
    pub fn maybe_feature_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        match self {
            Self::ResNet(config) => config.maybe_feature_resolution(input_resolution),
            Self::Vgg(config) => config.maybe_feature_resolution(input_resolution),
        }
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
        match self {
            Self::ResNet(config) => config.output_shape(batch, input_resolution),
            Self::Vgg(config) => config.output_shape(batch, input_resolution),
        }
    }

    /// The [`LayerSpec`]s of the model, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        match self {
            Self::ResNet(config) => config.layer_specs(),
            Self::Vgg(config) => config.layer_specs(),
        }
    }

    /// Initialize a [`ConvNet`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ConvNet<B> {
        match self {
            Self::ResNet(config) => ConvNet::ResNet(config.init(device)),
            Self::Vgg(config) => ConvNet::Vgg(config.init(device)),
        }
    }
}

/// Either model family.
#[derive(Module, Debug)]
pub enum ConvNet<B: Backend> {
    /// A `ResNet`.
    ResNet(ResNet<B>),

    /// A VGG.
    Vgg(Vgg<B>),
}

impl<B: Backend> ConvNet<B> {
    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        match self {
            Self::ResNet(model) => model.num_classes(),
            Self::Vgg(model) => model.num_classes(),
        }
    }

    /// Forward pass.
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
        match self {
            Self::ResNet(model) => model.forward(input),
            Self::Vgg(model) => model.forward(input),
        }
    }
}
