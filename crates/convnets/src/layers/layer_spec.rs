//! # Layer Specs
//!
//! A [`LayerSpec`] is the shape-level description of one primitive operation
//! in a model. Every model config can list its primitives in forward order,
//! without initializing any parameters.

use burn::nn::PaddingConfig2d;
use burn::nn::conv::Conv2dConfig;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Shape-level description of a primitive operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    /// 2d convolution with a square kernel.
    Conv2d {
        /// Input channels.
        in_channels: usize,
        /// Output channels.
        out_channels: usize,
        /// Square kernel size.
        kernel_size: usize,
        /// Square stride.
        stride: usize,
        /// Symmetric padding.
        padding: usize,
        /// Has a bias term.
        bias: bool,
    },

    /// 2d batch normalization.
    BatchNorm2d {
        /// Normalized channels.
        num_features: usize,
    },

    /// Elementwise (or last-dim softmax) activation.
    Activation {
        /// Activation name.
        name: String,
    },

    /// 2d max pooling with a square window.
    MaxPool2d {
        /// Square window size.
        kernel_size: usize,
        /// Square stride.
        stride: usize,
    },

    /// Adaptive average pooling to a fixed resolution.
    AdaptiveAvgPool2d {
        /// ``[height, width]`` of the output.
        output_size: [usize; 2],
    },

    /// Flatten ``[batch, ...]`` to ``[batch, features]``.
    Flatten,

    /// Fully connected layer.
    Linear {
        /// Input features.
        d_input: usize,
        /// Output features.
        d_output: usize,
    },

    /// Dropout.
    Dropout {
        /// Drop probability.
        prob: f64,
    },

    /// 1x1 conv + norm projection of a block input onto its output shape.
    Projection {
        /// Input channels.
        in_channels: usize,
        /// Output channels.
        out_channels: usize,
        /// Square stride.
        stride: usize,
    },

    /// Addition of the (possibly projected) block input to the main path.
    ResidualAdd,
}

impl LayerSpec {
    /// Build a [`LayerSpec::Conv2d`] from a square [`Conv2dConfig`].
    pub fn from_conv2d(config: &Conv2dConfig) -> Self {
        let kernel_size = config.kernel_size[0];
        let padding = match &config.padding {
            PaddingConfig2d::Explicit(height, _) => *height,
            PaddingConfig2d::Same => kernel_size / 2,
            PaddingConfig2d::Valid => 0,
        };
        Self::Conv2d {
            in_channels: config.channels[0],
            out_channels: config.channels[1],
            kernel_size,
            stride: config.stride[0],
            padding,
            bias: config.bias,
        }
    }

    /// Does this primitive hold learnable parameters?
    pub fn is_parametric(&self) -> bool {
        matches!(
            self,
            Self::Conv2d { .. }
                | Self::BatchNorm2d { .. }
                | Self::Linear { .. }
                | Self::Projection { .. }
        )
    }
}

impl Display for LayerSpec {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Conv2d {
                in_channels,
                out_channels,
                kernel_size,
                stride,
                padding,
                bias,
            } => write!(
                f,
                "Conv2d({in_channels}->{out_channels}, k={kernel_size}, s={stride}, p={padding}, bias={bias})"
            ),
            Self::BatchNorm2d { num_features } => write!(f, "BatchNorm2d({num_features})"),
            Self::Activation { name } => write!(f, "{name}"),
            Self::MaxPool2d {
                kernel_size,
                stride,
            } => write!(f, "MaxPool2d(k={kernel_size}, s={stride})"),
            Self::AdaptiveAvgPool2d { output_size } => {
                write!(f, "AdaptiveAvgPool2d({}x{})", output_size[0], output_size[1])
            }
            Self::Flatten => write!(f, "Flatten"),
            Self::Linear { d_input, d_output } => write!(f, "Linear({d_input}->{d_output})"),
            Self::Dropout { prob } => write!(f, "Dropout(p={prob})"),
            Self::Projection {
                in_channels,
                out_channels,
                stride,
            } => write!(f, "Projection({in_channels}->{out_channels}, s={stride})"),
            Self::ResidualAdd => write!(f, "ResidualAdd"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conv2d() {
        let config = Conv2dConfig::new([3, 64], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3));

        let spec = LayerSpec::from_conv2d(&config);
        assert_eq!(
            spec,
            LayerSpec::Conv2d {
                in_channels: 3,
                out_channels: 64,
                kernel_size: 7,
                stride: 2,
                padding: 3,
                bias: true,
            }
        );
        assert!(spec.is_parametric());
        assert_eq!(
            spec.to_string(),
            "Conv2d(3->64, k=7, s=2, p=3, bias=true)"
        );

        let valid = LayerSpec::from_conv2d(&Conv2dConfig::new([4, 8], [3, 3]));
        assert!(matches!(valid, LayerSpec::Conv2d { padding: 0, .. }));
    }

    #[test]
    fn test_json() {
        let specs = vec![
            LayerSpec::MaxPool2d {
                kernel_size: 2,
                stride: 2,
            },
            LayerSpec::Dropout { prob: 0.5 },
            LayerSpec::ResidualAdd,
        ];
        let json = serde_json::to_string(&specs).unwrap();
        let parsed: Vec<LayerSpec> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, specs);
        assert!(!parsed[0].is_parametric());
    }
}
