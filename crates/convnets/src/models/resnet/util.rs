//! # `ResNet` Utilities
use crate::layers::blocks::conv_norm::ConvNorm2dConfig;
use crate::utility::shape::square;
use burn::nn::PaddingConfig2d;
use burn::nn::conv::Conv2dConfig;

/// Build the config for a 1x1 conv/norm projection.
///
/// Maps ``[batch, in_planes, h, w]`` onto ``[batch, out_planes, h', w']``,
/// where the spatial size follows `stride`.
pub fn projection_config(
    in_planes: usize,
    out_planes: usize,
    stride: usize,
) -> ConvNorm2dConfig {
    Conv2dConfig::new([in_planes, out_planes], square(1))
        .with_stride(square(stride))
        .with_padding(PaddingConfig2d::Explicit(0, 0))
        .with_bias(false)
        .into()
}

/// Does a block with this shape need a projection shortcut?
#[inline(always)]
pub fn needs_projection(
    in_planes: usize,
    out_planes: usize,
    stride: usize,
) -> bool {
    stride != 1 || in_planes != out_planes
}
