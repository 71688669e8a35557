//! # `ResNet` Layer Block
//!
//! A [`LayerBlock`] is one `ResNet` stage: a sequence of [`ResidualBlock`]s,
//! where the first block carries the stage stride and every later block
//! has stride 1.
//!
//! [`LayerBlockMeta`] defines a common meta API for [`LayerBlock`]
//! and [`LayerBlockConfig`].

use crate::layers::layer_spec::LayerSpec;
use crate::models::resnet::residual_block::{
    ResidualBlock, ResidualBlockConfig, ResidualBlockKind, ResidualBlockMeta,
};
use anyhow::bail;
use bimm_contracts::{ShapeContract, run_every_nth, shape_contract};
use burn::config::Config;
use burn::prelude::{Backend, Module, Tensor};

/// [`LayerBlock`] Meta API.
pub trait LayerBlockMeta {
    /// The component block metas.
    fn block_metas(&self) -> Vec<&dyn ResidualBlockMeta>;

    /// The number of blocks.
    fn len(&self) -> usize {
        self.block_metas().len()
    }

    /// Check if the layer block is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of input feature planes.
    ///
    /// # Panics
    ///
    /// If the layer block is empty.
    fn in_planes(&self) -> usize {
        match self.block_metas().first() {
            Some(block) => block.in_planes(),
            None => panic!("blocks is empty"),
        }
    }

    /// The number of output feature planes.
    ///
    /// # Panics
    ///
    /// If the layer block is empty.
    fn out_planes(&self) -> usize {
        match self.block_metas().last() {
            Some(block) => block.out_planes(),
            None => panic!("blocks is empty"),
        }
    }

    /// Get the effective stride of the layers.
    fn stride(&self) -> usize {
        self.block_metas()
            .iter()
            .fold(1, |acc, block| acc * block.stride())
    }

    /// Get the output resolution for a given input resolution.
    ///
    /// # Returns
    ///
    /// `Some([out_height, out_width])`; or `None` if any block does not fit.
    fn maybe_output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> Option<[usize; 2]> {
        self.block_metas()
            .iter()
            .try_fold(input_resolution, |resolution, block| {
                block.maybe_output_resolution(resolution)
            })
    }
}

/// [`LayerBlock`] Configuration.
#[derive(Config, Debug)]
pub struct LayerBlockConfig {
    /// The component blocks.
    pub blocks: Vec<ResidualBlockConfig>,
}

impl From<Vec<ResidualBlockConfig>> for LayerBlockConfig {
    fn from(blocks: Vec<ResidualBlockConfig>) -> Self {
        Self { blocks }
    }
}

impl LayerBlockMeta for LayerBlockConfig {
    fn block_metas(&self) -> Vec<&dyn ResidualBlockMeta> {
        self.blocks
            .iter()
            .map(|block| block as &dyn ResidualBlockMeta)
            .collect()
    }
}

impl LayerBlockConfig {
    /// Build a stage config.
    ///
    /// The first block maps `in_planes` to ``planes * expansion`` at `stride`;
    /// the remaining blocks keep ``planes * expansion`` at stride 1.
    pub fn build(
        kind: ResidualBlockKind,
        num_blocks: usize,
        in_planes: usize,
        planes: usize,
        stride: usize,
    ) -> Self {
        let out_planes = planes * kind.expansion_factor();
        let blocks = (0..num_blocks)
            .map(|b| {
                if b == 0 {
                    ResidualBlockConfig::build(kind, in_planes, planes, stride)
                } else {
                    ResidualBlockConfig::build(kind, out_planes, planes, 1)
                }
            })
            .collect();

        Self { blocks }
    }

    /// Check if the config is valid.
    ///
    /// The stage must be non-empty, and each block's output planes must
    /// match the next block's input planes.
    pub fn try_validate(&self) -> anyhow::Result<()> {
        if self.is_empty() {
            bail!("blocks is empty");
        }

        for idx in 1..self.blocks.len() {
            let prev = &self.blocks[idx - 1];
            let curr = &self.blocks[idx];
            if prev.out_planes() != curr.in_planes() {
                bail!(
                    "block[{}].out_planes({}) != block[{}].in_planes({})",
                    idx - 1,
                    prev.out_planes(),
                    idx,
                    curr.in_planes(),
                );
            }
        }
        Ok(())
    }

    /// Panic if `try_validate` returns an error.
    pub fn expect_valid(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}\n{self:#?}");
        }
    }

    /// Apply a mapping over the blocks.
    pub fn map_blocks<F>(
        self,
        f: &mut F,
    ) -> Self
    where
        F: FnMut(usize, ResidualBlockConfig) -> ResidualBlockConfig,
    {
        Self {
            blocks: self
                .blocks
                .into_iter()
                .enumerate()
                .map(|(idx, block)| f(idx, block))
                .collect(),
        }
    }

    /// The [`LayerSpec`]s of the stage, in forward order.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        self.blocks
            .iter()
            .flat_map(|block| block.layer_specs())
            .collect()
    }

    /// Initialize a new [`LayerBlock`].
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> LayerBlock<B> {
        self.expect_valid();

        LayerBlock {
            blocks: self
                .blocks
                .into_iter()
                .map(|block| block.init(device))
                .collect(),
        }
    }
}

/// Layer block.
#[derive(Module, Debug)]
pub struct LayerBlock<B: Backend> {
    /// Internal blocks.
    pub blocks: Vec<ResidualBlock<B>>,
}

impl<B: Backend> LayerBlockMeta for LayerBlock<B> {
    fn block_metas(&self) -> Vec<&dyn ResidualBlockMeta> {
        self.blocks
            .iter()
            .map(|block| block as &dyn ResidualBlockMeta)
            .collect()
    }
}

impl<B: Backend> LayerBlock<B> {
    /// Apply the layer block.
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

        let x = self.blocks.iter().fold(input, |x, block| block.forward(x));

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
