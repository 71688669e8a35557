//! # VGG Width Tables
//!
//! A VGG feature extractor is described by a flat list of [`WidthEntry`]s:
//! a conv stage of a given width, or a 2x2 max-pool.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One entry of a VGG width table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidthEntry {
    /// A 3x3 conv/norm/act stage with this many output channels.
    Conv(usize),

    /// A 2x2, stride 2 max-pool.
    MaxPool,
}

impl Display for WidthEntry {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Conv(width) => write!(f, "{width}"),
            Self::MaxPool => write!(f, "M"),
        }
    }
}

use WidthEntry::{Conv as C, MaxPool as M};

/// VGG-11 (configuration "A").
pub const VGG11_WIDTHS: &[WidthEntry] = &[
    C(64),
    M,
    C(128),
    M,
    C(256),
    C(256),
    M,
    C(512),
    C(512),
    M,
    C(512),
    C(512),
    M,
];

/// VGG-13 (configuration "B").
pub const VGG13_WIDTHS: &[WidthEntry] = &[
    C(64),
    C(64),
    M,
    C(128),
    C(128),
    M,
    C(256),
    C(256),
    M,
    C(512),
    C(512),
    M,
    C(512),
    C(512),
    M,
];

/// VGG-16 (configuration "D").
pub const VGG16_WIDTHS: &[WidthEntry] = &[
    C(64),
    C(64),
    M,
    C(128),
    C(128),
    M,
    C(256),
    C(256),
    C(256),
    M,
    C(512),
    C(512),
    C(512),
    M,
    C(512),
    C(512),
    C(512),
    M,
];

/// VGG-19 (configuration "E").
pub const VGG19_WIDTHS: &[WidthEntry] = &[
    C(64),
    C(64),
    M,
    C(128),
    C(128),
    M,
    C(256),
    C(256),
    C(256),
    C(256),
    M,
    C(512),
    C(512),
    C(512),
    C(512),
    M,
    C(512),
    C(512),
    C(512),
    C(512),
    M,
];

/// Well-known VGG depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VggVariant {
    /// 8 convs.
    Vgg11,
    /// 10 convs.
    Vgg13,
    /// 13 convs.
    Vgg16,
    /// 16 convs.
    Vgg19,
}

impl VggVariant {
    /// All variants, shallowest first.
    pub const ALL: [VggVariant; 4] = [Self::Vgg11, Self::Vgg13, Self::Vgg16, Self::Vgg19];

    /// The canonical lowercase name, e.g. ``"vgg16"``.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vgg11 => "vgg11",
            Self::Vgg13 => "vgg13",
            Self::Vgg16 => "vgg16",
            Self::Vgg19 => "vgg19",
        }
    }

    /// The width table.
    pub fn width_table(&self) -> &'static [WidthEntry] {
        match self {
            Self::Vgg11 => VGG11_WIDTHS,
            Self::Vgg13 => VGG13_WIDTHS,
            Self::Vgg16 => VGG16_WIDTHS,
            Self::Vgg19 => VGG19_WIDTHS,
        }
    }
}

impl Display for VggVariant {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for VggVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match Self::ALL.iter().find(|v| v.name() == name) {
            Some(variant) => Ok(*variant),
            None => bail!("Unknown VGG variant: {s:?}"),
        }
    }
}

/// Format a width table in the compact ``64 M 128 M ...`` notation.
pub fn format_width_table(table: &[WidthEntry]) -> String {
    table
        .iter()
        .map(|entry| entry.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the compact ``64 M 128 M ...`` notation.
pub fn parse_width_table(source: &str) -> anyhow::Result<Vec<WidthEntry>> {
    source
        .split_whitespace()
        .map(|token| match token {
            "M" | "m" => Ok(WidthEntry::MaxPool),
            _ => match token.parse::<usize>() {
                Ok(0) => bail!("Conv width must be > 0"),
                Ok(width) => Ok(WidthEntry::Conv(width)),
                Err(_) => bail!("Invalid width table entry: {token:?}"),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(table: &[WidthEntry]) -> (usize, usize) {
        let pools = table.iter().filter(|e| **e == WidthEntry::MaxPool).count();
        (table.len() - pools, pools)
    }

    #[test]
    fn test_table_shapes() {
        assert_eq!(count(VGG11_WIDTHS), (8, 5));
        assert_eq!(count(VGG13_WIDTHS), (10, 5));
        assert_eq!(count(VGG16_WIDTHS), (13, 5));
        assert_eq!(count(VGG19_WIDTHS), (16, 5));

        for variant in VggVariant::ALL {
            let table = variant.width_table();
            assert_eq!(table.last(), Some(&WidthEntry::MaxPool));
            assert_eq!(table[table.len() - 2], WidthEntry::Conv(512));
        }
    }

    #[test]
    fn test_format_width_table() {
        assert_eq!(
            format_width_table(VGG11_WIDTHS),
            "64 M 128 M 256 256 M 512 512 M 512 512 M"
        );
        assert_eq!(
            format_width_table(VGG19_WIDTHS),
            "64 64 M 128 128 M 256 256 256 256 M 512 512 512 512 M 512 512 512 512 M"
        );
    }

    #[test]
    fn test_parse_width_table() {
        assert_eq!(
            parse_width_table("64 64 M 128 128 M 256 256 256 M 512 512 512 M 512 512 512 M")
                .unwrap(),
            VGG16_WIDTHS.to_vec()
        );
        assert_eq!(
            parse_width_table("8 m 16").unwrap(),
            vec![WidthEntry::Conv(8), WidthEntry::MaxPool, WidthEntry::Conv(16)]
        );

        assert_eq!(
            parse_width_table("64 X").unwrap_err().to_string(),
            "Invalid width table entry: \"X\""
        );
        assert!(parse_width_table("0 M").is_err());
    }

    #[test]
    fn test_variant_names() {
        for variant in VggVariant::ALL {
            assert_eq!(variant.name().parse::<VggVariant>().unwrap(), variant);
            assert_eq!(variant.to_string(), variant.name());
        }
        assert_eq!(" VGG13 ".parse::<VggVariant>().unwrap(), VggVariant::Vgg13);
        assert_eq!(
            "vgg12".parse::<VggVariant>().unwrap_err().to_string(),
            "Unknown VGG variant: \"vgg12\""
        );
    }
}
