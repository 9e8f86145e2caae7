//! Built-in spectral index formulas
//!
//! Band symbols in the formulas refer to band descriptions (Red, Green,
//! Blue, NIR). Only the four arithmetic operators and parentheses are used.

use crate::types::{SdrlError, SdrlResult};

const SPECTRAL_INDICES: &[(&str, &str)] = &[
    // Normalized Difference Vegetation Index
    ("NDVI", "(NIR - Red) / (NIR + Red)"),
    // Enhanced Vegetation Index
    ("EVI", "2.5 * (NIR - Red) / (NIR + 6 * Red - 7.5 * Blue + 1)"),
    // Ratio Vegetation Index
    ("RVI", "NIR / Red"),
    // Green Normalized Difference Vegetation Index
    ("GNDVI", "(NIR - Green) / (NIR + Green)"),
    // Difference Vegetation Index
    ("DVI", "NIR - Red"),
    // Normalized Difference Water Index
    ("NDWI", "(Green - NIR) / (Green + NIR)"),
    // Green Chlorophyll Vegetation Index
    ("GCVI", "(NIR / Green) - 1"),
];

/// Read-only table of index name to formula
pub struct IndexExpressionTable;

impl IndexExpressionTable {
    /// Formula for `name` (case-sensitive)
    pub fn get(name: &str) -> SdrlResult<&'static str> {
        SPECTRAL_INDICES
            .iter()
            .find(|(index, _)| *index == name)
            .map(|(_, expression)| *expression)
            .ok_or_else(|| SdrlError::UnknownIndex(name.to_string()))
    }

    pub fn contains(name: &str) -> bool {
        SPECTRAL_INDICES.iter().any(|(index, _)| *index == name)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        SPECTRAL_INDICES.iter().map(|(index, _)| *index)
    }

    pub fn iter() -> impl Iterator<Item = (&'static str, &'static str)> {
        SPECTRAL_INDICES.iter().copied()
    }
}
