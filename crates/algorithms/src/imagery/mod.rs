//! Imagery preprocessing
//!
//! - Per-band min-max normalization
//! - Normalized-difference indices (NDVI, NDWI, burn ratio)
//! - Before/after change feature matrix

mod features;
mod indices;
mod normalize;

pub use features::{build_change_features, ChangeFeature, FeatureMatrix, FEATURE_COUNT, FEATURE_NAMES};
pub use indices::{nbr, ndvi, ndwi, normalized_difference, SpectralIndex, INDEX_EPSILON};
pub use normalize::{normalize_band, normalize_stack, MIN_BAND_RANGE};
