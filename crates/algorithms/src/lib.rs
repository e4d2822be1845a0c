//! # landchange Algorithms
//!
//! Per-pixel land-cover change analysis for landchange.
//!
//! ## Modules
//!
//! - **imagery**: band normalization, spectral indices, change feature matrix
//! - **classification**: CART trees, random forests, multi-output wrappers
//! - **change**: change categories, thresholding and class-map aggregation

pub mod change;
pub mod classification;
pub mod imagery;
pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::change::{
        aggregate_changes, predict_class_probabilities, ChangeAggregate, ChangeCategory,
        ClassProbabilities, CHANGE_THRESHOLD,
    };
    pub use crate::classification::{
        CategoryOutput, ForestParams, MultiOutputClassifier, MultiOutputRegressor,
        ProbabilisticClassifier, TreeParams,
    };
    pub use crate::imagery::{build_change_features, ChangeFeature, FeatureMatrix, SpectralIndex};
    pub use landchange_core::prelude::*;
}
