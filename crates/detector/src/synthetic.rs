//! Synthetic training data for the default model pair
//!
//! Two groups of feature rows: one drawn wide enough to cross the change
//! thresholds, one packed around zero and labelled "no change". Labels of
//! the first group come from fixed rules on the deltas.

use crate::config::TrainingParams;
use landchange_algorithms::change::ChangeCategory;
use landchange_algorithms::classification::Lcg;
use landchange_algorithms::imagery::{ChangeFeature, FEATURE_COUNT};
use ndarray::{Array2, ArrayView1};

/// dNDVI below this is deforestation
pub const DEFORESTATION_DNDVI: f64 = -0.15;
/// dNDWI above this is new water
pub const WATER_DNDWI: f64 = 0.2;
/// Mean absolute RGB delta above this is urban change
pub const URBAN_MEAN_DRGB: f64 = 0.08;
/// dNDVI above this is agriculture
pub const AGRICULTURE_DNDVI: f64 = 0.15;

/// Magnitude target range of changed samples
pub const MAGNITUDE_RANGE: (f64, f64) = (500.0, 2000.0);
/// Confidence target range of changed samples
pub const CONFIDENCE_RANGE: (f64, f64) = (70.0, 95.0);

/// Features, per-category labels and regression targets
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSet {
    /// `N x 6` change features
    pub features: Array2<f64>,
    /// `N x 4` 0/1 labels in category order
    pub labels: Array2<u8>,
    /// `N x 2` (magnitude, confidence)
    pub targets: Array2<f64>,
}

impl SyntheticSet {
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    /// Samples labelled positive for `category`
    pub fn positives(&self, category: ChangeCategory) -> usize {
        self.labels.column(category.index()).iter().filter(|&&l| l == 1).count()
    }
}

/// Labels of one feature row, in [`ChangeCategory::ALL`] order
pub fn change_labels(row: ArrayView1<'_, f64>) -> [u8; ChangeCategory::COUNT] {
    let dndvi = row[ChangeFeature::DeltaNdvi.index()];
    let dndwi = row[ChangeFeature::DeltaNdwi.index()];
    let mean_drgb = [ChangeFeature::DeltaRed, ChangeFeature::DeltaGreen, ChangeFeature::DeltaBlue]
        .iter()
        .map(|f| row[f.index()].abs())
        .sum::<f64>()
        / 3.0;

    [
        u8::from(dndvi < DEFORESTATION_DNDVI),
        u8::from(dndwi > WATER_DNDWI),
        u8::from(mean_drgb > URBAN_MEAN_DRGB),
        u8::from(dndvi > AGRICULTURE_DNDVI),
    ]
}

/// Draw the training set. Deterministic for a given `params.seed`.
pub fn synthetic_training_set(params: &TrainingParams) -> SyntheticSet {
    let n = params.samples_per_group;
    let mut rng = Lcg::new(params.seed);

    let mut features = Array2::zeros((2 * n, FEATURE_COUNT));
    for ((i, _), value) in features.indexed_iter_mut() {
        let spread = if i < n {
            params.change_spread
        } else {
            params.no_change_spread
        };
        *value = rng.normal(0.0, spread);
    }

    let mut labels = Array2::zeros((2 * n, ChangeCategory::COUNT));
    for i in 0..n {
        let row_labels = change_labels(features.row(i));
        for (k, &label) in row_labels.iter().enumerate() {
            labels[[i, k]] = label;
        }
    }

    let mut targets = Array2::zeros((2 * n, 2));
    for i in 0..2 * n {
        if labels.row(i).iter().any(|&l| l == 1) {
            targets[[i, 0]] = rng.uniform(MAGNITUDE_RANGE.0, MAGNITUDE_RANGE.1);
            targets[[i, 1]] = rng.uniform(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1);
        }
    }

    SyntheticSet {
        features,
        labels,
        targets,
    }
}
