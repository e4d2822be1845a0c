//! Per-pixel probabilities to class map and change statistics

use super::category::{ChangeCategory, NO_CHANGE_CODE};
use crate::classification::{CategoryOutput, ProbabilisticClassifier};
use crate::imagery::FeatureMatrix;
use crate::maybe_rayon::*;
use landchange_core::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// A category is "changed" when its probability is strictly above this
pub const CHANGE_THRESHOLD: f64 = 0.5;

/// `N x 4` positive-class probabilities in [`ChangeCategory::ALL`] order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities {
    values: Array2<f64>,
}

impl ClassProbabilities {
    pub fn new(values: Array2<f64>) -> Result<Self> {
        if values.ncols() != ChangeCategory::COUNT {
            return Err(Error::SizeMismatch {
                er: values.nrows(),
                ec: ChangeCategory::COUNT,
                ar: values.nrows(),
                ac: values.ncols(),
            });
        }
        Ok(Self { values })
    }

    /// Collect classifier outputs; categories never observed positive get
    /// probability 0 for every pixel.
    pub fn from_outputs(outputs: Vec<CategoryOutput>, n_pixels: usize) -> Result<Self> {
        if outputs.len() != ChangeCategory::COUNT {
            return Err(Error::Algorithm(format!(
                "classifier produced {} outputs, expected {}",
                outputs.len(),
                ChangeCategory::COUNT
            )));
        }
        let mut values = Array2::zeros((n_pixels, ChangeCategory::COUNT));
        for (k, output) in outputs.into_iter().enumerate() {
            let column = output.into_probabilities(n_pixels);
            if column.len() != n_pixels {
                return Err(Error::SizeMismatch {
                    er: n_pixels,
                    ec: 1,
                    ar: column.len(),
                    ac: 1,
                });
            }
            values.column_mut(k).assign(&column);
        }
        Self::new(values)
    }

    pub fn n_pixels(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn category(&self, category: ChangeCategory) -> ArrayView1<'_, f64> {
        self.values.column(category.index())
    }
}

/// Run a classifier over a feature matrix
pub fn predict_class_probabilities<C>(classifier: &C, features: &FeatureMatrix) -> Result<ClassProbabilities>
where
    C: ProbabilisticClassifier + ?Sized,
{
    let outputs = classifier.predict_proba(features.values())?;
    ClassProbabilities::from_outputs(outputs, features.n_pixels())
}

/// Class map plus the counts derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeAggregate {
    class_map: Array2<u8>,
    changed_pixels: usize,
    category_counts: [usize; ChangeCategory::COUNT],
}

impl ChangeAggregate {
    /// H x W grid of codes: 0 unchanged, otherwise [`ChangeCategory::code`]
    pub fn class_map(&self) -> &Array2<u8> {
        &self.class_map
    }

    pub fn into_class_map(self) -> Array2<u8> {
        self.class_map
    }

    pub fn total_pixels(&self) -> usize {
        self.class_map.len()
    }

    pub fn changed_pixels(&self) -> usize {
        self.changed_pixels
    }

    /// Pixels whose dominant category is `category`
    pub fn count(&self, category: ChangeCategory) -> usize {
        self.category_counts[category.index()]
    }

    /// `100 * changed / total`, rounded to 3 decimals
    pub fn percent_change(&self) -> f64 {
        let total = self.total_pixels();
        if total == 0 {
            return 0.0;
        }
        let percent = 100.0 * self.changed_pixels as f64 / total as f64;
        (percent * 1000.0).round() / 1000.0
    }
}

/// Threshold probabilities and lay the dominant category of each changed
/// pixel back out on the feature matrix's grid.
pub fn aggregate_changes(probabilities: &ClassProbabilities, features: &FeatureMatrix) -> Result<ChangeAggregate> {
    if probabilities.n_pixels() != features.n_pixels() {
        return Err(Error::SizeMismatch {
            er: features.n_pixels(),
            ec: ChangeCategory::COUNT,
            ar: probabilities.n_pixels(),
            ac: ChangeCategory::COUNT,
        });
    }

    let values = probabilities.values();
    let codes: Vec<u8> = (0..values.nrows())
        .into_par_iter()
        .map(|i| pixel_code(values.row(i)))
        .collect();

    let class_map = features.reshape(&codes)?;

    let mut category_counts = [0usize; ChangeCategory::COUNT];
    for category in class_map.iter().filter_map(|&c| ChangeCategory::from_code(c)) {
        category_counts[category.index()] += 1;
    }
    let changed_pixels = class_map.iter().filter(|&&c| c != NO_CHANGE_CODE).count();

    Ok(ChangeAggregate {
        class_map,
        changed_pixels,
        category_counts,
    })
}

/// 0 when no category exceeds the threshold, else the code of the first
/// category holding the maximum probability
fn pixel_code(row: ArrayView1<'_, f64>) -> u8 {
    if !row.iter().any(|&p| p > CHANGE_THRESHOLD) {
        return NO_CHANGE_CODE;
    }
    let mut best = 0;
    for k in 1..row.len() {
        if row[k] > row[best] {
            best = k;
        }
    }
    ChangeCategory::ALL[best].code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::FEATURE_COUNT;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    fn features(rows: usize, cols: usize) -> FeatureMatrix {
        FeatureMatrix::new(Array2::zeros((rows * cols, FEATURE_COUNT)), rows, cols).unwrap()
    }

    #[test]
    fn threshold_and_argmax() {
        let probs = ClassProbabilities::new(array![
            [0.5, 0.5, 0.5, 0.5],   // nothing above threshold
            [0.1, 0.9, 0.2, 0.0],   // water only
            [0.7, 0.6, 0.8, 0.1],   // urban dominates
            [0.6, 0.6, 0.1, 0.6],   // tie resolves to deforestation
            [0.0, 0.0, 0.0, 0.51],  // agriculture
            [0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap();
        let agg = aggregate_changes(&probs, &features(2, 3)).unwrap();

        assert_eq!(agg.class_map(), &array![[0u8, 2, 3], [1, 4, 0]]);
        assert_eq!(agg.changed_pixels(), 4);
        assert_eq!(agg.count(ChangeCategory::Deforestation), 1);
        assert_eq!(agg.count(ChangeCategory::Water), 1);
        assert_eq!(agg.count(ChangeCategory::Urban), 1);
        assert_eq!(agg.count(ChangeCategory::Agriculture), 1);
        assert_relative_eq!(agg.percent_change(), 66.667);
    }

    #[test]
    fn counts_never_exceed_changed_pixels() {
        let probs = ClassProbabilities::new(Array2::from_elem((9, 4), 0.9)).unwrap();
        let agg = aggregate_changes(&probs, &features(3, 3)).unwrap();
        let total: usize = ChangeCategory::ALL.iter().map(|&c| agg.count(c)).sum();
        assert_eq!(total, agg.changed_pixels());
        assert_eq!(agg.count(ChangeCategory::Deforestation), 9);
        assert_eq!(agg.percent_change(), 100.0);
    }

    #[test]
    fn unchanged_scene_is_zero_percent() {
        let probs = ClassProbabilities::new(Array2::zeros((16, 4))).unwrap();
        let agg = aggregate_changes(&probs, &features(4, 4)).unwrap();
        assert_eq!(agg.percent_change(), 0.0);
        assert!(agg.class_map().iter().all(|&c| c == NO_CHANGE_CODE));
    }

    #[test]
    fn never_observed_categories_are_zero() {
        let outputs = vec![
            CategoryOutput::Probabilities(Array1::from_elem(2, 0.9)),
            CategoryOutput::NeverObservedPositive,
            CategoryOutput::NeverObservedPositive,
            CategoryOutput::Probabilities(array![0.2, 0.95]),
        ];
        let probs = ClassProbabilities::from_outputs(outputs, 2).unwrap();
        assert_eq!(probs.category(ChangeCategory::Water), array![0.0, 0.0]);
        let agg = aggregate_changes(&probs, &features(1, 2)).unwrap();
        assert_eq!(agg.class_map(), &array![[1u8, 4]]);
    }

    #[test]
    fn malformed_outputs_are_rejected() {
        let short = vec![CategoryOutput::NeverObservedPositive; 3];
        assert!(ClassProbabilities::from_outputs(short, 2).is_err());

        let wrong_len = vec![
            CategoryOutput::Probabilities(Array1::zeros(3)),
            CategoryOutput::NeverObservedPositive,
            CategoryOutput::NeverObservedPositive,
            CategoryOutput::NeverObservedPositive,
        ];
        assert!(ClassProbabilities::from_outputs(wrong_len, 2).is_err());

        let probs = ClassProbabilities::new(Array2::zeros((4, 4))).unwrap();
        assert!(aggregate_changes(&probs, &features(3, 3)).is_err());
    }
}
