//! One binary classifier (or regressor) per output column
//!
//! A category whose training labels never contain the positive class gets
//! a constant estimator instead of a forest, and reports
//! [`CategoryOutput::NeverObservedPositive`] rather than a probability
//! vector. Callers handle that case per category.

use super::forest::{ForestParams, RandomForest};
use landchange_core::{Error, Result};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Per-category prediction
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryOutput {
    /// Probability of the positive class for every row
    Probabilities(Array1<f64>),
    /// The estimator only ever saw the negative class
    NeverObservedPositive,
}

impl CategoryOutput {
    /// Positive-class probabilities, zeros when the class was never observed
    pub fn into_probabilities(self, n_rows: usize) -> Array1<f64> {
        match self {
            CategoryOutput::Probabilities(p) => p,
            CategoryOutput::NeverObservedPositive => Array1::zeros(n_rows),
        }
    }
}

/// Anything that yields per-category positive-class probabilities
pub trait ProbabilisticClassifier: Send + Sync {
    /// Number of categories
    fn n_outputs(&self) -> usize;

    /// Expected feature columns
    fn n_features(&self) -> usize;

    /// One [`CategoryOutput`] per category, in category order
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<CategoryOutput>>;
}

/// Binary estimator for a single category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinaryEstimator {
    Forest(RandomForest),
    /// Only one label was present in training
    Constant { label: u8 },
}

impl BinaryEstimator {
    /// Fit on 0/1 labels; single-label columns become [`BinaryEstimator::Constant`]
    pub fn fit(x: ArrayView2<'_, f64>, labels: &[u8], params: &ForestParams) -> Result<Self> {
        if let Some(&bad) = labels.iter().find(|&&l| l > 1) {
            return Err(Error::InvalidParameter {
                name: "labels",
                value: bad.to_string(),
                reason: "binary labels must be 0 or 1".into(),
            });
        }
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 {
            return Ok(BinaryEstimator::Constant { label: 0 });
        }
        if positives == labels.len() {
            return Ok(BinaryEstimator::Constant { label: 1 });
        }
        let y: Vec<f64> = labels.iter().map(|&l| f64::from(l)).collect();
        Ok(BinaryEstimator::Forest(RandomForest::fit(x, &y, params)?))
    }

    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<CategoryOutput> {
        match self {
            BinaryEstimator::Forest(forest) => forest.predict(x).map(CategoryOutput::Probabilities),
            BinaryEstimator::Constant { label: 0 } => Ok(CategoryOutput::NeverObservedPositive),
            BinaryEstimator::Constant { .. } => Ok(CategoryOutput::Probabilities(Array1::ones(x.nrows()))),
        }
    }

    fn validate(&self, n_features: usize) -> Result<()> {
        match self {
            BinaryEstimator::Forest(forest) if forest.n_features() != n_features => Err(Error::Algorithm(
                format!("estimator expects {} features, model {}", forest.n_features(), n_features),
            )),
            BinaryEstimator::Forest(forest) => forest.validate(),
            BinaryEstimator::Constant { label } if *label > 1 => {
                Err(Error::Algorithm(format!("constant label {} is not binary", label)))
            }
            BinaryEstimator::Constant { .. } => Ok(()),
        }
    }
}

/// Independent binary classifiers, one per label column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputClassifier {
    estimators: Vec<BinaryEstimator>,
    n_features: usize,
}

impl MultiOutputClassifier {
    /// Fit one estimator per column of `labels` (N x K, values 0/1)
    pub fn fit(x: ArrayView2<'_, f64>, labels: ArrayView2<'_, u8>, params: &ForestParams) -> Result<Self> {
        check_rows(x, labels.nrows())?;
        let estimators = labels
            .columns()
            .into_iter()
            .map(|column| BinaryEstimator::fit(x, &column.to_vec(), params))
            .collect::<Result<Vec<_>>>()?;
        Self::from_estimators(estimators, x.ncols())
    }

    /// Assemble from already fitted estimators
    pub fn from_estimators(estimators: Vec<BinaryEstimator>, n_features: usize) -> Result<Self> {
        let model = Self {
            estimators,
            n_features,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn estimators(&self) -> &[BinaryEstimator] {
        &self.estimators
    }

    /// Structural check for models read from disk
    pub fn validate(&self) -> Result<()> {
        if self.estimators.is_empty() {
            return Err(Error::Algorithm("classifier has no outputs".into()));
        }
        self.estimators
            .iter()
            .try_for_each(|e| e.validate(self.n_features))
    }
}

impl ProbabilisticClassifier for MultiOutputClassifier {
    fn n_outputs(&self) -> usize {
        self.estimators.len()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<CategoryOutput>> {
        check_features(x, self.n_features)?;
        self.estimators.iter().map(|e| e.predict_proba(x)).collect()
    }
}

/// Independent regression forests, one per target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputRegressor {
    forests: Vec<RandomForest>,
    n_features: usize,
}

impl MultiOutputRegressor {
    /// Fit one forest per column of `targets` (N x K)
    pub fn fit(x: ArrayView2<'_, f64>, targets: ArrayView2<'_, f64>, params: &ForestParams) -> Result<Self> {
        check_rows(x, targets.nrows())?;
        let forests = targets
            .columns()
            .into_iter()
            .map(|column| RandomForest::fit(x, &column.to_vec(), params))
            .collect::<Result<Vec<_>>>()?;
        let model = Self {
            forests,
            n_features: x.ncols(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn n_outputs(&self) -> usize {
        self.forests.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// N x K predictions
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        check_features(x, self.n_features)?;
        let mut out = Array2::zeros((x.nrows(), self.forests.len()));
        for (j, forest) in self.forests.iter().enumerate() {
            out.column_mut(j).assign(&forest.predict(x)?);
        }
        Ok(out)
    }

    /// Structural check for models read from disk
    pub fn validate(&self) -> Result<()> {
        if self.forests.is_empty() {
            return Err(Error::Algorithm("regressor has no outputs".into()));
        }
        for forest in &self.forests {
            if forest.n_features() != self.n_features {
                return Err(Error::Algorithm("regressor outputs disagree on feature count".into()));
            }
            forest.validate()?;
        }
        Ok(())
    }
}

fn check_rows(x: ArrayView2<'_, f64>, target_rows: usize) -> Result<()> {
    if x.nrows() == 0 || x.nrows() != target_rows {
        return Err(Error::SizeMismatch {
            er: x.nrows(),
            ec: x.ncols(),
            ar: target_rows,
            ac: x.ncols(),
        });
    }
    Ok(())
}

fn check_features(x: ArrayView2<'_, f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(Error::SizeMismatch {
            er: x.nrows(),
            ec: n_features,
            ar: x.nrows(),
            ac: x.ncols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::rng::Lcg;
    use ndarray::{array, Array2};

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 10,
            ..ForestParams::classification()
        }
    }

    fn data() -> (Array2<f64>, Array2<u8>) {
        let mut rng = Lcg::new(5);
        let x = Array2::from_shape_fn((300, 2), |_| rng.uniform(-1.0, 1.0));
        let labels = Array2::from_shape_fn((300, 3), |(i, k)| match k {
            0 => u8::from(x[[i, 0]] < -0.3),
            1 => 0,
            _ => u8::from(x[[i, 1]] > 0.3),
        });
        (x, labels)
    }

    #[test]
    fn degenerate_column_reports_never_observed() {
        let (x, labels) = data();
        let model = MultiOutputClassifier::fit(x.view(), labels.view(), &params()).unwrap();

        assert_eq!(model.n_outputs(), 3);
        assert!(matches!(model.estimators()[0], BinaryEstimator::Forest(_)));
        assert_eq!(model.estimators()[1], BinaryEstimator::Constant { label: 0 });

        let probe = array![[-0.9, 0.9], [0.9, -0.9]];
        let out = model.predict_proba(probe.view()).unwrap();
        assert_eq!(out[1], CategoryOutput::NeverObservedPositive);

        let CategoryOutput::Probabilities(p0) = &out[0] else {
            panic!("expected probabilities");
        };
        assert!(p0[0] > 0.5 && p0[1] < 0.5);
        let p2 = out[2].clone().into_probabilities(2);
        assert!(p2[0] > 0.5 && p2[1] < 0.5);
    }

    #[test]
    fn all_positive_column_is_constant_one() {
        let x = array![[0.0], [1.0]];
        let est = BinaryEstimator::fit(x.view(), &[1, 1], &params()).unwrap();
        assert_eq!(est, BinaryEstimator::Constant { label: 1 });
        let out = est.predict_proba(x.view()).unwrap();
        assert_eq!(out, CategoryOutput::Probabilities(array![1.0, 1.0]));
        assert!(BinaryEstimator::fit(x.view(), &[0, 2], &params()).is_err());
    }

    #[test]
    fn never_observed_becomes_zeros() {
        let p = CategoryOutput::NeverObservedPositive.into_probabilities(3);
        assert_eq!(p, array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn classifier_json_roundtrip() {
        let (x, labels) = data();
        let model = MultiOutputClassifier::fit(x.view(), labels.view(), &params()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: MultiOutputClassifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
        assert!(back.validate().is_ok());
        assert!(json.contains(r#""kind":"constant""#));
    }

    #[test]
    fn regressor_predicts_each_target() {
        let (x, _) = data();
        let targets = Array2::from_shape_fn((300, 2), |(i, k)| if k == 0 { 1000.0 + 100.0 * x[[i, 0]] } else { 80.0 });
        let params = ForestParams {
            n_trees: 5,
            ..ForestParams::regression()
        };
        let model = MultiOutputRegressor::fit(x.view(), targets.view(), &params).unwrap();
        let out = model.predict(x.slice(ndarray::s![..4, ..])).unwrap();

        assert_eq!(out.dim(), (4, 2));
        assert!(out.column(0).iter().all(|&v| (900.0..=1100.0).contains(&v)));
        assert!(out.column(1).iter().all(|&v| v == 80.0));
    }

    #[test]
    fn feature_count_is_checked() {
        let (x, labels) = data();
        let model = MultiOutputClassifier::fit(x.view(), labels.view(), &params()).unwrap();
        let wide = Array2::<f64>::zeros((1, 3));
        assert!(model.predict_proba(wide.view()).is_err());
        assert!(MultiOutputClassifier::fit(x.view(), labels.slice(ndarray::s![..10, ..]), &params()).is_err());
        assert!(MultiOutputClassifier::from_estimators(vec![], 2).is_err());
    }
}
