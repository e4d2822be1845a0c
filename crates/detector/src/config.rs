//! Detector configuration

use landchange_algorithms::classification::{ForestParams, TreeParams};
use landchange_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Synthetic training set and forest hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Samples in each of the "may change" and "no change" groups (default: 2000)
    pub samples_per_group: usize,
    /// Standard deviation of the "may change" features (default: 0.2)
    pub change_spread: f64,
    /// Standard deviation of the "no change" features (default: 0.01)
    pub no_change_spread: f64,
    /// Trees per forest (default: 100)
    pub n_trees: usize,
    /// Depth limit of classification trees (default: unlimited)
    pub classifier_max_depth: Option<usize>,
    /// Depth limit of regression trees (default: 8)
    pub regressor_max_depth: Option<usize>,
    /// Seed for sampling and forests (default: 42)
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            samples_per_group: 2000,
            change_spread: 0.2,
            no_change_spread: 0.01,
            n_trees: 100,
            classifier_max_depth: None,
            regressor_max_depth: Some(8),
            seed: 42,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_group == 0 {
            return Err(Error::InvalidParameter {
                name: "samples_per_group",
                value: "0".into(),
                reason: "need at least one sample per group".into(),
            });
        }
        for (name, spread) in [
            ("change_spread", self.change_spread),
            ("no_change_spread", self.no_change_spread),
        ] {
            if !(spread.is_finite() && spread > 0.0) {
                return Err(Error::InvalidParameter {
                    name,
                    value: spread.to_string(),
                    reason: "must be a positive finite number".into(),
                });
            }
        }
        self.classifier_forest().validate()?;
        self.regressor_forest().validate()
    }

    /// Forest parameters for each change category classifier
    pub fn classifier_forest(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            bootstrap: true,
            seed: self.seed,
            tree: TreeParams {
                max_depth: self.classifier_max_depth,
                ..TreeParams::classification()
            },
        }
    }

    /// Forest parameters for each regression target
    pub fn regressor_forest(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            bootstrap: true,
            seed: self.seed,
            tree: TreeParams {
                max_depth: self.regressor_max_depth,
                ..TreeParams::regression()
            },
        }
    }
}

/// Where models live, where job outputs go, and how to train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Directory holding the persisted classifier/regressor pair
    pub model_dir: PathBuf,
    /// Root of the per-job output directories
    pub output_root: PathBuf,
    #[serde(default)]
    pub training: TrainingParams,
}

impl DetectorConfig {
    pub fn new(model_dir: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            output_root: output_root.into(),
            training: TrainingParams::default(),
        }
    }

    pub fn with_training(mut self, training: TrainingParams) -> Self {
        self.training = training;
        self
    }

    /// Output directory of one job
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.output_root.join(job_id)
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new("models", "outputs")
    }
}
