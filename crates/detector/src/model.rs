//! Persisted classifier/regressor pair
//!
//! Both models are stored as JSON next to each other in the model
//! directory. Loading checks the file version, the feature layout and the
//! tree structure, so anything stale or corrupt falls back to training.

use crate::config::TrainingParams;
use crate::error::{DetectorError, Result};
use crate::synthetic::synthetic_training_set;
use landchange_algorithms::change::ChangeCategory;
use landchange_algorithms::classification::{
    MultiOutputClassifier, MultiOutputRegressor, ProbabilisticClassifier,
};
use landchange_algorithms::imagery::{FEATURE_COUNT, FEATURE_NAMES};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const REGRESSOR_FILE: &str = "regressor.json";

/// Regression targets: estimated change magnitude and confidence
pub const REGRESSION_TARGETS: [&str; 2] = ["magnitude", "confidence"];

const FORMAT_VERSION: u32 = 1;

/// Whether a model pair came from disk or was trained on the spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Loaded,
    Trained,
}

#[derive(Serialize, Deserialize)]
struct ModelFile<T> {
    format_version: u32,
    features: Vec<String>,
    model: T,
}

/// The classifier (per-category change probabilities) and the regressor
/// (magnitude, confidence)
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPair {
    pub classifier: MultiOutputClassifier,
    pub regressor: MultiOutputRegressor,
}

impl ModelPair {
    /// Fit both models on the synthetic training set
    pub fn train(params: &TrainingParams) -> Result<Self> {
        params.validate().map_err(DetectorError::model_unavailable)?;

        let set = synthetic_training_set(params);
        debug!(
            samples = set.len(),
            deforestation = set.positives(ChangeCategory::Deforestation),
            water = set.positives(ChangeCategory::Water),
            urban = set.positives(ChangeCategory::Urban),
            agriculture = set.positives(ChangeCategory::Agriculture),
            "synthetic training set drawn"
        );

        let regressor = MultiOutputRegressor::fit(
            set.features.view(),
            set.targets.view(),
            &params.regressor_forest(),
        )
        .map_err(DetectorError::model_unavailable)?;

        let classifier = MultiOutputClassifier::fit(
            set.features.view(),
            set.labels.view(),
            &params.classifier_forest(),
        )
        .map_err(DetectorError::model_unavailable)?;

        let pair = Self {
            classifier,
            regressor,
        };
        pair.check_layout()?;
        Ok(pair)
    }

    /// Read both models from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let classifier: MultiOutputClassifier = read_model(&dir.join(CLASSIFIER_FILE))?;
        let regressor: MultiOutputRegressor = read_model(&dir.join(REGRESSOR_FILE))?;
        classifier.validate().map_err(DetectorError::model_unavailable)?;
        regressor.validate().map_err(DetectorError::model_unavailable)?;

        let pair = Self {
            classifier,
            regressor,
        };
        pair.check_layout()?;
        Ok(pair)
    }

    /// Write both models into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| DetectorError::other(format!("creating {}", dir.display()), e))?;
        write_model(&dir.join(CLASSIFIER_FILE), &self.classifier)?;
        write_model(&dir.join(REGRESSOR_FILE), &self.regressor)
    }

    /// Load the persisted pair, or train and persist a new one when the
    /// files are missing or unreadable
    pub fn load_or_train(dir: &Path, params: &TrainingParams) -> Result<(Self, ModelSource)> {
        match Self::load(dir) {
            Ok(pair) => {
                info!("Loaded change models from {}", dir.display());
                Ok((pair, ModelSource::Loaded))
            }
            Err(err) => {
                info!("No usable models in {} ({}), training synthetic models", dir.display(), err);
                let pair = Self::train(params)?;
                pair.save(dir)
                    .map_err(|e| DetectorError::model_unavailable(format!("saving trained models: {}", e)))?;
                info!("Saved synthetic models to {}", dir.display());
                Ok((pair, ModelSource::Trained))
            }
        }
    }

    fn check_layout(&self) -> Result<()> {
        let ok = self.classifier.n_features() == FEATURE_COUNT
            && self.classifier.n_outputs() == ChangeCategory::COUNT
            && self.regressor.n_features() == FEATURE_COUNT
            && self.regressor.n_outputs() == REGRESSION_TARGETS.len();
        if !ok {
            return Err(DetectorError::model_unavailable(format!(
                "expected {} features, {} categories and {} targets; got {}/{} and {}/{}",
                FEATURE_COUNT,
                ChangeCategory::COUNT,
                REGRESSION_TARGETS.len(),
                self.classifier.n_features(),
                self.classifier.n_outputs(),
                self.regressor.n_features(),
                self.regressor.n_outputs(),
            )));
        }
        Ok(())
    }
}

fn read_model<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| DetectorError::model_unavailable(format!("{}: {}", path.display(), e)))?;
    let parsed: ModelFile<T> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DetectorError::model_unavailable(format!("{}: {}", path.display(), e)))?;

    if parsed.format_version != FORMAT_VERSION {
        return Err(DetectorError::model_unavailable(format!(
            "{}: format version {} (expected {})",
            path.display(),
            parsed.format_version,
            FORMAT_VERSION
        )));
    }
    if parsed.features != FEATURE_NAMES {
        warn!("Model {} was trained on features {:?}", path.display(), parsed.features);
        return Err(DetectorError::model_unavailable(format!(
            "{}: feature layout differs",
            path.display()
        )));
    }
    Ok(parsed.model)
}

/// Serialize to a sibling temp file, then rename over the target so a
/// reader never sees a half-written model.
fn write_model<T: Serialize>(path: &Path, model: &T) -> Result<()> {
    let tmp = path.with_extension(format!("json.tmp-{}", std::process::id()));
    let file = ModelFile {
        format_version: FORMAT_VERSION,
        features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        model,
    };

    let write = || -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut out, &file)?;
        out.flush()?;
        fs::rename(&tmp, path)
    };
    write().map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DetectorError::other(format!("writing {}", path.display()), e)
    })
}
