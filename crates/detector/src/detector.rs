//! The change detection pipeline

use crate::config::DetectorConfig;
use crate::error::{DetectorError, Result};
use crate::model::{ModelPair, ModelSource};
use crate::summary::{ChangeReport, ChangeSummary, CLASS_OVERLAY, NDVI_CHANGE_OVERLAY};
use landchange_algorithms::change::{aggregate_changes, predict_class_probabilities, ChangeAggregate};
use landchange_algorithms::imagery::{build_change_features, ChangeFeature, FeatureMatrix};
use landchange_colormap::{render_png, ColorScheme, ColormapParams};
use landchange_core::io::load_band_stack;
use landchange_core::{Aoi, BandStack, Raster};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const CLASS_MAP_FILE: &str = "class_map.png";
const NDVI_CHANGE_FILE: &str = "ndvi_change.png";
const JOB_ID_LEN: usize = 8;

/// Class codes are drawn with the categorical palette over this fixed range
const CLASS_RANGE: (f64, f64) = (0.0, 9.0);
const NDVI_CHANGE_RANGE: (f64, f64) = (-1.0, 1.0);

/// Land-cover change detector.
///
/// Holds an immutable model pair; [`run_on_pair`](Self::run_on_pair) takes
/// `&self`, so one detector can serve concurrent jobs.
#[derive(Debug)]
pub struct ChangeDetector {
    config: DetectorConfig,
    models: ModelPair,
    source: ModelSource,
}

impl ChangeDetector {
    /// Load the models from `config.model_dir`, training and persisting a
    /// synthetic pair when none is usable.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let (models, source) = ModelPair::load_or_train(config.model_dir(), &config.training)?;
        Ok(Self {
            config,
            models,
            source,
        })
    }

    /// Use an already built model pair
    pub fn with_models(config: DetectorConfig, models: ModelPair) -> Self {
        Self {
            config,
            models,
            source: ModelSource::Loaded,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn model_source(&self) -> ModelSource {
        self.source
    }

    pub fn models(&self) -> &ModelPair {
        &self.models
    }

    /// Detect changes between two co-registered 4-band scenes (R, G, B, NIR).
    ///
    /// Both scenes are clipped to `aoi` when given. On success the job
    /// directory `output_root/<job_id>` holds `class_map.png` and
    /// `ndvi_change.png`; nothing is written when the inputs are rejected.
    pub fn run_on_pair(
        &self,
        before: &Path,
        after: &Path,
        aoi: Option<&Aoi>,
        job_id: Option<&str>,
    ) -> Result<ChangeReport> {
        let job_id = match job_id {
            Some(id) => {
                validate_job_id(id)?;
                id.to_string()
            }
            None => new_job_id(),
        };

        info!(job_id = %job_id, "Analyzing {} -> {}", before.display(), after.display());
        let report = self.run_job(&job_id, before, after, aoi);
        match &report {
            Ok(report) => info!(
                job_id = %job_id,
                percent_change = report.summary.percent_change,
                "Change analysis complete"
            ),
            Err(err) => error!(job_id = %job_id, kind = ?err.kind(), "Change analysis failed: {}", err),
        }
        report
    }

    fn run_job(&self, job_id: &str, before: &Path, after: &Path, aoi: Option<&Aoi>) -> Result<ChangeReport> {
        let before_stack = load_scene(before, aoi, "before")?;
        let after_stack = load_scene(after, aoi, "after")?;

        let features = build_change_features(&before_stack, &after_stack)?;
        debug!(rows = features.rows(), cols = features.cols(), "Change features built");

        let aggregate = self.classify(&features)?;

        let job_dir = self.config.job_dir(job_id);
        fs::create_dir_all(&job_dir)
            .map_err(|e| DetectorError::other(format!("creating {}", job_dir.display()), e))?;

        let mut overlays = BTreeMap::new();
        overlays.insert(
            CLASS_OVERLAY.to_string(),
            write_class_map(&before_stack, aggregate.class_map(), &job_dir)?,
        );
        overlays.insert(
            NDVI_CHANGE_OVERLAY.to_string(),
            write_ndvi_change(&before_stack, &features, &job_dir)?,
        );

        Ok(ChangeReport {
            summary: ChangeSummary::new(job_id, &aggregate),
            overlays,
        })
    }

    /// Threshold the classifier's per-category probabilities into a class map
    pub fn classify(&self, features: &FeatureMatrix) -> Result<ChangeAggregate> {
        let probabilities = predict_class_probabilities(&self.models.classifier, features)
            .map_err(|e| DetectorError::other("classifying pixels", e))?;
        let aggregate = aggregate_changes(&probabilities, features)?;
        debug!(
            changed = aggregate.changed_pixels(),
            total = aggregate.total_pixels(),
            "Pixels classified"
        );
        Ok(aggregate)
    }

    /// Per-pixel change magnitude from the regressor, on the feature grid
    pub fn estimate_magnitude(&self, features: &FeatureMatrix) -> Result<Array2<f64>> {
        let predictions = self
            .models
            .regressor
            .predict(features.values())
            .map_err(|e| DetectorError::other("estimating change magnitude", e))?;
        let magnitude: Vec<f64> = predictions.column(0).to_vec();
        Ok(features.reshape(&magnitude)?)
    }
}

fn load_scene(path: &Path, aoi: Option<&Aoi>, image: &'static str) -> Result<BandStack> {
    let stack = load_band_stack(path, aoi)
        .map_err(|e| DetectorError::other(format!("reading {} image {}", image, path.display()), e))?;
    if stack.is_empty() {
        return Err(DetectorError::InputBounds { image });
    }
    debug!(image, bands = stack.band_count(), rows = stack.rows(), cols = stack.cols(), "Scene loaded");
    Ok(stack)
}

fn write_class_map(reference: &BandStack, class_map: &Array2<u8>, job_dir: &Path) -> Result<PathBuf> {
    let template = reference.band_at(0)?;
    let raster: Raster<u8> = template.with_same_meta(class_map.clone())?;
    let path = job_dir.join(CLASS_MAP_FILE);
    let params = ColormapParams::with_range(ColorScheme::Tab10, CLASS_RANGE.0, CLASS_RANGE.1);
    render_png(&raster, &params, &path).map_err(|source| DetectorError::Render {
        artifact: CLASS_MAP_FILE.to_string(),
        source,
    })?;
    Ok(path)
}

fn write_ndvi_change(reference: &BandStack, features: &FeatureMatrix, job_dir: &Path) -> Result<PathBuf> {
    let template = reference.band_at(0)?;
    let raster = template.with_same_meta(features.feature_grid(ChangeFeature::DeltaNdvi))?;
    let path = job_dir.join(NDVI_CHANGE_FILE);
    let params = ColormapParams::with_range(ColorScheme::Ndvi, NDVI_CHANGE_RANGE.0, NDVI_CHANGE_RANGE.1);
    render_png(&raster, &params, &path).map_err(|source| DetectorError::Render {
        artifact: NDVI_CHANGE_FILE.to_string(),
        source,
    })?;
    Ok(path)
}

/// First 8 hex digits of a random UUID
fn new_job_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(JOB_ID_LEN);
    id
}

/// Job ids name a directory, so only `[A-Za-z0-9_-]` is accepted
fn validate_job_id(id: &str) -> Result<()> {
    let ok = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(DetectorError::Other(format!("invalid job id '{}'", id)))
    }
}
