//! # landchange Detector
//!
//! Land-cover change detection between a "before" and an "after" scene.
//!
//! [`ChangeDetector::run_on_pair`] clips both 4-band scenes to an optional
//! AOI, derives per-pixel change features, classifies each pixel into
//! Deforestation, Water, Urban or Agriculture change with a persisted
//! random-forest pair, and writes colorized overlays for the job.
//!
//! ## Usage
//!
//! ```ignore
//! use landchange_detector::{ChangeDetector, DetectorConfig};
//!
//! let detector = ChangeDetector::new(DetectorConfig::new("models", "outputs"))?;
//! let report = detector.run_on_pair("before.tif".as_ref(), "after.tif".as_ref(), None, None)?;
//! println!("{}% changed", report.summary.percent_change);
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod model;
pub mod summary;
pub mod synthetic;

pub use config::{DetectorConfig, TrainingParams};
pub use detector::ChangeDetector;
pub use error::{DetectorError, ErrorKind, ErrorReport, Result};
pub use model::{ModelPair, ModelSource, CLASSIFIER_FILE, REGRESSOR_FILE};
pub use summary::{CategoryCounts, ChangeReport, ChangeSummary, CLASS_OVERLAY, NDVI_CHANGE_OVERLAY};
