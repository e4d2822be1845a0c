//! Result records of a change analysis run

use landchange_algorithms::change::{ChangeAggregate, ChangeCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Reported confidence. Fixed: the regressor's confidence output does not
/// feed the summary.
pub const CONFIDENCE_PLACEHOLDER: f64 = 85.5;

/// Overlay key of the class-map image
pub const CLASS_OVERLAY: &str = "class_png";
/// Overlay key of the dNDVI image
pub const NDVI_CHANGE_OVERLAY: &str = "ndvi_change_png";

/// Pixels per dominant change category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    #[serde(rename = "Deforestation")]
    pub deforestation: usize,
    #[serde(rename = "Water")]
    pub water: usize,
    #[serde(rename = "Urban")]
    pub urban: usize,
    #[serde(rename = "Agriculture")]
    pub agriculture: usize,
}

impl CategoryCounts {
    pub fn from_aggregate(aggregate: &ChangeAggregate) -> Self {
        Self {
            deforestation: aggregate.count(ChangeCategory::Deforestation),
            water: aggregate.count(ChangeCategory::Water),
            urban: aggregate.count(ChangeCategory::Urban),
            agriculture: aggregate.count(ChangeCategory::Agriculture),
        }
    }

    pub fn get(&self, category: ChangeCategory) -> usize {
        match category {
            ChangeCategory::Deforestation => self.deforestation,
            ChangeCategory::Water => self.water,
            ChangeCategory::Urban => self.urban,
            ChangeCategory::Agriculture => self.agriculture,
        }
    }

    pub fn total(&self) -> usize {
        self.deforestation + self.water + self.urban + self.agriculture
    }
}

/// Summary of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub job_id: String,
    /// Changed pixels as a percentage of all pixels, 3 decimals
    pub percent_change: f64,
    pub confidence_pct: f64,
    pub categories: CategoryCounts,
}

impl ChangeSummary {
    pub fn new(job_id: impl Into<String>, aggregate: &ChangeAggregate) -> Self {
        Self {
            job_id: job_id.into(),
            percent_change: aggregate.percent_change(),
            confidence_pct: CONFIDENCE_PLACEHOLDER,
            categories: CategoryCounts::from_aggregate(aggregate),
        }
    }
}

/// Summary plus the overlay images written for the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub summary: ChangeSummary,
    /// Overlay name to file path
    pub overlays: BTreeMap<String, PathBuf>,
}
