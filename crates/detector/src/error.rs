//! Error taxonomy of a change analysis run

use landchange_colormap::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

type CoreError = landchange_core::Error;

/// Why a detector could not be built or a run failed
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The AOI left no data in one of the images
    #[error("selected AOI is empty or outside the {image} image bounds")]
    InputBounds { image: &'static str },

    /// Before and after images cannot be compared pixel for pixel
    #[error("before/after images are not aligned: {0}")]
    ShapeMismatch(#[source] CoreError),

    /// The model pair could neither be loaded nor trained
    #[error("change models not initialized: {reason}")]
    ModelUnavailable { reason: String },

    #[error("failed to render {artifact}: {source}")]
    Render {
        artifact: String,
        #[source]
        source: RenderError,
    },

    #[error("{0}")]
    Other(String),
}

impl DetectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetectorError::InputBounds { .. } => ErrorKind::InputBounds,
            DetectorError::ShapeMismatch(_) => ErrorKind::ShapeMismatch,
            DetectorError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            DetectorError::Render { .. } => ErrorKind::Render,
            DetectorError::Other(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn model_unavailable(reason: impl fmt::Display) -> Self {
        DetectorError::ModelUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Attach what was being done to an unexpected failure
    pub(crate) fn other(context: impl fmt::Display, err: impl fmt::Display) -> Self {
        DetectorError::Other(format!("{}: {}", context, err))
    }
}

impl From<CoreError> for DetectorError {
    fn from(err: CoreError) -> Self {
        if err.is_alignment() {
            DetectorError::ShapeMismatch(err)
        } else {
            DetectorError::Other(err.to_string())
        }
    }
}

/// Machine-readable error class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputBounds,
    ShapeMismatch,
    ModelUnavailable,
    Render,
    Internal,
}

/// `{kind, message}` form of an error, for structured reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DetectorError> for ErrorReport {
    fn from(err: &DetectorError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
