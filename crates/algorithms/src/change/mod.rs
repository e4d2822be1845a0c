//! Change categories and aggregation of per-pixel probabilities

mod aggregate;
mod category;

pub use aggregate::{
    aggregate_changes, predict_class_probabilities, ChangeAggregate, ClassProbabilities,
    CHANGE_THRESHOLD,
};
pub use category::{ChangeCategory, NO_CHANGE_CODE};
