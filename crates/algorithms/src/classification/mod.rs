//! Tree-ensemble learners for per-pixel change classification
//!
//! - **CART**: Gini / variance decision trees
//! - **Random forest**: bootstrap-aggregated trees, deterministic seeding
//! - **Multi-output**: one estimator per category or regression target

mod forest;
mod multi_output;
mod rng;
mod tree;

pub use forest::{ForestParams, RandomForest};
pub use multi_output::{
    BinaryEstimator, CategoryOutput, MultiOutputClassifier, MultiOutputRegressor,
    ProbabilisticClassifier,
};
pub use rng::Lcg;
pub use tree::{Criterion, DecisionTree, MaxFeatures, TreeParams};
