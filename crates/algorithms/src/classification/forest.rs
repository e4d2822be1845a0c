//! Random forests of CART trees
//!
//! Each tree is fit on a bootstrap sample drawn with its own generator,
//! seeded `seed + tree_index`, so the fitted forest does not depend on
//! whether trees are grown in parallel. Predictions average the trees'
//! leaf values (class-1 probability for classification, mean target for
//! regression).

use super::rng::Lcg;
use super::tree::{DecisionTree, TreeParams};
use crate::maybe_rayon::*;
use landchange_core::{Error, Result};
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Parameters for [`RandomForest::fit`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees (default: 100)
    pub n_trees: usize,
    /// Draw a bootstrap sample per tree (default: true)
    pub bootstrap: bool,
    /// Base seed (default: 42)
    pub seed: u64,
    pub tree: TreeParams,
}

impl ForestParams {
    pub fn classification() -> Self {
        Self {
            n_trees: 100,
            bootstrap: true,
            seed: 42,
            tree: TreeParams::classification(),
        }
    }

    pub fn regression() -> Self {
        Self {
            tree: TreeParams::regression(),
            ..Self::classification()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(Error::InvalidParameter {
                name: "n_trees",
                value: "0".into(),
                reason: "a forest needs at least one tree".into(),
            });
        }
        self.tree.validate()
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::classification()
    }
}

/// A fitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit on all rows of `x` against targets `y`
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &ForestParams) -> Result<Self> {
        params.validate()?;
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(Error::SizeMismatch {
                er: n,
                ec: x.ncols(),
                ar: y.len(),
                ac: 1,
            });
        }

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = Lcg::new(params.seed.wrapping_add(t as u64));
                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.next_below(n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(x, y, &samples, &params.tree, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            trees,
            n_features: x.ncols(),
        })
    }

    /// Mean tree output for every row of `x`
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.check_features(x)?;
        let n_trees = self.trees.len() as f64;
        let out: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees
            })
            .collect();
        Ok(Array1::from(out))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Structural check for forests read from disk
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::Algorithm("forest has no trees".into()));
        }
        for tree in &self.trees {
            if tree.n_features() != self.n_features {
                return Err(Error::Algorithm(format!(
                    "tree expects {} features, forest {}",
                    tree.n_features(),
                    self.n_features
                )));
            }
            tree.validate()?;
        }
        Ok(())
    }

    fn check_features(&self, x: ArrayView2<'_, f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(Error::SizeMismatch {
                er: x.nrows(),
                ec: self.n_features,
                ar: x.nrows(),
                ac: x.ncols(),
            });
        }
        Ok(())
    }
}
