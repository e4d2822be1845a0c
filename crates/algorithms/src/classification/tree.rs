//! CART decision trees
//!
//! Binary splits of the form `x[feature] <= threshold`, grown greedily by
//! impurity: Gini for 0/1 labels, variance for continuous targets. Every
//! leaf stores a single value, the mean target of its samples, which is
//! the positive-class probability for classification.
//!
//! Trees are stored as a flat node array so they serialize compactly.

use super::rng::Lcg;
use landchange_core::{Error, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Feature values closer than this are treated as equal when placing splits
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity of 0/1 labels
    Gini,
    /// Variance of a continuous target
    Variance,
}

impl Criterion {
    /// Node impurity from the count, sum and sum of squares of its targets
    fn impurity(self, n: f64, sum: f64, sum_sq: f64) -> f64 {
        if n <= 0.0 {
            return 0.0;
        }
        let mean = sum / n;
        match self {
            Criterion::Gini => 2.0 * mean * (1.0 - mean),
            Criterion::Variance => (sum_sq / n - mean * mean).max(0.0),
        }
    }
}

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    /// `floor(sqrt(n_features))`, at least 1
    Sqrt,
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
        }
    }
}

/// Parameters for growing a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub criterion: Criterion,
    /// Maximum depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node (default: 2)
    pub min_samples_split: usize,
    /// Minimum samples in each child (default: 1)
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl TreeParams {
    /// Gini trees over `sqrt(n_features)` candidates, fully grown
    pub fn classification() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
        }
    }

    /// Variance trees over all features
    pub fn regression() -> Self {
        Self {
            criterion: Criterion::Variance,
            max_features: MaxFeatures::All,
            ..Self::classification()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(Error::InvalidParameter {
                name: "min_samples_split",
                value: self.min_samples_split.to_string(),
                reason: "must be at least 2".into(),
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::InvalidParameter {
                name: "min_samples_leaf",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(Error::InvalidParameter {
                name: "max_depth",
                value: "0".into(),
                reason: "must be at least 1 when set".into(),
            });
        }
        Ok(())
    }
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::classification()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on the rows of `x` listed in `samples` (duplicates
    /// allowed, as produced by bootstrapping).
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        samples: &[usize],
        params: &TreeParams,
        rng: &mut Lcg,
    ) -> Result<Self> {
        params.validate()?;
        if x.nrows() != y.len() {
            return Err(Error::SizeMismatch {
                er: x.nrows(),
                ec: 1,
                ar: y.len(),
                ac: 1,
            });
        }
        if x.ncols() == 0 || samples.is_empty() {
            return Err(Error::Algorithm("cannot fit a tree on empty data".into()));
        }
        if let Some(&bad) = samples.iter().find(|&&i| i >= x.nrows()) {
            return Err(Error::IndexOutOfBounds {
                row: bad,
                col: 0,
                rows: x.nrows(),
                cols: x.ncols(),
            });
        }

        let n_features = x.ncols();
        let mut builder = Builder {
            x: x.view(),
            y,
            params,
            n_candidates: params.max_features.resolve(n_features),
            features: (0..n_features).collect(),
            rng,
            nodes: Vec::new(),
        };
        let mut samples = samples.to_vec();
        builder.grow(&mut samples, 0);

        Ok(Self {
            nodes: builder.nodes,
            n_features,
        })
    }

    /// Leaf value reached by one feature row
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if row[feature] <= threshold { left } else { right },
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, d)) = stack.pop() {
            max = max.max(d);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(id) {
                stack.push((*left, d + 1));
                stack.push((*right, d + 1));
            }
        }
        max
    }

    /// Structural check for trees read from disk: children point forward
    /// and inside the node array, features are in range, values finite.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Algorithm("tree has no nodes".into()));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            let ok = match *node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    feature < self.n_features
                        && !threshold.is_nan()
                        && left > id
                        && right > id
                        && left < self.nodes.len()
                        && right < self.nodes.len()
                }
            };
            if !ok {
                return Err(Error::Algorithm(format!("malformed tree node {}", id)));
            }
        }
        Ok(())
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

struct Builder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [f64],
    params: &'a TreeParams,
    n_candidates: usize,
    features: Vec<usize>,
    rng: &'a mut Lcg,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    fn grow(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let n = samples.len();
        let (sum, sum_sq) = self.target_sums(samples);
        let impurity = self.params.criterion.impurity(n as f64, sum, sum_sq);

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: sum / n as f64,
        });

        let depth_reached = self.params.max_depth.map_or(false, |max| depth >= max);
        if depth_reached
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || impurity <= f64::EPSILON
        {
            return id;
        }

        let Some(split) = self.best_split(samples, sum, sum_sq) else {
            return id;
        };

        let mut mid = 0;
        for k in 0..n {
            if self.x[[samples[k], split.feature]] <= split.threshold {
                samples.swap(k, mid);
                mid += 1;
            }
        }
        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);

        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn target_sums(&self, samples: &[usize]) -> (f64, f64) {
        samples.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let v = self.y[i];
            (s + v, sq + v * v)
        })
    }

    /// Best split over up to `n_candidates` non-constant features, drawn in
    /// random order. Constant features do not count toward the budget.
    fn best_split(&mut self, samples: &[usize], sum: f64, sum_sq: f64) -> Option<Split> {
        let n = samples.len();
        let criterion = self.params.criterion;
        let min_leaf = self.params.min_samples_leaf;
        self.rng.shuffle(&mut self.features);

        let mut best: Option<(f64, Split)> = None;
        let mut visited = 0;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature in &self.features {
            if visited >= self.n_candidates {
                break;
            }
            column.clear();
            column.extend(samples.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            if column[n - 1].0 <= column[0].0 + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 1..n {
                let (prev_x, prev_y) = column[k - 1];
                left_sum += prev_y;
                left_sq += prev_y * prev_y;

                let next_x = column[k].0;
                if next_x <= prev_x + FEATURE_THRESHOLD || k < min_leaf || n - k < min_leaf {
                    continue;
                }

                let (nl, nr) = (k as f64, (n - k) as f64);
                let weighted = nl * criterion.impurity(nl, left_sum, left_sq)
                    + nr * criterion.impurity(nr, sum - left_sum, sum_sq - left_sq);

                if best.as_ref().map_or(true, |(score, _)| weighted < *score) {
                    let mut threshold = prev_x / 2.0 + next_x / 2.0;
                    if threshold == next_x || !threshold.is_finite() {
                        threshold = prev_x;
                    }
                    best = Some((weighted, Split { feature, threshold }));
                }
            }
        }

        best.map(|(_, split)| split)
    }
}
