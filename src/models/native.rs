//! Portable JSON model format.
//!
//! Training exports either a linear model over one-hot categories or an
//! ensemble of regression trees. Both are checked structurally at load time:
//! feature names must exist, and tree children must point forward so that
//! evaluation always reaches a leaf.

use super::Regressor;
use crate::error::{PredictError, Result};
use crate::lookups::read_json;
use crate::types::{Category, FeatureRow, FEATURE_NAMES};
use anyhow::{anyhow, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelSpec {
    Linear(LinearSpec),
    TreeEnsemble(TreeEnsembleSpec),
}

#[derive(Debug, Deserialize)]
struct LinearSpec {
    intercept: f64,
    #[serde(default)]
    coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    categorical: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct TreeEnsembleSpec {
    #[serde(default)]
    base_score: f64,
    #[serde(default)]
    aggregation: Aggregation,
    trees: Vec<TreeSpec>,
}

#[derive(Debug, Deserialize)]
struct TreeSpec {
    nodes: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeSpec {
    Numeric {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: String,
        categories: Vec<Category>,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// How tree outputs are combined
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Boosted trees: base_score + sum of leaves
    #[default]
    Sum,
    /// Random forest: base_score + mean of leaves
    Mean,
}

/// Linear regression over numeric features and one-hot encoded categories.
#[derive(Debug, Clone)]
pub struct LinearModel {
    intercept: f64,
    numeric: Vec<(usize, f64)>,
    categorical: Vec<(usize, HashMap<String, f64>)>,
}

impl LinearModel {
    pub fn score(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        let mut z = self.intercept;
        for &(feature, weight) in &self.numeric {
            z += weight * numeric_value(row, feature)?;
        }
        for (feature, weights) in &self.categorical {
            let category = row
                .category(*feature)
                .ok_or_else(|| anyhow!("feature index {feature} out of range"))?;
            // unseen categories have an all-zero one-hot encoding
            z += weights.get(&category.to_string()).copied().unwrap_or(0.0);
        }
        Ok(z)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Numeric {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: usize,
        categories: HashSet<Category>,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

/// A single regression tree; node 0 is the root.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn evaluate(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return Ok(*value),
                Node::Numeric {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if numeric_value(row, *feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Categorical {
                    feature,
                    categories,
                    left,
                    right,
                } => {
                    let category = row
                        .category(*feature)
                        .ok_or_else(|| anyhow!("feature index {feature} out of range"))?;
                    idx = if categories.contains(&category) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Ensemble of regression trees.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    base_score: f64,
    aggregation: Aggregation,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn score(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(row)?;
        }
        Ok(match self.aggregation {
            Aggregation::Sum => self.base_score + sum,
            Aggregation::Mean => self.base_score + sum / self.trees.len() as f64,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

/// A model read from `model.json`.
#[derive(Debug, Clone)]
pub enum NativeModel {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

impl NativeModel {
    /// Load and validate a JSON model file
    pub fn load(path: &Path) -> Result<Self> {
        let spec: ModelSpec = read_json(path)?;
        let model = Self::from_spec(spec).map_err(|reason| PredictError::artifact(path, reason))?;
        match &model {
            NativeModel::TreeEnsemble(ensemble) => info!(
                model = %model.name(),
                trees = ensemble.tree_count(),
                path = %path.display(),
                "Model loaded successfully"
            ),
            NativeModel::Linear(_) => {
                info!(model = %model.name(), path = %path.display(), "Model loaded successfully")
            }
        }
        Ok(model)
    }

    /// Parse and validate a model from JSON text
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        let spec: ModelSpec = serde_json::from_str(json).map_err(|e| e.to_string())?;
        Self::from_spec(spec)
    }

    fn from_spec(spec: ModelSpec) -> std::result::Result<Self, String> {
        match spec {
            ModelSpec::Linear(linear) => {
                let numeric = linear
                    .coefficients
                    .into_iter()
                    .map(|(name, weight)| feature_index(&name).map(|idx| (idx, weight)))
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                let categorical = linear
                    .categorical
                    .into_iter()
                    .map(|(name, weights)| {
                        feature_index(&name).map(|idx| (idx, weights.into_iter().collect()))
                    })
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                Ok(NativeModel::Linear(LinearModel {
                    intercept: linear.intercept,
                    numeric,
                    categorical,
                }))
            }
            ModelSpec::TreeEnsemble(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err("tree ensemble has no trees".to_string());
                }
                let trees = ensemble
                    .trees
                    .into_iter()
                    .enumerate()
                    .map(|(t, tree)| compile_tree(tree).map_err(|e| format!("tree {t}: {e}")))
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                Ok(NativeModel::TreeEnsemble(TreeEnsemble {
                    base_score: ensemble.base_score,
                    aggregation: ensemble.aggregation,
                    trees,
                }))
            }
        }
    }

    fn score(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        match self {
            NativeModel::Linear(m) => m.score(row),
            NativeModel::TreeEnsemble(m) => m.score(row),
        }
    }
}

impl Regressor for NativeModel {
    fn name(&self) -> &str {
        match self {
            NativeModel::Linear(_) => "linear",
            NativeModel::TreeEnsemble(_) => "tree_ensemble",
        }
    }

    fn predict(&self, rows: &[FeatureRow]) -> anyhow::Result<Vec<f64>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.score(row).map_err(|e| e.context(format!("row {i}"))))
            .collect()
    }
}

fn compile_tree(tree: TreeSpec) -> std::result::Result<Tree, String> {
    let len = tree.nodes.len();
    if len == 0 {
        return Err("tree has no nodes".to_string());
    }
    let check = |idx: usize, left: usize, right: usize| {
        for child in [left, right] {
            if child <= idx || child >= len {
                return Err(format!(
                    "node {idx} points to node {child}; children must follow their parent within {len} nodes"
                ));
            }
        }
        Ok(())
    };

    let mut nodes = Vec::with_capacity(len);
    for (idx, node) in tree.nodes.into_iter().enumerate() {
        nodes.push(match node {
            NodeSpec::Leaf { value } => Node::Leaf(value),
            NodeSpec::Numeric {
                feature,
                threshold,
                left,
                right,
            } => {
                check(idx, left, right)?;
                Node::Numeric {
                    feature: feature_index(&feature)?,
                    threshold,
                    left,
                    right,
                }
            }
            NodeSpec::Categorical {
                feature,
                categories,
                left,
                right,
            } => {
                check(idx, left, right)?;
                Node::Categorical {
                    feature: feature_index(&feature)?,
                    categories: categories.into_iter().collect(),
                    left,
                    right,
                }
            }
        });
    }
    Ok(Tree { nodes })
}

fn feature_index(name: &str) -> std::result::Result<usize, String> {
    FeatureRow::feature_index(name)
        .ok_or_else(|| format!("unknown feature {name:?}, expected one of {FEATURE_NAMES:?}"))
}

fn numeric_value(row: &FeatureRow, feature: usize) -> anyhow::Result<f64> {
    match row.value(feature).and_then(|v| v.as_f64()) {
        Some(v) => Ok(v),
        None => bail!(
            "feature {} is not numeric (value {:?})",
            FEATURE_NAMES.get(feature).copied().unwrap_or("?"),
            row.category(feature)
        ),
    }
}
