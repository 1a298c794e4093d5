//! Decision forest artifact
//!
//! A tree ensemble serialized as JSON. Split nodes send a row left when
//! `x[feature] <= threshold`; leaves hold per-class weights which are
//! normalized per tree and averaged across the forest.
//!
//! The artifact is validated once on load. After that traversal cannot fail:
//! children always point forward within the tree, so every walk ends at a
//! leaf.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::Classifier;
use crate::error::ModelError;
use crate::types::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// Artifact format version understood by this build.
pub const ARTIFACT_VERSION: u32 = 1;

/// One node of a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Nodes in array order; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// A single split on `feature` with two leaves.
    pub fn stump(feature: usize, threshold: f64, left: [f64; 2], right: [f64; 2]) -> Self {
        Self {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left.to_vec() },
                Node::Leaf { value: right.to_vec() },
            ],
        }
    }

    /// A tree that always returns the same class weights.
    pub fn constant(value: [f64; 2]) -> Self {
        Self {
            nodes: vec![Node::Leaf { value: value.to_vec() }],
        }
    }

    fn leaf_for(&self, x: &[f64; FEATURE_COUNT]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { value } => return value,
            }
        }
    }

    fn validate(&self, tree: usize) -> Result<(), ModelError> {
        let invalid = |msg: String| ModelError::InvalidArtifact(format!("tree {tree}: {msg}"));
        if self.nodes.is_empty() {
            return Err(invalid("has no nodes".to_string()));
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(invalid(format!(
                            "node {i} splits on feature {feature}, only {FEATURE_COUNT} exist"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {i} has a non-finite threshold")));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= len {
                            return Err(invalid(format!(
                                "node {i} references child {child} (must be in {}..{len})",
                                i + 1
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != 2 {
                        return Err(invalid(format!(
                            "leaf {i} has {} class weights, expected 2",
                            value.len()
                        )));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(invalid(format!("leaf {i} has a negative or non-finite weight")));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(invalid(format!("leaf {i} weights sum to zero")));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The on-disk document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub version: u32,
    pub feature_names: Vec<String>,
    pub n_classes: usize,
    pub trees: Vec<Tree>,
}

impl ForestArtifact {
    /// Current-version artifact over the standard feature schema.
    pub fn new(trees: Vec<Tree>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            n_classes: 2,
            trees,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported version {} (expected {ARTIFACT_VERSION})",
                self.version
            )));
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self.feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(ModelError::InvalidArtifact(format!(
                "feature schema {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.n_classes != 2 {
            return Err(ModelError::InvalidArtifact(format!(
                "n_classes = {}, expected a binary model",
                self.n_classes
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::InvalidArtifact("forest has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }
}

/// A validated forest ready for inference.
#[derive(Debug, Clone)]
pub struct DecisionForest {
    artifact: ForestArtifact,
    name: String,
}

impl DecisionForest {
    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, ModelError> {
        artifact.validate()?;
        let name = format!("decision_forest_v{}({} trees)", artifact.version, artifact.trees.len());
        Ok(Self { artifact, name })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let artifact: ForestArtifact =
            serde_json::from_str(json).map_err(|source| ModelError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::from_artifact(artifact)
    }

    /// Load and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let path_str = path.display().to_string();
        let data = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path_str.clone(),
            source,
        })?;
        let artifact: ForestArtifact =
            serde_json::from_slice(&data).map_err(|source| ModelError::Parse {
                path: path_str.clone(),
                source,
            })?;
        let forest = Self::from_artifact(artifact)?;
        tracing::info!(path = %path_str, trees = forest.n_trees(), "Classifier artifact loaded");
        Ok(forest)
    }

    /// Write the artifact atomically (temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let path_str = path.display().to_string();
        let io_err = |source| ModelError::Io {
            path: path_str.clone(),
            source,
        };
        let json = serde_json::to_vec_pretty(&self.artifact).map_err(|source| ModelError::Parse {
            path: path_str.clone(),
            source,
        })?;

        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(io_err)?;
        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.artifact.trees.len()
    }

    pub fn artifact(&self) -> &ForestArtifact {
        &self.artifact
    }
}

impl Classifier for DecisionForest {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2], ModelError> {
        let x = features.as_array();
        let mut acc = [0.0_f64; 2];
        for tree in &self.artifact.trees {
            let leaf = tree.leaf_for(&x);
            let total: f64 = leaf.iter().sum();
            acc[0] += leaf[0] / total;
            acc[1] += leaf[1] / total;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.artifact.trees.len() as f64;
        Ok([acc[0] / n, acc[1] / n])
    }
}
