//! Feature scaling, grounded on
//! `ai-coach-api/src/services/ml_model_service.rs::FeatureScaler`.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Per-feature standardization: `(x - mean) / std`. Applied to a raw
/// feature vector before it reaches a classifier, when the analyzer has a
/// scaler artifact (`spec.md` §4.4). Stored as `ndarray::Array1`, matching
/// `ai-coach-api/src/services/ml_model_service.rs::FeatureScaler`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureScaler {
    means: Array1<f32>,
    stds: Array1<f32>,
}

impl FeatureScaler {
    pub fn new(means: Vec<f32>, stds: Vec<f32>) -> Self {
        Self {
            means: Array1::from(means),
            stds: Array1::from(stds),
        }
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Transform a feature vector in place order; returns a new vector.
    /// A zero (or near-zero) std is treated as 1.0 to avoid division by
    /// zero on a constant feature column.
    pub fn transform(&self, features: &[f32]) -> Vec<f32> {
        features
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let mean = self.means.get(i).copied().unwrap_or(0.0);
                let std = self.stds.get(i).copied().unwrap_or(1.0);
                let std = if std.abs() < 1e-9 { 1.0 } else { std };
                (x - mean) / std
            })
            .collect()
    }
}
