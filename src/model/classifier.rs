//! Classifier contract and the two concrete backends this crate ships.
//!
//! The original `OKGYM` service loads scikit-learn `KNeighborsClassifier`
//! and `LogisticRegression` models from `.pkl` files (see
//! `examples/original_source/backend/src/services/python/squat_analyzer.py`
//! and `plank_analyzer.py`). This crate substitutes a native, inference-only
//! representation of each, per `spec.md` §6's explicit allowance, behind a
//! two-method trait so analyzer tests can supply a deterministic stub
//! (`spec.md` §9 redesign notes).

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Injected classification capability. `predict_class` returns the
/// argmax class index; `predict_proba` returns one probability per class,
/// summing to (approximately) 1.0.
pub trait Classifier: std::fmt::Debug {
    fn predict_class(&self, features: &[f32]) -> usize;
    fn predict_proba(&self, features: &[f32]) -> Vec<f32>;
    fn n_features(&self) -> usize;
    fn n_classes(&self) -> usize;
}

/// Multinomial logistic regression: `softmax(W x + b)`. Substitutes the
/// upstream `LR_model.pkl` / `stage_LR_model.pkl` / `err_LR_model.pkl`
/// artifacts. Weights/bias are `ndarray` matrices rather than nested
/// `Vec`s, matching `ai-coach-api/src/services/ml_model_service.rs`'s use
/// of `Array1`/`Array2` for its own linear model's coefficients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearClassifier {
    /// Shape `(n_classes, n_features)`.
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearClassifier {
    /// Builds from row-major weights, one row per class.
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Self {
        let n_classes = weights.len();
        let n_features = weights.first().map(|row| row.len()).unwrap_or(0);
        let flat: Vec<f32> = weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((n_classes, n_features), flat)
            .unwrap_or_else(|_| Array2::zeros((0, 0)));
        Self {
            weights,
            bias: Array1::from(bias),
        }
    }

    fn logits(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.weights.ncols() {
            return vec![0.0; self.weights.nrows()];
        }
        let x = Array1::from(features.to_vec());
        (self.weights.dot(&x) + &self.bias).to_vec()
    }
}

impl Classifier for LinearClassifier {
    fn predict_class(&self, features: &[f32]) -> usize {
        let logits = self.logits(features);
        argmax(&logits)
    }

    fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        softmax(&self.logits(features))
    }

    fn n_features(&self) -> usize {
        self.weights.ncols()
    }

    fn n_classes(&self) -> usize {
        self.weights.nrows()
    }
}

/// K-nearest-neighbours over stored training prototypes. Substitutes the
/// upstream `KNN_model.pkl` used by the squat analyzer's alternative
/// backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnnClassifier {
    pub k: usize,
    pub n_classes: usize,
    /// (feature vector, class label) training prototypes.
    pub prototypes: Vec<(Vec<f32>, usize)>,
}

impl KnnClassifier {
    pub fn new(k: usize, n_classes: usize, prototypes: Vec<(Vec<f32>, usize)>) -> Self {
        Self {
            k,
            n_classes,
            prototypes,
        }
    }

    fn neighbor_votes(&self, features: &[f32]) -> Vec<usize> {
        let mut distances: Vec<(f32, usize)> = self
            .prototypes
            .iter()
            .map(|(proto, label)| (squared_distance(proto, features), *label))
            .collect();
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        distances
            .into_iter()
            .take(self.k.max(1))
            .map(|(_, label)| label)
            .collect()
    }
}

impl Classifier for KnnClassifier {
    fn predict_class(&self, features: &[f32]) -> usize {
        if self.prototypes.is_empty() {
            return 0;
        }
        let votes = self.neighbor_votes(features);
        let mut counts = vec![0usize; self.n_classes.max(1)];
        for v in votes {
            if v < counts.len() {
                counts[v] += 1;
            }
        }
        argmax(
            &counts
                .iter()
                .map(|&c| c as f32)
                .collect::<Vec<_>>(),
        )
    }

    fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        if self.prototypes.is_empty() {
            return vec![1.0 / self.n_classes.max(1) as f32; self.n_classes.max(1)];
        }
        let votes = self.neighbor_votes(features);
        let mut counts = vec![0f32; self.n_classes.max(1)];
        for v in &votes {
            if *v < counts.len() {
                counts[*v] += 1.0;
            }
        }
        let total: f32 = counts.iter().sum();
        if total <= 0.0 {
            vec![1.0 / counts.len() as f32; counts.len()]
        } else {
            counts.iter().map(|&c| c / total).collect()
        }
    }

    fn n_features(&self) -> usize {
        self.prototypes
            .first()
            .map(|(v, _)| v.len())
            .unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Either backend, serialized together so the loader can deserialize
/// without knowing in advance which kind an artifact file holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoredClassifier {
    Linear(LinearClassifier),
    Knn(KnnClassifier),
}

impl Classifier for StoredClassifier {
    fn predict_class(&self, features: &[f32]) -> usize {
        match self {
            StoredClassifier::Linear(c) => c.predict_class(features),
            StoredClassifier::Knn(c) => c.predict_class(features),
        }
    }

    fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        match self {
            StoredClassifier::Linear(c) => c.predict_proba(features),
            StoredClassifier::Knn(c) => c.predict_proba(features),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            StoredClassifier::Linear(c) => c.n_features(),
            StoredClassifier::Knn(c) => c.n_features(),
        }
    }

    fn n_classes(&self) -> usize {
        match self {
            StoredClassifier::Linear(c) => c.n_classes(),
            StoredClassifier::Knn(c) => c.n_classes(),
        }
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum()
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().cloned().fold(f32::MIN, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 {
        vec![1.0 / logits.len() as f32; logits.len()]
    } else {
        exps.into_iter().map(|e| e / sum).collect()
    }
}

/// Deterministic stub classifier for analyzer unit tests, letting a test
/// dictate the exact class/probabilities a frame should produce without a
/// real artifact on disk, per `spec.md` §9's "treat the classifier as an
/// injected capability ... so tests can substitute a deterministic stub".
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct FixedClassifier {
    pub class: usize,
    pub probs: Vec<f32>,
}

#[cfg(test)]
impl Classifier for FixedClassifier {
    fn predict_class(&self, _features: &[f32]) -> usize {
        self.class
    }

    fn predict_proba(&self, _features: &[f32]) -> Vec<f32> {
        self.probs.clone()
    }

    fn n_features(&self) -> usize {
        1
    }

    fn n_classes(&self) -> usize {
        self.probs.len()
    }
}
