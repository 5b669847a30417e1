//! Classifier artifact loading with graceful fallback.
//!
//! Grounded on `ai-coach-api/src/services/ml_model_service.rs`'s model
//! loading path, adapted from sklearn `.pkl` deserialization to `bincode`
//! over a native `StoredClassifier` (`spec.md` §4.3, `SPEC_FULL.md` §4.9).
//! Artifacts keep the upstream name stems (`KNN_model`, `LR_model`,
//! `stage_LR_model`, `err_LR_model`, `input_scaler`, `plank_input_scaler`)
//! but a `.model` extension, each stem an independent file — a classifier
//! and its scaler are two separately named artifacts, not a stem+extension
//! pair. A model that fails to load, fails to deserialize, or fails its
//! sanity check never panics and never aborts the worker: the analyzer
//! falls back to its geometric-only path and reports the classifier as
//! unavailable.

use std::fs;
use std::path::{Path, PathBuf};

use super::classifier::{Classifier, StoredClassifier};
use super::scaler::FeatureScaler;

/// A successfully loaded, sanity-checked classifier plus its companion
/// scaler (if the caller asked for one and it was present).
#[derive(Debug)]
pub struct LoadedModel {
    pub classifier: StoredClassifier,
    pub scaler: Option<FeatureScaler>,
}

/// Loads classifier and scaler artifacts from a model root directory.
#[derive(Debug, Clone)]
pub struct ClassifierLoader {
    model_root: PathBuf,
}

impl ClassifierLoader {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
        }
    }

    /// Load and sanity-check `<classifier_stem>.model`, then (best-effort)
    /// `<scaler_stem>.model` if one is named. Returns `None` on any
    /// classifier failure — missing file, corrupt bytes, version mismatch,
    /// or a sanity-check prediction that returns a malformed result —
    /// rather than propagating an error, since the caller's fallback path
    /// (geometric-only analysis) is always available. A missing or corrupt
    /// scaler does not fail the whole load; it is simply absent, and the
    /// analyzer then feeds unscaled features to the classifier.
    pub fn load(&self, classifier_stem: &str, scaler_stem: Option<&str>) -> Option<LoadedModel> {
        let classifier = self.load_classifier(classifier_stem)?;
        if !Self::sanity_check(&classifier) {
            return None;
        }
        let scaler = scaler_stem.and_then(|stem| self.load_scaler(stem));
        Some(LoadedModel { classifier, scaler })
    }

    fn artifact_path(&self, stem: &str) -> PathBuf {
        self.model_root.join(format!("{stem}.model"))
    }

    fn load_classifier(&self, stem: &str) -> Option<StoredClassifier> {
        let bytes = fs::read(self.artifact_path(stem)).ok()?;
        bincode::deserialize(&bytes).ok()
    }

    fn load_scaler(&self, stem: &str) -> Option<FeatureScaler> {
        let bytes = fs::read(self.artifact_path(stem)).ok()?;
        bincode::deserialize(&bytes).ok()
    }

    /// Run one prediction against a zero feature vector before advertising
    /// success, per `spec.md` §4.3. Any panic-free, correctly-shaped result
    /// counts as a pass; the goal is to catch artifacts whose dimensions
    /// are internally inconsistent before the worker relies on them mid-run.
    fn sanity_check(classifier: &StoredClassifier) -> bool {
        let n = classifier.n_features();
        if n == 0 || classifier.n_classes() == 0 {
            return false;
        }
        let zeros = vec![0.0f32; n];
        let probs = classifier.predict_proba(&zeros);
        if probs.len() != classifier.n_classes() {
            return false;
        }
        probs.iter().all(|p| p.is_finite())
    }
}

/// Convenience for tests and callers that already know the artifact path
/// rather than a model-root + stem pair.
pub fn load_from_path(path: impl AsRef<Path>) -> Option<StoredClassifier> {
    let bytes = fs::read(path).ok()?;
    bincode::deserialize(&bytes).ok()
}
