//! Classifier loading and feature scaling (components C3/C4).

pub mod classifier;
pub mod loader;
pub mod scaler;

pub use classifier::{Classifier, KnnClassifier, LinearClassifier, StoredClassifier};
pub use loader::{load_from_path, ClassifierLoader, LoadedModel};
pub use scaler::FeatureScaler;
