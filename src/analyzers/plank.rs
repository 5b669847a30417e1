//! Plank analyzer (classifier-backed, no reps), grounded on
//! `examples/original_source/backend/src/services/python/plank_analyzer.py`.
//! The Python source keeps `_PLANK_HOLD_TIME` and `_LAST_ANALYSIS_TIME` as
//! module globals; `spec.md` §9 directs lifting them into analyzer fields
//! read through an injected clock (`crate::clock::Clock`).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::clock::{Clock, SystemClock};
use crate::errors::Failure;
use crate::features;
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::model::{Classifier, ClassifierLoader, FeatureScaler};

const VISIBILITY_THRESHOLD: f32 = 0.6;
const PREDICTION_THRESHOLD: f32 = 0.6;

const JOINTS: [LandmarkName; 13] = [
    LandmarkName::Nose,
    LandmarkName::LeftShoulder,
    LandmarkName::RightShoulder,
    LandmarkName::LeftHip,
    LandmarkName::RightHip,
    LandmarkName::LeftKnee,
    LandmarkName::RightKnee,
    LandmarkName::LeftAnkle,
    LandmarkName::RightAnkle,
    LandmarkName::LeftHeel,
    LandmarkName::RightHeel,
    LandmarkName::LeftFootIndex,
    LandmarkName::RightFootIndex,
];

#[derive(Debug)]
pub struct PlankAnalyzer {
    classifier: Option<Box<dyn Classifier>>,
    scaler: Option<FeatureScaler>,
    clock: Box<dyn Clock>,
    last_analysis_time: Option<std::time::Instant>,
    hold_time: Duration,
}

impl PlankAnalyzer {
    pub fn new(model_root: &Path) -> Self {
        let loader = ClassifierLoader::new(model_root);
        let (classifier, scaler) = match loader.load("stage_LR_model", Some("plank_input_scaler")) {
            Some(loaded) => (Some(Box::new(loaded.classifier) as Box<dyn Classifier>), loaded.scaler),
            None => (None, None),
        };
        Self {
            classifier,
            scaler,
            clock: Box::new(SystemClock),
            last_analysis_time: None,
            hold_time: Duration::ZERO,
        }
    }

    #[cfg(test)]
    fn with_classifier_and_clock(
        classifier: Box<dyn Classifier>,
        scaler: Option<FeatureScaler>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            classifier: Some(classifier),
            scaler,
            clock,
            last_analysis_time: None,
            hold_time: Duration::ZERO,
        }
    }

    fn classify_raw_stage(&self, frame: &Frame, acc: &LandmarkAccessor) -> Stage {
        let classifier = match (&self.classifier, acc.all_visible(&JOINTS)) {
            (Some(c), true) => c,
            _ => return Stage::Unknown,
        };
        let raw = features::extract(frame, &JOINTS);
        let features = match &self.scaler {
            Some(s) => s.transform(&raw),
            None => raw,
        };
        let probs = classifier.predict_proba(&features);
        let class = classifier.predict_class(&features);
        let confidence = probs.get(class).copied().unwrap_or(0.0);
        if confidence < PREDICTION_THRESHOLD {
            return Stage::Unknown;
        }
        match class {
            0 => Stage::Correct,
            1 => Stage::HighBack,
            2 => Stage::LowBack,
            _ => Stage::Unknown,
        }
    }
}

impl Analyzer for PlankAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);
        let raw_stage = self.classify_raw_stage(frame, &acc);
        // An uncertain classification is treated as `correct` so the hold
        // timer is not blocked by classifier noise; a confident
        // `high_back`/`low_back` prediction is never overridden.
        let stage = if raw_stage == Stage::Unknown {
            Stage::Correct
        } else {
            raw_stage
        };

        let now = self.clock.now();
        if let Some(previous) = self.last_analysis_time {
            if stage == Stage::Correct {
                self.hold_time += now.duration_since(previous);
            }
        }
        self.last_analysis_time = Some(now);

        let hold_time_seconds = self.hold_time.as_secs() as i64;

        let mut errors = Vec::new();
        match stage {
            Stage::HighBack => errors.push(FormError::new(
                "high_back",
                Severity::High,
                "Hips are too high",
            )),
            Stage::LowBack => errors.push(FormError::new(
                "low_back",
                Severity::High,
                "Hips are sagging too low",
            )),
            _ => {}
        }

        let mut metrics = HashMap::new();
        metrics.insert("holdTime".to_string(), Some(hold_time_seconds as f32));

        let mut result = AnalysisResult::new(stage, 0, errors, metrics);
        result.duration_in_seconds = Some(hold_time_seconds);
        result.hold_time = Some(hold_time_seconds);
        Ok(result)
    }

    fn reset(&mut self) {
        self.last_analysis_time = None;
        self.hold_time = Duration::ZERO;
    }
}
