//! Lunge analyzer (classifier-backed), grounded on
//! `examples/original_source/backend/src/services/python/lunge_analyzer.py`
//! naming conventions inherited by the squat/plank classifier loading path.

use std::collections::HashMap;
use std::path::Path;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::features;
use crate::geometry::{angle, distance};
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::model::{Classifier, ClassifierLoader, FeatureScaler};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.6;
const KNEE_ANGLE_BAND: (f32, f32) = (60.0, 125.0);
const KNEE_OVER_TOE_MARGIN: f32 = 0.02;
const ANKLE_TO_TOE_RATIO: f32 = 0.6;
const CLASSIFIER_CONFIDENCE: f32 = 0.8;

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
pub struct LungeAnalyzer {
    classifier: Option<Box<dyn Classifier>>,
    scaler: Option<FeatureScaler>,
    rep_counter: RepCounter,
    previous_stage: Option<Stage>,
}

impl LungeAnalyzer {
    pub fn new(model_root: &Path) -> Self {
        let loader = ClassifierLoader::new(model_root);
        let (classifier, scaler) = match loader.load("stage_LR_model", Some("input_scaler")) {
            Some(loaded) => (Some(Box::new(loaded.classifier) as Box<dyn Classifier>), loaded.scaler),
            None => (None, None),
        };
        Self {
            classifier,
            scaler,
            rep_counter: RepCounter::new(),
            previous_stage: None,
        }
    }

    #[cfg(test)]
    fn with_classifier(classifier: Box<dyn Classifier>, scaler: Option<FeatureScaler>) -> Self {
        Self {
            classifier: Some(classifier),
            scaler,
            rep_counter: RepCounter::new(),
            previous_stage: None,
        }
    }

    fn classify_stage(&self, frame: &Frame, acc: &LandmarkAccessor) -> Stage {
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
        if confidence < CLASSIFIER_CONFIDENCE {
            return Stage::Unknown;
        }
        match class {
            0 => Stage::Init,
            1 => Stage::Mid,
            2 => Stage::Down,
            _ => Stage::Unknown,
        }
    }
}

impl Analyzer for LungeAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);
        let stage = self.classify_stage(frame, &acc);

        if matches!(self.previous_stage, Some(Stage::Init) | Some(Stage::Mid)) && stage == Stage::Down {
            self.rep_counter.increment();
        }
        self.previous_stage = Some(stage);

        let lh = frame[LandmarkName::LeftHip.index()].point();
        let rh = frame[LandmarkName::RightHip.index()].point();
        let lk = frame[LandmarkName::LeftKnee.index()].point();
        let rk = frame[LandmarkName::RightKnee.index()].point();
        let la = frame[LandmarkName::LeftAnkle.index()].point();
        let ra = frame[LandmarkName::RightAnkle.index()].point();
        let lf = frame[LandmarkName::LeftFootIndex.index()].point();
        let rf = frame[LandmarkName::RightFootIndex.index()].point();
        let ls = frame[LandmarkName::LeftShoulder.index()].point();
        let rs = frame[LandmarkName::RightShoulder.index()].point();

        let left_knee_angle = angle(lh, lk, la);
        let right_knee_angle = angle(rh, rk, ra);

        let mut errors = Vec::new();
        let mut knee_over_toe = false;

        if stage == Stage::Down {
            let body_width = distance(ls, rs);

            if let Some(a) = left_knee_angle {
                if a < KNEE_ANGLE_BAND.0 || a > KNEE_ANGLE_BAND.1 {
                    errors.push(FormError::new(
                        "knee_angle",
                        Severity::High,
                        "Left knee angle is outside the safe range",
                    ));
                }
            }
            if let Some(a) = right_knee_angle {
                if a < KNEE_ANGLE_BAND.0 || a > KNEE_ANGLE_BAND.1 {
                    errors.push(FormError::new(
                        "knee_angle",
                        Severity::High,
                        "Right knee angle is outside the safe range",
                    ));
                }
            }

            let left_over = knee_over_toe_violation(lk, la, lf, body_width);
            let right_over = knee_over_toe_violation(rk, ra, rf, body_width);
            knee_over_toe = left_over || right_over;
            if knee_over_toe {
                errors.push(FormError::new(
                    "knee_placement",
                    Severity::High,
                    "Knee is protruding past the toe",
                ));
            }
        }

        let mut metrics = HashMap::new();
        metrics.insert("leftKneeAngle".to_string(), left_knee_angle);
        metrics.insert("rightKneeAngle".to_string(), right_knee_angle);
        metrics.insert("kneeOverToe".to_string(), Some(if knee_over_toe { 1.0 } else { 0.0 }));

        Ok(AnalysisResult::new(stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.previous_stage = None;
    }
}

fn knee_over_toe_violation(
    knee: crate::geometry::Point2,
    ankle: crate::geometry::Point2,
    toe: crate::geometry::Point2,
    body_width: f32,
) -> bool {
    let protrusion = (knee.x - toe.x).abs();
    let ankle_to_toe = distance(ankle, toe);
    let over_body_margin = body_width > 0.0 && protrusion > KNEE_OVER_TOE_MARGIN * body_width;
    let over_ankle_ratio = ankle_to_toe > 0.0 && protrusion > ANKLE_TO_TOE_RATIO * ankle_to_toe;
    over_body_margin || over_ankle_ratio
}
