//! Squat analyzer (classifier-backed), grounded on
//! `examples/original_source/backend/src/services/python/squat_analyzer.py`.

use std::collections::HashMap;
use std::path::Path;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::features;
use crate::geometry::{angle, distance};
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::model::{Classifier, ClassifierLoader, FeatureScaler};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.5;
const FOOT_SHOULDER_RATIO: (f32, f32) = (1.2, 2.8);
const KNEE_FOOT_RATIO_UP: (f32, f32) = (0.5, 1.0);
const KNEE_FOOT_RATIO_DOWN: (f32, f32) = (0.7, 1.1);

const JOINTS: [LandmarkName; 9] = [
    LandmarkName::Nose,
    LandmarkName::LeftShoulder,
    LandmarkName::RightShoulder,
    LandmarkName::LeftHip,
    LandmarkName::RightHip,
    LandmarkName::LeftKnee,
    LandmarkName::RightKnee,
    LandmarkName::LeftAnkle,
    LandmarkName::RightAnkle,
];

#[derive(Debug)]
pub struct SquatAnalyzer {
    classifier: Option<Box<dyn Classifier>>,
    scaler: Option<FeatureScaler>,
    rep_counter: RepCounter,
    previous_stage: Option<Stage>,
}

impl SquatAnalyzer {
    pub fn new(model_root: &Path) -> Self {
        let loader = ClassifierLoader::new(model_root);
        let (classifier, scaler) = match loader.load("LR_model", Some("input_scaler")) {
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
        let has_any_visible = JOINTS.iter().any(|&j| acc.is_visible(j));
        let classifier = match (&self.classifier, has_any_visible) {
            (Some(c), true) => c,
            _ => return Stage::Unknown,
        };
        let raw = features::extract(frame, &JOINTS);
        let features = match &self.scaler {
            Some(s) => s.transform(&raw),
            None => raw,
        };
        // Low-confidence predictions are still used (spec.md §9 open
        // question, resolved against squat_analyzer.py::determine_stage:
        // no confidence gate on the predicted class).
        match classifier.predict_class(&features) {
            0 => Stage::Down,
            _ => Stage::Up,
        }
    }
}

impl Analyzer for SquatAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);
        let stage = self.classify_stage(frame, &acc);

        if self.previous_stage == Some(Stage::Down) && stage == Stage::Up {
            self.rep_counter.increment();
        }
        self.previous_stage = Some(stage);

        let ls = frame[LandmarkName::LeftShoulder.index()].point();
        let rs = frame[LandmarkName::RightShoulder.index()].point();
        let lh = frame[LandmarkName::LeftHip.index()].point();
        let rh = frame[LandmarkName::RightHip.index()].point();
        let lk = frame[LandmarkName::LeftKnee.index()].point();
        let rk = frame[LandmarkName::RightKnee.index()].point();
        let la = frame[LandmarkName::LeftAnkle.index()].point();
        let ra = frame[LandmarkName::RightAnkle.index()].point();
        let lf = frame[LandmarkName::LeftFootIndex.index()].point();
        let rf = frame[LandmarkName::RightFootIndex.index()].point();

        let shoulder_width = distance(ls, rs);
        let feet_width = distance(la, ra);
        let knee_width = distance(lk, rk);

        if shoulder_width == 0.0 || feet_width == 0.0 {
            return Err(Failure::MetricsCalculationError(
                "shoulder or feet width is zero".to_string(),
            ));
        }

        let feet_to_shoulder_ratio = feet_width / shoulder_width;
        let knee_to_feet_ratio = knee_width / feet_width;

        let hip_angle_l = angle(ls, lh, lk);
        let hip_angle_r = angle(rs, rh, rk);
        let knee_angle_l = angle(lh, lk, la);
        let knee_angle_r = angle(rh, rk, ra);
        let ankle_angle_l = angle(lk, la, lf);
        let ankle_angle_r = angle(rk, ra, rf);

        let hip_angle = average_opt(hip_angle_l, hip_angle_r);
        let knee_angle = average_opt(knee_angle_l, knee_angle_r);
        let ankle_angle = average_opt(ankle_angle_l, ankle_angle_r);

        let mut errors = Vec::new();
        if feet_to_shoulder_ratio < FOOT_SHOULDER_RATIO.0 || feet_to_shoulder_ratio > FOOT_SHOULDER_RATIO.1 {
            errors.push(FormError::new(
                "foot_placement",
                Severity::High,
                "Foot placement incorrect relative to shoulder width",
            ));
        }

        let knee_band = if stage == Stage::Up {
            KNEE_FOOT_RATIO_UP
        } else {
            KNEE_FOOT_RATIO_DOWN
        };
        if knee_to_feet_ratio < knee_band.0 {
            errors.push(FormError::new(
                "knee_placement",
                Severity::High,
                "Knees too close together",
            ));
        } else if knee_to_feet_ratio > knee_band.1 {
            errors.push(FormError::new(
                "knee_placement",
                Severity::High,
                "Knees too far apart",
            ));
        }

        let mut metrics = HashMap::new();
        metrics.insert("shoulderWidth".to_string(), Some(shoulder_width));
        metrics.insert("feetWidth".to_string(), Some(feet_width));
        metrics.insert("kneeWidth".to_string(), Some(knee_width));
        metrics.insert("feetToShoulderRatio".to_string(), Some(feet_to_shoulder_ratio));
        metrics.insert("kneeToFeetRatio".to_string(), Some(knee_to_feet_ratio));
        metrics.insert("hipAngle".to_string(), hip_angle);
        metrics.insert("kneeAngle".to_string(), knee_angle);
        metrics.insert("ankleAngle".to_string(), ankle_angle);

        Ok(AnalysisResult::new(stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.previous_stage = None;
    }
}

fn average_opt(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;
    use crate::model::classifier::FixedClassifier;

    fn frame_with_defaults() -> Frame {
        vec![Landmark::new(0.0, 0.0, 0.0, 1.0); FRAME_LEN]
    }

    fn set(frame: &mut Frame, name: LandmarkName, x: f32, y: f32) {
        frame[name.index()] = Landmark::new(x, y, 0.0, 1.0);
    }

    fn well_formed_frame() -> Frame {
        let mut frame = frame_with_defaults();
        set(&mut frame, LandmarkName::LeftShoulder, -0.2, 0.0);
        set(&mut frame, LandmarkName::RightShoulder, 0.2, 0.0);
        set(&mut frame, LandmarkName::LeftHip, -0.15, 0.5);
        set(&mut frame, LandmarkName::RightHip, 0.15, 0.5);
        set(&mut frame, LandmarkName::LeftKnee, -0.2, 1.0);
        set(&mut frame, LandmarkName::RightKnee, 0.2, 1.0);
        set(&mut frame, LandmarkName::LeftAnkle, -0.3, 1.5);
        set(&mut frame, LandmarkName::RightAnkle, 0.3, 1.5);
        set(&mut frame, LandmarkName::LeftFootIndex, -0.3, 1.6);
        set(&mut frame, LandmarkName::RightFootIndex, 0.3, 1.6);
        frame
    }

    #[test]
    fn no_classifier_yields_unknown_stage() {
        let mut analyzer = SquatAnalyzer::with_classifier(
            Box::new(FixedClassifier { class: 0, probs: vec![1.0, 0.0] }),
            None,
        );
        analyzer.classifier = None;
        let frame = well_formed_frame();
        let result = analyzer.analyze(&frame).unwrap();
        assert_eq!(result.stage, Stage::Unknown);
    }

    #[test]
    fn down_then_up_transition_counts_one_rep() {
        let mut analyzer = SquatAnalyzer::with_classifier(
            Box::new(FixedClassifier { class: 0, probs: vec![1.0, 0.0] }),
            None,
        );
        let frame = well_formed_frame();
        let first = analyzer.analyze(&frame).unwrap();
        assert_eq!(first.stage, Stage::Down);
        assert_eq!(first.rep_count, 0);

        analyzer.classifier = Some(Box::new(FixedClassifier { class: 1, probs: vec![0.0, 1.0] }));
        let second = analyzer.analyze(&frame).unwrap();
        assert_eq!(second.stage, Stage::Up);
        assert_eq!(second.rep_count, 1);
    }

    #[test]
    fn narrow_knees_produce_high_severity_error() {
        let mut analyzer = SquatAnalyzer::with_classifier(
            Box::new(FixedClassifier { class: 0, probs: vec![1.0, 0.0] }),
            None,
        );
        let mut frame = frame_with_defaults();
        set(&mut frame, LandmarkName::LeftShoulder, -0.2, 0.0);
        set(&mut frame, LandmarkName::RightShoulder, 0.2, 0.0);
        set(&mut frame, LandmarkName::LeftHip, -0.04, 0.5);
        set(&mut frame, LandmarkName::RightHip, 0.04, 0.5);
        set(&mut frame, LandmarkName::LeftKnee, -0.04, 1.0);
        set(&mut frame, LandmarkName::RightKnee, 0.04, 1.0);
        set(&mut frame, LandmarkName::LeftAnkle, -0.11, 1.5);
        set(&mut frame, LandmarkName::RightAnkle, 0.11, 1.5);
        set(&mut frame, LandmarkName::LeftFootIndex, -0.11, 1.6);
        set(&mut frame, LandmarkName::RightFootIndex, 0.11, 1.6);

        let result = analyzer.analyze(&frame).unwrap();
        assert!(result.errors.iter().any(|e| e.error_type == "knee_placement"));
        assert_eq!(result.form_score, 80);
    }

    #[test]
    fn zero_width_landmarks_yield_metrics_error() {
        let mut analyzer = SquatAnalyzer::with_classifier(
            Box::new(FixedClassifier { class: 0, probs: vec![1.0, 0.0] }),
            None,
        );
        let frame = frame_with_defaults();
        let err = analyzer.analyze(&frame).unwrap_err();
        assert_eq!(err.kind(), "METRICS_CALCULATION_ERROR");
    }

    #[test]
    fn reset_clears_rep_count_and_stage_history() {
        let mut analyzer = SquatAnalyzer::with_classifier(
            Box::new(FixedClassifier { class: 0, probs: vec![1.0, 0.0] }),
            None,
        );
        let frame = well_formed_frame();
        analyzer.analyze(&frame).unwrap();
        analyzer.classifier = Some(Box::new(FixedClassifier { class: 1, probs: vec![0.0, 1.0] }));
        analyzer.analyze(&frame).unwrap();
        analyzer.reset();
        assert_eq!(analyzer.rep_counter.count(), 0);
        assert_eq!(analyzer.previous_stage, None);
    }
}
