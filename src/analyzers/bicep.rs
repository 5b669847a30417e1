//! Bicep curl analyzer (geometric + classifier-assisted), grounded on
//! `examples/original_source/backend/src/services/python/bicep_analyzer.py`.
//! Tracks left and right arms as independent side state machines; the
//! reported rep count is the maximum of the two side counters.

use std::collections::HashMap;
use std::path::Path;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::features;
use crate::geometry::{angle, Point2};
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::model::{Classifier, ClassifierLoader, FeatureScaler};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.65;
const DOWN_ENTER: f32 = 120.0;
const UP_ENTER: f32 = 100.0;
const PEAK_CONTRACTION_THRESHOLD: f32 = 60.0;
const LOOSE_UPPER_ARM_THRESHOLD: f32 = 40.0;
const POSTURE_CONFIDENCE: f32 = 0.95;
const LEAN_BACK_GEOMETRIC_THRESHOLD: f32 = 165.0;

const JOINTS: [LandmarkName; 8] = [
    LandmarkName::LeftShoulder,
    LandmarkName::RightShoulder,
    LandmarkName::LeftElbow,
    LandmarkName::RightElbow,
    LandmarkName::LeftWrist,
    LandmarkName::RightWrist,
    LandmarkName::LeftHip,
    LandmarkName::RightHip,
];

#[derive(Debug, Default, Clone, Copy)]
struct SideState {
    stage: Option<Stage>,
    rep_counter: RepCounter,
    up_phase_min_curl: Option<f32>,
}

impl SideState {
    fn reset(&mut self) {
        *self = SideState::default();
    }
}

#[derive(Debug)]
pub struct BicepAnalyzer {
    classifier: Option<Box<dyn Classifier>>,
    scaler: Option<FeatureScaler>,
    left: SideState,
    right: SideState,
}

impl BicepAnalyzer {
    pub fn new(model_root: &Path) -> Self {
        let loader = ClassifierLoader::new(model_root);
        let (classifier, scaler) = match loader.load("err_LR_model", Some("input_scaler")) {
            Some(loaded) => (Some(Box::new(loaded.classifier) as Box<dyn Classifier>), loaded.scaler),
            None => (None, None),
        };
        Self {
            classifier,
            scaler,
            left: SideState::default(),
            right: SideState::default(),
        }
    }

    #[cfg(test)]
    fn with_classifier(classifier: Box<dyn Classifier>, scaler: Option<FeatureScaler>) -> Self {
        Self {
            classifier: Some(classifier),
            scaler,
            left: SideState::default(),
            right: SideState::default(),
        }
    }

    /// Updates one side's hysteresis state machine given its curl angle
    /// this frame, crediting a rep on the `down -> up` edge and returning
    /// whether a peak-contraction fault accompanies this rep.
    fn update_side(side: &mut SideState, curl: f32) -> Option<bool> {
        let previous = side.stage;
        let new_stage = if curl > DOWN_ENTER {
            Stage::Down
        } else if curl < UP_ENTER {
            Stage::Up
        } else {
            previous.unwrap_or(Stage::Down)
        };

        if new_stage == Stage::Up {
            side.up_phase_min_curl = Some(match side.up_phase_min_curl {
                Some(existing) => existing.min(curl),
                None => curl,
            });
        } else {
            side.up_phase_min_curl = None;
        }

        let mut peak_contraction_fault = None;
        if previous == Some(Stage::Down) && new_stage == Stage::Up {
            side.rep_counter.increment();
            let min_curl = side.up_phase_min_curl.unwrap_or(curl);
            peak_contraction_fault = Some(min_curl >= PEAK_CONTRACTION_THRESHOLD);
        }

        side.stage = Some(new_stage);
        peak_contraction_fault
    }

    fn upper_arm_angle(shoulder: Point2, elbow: Point2) -> Option<f32> {
        let vertical_reference = Point2::new(shoulder.x, shoulder.y - 1.0);
        angle(elbow, shoulder, vertical_reference)
    }

    fn detect_lean_back(&self, frame: &Frame, acc: &LandmarkAccessor) -> bool {
        let ls = frame[LandmarkName::LeftShoulder.index()].point();
        let rs = frame[LandmarkName::RightShoulder.index()].point();
        let lh = frame[LandmarkName::LeftHip.index()].point();
        let rh = frame[LandmarkName::RightHip.index()].point();
        let la = frame[LandmarkName::LeftAnkle.index()].point();
        let ra = frame[LandmarkName::RightAnkle.index()].point();

        let mid_shoulder = Point2::new((ls.x + rs.x) / 2.0, (ls.y + rs.y) / 2.0);
        let mid_hip = Point2::new((lh.x + rh.x) / 2.0, (lh.y + rh.y) / 2.0);
        let mid_ankle = Point2::new((la.x + ra.x) / 2.0, (la.y + ra.y) / 2.0);

        let geometric = angle(mid_shoulder, mid_hip, mid_ankle)
            .map(|a| a < LEAN_BACK_GEOMETRIC_THRESHOLD)
            .unwrap_or(false);
        if geometric {
            return true;
        }

        // Fallback path per spec.md §9: accept the classifier only when the
        // geometric check said "no" and the classifier confidently says
        // "yes".
        if let Some(classifier) = &self.classifier {
            if !acc.all_visible(&JOINTS) {
                return false;
            }
            let raw = features::extract(frame, &JOINTS);
            let features = match &self.scaler {
                Some(s) => s.transform(&raw),
                None => raw,
            };
            let class = classifier.predict_class(&features);
            let probs = classifier.predict_proba(&features);
            if class == 1 {
                if let Some(&confidence) = probs.get(1) {
                    return confidence >= POSTURE_CONFIDENCE;
                }
            }
        }
        false
    }
}

impl Analyzer for BicepAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);

        let ls = frame[LandmarkName::LeftShoulder.index()].point();
        let rs = frame[LandmarkName::RightShoulder.index()].point();
        let le = frame[LandmarkName::LeftElbow.index()].point();
        let re = frame[LandmarkName::RightElbow.index()].point();
        let lw = frame[LandmarkName::LeftWrist.index()].point();
        let rw = frame[LandmarkName::RightWrist.index()].point();

        let left_curl = angle(ls, le, lw);
        let right_curl = angle(rs, re, rw);
        let left_upper_arm = Self::upper_arm_angle(ls, le);
        let right_upper_arm = Self::upper_arm_angle(rs, re);

        let mut errors = Vec::new();

        if let Some(curl) = left_curl {
            if let Some(fault) = Self::update_side(&mut self.left, curl) {
                if fault {
                    errors.push(FormError::new(
                        "peak_contraction",
                        Severity::Medium,
                        "Left arm did not reach full contraction",
                    ));
                }
            }
        }
        if let Some(curl) = right_curl {
            if let Some(fault) = Self::update_side(&mut self.right, curl) {
                if fault {
                    errors.push(FormError::new(
                        "peak_contraction",
                        Severity::Medium,
                        "Right arm did not reach full contraction",
                    ));
                }
            }
        }

        if left_upper_arm.map(|a| a > LOOSE_UPPER_ARM_THRESHOLD).unwrap_or(false) {
            errors.push(FormError::new(
                "loose_upper_arm",
                Severity::Medium,
                "Left upper arm is drifting away from the body",
            ));
        }
        if right_upper_arm.map(|a| a > LOOSE_UPPER_ARM_THRESHOLD).unwrap_or(false) {
            errors.push(FormError::new(
                "loose_upper_arm",
                Severity::Medium,
                "Right upper arm is drifting away from the body",
            ));
        }

        if self.detect_lean_back(frame, &acc) {
            errors.push(FormError::new(
                "lean_back",
                Severity::High,
                "Torso is leaning back",
            ));
        }

        let rep_count = self.left.rep_counter.count().max(self.right.rep_counter.count());
        let stage = match (self.left.stage, self.right.stage) {
            (Some(Stage::Up), _) | (_, Some(Stage::Up)) => Stage::Up,
            (Some(s), _) | (_, Some(s)) => s,
            (None, None) => Stage::Down,
        };

        let mut metrics = HashMap::new();
        metrics.insert("leftCurlAngle".to_string(), left_curl);
        metrics.insert("rightCurlAngle".to_string(), right_curl);
        metrics.insert("leftUpperArmAngle".to_string(), left_upper_arm);
        metrics.insert("rightUpperArmAngle".to_string(), right_upper_arm);
        metrics.insert(
            "leftVisible".to_string(),
            Some(if acc.is_visible(LandmarkName::LeftElbow) { 1.0 } else { 0.0 }),
        );
        metrics.insert(
            "rightVisible".to_string(),
            Some(if acc.is_visible(LandmarkName::RightElbow) { 1.0 } else { 0.0 }),
        );
        metrics.insert("shoulderWidth".to_string(), Some(crate::geometry::distance(ls, rs)));
        metrics.insert("leftRepCount".to_string(), Some(self.left.rep_counter.count() as f32));
        metrics.insert("rightRepCount".to_string(), Some(self.right.rep_counter.count() as f32));

        Ok(AnalysisResult::new(stage, rep_count, errors, metrics))
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn frame_with_defaults() -> Frame {
        vec![Landmark::new(0.0, 0.0, 0.0, 1.0); FRAME_LEN]
    }

    fn set(frame: &mut Frame, name: LandmarkName, x: f32, y: f32) {
        frame[name.index()] = Landmark::new(x, y, 0.0, 1.0);
    }

    fn upright_torso(frame: &mut Frame) {
        set(frame, LandmarkName::LeftShoulder, -0.2, 0.0);
        set(frame, LandmarkName::RightShoulder, 0.2, 0.0);
        set(frame, LandmarkName::LeftHip, -0.2, 1.0);
        set(frame, LandmarkName::RightHip, 0.2, 1.0);
        set(frame, LandmarkName::LeftAnkle, -0.2, 2.0);
        set(frame, LandmarkName::RightAnkle, 0.2, 2.0);
    }

    fn set_curl(frame: &mut Frame, side_shoulder: LandmarkName, side_elbow: LandmarkName, side_wrist: LandmarkName, curl_degrees: f32) {
        // Shoulder fixed above elbow; wrist swings to produce the desired
        // interior angle at the elbow between shoulder and wrist.
        let shoulder = Point2::new(0.0, 0.0);
        let elbow = Point2::new(0.0, 0.5);
        let theta = curl_degrees.to_radians();
        let wrist = Point2::new(0.5 * theta.sin(), 0.5 + 0.5 * theta.cos());
        frame[side_shoulder.index()] = Landmark::new(shoulder.x, shoulder.y, 0.0, 1.0);
        frame[side_elbow.index()] = Landmark::new(elbow.x, elbow.y, 0.0, 1.0);
        frame[side_wrist.index()] = Landmark::new(wrist.x, wrist.y, 0.0, 1.0);
    }

    #[test]
    fn down_to_up_transition_counts_rep_and_uses_max_of_sides() {
        let mut analyzer = BicepAnalyzer::with_classifier(
            Box::new(crate::model::classifier::LinearClassifier::new(vec![vec![0.0], vec![0.0]], vec![0.0, 0.0])),
            None,
        );
        let mut frame = frame_with_defaults();
        upright_torso(&mut frame);
        set_curl(&mut frame, LandmarkName::LeftShoulder, LandmarkName::LeftElbow, LandmarkName::LeftWrist, 160.0);
        set_curl(&mut frame, LandmarkName::RightShoulder, LandmarkName::RightElbow, LandmarkName::RightWrist, 150.0);
        let first = analyzer.analyze(&frame).unwrap();
        assert_eq!(first.rep_count, 0);

        let mut frame2 = frame_with_defaults();
        upright_torso(&mut frame2);
        set_curl(&mut frame2, LandmarkName::LeftShoulder, LandmarkName::LeftElbow, LandmarkName::LeftWrist, 30.0);
        set_curl(&mut frame2, LandmarkName::RightShoulder, LandmarkName::RightElbow, LandmarkName::RightWrist, 140.0);
        let second = analyzer.analyze(&frame2).unwrap();
        assert_eq!(second.rep_count, 1);
    }

    #[test]
    fn upright_torso_has_no_lean_back_error() {
        let mut analyzer = BicepAnalyzer::with_classifier(
            Box::new(crate::model::classifier::LinearClassifier::new(vec![vec![0.0], vec![0.0]], vec![0.0, 0.0])),
            None,
        );
        let mut frame = frame_with_defaults();
        upright_torso(&mut frame);
        set_curl(&mut frame, LandmarkName::LeftShoulder, LandmarkName::LeftElbow, LandmarkName::LeftWrist, 160.0);
        set_curl(&mut frame, LandmarkName::RightShoulder, LandmarkName::RightElbow, LandmarkName::RightWrist, 140.0);
        let result = analyzer.analyze(&frame).unwrap();
        assert!(!result.errors.iter().any(|e| e.error_type == "lean_back"));
    }

    #[test]
    fn reset_clears_both_sides() {
        let mut analyzer = BicepAnalyzer::with_classifier(
            Box::new(crate::model::classifier::LinearClassifier::new(vec![vec![0.0], vec![0.0]], vec![0.0, 0.0])),
            None,
        );
        analyzer.left.rep_counter.increment();
        analyzer.right.rep_counter.increment();
        analyzer.reset();
        assert_eq!(analyzer.left.rep_counter.count(), 0);
        assert_eq!(analyzer.right.rep_counter.count(), 0);
    }
}
