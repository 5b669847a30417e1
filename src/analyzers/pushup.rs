//! Pushup analyzer (geometric), grounded on
//! `examples/original_source/backend/src/services/python/pushup_analyzer.py`.
//! Visibility is a quorum (>=70% of the required landmarks visible) rather
//! than requiring every joint, and a rep commits only after the analyzer has
//! observed a `down`/`middle` stage since the previous `up`.

use std::collections::HashMap;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::geometry::angle;
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.2;
const VISIBILITY_QUORUM: f32 = 0.7;
const ANGLE_UP_THRESHOLD: f32 = 130.0;
const ANGLE_DOWN_THRESHOLD: f32 = 120.0;
const UNEVEN_ARMS_THRESHOLD: f32 = 20.0;
const BACK_ALIGNMENT_THRESHOLD: f32 = 0.1;

const REQUIRED_LANDMARKS: [LandmarkName; 13] = [
    LandmarkName::Nose,
    LandmarkName::LeftShoulder,
    LandmarkName::RightShoulder,
    LandmarkName::LeftElbow,
    LandmarkName::RightElbow,
    LandmarkName::LeftWrist,
    LandmarkName::RightWrist,
    LandmarkName::LeftHip,
    LandmarkName::RightHip,
    LandmarkName::LeftKnee,
    LandmarkName::RightKnee,
    LandmarkName::LeftAnkle,
    LandmarkName::RightAnkle,
];

#[derive(Debug)]
pub struct PushupAnalyzer {
    rep_counter: RepCounter,
    stage: Stage,
    went_down: bool,
}

impl PushupAnalyzer {
    pub fn new() -> Self {
        Self {
            rep_counter: RepCounter::new(),
            stage: Stage::Up,
            went_down: false,
        }
    }

    fn is_visible(acc: &LandmarkAccessor) -> bool {
        acc.visible_fraction(&REQUIRED_LANDMARKS) >= VISIBILITY_QUORUM
    }
}

impl Analyzer for PushupAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);

        if !Self::is_visible(&acc) {
            let errors = vec![FormError::new(
                "visibility",
                Severity::High,
                "Cannot see body clearly. Adjust your position.",
            )];
            let mut metrics = HashMap::new();
            metrics.insert("leftArmAngle".to_string(), None);
            metrics.insert("rightArmAngle".to_string(), None);
            metrics.insert("armAngleDelta".to_string(), None);
            return Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics));
        }

        let left_shoulder = frame[LandmarkName::LeftShoulder.index()].point();
        let left_elbow = frame[LandmarkName::LeftElbow.index()].point();
        let left_wrist = frame[LandmarkName::LeftWrist.index()].point();
        let right_shoulder = frame[LandmarkName::RightShoulder.index()].point();
        let right_elbow = frame[LandmarkName::RightElbow.index()].point();
        let right_wrist = frame[LandmarkName::RightWrist.index()].point();

        let left_angle = angle(left_shoulder, left_elbow, left_wrist).unwrap_or(0.0);
        let right_angle = angle(right_shoulder, right_elbow, right_wrist).unwrap_or(0.0);
        let avg_angle = (left_angle + right_angle) / 2.0;

        let current_stage = if avg_angle > ANGLE_UP_THRESHOLD {
            Stage::Up
        } else if avg_angle < ANGLE_DOWN_THRESHOLD {
            Stage::Down
        } else {
            Stage::Middle
        };

        if current_stage == Stage::Down {
            self.went_down = true;
        }
        if current_stage == Stage::Up
            && self.went_down
            && matches!(self.stage, Stage::Down | Stage::Middle)
        {
            self.rep_counter.increment();
            self.went_down = false;
        }
        self.stage = current_stage;

        let mut errors = Vec::new();
        if (left_angle - right_angle).abs() > UNEVEN_ARMS_THRESHOLD {
            errors.push(FormError::new(
                "uneven_arms",
                Severity::Medium,
                "Arms are uneven. Keep shoulders level.",
            ));
        }
        if self.stage == Stage::Down && (left_angle > ANGLE_DOWN_THRESHOLD || right_angle > ANGLE_DOWN_THRESHOLD) {
            errors.push(FormError::new(
                "incomplete_pushup",
                Severity::Medium,
                "Go lower for a complete push-up.",
            ));
        }

        let left_hip = frame[LandmarkName::LeftHip.index()].point();
        let right_hip = frame[LandmarkName::RightHip.index()].point();
        let shoulder_y = (left_shoulder.y + right_shoulder.y) / 2.0;
        let hip_y = (left_hip.y + right_hip.y) / 2.0;
        if (shoulder_y - hip_y).abs() > BACK_ALIGNMENT_THRESHOLD {
            errors.push(FormError::new(
                "back_alignment",
                Severity::High,
                "Keep your back straight during push-ups.",
            ));
        }

        let mut metrics = HashMap::new();
        metrics.insert("leftArmAngle".to_string(), Some(left_angle));
        metrics.insert("rightArmAngle".to_string(), Some(right_angle));
        metrics.insert("armAngleDelta".to_string(), Some((left_angle - right_angle).abs()));

        Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.stage = Stage::Up;
        self.went_down = false;
    }
}
