//! Lateral raise analyzer (geometric), grounded on
//! `examples/original_source/backend/src/services/python/lateral_raise_analyzer.py`.
//! Stage naming is inverted relative to every other analyzer: `Stage::Down`
//! means arms raised to the sides, `Stage::Up` means arms resting down, per
//! the source's own `(INVERTED)` comment in `detect_stage`.

use std::collections::HashMap;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::geometry::angle;
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.2;
const VISIBILITY_QUORUM: f32 = 0.7;
const ANGLE_UP_THRESHOLD: f32 = 120.0;
const ANGLE_DELTA_THRESHOLD: f32 = 15.0;
const ANGLE_STABLE_THRESHOLD: f32 = 7.0;
const UNEVEN_ARMS_THRESHOLD: f32 = 20.0;
const EXCESSIVE_RAISE_THRESHOLD: f32 = 170.0;
const INSUFFICIENT_RAISE_THRESHOLD: f32 = 100.0;

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
pub struct LateralRaiseAnalyzer {
    rep_counter: RepCounter,
    stage: Stage,
    is_raising: bool,
    prev_left_angle: Option<f32>,
    prev_right_angle: Option<f32>,
}

impl LateralRaiseAnalyzer {
    pub fn new() -> Self {
        Self {
            rep_counter: RepCounter::new(),
            stage: Stage::Up,
            is_raising: false,
            prev_left_angle: None,
            prev_right_angle: None,
        }
    }

    fn is_visible(acc: &LandmarkAccessor) -> bool {
        acc.visible_fraction(&REQUIRED_LANDMARKS) >= VISIBILITY_QUORUM
    }
}

impl Analyzer for LateralRaiseAnalyzer {
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
            return Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics));
        }

        let left_shoulder = frame[LandmarkName::LeftShoulder.index()].point();
        let left_elbow = frame[LandmarkName::LeftElbow.index()].point();
        let left_hip = frame[LandmarkName::LeftHip.index()].point();
        let right_shoulder = frame[LandmarkName::RightShoulder.index()].point();
        let right_elbow = frame[LandmarkName::RightElbow.index()].point();
        let right_hip = frame[LandmarkName::RightHip.index()].point();

        let left_angle = angle(left_shoulder, left_elbow, left_hip).unwrap_or(0.0);
        let right_angle = angle(right_shoulder, right_elbow, right_hip).unwrap_or(0.0);

        let (left_delta, right_delta) = match (self.prev_left_angle, self.prev_right_angle) {
            (Some(prev_left), Some(prev_right)) => {
                let left_delta = (left_angle - prev_left).abs();
                let right_delta = (right_angle - prev_right).abs();
                if !self.is_raising && left_delta > ANGLE_DELTA_THRESHOLD && right_delta > ANGLE_DELTA_THRESHOLD {
                    self.is_raising = true;
                } else if self.is_raising && left_delta < ANGLE_STABLE_THRESHOLD && right_delta < ANGLE_STABLE_THRESHOLD {
                    self.is_raising = false;
                }
                (left_delta, right_delta)
            }
            _ => (0.0, 0.0),
        };
        self.prev_left_angle = Some(left_angle);
        self.prev_right_angle = Some(right_angle);

        let avg_angle = (left_angle + right_angle) / 2.0;
        let current_stage = if avg_angle > ANGLE_UP_THRESHOLD { Stage::Down } else { Stage::Up };

        if self.is_raising && left_angle > ANGLE_UP_THRESHOLD && right_angle > ANGLE_UP_THRESHOLD {
            if self.stage == Stage::Up && current_stage == Stage::Down {
                self.rep_counter.increment();
            }
        }
        self.stage = current_stage;

        let mut errors = Vec::new();
        if (left_angle - right_angle).abs() > UNEVEN_ARMS_THRESHOLD {
            errors.push(FormError::new(
                "uneven_arms",
                Severity::Medium,
                "Keep both arms at the same height during lateral raises.",
            ));
        }
        if left_angle > EXCESSIVE_RAISE_THRESHOLD || right_angle > EXCESSIVE_RAISE_THRESHOLD {
            errors.push(FormError::new(
                "excessive_raise",
                Severity::Medium,
                "Avoid raising arms too high above shoulder level.",
            ));
        }
        if self.stage == Stage::Down && (left_angle < INSUFFICIENT_RAISE_THRESHOLD || right_angle < INSUFFICIENT_RAISE_THRESHOLD) {
            errors.push(FormError::new(
                "insufficient_raise",
                Severity::Medium,
                "Raise arms to at least shoulder level for full range of motion.",
            ));
        }

        let mut metrics = HashMap::new();
        metrics.insert("leftArmAngle".to_string(), Some(left_angle));
        metrics.insert("rightArmAngle".to_string(), Some(right_angle));
        metrics.insert("armAngleDelta".to_string(), Some((left_angle - right_angle).abs()));
        metrics.insert("leftDelta".to_string(), Some(left_delta));
        metrics.insert("rightDelta".to_string(), Some(right_delta));

        Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.stage = Stage::Up;
        self.is_raising = false;
        self.prev_left_angle = None;
        self.prev_right_angle = None;
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

    fn frame_with_arm_angle(angle_degrees: f32) -> Frame {
        let mut frame = frame_with_defaults();
        set(&mut frame, LandmarkName::LeftShoulder, 0.0, 0.0);
        set(&mut frame, LandmarkName::RightShoulder, 0.0, 0.0);
        set(&mut frame, LandmarkName::LeftElbow, 0.3, 0.0);
        set(&mut frame, LandmarkName::RightElbow, 0.3, 0.0);

        let theta = angle_degrees.to_radians();
        let hip = (0.3 + 0.3 * theta.cos(), 0.3 * theta.sin());
        set(&mut frame, LandmarkName::LeftHip, hip.0, hip.1);
        set(&mut frame, LandmarkName::RightHip, hip.0, hip.1);
        frame
    }

    #[test]
    fn raising_then_stabilizing_above_shoulders_counts_rep() {
        let mut analyzer = LateralRaiseAnalyzer::new();

        analyzer.analyze(&frame_with_arm_angle(10.0)).unwrap();
        let raising = analyzer.analyze(&frame_with_arm_angle(140.0)).unwrap();
        assert!(raising.stage == Stage::Down || raising.rep_count == 0);

        let stable = analyzer.analyze(&frame_with_arm_angle(145.0)).unwrap();
        assert_eq!(stable.stage, Stage::Down);
        assert_eq!(stable.rep_count, 1);
    }

    #[test]
    fn poor_visibility_yields_high_severity_error_and_preserves_rep_count() {
        let mut analyzer = LateralRaiseAnalyzer::new();
        let mut frame = frame_with_defaults();
        for name in REQUIRED_LANDMARKS {
            frame[name.index()] = Landmark::new(0.0, 0.0, 0.0, 0.0);
        }
        let result = analyzer.analyze(&frame).unwrap();
        assert!(result.errors.iter().any(|e| e.error_type == "visibility"));
        assert_eq!(result.rep_count, 0);
    }

    #[test]
    fn uneven_arms_produce_medium_error() {
        let mut analyzer = LateralRaiseAnalyzer::new();
        let mut frame = frame_with_defaults();
        set(&mut frame, LandmarkName::LeftShoulder, 0.0, 0.0);
        set(&mut frame, LandmarkName::RightShoulder, 0.0, 0.0);
        set(&mut frame, LandmarkName::LeftElbow, 0.3, 0.0);
        set(&mut frame, LandmarkName::RightElbow, 0.3, 0.0);
        set(&mut frame, LandmarkName::LeftHip, 0.3, 0.3);
        set(&mut frame, LandmarkName::RightHip, 0.6, 0.0);

        let result = analyzer.analyze(&frame).unwrap();
        assert!(result.errors.iter().any(|e| e.error_type == "uneven_arms"));
    }

    #[test]
    fn reset_clears_counter_stage_and_deltas() {
        let mut analyzer = LateralRaiseAnalyzer::new();
        analyzer.analyze(&frame_with_arm_angle(140.0)).unwrap();
        analyzer.reset();
        assert_eq!(analyzer.rep_counter.count(), 0);
        assert_eq!(analyzer.stage, Stage::Up);
        assert!(!analyzer.is_raising);
        assert_eq!(analyzer.prev_left_angle, None);
    }
}
