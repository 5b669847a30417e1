//! Shoulder press analyzer (geometric), grounded on
//! `examples/original_source/backend/src/services/python/shoulder_press_analyzer.py`.
//! Reps commit on a two-phase `up -> counting -> down` transition so a rep
//! is only credited once the down position is confirmed on a second frame.

use std::collections::HashMap;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::geometry::angle;
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.65;
const ANGLE_UP_THRESHOLD: f32 = 110.0;
const ANGLE_DOWN_THRESHOLD: f32 = 150.0;
const UNEVEN_PRESSING_THRESHOLD: f32 = 15.0;
const INCOMPLETE_PRESS_THRESHOLD: f32 = 100.0;

const JOINTS: [LandmarkName; 6] = [
    LandmarkName::LeftShoulder,
    LandmarkName::LeftElbow,
    LandmarkName::LeftWrist,
    LandmarkName::RightShoulder,
    LandmarkName::RightElbow,
    LandmarkName::RightWrist,
];

#[derive(Debug)]
pub struct ShoulderPressAnalyzer {
    rep_counter: RepCounter,
    stage: Stage,
}

impl ShoulderPressAnalyzer {
    pub fn new() -> Self {
        Self {
            rep_counter: RepCounter::new(),
            stage: Stage::Down,
        }
    }

    fn empty_result(&self) -> AnalysisResult {
        let mut metrics = HashMap::new();
        metrics.insert("leftArmAngle".to_string(), None);
        metrics.insert("rightArmAngle".to_string(), None);
        AnalysisResult::new(self.stage, self.rep_counter.count(), Vec::new(), metrics)
    }
}

impl Analyzer for ShoulderPressAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);
        if !acc.all_visible(&JOINTS) {
            return Ok(self.empty_result());
        }

        let left_shoulder = frame[LandmarkName::LeftShoulder.index()].point();
        let left_elbow = frame[LandmarkName::LeftElbow.index()].point();
        let left_wrist = frame[LandmarkName::LeftWrist.index()].point();
        let right_shoulder = frame[LandmarkName::RightShoulder.index()].point();
        let right_elbow = frame[LandmarkName::RightElbow.index()].point();
        let right_wrist = frame[LandmarkName::RightWrist.index()].point();

        let left_angle = angle(left_shoulder, left_elbow, left_wrist);
        let right_angle = angle(right_shoulder, right_elbow, right_wrist);

        let (Some(left), Some(right)) = (left_angle, right_angle) else {
            return Ok(self.empty_result());
        };

        let previous_stage = self.stage;
        if left < ANGLE_UP_THRESHOLD && right < ANGLE_UP_THRESHOLD {
            self.stage = Stage::Up;
        } else if left > ANGLE_DOWN_THRESHOLD && right > ANGLE_DOWN_THRESHOLD {
            if previous_stage == Stage::Up && self.stage != Stage::Counting {
                self.stage = Stage::Counting;
            } else if previous_stage == Stage::Counting {
                self.stage = Stage::Down;
                self.rep_counter.increment();
            } else {
                self.stage = Stage::Down;
            }
        }

        let mut errors = Vec::new();
        if (left - right).abs() > UNEVEN_PRESSING_THRESHOLD {
            errors.push(FormError::new(
                "uneven_pressing",
                Severity::Medium,
                "Keep both arms even during the press",
            ));
        }
        if self.stage == Stage::Up && (left > INCOMPLETE_PRESS_THRESHOLD || right > INCOMPLETE_PRESS_THRESHOLD) {
            errors.push(FormError::new(
                "incorrect_form",
                Severity::Low,
                "Press the weights fully overhead for complete range of motion",
            ));
        }

        let mut metrics = HashMap::new();
        metrics.insert("leftArmAngle".to_string(), Some(left));
        metrics.insert("rightArmAngle".to_string(), Some(right));

        Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.stage = Stage::Down;
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
        let wrist = (0.3 + 0.3 * theta.cos(), 0.3 * theta.sin());
        set(&mut frame, LandmarkName::LeftWrist, wrist.0, wrist.1);
        set(&mut frame, LandmarkName::RightWrist, wrist.0, wrist.1);
        frame
    }

    #[test]
    fn full_press_cycle_counts_one_rep_on_second_down_frame() {
        let mut analyzer = ShoulderPressAnalyzer::new();

        let up = frame_with_arm_angle(60.0);
        let first = analyzer.analyze(&up).unwrap();
        assert_eq!(first.stage, Stage::Up);

        let down = frame_with_arm_angle(170.0);
        let second = analyzer.analyze(&down).unwrap();
        assert_eq!(second.stage, Stage::Counting);
        assert_eq!(second.rep_count, 0);

        let third = analyzer.analyze(&down).unwrap();
        assert_eq!(third.stage, Stage::Down);
        assert_eq!(third.rep_count, 1);
    }

    #[test]
    fn uneven_arms_produce_medium_severity_error() {
        let mut analyzer = ShoulderPressAnalyzer::new();
        let mut frame = frame_with_defaults();
        set(&mut frame, LandmarkName::LeftShoulder, 0.0, 0.0);
        set(&mut frame, LandmarkName::RightShoulder, 0.0, 0.0);
        set(&mut frame, LandmarkName::LeftElbow, 0.3, 0.0);
        set(&mut frame, LandmarkName::RightElbow, 0.3, 0.0);
        set(&mut frame, LandmarkName::LeftWrist, 0.3, 0.3);
        set(&mut frame, LandmarkName::RightWrist, 0.6, 0.0);

        let result = analyzer.analyze(&frame).unwrap();
        assert!(result.errors.iter().any(|e| e.error_type == "uneven_pressing"));
    }

    #[test]
    fn low_visibility_yields_none_metrics_without_changing_stage() {
        let mut analyzer = ShoulderPressAnalyzer::new();
        let mut frame = frame_with_defaults();
        frame[LandmarkName::LeftWrist.index()] = Landmark::new(0.0, 0.0, 0.0, 0.1);
        let result = analyzer.analyze(&frame).unwrap();
        assert_eq!(result.stage, Stage::Down);
        assert_eq!(result.metrics.get("leftArmAngle"), Some(&None));
    }

    #[test]
    fn reset_clears_counter_and_stage() {
        let mut analyzer = ShoulderPressAnalyzer::new();
        let down = frame_with_arm_angle(170.0);
        analyzer.analyze(&down).unwrap();
        analyzer.reset();
        assert_eq!(analyzer.rep_counter.count(), 0);
        assert_eq!(analyzer.stage, Stage::Down);
    }
}
