//! Bench press analyzer (geometric), grounded on
//! `examples/original_source/backend/src/services/python/bench_press_analyzer.py`.
//! Reps commit on an `is_pressing` edge-triggered down->up transition rather
//! than the two-phase commit shoulder press uses.

use std::collections::HashMap;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::errors::Failure;
use crate::geometry::angle;
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.1;
const DOWN_ANGLE_THRESHOLD: f32 = 145.0;
const UP_ANGLE_THRESHOLD: f32 = 160.0;
const UNEVEN_PRESSING_THRESHOLD: f32 = 15.0;
const INCOMPLETE_PRESS_THRESHOLD: f32 = 150.0;

const JOINTS: [LandmarkName; 6] = [
    LandmarkName::LeftShoulder,
    LandmarkName::LeftElbow,
    LandmarkName::LeftWrist,
    LandmarkName::RightShoulder,
    LandmarkName::RightElbow,
    LandmarkName::RightWrist,
];

#[derive(Debug)]
pub struct BenchPressAnalyzer {
    rep_counter: RepCounter,
    stage: Stage,
    is_pressing: bool,
}

impl BenchPressAnalyzer {
    pub fn new() -> Self {
        Self {
            rep_counter: RepCounter::new(),
            stage: Stage::Down,
            is_pressing: false,
        }
    }

    fn empty_result(&self) -> AnalysisResult {
        let mut metrics = HashMap::new();
        metrics.insert("leftShoulderAngle".to_string(), None);
        metrics.insert("rightShoulderAngle".to_string(), None);
        AnalysisResult::new(self.stage, self.rep_counter.count(), Vec::new(), metrics)
    }
}

impl Analyzer for BenchPressAnalyzer {
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

        if left_angle.is_none() && right_angle.is_none() {
            return Ok(self.empty_result());
        }

        let previous_stage = self.stage;
        if let (Some(left), Some(right)) = (left_angle, right_angle) {
            if !self.is_pressing && left < DOWN_ANGLE_THRESHOLD && right < DOWN_ANGLE_THRESHOLD {
                self.is_pressing = true;
                self.stage = Stage::Down;
            } else if self.is_pressing && left > UP_ANGLE_THRESHOLD && right > UP_ANGLE_THRESHOLD {
                self.is_pressing = false;
                self.stage = Stage::Up;
                if previous_stage == Stage::Down {
                    self.rep_counter.increment();
                }
            }
        }

        let mut errors = Vec::new();
        if let (Some(left), Some(right)) = (left_angle, right_angle) {
            if (left - right).abs() > UNEVEN_PRESSING_THRESHOLD {
                errors.push(FormError::new(
                    "uneven_pressing",
                    Severity::Medium,
                    "Keep both arms even during the press",
                ));
            }
            if self.stage == Stage::Up && (left < INCOMPLETE_PRESS_THRESHOLD || right < INCOMPLETE_PRESS_THRESHOLD) {
                errors.push(FormError::new(
                    "incorrect_form",
                    Severity::Low,
                    "Extend arms fully for complete range of motion",
                ));
            }
        }

        let mut metrics = HashMap::new();
        metrics.insert("leftShoulderAngle".to_string(), left_angle);
        metrics.insert("rightShoulderAngle".to_string(), right_angle);

        Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.stage = Stage::Down;
        self.is_pressing = false;
    }
}
