//! Situp analyzer (geometric), grounded on
//! `examples/original_source/backend/src/services/python/situp_analyzer.py`.
//! The source tracks whichever side (left/right) is more visible rather than
//! requiring both, which `LandmarkAccessor::get_preferring` models directly.
//! The per-frame minimum-angle-change requirement varies with knee bend
//! quality, so the debounce discipline is inlined here rather than reusing
//! `rep_counter::DebounceGate`'s fixed-excursion contract.

use std::collections::HashMap;
use std::time::Duration;

use crate::analyzers::{AnalysisResult, Analyzer, FormError, Severity, Stage};
use crate::clock::{Clock, SystemClock};
use crate::errors::Failure;
use crate::geometry::angle;
use crate::landmark::{Frame, LandmarkAccessor, LandmarkName, FRAME_LEN};
use crate::rep_counter::RepCounter;

const VISIBILITY_THRESHOLD: f32 = 0.3;
const DOWN_THRESHOLD: f32 = 120.0;
const UP_THRESHOLD: f32 = 90.0;
const MIN_ANGLE_CHANGE: f32 = 20.0;
const MIN_REP_INTERVAL: Duration = Duration::from_millis(1000);
const KNEE_IDEAL: (f32, f32) = (40.0, 45.0);
const KNEE_ACCEPTABLE_MAX: f32 = 90.0;
const KNEE_STRAIGHT_THRESHOLD: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KneeQuality {
    Ideal,
    Acceptable,
    Straight,
    Other,
    Unknown,
}

#[derive(Debug)]
pub struct SitupAnalyzer {
    rep_counter: RepCounter,
    stage: Stage,
    clock: Box<dyn Clock>,
    last_counted_at: Option<std::time::Instant>,
    min_angle_detected: f32,
}

impl SitupAnalyzer {
    pub fn new() -> Self {
        Self {
            rep_counter: RepCounter::new(),
            stage: Stage::Down,
            clock: Box::new(SystemClock),
            last_counted_at: None,
            min_angle_detected: 180.0,
        }
    }

    #[cfg(test)]
    fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            rep_counter: RepCounter::new(),
            stage: Stage::Down,
            clock,
            last_counted_at: None,
            min_angle_detected: 180.0,
        }
    }

    fn knee_quality(knee_angle: Option<f32>) -> KneeQuality {
        match knee_angle {
            None => KneeQuality::Unknown,
            Some(a) if a >= KNEE_IDEAL.0 && a <= KNEE_IDEAL.1 => KneeQuality::Ideal,
            Some(a) if a > KNEE_IDEAL.1 && a <= KNEE_ACCEPTABLE_MAX => KneeQuality::Acceptable,
            Some(a) if a > KNEE_STRAIGHT_THRESHOLD => KneeQuality::Straight,
            Some(_) => KneeQuality::Other,
        }
    }

    /// (down_threshold, up_threshold, min_angle_change), widened for
    /// imperfect knee bends per `situp_analyzer.py::analyze_pose`.
    fn thresholds(quality: KneeQuality) -> (f32, f32, f32) {
        match quality {
            KneeQuality::Ideal => (110.0, 85.0, MIN_ANGLE_CHANGE),
            KneeQuality::Acceptable => (DOWN_THRESHOLD + 5.0, UP_THRESHOLD, MIN_ANGLE_CHANGE + 5.0),
            KneeQuality::Straight => (DOWN_THRESHOLD + 15.0, UP_THRESHOLD, MIN_ANGLE_CHANGE + 15.0),
            KneeQuality::Other | KneeQuality::Unknown => (DOWN_THRESHOLD, UP_THRESHOLD, MIN_ANGLE_CHANGE),
        }
    }

    fn empty_result(&self) -> AnalysisResult {
        let mut metrics = HashMap::new();
        metrics.insert("torsoAngle".to_string(), None);
        metrics.insert("kneeAngle".to_string(), None);
        AnalysisResult::new(self.stage, self.rep_counter.count(), Vec::new(), metrics)
    }
}

impl Analyzer for SitupAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure> {
        if frame.len() != FRAME_LEN {
            return Err(Failure::InvalidInput(format!(
                "expected {FRAME_LEN} landmarks, got {}",
                frame.len()
            )));
        }
        let acc = LandmarkAccessor::new(frame, VISIBILITY_THRESHOLD);

        let Some((shoulder_lm, side)) = acc.get_preferring(LandmarkName::LeftShoulder, LandmarkName::RightShoulder) else {
            return Ok(self.empty_result());
        };
        let is_left = side == LandmarkName::LeftShoulder;
        let hip_name = if is_left { LandmarkName::LeftHip } else { LandmarkName::RightHip };
        let knee_name = if is_left { LandmarkName::LeftKnee } else { LandmarkName::RightKnee };
        let ankle_name = if is_left { LandmarkName::LeftAnkle } else { LandmarkName::RightAnkle };

        let Some(hip_lm) = acc.get(hip_name) else {
            return Ok(self.empty_result());
        };
        let Some(knee_lm) = acc.get(knee_name) else {
            return Ok(self.empty_result());
        };

        let shoulder = shoulder_lm.point();
        let hip = hip_lm.point();
        let knee = knee_lm.point();
        let ankle = acc.get(ankle_name).map(|lm| lm.point());

        let knee_angle = ankle.and_then(|a| angle(hip, knee, a));
        let quality = Self::knee_quality(knee_angle);
        let torso_angle = angle(shoulder, hip, knee).unwrap_or(180.0).clamp(0.0, 180.0);

        let (down_threshold, up_threshold, min_angle_change) = Self::thresholds(quality);
        let is_down = torso_angle >= down_threshold;
        let is_up = torso_angle < up_threshold;
        let previous_stage = self.stage;

        if is_down {
            if previous_stage != Stage::Down {
                self.min_angle_detected = 180.0;
            }
            self.min_angle_detected = self.min_angle_detected.min(torso_angle);
            self.stage = Stage::Down;
        } else if is_up && previous_stage == Stage::Down {
            self.stage = Stage::Up;
            let excursion = self.min_angle_detected - torso_angle;
            let now = self.clock.now();
            let interval_ok = match self.last_counted_at {
                None => true,
                Some(prev) => now.duration_since(prev) >= MIN_REP_INTERVAL,
            };
            if interval_ok && excursion >= min_angle_change {
                self.rep_counter.increment();
                self.last_counted_at = Some(now);
            }
        } else if is_up {
            self.stage = Stage::Up;
        }

        let mut errors = Vec::new();
        if quality == KneeQuality::Straight {
            errors.push(FormError::new(
                "straight_legs",
                Severity::High,
                "Bend your knees to approximately 40-45 degrees for ideal form",
            ));
        } else if !matches!(quality, KneeQuality::Ideal | KneeQuality::Acceptable | KneeQuality::Unknown) {
            errors.push(FormError::new(
                "improper_knee_angle",
                Severity::Medium,
                "Adjust knee bend closer to 40-45 degrees for ideal form",
            ));
        }
        if self.stage == Stage::Up && torso_angle >= up_threshold {
            errors.push(FormError::new(
                "incomplete_situp",
                Severity::Medium,
                "Sit up more to reach a full crunch",
            ));
        }

        let mut metrics = HashMap::new();
        metrics.insert("torsoAngle".to_string(), Some(torso_angle));
        metrics.insert("kneeAngle".to_string(), knee_angle);

        Ok(AnalysisResult::new(self.stage, self.rep_counter.count(), errors, metrics))
    }

    fn reset(&mut self) {
        self.rep_counter.reset();
        self.stage = Stage::Down;
        self.last_counted_at = None;
        self.min_angle_detected = 180.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::landmark::Landmark;
    use std::sync::Arc;

    struct SharedFakeClock(Arc<FakeClock>);
    impl std::fmt::Debug for SharedFakeClock {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SharedFakeClock")
        }
    }
    impl Clock for SharedFakeClock {
        fn now(&self) -> std::time::Instant {
            self.0.now()
        }
    }

    fn frame_with_defaults() -> Frame {
        vec![Landmark::new(0.0, 0.0, 0.0, 1.0); FRAME_LEN]
    }

    fn set(frame: &mut Frame, name: LandmarkName, x: f32, y: f32) {
        frame[name.index()] = Landmark::new(x, y, 0.0, 1.0);
    }

    /// Builds a frame whose torso angle (shoulder-hip-knee) is approximately
    /// `torso_degrees` and whose knee angle (hip-knee-ankle) is
    /// approximately `knee_degrees`, using the left side.
    fn frame_with_angles(torso_degrees: f32, knee_degrees: f32) -> Frame {
        let mut frame = frame_with_defaults();
        let hip = (0.0, 0.0);
        set(&mut frame, LandmarkName::LeftHip, hip.0, hip.1);

        let shoulder_theta = torso_degrees.to_radians();
        let shoulder = (0.5 * shoulder_theta.sin(), -0.5 * shoulder_theta.cos());
        set(&mut frame, LandmarkName::LeftShoulder, shoulder.0, shoulder.1);

        // Knee placed along +x from the hip so the torso angle above is
        // measured against it directly.
        let knee = (0.5, 0.0);
        set(&mut frame, LandmarkName::LeftKnee, knee.0, knee.1);

        let knee_theta = knee_degrees.to_radians();
        let ankle = (
            knee.0 + 0.5 * knee_theta.cos(),
            knee.1 + 0.5 * knee_theta.sin(),
        );
        set(&mut frame, LandmarkName::LeftAnkle, ankle.0, ankle.1);
        frame
    }

    #[test]
    fn straight_legs_produce_high_severity_error() {
        let mut analyzer = SitupAnalyzer::new();
        let frame = frame_with_angles(160.0, 170.0);
        let result = analyzer.analyze(&frame).unwrap();
        assert!(result.errors.iter().any(|e| e.error_type == "straight_legs"));
    }

    #[test]
    fn down_to_up_with_sufficient_excursion_and_interval_counts_rep() {
        let clock = Arc::new(FakeClock::new());
        let mut analyzer = SitupAnalyzer::with_clock(Box::new(SharedFakeClock(clock.clone())));

        let down = frame_with_angles(160.0, 45.0);
        let first = analyzer.analyze(&down).unwrap();
        assert_eq!(first.stage, Stage::Down);

        clock.advance(Duration::from_millis(1500));
        let up = frame_with_angles(60.0, 45.0);
        let second = analyzer.analyze(&up).unwrap();
        assert_eq!(second.stage, Stage::Up);
        assert_eq!(second.rep_count, 1);
    }

    #[test]
    fn rapid_rep_within_interval_is_ignored() {
        let clock = Arc::new(FakeClock::new());
        let mut analyzer = SitupAnalyzer::with_clock(Box::new(SharedFakeClock(clock.clone())));

        let down = frame_with_angles(160.0, 45.0);
        analyzer.analyze(&down).unwrap();

        clock.advance(Duration::from_millis(1500));
        let up = frame_with_angles(60.0, 45.0);
        analyzer.analyze(&up).unwrap();

        analyzer.analyze(&down).unwrap();
        clock.advance(Duration::from_millis(100));
        let second_up = analyzer.analyze(&up).unwrap();
        assert_eq!(second_up.rep_count, 1);
    }

    #[test]
    fn reset_clears_counter_and_stage() {
        let mut analyzer = SitupAnalyzer::new();
        let down = frame_with_angles(160.0, 45.0);
        analyzer.analyze(&down).unwrap();
        analyzer.reset();
        assert_eq!(analyzer.rep_counter.count(), 0);
        assert_eq!(analyzer.stage, Stage::Down);
    }
}
