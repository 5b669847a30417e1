//! The analyzer family (C6) and its shared contract.
//!
//! Grounded on `spec.md` §9's re-architecture guidance: a registry mapping
//! `ExerciseKind -> AnalyzerFactory` that materializes analyzers lazily,
//! replacing the original's `if exercise == 'squat': ...` dispatch
//! (`examples/original_source/backend/src/services/python/exercise_analyzer_server.py::load_analyzer`).

pub mod bench_press;
pub mod bicep;
pub mod lateral_raise;
pub mod lunge;
pub mod plank;
pub mod pushup;
pub mod shoulder_press;
pub mod situp;
pub mod squat;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Failure;
use crate::landmark::Frame;

/// Closed set of supported exercises (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Squat,
    Bicep,
    Lunge,
    Plank,
    Situp,
    ShoulderPress,
    BenchPress,
    Pushup,
    LateralRaise,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 9] = [
        ExerciseKind::Squat,
        ExerciseKind::Bicep,
        ExerciseKind::Lunge,
        ExerciseKind::Plank,
        ExerciseKind::Situp,
        ExerciseKind::ShoulderPress,
        ExerciseKind::BenchPress,
        ExerciseKind::Pushup,
        ExerciseKind::LateralRaise,
    ];

    pub fn as_wire_str(self) -> &'static str {
        match self {
            ExerciseKind::Squat => "squat",
            ExerciseKind::Bicep => "bicep",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::Plank => "plank",
            ExerciseKind::Situp => "situp",
            ExerciseKind::ShoulderPress => "shoulder_press",
            ExerciseKind::BenchPress => "bench_press",
            ExerciseKind::Pushup => "pushup",
            ExerciseKind::LateralRaise => "lateral_raise",
        }
    }

    /// Parses the wire `exerciseType` string, accepting a couple of
    /// synonyms seen across the legacy request forms in the original
    /// service (`bicep_curl`, `lateral raise` with a space).
    pub fn from_wire_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "squat" => Some(ExerciseKind::Squat),
            "bicep" | "bicep_curl" | "biceps" => Some(ExerciseKind::Bicep),
            "lunge" => Some(ExerciseKind::Lunge),
            "plank" => Some(ExerciseKind::Plank),
            "situp" | "sit_up" => Some(ExerciseKind::Situp),
            "shoulder_press" => Some(ExerciseKind::ShoulderPress),
            "bench_press" => Some(ExerciseKind::BenchPress),
            "pushup" | "push_up" => Some(ExerciseKind::Pushup),
            "lateral_raise" => Some(ExerciseKind::LateralRaise),
            _ => None,
        }
    }
}

impl Default for ExerciseKind {
    /// `exerciseType` defaults to `squat` when absent (`spec.md` §4.8).
    fn default() -> Self {
        ExerciseKind::Squat
    }
}

/// Discrete posture phase label. Each analyzer emits only the subset
/// `spec.md` §3 declares for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Up,
    Down,
    Middle,
    Counting,
    Init,
    Mid,
    Correct,
    HighBack,
    LowBack,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub severity: Severity,
    pub message: String,
}

impl FormError {
    pub fn new(error_type: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            severity,
            message: message.into(),
        }
    }
}

/// The per-frame judgement an analyzer produces (`spec.md` §3). `metrics`
/// maps a named scalar to `None` when it could not be computed for this
/// frame rather than omitting the key, since callers index metrics by
/// name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub stage: Stage,
    #[serde(rename = "repCount")]
    pub rep_count: u64,
    #[serde(rename = "formScore")]
    pub form_score: u8,
    pub errors: Vec<FormError>,
    pub metrics: HashMap<String, Option<f32>>,
    /// Plank only (`spec.md` §6): duplicated at the result root alongside
    /// `metrics.holdTime`.
    #[serde(rename = "durationInSeconds", skip_serializing_if = "Option::is_none")]
    pub duration_in_seconds: Option<i64>,
    #[serde(rename = "holdTime", skip_serializing_if = "Option::is_none")]
    pub hold_time: Option<i64>,
}

impl AnalysisResult {
    pub fn new(stage: Stage, rep_count: u64, errors: Vec<FormError>, metrics: HashMap<String, Option<f32>>) -> Self {
        let form_score = crate::scoring::score(&errors);
        Self {
            stage,
            rep_count,
            form_score,
            errors,
            metrics,
            duration_in_seconds: None,
            hold_time: None,
        }
    }
}

/// The contract every exercise analyzer implements (`spec.md` §4.6).
pub trait Analyzer: std::fmt::Debug + Send {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, Failure>;
    fn reset(&mut self);
}

/// Lazily constructs and owns at most one analyzer per kind
/// (`spec.md` §3 Lifecycle, §9 registry guidance).
#[derive(Debug)]
pub struct AnalyzerRegistry {
    model_root: PathBuf,
    instances: HashMap<ExerciseKind, Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
            instances: HashMap::new(),
        }
    }

    pub fn get_or_create(&mut self, kind: ExerciseKind) -> &mut Box<dyn Analyzer> {
        self.instances
            .entry(kind)
            .or_insert_with(|| Self::construct(kind, &self.model_root))
    }

    pub fn reset(&mut self, kind: ExerciseKind) -> bool {
        match self.instances.get_mut(&kind) {
            Some(analyzer) => {
                analyzer.reset();
                true
            }
            None => false,
        }
    }

    fn construct(kind: ExerciseKind, model_root: &Path) -> Box<dyn Analyzer> {
        match kind {
            ExerciseKind::Squat => Box::new(squat::SquatAnalyzer::new(model_root)),
            ExerciseKind::Bicep => Box::new(bicep::BicepAnalyzer::new(model_root)),
            ExerciseKind::Lunge => Box::new(lunge::LungeAnalyzer::new(model_root)),
            ExerciseKind::Plank => Box::new(plank::PlankAnalyzer::new(model_root)),
            ExerciseKind::Situp => Box::new(situp::SitupAnalyzer::new()),
            ExerciseKind::ShoulderPress => Box::new(shoulder_press::ShoulderPressAnalyzer::new()),
            ExerciseKind::BenchPress => Box::new(bench_press::BenchPressAnalyzer::new()),
            ExerciseKind::Pushup => Box::new(pushup::PushupAnalyzer::new()),
            ExerciseKind::LateralRaise => Box::new(lateral_raise::LateralRaiseAnalyzer::new()),
        }
    }
}
