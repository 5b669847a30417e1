//! Line-delimited JSON wire protocol (`spec.md` §6), grounded on
//! `exercise_analyzer_server.py`'s cascading request-shape detection:
//! the service accepts a primary request form plus four legacy shapes
//! left over from earlier client versions, tried in a fixed priority
//! order, and replies with one of three response shapes.
//!
//! Parsing goes through `serde_json::Value` rather than a single derived
//! struct because the accepted shapes share field names (`landmarks`,
//! `type`) with incompatible meanings across forms; a `Value` lets each
//! form's detection stay a short, explicit predicate instead of a single
//! struct with a dozen mutually-exclusive optional fields.

use serde::Serialize;
use serde_json::Value;

use crate::analyzers::{AnalysisResult, ExerciseKind};
use crate::errors::Failure;
use crate::landmark::{Frame, Landmark};

/// A request line once its wire shape has been resolved and its
/// landmarks normalized into the crate's internal `Frame` representation.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub request_id: String,
    pub exercise_kind: ExerciseKind,
    pub frame: Frame,
}

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub request_id: String,
    pub exercise_kind: ExerciseKind,
    pub command: String,
}

#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Analyze(AnalyzeRequest),
    Command(CommandRequest),
}

const UNKNOWN_REQUEST_ID: &str = "unknown";
const DEFAULT_EXERCISE: &str = "squat";
const ULTRA_SIMPLE_VISIBILITY: f32 = 0.9;

/// A rejected request line, carrying the best `requestId` recoverable
/// from it. `spec.md` §7/§8: failures preserve the originating
/// `requestId` whenever the line parsed as JSON at all; only a JSON
/// syntax error (or a non-object top level) falls back to the literal
/// string `"unknown"`.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub request_id: String,
    pub failure: Failure,
}

/// Parses one line of input into a resolved request, or a `ParseFailure`
/// carrying both the reason the line was rejected and whatever
/// `requestId` could be recovered from it.
pub fn parse_line(line: &str) -> Result<IncomingMessage, ParseFailure> {
    let value: Value = serde_json::from_str(line).map_err(|e| ParseFailure {
        request_id: UNKNOWN_REQUEST_ID.to_string(),
        failure: Failure::InvalidInput(format!("malformed JSON: {e}")),
    })?;
    let object = value.as_object().ok_or_else(|| ParseFailure {
        request_id: UNKNOWN_REQUEST_ID.to_string(),
        failure: Failure::InvalidInput("request must be a JSON object".to_string()),
    })?;

    let request_id = object
        .get("requestId")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_REQUEST_ID)
        .to_string();

    if let Some(command) = object.get("command").and_then(Value::as_str) {
        let exercise_kind = exercise_kind_from(object, "exerciseType");
        return Ok(IncomingMessage::Command(CommandRequest {
            request_id,
            exercise_kind,
            command: command.to_string(),
        }));
    }

    let frame = extract_frame(object).map_err(|failure| ParseFailure {
        request_id: request_id.clone(),
        failure,
    })?;
    let exercise_kind = resolve_exercise_kind(object);
    Ok(IncomingMessage::Analyze(AnalyzeRequest {
        request_id,
        exercise_kind,
        frame,
    }))
}

fn exercise_kind_from(object: &serde_json::Map<String, Value>, key: &str) -> ExerciseKind {
    object
        .get(key)
        .and_then(Value::as_str)
        .and_then(ExerciseKind::from_wire_str)
        .unwrap_or_default()
}

/// Picks the `exerciseType`/`exercise`/`e` field matching whichever shape
/// `extract_frame` resolved, falling back to `squat` (`spec.md` §4.8).
fn resolve_exercise_kind(object: &serde_json::Map<String, Value>) -> ExerciseKind {
    for key in ["exerciseType", "exercise", "e"] {
        if let Some(kind) = exercise_kind_from_or_none(object, key) {
            return kind;
        }
    }
    ExerciseKind::default()
}

fn exercise_kind_from_or_none(object: &serde_json::Map<String, Value>, key: &str) -> Option<ExerciseKind> {
    object.get(key).and_then(Value::as_str).and_then(ExerciseKind::from_wire_str)
}

/// Resolves a request's landmarks following the original server's
/// if/elif cascade: primary/ultra-simplified `landmarks`, the `type:
/// "data"` point-list form, the compact `t`/`p` form, the legacy
/// `type: "landmarks"` form, and finally the oldest bare `poseLandmarks`
/// form with no `type` tag at all.
fn extract_frame(object: &serde_json::Map<String, Value>) -> Result<Frame, Failure> {
    if let Some(Value::Array(points)) = object.get("landmarks") {
        return landmarks_from_array(points);
    }
    if object.get("type").and_then(Value::as_str) == Some("data") {
        if let Some(Value::Array(points)) = object.get("points") {
            return landmarks_from_xyv(points);
        }
    }
    if object.get("t").and_then(Value::as_str) == Some("landmarks") {
        if let Some(Value::Array(points)) = object.get("p") {
            return landmarks_from_compact(points);
        }
    }
    if object.get("type").and_then(Value::as_str) == Some("landmarks") {
        if let Some(Value::Array(points)) = object.get("poseLandmarks") {
            return landmarks_from_array(points);
        }
    }
    if let Some(Value::Array(points)) = object.get("poseLandmarks") {
        return landmarks_from_array(points);
    }
    Err(Failure::InvalidInput("no landmarks found in request".to_string()))
}

/// A landmark entry carrying full fields (`x`, `y`, `z`, `visibility`) is
/// the primary form; one carrying only `x`/`y` is the ultra-simplified
/// legacy form, defaulting `z` to 0.0 and `visibility` to 0.9 so it still
/// clears a typical analyzer's visibility gate.
fn landmarks_from_array(points: &[Value]) -> Result<Frame, Failure> {
    points
        .iter()
        .map(|point| {
            let x = required_f32(point, "x")?;
            let y = required_f32(point, "y")?;
            let z = optional_f32(point, "z").unwrap_or(0.0);
            let visibility = optional_f32(point, "visibility").unwrap_or(ULTRA_SIMPLE_VISIBILITY);
            Ok(Landmark::new(x, y, z, visibility))
        })
        .collect()
}

/// `{"type": "data", "points": [{"x":.., "y":.., "v":..}, ...]}`.
fn landmarks_from_xyv(points: &[Value]) -> Result<Frame, Failure> {
    points
        .iter()
        .map(|point| {
            let x = required_f32(point, "x")?;
            let y = required_f32(point, "y")?;
            let z = optional_f32(point, "z").unwrap_or(0.0);
            let visibility = optional_f32(point, "v").unwrap_or(0.0);
            Ok(Landmark::new(x, y, z, visibility))
        })
        .collect()
}

/// `{"t": "landmarks", "p": [[x, y, z, v], ...]}`.
fn landmarks_from_compact(points: &[Value]) -> Result<Frame, Failure> {
    points
        .iter()
        .map(|point| {
            let quad = point
                .as_array()
                .ok_or_else(|| Failure::InvalidLandmark("compact landmark is not an array".to_string()))?;
            if quad.len() < 4 {
                return Err(Failure::InvalidLandmark(format!(
                    "compact landmark has {} fields, expected 4",
                    quad.len()
                )));
            }
            let as_f32 = |i: usize| {
                quad[i]
                    .as_f64()
                    .map(|v| v as f32)
                    .ok_or_else(|| Failure::InvalidLandmark(format!("compact landmark field {i} is not numeric")))
            };
            Ok(Landmark::new(as_f32(0)?, as_f32(1)?, as_f32(2)?, as_f32(3)?))
        })
        .collect()
}

fn required_f32(point: &Value, key: &str) -> Result<f32, Failure> {
    point
        .get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .ok_or_else(|| Failure::InvalidLandmark(format!("landmark missing required field `{key}`")))
}

fn optional_f32(point: &Value, key: &str) -> Option<f32> {
    point.get(key).and_then(Value::as_f64).map(|v| v as f32)
}

/// `{"success": true, "requestId", "type": "analysis_result", "processingTime", "result"}`.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "type")]
    pub response_type: &'static str,
    #[serde(rename = "processingTime")]
    pub processing_time: f64,
    pub result: AnalysisResult,
}

impl AnalysisResponse {
    pub fn new(request_id: String, processing_time: f64, result: AnalysisResult) -> Self {
        Self {
            success: true,
            request_id,
            response_type: "analysis_result",
            processing_time,
            result,
        }
    }
}

/// `{"success": true, "requestId", "type": "command_response", "command", "message", "processingTime"}`.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "type")]
    pub response_type: &'static str,
    pub command: String,
    pub message: String,
    #[serde(rename = "processingTime")]
    pub processing_time: f64,
}

impl CommandResponse {
    pub fn reset_counter_ack(request_id: String, exercise_kind: ExerciseKind, processing_time: f64) -> Self {
        Self {
            success: true,
            request_id,
            response_type: "command_response",
            command: "reset_counter_ack".to_string(),
            message: format!("Reset counter for {}", exercise_kind.as_wire_str()),
            processing_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: &'static str,
    pub message: String,
}

/// `{"success": false, "requestId", "type": "error_response", "error": {"type", "severity", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "type")]
    pub response_type: &'static str,
    pub error: ErrorPayload,
}

impl ErrorResponse {
    pub fn new(request_id: String, failure: &Failure) -> Self {
        Self {
            success: false,
            request_id,
            response_type: "error_response",
            error: ErrorPayload {
                kind: failure.kind(),
                severity: "error",
                message: failure.message(),
            },
        }
    }

    pub fn from_parse_failure(parse_failure: &ParseFailure) -> Self {
        Self::new(parse_failure.request_id.clone(), &parse_failure.failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_form_parses_full_landmarks() {
        let line = r#"{"requestId":"r1","exerciseType":"squat","landmarks":[{"x":0.1,"y":0.2,"z":0.0,"visibility":0.9}]}"#;
        let message = parse_line(line).unwrap();
        match message {
            IncomingMessage::Analyze(req) => {
                assert_eq!(req.request_id, "r1");
                assert_eq!(req.exercise_kind, ExerciseKind::Squat);
                assert_eq!(req.frame.len(), 1);
                assert_eq!(req.frame[0].visibility, 0.9);
            }
            _ => panic!("expected an analyze request"),
        }
    }

    #[test]
    fn ultra_simplified_form_defaults_z_and_visibility() {
        let line = r#"{"landmarks":[{"x":0.1,"y":0.2}],"exercise":"pushup"}"#;
        let message = parse_line(line).unwrap();
        match message {
            IncomingMessage::Analyze(req) => {
                assert_eq!(req.exercise_kind, ExerciseKind::Pushup);
                assert_eq!(req.frame[0].z, 0.0);
                assert_eq!(req.frame[0].visibility, ULTRA_SIMPLE_VISIBILITY);
            }
            _ => panic!("expected an analyze request"),
        }
    }

    #[test]
    fn compact_form_parses_point_quads() {
        let line = r#"{"t":"landmarks","e":"lunge","id":7,"p":[[0.1,0.2,0.0,0.8]]}"#;
        let message = parse_line(line).unwrap();
        match message {
            IncomingMessage::Analyze(req) => {
                assert_eq!(req.exercise_kind, ExerciseKind::Lunge);
                assert_eq!(req.frame[0].visibility, 0.8);
            }
            _ => panic!("expected an analyze request"),
        }
    }

    #[test]
    fn data_points_form_defaults_z_and_reads_v() {
        let line = r#"{"type":"data","exercise":"situp","frame":3,"points":[{"x":0.1,"y":0.2,"v":0.7}]}"#;
        let message = parse_line(line).unwrap();
        match message {
            IncomingMessage::Analyze(req) => {
                assert_eq!(req.exercise_kind, ExerciseKind::Situp);
                assert_eq!(req.frame[0].z, 0.0);
                assert_eq!(req.frame[0].visibility, 0.7);
            }
            _ => panic!("expected an analyze request"),
        }
    }

    #[test]
    fn legacy_pose_landmarks_with_type_tag_parses() {
        let line = r#"{"type":"landmarks","poseLandmarks":[{"x":0.1,"y":0.2,"z":0.0,"visibility":0.5}],"exerciseType":"bench_press","frameId":2}"#;
        let message = parse_line(line).unwrap();
        match message {
            IncomingMessage::Analyze(req) => {
                assert_eq!(req.exercise_kind, ExerciseKind::BenchPress);
                assert_eq!(req.frame[0].visibility, 0.5);
            }
            _ => panic!("expected an analyze request"),
        }
    }

    #[test]
    fn bare_pose_landmarks_without_type_tag_falls_back() {
        let line = r#"{"poseLandmarks":[{"x":0.1,"y":0.2,"z":0.0,"visibility":0.5}],"exerciseType":"plank"}"#;
        let message = parse_line(line).unwrap();
        match message {
            IncomingMessage::Analyze(req) => {
                assert_eq!(req.exercise_kind, ExerciseKind::Plank);
            }
            _ => panic!("expected an analyze request"),
        }
    }

    #[test]
    fn command_request_is_recognized_before_any_landmark_shape() {
        let line = r#"{"requestId":"r2","exerciseType":"squat","command":"reset_counter"}"#;
        let message = parse_line(line).unwrap();
        assert_matches::assert_matches!(
            message,
            IncomingMessage::Command(ref req)
                if req.command == "reset_counter" && req.exercise_kind == ExerciseKind::Squat
        );
    }

    #[test]
    fn missing_landmarks_preserves_request_id_as_invalid_input() {
        let line = r#"{"requestId":"r3","exerciseType":"squat"}"#;
        let err = parse_line(line).unwrap_err();
        assert_eq!(err.failure.kind(), "INVALID_INPUT");
        assert_eq!(err.request_id, "r3");
    }

    #[test]
    fn malformed_json_is_invalid_input_with_unknown_request_id() {
        let err = parse_line("not json").unwrap_err();
        let response = ErrorResponse::from_parse_failure(&err);
        assert_eq!(response.request_id, "unknown");
        assert_eq!(response.error.kind, "INVALID_INPUT");
    }

    #[test]
    fn landmark_missing_required_field_preserves_request_id_as_invalid_landmark() {
        let line = r#"{"requestId":"r4","exerciseType":"squat","landmarks":[{"x":0.1}]}"#;
        let err = parse_line(line).unwrap_err();
        assert_eq!(err.failure.kind(), "INVALID_LANDMARK");
        assert_eq!(err.request_id, "r4");
    }

    #[test]
    fn exercise_type_defaults_to_squat_when_absent() {
        let line = r#"{"landmarks":[{"x":0.1,"y":0.2,"z":0.0,"visibility":0.9}]}"#;
        let message = parse_line(line).unwrap();
        assert_matches::assert_matches!(
            message,
            IncomingMessage::Analyze(ref req) if req.exercise_kind == ExerciseKind::Squat
        );
    }
}
