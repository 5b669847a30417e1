//! Shared fixtures for the integration test suite, grounded on the
//! teacher's `tests/common` helper module
//! (`ai-coach-api/tests/common`): frame builders and a thin wrapper
//! around `Worker` that drives it against an in-memory buffer instead
//! of real stdio.

use std::path::Path;

use exercise_analyzer::analyzers::AnalyzerRegistry;
use exercise_analyzer::worker::Worker;
use serde_json::{json, Value};

pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;
pub const FRAME_LEN: usize = 33;

/// A frame of 33 landmarks, all visible and resting at the origin until
/// overridden with [`set_point`].
pub fn default_frame() -> Vec<Value> {
    (0..FRAME_LEN)
        .map(|_| json!({"x": 0.0, "y": 0.0, "z": 0.0, "visibility": 1.0}))
        .collect()
}

pub fn set_point(frame: &mut [Value], index: usize, x: f64, y: f64) {
    frame[index] = json!({"x": x, "y": y, "z": 0.0, "visibility": 1.0});
}

/// Places `shoulder`/`elbow` fixed and swings `wrist` so the interior
/// angle at the elbow is approximately `degrees`, matching the
/// construction each analyzer's own unit tests use.
pub fn set_arm_angle(frame: &mut [Value], shoulder: usize, elbow: usize, wrist: usize, degrees: f64) {
    set_point(frame, shoulder, 0.0, 0.0);
    set_point(frame, elbow, 0.3, 0.0);
    let theta = degrees.to_radians();
    let wrist_point = (0.3 + 0.3 * theta.cos(), 0.3 * theta.sin());
    set_point(frame, wrist, wrist_point.0, wrist_point.1);
}

/// Builds a frame whose torso angle (shoulder-hip-knee) is approximately
/// `torso_degrees` and whose knee angle (hip-knee-ankle) is
/// approximately `knee_degrees`, on the left side — mirrors
/// `situp.rs`'s own `frame_with_angles` test helper.
pub fn situp_frame(torso_degrees: f64, knee_degrees: f64) -> Vec<Value> {
    let mut frame = default_frame();
    set_point(&mut frame, LEFT_HIP, 0.0, 0.0);

    let shoulder_theta = torso_degrees.to_radians();
    let shoulder = (0.5 * shoulder_theta.sin(), -0.5 * shoulder_theta.cos());
    set_point(&mut frame, LEFT_SHOULDER, shoulder.0, shoulder.1);

    set_point(&mut frame, LEFT_KNEE, 0.5, 0.0);

    let knee_theta = knee_degrees.to_radians();
    let ankle = (0.5 + 0.5 * knee_theta.cos(), 0.5 * knee_theta.sin());
    set_point(&mut frame, LEFT_ANKLE, ankle.0, ankle.1);
    frame
}

/// Both shoulders fixed at the origin, both elbows at `(0.3, 0.0)`, both
/// wrists swung to `degrees` — mirrors `bench_press.rs` and `pushup.rs`'s
/// own `frame_with_arm_angle` helpers so both arms move in lockstep.
pub fn symmetric_arm_frame(degrees: f64) -> Vec<Value> {
    let mut frame = default_frame();
    set_point(&mut frame, LEFT_SHOULDER, 0.0, 0.0);
    set_point(&mut frame, RIGHT_SHOULDER, 0.0, 0.0);
    set_point(&mut frame, LEFT_ELBOW, 0.3, 0.0);
    set_point(&mut frame, RIGHT_ELBOW, 0.3, 0.0);
    let theta = degrees.to_radians();
    let wrist = (0.3 + 0.3 * theta.cos(), 0.3 * theta.sin());
    set_point(&mut frame, LEFT_WRIST, wrist.0, wrist.1);
    set_point(&mut frame, RIGHT_WRIST, wrist.0, wrist.1);
    frame
}

pub fn analyze_line(request_id: &str, exercise: &str, frame: &[Value]) -> String {
    json!({
        "requestId": request_id,
        "exerciseType": exercise,
        "landmarks": frame,
    })
    .to_string()
}

pub fn command_line(request_id: &str, exercise: &str, command: &str) -> String {
    json!({
        "requestId": request_id,
        "exerciseType": exercise,
        "command": command,
    })
    .to_string()
}

/// Feeds `lines` (one request per entry) through a fresh [`Worker`]
/// rooted at `model_root`, terminating with `EXIT`, and returns every
/// response line (the readiness banner included) as parsed JSON.
pub async fn run_lines(model_root: &Path, lines: &[String]) -> Vec<Value> {
    let mut input = String::new();
    for line in lines {
        input.push_str(line);
        input.push('\n');
    }
    input.push_str("EXIT\n");

    let reader = std::io::Cursor::new(input.into_bytes());
    let registry = AnalyzerRegistry::new(model_root);
    let mut worker = Worker::new(reader, Vec::<u8>::new(), registry);
    worker.run(Box::pin(std::future::pending::<()>())).await.unwrap();

    String::from_utf8(worker.writer().clone())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// [`run_lines`] against a throwaway model root with no classifier
/// artifacts, for the purely-geometric analyzers.
pub async fn run_lines_no_models(lines: &[String]) -> Vec<Value> {
    run_lines(Path::new("./no-such-model-root"), lines).await
}
