//! Feature vector extraction (C4), grounded on
//! `ai-coach-api/src/services/keypoint_processor.rs::process_frame`'s
//! flattening of keypoints into a model-ready vector.

use crate::landmark::{Frame, LandmarkName};

/// Flatten `[x, y, z, visibility]` for each of `joints`, in the declared
/// order, into one feature vector (`spec.md` §4.4). Missing landmarks
/// (frame shorter than the requested index) contribute zeros rather than
/// shrinking the vector, so the output length is always `4 * joints.len()`.
pub fn extract(frame: &Frame, joints: &[LandmarkName]) -> Vec<f32> {
    let mut out = Vec::with_capacity(joints.len() * 4);
    for &name in joints {
        match frame.get(name.index()) {
            Some(lm) => {
                out.push(lm.x);
                out.push(lm.y);
                out.push(lm.z);
                out.push(lm.visibility);
            }
            None => out.extend_from_slice(&[0.0, 0.0, 0.0, 0.0]),
        }
    }
    out
}
