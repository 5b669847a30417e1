//! Named landmark indexing and visibility-gated joint lookup.
//!
//! Grounded on `ai-coach-api/src/models/keypoint.rs::CocoKeypoint`, adapted
//! from the 17-point COCO convention to the 33-point pose convention this
//! crate's upstream pose engine emits (`spec.md` §3).

use crate::geometry::Point2;
use serde::{Deserialize, Serialize};

/// One point of the skeleton: normalized x, y, z and a visibility score in
/// [0, 1]. A frame is exactly 33 of these, in a fixed order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// A single frame: exactly 33 landmarks in the fixed index order below.
pub type Frame = Vec<Landmark>;

pub const FRAME_LEN: usize = 33;

/// Named joint indices for the 33-point pose convention (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkName {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl LandmarkName {
    pub fn index(self) -> usize {
        match self {
            LandmarkName::Nose => 0,
            LandmarkName::LeftShoulder => 11,
            LandmarkName::RightShoulder => 12,
            LandmarkName::LeftElbow => 13,
            LandmarkName::RightElbow => 14,
            LandmarkName::LeftWrist => 15,
            LandmarkName::RightWrist => 16,
            LandmarkName::LeftHip => 23,
            LandmarkName::RightHip => 24,
            LandmarkName::LeftKnee => 25,
            LandmarkName::RightKnee => 26,
            LandmarkName::LeftAnkle => 27,
            LandmarkName::RightAnkle => 28,
            LandmarkName::LeftHeel => 29,
            LandmarkName::RightHeel => 30,
            LandmarkName::LeftFootIndex => 31,
            LandmarkName::RightFootIndex => 32,
        }
    }
}

/// Visibility-gated accessor over a single frame. Each analyzer constructs
/// one of these with its own threshold (`spec.md` §6 constants table).
pub struct LandmarkAccessor<'a> {
    frame: &'a Frame,
    visibility_threshold: f32,
}

impl<'a> LandmarkAccessor<'a> {
    pub fn new(frame: &'a Frame, visibility_threshold: f32) -> Self {
        Self {
            frame,
            visibility_threshold,
        }
    }

    /// Raw landmark regardless of visibility, or `None` if the frame is too
    /// short to contain the index.
    pub fn raw(&self, name: LandmarkName) -> Option<&'a Landmark> {
        self.frame.get(name.index())
    }

    /// Landmark gated on the accessor's visibility threshold.
    pub fn get(&self, name: LandmarkName) -> Option<&'a Landmark> {
        self.raw(name)
            .filter(|lm| lm.visibility >= self.visibility_threshold)
    }

    pub fn is_visible(&self, name: LandmarkName) -> bool {
        self.get(name).is_some()
    }

    /// All named joints meet the visibility threshold.
    pub fn all_visible(&self, names: &[LandmarkName]) -> bool {
        names.iter().all(|&n| self.is_visible(n))
    }

    /// Fraction of the given joints that meet the visibility threshold, in
    /// [0, 1]. Used by pushup's `visibility` error check.
    pub fn visible_fraction(&self, names: &[LandmarkName]) -> f32 {
        if names.is_empty() {
            return 1.0;
        }
        let visible = names.iter().filter(|&&n| self.is_visible(n)).count();
        visible as f32 / names.len() as f32
    }

    /// Resolve a side-symmetric joint, preferring `primary` and falling
    /// back to `mirror` when `primary` is not visible. Used by situp, which
    /// picks the more visible side per `spec.md` §4.6.
    pub fn get_preferring(
        &self,
        primary: LandmarkName,
        mirror: LandmarkName,
    ) -> Option<(&'a Landmark, LandmarkName)> {
        if let Some(lm) = self.get(primary) {
            Some((lm, primary))
        } else {
            self.get(mirror).map(|lm| (lm, mirror))
        }
    }
}
