//! Pure geometric primitives shared by every analyzer: angle between three
//! points and Euclidean distance. Grounded on
//! `ai-coach-api/src/models/keypoint.rs`'s `Keypoint::distance_to` and
//! `JointAngle` calculation.

/// A 2D point. Analyzers only ever reason about the x,y plane; z is carried
/// on `Landmark` for completeness but unused by any geometric calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Interior angle at `b` of the triangle a-b-c, in degrees, clamped to
/// [0, 180]. Returns `None` when either arm has zero length (coincident
/// points), since the angle is undefined there.
pub fn angle(a: Point2, b: Point2, c: Point2) -> Option<f32> {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);

    let mag_ba = (ba.0 * ba.0 + ba.1 * ba.1).sqrt();
    let mag_bc = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();

    if mag_ba == 0.0 || mag_bc == 0.0 {
        return None;
    }

    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    let cos_angle = (dot / (mag_ba * mag_bc)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Euclidean distance between two points in the x,y plane.
pub fn distance(p: Point2, q: Point2) -> f32 {
    let dx = p.x - q.x;
    let dy = p.y - q.y;
    (dx * dx + dy * dy).sqrt()
}
