//! Eye aspect ratio (EAR) geometry
//!
//! For one eye described by six ordered points
//!
//! ```text
//!        p1   p2
//!   p0            p3
//!        p5   p4
//! ```
//!
//! `EAR = (|p1 - p5| + |p2 - p4|) / (2 |p0 - p3|)`. An open eye sits around
//! 0.3, a closed one drops towards 0.

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeSide, Face, Landmark};
use crate::DmsError;

/// Number of points describing one eye
pub const EYE_POINTS: usize = 6;

/// Minimum horizontal eye width; narrower boxes are degenerate
const MIN_EYE_WIDTH: f32 = f32::EPSILON;

/// Planar distance between two landmarks (z is ignored)
pub fn euclidean(a: &Landmark, b: &Landmark) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Compute the eye aspect ratio of six ordered eye points.
///
/// Fails with [`DmsError::InvalidInput`] when the set does not hold exactly
/// six points, a coordinate is not finite, or the corner-to-corner width is
/// zero. It never returns NaN or infinity.
pub fn eye_aspect_ratio(points: &[Landmark]) -> Result<f32, DmsError> {
    if points.len() != EYE_POINTS {
        return Err(DmsError::InvalidInput(format!(
            "expected {} eye points, got {}",
            EYE_POINTS,
            points.len()
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(DmsError::InvalidInput("non-finite eye coordinate".into()));
    }

    let a = euclidean(&points[1], &points[5]);
    let b = euclidean(&points[2], &points[4]);
    let c = euclidean(&points[0], &points[3]);

    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return Err(DmsError::InvalidInput(
            "eye distances overflow f32".into(),
        ));
    }
    if c <= MIN_EYE_WIDTH {
        return Err(DmsError::InvalidInput(format!(
            "degenerate eye: corner distance {c}"
        )));
    }

    let ratio = (a + b) / (2.0 * c);
    if !ratio.is_finite() {
        return Err(DmsError::InvalidInput(format!(
            "eye aspect ratio not finite: {ratio}"
        )));
    }
    Ok(ratio)
}

/// Combine per-eye ratios into the session EAR.
///
/// Both eyes: arithmetic mean. One eye: that eye's ratio. Neither: `None`.
pub fn combined_ear(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Per-eye and combined EAR for one face
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EarReading {
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub combined: Option<f32>,
}

impl EarReading {
    /// Evaluate both eyes of `face`.
    ///
    /// A face that lacks the eye indices of its layout is a detection anomaly
    /// and fails with [`DmsError::LandmarksMissing`]. A degenerate eye only
    /// drops that eye from the reading.
    pub fn from_face(face: &Face) -> Result<Self, DmsError> {
        let left_points = face.eye(EyeSide::Left)?;
        let right_points = face.eye(EyeSide::Right)?;

        let left = eye_aspect_ratio(&left_points).ok();
        let right = eye_aspect_ratio(&right_points).ok();

        Ok(Self {
            left,
            right,
            combined: combined_ear(left, right),
        })
    }

    /// Number of eyes that produced a ratio
    pub fn eyes_measured(&self) -> usize {
        usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }
}
