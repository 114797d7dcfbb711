//! Per-frame feature vectors for dataset capture

use serde::{Deserialize, Serialize};

use crate::landmarks::Face;

/// One frame's landmark snapshot.
///
/// A frame without a face is tagged `Absent` rather than zero-filled, so it
/// can never be mistaken for a real observation. Zero-filling only happens
/// when a window is exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameFeatures {
    /// Flattened landmark coordinates, `layout.dims()` values per point
    Observed(Vec<f32>),
    /// No usable face in this frame
    Absent,
}

impl FrameFeatures {
    /// Flatten a face's landmarks in index order
    pub fn from_face(face: &Face) -> Self {
        let dims = face.layout.dims();
        let mut values = Vec::with_capacity(face.landmarks.len() * dims);
        for lm in &face.landmarks {
            values.push(lm.x);
            values.push(lm.y);
            if dims == 3 {
                values.push(lm.z);
            }
        }
        FrameFeatures::Observed(values)
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, FrameFeatures::Observed(_))
    }

    /// Feature values, `None` when absent
    pub fn as_slice(&self) -> Option<&[f32]> {
        match self {
            FrameFeatures::Observed(values) => Some(values),
            FrameFeatures::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Landmark, LandmarkLayout};

    #[test]
    fn test_flatten_2d() {
        let face = Face::new(
            LandmarkLayout::Dlib68,
            vec![Landmark::new(1.0, 2.0), Landmark::new(3.0, 4.0)],
        );
        assert_eq!(
            FrameFeatures::from_face(&face),
            FrameFeatures::Observed(vec![1.0, 2.0, 3.0, 4.0])
        );
    }

    #[test]
    fn test_flatten_3d() {
        let face = Face::new(
            LandmarkLayout::FaceMesh468,
            vec![Landmark::with_depth(1.0, 2.0, -0.5)],
        );
        let features = FrameFeatures::from_face(&face);
        assert_eq!(features.as_slice(), Some(&[1.0, 2.0, -0.5][..]));
        assert!(features.is_observed());
    }

    #[test]
    fn test_absent_has_no_values() {
        assert_eq!(FrameFeatures::Absent.as_slice(), None);
        assert!(!FrameFeatures::Absent.is_observed());
    }
}
