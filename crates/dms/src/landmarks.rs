//! Facial landmark layouts and detected faces

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Single facial landmark in frame pixel coordinates (z = 0 for 2D layouts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    /// 2D landmark
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// 3D landmark
    pub const fn with_depth(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Eye side, from the subject's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeSide {
    Left,
    Right,
}

/// Dlib 68-point eye indices (outer, upper x2, inner, lower x2)
const DLIB68_LEFT_EYE: [usize; 6] = [36, 37, 38, 39, 40, 41];
const DLIB68_RIGHT_EYE: [usize; 6] = [42, 43, 44, 45, 46, 47];

/// MediaPipe face-mesh eye indices, same ordering convention
const FACE_MESH_LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
const FACE_MESH_RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Landmark indexing convention produced by a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkLayout {
    /// 68 2D points (iBUG 300-W / dlib shape predictor)
    Dlib68,
    /// 468 3D points (MediaPipe face mesh)
    #[default]
    FaceMesh468,
}

impl LandmarkLayout {
    /// Number of points per face
    pub fn point_count(&self) -> usize {
        match self {
            LandmarkLayout::Dlib68 => 68,
            LandmarkLayout::FaceMesh468 => 468,
        }
    }

    /// Coordinates per point in the flattened feature vector
    pub fn dims(&self) -> usize {
        match self {
            LandmarkLayout::Dlib68 => 2,
            LandmarkLayout::FaceMesh468 => 3,
        }
    }

    /// Width D of one frame's feature vector
    pub fn feature_width(&self) -> usize {
        self.point_count() * self.dims()
    }

    /// The six ordered indices of one eye
    pub fn eye_indices(&self, side: EyeSide) -> &'static [usize; 6] {
        match (self, side) {
            (LandmarkLayout::Dlib68, EyeSide::Left) => &DLIB68_LEFT_EYE,
            (LandmarkLayout::Dlib68, EyeSide::Right) => &DLIB68_RIGHT_EYE,
            (LandmarkLayout::FaceMesh468, EyeSide::Left) => &FACE_MESH_LEFT_EYE,
            (LandmarkLayout::FaceMesh468, EyeSide::Right) => &FACE_MESH_RIGHT_EYE,
        }
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub layout: LandmarkLayout,
    pub landmarks: Vec<Landmark>,
    /// Detector confidence (0-1), when the detector reports one
    pub confidence: Option<f32>,
}

impl Face {
    pub fn new(layout: LandmarkLayout, landmarks: Vec<Landmark>) -> Self {
        Self {
            layout,
            landmarks,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Whether the face carries every point its layout promises
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == self.layout.point_count()
    }

    /// Extract the six points of one eye
    pub fn eye(&self, side: EyeSide) -> Result<Vec<Landmark>, DmsError> {
        self.layout
            .eye_indices(side)
            .iter()
            .map(|&i| {
                self.landmarks
                    .get(i)
                    .copied()
                    .ok_or(DmsError::LandmarksMissing {
                        expected: self.layout.point_count(),
                        actual: self.landmarks.len(),
                    })
            })
            .collect()
    }
}
