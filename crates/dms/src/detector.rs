//! Landmark detectors

use std::collections::VecDeque;
use std::path::Path;

use camera_capture::VideoFrame;
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::landmarks::{Face, Landmark, LandmarkLayout};
use crate::{DmsConfig, DmsError};

/// Source of facial landmarks for a frame.
///
/// Returns an empty list (not an error) when no face is present. Identical
/// frames must yield identical results.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Face>, DmsError>;

    /// Indexing convention of the returned faces
    fn layout(&self) -> LandmarkLayout;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Face>, DmsError> {
        (**self).detect(frame)
    }

    fn layout(&self) -> LandmarkLayout {
        (**self).layout()
    }
}

type LandmarkModel = TypedRunnableModel<TypedModel>;

/// Single-face landmark regressor (face-mesh style ONNX model) run with tract.
///
/// Input: `1x3xSxS` RGB scaled to `[0, 1]`. Output 0: landmark coordinates in
/// model-input pixels, 2 or 3 values per point. Optional output 1: face
/// presence logit.
pub struct OnnxLandmarkDetector {
    model: LandmarkModel,
    layout: LandmarkLayout,
    input_size: u32,
    face_confidence: f32,
}

impl OnnxLandmarkDetector {
    /// Load the model named by `config.model_path`
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("no landmark model_path configured".into()))?;
        Self::from_path(path, config)
    }

    pub fn from_path(path: &Path, config: &DmsConfig) -> Result<Self, DmsError> {
        info!("Loading landmark model from {}", path.display());
        let size = config.model_input_size as usize;

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| DmsError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            model,
            layout: config.layout,
            input_size: config.model_input_size,
            face_confidence: config.face_confidence,
        })
    }

    fn preprocess(&self, frame: &VideoFrame) -> Result<Tensor, DmsError> {
        let img = frame.to_rgb_image().ok_or_else(|| {
            DmsError::ImageProcessing(format!(
                "frame {} has {} bytes for {}x{}",
                frame.sequence,
                frame.data.len(),
                frame.width,
                frame.height
            ))
        })?;

        let size = self.input_size;
        let resized = imageops::resize(&img, size, size, FilterType::Triangle);
        let size = size as usize;

        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            f32::from(resized.get_pixel(x as u32, y as u32)[c]) / 255.0
        });
        Ok(input.into())
    }
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Turn a flat coordinate buffer into landmarks scaled to frame pixels
pub(crate) fn decode_landmarks(
    values: &[f32],
    layout: LandmarkLayout,
    scale_x: f32,
    scale_y: f32,
) -> Result<Vec<Landmark>, DmsError> {
    let points = layout.point_count();
    let stride = values.len() / points;
    if values.len() % points != 0 || !(2..=3).contains(&stride) {
        return Err(DmsError::Inference(format!(
            "landmark output has {} values, expected {} points x 2 or 3",
            values.len(),
            points
        )));
    }

    Ok(values
        .chunks_exact(stride)
        .map(|c| {
            let z = if stride == 3 { c[2] * scale_x } else { 0.0 };
            Landmark::with_depth(c[0] * scale_x, c[1] * scale_y, z)
        })
        .collect())
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Face>, DmsError> {
        let input = self.preprocess(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let score = match outputs.get(1) {
            Some(t) => {
                let view = t
                    .to_array_view::<f32>()
                    .map_err(|e| DmsError::Inference(e.to_string()))?;
                view.iter().next().map(|&logit| sigmoid(logit))
            }
            None => None,
        };
        if let Some(score) = score {
            if score < self.face_confidence {
                debug!("Frame {}: face score {:.2} below threshold", frame.sequence, score);
                return Ok(Vec::new());
            }
        }

        let coords = outputs
            .first()
            .ok_or_else(|| DmsError::Inference("model produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let values: Vec<f32> = coords.iter().copied().collect();

        let scale_x = frame.width as f32 / self.input_size as f32;
        let scale_y = frame.height as f32 / self.input_size as f32;
        let landmarks = decode_landmarks(&values, self.layout, scale_x, scale_y)?;

        let mut face = Face::new(self.layout, landmarks);
        if let Some(score) = score {
            face = face.with_confidence(score);
        }
        Ok(vec![face])
    }

    fn layout(&self) -> LandmarkLayout {
        self.layout
    }
}

/// Replays pre-recorded detections, one entry per frame.
///
/// Once the recording is exhausted every frame reports no face.
pub struct ReplayDetector {
    layout: LandmarkLayout,
    frames: VecDeque<Result<Vec<Face>, DmsError>>,
}

impl ReplayDetector {
    pub fn new(layout: LandmarkLayout) -> Self {
        Self {
            layout,
            frames: VecDeque::new(),
        }
    }

    /// Queue the detections for the next frame
    pub fn push(&mut self, faces: Vec<Face>) -> &mut Self {
        self.frames.push_back(Ok(faces));
        self
    }

    /// Queue a detector failure for the next frame
    pub fn push_error(&mut self, error: DmsError) -> &mut Self {
        self.frames.push_back(Err(error));
        self
    }

    /// Queue `count` frames with the same detections
    pub fn repeat(&mut self, faces: Vec<Face>, count: usize) -> &mut Self {
        for _ in 0..count {
            self.frames.push_back(Ok(faces.clone()));
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkDetector for ReplayDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Face>, DmsError> {
        self.frames.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn layout(&self) -> LandmarkLayout {
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_3d_landmarks() {
        let values: Vec<f32> = (0..468 * 3).map(|i| (i % 3) as f32 + 1.0).collect();
        let landmarks =
            decode_landmarks(&values, LandmarkLayout::FaceMesh468, 2.0, 0.5).unwrap();
        assert_eq!(landmarks.len(), 468);
        assert_eq!(landmarks[0], Landmark::with_depth(2.0, 1.0, 6.0));
    }

    #[test]
    fn test_decode_2d_landmarks() {
        let values = vec![10.0; 68 * 2];
        let landmarks = decode_landmarks(&values, LandmarkLayout::Dlib68, 1.0, 1.0).unwrap();
        assert_eq!(landmarks.len(), 68);
        assert_eq!(landmarks[67].z, 0.0);
    }

    #[test]
    fn test_decode_wrong_length_is_anomaly() {
        let values = vec![0.0; 100];
        assert!(matches!(
            decode_landmarks(&values, LandmarkLayout::Dlib68, 1.0, 1.0),
            Err(DmsError::Inference(_))
        ));
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
    }

    #[test]
    fn test_replay_detector() {
        let frame = VideoFrame::blank(4, 4, 0, 0);
        let face = Face::new(LandmarkLayout::Dlib68, vec![Landmark::default(); 68]);

        let mut detector = ReplayDetector::new(LandmarkLayout::Dlib68);
        detector
            .push(vec![face.clone()])
            .push_error(DmsError::Inference("boom".into()));

        assert_eq!(detector.detect(&frame).unwrap(), vec![face]);
        assert!(detector.detect(&frame).is_err());
        assert!(detector.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_missing_model_path() {
        let config = DmsConfig::default();
        assert!(matches!(
            OnnxLandmarkDetector::new(&config),
            Err(DmsError::Config(_))
        ));
    }

    #[test]
    fn test_unreadable_model() {
        let config = DmsConfig::default();
        let result = OnnxLandmarkDetector::from_path(Path::new("/no/such/model.onnx"), &config);
        assert!(matches!(result, Err(DmsError::ModelLoad(_))));
    }
}
