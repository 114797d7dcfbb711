//! Annotated frame output

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_polygon_mut, draw_hollow_rect_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::{info, warn};

use dms::Landmark;

use crate::observer::{FrameReport, SessionObserver};

const EYE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const ALERT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const PROGRESS_COLOR: Rgb<u8> = Rgb([0, 128, 255]);
const BORDER_WIDTH: u32 = 4;
const PROGRESS_HEIGHT: u32 = 6;

/// Draws eye contours, the drowsy border and collection progress onto each
/// frame and saves it as a PNG
pub struct OverlayWriter {
    dir: PathBuf,
    written: u64,
}

impl OverlayWriter {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Writing overlay frames to {}", dir.display());
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Annotated copy of the frame, `None` for frames without pixel data
    pub fn render(report: &FrameReport<'_>) -> Option<RgbImage> {
        let mut image = report.frame.to_rgb_image()?;

        if let Some((left, right)) = &report.analysis.eyes {
            draw_eye(&mut image, left);
            draw_eye(&mut image, right);
        }

        if report.analysis.is_drowsy {
            draw_border(&mut image);
        }

        if let Some((collected, capacity)) = report.collected {
            draw_progress(&mut image, collected, capacity);
        }

        Some(image)
    }
}

impl SessionObserver for OverlayWriter {
    fn on_frame(&mut self, report: &FrameReport<'_>) {
        let Some(image) = Self::render(report) else {
            warn!("Frame {}: no pixel data, overlay skipped", report.frame.sequence);
            return;
        };
        let path = self
            .dir
            .join(format!("frame_{:06}.png", report.frame.sequence));
        match image.save(&path) {
            Ok(()) => self.written += 1,
            Err(e) => warn!("Failed to write overlay {}: {}", path.display(), e),
        }
    }
}

fn draw_eye(image: &mut RgbImage, eye: &[Landmark]) {
    let points: Vec<Point<f32>> = eye
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| Point::new(p.x, p.y))
        .collect();
    // polygon drawing panics on closed or too-short contours
    if points.len() < 3 || points.first() == points.last() {
        return;
    }
    draw_hollow_polygon_mut(image, &points, EYE_COLOR);
}

fn draw_border(image: &mut RgbImage) {
    let (width, height) = image.dimensions();
    for inset in 0..BORDER_WIDTH {
        let w = width.saturating_sub(2 * inset);
        let h = height.saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        draw_hollow_rect_mut(
            image,
            Rect::at(inset as i32, inset as i32).of_size(w, h),
            ALERT_COLOR,
        );
    }
}

fn draw_progress(image: &mut RgbImage, collected: usize, capacity: usize) {
    let (width, height) = image.dimensions();
    if capacity == 0 || collected == 0 || height == 0 {
        return;
    }
    let filled = (width as u64 * collected.min(capacity) as u64 / capacity as u64) as u32;
    let bar = PROGRESS_HEIGHT.min(height);
    if filled == 0 {
        return;
    }
    draw_filled_rect_mut(
        image,
        Rect::at(0, (height - bar) as i32).of_size(filled, bar),
        PROGRESS_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::VideoFrame;
    use dms::FrameAnalysis;

    fn frame() -> VideoFrame {
        VideoFrame::blank(64, 48, 0, 7)
    }

    fn eye(x0: f32) -> Vec<Landmark> {
        vec![
            Landmark::new(x0, 20.0),
            Landmark::new(x0 + 4.0, 16.0),
            Landmark::new(x0 + 8.0, 16.0),
            Landmark::new(x0 + 12.0, 20.0),
            Landmark::new(x0 + 8.0, 24.0),
            Landmark::new(x0 + 4.0, 24.0),
        ]
    }

    #[test]
    fn test_render_eyes_and_border() {
        let frame = frame();
        let analysis = FrameAnalysis {
            eyes: Some((eye(10.0), eye(40.0))),
            is_drowsy: true,
            ..Default::default()
        };
        let report = FrameReport {
            frame: &frame,
            analysis: &analysis,
            collected: Some((15, 30)),
        };

        let image = OverlayWriter::render(&report).unwrap();
        assert_eq!(image.get_pixel(10, 20), &EYE_COLOR);
        assert_eq!(image.get_pixel(0, 0), &ALERT_COLOR);
        assert_eq!(image.get_pixel(31, 20), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(10, 47), &PROGRESS_COLOR);
        assert_ne!(image.get_pixel(50, 45), &PROGRESS_COLOR);
    }

    #[test]
    fn test_awake_frame_has_no_border() {
        let frame = frame();
        let analysis = FrameAnalysis::default();
        let report = FrameReport {
            frame: &frame,
            analysis: &analysis,
            collected: None,
        };
        let image = OverlayWriter::render(&report).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_writes_png_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OverlayWriter::new(dir.path().join("overlay")).unwrap();
        let frame = frame();
        let analysis = FrameAnalysis::default();

        writer.on_frame(&FrameReport {
            frame: &frame,
            analysis: &analysis,
            collected: None,
        });

        assert_eq!(writer.written(), 1);
        assert!(writer.dir().join("frame_000007.png").exists());
    }
}
