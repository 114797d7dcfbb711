//! Driver drowsiness state tracking
//!
//! A hysteresis counter: the eyes must stay below the EAR threshold for
//! `consec_frames` consecutive frames before the driver is declared drowsy,
//! and a single open-eye frame resets the count.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::DmsError;

/// Drowsiness phase derived from the consecutive-closed counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrowsinessPhase {
    /// Eyes open, counter at zero
    #[default]
    Awake,
    /// Eyes closed, but not yet for long enough
    Accumulating,
    /// Eyes closed for at least the configured number of frames
    Drowsy,
}

/// Edge event emitted when `is_drowsy` flips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertEdge {
    /// false -> true
    Entered,
    /// true -> false
    Recovered,
}

impl AlertEdge {
    /// `true` for the drowsy-entry edge
    pub fn is_entering(&self) -> bool {
        matches!(self, AlertEdge::Entered)
    }
}

/// What to do with frames that carry no face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoFacePolicy {
    /// Treat the frame as "eyes open": counter back to zero
    #[default]
    ResetCounter,
    /// Leave counter and drowsy flag untouched
    HoldState,
}

/// One frame's input to the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Combined eye aspect ratio for this frame
    Ear(f32),
    /// No face (or no usable eyes) in this frame
    NoFace,
}

/// Hysteresis counter over per-frame EAR values
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    ear_threshold: f32,
    consec_frames: u32,
    no_face_policy: NoFacePolicy,
    /// Consecutive frames with EAR below threshold
    consecutive_below: u32,
    /// Invariant: `is_drowsy == (consecutive_below >= consec_frames)`
    is_drowsy: bool,
}

impl DrowsinessTracker {
    /// Create a tracker in the `Awake` phase.
    ///
    /// `consec_frames` of zero is treated as one.
    pub fn new(ear_threshold: f32, consec_frames: u32, no_face_policy: NoFacePolicy) -> Self {
        Self {
            ear_threshold,
            consec_frames: consec_frames.max(1),
            no_face_policy,
            consecutive_below: 0,
            is_drowsy: false,
        }
    }

    /// Feed one frame. Returns the edge, if `is_drowsy` changed.
    ///
    /// A NaN, infinite or negative EAR is rejected with
    /// [`DmsError::InvalidMetric`] and leaves the state untouched.
    pub fn update(&mut self, observation: Observation) -> Result<Option<AlertEdge>, DmsError> {
        match observation {
            Observation::Ear(ear) => {
                if !ear.is_finite() || ear < 0.0 {
                    warn!("Rejected frame with invalid EAR {}", ear);
                    return Err(DmsError::InvalidMetric(ear));
                }
                if ear < self.ear_threshold {
                    self.consecutive_below = self.consecutive_below.saturating_add(1);
                } else {
                    self.consecutive_below = 0;
                }
            }
            Observation::NoFace => match self.no_face_policy {
                NoFacePolicy::ResetCounter => self.consecutive_below = 0,
                NoFacePolicy::HoldState => {
                    debug!("No face; holding counter at {}", self.consecutive_below);
                    return Ok(None);
                }
            },
        }

        Ok(self.refresh())
    }

    fn refresh(&mut self) -> Option<AlertEdge> {
        let drowsy = self.consecutive_below >= self.consec_frames;
        let edge = match (self.is_drowsy, drowsy) {
            (false, true) => Some(AlertEdge::Entered),
            (true, false) => Some(AlertEdge::Recovered),
            _ => None,
        };
        self.is_drowsy = drowsy;

        match edge {
            Some(AlertEdge::Entered) => info!(
                "Drowsiness detected after {} consecutive closed frames",
                self.consecutive_below
            ),
            Some(AlertEdge::Recovered) => info!("Driver recovered from drowsiness"),
            None => {}
        }
        edge
    }

    pub fn phase(&self) -> DrowsinessPhase {
        if self.is_drowsy {
            DrowsinessPhase::Drowsy
        } else if self.consecutive_below > 0 {
            DrowsinessPhase::Accumulating
        } else {
            DrowsinessPhase::Awake
        }
    }

    pub fn is_drowsy(&self) -> bool {
        self.is_drowsy
    }

    pub fn consecutive_below(&self) -> u32 {
        self.consecutive_below
    }

    pub fn ear_threshold(&self) -> f32 {
        self.ear_threshold
    }

    pub fn consec_frames(&self) -> u32 {
        self.consec_frames
    }

    /// Reset state (session start)
    pub fn reset(&mut self) {
        self.consecutive_below = 0;
        self.is_drowsy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> DrowsinessTracker {
        DrowsinessTracker::new(0.25, 48, NoFacePolicy::ResetCounter)
    }

    fn feed(tracker: &mut DrowsinessTracker, ear: f32, frames: u32) -> Vec<AlertEdge> {
        (0..frames)
            .filter_map(|_| tracker.update(Observation::Ear(ear)).unwrap())
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let t = tracker();
        assert_eq!(t.phase(), DrowsinessPhase::Awake);
        assert!(!t.is_drowsy());
        assert_eq!(t.consecutive_below(), 0);
    }

    #[test]
    fn test_reference_scenario() {
        let mut t = tracker();

        assert!(feed(&mut t, 0.20, 47).is_empty());
        assert!(!t.is_drowsy());
        assert_eq!(t.phase(), DrowsinessPhase::Accumulating);

        assert_eq!(feed(&mut t, 0.20, 1), vec![AlertEdge::Entered]);
        assert!(t.is_drowsy());
        assert_eq!(t.phase(), DrowsinessPhase::Drowsy);

        assert_eq!(feed(&mut t, 0.30, 1), vec![AlertEdge::Recovered]);
        assert_eq!(t.consecutive_below(), 0);
        assert!(!t.is_drowsy());
        assert_eq!(t.phase(), DrowsinessPhase::Awake);
    }

    #[test]
    fn test_one_short_of_threshold_never_drowsy() {
        let mut t = tracker();
        let mut edges = feed(&mut t, 0.10, 47);
        assert!(!t.is_drowsy());

        // recovery frame exactly at the threshold counts as open
        edges.extend(feed(&mut t, 0.25, 1));
        assert!(edges.is_empty());
        assert!(!t.is_drowsy());
        assert_eq!(t.consecutive_below(), 0);

        // a fresh run starts from zero
        feed(&mut t, 0.10, 47);
        assert!(!t.is_drowsy());
    }

    #[test]
    fn test_edge_fires_once() {
        let mut t = tracker();
        let edges = feed(&mut t, 0.10, 96);
        assert_eq!(edges, vec![AlertEdge::Entered]);
        assert_eq!(t.consecutive_below(), 96);
    }

    #[test]
    fn test_invariant_holds_every_frame() {
        let mut t = DrowsinessTracker::new(0.25, 3, NoFacePolicy::ResetCounter);
        let ears = [0.1, 0.1, 0.3, 0.1, 0.1, 0.1, 0.1, 0.2, 0.4, 0.1];
        for ear in ears {
            t.update(Observation::Ear(ear)).unwrap();
            assert_eq!(t.is_drowsy(), t.consecutive_below() >= 3);
        }
    }

    #[test]
    fn test_no_face_resets() {
        let mut t = DrowsinessTracker::new(0.25, 3, NoFacePolicy::ResetCounter);
        feed(&mut t, 0.1, 3);
        assert!(t.is_drowsy());

        let edge = t.update(Observation::NoFace).unwrap();
        assert_eq!(edge, Some(AlertEdge::Recovered));
        assert_eq!(t.consecutive_below(), 0);
    }

    #[test]
    fn test_no_face_holds() {
        let mut t = DrowsinessTracker::new(0.25, 3, NoFacePolicy::HoldState);
        feed(&mut t, 0.1, 2);

        assert_eq!(t.update(Observation::NoFace).unwrap(), None);
        assert_eq!(t.consecutive_below(), 2);

        // the run continues where it left off
        assert_eq!(feed(&mut t, 0.1, 1), vec![AlertEdge::Entered]);

        assert_eq!(t.update(Observation::NoFace).unwrap(), None);
        assert!(t.is_drowsy());
    }

    #[test]
    fn test_invalid_metric_leaves_state_unchanged() {
        let mut t = tracker();
        feed(&mut t, 0.1, 10);

        for bad in [f32::NAN, -0.1, f32::INFINITY] {
            let err = t.update(Observation::Ear(bad)).unwrap_err();
            assert!(matches!(err, DmsError::InvalidMetric(_)));
            assert_eq!(t.consecutive_below(), 10);
            assert_eq!(t.phase(), DrowsinessPhase::Accumulating);
        }
    }

    #[test]
    fn test_reset() {
        let mut t = DrowsinessTracker::new(0.25, 2, NoFacePolicy::ResetCounter);
        feed(&mut t, 0.1, 5);
        t.reset();
        assert_eq!(t.phase(), DrowsinessPhase::Awake);
    }
}
