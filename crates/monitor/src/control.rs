//! Between-frame control input

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What the session should do after the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    /// Persist the current window (on-request dataset mode)
    SaveSnapshot,
    Stop,
}

/// Polled once per frame, never mid-frame
pub trait ControlInput {
    fn poll(&mut self) -> Command;
}

impl<C: ControlInput + ?Sized> ControlInput for &mut C {
    fn poll(&mut self) -> Command {
        (**self).poll()
    }
}

/// Shared stop request, raised from another thread (e.g. a Ctrl-C handler)
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ControlInput for StopFlag {
    fn poll(&mut self) -> Command {
        if self.is_stopped() {
            Command::Stop
        } else {
            Command::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag_shared_between_clones() {
        let mut flag = StopFlag::new();
        let handle = flag.clone();
        assert_eq!(flag.poll(), Command::Continue);

        std::thread::spawn(move || handle.request_stop())
            .join()
            .unwrap();

        assert!(flag.is_stopped());
        assert_eq!(flag.poll(), Command::Stop);
    }
}
