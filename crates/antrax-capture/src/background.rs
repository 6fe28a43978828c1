//! Periodically refreshed background reference.

use tracing::debug;

use crate::sample::FrameSample;

/// Reference frame standing in for "no person present".
///
/// Snapshotted at a coarse cadence and invalidated whenever the rotation
/// or the camera changes, since it is only valid for the geometry it was
/// captured in.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    interval: u64,
    offset: u64,
    reference: Option<FrameSample>,
}

impl BackgroundModel {
    pub fn new(interval: u64, offset: u64) -> Self {
        Self {
            interval: interval.max(1),
            offset,
            reference: None,
        }
    }

    /// Take a snapshot when `cycle` falls on the refresh cadence.
    ///
    /// Returns `true` when the reference was replaced.
    pub fn observe(&mut self, cycle: u64, sample: &FrameSample) -> bool {
        if cycle % self.interval != self.offset % self.interval {
            return false;
        }
        debug!(cycle, "Refreshing background model");
        self.reference = Some(sample.clone());
        true
    }

    pub fn reference(&self) -> Option<&FrameSample> {
        self.reference.as_ref()
    }

    /// Drop the reference; the previous sample stands in until the next snapshot.
    pub fn invalidate(&mut self) {
        self.reference = None;
    }
}
