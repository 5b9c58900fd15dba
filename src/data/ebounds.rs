//! Channel-to-energy calibration.

use crate::error::{GscError, Result};
use serde::{Deserialize, Serialize};

/// Ordered channel energy intervals `[lo, hi)` in keV.
///
/// Intervals are strictly increasing and non-overlapping; interval `i`
/// belongs to channel `i`. The calibration never changes after construction,
/// transforms return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ebounds {
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl Ebounds {
    /// Create a calibration from per-channel lower and upper edges.
    pub fn new(lo: Vec<f64>, hi: Vec<f64>) -> Result<Self> {
        if lo.len() != hi.len() {
            return Err(GscError::DimensionMismatch {
                expected: lo.len(),
                actual: hi.len(),
            });
        }
        for (i, (&l, &h)) in lo.iter().zip(hi.iter()).enumerate() {
            if !(l < h) {
                return Err(GscError::InvalidArgument(format!(
                    "Channel {} has an empty or inverted interval [{}, {})",
                    i, l, h
                )));
            }
            if i > 0 && l < hi[i - 1] {
                return Err(GscError::InvalidArgument(format!(
                    "Channel {} starts at {} before channel {} ends at {}",
                    i,
                    l,
                    i - 1,
                    hi[i - 1]
                )));
            }
        }
        Ok(Self { lo, hi })
    }

    /// Create a contiguous calibration from `N + 1` edges.
    pub fn from_edges(edges: &[f64]) -> Result<Self> {
        if edges.len() < 2 {
            return Err(GscError::EmptyData(
                "At least two edges are needed for one channel".to_string(),
            ));
        }
        Self::new(edges[..edges.len() - 1].to_vec(), edges[1..].to_vec())
    }

    /// Number of channel intervals.
    #[inline]
    pub fn num_intervals(&self) -> usize {
        self.lo.len()
    }

    #[inline]
    pub fn low_edges(&self) -> &[f64] {
        &self.lo
    }

    #[inline]
    pub fn high_edges(&self) -> &[f64] {
        &self.hi
    }

    /// Energy interval of a channel.
    pub fn interval(&self, channel: usize) -> Option<(f64, f64)> {
        Some((*self.lo.get(channel)?, *self.hi.get(channel)?))
    }

    /// Full energy range covered, `None` when there are no channels.
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((*self.lo.first()?, *self.hi.last()?))
    }

    /// Channel whose interval contains `energy`.
    pub fn channel_for_energy(&self, energy: f64) -> Option<usize> {
        let idx = self.hi.partition_point(|&h| h <= energy);
        (idx < self.num_intervals() && self.lo[idx] <= energy).then_some(idx)
    }

    /// Merge contiguous groups of `factor` channels.
    ///
    /// Group `j` spans `[lo[j*f], hi[(j+1)*f - 1]]`. The `N mod f` trailing
    /// channels that do not fill a group are dropped.
    pub fn rebin(&self, factor: usize) -> Result<Self> {
        if factor == 0 {
            return Err(GscError::InvalidArgument(
                "Rebin factor must be at least 1".to_string(),
            ));
        }
        let n_new = self.num_intervals() / factor;
        let lo = (0..n_new).map(|j| self.lo[j * factor]).collect();
        let hi = (0..n_new).map(|j| self.hi[(j + 1) * factor - 1]).collect();
        Ok(Self { lo, hi })
    }
}
