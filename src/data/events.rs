//! Columnar storage for time-tagged photon events.

use crate::error::{GscError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Time-ordered event records.
///
/// Stored as parallel columns (arrival time, PI channel, validity flag) so
/// that slicing by time is a binary search and histogramming walks a single
/// contiguous array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventList {
    times: Vec<f64>,
    channels: Vec<u32>,
    valid: Vec<bool>,
}

impl EventList {
    /// Create an event list. Times must be non-decreasing.
    pub fn new(times: Vec<f64>, channels: Vec<u32>, valid: Vec<bool>) -> Result<Self> {
        if channels.len() != times.len() {
            return Err(GscError::DimensionMismatch {
                expected: times.len(),
                actual: channels.len(),
            });
        }
        if valid.len() != times.len() {
            return Err(GscError::DimensionMismatch {
                expected: times.len(),
                actual: valid.len(),
            });
        }
        if let Some(i) = times.windows(2).position(|w| !(w[0] <= w[1])) {
            return Err(GscError::InvalidArgument(format!(
                "Event times must be ordered: event {} at {} follows {}",
                i + 1,
                times[i + 1],
                times[i]
            )));
        }
        Ok(Self {
            times,
            channels,
            valid,
        })
    }

    /// Create an event list where every event is valid.
    pub fn from_times_channels(times: Vec<f64>, channels: Vec<u32>) -> Result<Self> {
        let valid = vec![true; times.len()];
        Self::new(times, channels, valid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    #[inline]
    pub fn valid(&self) -> &[bool] {
        &self.valid
    }

    /// Number of events with the validity flag set.
    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// `(first, last)` arrival time.
    pub fn time_range(&self) -> Result<(f64, f64)> {
        match (self.times.first(), self.times.last()) {
            (Some(&t0), Some(&t1)) => Ok((t0, t1)),
            _ => Err(GscError::EmptyData(
                "Time range of an empty event list".to_string(),
            )),
        }
    }

    /// `(min, max)` channel, `None` for an empty list.
    pub fn channel_range(&self) -> Option<(u32, u32)> {
        let min = *self.channels.iter().min()?;
        let max = *self.channels.iter().max()?;
        Some((min, max))
    }

    /// Index range of events with `tmin <= time <= tmax`.
    pub fn time_slice_bounds(&self, tmin: f64, tmax: f64) -> (usize, usize) {
        let start = self.times.partition_point(|&t| t < tmin);
        let stop = self.times.partition_point(|&t| t <= tmax);
        (start, stop.max(start))
    }

    /// Events with `tmin <= time <= tmax`.
    pub fn slice_time(&self, tmin: f64, tmax: f64) -> Self {
        let (start, stop) = self.time_slice_bounds(tmin, tmax);
        Self {
            times: self.times[start..stop].to_vec(),
            channels: self.channels[start..stop].to_vec(),
            valid: self.valid[start..stop].to_vec(),
        }
    }

    /// Events with `chan_min <= channel <= chan_max`, order preserved.
    pub fn slice_channels(&self, chan_min: u32, chan_max: u32) -> Self {
        self.filter_map_channels(|c| (chan_min..=chan_max).contains(&c).then_some(c))
    }

    /// Keep events for which `f` returns a new channel, dropping the rest.
    pub fn filter_map_channels<F>(&self, f: F) -> Self
    where
        F: Fn(u32) -> Option<u32> + Sync,
    {
        let kept: Vec<(f64, u32, bool)> = (0..self.len())
            .into_par_iter()
            .filter_map(|i| f(self.channels[i]).map(|c| (self.times[i], c, self.valid[i])))
            .collect();

        let mut out = Self {
            times: Vec::with_capacity(kept.len()),
            channels: Vec::with_capacity(kept.len()),
            valid: Vec::with_capacity(kept.len()),
        };
        for (t, c, v) in kept {
            out.times.push(t);
            out.channels.push(c);
            out.valid.push(v);
        }
        out
    }

    /// Histogram of valid events over channels `0..num_chans`.
    ///
    /// Events with a channel at or above `num_chans` are not counted.
    pub fn channel_histogram(&self, num_chans: usize) -> Vec<u64> {
        histogram(&self.channels, &self.valid, num_chans)
    }

    /// Histogram of the valid events in the index range `start..stop`.
    pub fn channel_histogram_range(&self, start: usize, stop: usize, num_chans: usize) -> Vec<u64> {
        histogram(&self.channels[start..stop], &self.valid[start..stop], num_chans)
    }
}

fn histogram(channels: &[u32], valid: &[bool], num_chans: usize) -> Vec<u64> {
    let mut counts = vec![0u64; num_chans];
    for (&c, &ok) in channels.iter().zip(valid) {
        if ok {
            if let Some(slot) = counts.get_mut(c as usize) {
                *slot += 1;
            }
        }
    }
    counts
}
