//! Strategies that bin unbinned arrival times.

use crate::error::{GscError, Result};

/// Partitions ordered arrival times into contiguous bins.
///
/// Returns the `n + 1` edges of `n` bins. Every time passed in must fall
/// inside `[edges[0], edges[n]]`.
pub trait TimeBinner {
    fn bin_edges(&self, times: &[f64], bin_width: f64) -> Result<Vec<f64>>;
}

impl<F> TimeBinner for F
where
    F: Fn(&[f64], f64) -> Result<Vec<f64>>,
{
    fn bin_edges(&self, times: &[f64], bin_width: f64) -> Result<Vec<f64>> {
        self(times, bin_width)
    }
}

/// Fixed-width bins starting at the first arrival time.
///
/// Produces `ceil((t_last - t_first) / dt)` bins (at least one); the last
/// bin reaches past `t_last` unless the span is an exact multiple of `dt`.
pub fn bin_by_time(times: &[f64], dt: f64) -> Result<Vec<f64>> {
    if !(dt > 0.0) {
        return Err(GscError::InvalidArgument(format!(
            "Bin width must be positive, got {}",
            dt
        )));
    }
    let (t0, t1) = match (times.first(), times.last()) {
        (Some(&t0), Some(&t1)) => (t0, t1),
        _ => return Err(GscError::EmptyData("No arrival times to bin".to_string())),
    };
    let num_bins = (((t1 - t0) / dt).ceil() as usize).max(1);
    Ok((0..=num_bins).map(|k| t0 + k as f64 * dt).collect())
}
