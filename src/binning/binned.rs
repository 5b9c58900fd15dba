//! Strategies that combine already-binned data.

use crate::data::EnergyBins;
use crate::error::{GscError, Result};

/// Merges adjacent bins of an [`EnergyBins`] by an integer factor.
pub trait ChannelCombiner {
    fn combine(&self, bins: &EnergyBins, factor: usize) -> Result<EnergyBins>;
}

impl<F> ChannelCombiner for F
where
    F: Fn(&EnergyBins, usize) -> Result<EnergyBins>,
{
    fn combine(&self, bins: &EnergyBins, factor: usize) -> Result<EnergyBins> {
        self(bins, factor)
    }
}

/// Combine each group of `factor` consecutive bins into one.
///
/// Counts are summed, the exposure is the group mean, and the merged bin
/// spans the lowest lower edge to the highest upper edge of the group.
/// Trailing bins that do not fill a whole group are dropped.
pub fn combine_by_factor(bins: &EnergyBins, factor: usize) -> Result<EnergyBins> {
    if factor == 0 {
        return Err(GscError::InvalidArgument(
            "Combine factor must be at least 1".to_string(),
        ));
    }
    let n_new = bins.size() / factor;
    let mut counts = Vec::with_capacity(n_new);
    let mut lo_edges = Vec::with_capacity(n_new);
    let mut hi_edges = Vec::with_capacity(n_new);
    let mut exposure = Vec::with_capacity(n_new);

    for j in 0..n_new {
        let group = j * factor..(j + 1) * factor;
        counts.push(bins.counts[group.clone()].iter().sum());
        exposure.push(bins.exposure[group.clone()].iter().sum::<f64>() / factor as f64);
        lo_edges.push(bins.lo_edges[group.start]);
        hi_edges.push(bins.hi_edges[group.end - 1]);
    }

    EnergyBins::new(counts, lo_edges, hi_edges, exposure)
}
