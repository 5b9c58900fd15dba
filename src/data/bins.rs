//! Binned data containers: channel spectra, light curves and spectrograms.

use crate::data::Ebounds;
use crate::error::{GscError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(GscError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// A count spectrum over energy (or channel) bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBins {
    /// Counts per bin. Folded spectra carry expected (non-integer) counts.
    pub counts: Vec<f64>,
    pub lo_edges: Vec<f64>,
    pub hi_edges: Vec<f64>,
    /// Live exposure per bin in seconds.
    pub exposure: Vec<f64>,
}

impl EnergyBins {
    pub fn new(
        counts: Vec<f64>,
        lo_edges: Vec<f64>,
        hi_edges: Vec<f64>,
        exposure: Vec<f64>,
    ) -> Result<Self> {
        check_len(counts.len(), lo_edges.len())?;
        check_len(counts.len(), hi_edges.len())?;
        check_len(counts.len(), exposure.len())?;
        Ok(Self {
            counts,
            lo_edges,
            hi_edges,
            exposure,
        })
    }

    /// Zero-count bins laid out on a calibration.
    pub fn from_ebounds(ebounds: &Ebounds) -> Self {
        let n = ebounds.num_intervals();
        Self {
            counts: vec![0.0; n],
            lo_edges: ebounds.low_edges().to_vec(),
            hi_edges: ebounds.high_edges().to_vec(),
            exposure: vec![0.0; n],
        }
    }

    /// Number of bins.
    #[inline]
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    pub fn widths(&self) -> Vec<f64> {
        self.lo_edges
            .iter()
            .zip(&self.hi_edges)
            .map(|(lo, hi)| hi - lo)
            .collect()
    }

    pub fn centroids(&self) -> Vec<f64> {
        self.lo_edges
            .iter()
            .zip(&self.hi_edges)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    pub fn total_counts(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Count rate per bin; zero where the exposure is zero.
    pub fn rates(&self) -> Vec<f64> {
        self.counts
            .iter()
            .zip(&self.exposure)
            .map(|(&c, &e)| if e > 0.0 { c / e } else { 0.0 })
            .collect()
    }

    /// Poisson uncertainty of the rate per bin.
    pub fn rate_uncertainty(&self) -> Vec<f64> {
        self.counts
            .iter()
            .zip(&self.exposure)
            .map(|(&c, &e)| if e > 0.0 { c.sqrt() / e } else { 0.0 })
            .collect()
    }

    /// Derive a calibration from the bin edges.
    pub fn to_ebounds(&self) -> Result<Ebounds> {
        Ebounds::new(self.lo_edges.clone(), self.hi_edges.clone())
    }

    /// Rebin with a channel combination strategy.
    pub fn rebin<C>(&self, combiner: C, factor: usize) -> Result<Self>
    where
        C: crate::binning::ChannelCombiner,
    {
        combiner.combine(self, factor)
    }
}

/// A light curve: counts in contiguous time bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBins {
    pub counts: Vec<f64>,
    pub lo_edges: Vec<f64>,
    pub hi_edges: Vec<f64>,
    pub exposure: Vec<f64>,
}

impl TimeBins {
    pub fn new(
        counts: Vec<f64>,
        lo_edges: Vec<f64>,
        hi_edges: Vec<f64>,
        exposure: Vec<f64>,
    ) -> Result<Self> {
        check_len(counts.len(), lo_edges.len())?;
        check_len(counts.len(), hi_edges.len())?;
        check_len(counts.len(), exposure.len())?;
        Ok(Self {
            counts,
            lo_edges,
            hi_edges,
            exposure,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    pub fn rates(&self) -> Vec<f64> {
        self.counts
            .iter()
            .zip(&self.exposure)
            .map(|(&c, &e)| if e > 0.0 { c / e } else { 0.0 })
            .collect()
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.lo_edges.first()?, *self.hi_edges.last()?))
    }
}

/// A spectrogram: counts in (time bin × channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEnergyBins {
    /// Counts, rows are time bins, columns are channels.
    pub counts: DMatrix<u64>,
    pub tstart: Vec<f64>,
    pub tstop: Vec<f64>,
    /// Live exposure per time bin and channel.
    pub exposure: DMatrix<f64>,
    pub emin: Vec<f64>,
    pub emax: Vec<f64>,
}

impl TimeEnergyBins {
    pub fn new(
        counts: DMatrix<u64>,
        tstart: Vec<f64>,
        tstop: Vec<f64>,
        exposure: DMatrix<f64>,
        emin: Vec<f64>,
        emax: Vec<f64>,
    ) -> Result<Self> {
        let (n_times, n_chans) = counts.shape();
        check_len(n_times, tstart.len())?;
        check_len(n_times, tstop.len())?;
        check_len(n_chans, emin.len())?;
        check_len(n_chans, emax.len())?;
        check_len(n_times, exposure.nrows())?;
        check_len(n_chans, exposure.ncols())?;
        Ok(Self {
            counts,
            tstart,
            tstop,
            exposure,
            emin,
            emax,
        })
    }

    #[inline]
    pub fn num_times(&self) -> usize {
        self.counts.nrows()
    }

    #[inline]
    pub fn num_chans(&self) -> usize {
        self.counts.ncols()
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.tstart.first()?, *self.tstop.last()?))
    }

    pub fn total_counts(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum over channels `chan_min..=chan_max` into a light curve.
    ///
    /// The exposure of each time bin is its duration minus the dead time
    /// accumulated by events in the selected channels.
    pub fn integrate_energy(&self, chan_min: usize, chan_max: usize) -> Result<TimeBins> {
        let (cmin, cmax) = self.check_chans(chan_min, chan_max)?;
        let mut counts = Vec::with_capacity(self.num_times());
        let mut exposure = Vec::with_capacity(self.num_times());
        for t in 0..self.num_times() {
            let duration = self.tstop[t] - self.tstart[t];
            let mut total = 0u64;
            let mut dead = 0.0;
            for c in cmin..=cmax {
                total += self.counts[(t, c)];
                dead += duration - self.exposure[(t, c)];
            }
            counts.push(total as f64);
            exposure.push((duration - dead).max(0.0));
        }
        TimeBins::new(counts, self.tstart.clone(), self.tstop.clone(), exposure)
    }

    /// Sum over the time bins that overlap `[tmin, tmax]` into a spectrum.
    pub fn integrate_time(&self, tmin: f64, tmax: f64) -> Result<EnergyBins> {
        let rows: Vec<usize> = (0..self.num_times())
            .filter(|&t| self.tstop[t] > tmin && self.tstart[t] <= tmax)
            .collect();
        if rows.is_empty() {
            return Err(GscError::EmptyData(format!(
                "No time bins overlap [{}, {}]",
                tmin, tmax
            )));
        }
        let counts = (0..self.num_chans())
            .map(|c| rows.iter().map(|&t| self.counts[(t, c)]).sum::<u64>() as f64)
            .collect();
        let exposure = (0..self.num_chans())
            .map(|c| rows.iter().map(|&t| self.exposure[(t, c)]).sum())
            .collect();
        EnergyBins::new(counts, self.emin.clone(), self.emax.clone(), exposure)
    }

    fn check_chans(&self, chan_min: usize, chan_max: usize) -> Result<(usize, usize)> {
        if chan_min > chan_max || chan_max >= self.num_chans() {
            return Err(GscError::InvalidArgument(format!(
                "Channel range ({}, {}) outside 0..{}",
                chan_min,
                chan_max,
                self.num_chans()
            )));
        }
        Ok((chan_min, chan_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spectrogram() -> TimeEnergyBins {
        // 2 time bins × 3 channels, 10 s each
        let counts = DMatrix::from_row_slice(2, 3, &[1, 2, 3, 4, 5, 6]);
        let exposure = DMatrix::from_row_slice(2, 3, &[9.9, 9.8, 9.7, 9.6, 9.5, 9.4]);
        TimeEnergyBins::new(
            counts,
            vec![0.0, 10.0],
            vec![10.0, 20.0],
            exposure,
            vec![1.0, 2.0, 3.0],
            vec![2.0, 3.0, 4.0],
        )
        .unwrap()
    }

    #[test]
    fn test_energy_bins_rates() {
        let bins = EnergyBins::new(
            vec![10.0, 0.0, 4.0],
            vec![1.0, 2.0, 3.0],
            vec![2.0, 3.0, 4.0],
            vec![2.0, 2.0, 0.0],
        )
        .unwrap();
        assert_eq!(bins.size(), 3);
        assert_eq!(bins.rates(), vec![5.0, 0.0, 0.0]);
        assert_eq!(bins.centroids(), vec![1.5, 2.5, 3.5]);
        assert_eq!(bins.total_counts(), 14.0);
        assert_relative_eq!(bins.rate_uncertainty()[0], 10f64.sqrt() / 2.0);
    }

    #[test]
    fn test_energy_bins_length_check() {
        let result = EnergyBins::new(vec![1.0], vec![1.0, 2.0], vec![2.0], vec![1.0]);
        assert!(matches!(result, Err(GscError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_integrate_energy() {
        let bins = spectrogram();
        let lc = bins.integrate_energy(0, 2).unwrap();
        assert_eq!(lc.counts, vec![6.0, 15.0]);
        assert_relative_eq!(lc.exposure[0], 10.0 - (0.1 + 0.2 + 0.3), epsilon = 1e-12);

        let lc = bins.integrate_energy(1, 1).unwrap();
        assert_eq!(lc.counts, vec![2.0, 5.0]);
        assert_relative_eq!(lc.exposure[1], 9.5, epsilon = 1e-12);

        assert!(bins.integrate_energy(2, 3).is_err());
        assert!(bins.integrate_energy(2, 1).is_err());
    }

    #[test]
    fn test_integrate_time() {
        let bins = spectrogram();
        let spec = bins.integrate_time(0.0, 20.0).unwrap();
        assert_eq!(spec.counts, vec![5.0, 7.0, 9.0]);
        assert_relative_eq!(spec.exposure[0], 19.5, epsilon = 1e-12);

        let spec = bins.integrate_time(12.0, 15.0).unwrap();
        assert_eq!(spec.counts, vec![4.0, 5.0, 6.0]);

        assert!(bins.integrate_time(30.0, 40.0).is_err());
    }
}
