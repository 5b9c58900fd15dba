//! Combined detector response (RSP): redistribution scaled by effective area.
//!
//! A [`CombinedResponse`] maps a photon spectrum onto detector channels.
//! Transforms return new responses:
//!
//! - [`CombinedResponse::rebin`] merges adjacent channels,
//! - [`CombinedResponse::resample`] changes the photon energy grid while
//!   conserving each channel's integral over photon energy,
//! - [`CombinedResponse::fold_spectrum`] turns a photon model into
//!   predicted counts.

use crate::data::{EnergyBins, Ebounds};
use crate::detectors::Detector;
use crate::error::{GscError, Result};
use crate::response::rmf::check_photon_axis;
use crate::spectra::SpectralModel;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// A response matrix scaled by effective area (photon bins × channels).
#[derive(Debug, Clone)]
pub struct CombinedResponse {
    drm: DMatrix<f64>,
    photon_lo: Vec<f64>,
    photon_hi: Vec<f64>,
    ebounds: Ebounds,
    detector: Detector,
    tstart: f64,
    tstop: f64,
    trigtime: Option<f64>,
    filename: Option<String>,
}

impl CombinedResponse {
    pub fn new(
        drm: DMatrix<f64>,
        photon_lo: Vec<f64>,
        photon_hi: Vec<f64>,
        ebounds: Ebounds,
        detector: Detector,
    ) -> Result<Self> {
        let (nrows, ncols) = drm.shape();
        if photon_lo.len() != nrows || photon_hi.len() != nrows {
            return Err(GscError::DimensionMismatch {
                expected: nrows,
                actual: photon_lo.len().min(photon_hi.len()),
            });
        }
        if ebounds.num_intervals() != ncols {
            return Err(GscError::DimensionMismatch {
                expected: ncols,
                actual: ebounds.num_intervals(),
            });
        }
        check_photon_axis(&photon_lo, &photon_hi)?;

        Ok(Self {
            drm,
            photon_lo,
            photon_hi,
            ebounds,
            detector,
            tstart: 0.0,
            tstop: 0.0,
            trigtime: None,
            filename: None,
        })
    }

    /// Associate the response with an observation segment.
    pub fn with_times(mut self, tstart: f64, tstop: f64, trigtime: Option<f64>) -> Self {
        self.tstart = tstart;
        self.tstop = tstop;
        self.trigtime = trigtime;
        self
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    #[inline]
    pub fn num_chans(&self) -> usize {
        self.drm.ncols()
    }

    #[inline]
    pub fn num_ebins(&self) -> usize {
        self.drm.nrows()
    }

    #[inline]
    pub fn detector(&self) -> Detector {
        self.detector
    }

    #[inline]
    pub fn drm(&self) -> &DMatrix<f64> {
        &self.drm
    }

    #[inline]
    pub fn ebounds(&self) -> &Ebounds {
        &self.ebounds
    }

    pub fn photon_bins(&self) -> (&[f64], &[f64]) {
        (&self.photon_lo, &self.photon_hi)
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    #[inline]
    pub fn tstart(&self) -> f64 {
        self.tstart
    }

    #[inline]
    pub fn tstop(&self) -> f64 {
        self.tstop
    }

    /// Midpoint of the associated segment.
    #[inline]
    pub fn tcent(&self) -> f64 {
        0.5 * (self.tstart + self.tstop)
    }

    #[inline]
    pub fn trigtime(&self) -> Option<f64> {
        self.trigtime
    }

    pub fn photon_centroids(&self) -> Vec<f64> {
        self.photon_lo
            .iter()
            .zip(&self.photon_hi)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    pub fn photon_widths(&self) -> Vec<f64> {
        self.photon_lo
            .iter()
            .zip(&self.photon_hi)
            .map(|(lo, hi)| hi - lo)
            .collect()
    }

    /// Effective area per photon bin, summed over channels.
    pub fn photon_effective_area(&self) -> Vec<f64> {
        self.drm.row_iter().map(|row| row.sum()).collect()
    }

    /// Effective area per channel, summed over photon bins.
    pub fn channel_effective_area(&self) -> Vec<f64> {
        self.drm.column_iter().map(|col| col.sum()).collect()
    }

    /// Merge each group of `factor` adjacent channels.
    ///
    /// Probabilities are summed within a group and the calibration is merged
    /// the same way. Trailing channels that do not fill a group are dropped;
    /// the photon axis is untouched.
    pub fn rebin(&self, factor: usize) -> Result<Self> {
        if factor == 0 {
            return Err(GscError::InvalidArgument(
                "Rebin factor must be at least 1".to_string(),
            ));
        }
        let ebounds = self.ebounds.rebin(factor)?;
        let n_new = ebounds.num_intervals();

        let drm = DMatrix::from_fn(self.num_ebins(), n_new, |i, j| {
            (j * factor..(j + 1) * factor)
                .map(|c| self.drm[(i, c)])
                .sum()
        });
        log::debug!(
            "Rebinned {} response by {}: {} -> {} channels",
            self.detector,
            factor,
            self.num_chans(),
            n_new
        );

        Ok(Self {
            drm,
            photon_lo: self.photon_lo.clone(),
            photon_hi: self.photon_hi.clone(),
            ebounds,
            detector: self.detector,
            tstart: self.tstart,
            tstop: self.tstop,
            trigtime: self.trigtime,
            filename: self.filename.clone(),
        })
    }

    /// Resample onto `num_photon_bins` photon bins spanning the same range.
    ///
    /// New edges are log-spaced when the lowest edge is positive and linearly
    /// spaced otherwise. Each new row is the overlap-weighted average of the
    /// old rows it covers, `R'[j,c] = Σ_i R[i,c] |i ∩ j| / ΔE'_j`, which keeps
    /// `Σ R[·,c] ΔE` unchanged for every channel.
    pub fn resample(&self, num_photon_bins: usize) -> Result<Self> {
        if num_photon_bins == 0 {
            return Err(GscError::InvalidArgument(
                "Number of photon bins must be at least 1".to_string(),
            ));
        }
        let e_min = self.photon_lo[0];
        let e_max = self.photon_hi[self.num_ebins() - 1];
        let edges = photon_grid(e_min, e_max, num_photon_bins);

        let mut drm: DMatrix<f64> = DMatrix::zeros(num_photon_bins, self.num_chans());
        for (j, i, overlap) in overlaps(&edges, &self.photon_lo, &self.photon_hi) {
            let weight = overlap / (edges[j + 1] - edges[j]);
            let source = self.drm.row(i) * weight;
            let mut target = drm.row_mut(j);
            target += source;
        }
        log::debug!(
            "Resampled {} response: {} -> {} photon bins over [{}, {}] keV",
            self.detector,
            self.num_ebins(),
            num_photon_bins,
            e_min,
            e_max
        );

        Ok(Self {
            drm,
            photon_lo: edges[..num_photon_bins].to_vec(),
            photon_hi: edges[1..].to_vec(),
            ebounds: self.ebounds.clone(),
            detector: self.detector,
            tstart: self.tstart,
            tstop: self.tstop,
            trigtime: self.trigtime,
            filename: self.filename.clone(),
        })
    }

    /// Fold a photon model through the response.
    ///
    /// Uses the midpoint rule per photon bin:
    /// `rate_c = Σ_i model(params, Ē_i) · R[i,c] · ΔE_i`, then
    /// `counts_c = rate_c · exposure`. The result is laid out on this
    /// response's channel calibration, every channel carrying `exposure`.
    pub fn fold_spectrum<M>(&self, model: &M, params: &[f64], exposure: f64) -> Result<EnergyBins>
    where
        M: SpectralModel + ?Sized,
    {
        if !(exposure >= 0.0) {
            return Err(GscError::InvalidArgument(format!(
                "Exposure must be non-negative, got {}",
                exposure
            )));
        }
        if let Some(expected) = model.num_params() {
            if params.len() != expected {
                return Err(GscError::InvalidArgument(format!(
                    "Model expects {} parameters, got {}",
                    expected,
                    params.len()
                )));
            }
        }

        let photon_flux = DVector::from_iterator(
            self.num_ebins(),
            self.photon_centroids()
                .into_iter()
                .zip(self.photon_widths())
                .map(|(e, de)| model.eval(params, e) * de),
        );

        let counts: Vec<f64> = (0..self.num_chans())
            .into_par_iter()
            .map(|c| self.drm.column(c).dot(&photon_flux) * exposure)
            .collect();

        EnergyBins::new(
            counts,
            self.ebounds.low_edges().to_vec(),
            self.ebounds.high_edges().to_vec(),
            vec![exposure; self.num_chans()],
        )
    }
}

/// `n + 1` edges over `[e_min, e_max]`, log-spaced when `e_min > 0`.
fn photon_grid(e_min: f64, e_max: f64, n: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = if e_min > 0.0 {
        let (log_lo, log_hi) = (e_min.ln(), e_max.ln());
        (0..=n)
            .map(|k| (log_lo + (log_hi - log_lo) * k as f64 / n as f64).exp())
            .collect()
    } else {
        (0..=n)
            .map(|k| e_min + (e_max - e_min) * k as f64 / n as f64)
            .collect()
    };
    // pin the ends so no mass is lost to rounding in exp/ln
    edges[0] = e_min;
    edges[n] = e_max;
    edges
}

/// `(new bin, old bin, overlap width)` for every overlapping pair.
///
/// Both axes are ascending, so a single sweep finds all pairs.
fn overlaps(new_edges: &[f64], old_lo: &[f64], old_hi: &[f64]) -> Vec<(usize, usize, f64)> {
    let n_new = new_edges.len() - 1;
    let mut pairs = Vec::with_capacity(n_new + old_lo.len());
    let (mut j, mut i) = (0, 0);
    while j < n_new && i < old_lo.len() {
        let lo = new_edges[j].max(old_lo[i]);
        let hi = new_edges[j + 1].min(old_hi[i]);
        if hi > lo {
            pairs.push((j, i, hi - lo));
        }
        if new_edges[j + 1] < old_hi[i] {
            j += 1;
        } else {
            i += 1;
        }
    }
    pairs
}
