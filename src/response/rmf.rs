//! Energy redistribution matrices (RMF).

use crate::data::Ebounds;
use crate::detectors::Detector;
use crate::error::{GscError, Result};
use crate::response::arf::EffectiveAreaCurve;
use crate::response::rsp::CombinedResponse;
use nalgebra::DMatrix;

/// Redistribution probabilities, photon energy bins (rows) × channels (columns).
#[derive(Debug, Clone)]
pub struct ResponseMatrix {
    /// Probabilities (num_ebins × num_chans)
    matrix: DMatrix<f64>,
    /// Photon bin lower edges (keV)
    photon_lo: Vec<f64>,
    /// Photon bin upper edges (keV)
    photon_hi: Vec<f64>,
    /// Channel calibration
    ebounds: Ebounds,
    detector: Detector,
    /// High-voltage setting the matrix was measured at
    mode: u32,
    filename: Option<String>,
}

impl ResponseMatrix {
    pub fn new(
        matrix: DMatrix<f64>,
        photon_lo: Vec<f64>,
        photon_hi: Vec<f64>,
        ebounds: Ebounds,
        detector: Detector,
        mode: u32,
    ) -> Result<Self> {
        let (nrows, ncols) = matrix.shape();
        if photon_lo.len() != nrows {
            return Err(GscError::DimensionMismatch {
                expected: nrows,
                actual: photon_lo.len(),
            });
        }
        if photon_hi.len() != nrows {
            return Err(GscError::DimensionMismatch {
                expected: nrows,
                actual: photon_hi.len(),
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
            matrix,
            photon_lo,
            photon_hi,
            ebounds,
            detector,
            mode,
            filename: None,
        })
    }

    /// Create from `num_ebins + 1` contiguous photon edges.
    pub fn from_photon_edges(
        matrix: DMatrix<f64>,
        photon_edges: &[f64],
        ebounds: Ebounds,
        detector: Detector,
        mode: u32,
    ) -> Result<Self> {
        if photon_edges.len() < 2 {
            return Err(GscError::EmptyData(
                "Photon axis needs at least two edges".to_string(),
            ));
        }
        let n = photon_edges.len() - 1;
        Self::new(
            matrix,
            photon_edges[..n].to_vec(),
            photon_edges[1..].to_vec(),
            ebounds,
            detector,
            mode,
        )
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    #[inline]
    pub fn num_ebins(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub fn num_chans(&self) -> usize {
        self.matrix.ncols()
    }

    #[inline]
    pub fn detector(&self) -> Detector {
        self.detector
    }

    #[inline]
    pub fn mode(&self) -> u32 {
        self.mode
    }

    #[inline]
    pub fn ebounds(&self) -> &Ebounds {
        &self.ebounds
    }

    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn photon_bins(&self) -> (&[f64], &[f64]) {
        (&self.photon_lo, &self.photon_hi)
    }

    pub fn photon_centroids(&self) -> Vec<f64> {
        self.photon_lo
            .iter()
            .zip(&self.photon_hi)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    /// Scale every photon row by the effective area at that photon energy.
    ///
    /// The area curve matching this matrix's voltage setting is sampled at
    /// each photon bin centroid. Fails when the curve belongs to a different
    /// detector, lacks this voltage setting, or does not cover the matrix's
    /// photon axis to within one curve bin on either side.
    pub fn apply_arf(&self, arf: &EffectiveAreaCurve) -> Result<CombinedResponse> {
        if arf.detector() != self.detector {
            return Err(GscError::DetectorMismatch {
                expected: self.detector,
                actual: arf.detector(),
            });
        }
        let curve = arf.get_arf(self.mode)?;

        let tolerance = curve.max_bin_width();
        let (curve_lo, curve_hi) = curve.range();
        let matrix_lo = self.photon_lo[0];
        let matrix_hi = self.photon_hi[self.num_ebins() - 1];
        if matrix_lo < curve_lo - tolerance || matrix_hi > curve_hi + tolerance {
            return Err(GscError::EdgeMismatch(format!(
                "Response photon axis [{}, {}] is not covered by the area curve [{}, {}]",
                matrix_lo, matrix_hi, curve_lo, curve_hi
            )));
        }

        let area = curve.sample_many(&self.photon_centroids());
        let mut combined = self.matrix.clone();
        for (i, mut row) in combined.row_iter_mut().enumerate() {
            row *= area[i];
        }
        log::debug!(
            "Applied HV{} area curve to {} response ({} × {})",
            self.mode,
            self.detector,
            self.num_ebins(),
            self.num_chans()
        );

        let mut rsp = CombinedResponse::new(
            combined,
            self.photon_lo.clone(),
            self.photon_hi.clone(),
            self.ebounds.clone(),
            self.detector,
        )?;
        if let Some(name) = &self.filename {
            rsp = rsp.with_filename(&rsp_filename(name));
        }
        Ok(rsp)
    }
}

/// Validate a photon axis: non-empty bins, strictly increasing.
pub(crate) fn check_photon_axis(lo: &[f64], hi: &[f64]) -> Result<()> {
    if lo.is_empty() {
        return Err(GscError::EmptyData("Photon axis has no bins".to_string()));
    }
    for i in 0..lo.len() {
        if !(lo[i] < hi[i]) || (i > 0 && !(lo[i - 1] < lo[i] && hi[i - 1] <= lo[i])) {
            return Err(GscError::InvalidArgument(format!(
                "Photon axis is not strictly increasing at bin {}",
                i
            )));
        }
    }
    Ok(())
}

/// `mx_gsc0_hv803_detx0000_0000.rmf` → `mx_gsc0_hv803_detx0000_0000.rsp`
fn rsp_filename(rmf_name: &str) -> String {
    match rmf_name.rsplit_once('.') {
        Some((stem, _)) => format!("{}.rsp", stem),
        None => format!("{}.rsp", rmf_name),
    }
}
