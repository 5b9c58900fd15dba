//! Effective-area correction curves (ARF).
//!
//! GSC area corrections are delivered as one extension per high-voltage
//! setting, named `HVB<setting>` (e.g. `HVB803`, `HVB854`). Each extension
//! holds a per-photon-bin correction factor on its own photon energy grid.

use crate::detectors::Detector;
use crate::error::{GscError, Result};
use crate::headers::{keys, Header};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Area correction on a photon energy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaCurve {
    pub lo_edges: Vec<f64>,
    pub hi_edges: Vec<f64>,
    /// Correction value per photon bin.
    pub area: Vec<f64>,
}

impl AreaCurve {
    pub fn new(lo_edges: Vec<f64>, hi_edges: Vec<f64>, area: Vec<f64>) -> Result<Self> {
        if lo_edges.len() != area.len() {
            return Err(GscError::DimensionMismatch {
                expected: area.len(),
                actual: lo_edges.len(),
            });
        }
        if hi_edges.len() != area.len() {
            return Err(GscError::DimensionMismatch {
                expected: area.len(),
                actual: hi_edges.len(),
            });
        }
        if area.is_empty() {
            return Err(GscError::EmptyData("Area curve has no bins".to_string()));
        }
        let ascending = lo_edges.iter().zip(&hi_edges).all(|(lo, hi)| lo < hi)
            && lo_edges.windows(2).all(|w| w[0] < w[1]);
        if !ascending {
            return Err(GscError::InvalidArgument(
                "Area curve photon bins must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            lo_edges,
            hi_edges,
            area,
        })
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.area.len()
    }

    /// `(lowest edge, highest edge)` of the photon grid.
    pub fn range(&self) -> (f64, f64) {
        (self.lo_edges[0], self.hi_edges[self.num_bins() - 1])
    }

    pub fn centroids(&self) -> Vec<f64> {
        self.lo_edges
            .iter()
            .zip(&self.hi_edges)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    /// Widest photon bin of the curve.
    pub fn max_bin_width(&self) -> f64 {
        self.lo_edges
            .iter()
            .zip(&self.hi_edges)
            .map(|(lo, hi)| hi - lo)
            .fold(0.0, f64::max)
    }

    /// Area at `energy`, linear between bin centroids and held constant
    /// beyond the outermost centroids.
    pub fn sample(&self, energy: f64) -> f64 {
        self.sample_many(&[energy])[0]
    }

    /// Sample the curve at many energies, reusing the centroid table.
    pub fn sample_many(&self, energies: &[f64]) -> Vec<f64> {
        let centers = self.centroids();
        let n = centers.len();
        energies
            .iter()
            .map(|&e| {
                if n == 1 || e <= centers[0] {
                    self.area[0]
                } else if e >= centers[n - 1] {
                    self.area[n - 1]
                } else {
                    let i = centers.partition_point(|&c| c <= e);
                    let t = (e - centers[i - 1]) / (centers[i] - centers[i - 1]);
                    self.area[i - 1] + t * (self.area[i] - self.area[i - 1])
                }
            })
            .collect()
    }
}

/// Parse the high-voltage setting out of an `HVB<setting>` extension name.
pub fn mode_from_extname(extname: &str) -> Result<u32> {
    let digits = extname
        .trim()
        .strip_prefix("HVB")
        .ok_or_else(|| GscError::InvalidKeyword {
            key: keys::EXTNAME.to_string(),
            reason: format!("'{}' is not an HVB<setting> extension", extname),
        })?;
    digits.parse().map_err(|_| GscError::InvalidKeyword {
        key: keys::EXTNAME.to_string(),
        reason: format!("'{}' does not end in a voltage setting", extname),
    })
}

/// The set of area curves for one detector, keyed by high-voltage setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveAreaCurve {
    detector: Detector,
    curves: BTreeMap<u32, AreaCurve>,
    filename: Option<String>,
}

impl EffectiveAreaCurve {
    pub fn new(detector: Detector, curves: BTreeMap<u32, AreaCurve>) -> Result<Self> {
        if curves.is_empty() {
            return Err(GscError::EmptyData(
                "Effective area needs at least one voltage setting".to_string(),
            ));
        }
        Ok(Self {
            detector,
            curves,
            filename: None,
        })
    }

    /// Build from `(extension header, curve)` pairs; each header's `EXTNAME`
    /// names the voltage setting.
    pub fn from_extensions(
        detector: Detector,
        extensions: Vec<(Header, AreaCurve)>,
    ) -> Result<Self> {
        let mut curves = BTreeMap::new();
        for (header, curve) in extensions {
            let extname = header
                .get_str(keys::EXTNAME)?
                .ok_or_else(|| GscError::MissingKeyword(keys::EXTNAME.to_string()))?;
            let mode = mode_from_extname(extname)?;
            if curves.insert(mode, curve).is_some() {
                return Err(GscError::InvalidArgument(format!(
                    "Voltage setting {} appears twice",
                    mode
                )));
            }
        }
        Self::new(detector, curves)
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    #[inline]
    pub fn detector(&self) -> Detector {
        self.detector
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Supported voltage settings, ascending.
    pub fn modes(&self) -> Vec<u32> {
        self.curves.keys().copied().collect()
    }

    /// The area curve for a voltage setting.
    pub fn get_arf(&self, mode: u32) -> Result<&AreaCurve> {
        self.curves.get(&mode).ok_or_else(|| {
            GscError::InvalidArgument(format!(
                "{} has no effective area for voltage setting {} (supported: {:?})",
                self.detector,
                mode,
                self.modes()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gsc_grid(first: f64, last: f64) -> AreaCurve {
        // 0.05 keV bins centered on 0.5 .. 60.45
        let n = 1200;
        let lo: Vec<f64> = (0..n).map(|i| 0.475 + 0.05 * i as f64).collect();
        let hi: Vec<f64> = lo.iter().map(|l| l + 0.05).collect();
        let area: Vec<f64> = (0..n)
            .map(|i| first + (last - first) * i as f64 / (n - 1) as f64)
            .collect();
        AreaCurve::new(lo, hi, area).unwrap()
    }

    fn create_test_arf() -> EffectiveAreaCurve {
        let extensions = vec![
            (Header::new().with("EXTNAME", "HVB803"), gsc_grid(0.5928503, 1.0)),
            (Header::new().with("EXTNAME", "HVB854"), gsc_grid(1.0013245, 1.0)),
        ];
        EffectiveAreaCurve::from_extensions(Detector::HA0, extensions).unwrap()
    }

    #[test]
    fn test_get_arf() {
        let arf = create_test_arf();
        assert_eq!(arf.detector(), Detector::HA0);
        assert_eq!(arf.modes(), vec![803, 854]);

        let curve = arf.get_arf(803).unwrap();
        assert_relative_eq!(curve.area[0], 0.5928503);
        assert_relative_eq!(curve.lo_edges[0], 0.475, epsilon = 1e-9);
        assert_relative_eq!(curve.hi_edges[1199], 60.475, epsilon = 1e-9);
        assert_relative_eq!(arf.get_arf(854).unwrap().area[0], 1.0013245);
    }

    #[test]
    fn test_unsupported_mode() {
        let arf = create_test_arf();
        assert!(matches!(
            arf.get_arf(888),
            Err(GscError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_extname_parsing() {
        assert_eq!(mode_from_extname("HVB803").unwrap(), 803);
        assert!(mode_from_extname("SPECRESP").is_err());
        assert!(mode_from_extname("HVBxyz").is_err());

        let dup = vec![
            (Header::new().with("EXTNAME", "HVB803"), gsc_grid(1.0, 1.0)),
            (Header::new().with("EXTNAME", "HVB803"), gsc_grid(1.0, 1.0)),
        ];
        assert!(EffectiveAreaCurve::from_extensions(Detector::HA0, dup).is_err());
        let unnamed = vec![(Header::new(), gsc_grid(1.0, 1.0))];
        assert!(matches!(
            EffectiveAreaCurve::from_extensions(Detector::HA0, unnamed),
            Err(GscError::MissingKeyword(_))
        ));
    }

    #[test]
    fn test_sample_interpolates_between_centroids() {
        let curve = AreaCurve::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0])
            .unwrap();
        assert_relative_eq!(curve.sample(0.5), 1.0);
        assert_relative_eq!(curve.sample(1.0), 2.0);
        assert_relative_eq!(curve.sample(2.5), 5.0);
        assert_relative_eq!(curve.sample(-4.0), 1.0);
        assert_relative_eq!(curve.sample(9.0), 5.0);
        assert_eq!(curve.sample_many(&[0.5, 1.0, 2.5]), vec![1.0, 2.0, 5.0]);
        assert_relative_eq!(curve.max_bin_width(), 1.0);
    }

    #[test]
    fn test_curve_validation() {
        assert!(AreaCurve::new(vec![0.0, 1.0], vec![1.0], vec![1.0, 1.0]).is_err());
        assert!(AreaCurve::new(vec![1.0, 0.0], vec![2.0, 1.0], vec![1.0, 1.0]).is_err());
        assert!(AreaCurve::new(vec![], vec![], vec![]).is_err());
    }
}
