//! Reduced products of an event stream.

use crate::data::{Ebounds, EnergyBins, TimeBins, TimeEnergyBins};
use crate::detectors::Detector;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Live exposure per channel after non-paralyzable deadtime.
///
/// Each recorded event blinds the detector for `event_deadtime`, except those
/// in the last (overflow) channel, which cost `overflow_deadtime`. Channels
/// whose dead time would exceed the duration are clamped to zero.
pub(crate) fn live_exposure(
    duration: f64,
    counts: &[u64],
    event_deadtime: f64,
    overflow_deadtime: f64,
) -> Vec<f64> {
    let overflow = counts.len().saturating_sub(1);
    counts
        .iter()
        .enumerate()
        .map(|(c, &n)| {
            let deadtime = if c == overflow {
                overflow_deadtime
            } else {
                event_deadtime
            };
            let live = duration - deadtime * n as f64;
            if live < 0.0 {
                log::warn!(
                    "Channel {} dead time {:.6} s exceeds duration {:.6} s, clamping live time to 0",
                    c,
                    deadtime * n as f64,
                    duration
                );
                0.0
            } else {
                live
            }
        })
        .collect()
}

/// An integrated, energy-calibrated count spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pha {
    data: EnergyBins,
    ebounds: Ebounds,
    time_range: (f64, f64),
    detector: Detector,
    trigtime: Option<f64>,
}

impl Pha {
    pub(crate) fn new(
        data: EnergyBins,
        ebounds: Ebounds,
        time_range: (f64, f64),
        detector: Detector,
        trigtime: Option<f64>,
    ) -> Self {
        Self {
            data,
            ebounds,
            time_range,
            detector,
            trigtime,
        }
    }

    #[inline]
    pub fn num_chans(&self) -> usize {
        self.data.size()
    }

    #[inline]
    pub fn data(&self) -> &EnergyBins {
        &self.data
    }

    #[inline]
    pub fn ebounds(&self) -> &Ebounds {
        &self.ebounds
    }

    #[inline]
    pub fn time_range(&self) -> (f64, f64) {
        self.time_range
    }

    #[inline]
    pub fn detector(&self) -> Detector {
        self.detector
    }

    #[inline]
    pub fn trigtime(&self) -> Option<f64> {
        self.trigtime
    }

    /// Live exposure per channel.
    pub fn exposure(&self) -> &[f64] {
        &self.data.exposure
    }
}

/// A time-resolved spectrum (spectrogram).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phaii {
    data: TimeEnergyBins,
    /// Calibration of the channel axis; `None` on the (possibly rebinned)
    /// nominal PI grid, with channel numbers as edges.
    ebounds: Option<Ebounds>,
    detector: Detector,
    trigtime: Option<f64>,
}

impl Phaii {
    pub(crate) fn new(
        data: TimeEnergyBins,
        ebounds: Option<Ebounds>,
        detector: Detector,
        trigtime: Option<f64>,
    ) -> Self {
        Self {
            data,
            ebounds,
            detector,
            trigtime,
        }
    }

    #[inline]
    pub fn data(&self) -> &TimeEnergyBins {
        &self.data
    }

    pub fn ebounds(&self) -> Option<&Ebounds> {
        self.ebounds.as_ref()
    }

    #[inline]
    pub fn detector(&self) -> Detector {
        self.detector
    }

    #[inline]
    pub fn trigtime(&self) -> Option<f64> {
        self.trigtime
    }

    #[inline]
    pub fn num_times(&self) -> usize {
        self.data.num_times()
    }

    #[inline]
    pub fn num_chans(&self) -> usize {
        self.data.num_chans()
    }

    /// Light curve over an inclusive channel range (all channels if `None`).
    pub fn to_lightcurve(&self, channel_range: Option<(usize, usize)>) -> Result<TimeBins> {
        let (cmin, cmax) =
            channel_range.unwrap_or((0, self.num_chans().saturating_sub(1)));
        self.data.integrate_energy(cmin, cmax)
    }

    /// Spectrum over a time range (the whole spectrogram if `None`).
    pub fn to_spectrum(&self, time_range: Option<(f64, f64)>) -> Result<EnergyBins> {
        let (tmin, tmax) = match time_range {
            Some(range) => range,
            None => self.data.time_range().unwrap_or((0.0, 0.0)),
        };
        self.data.integrate_time(tmin, tmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_live_exposure() {
        let live = live_exposure(10.0, &[1000, 0, 2000], 1e-3, 2e-3);
        assert_relative_eq!(live[0], 9.0, epsilon = 1e-12);
        assert_relative_eq!(live[1], 10.0);
        // overflow channel uses its own dead time
        assert_relative_eq!(live[2], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_live_exposure_clamped() {
        let live = live_exposure(1.0, &[10, 5000], 1e-3, 1e-3);
        assert_relative_eq!(live[0], 0.99, epsilon = 1e-12);
        assert_eq!(live[1], 0.0);
    }
}
