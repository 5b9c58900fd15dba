//! GSC detector identities.
//!
//! The Gas Slit Camera is made of twelve proportional counters split across
//! two camera units: the horizontal unit (H) looking along the ISS velocity
//! vector and the zenith unit (Z). Each unit has an A and a B half with three
//! counters apiece. Event files that merge every counter are tagged `ALL`.

use crate::error::GscError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A GSC proportional counter, or the aggregate of all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Detector {
    HA0,
    HA1,
    HA2,
    HB0,
    HB1,
    HB2,
    ZA0,
    ZA1,
    ZA2,
    ZB0,
    ZB1,
    ZB2,
    /// Merged events from every counter.
    #[serde(rename = "ALL")]
    All,
}

const H_DETECTORS: [Detector; 6] = [
    Detector::HA0,
    Detector::HA1,
    Detector::HA2,
    Detector::HB0,
    Detector::HB1,
    Detector::HB2,
];

const Z_DETECTORS: [Detector; 6] = [
    Detector::ZA0,
    Detector::ZA1,
    Detector::ZA2,
    Detector::ZB0,
    Detector::ZB1,
    Detector::ZB2,
];

impl Detector {
    /// Short name as used in calibration file headers (e.g. `HA0`).
    pub fn name(&self) -> &'static str {
        match self {
            Detector::HA0 => "HA0",
            Detector::HA1 => "HA1",
            Detector::HA2 => "HA2",
            Detector::HB0 => "HB0",
            Detector::HB1 => "HB1",
            Detector::HB2 => "HB2",
            Detector::ZA0 => "ZA0",
            Detector::ZA1 => "ZA1",
            Detector::ZA2 => "ZA2",
            Detector::ZB0 => "ZB0",
            Detector::ZB1 => "ZB1",
            Detector::ZB2 => "ZB2",
            Detector::All => "ALL",
        }
    }

    /// Counter number, `None` for the aggregate.
    pub fn number(&self) -> Option<u8> {
        match self {
            Detector::HA0 => Some(0),
            Detector::HA1 => Some(1),
            Detector::HA2 => Some(2),
            Detector::ZA0 => Some(3),
            Detector::ZA1 => Some(4),
            Detector::ZA2 => Some(5),
            Detector::HB0 => Some(6),
            Detector::HB1 => Some(7),
            Detector::HB2 => Some(8),
            Detector::ZB0 => Some(9),
            Detector::ZB1 => Some(10),
            Detector::ZB2 => Some(11),
            Detector::All => None,
        }
    }

    /// Full name, `GSC_<hex number>` (e.g. `GSC_A` for counter 10).
    pub fn full_name(&self) -> String {
        match self.number() {
            Some(n) => format!("GSC_{:X}", n),
            None => "ALL".to_string(),
        }
    }

    /// The six horizontal-unit counters.
    pub fn h_detectors() -> &'static [Detector] {
        &H_DETECTORS
    }

    /// The six zenith-unit counters.
    pub fn z_detectors() -> &'static [Detector] {
        &Z_DETECTORS
    }

    /// All twelve counters, in counter-number order.
    pub fn counters() -> Vec<Detector> {
        let mut all: Vec<Detector> = H_DETECTORS
            .iter()
            .chain(Z_DETECTORS.iter())
            .copied()
            .collect();
        all.sort_by_key(|d| d.number());
        all
    }

    pub fn is_h_detector(&self) -> bool {
        H_DETECTORS.contains(self)
    }

    pub fn is_z_detector(&self) -> bool {
        Z_DETECTORS.contains(self)
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Detector {
    type Err = GscError;

    /// Accepts the short name (`HA0`), the full name (`GSC_0`) or `ALL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("ALL") {
            return Ok(Detector::All);
        }
        Detector::counters()
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s) || d.full_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GscError::InvalidArgument(format!("Unknown GSC detector '{}'", s)))
    }
}
