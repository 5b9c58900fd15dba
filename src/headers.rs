//! Typed header keyword lookups.
//!
//! File parsing lives outside this crate; readers hand over each extension's
//! keywords as a [`Header`]. Only the handful of keywords that affect
//! correctness are interpreted here.

use crate::error::{GscError, Result};
use serde::{Deserialize, Serialize};

/// Keyword names interpreted by the library.
pub mod keys {
    pub const MJDREFI: &str = "MJDREFI";
    pub const MJDREFF: &str = "MJDREFF";
    pub const DETNAM: &str = "DETNAM";
    pub const DETCHANS: &str = "DETCHANS";
    pub const TRIGTIME: &str = "TRIGTIME";
    pub const ONTIME: &str = "ONTIME";
    pub const EXPOSURE: &str = "EXPOSURE";
    pub const LIVETIME: &str = "LIVETIME";
    pub const EXTNAME: &str = "EXTNAME";
}

/// MAXI mission epoch, integer part (MJD).
pub const MAXI_MJDREFI: i64 = 51544;
/// MAXI mission epoch, fractional part (days).
pub const MAXI_MJDREFF: f64 = 0.00074287037037037;

const SECONDS_PER_DAY: f64 = 86400.0;

/// A single keyword value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Str(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Str(v)
    }
}

/// Ordered keyword → value cards of one file extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a keyword, keeping the position of an existing card.
    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let key = key.to_ascii_uppercase();
        let value = value.into();
        match self.cards.iter_mut().find(|(k, _)| *k == key) {
            Some(card) => card.1 = value,
            None => self.cards.push((key, value)),
        }
    }

    /// Keyword lookup (case-insensitive, FITS keywords are upper case).
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.cards.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// String value of a keyword; `None` if missing.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(HeaderValue::Str(s)) => Ok(Some(s.trim())),
            Some(other) => Err(GscError::InvalidKeyword {
                key: key.to_string(),
                reason: format!("expected a string, found {:?}", other),
            }),
        }
    }

    /// Numeric value of a keyword; integers are widened.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(HeaderValue::Float(v)) => Ok(Some(*v)),
            Some(HeaderValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(GscError::InvalidKeyword {
                key: key.to_string(),
                reason: format!("expected a number, found {:?}", other),
            }),
        }
    }

    /// Integer value of a keyword. Floats with no fractional part are accepted.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(HeaderValue::Int(v)) => Ok(Some(*v)),
            Some(HeaderValue::Float(v)) if v.fract() == 0.0 => Ok(Some(*v as i64)),
            Some(other) => Err(GscError::InvalidKeyword {
                key: key.to_string(),
                reason: format!("expected an integer, found {:?}", other),
            }),
        }
    }

    /// Like [`Header::get_f64`] but the keyword must be present.
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.get_f64(key)?
            .ok_or_else(|| GscError::MissingKeyword(key.to_string()))
    }

    /// Like [`Header::get_i64`] but the keyword must be present.
    pub fn require_i64(&self, key: &str) -> Result<i64> {
        self.get_i64(key)?
            .ok_or_else(|| GscError::MissingKeyword(key.to_string()))
    }
}

/// Reference epoch that mission-elapsed times are counted from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeReference {
    pub mjdrefi: i64,
    pub mjdreff: f64,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            mjdrefi: MAXI_MJDREFI,
            mjdreff: MAXI_MJDREFF,
        }
    }
}

impl TimeReference {
    /// Read `MJDREFI`/`MJDREFF`. Returns `None` when neither is present.
    pub fn from_header(header: &Header) -> Result<Option<Self>> {
        let mjdrefi = header.get_i64(keys::MJDREFI)?;
        let mjdreff = header.get_f64(keys::MJDREFF)?;
        match (mjdrefi, mjdreff) {
            (None, None) => Ok(None),
            (Some(i), Some(f)) => Ok(Some(Self { mjdrefi: i, mjdreff: f })),
            (None, Some(_)) => Err(GscError::MissingKeyword(keys::MJDREFI.to_string())),
            (Some(_), None) => Err(GscError::MissingKeyword(keys::MJDREFF.to_string())),
        }
    }

    /// Reference epoch as a single MJD value.
    pub fn mjdref(&self) -> f64 {
        self.mjdrefi as f64 + self.mjdreff
    }

    /// MJD (in the file's time system) of a mission-elapsed time in seconds.
    pub fn mjd(&self, met: f64) -> f64 {
        // add the fraction first so the large integer part does not swallow it
        self.mjdrefi as f64 + (self.mjdreff + met / SECONDS_PER_DAY)
    }

    /// Inverse of [`TimeReference::mjd`].
    pub fn met(&self, mjd: f64) -> f64 {
        ((mjd - self.mjdrefi as f64) - self.mjdreff) * SECONDS_PER_DAY
    }
}

/// Exposure bookkeeping keywords as written by the pipeline that made the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureKeywords {
    pub ontime: Option<f64>,
    pub exposure: Option<f64>,
    pub livetime: Option<f64>,
}

impl ExposureKeywords {
    pub fn from_header(header: &Header) -> Result<Self> {
        Ok(Self {
            ontime: header.get_f64(keys::ONTIME)?,
            exposure: header.get_f64(keys::EXPOSURE)?,
            livetime: header.get_f64(keys::LIVETIME)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn events_header() -> Header {
        Header::new()
            .with("TELESCOP", "MAXI")
            .with("MJDREFI", 51544i64)
            .with("MJDREFF", 0.00074287037037037)
            .with("TIMESYS", "TT")
            .with("ONTIME", 82550.0)
            .with("EXPOSURE", 82000i64)
            .with("DETCHANS", 1187i64)
    }

    #[test]
    fn test_lookup_and_compare() {
        let hdr = events_header();
        assert!(hdr.contains("telescop"));
        assert_eq!(hdr.get_str("TELESCOP").unwrap(), Some("MAXI"));
        assert_eq!(hdr.get("MJDREFI"), Some(&HeaderValue::Int(51544)));
        assert_eq!(hdr.get_f64("EXPOSURE").unwrap(), Some(82000.0));
        assert_eq!(hdr.require_i64("DETCHANS").unwrap(), 1187);
        assert!(hdr.get_f64("NOPE").unwrap().is_none());
        assert!(hdr.get_f64("TELESCOP").is_err());
        assert!(matches!(
            hdr.require_f64("LIVETIME"),
            Err(GscError::MissingKeyword(_))
        ));
    }

    #[test]
    fn test_insert_replaces() {
        let mut hdr = events_header();
        let n = hdr.len();
        hdr.insert("ontime", 10.0);
        assert_eq!(hdr.len(), n);
        assert_eq!(hdr.get_f64("ONTIME").unwrap(), Some(10.0));
        assert_eq!(hdr.keys().next(), Some("TELESCOP"));
    }

    #[test]
    fn test_time_reference() {
        let tref = TimeReference::from_header(&events_header()).unwrap().unwrap();
        assert_eq!(tref, TimeReference::default());
        assert_relative_eq!(tref.mjd(0.0), 51544.00074287037, epsilon = 1e-9);
        assert_relative_eq!(tref.mjd(86400.0), 51545.00074287037, epsilon = 1e-9);
        assert_relative_eq!(tref.met(tref.mjd(351823349.0)), 351823349.0, epsilon = 1e-3);

        assert!(TimeReference::from_header(&Header::new()).unwrap().is_none());
        let partial = Header::new().with("MJDREFI", 51544i64);
        assert!(TimeReference::from_header(&partial).is_err());
    }

    #[test]
    fn test_exposure_keywords() {
        let exp = ExposureKeywords::from_header(&events_header()).unwrap();
        assert_eq!(exp.ontime, Some(82550.0));
        assert_eq!(exp.exposure, Some(82000.0));
        assert_eq!(exp.livetime, None);
    }
}
