//! Time-tagged event (TTE) data and its reduction to binned products.
//!
//! An [`EventStream`] holds the photon events of one detector together with
//! the metadata needed to turn them into spectra: the optional channel
//! calibration, dead-time constants and the trigger time.

pub mod products;
pub mod stream;

pub use products::{Pha, Phaii};
pub use stream::{
    EventStream, GSC_EVENT_DEADTIME, GSC_OVERFLOW_DEADTIME, NOMINAL_NUM_CHANS,
};
