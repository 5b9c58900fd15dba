//! Core data structures: calibrations, binned data and event lists.

mod bins;
mod ebounds;
mod events;

pub use bins::{EnergyBins, TimeBins, TimeEnergyBins};
pub use ebounds::Ebounds;
pub use events::EventList;
