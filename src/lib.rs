//! MAXI Gas Slit Camera (GSC) Detector Response & Event Reduction Library
//!
//! This library composes GSC detector responses and reduces time-tagged
//! event data to the binned products used for spectral analysis.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (Ebounds, EnergyBins, TimeEnergyBins, EventList)
//! - **detectors**: The twelve GSC counters and the merged `ALL` set
//! - **headers**: Typed header keywords and the MAXI time reference
//! - **response**: Effective area (ARF), redistribution (RMF) and combined (RSP) responses
//! - **spectra**: Photon models for folding through a response
//! - **binning**: Pluggable time binners and channel combiners
//! - **tte**: Event streams and their PHA / PHAII products
//! - **pipeline**: Reduction composition and execution
//!
//! # Example
//!
//! ```no_run
//! use maxi_gsc::prelude::*;
//!
//! # fn load() -> Result<(EventStream, Ebounds)> { unimplemented!() }
//! let (mut tte, ebounds) = load().unwrap();
//! tte.set_ebounds(ebounds);
//!
//! // Reduce to a 600-channel spectrum and an 8.192 s spectrogram
//! let pha = tte.rebin_energy(combine_by_factor, 2).unwrap().to_pha().unwrap();
//! let phaii = tte.to_phaii(bin_by_time, 8.192).unwrap();
//!
//! // Or describe the same reduction as a pipeline
//! let product = ReductionPipeline::new()
//!     .name("soft band")
//!     .slice_energy(50, 300)
//!     .rebin_energy(2)
//!     .output_pha()
//!     .run(&tte)
//!     .unwrap();
//! ```

pub mod binning;
pub mod data;
pub mod detectors;
pub mod error;
pub mod headers;
pub mod pipeline;
pub mod response;
pub mod spectra;
pub mod tte;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::binning::{bin_by_time, combine_by_factor, ChannelCombiner, TimeBinner};
    pub use crate::data::{Ebounds, EnergyBins, EventList, TimeBins, TimeEnergyBins};
    pub use crate::detectors::Detector;
    pub use crate::error::{GscError, Result};
    pub use crate::headers::{ExposureKeywords, Header, HeaderValue, TimeReference};
    pub use crate::pipeline::{
        run_pha, ReductionConfig, ReductionOutput, ReductionPipeline, ReductionProduct,
        ReductionStep,
    };
    pub use crate::response::{
        AreaCurve, CombinedResponse, EffectiveAreaCurve, ResponseMatrix,
    };
    pub use crate::spectra::{PowerLaw, SpectralModel};
    pub use crate::tte::{
        EventStream, Pha, Phaii, GSC_EVENT_DEADTIME, GSC_OVERFLOW_DEADTIME, NOMINAL_NUM_CHANS,
    };
}
