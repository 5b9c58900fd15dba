//! Detector response: effective area, redistribution, and their product.
//!
//! - **arf**: Effective-area curves keyed by high-voltage setting
//! - **rmf**: Redistribution matrices and `apply_arf`
//! - **rsp**: Combined responses (rebin, resample, fold)

pub mod arf;
pub mod rmf;
pub mod rsp;

pub use arf::{mode_from_extname, AreaCurve, EffectiveAreaCurve};
pub use rmf::ResponseMatrix;
pub use rsp::CombinedResponse;
