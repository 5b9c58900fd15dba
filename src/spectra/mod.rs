//! Photon spectral models used for folding through a detector response.

pub mod functions;

pub use functions::{PowerLaw, SpectralModel};
