//! Differential photon flux models, in photons/cm²/s/keV.

/// A pure function of photon energy (keV) and a parameter vector.
pub trait SpectralModel: Sync {
    /// Differential photon flux at `energy`.
    fn eval(&self, params: &[f64], energy: f64) -> f64;

    /// Number of parameters the model expects, `None` if unchecked.
    fn num_params(&self) -> Option<usize> {
        None
    }
}

impl<F> SpectralModel for F
where
    F: Fn(&[f64], f64) -> f64 + Sync,
{
    fn eval(&self, params: &[f64], energy: f64) -> f64 {
        self(params, energy)
    }
}

/// Power law `A * (E / pivot)^index`.
///
/// Parameters are `(A, index)`; `A` is the amplitude at the pivot energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    pub pivot: f64,
}

impl Default for PowerLaw {
    fn default() -> Self {
        Self { pivot: 100.0 }
    }
}

impl PowerLaw {
    pub fn with_pivot(pivot: f64) -> Self {
        Self { pivot }
    }
}

impl SpectralModel for PowerLaw {
    /// NaN when fewer than two parameters are given.
    fn eval(&self, params: &[f64], energy: f64) -> f64 {
        match params {
            [amplitude, index, ..] => amplitude * (energy / self.pivot).powf(*index),
            _ => f64::NAN,
        }
    }

    fn num_params(&self) -> Option<usize> {
        Some(2)
    }
}
