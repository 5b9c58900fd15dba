//! Reduction runner for composing and executing event-stream steps.

use crate::binning::{bin_by_time, combine_by_factor};
use crate::data::EnergyBins;
use crate::error::{GscError, Result};
use crate::tte::{EventStream, Pha, Phaii};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A transform applied to the event stream before the product is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReductionStep {
    /// Keep events with `tstart <= time <= tstop`.
    SliceTime { tstart: f64, tstop: f64 },
    /// Keep events with `chan_min <= channel <= chan_max`.
    SliceEnergy { chan_min: u32, chan_max: u32 },
    /// Merge adjacent channels by an integer factor.
    RebinEnergy { factor: usize },
}

/// The product a reduction ends with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReductionOutput {
    /// Uncalibrated count spectrum on the nominal channel grid.
    Spectrum,
    /// Calibrated, dead-time corrected integrated spectrum.
    Pha,
    /// Time-resolved spectrum with fixed-width time bins.
    Phaii { bin_width: f64 },
}

/// Reduction configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    /// Name of the reduction.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute, in order.
    pub steps: Vec<ReductionStep>,
    /// Product to build from the reduced stream.
    pub output: ReductionOutput,
}

impl ReductionConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(GscError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(GscError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Write to a YAML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Result of running a reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReductionProduct {
    Spectrum(EnergyBins),
    Pha(Pha),
    Phaii(Phaii),
}

impl ReductionProduct {
    /// Number of channels in the product.
    pub fn num_chans(&self) -> usize {
        match self {
            ReductionProduct::Spectrum(bins) => bins.size(),
            ReductionProduct::Pha(pha) => pha.num_chans(),
            ReductionProduct::Phaii(phaii) => phaii.num_chans(),
        }
    }

    pub fn as_pha(&self) -> Option<&Pha> {
        match self {
            ReductionProduct::Pha(pha) => Some(pha),
            _ => None,
        }
    }

    pub fn as_phaii(&self) -> Option<&Phaii> {
        match self {
            ReductionProduct::Phaii(phaii) => Some(phaii),
            _ => None,
        }
    }

    pub fn as_spectrum(&self) -> Option<&EnergyBins> {
        match self {
            ReductionProduct::Spectrum(bins) => Some(bins),
            _ => None,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(GscError::from)
    }
}

/// Builder for constructing and running event-stream reductions.
#[derive(Debug, Clone)]
pub struct ReductionPipeline {
    steps: Vec<ReductionStep>,
    output: ReductionOutput,
    name: String,
}

impl Default for ReductionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ReductionPipeline {
    /// Create an empty reduction that ends in a PHA.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            output: ReductionOutput::Pha,
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &ReductionConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            output: config.output,
            name: config.name.clone(),
        }
    }

    /// Set the reduction name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn slice_time(mut self, tstart: f64, tstop: f64) -> Self {
        self.steps.push(ReductionStep::SliceTime { tstart, tstop });
        self
    }

    pub fn slice_energy(mut self, chan_min: u32, chan_max: u32) -> Self {
        self.steps
            .push(ReductionStep::SliceEnergy { chan_min, chan_max });
        self
    }

    /// Merge channels with [`combine_by_factor`].
    pub fn rebin_energy(mut self, factor: usize) -> Self {
        self.steps.push(ReductionStep::RebinEnergy { factor });
        self
    }

    pub fn output_spectrum(mut self) -> Self {
        self.output = ReductionOutput::Spectrum;
        self
    }

    pub fn output_pha(mut self) -> Self {
        self.output = ReductionOutput::Pha;
        self
    }

    /// End with a PHAII binned by [`bin_by_time`].
    pub fn output_phaii(mut self, bin_width: f64) -> Self {
        self.output = ReductionOutput::Phaii { bin_width };
        self
    }

    pub fn steps(&self) -> &[ReductionStep] {
        &self.steps
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> ReductionConfig {
        ReductionConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
            output: self.output,
        }
    }

    /// Run the reduction on an event stream. The input is left untouched.
    pub fn run(&self, stream: &EventStream) -> Result<ReductionProduct> {
        let mut current = stream.clone();

        for (i, step) in self.steps.iter().enumerate() {
            current = apply(&current, step).map_err(|e| {
                GscError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
            log::debug!(
                "{}: step {} left {} events in {} channels",
                self.name,
                i + 1,
                current.data().len(),
                current.num_chans()
            );
        }

        let product = match self.output {
            ReductionOutput::Spectrum => current.to_spectrum().map(ReductionProduct::Spectrum),
            ReductionOutput::Pha => current.to_pha().map(ReductionProduct::Pha),
            ReductionOutput::Phaii { bin_width } => current
                .to_phaii(bin_by_time, bin_width)
                .map(ReductionProduct::Phaii),
        };
        product.map_err(|e| {
            GscError::Pipeline(format!("Output {:?} failed: {}", self.output, e))
        })
    }
}

fn apply(stream: &EventStream, step: &ReductionStep) -> Result<EventStream> {
    match *step {
        ReductionStep::SliceTime { tstart, tstop } => Ok(stream.slice_time((tstart, tstop))),
        ReductionStep::SliceEnergy { chan_min, chan_max } => {
            Ok(stream.slice_energy((chan_min, chan_max)))
        }
        ReductionStep::RebinEnergy { factor } => stream.rebin_energy(combine_by_factor, factor),
    }
}

/// Convenience function: rebin a calibrated stream by `factor` and build a PHA.
pub fn run_pha(stream: &EventStream, factor: usize) -> Result<Pha> {
    let product = ReductionPipeline::new()
        .name("PHA")
        .rebin_energy(factor)
        .output_pha()
        .run(stream)?;
    match product {
        ReductionProduct::Pha(pha) => Ok(pha),
        _ => Err(GscError::Pipeline(
            "Reduction did not produce a PHA".to_string(),
        )),
    }
}
