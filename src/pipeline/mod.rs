//! Reduction composition and execution for event streams.

mod runner;

pub use runner::{
    run_pha, ReductionConfig, ReductionOutput, ReductionPipeline, ReductionProduct, ReductionStep,
};
