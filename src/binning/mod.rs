//! Pluggable binning strategies.
//!
//! The reduction code never hard-wires how arrival times are partitioned or
//! how adjacent channels are merged; it calls a [`TimeBinner`] or a
//! [`ChannelCombiner`] supplied by the caller. Plain functions and closures
//! with the right signature implement both traits.

pub mod binned;
pub mod unbinned;

pub use binned::{combine_by_factor, ChannelCombiner};
pub use unbinned::{bin_by_time, TimeBinner};
