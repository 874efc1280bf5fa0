//! Statistical reductions over n-dimensional arrays
//!
//! # Organization
//!
//! - [`operations`]: Core statistical operations and traits
//! - [`parallel`]: Parallel computation implementations

pub mod operations;
pub mod parallel;

pub use operations::{StatOperation, StatisticalReduction};
pub use parallel::{parallel_reduce_axes, reduce_lane};
