//! Thread pool setup for the reductions and grid stencils
//!
//! Everything parallel in ocean_post goes through Rayon's global pool, so the
//! binary sizes it once before any data is touched.

use crate::errors::{OceanPostError, Result};
use log::{debug, info};
use rayon::ThreadPoolBuilder;

/// Size of the global worker pool; `None` leaves Rayon's own choice
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// One worker per logical core
    pub fn all_cores() -> Self {
        Self::with_threads(num_cpus::get())
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Build the global pool
    ///
    /// A request for zero workers is rejected, and so is a second
    /// initialisation of the pool.
    pub fn setup_global_pool(&self) -> Result<()> {
        let Some(requested) = self.num_threads else {
            debug!("Leaving the thread pool at {} workers", num_cpus::get());
            return Ok(());
        };
        if requested == 0 {
            return Err(OceanPostError::ThreadPoolError(
                "the worker pool needs at least one thread".to_string(),
            ));
        }
        ThreadPoolBuilder::new()
            .num_threads(requested)
            .thread_name(|i| format!("ocean-post-{i}"))
            .build_global()
            .map_err(|e| {
                OceanPostError::ThreadPoolError(format!(
                    "could not start {requested} worker threads: {e}"
                ))
            })?;
        info!("🧵 Worker pool sized to {requested} of {} cores", num_cpus::get());
        Ok(())
    }

    /// Workers in the pool that parallel operations will run on
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}
