//! ocean_post: post-processing for gridded ocean model output
//!
//! A Rust library for the chores that follow a model run: converting units,
//! shifting longitudes, masking by tracer thresholds, integrating fields
//! over area and volume, and computing relative vorticity on staggered
//! grids. Data is held in small labeled containers over `ndarray`, read from
//! and written to NetCDF.
//!
//! ## Key Features
//!
//! - **Labeled arrays**: Named dimensions, coordinates and attributes with
//!   broadcasting arithmetic and NaN-aware reductions
//! - **Parallel Processing**: Reductions and grid stencils run on Rayon
//! - **Weighted metrics**: Area and volume weighted sections, profiles and
//!   timeseries, saved per metric or per year
//! - **Staggered grids**: Arakawa B and C grid interpolation, differencing and
//!   relative vorticity
//! - **Plotting**: Shaded spread lines and section heatmaps rendered with
//!   `plotters`
//!
//! ## Module Organization
//!
//! - [`labeled`]: `Variable`, `DataArray` and `Dataset` containers
//! - [`statistics`]: NaN-skipping parallel reductions over ndarray axes
//! - [`weighted`]: Weighted sums and means
//! - [`processing`]: Model post-processing helpers
//! - [`metrics`]: Weighted metrics with save, load and control plots
//! - [`grid`]: Staggered-grid operators
//! - [`plotting`]: Plot geometry and rendering
//! - [`netcdf_io`]: NetCDF reading and writing
//! - [`metadata`]: Dataset inspection
//! - [`config`]: Dimension names and metric options
//! - [`parallel`]: Parallel processing configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ocean_post::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> ocean_post::Result<()> {
//! let ds = open_dataset(Path::new("ocean.nc"))?;
//! let ds = ds_add_track_dummy(&ds, "temp")?;
//! let metrics = metrics_ds(&ds, &MetricsConfig::default())?;
//! metrics_save(&metrics, Path::new("out"), "run01", false)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod grid;
pub mod labeled;
pub mod metadata;
pub mod metrics;
pub mod netcdf_io;
pub mod parallel;
pub mod plotting;
pub mod processing;
pub mod statistics;
pub mod weighted;

pub use errors::{OceanPostError, Result};
pub use labeled::{AttrValue, Attributes, DataArray, Dataset, Variable};

/// Commonly used items
pub mod prelude {
    pub use crate::config::{GridNames, MetricsConfig};
    pub use crate::errors::{OceanPostError, Result};
    pub use crate::grid::{
        calculate_rel_vorticity, check_dims, infer_gridtype, interp_all, AxisPosition, Boundary,
        Grid, GridAxis, GridType,
    };
    pub use crate::labeled::{AttrValue, Attributes, DataArray, Dataset, Variable};
    pub use crate::metrics::{metrics_ds, metrics_load, metrics_save, MetricKind, Metrics};
    pub use crate::netcdf_io::{open_dataset, to_netcdf, DatasetWriter};
    pub use crate::parallel::ParallelConfig;
    pub use crate::plotting::{
        plot_line_shaded_std, same_y_range, shaded_line_plot, Axes, Figure, ShadedLineOptions,
        SpreadStyle,
    };
    pub use crate::processing::{
        add_grid_geometry, convert_boundary_flux, convert_units, ds_add_track_dummy, mask_tracer,
        shift_lon, time_add_refyear, ShiftLon,
    };
    pub use crate::statistics::{StatOperation, StatisticalReduction};
    pub use crate::weighted::{weighted_mean, weighted_sum};
}
