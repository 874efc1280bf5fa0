//! Labeled multi-dimensional arrays
//!
//! Gridded model output is handled as [`Dataset`]s of named variables whose
//! axes carry dimension names such as `xt_ocean`, `st_ocean` or `time`.
//! Arithmetic broadcasts by dimension name, reductions skip NaN, and
//! coordinates follow their variables through selection and reduction.
//!
//! - [`attrs`]: attribute values
//! - [`variable`]: dimension-named storage
//! - [`array`]: [`DataArray`], a variable with coordinates
//! - [`dataset`]: [`Dataset`], variables sharing dimensions
//! - [`time`]: CF time decoding

pub mod array;
pub mod attrs;
pub mod dataset;
pub mod time;
pub mod variable;

pub use array::DataArray;
pub use attrs::{AttrValue, Attributes};
pub use dataset::Dataset;
pub use time::{decode_cf_times, CfCalendar, CfTimeUnits};
pub use variable::Variable;
