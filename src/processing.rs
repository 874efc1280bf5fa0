//! Post-processing helpers for ocean model output
//!
//! Small, single-purpose transformations applied to model datasets before
//! computing metrics: unit conversion, longitude shifting, tracer masking,
//! boundary-flux padding, time rebasing and grid geometry.

use crate::config::GridNames;
use crate::errors::{OceanPostError, Result};
use crate::labeled::{DataArray, Dataset, Variable};
use crate::netcdf_io::open_dataset;
use log::{debug, info};
use ndarray::{ArrayD, Axis, IxDyn};
use std::path::Path;

/// Reference density used to turn `rho_dzt` into layer thickness (kg/m^3)
pub const RHO0: f64 = 1035.0;

/// Name of the tracking variable added by [`ds_add_track_dummy`]
pub const TRACK_DUMMY: &str = "ones";

/// Multiply variable `name` by `factor` and record its new units
pub fn convert_units(ds: &Dataset, name: &str, new_unit: &str, factor: f64) -> Result<Dataset> {
    let mut out = ds.clone();
    let var = if out.data_var(name).is_some() {
        out.data_var_mut(name)
    } else {
        out.coord_mut(name)
    }
    .ok_or_else(|| OceanPostError::VariableNotFound {
        var: name.to_string(),
    })?;

    var.data_mut().mapv_inplace(|x| x * factor);
    var.attrs_mut()
        .insert("units".to_string(), new_unit.into());
    debug!("🔄 Converted '{name}' to {new_unit} (factor {factor})");
    Ok(out)
}

/// Options for [`shift_lon`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftLon {
    /// Amount added to the selected longitudes
    pub shift: f64,
    /// Threshold selecting which longitudes move
    pub crit: f64,
    /// Shift values below `crit` when true, above it otherwise
    pub smaller: bool,
    /// Sort the dataset by the shifted coordinate afterwards
    pub sort: bool,
}

impl Default for ShiftLon {
    fn default() -> Self {
        Self {
            shift: 360.0,
            crit: 0.0,
            smaller: true,
            sort: true,
        }
    }
}

/// Shift longitudes on one side of `crit` by `shift`, optionally re-sorting
pub fn shift_lon(ds: &Dataset, londim: &str, options: ShiftLon) -> Result<Dataset> {
    let mut out = ds.clone();
    let lon = out
        .coord_mut(londim)
        .ok_or_else(|| OceanPostError::VariableNotFound {
            var: londim.to_string(),
        })?;

    let ShiftLon {
        shift,
        crit,
        smaller,
        sort,
    } = options;
    lon.data_mut().mapv_inplace(|x| {
        let selected = if smaller { x < crit } else { x > crit };
        if selected {
            x + shift
        } else {
            x
        }
    });

    if sort {
        out = out.sortby(londim)?;
    }
    Ok(out)
}

/// Mask `ds` where `mask` exceeds each level, stacked along a new dimension
///
/// Level `l` keeps cells with `mask <= l`; cells where the mask is NaN are
/// always masked. The new dimension `name` is indexed by `levels`.
pub fn mask_tracer(ds: &Dataset, mask: &DataArray, levels: &[f64], name: &str) -> Result<Dataset> {
    if levels.is_empty() {
        return Err(OceanPostError::InvalidArgument(
            "at least one masking level is required".to_string(),
        ));
    }
    let masked = levels
        .iter()
        .map(|&level| ds.where_by(mask, move |m| m <= level))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "🎭 Masked {} variables at {} levels along '{name}'",
        ds.data_vars().len(),
        levels.len()
    );
    Dataset::concat(&masked, name, Some(levels.to_vec()))
}

/// Pad a boundary flux into a full column that is zero away from the boundary
///
/// `da` must have the dimensions of `da_full` without `zdim`. Its values land
/// on the first level of `zdim` when `top`, on the last level otherwise.
pub fn convert_boundary_flux(
    da: &DataArray,
    da_full: &DataArray,
    zdim: &str,
    top: bool,
) -> Result<DataArray> {
    let axis = da_full
        .dims()
        .iter()
        .position(|d| d == zdim)
        .ok_or_else(|| OceanPostError::DimensionNotFound {
            var: da_full.label().to_string(),
            dim: zdim.to_string(),
        })?;

    let mut column_dims = da_full.dims().to_vec();
    column_dims.remove(axis);
    let mut column_shape = da_full.shape().to_vec();
    column_shape.remove(axis);

    let same_dims = da.ndim() == column_dims.len() && column_dims.iter().all(|d| da.has_dim(d));
    if !same_dims {
        return Err(OceanPostError::mismatch(format!(
            "boundary flux dims {:?} do not match {:?} without '{zdim}'",
            da.dims(),
            da_full.dims()
        )));
    }

    if let Some((dim, len)) = column_dims
        .iter()
        .zip(&column_shape)
        .find(|&(d, &n)| da.len_of(d) != Some(n))
    {
        return Err(OceanPostError::mismatch(format!(
            "boundary flux has length {:?} along '{dim}', {} has {len}",
            da.len_of(dim),
            da_full.label()
        )));
    }

    let boundary = da.variable().broadcast_owned(&column_dims, &column_shape)?;
    let nz = da_full.shape()[axis];
    if nz == 0 {
        return Err(OceanPostError::InvalidArgument(format!(
            "dimension '{zdim}' of {} is empty",
            da_full.label()
        )));
    }
    let level = if top { 0 } else { nz - 1 };

    let mut data = ArrayD::<f64>::zeros(IxDyn(da_full.shape()));
    data.index_axis_mut(Axis(axis), level).assign(&boundary);

    let mut out = DataArray::from_variable(
        Variable::new(da_full.dims().to_vec(), data)?.with_attrs(da.attrs().clone()),
    );
    if let Some(name) = da.name() {
        out = out.with_name(name);
    }
    for (cname, coord) in da_full.coords() {
        out = out.with_coord(cname, coord.clone())?;
    }
    Ok(out)
}

/// Interpret the time axis as days after 1 January of `refyear + 1`
///
/// The numeric values are untouched; the coordinate's CF units are rewritten
/// so decoded times equal `datetime(refyear + 1, 1, 1) + days`, and the
/// dataset records `refyear_shift`.
pub fn time_add_refyear(ds: &Dataset, timedim: &str, refyear: i32) -> Result<Dataset> {
    let mut out = ds.clone();
    let time = out
        .coord_mut(timedim)
        .ok_or_else(|| OceanPostError::VariableNotFound {
            var: timedim.to_string(),
        })?;
    let attrs = time.attrs_mut();
    attrs.insert(
        "units".to_string(),
        format!("days since {:04}-01-01 00:00:00", refyear + 1).into(),
    );
    attrs.insert("calendar".to_string(), "proleptic_gregorian".into());
    out.set_attr("refyear_shift", refyear);

    // Fail early if the new axis cannot be decoded
    out.decode_times(timedim)?;
    Ok(out)
}

/// Rename pairs applied to a grid-spec file before merging
pub fn default_grid_rename() -> Vec<(String, String)> {
    vec![
        ("gridlon_t".to_string(), "xt_ocean".to_string()),
        ("gridlat_t".to_string(), "yt_ocean".to_string()),
    ]
}

/// Add cell area, layer thickness and cell volume as coordinates
///
/// `dzt = rho_dzt / RHO0` follows the Boussinesq approximation, and
/// `volume = dzt * area_t`.
pub fn add_grid_geometry(
    ds: &Dataset,
    rho_dzt: &DataArray,
    grid_ds: &Dataset,
    rename: &[(String, String)],
) -> Result<Dataset> {
    let names = GridNames::default();
    add_grid_geometry_with(ds, rho_dzt, grid_ds, rename, &names.area)
}

/// [`add_grid_geometry`] with an explicit name for the area variable
pub fn add_grid_geometry_with(
    ds: &Dataset,
    rho_dzt: &DataArray,
    grid_ds: &Dataset,
    rename: &[(String, String)],
    area_name: &str,
) -> Result<Dataset> {
    let pairs: Vec<(&str, &str)> = rename
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    let grid_ds = grid_ds.rename(&pairs)?;
    let area = grid_ds.get(area_name)?;

    let dzt = rho_dzt.div_scalar(RHO0).with_name("dzt");
    let volume = dzt.mul(&area)?.with_name("volume");

    info!("📐 Adding grid geometry ({area_name}, dzt, volume)");
    ds.clone()
        .assign_coords(area_name, area)?
        .assign_coords("dzt", dzt)?
        .assign_coords("volume", volume)?
        .assign_coords("rho_dzt", rho_dzt.clone())
}

/// [`add_grid_geometry`] reading the grid-spec from a NetCDF file
pub fn add_grid_geometry_from_path(
    ds: &Dataset,
    rho_dzt: &DataArray,
    gridspec_path: &Path,
    rename: &[(String, String)],
) -> Result<Dataset> {
    let grid_ds = open_dataset(gridspec_path)?;
    add_grid_geometry(ds, rho_dzt, &grid_ds, rename)
}

/// Add a tracking variable that is one wherever `refvar` is valid
pub fn ds_add_track_dummy(ds: &Dataset, refvar: &str) -> Result<Dataset> {
    let ones = ds.get(refvar)?.mapv(|x| x * 0.0 + 1.0).with_attrs(Default::default());
    ds.clone().assign(TRACK_DUMMY, ones)
}
