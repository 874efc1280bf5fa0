//! Weighted aggregation of labeled arrays
//!
//! Weights are masked wherever the data is NaN before being summed, so a
//! weighted mean over a partially missing field is normalised only by the
//! weight of the valid cells.

use crate::errors::{OceanPostError, Result};
use crate::labeled::{DataArray, Dataset};

fn resolve_dims<'a>(data: &'a DataArray, dims: Option<&[&'a str]>) -> Vec<&'a str> {
    match dims {
        Some(dims) => dims.to_vec(),
        None => data.dims().iter().map(String::as_str).collect(),
    }
}

fn check_weight_dims(data: &DataArray, weight: &DataArray, dims: &[&str]) -> Result<()> {
    if let Some(extra) = weight.dims().iter().find(|d| !data.has_dim(d)) {
        return Err(OceanPostError::mismatch(format!(
            "weights have dimension '{extra}' not present on {}",
            data.label()
        )));
    }
    if let Some(missing) = dims.iter().find(|d| !weight.has_dim(d)) {
        return Err(OceanPostError::mismatch(format!(
            "cannot reduce over '{missing}': weights only have {:?}",
            weight.dims()
        )));
    }
    Ok(())
}

/// Weighted sum of `data` and the sum of the valid weights over `dims`
///
/// `dims = None` reduces over every dimension of the data. With `dimcheck`
/// the weights may not carry dimensions absent from the data and must cover
/// every reduced dimension.
pub fn weighted_sum_raw(
    data: &DataArray,
    weight: &DataArray,
    dims: Option<&[&str]>,
    dimcheck: bool,
) -> Result<(DataArray, DataArray)> {
    let dims = resolve_dims(data, dims);
    if dimcheck {
        check_weight_dims(data, weight, &dims)?;
    }
    let weight_expanded = weight.where_by(data, |x| !x.is_nan())?;
    let summed = data.mul(&weight_expanded)?.sum(&dims)?;
    let weight_sum = weight_expanded.sum(&dims)?;
    Ok((summed, weight_sum))
}

/// Weighted sum over `dims`
pub fn weighted_sum(
    data: &DataArray,
    weight: &DataArray,
    dims: Option<&[&str]>,
    dimcheck: bool,
) -> Result<DataArray> {
    weighted_sum_raw(data, weight, dims, dimcheck).map(|(summed, _)| summed)
}

/// Weighted mean over `dims`, normalised by the weight of valid cells
pub fn weighted_mean(
    data: &DataArray,
    weight: &DataArray,
    dims: Option<&[&str]>,
    dimcheck: bool,
) -> Result<DataArray> {
    let (summed, weight_sum) = weighted_sum_raw(data, weight, dims, dimcheck)?;
    summed.div(&weight_sum)
}

fn per_variable(
    ds: &Dataset,
    dims: &[&str],
    f: impl Fn(&DataArray, &[&str]) -> Result<DataArray>,
) -> Result<Dataset> {
    ds.map_data_vars(|_, da| {
        let present: Vec<&str> = dims.iter().copied().filter(|d| da.has_dim(d)).collect();
        if present.is_empty() {
            Ok(da.clone())
        } else {
            f(da, &present)
        }
    })
}

/// [`weighted_sum`] applied to every data variable of a dataset
///
/// Each variable is reduced over the requested dimensions it has; variables
/// with none of them are passed through.
pub fn weighted_sum_ds(
    ds: &Dataset,
    weight: &DataArray,
    dims: &[&str],
    dimcheck: bool,
) -> Result<Dataset> {
    per_variable(ds, dims, |da, present| {
        weighted_sum(da, weight, Some(present), dimcheck)
    })
}

/// [`weighted_mean`] applied to every data variable of a dataset
pub fn weighted_mean_ds(
    ds: &Dataset,
    weight: &DataArray,
    dims: &[&str],
    dimcheck: bool,
) -> Result<Dataset> {
    per_variable(ds, dims, |da, present| {
        weighted_mean(da, weight, Some(present), dimcheck)
    })
}
