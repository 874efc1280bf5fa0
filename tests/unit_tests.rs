//! Unit tests for the in-memory parts of ocean_post
//!
//! Labeled containers, reductions, weighting and the processing helpers,
//! all on small hand-built datasets.

use approx::assert_abs_diff_eq;
use ndarray::{array, ArrayD, IxDyn};
use ocean_post::config::{GridNames, MetricsConfig};
use ocean_post::errors::{OceanPostError, Result};
use ocean_post::labeled::{AttrValue, DataArray, Dataset, Variable};
use ocean_post::parallel::ParallelConfig;
use ocean_post::processing::{
    add_grid_geometry, convert_boundary_flux, convert_units, default_grid_rename,
    ds_add_track_dummy, mask_tracer, shift_lon, time_add_refyear, ShiftLon, TRACK_DUMMY,
};
use ocean_post::statistics::{StatOperation, StatisticalReduction};
use ocean_post::weighted::{
    weighted_mean, weighted_mean_ds, weighted_sum, weighted_sum_raw, weighted_sum_ds,
};

const DIMS4: [&str; 4] = ["time", "st_ocean", "yt_ocean", "xt_ocean"];

/// time(2) x st_ocean(2) x yt_ocean(2) x xt_ocean(3), NaN at the (0, 0) column
fn ocean_ds() -> Result<Dataset> {
    let temp = ArrayD::from_shape_fn(IxDyn(&[2, 2, 2, 3]), |ix| {
        if ix[2] == 0 && ix[3] == 0 {
            f64::NAN
        } else {
            (ix[0] * 100 + ix[1] * 10 + ix[2] * 3 + ix[3]) as f64
        }
    });
    let mut ds = Dataset::new();
    ds.insert_data_var("temp", Variable::new(DIMS4, temp)?.with_attr("units", "degC"))?;
    ds.insert_coord(
        "time",
        Variable::coordinate("time", vec![0.0, 400.0]).with_attr("units", "days since 2000-01-01"),
    )?;
    ds.insert_coord("st_ocean", Variable::coordinate("st_ocean", vec![5.0, 15.0]))?;
    ds.insert_coord("yt_ocean", Variable::coordinate("yt_ocean", vec![-10.0, 10.0]))?;
    ds.insert_coord("xt_ocean", Variable::coordinate("xt_ocean", vec![-90.0, 0.0, 90.0]))?;
    Ok(ds)
}

fn value(ds: &Dataset, name: &str, index: &[usize]) -> f64 {
    ds.data_var(name)
        .or_else(|| ds.coord(name))
        .map(|v| v.data()[IxDyn(index)])
        .unwrap_or(f64::NAN)
}

#[test]
fn test_error_messages() {
    let err = OceanPostError::GridTypeNotRecognized {
        u: "(right, right)".to_string(),
        v: "(center, right)".to_string(),
    };
    assert!(err.to_string().starts_with("Gridtype not recognized"));

    let err = OceanPostError::VariableNotFound {
        var: "temp".to_string(),
    };
    assert!(err.to_string().contains("Variable 'temp' not found"));

    let err = OceanPostError::InvalidArgument("plain message".to_string());
    assert_eq!(err.to_string(), "plain message");

    let err: OceanPostError = "generic".into();
    assert_eq!(err.to_string(), "generic");
}

#[test]
fn test_parallel_config() {
    assert!(ParallelConfig::default().num_threads.is_none());
    assert_eq!(ParallelConfig::with_threads(4).num_threads, Some(4));
    let all = ParallelConfig::all_cores();
    assert!(all.num_threads.unwrap_or(0) > 0);
    assert!(all.current_threads() > 0);
}

#[test]
fn test_metrics_config_from_json() -> Result<()> {
    let cfg = MetricsConfig::from_json_str(
        r#"{"compute_average": true, "names": {"zdim": "depth", "tdim": "TIME"}}"#,
    )?;
    assert!(cfg.compute_average);
    assert!(!cfg.drop_control);
    assert_eq!(cfg.names.zdim, "depth");
    assert_eq!(cfg.names.tdim, "TIME");
    assert_eq!(cfg.names.xdim, GridNames::default().xdim);
    assert_eq!(cfg.threshold_dim, "omz_thresholds");

    let err = MetricsConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, OceanPostError::ConfigError(_)));
    Ok(())
}

#[test]
fn test_variable_validation() {
    let data = array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
    assert!(Variable::new(["x"], data.clone()).is_err());
    assert!(Variable::new(["x", "x"], data.clone()).is_err());
    assert!(Variable::new(["y", "x"], data).is_ok());
}

#[test]
fn test_reduce_axes_skips_nan() -> Result<()> {
    let data = array![[1.0, f64::NAN, 3.0], [f64::NAN, f64::NAN, f64::NAN]].into_dyn();

    let sum = data.reduce_axes(&[1], StatOperation::Sum)?;
    assert_eq!(sum.as_slice(), Some(&[4.0, 0.0][..]));

    let mean = data.reduce_axes(&[1], StatOperation::Mean)?;
    assert_eq!(mean[[0]], 2.0);
    assert!(mean[[1]].is_nan());

    let std = data.reduce_axes(&[1], StatOperation::Std)?;
    assert_abs_diff_eq!(std[[0]], 1.0, epsilon = 1e-12);

    let max = data.reduce_axes(&[0, 1], StatOperation::Max)?;
    assert_eq!(max.ndim(), 0);
    assert_eq!(max[IxDyn(&[])], 3.0);

    assert!(data.reduce_axes(&[2], StatOperation::Sum).is_err());
    assert!(data.reduce_axes(&[0], StatOperation::Quantile(1.5)).is_err());
    Ok(())
}

#[test]
fn test_dataarray_broadcasting_and_masking() -> Result<()> {
    let a = DataArray::new(["y", "x"], array![[1.0, 2.0], [3.0, 4.0]].into_dyn())?
        .with_name("a")
        .with_index("x", vec![0.5, 1.5])?;
    let b = DataArray::new(["x"], array![10.0, 100.0].into_dyn())?;

    let product = a.mul(&b)?;
    assert_eq!(product.dims(), ["y", "x"]);
    assert_eq!(product.data()[[1, 1]], 400.0);
    assert_eq!(product.name(), Some("a"));
    assert!(product.coord("x").is_some());

    let short = DataArray::new(["x"], array![1.0, 2.0, 3.0].into_dyn())?;
    assert!(matches!(
        a.add(&short),
        Err(OceanPostError::DimensionMismatch { .. })
    ));

    let masked = a.where_by(&b, |v| v > 50.0)?;
    assert!(masked.data()[[0, 0]].is_nan());
    assert_eq!(masked.data()[[0, 1]], 2.0);

    let nan_mask = DataArray::new(["x"], array![f64::NAN, 1.0].into_dyn())?;
    let masked = a.where_by(&nan_mask, |v| v.is_nan() || v > 0.0)?;
    assert!(masked.data()[[1, 0]].is_finite());
    Ok(())
}

#[test]
fn test_dataarray_reductions() -> Result<()> {
    let da = DataArray::new(["t", "x"], array![[1.0, 2.0, 3.0, 4.0], [2.0, 2.0, 2.0, 2.0]].into_dyn())?
        .with_index("x", vec![0.0, 1.0, 2.0, 3.0])?
        .with_index("t", vec![10.0, 20.0])?;

    let q = da.quantile(0.25, &["x"])?;
    assert_eq!(q.dims(), ["t"]);
    assert_abs_diff_eq!(q.data()[[0]], 1.75, epsilon = 1e-12);
    assert!(q.coord("x").is_none());
    assert!(q.coord("t").is_some());

    let mean = da.mean(&["t", "x"])?;
    assert_eq!(mean.ndim(), 0);
    assert_abs_diff_eq!(mean.data()[IxDyn(&[])], 2.25, epsilon = 1e-12);

    match da.sum(&["depth"]) {
        Err(OceanPostError::DimensionNotFound { dim, .. }) => assert_eq!(dim, "depth"),
        other => panic!("expected DimensionNotFound, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_selection_and_concat() -> Result<()> {
    let da = DataArray::new(["t", "x"], array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn())?
        .with_index("t", vec![30.0, 10.0, 20.0])?;

    let step = da.sel("t", 10.0)?;
    assert_eq!(step.dims(), ["x"]);
    assert_eq!(step.coord("t").and_then(Variable::scalar_value), Some(10.0));
    assert!(da.sel("t", 11.0).is_err());
    assert!(da.isel("t", 3).is_err());

    let sorted = da.sortby("t")?;
    assert_eq!(sorted.index_values("t")?, vec![10.0, 20.0, 30.0]);
    assert_eq!(sorted.data()[[0, 0]], 3.0);

    let pieces = vec![da.isel("t", 2)?, da.isel("t", 0)?];
    let joined = DataArray::concat(&pieces, "t", None)?;
    assert_eq!(joined.dims(), ["t", "x"]);
    assert_eq!(joined.index_values("t")?, vec![20.0, 30.0]);
    assert_eq!(joined.data()[[1, 1]], 2.0);

    let range = da.isel_range("t", 1..3)?;
    assert_eq!(range.shape(), &[2, 2]);
    assert_eq!(range.index_values("t")?, vec![10.0, 20.0]);
    Ok(())
}

#[test]
fn test_dataset_structure() -> Result<()> {
    let mut ds = ocean_ds()?;
    assert_eq!(ds.dims().get("xt_ocean"), Some(&3));

    let wrong = Variable::new(["xt_ocean"], array![1.0, 2.0].into_dyn())?;
    assert!(ds.insert_data_var("bad", wrong).is_err());

    let temp = ds.get("temp")?;
    assert_eq!(temp.coords().len(), 4);
    assert_eq!(temp.attrs().get("units").and_then(AttrValue::as_str), Some("degC"));

    assert!(ds.clone().drop_vars(&["nope"]).is_err());
    let renamed = ds.rename(&[("temp", "theta"), ("xt_ocean", "lon")])?;
    assert!(renamed.contains("theta"));
    assert_eq!(renamed.dims().get("lon"), Some(&3));
    assert!(ds.rename(&[("missing", "x")]).is_err());

    let times = ds.decode_times("time")?;
    assert_eq!(times[1].to_string(), "2001-02-04 00:00:00");
    ds.set_attr("title", "test");
    assert_eq!(ds.attrs().len(), 1);
    Ok(())
}

#[test]
fn test_weighted_mean_masks_weights() -> Result<()> {
    let data = DataArray::new(["y", "x"], array![[1.0, 2.0], [f64::NAN, 4.0]].into_dyn())?;
    let weight = DataArray::new(["y", "x"], array![[1.0, 1.0], [2.0, 2.0]].into_dyn())?;

    let (summed, weights) = weighted_sum_raw(&data, &weight, None, true)?;
    assert_abs_diff_eq!(summed.data()[IxDyn(&[])], 11.0, epsilon = 1e-12);
    assert_abs_diff_eq!(weights.data()[IxDyn(&[])], 4.0, epsilon = 1e-12);

    let mean = weighted_mean(&data, &weight, None, true)?;
    assert_abs_diff_eq!(mean.data()[IxDyn(&[])], 2.75, epsilon = 1e-12);

    let zonal = weighted_mean(&data, &weight, Some(&["x"]), true)?;
    assert_eq!(zonal.dims(), ["y"]);
    assert_abs_diff_eq!(zonal.data()[[0]], 1.5, epsilon = 1e-12);
    assert_abs_diff_eq!(zonal.data()[[1]], 4.0, epsilon = 1e-12);

    let total = weighted_sum(&data, &weight, Some(&["y", "x"]), false)?;
    assert_abs_diff_eq!(total.data()[IxDyn(&[])], 11.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_weighted_dimcheck() -> Result<()> {
    let data = DataArray::new(["y", "x"], array![[1.0, 2.0], [3.0, 4.0]].into_dyn())?;
    let foreign = DataArray::new(["z"], array![1.0, 1.0].into_dyn())?;
    assert!(matches!(
        weighted_sum(&data, &foreign, None, true),
        Err(OceanPostError::DimensionMismatch { .. })
    ));

    let meridional = DataArray::new(["y"], array![1.0, 3.0].into_dyn())?;
    assert!(weighted_mean(&data, &meridional, Some(&["x"]), true).is_err());
    let unchecked = weighted_mean(&data, &meridional, Some(&["x"]), false)?;
    assert_abs_diff_eq!(unchecked.data()[[1]], 3.5, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_weighted_dataset_passes_through() -> Result<()> {
    let mut ds = Dataset::new();
    ds.insert_data_var("field", Variable::new(["y", "x"], array![[1.0, 3.0], [5.0, 7.0]].into_dyn())?)?;
    ds.insert_data_var("row", Variable::new(["y"], array![2.0, 4.0].into_dyn())?)?;
    ds.insert_data_var("series", Variable::new(["t"], array![9.0, 8.0, 7.0].into_dyn())?)?;
    let area = DataArray::new(["y", "x"], array![[1.0, 1.0], [1.0, 3.0]].into_dyn())?;

    let sums = weighted_sum_ds(&ds, &area, &["y", "x"], false)?;
    assert_abs_diff_eq!(value(&sums, "field", &[]), 1.0 + 3.0 + 5.0 + 21.0, epsilon = 1e-12);
    assert_eq!(sums.data_var("row").map(Variable::dims), Some(&["x".to_string()][..]));
    assert_eq!(sums.data_var("series"), ds.data_var("series"));

    let means = weighted_mean_ds(&ds, &area, &["y", "x"], false)?;
    assert_abs_diff_eq!(value(&means, "field", &[]), 30.0 / 6.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_convert_units() -> Result<()> {
    let ds = ocean_ds()?;
    let out = convert_units(&ds, "temp", "centi-degC", 100.0)?;
    assert_eq!(value(&out, "temp", &[0, 0, 1, 2]), 500.0);
    assert_eq!(
        out.data_var("temp")
            .and_then(|v| v.attrs().get("units"))
            .and_then(AttrValue::as_str),
        Some("centi-degC")
    );
    assert_eq!(value(&ds, "temp", &[0, 0, 1, 2]), 5.0);

    assert!(matches!(
        convert_units(&ds, "salt", "psu", 1.0),
        Err(OceanPostError::VariableNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_shift_lon() -> Result<()> {
    let ds = ocean_ds()?;
    let shifted = shift_lon(&ds, "xt_ocean", ShiftLon::default())?;
    assert_eq!(shifted.index_values("xt_ocean")?, vec![0.0, 90.0, 270.0]);
    // the old first column moved to the end
    assert_eq!(value(&shifted, "temp", &[0, 0, 1, 2]), value(&ds, "temp", &[0, 0, 1, 0]));

    let unsorted = shift_lon(
        &ds,
        "xt_ocean",
        ShiftLon {
            sort: false,
            ..ShiftLon::default()
        },
    )?;
    assert_eq!(unsorted.index_values("xt_ocean")?, vec![270.0, 0.0, 90.0]);

    let larger = shift_lon(
        &ds,
        "xt_ocean",
        ShiftLon {
            shift: -360.0,
            crit: 45.0,
            smaller: false,
            sort: true,
        },
    )?;
    assert_eq!(larger.index_values("xt_ocean")?, vec![-270.0, -90.0, 0.0]);
    Ok(())
}

#[test]
fn test_mask_tracer_stacks_levels() -> Result<()> {
    let ds = ocean_ds()?;
    let mask = ds.get("temp")?;
    let masked = mask_tracer(&ds, &mask, &[5.0, 50.0], "thr")?;

    let temp = masked.get("temp")?;
    assert_eq!(temp.dims(), ["thr", "time", "st_ocean", "yt_ocean", "xt_ocean"]);
    assert_eq!(masked.index_values("thr")?, vec![5.0, 50.0]);

    assert_eq!(value(&masked, "temp", &[0, 0, 0, 1, 2]), 5.0);
    assert!(value(&masked, "temp", &[0, 0, 1, 0, 1]).is_nan());
    assert_eq!(value(&masked, "temp", &[1, 0, 1, 0, 1]), 11.0);
    assert!(value(&masked, "temp", &[1, 1, 0, 0, 1]).is_nan());
    // NaN in the mask never passes
    assert!(value(&masked, "temp", &[1, 0, 0, 0, 0]).is_nan());

    assert!(mask_tracer(&ds, &mask, &[], "thr").is_err());
    Ok(())
}

#[test]
fn test_convert_boundary_flux() -> Result<()> {
    let ds = ocean_ds()?;
    let full = ds.get("temp")?;
    let flux = DataArray::new(
        ["xt_ocean", "yt_ocean", "time"],
        ArrayD::from_shape_fn(IxDyn(&[3, 2, 2]), |ix| (1 + ix[0] + 10 * ix[1] + 100 * ix[2]) as f64),
    )?
    .with_name("surface_flux");

    let top = convert_boundary_flux(&flux, &full, "st_ocean", true)?;
    assert_eq!(top.dims(), DIMS4);
    assert_eq!(top.name(), Some("surface_flux"));
    assert_eq!(top.data()[[1, 0, 1, 2]], 113.0);
    assert_eq!(top.data()[[1, 1, 1, 2]], 0.0);
    assert!(top.coord("st_ocean").is_some());

    let bottom = convert_boundary_flux(&flux, &full, "st_ocean", false)?;
    assert_eq!(bottom.data()[[1, 0, 1, 2]], 0.0);
    assert_eq!(bottom.data()[[1, 1, 1, 2]], 113.0);

    let partial = DataArray::new(["time", "xt_ocean"], ArrayD::zeros(IxDyn(&[2, 3])))?;
    assert!(matches!(
        convert_boundary_flux(&partial, &full, "st_ocean", true),
        Err(OceanPostError::DimensionMismatch { .. })
    ));

    // a length-one horizontal axis must not be broadcast over the column
    let squeezed = DataArray::new(
        ["time", "yt_ocean", "xt_ocean"],
        ArrayD::ones(IxDyn(&[2, 1, 3])),
    )?;
    let err = convert_boundary_flux(&squeezed, &full, "st_ocean", true).unwrap_err();
    assert!(matches!(err, OceanPostError::DimensionMismatch { .. }));
    assert!(err.to_string().contains("yt_ocean"));
    Ok(())
}

#[test]
fn test_time_add_refyear() -> Result<()> {
    let ds = ocean_ds()?;
    let shifted = time_add_refyear(&ds, "time", 1900)?;
    let times = shifted.decode_times("time")?;
    assert_eq!(times[0].to_string(), "1901-01-01 00:00:00");
    assert_eq!(times[1].to_string(), "1902-02-05 00:00:00");
    assert_eq!(shifted.attrs().get("refyear_shift"), Some(&AttrValue::Int(1900)));
    assert_eq!(shifted.index_values("time")?, ds.index_values("time")?);
    Ok(())
}

#[test]
fn test_add_grid_geometry() -> Result<()> {
    let ds = ocean_ds()?;
    let mut grid = Dataset::new();
    grid.insert_data_var(
        "area_t",
        Variable::new(["gridlat_t", "gridlon_t"], array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn())?,
    )?;
    let rho_dzt = DataArray::new(
        ["st_ocean", "yt_ocean", "xt_ocean"],
        ArrayD::from_shape_fn(IxDyn(&[2, 2, 3]), |ix| 1035.0 * (ix[0] + 1) as f64),
    )?;

    let out = add_grid_geometry(&ds, &rho_dzt, &grid, &default_grid_rename())?;
    for name in ["area_t", "dzt", "volume", "rho_dzt"] {
        assert!(out.coord(name).is_some(), "missing coordinate {name}");
    }
    assert_abs_diff_eq!(value(&out, "dzt", &[1, 0, 0]), 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(value(&out, "volume", &[1, 1, 2]), 12.0, epsilon = 1e-12);
    assert!(out.data_var("temp").is_some());

    let bad_rename = vec![("gridlon_u".to_string(), "xu_ocean".to_string())];
    assert!(matches!(
        add_grid_geometry(&ds, &rho_dzt, &grid, &bad_rename),
        Err(OceanPostError::VariableNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_track_dummy_follows_valid_cells() -> Result<()> {
    let ds = ds_add_track_dummy(&ocean_ds()?, "temp")?;
    assert_eq!(value(&ds, TRACK_DUMMY, &[1, 1, 1, 2]), 1.0);
    assert!(value(&ds, TRACK_DUMMY, &[1, 1, 0, 0]).is_nan());
    assert!(ds_add_track_dummy(&ds, "salt").is_err());
    Ok(())
}
