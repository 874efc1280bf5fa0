//! Area- and volume-weighted metrics of a model dataset
//!
//! Four reductions are computed from one dataset: zonal and meridional
//! sections, a horizontally integrated profile and a volume integrated
//! timeseries. They can be saved to and loaded from NetCDF files named after
//! the metric, and inspected with a standard set of control plots.

use crate::config::{GridNames, MetricsConfig};
use crate::errors::{OceanPostError, Result};
use crate::labeled::{DataArray, Dataset};
use crate::netcdf_io::{open_dataset, to_netcdf};
use crate::plotting::{Axes, Figure, Heatmap};
use crate::processing::TRACK_DUMMY;
use crate::statistics::{reduce_lane, StatOperation};
use crate::weighted::{weighted_mean_ds, weighted_sum_ds};
use chrono::Datelike;
use log::{info, warn};
use ndarray::{Array1, Ix2};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Renamed tracking variable of summed sections and profiles
pub const INTEGRATED_AREA: &str = "integrated_area";
/// Renamed tracking variable of the summed timeseries
pub const INTEGRATED_VOLUME: &str = "integrated_volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    XSection,
    YSection,
    Profile,
    Timeseries,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::XSection,
        MetricKind::YSection,
        MetricKind::Profile,
        MetricKind::Timeseries,
    ];

    /// Key used in file names
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::XSection => "x_section",
            MetricKind::YSection => "y_section",
            MetricKind::Profile => "profile",
            MetricKind::Timeseries => "timeseries",
        }
    }
}

/// One dataset per [`MetricKind`]
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub x_section: Dataset,
    pub y_section: Dataset,
    pub profile: Dataset,
    pub timeseries: Dataset,
    /// Time dimension used to split files by year
    pub tdim: String,
}

impl Metrics {
    pub fn get(&self, kind: MetricKind) -> &Dataset {
        match kind {
            MetricKind::XSection => &self.x_section,
            MetricKind::YSection => &self.y_section,
            MetricKind::Profile => &self.profile,
            MetricKind::Timeseries => &self.timeseries,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, &Dataset)> {
        MetricKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Compute all metrics of `ds`
///
/// Averaged metrics are weighted means; otherwise weighted sums in which
/// the tracking variable becomes the integrated area or volume.
pub fn metrics_ds(ds: &Dataset, cfg: &MetricsConfig) -> Result<Metrics> {
    let GridNames {
        xdim,
        ydim,
        zdim,
        tdim,
        area,
        volume,
    } = &cfg.names;
    let area = ds.get(area)?;
    let volume = ds.get(volume)?;
    let (x, y, z) = (xdim.as_str(), ydim.as_str(), zdim.as_str());

    let mut metrics = if cfg.compute_average {
        Metrics {
            x_section: weighted_mean_ds(ds, &area, &[y], false)?,
            y_section: weighted_mean_ds(ds, &area, &[x], false)?,
            profile: weighted_mean_ds(ds, &area, &[x, y], true)?,
            timeseries: weighted_mean_ds(ds, &volume, &[x, y, z], true)?,
            tdim: tdim.clone(),
        }
    } else {
        let rename = |sum: Dataset, to: &str| -> Result<Dataset> {
            sum.rename(&[(TRACK_DUMMY, to)])
        };
        Metrics {
            x_section: rename(weighted_sum_ds(ds, &area, &[y], false)?, INTEGRATED_AREA)?,
            y_section: rename(weighted_sum_ds(ds, &area, &[x], false)?, INTEGRATED_AREA)?,
            profile: rename(weighted_sum_ds(ds, &volume, &[x, y], true)?, INTEGRATED_AREA)?,
            timeseries: rename(
                weighted_sum_ds(ds, &volume, &[x, y, z], true)?,
                INTEGRATED_VOLUME,
            )?,
            tdim: tdim.clone(),
        }
    };

    if cfg.compute_average && cfg.drop_control {
        for part in [
            &mut metrics.x_section,
            &mut metrics.y_section,
            &mut metrics.profile,
            &mut metrics.timeseries,
        ] {
            *part = std::mem::take(part).drop_vars(&[TRACK_DUMMY])?;
        }
    }
    info!(
        "📊 Computed {} metrics for {} variables",
        if cfg.compute_average { "averaged" } else { "integrated" },
        ds.data_vars().len()
    );
    Ok(metrics)
}

fn metric_path(odir: &Path, fname: &str, kind: MetricKind) -> PathBuf {
    odir.join(format!("{fname}_{}.nc", kind.as_str()))
}

/// Write every metric to `{odir}/{fname}_{key}.nc`
///
/// With `mf_save` each metric is split by calendar year of its time axis and
/// written to `{odir}/{YYYY}_{fname}_{key}.nc`. Returns the written paths.
pub fn metrics_save(
    metrics: &Metrics,
    odir: &Path,
    fname: &str,
    mf_save: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(odir)?;
    let mut written = Vec::new();
    for (kind, ds) in metrics.iter() {
        if !mf_save || !ds.dims().contains_key(&metrics.tdim) {
            if mf_save {
                warn!(
                    "⚠ {} has no '{}' axis, saving it as a single file",
                    kind.as_str(),
                    metrics.tdim
                );
            }
            let path = metric_path(odir, fname, kind);
            to_netcdf(ds, &path)?;
            written.push(path);
            continue;
        }

        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, t) in ds.decode_times(&metrics.tdim)?.iter().enumerate() {
            by_year.entry(t.year()).or_default().push(i);
        }
        for (year, indices) in by_year {
            let path = odir.join(format!("{year:04}_{fname}_{}.nc", kind.as_str()));
            to_netcdf(&ds.isel_indices(&metrics.tdim, &indices)?, &path)?;
            written.push(path);
        }
    }
    info!("💾 Saved {} metric files to {}", written.len(), odir.display());
    Ok(written)
}

/// Read the four files written by [`metrics_save`] without `mf_save`
pub fn metrics_load(odir: &Path, fname: &str) -> Result<Metrics> {
    let load = |kind| open_dataset(&metric_path(odir, fname, kind));
    Ok(Metrics {
        x_section: load(MetricKind::XSection)?,
        y_section: load(MetricKind::YSection)?,
        profile: load(MetricKind::Profile)?,
        timeseries: load(MetricKind::Timeseries)?,
        tdim: GridNames::default().tdim,
    })
}

fn plot_series(ax: &mut Axes, da: &DataArray, label: Option<String>) -> Result<()> {
    if da.ndim() != 1 {
        return Err(OceanPostError::InvalidArgument(format!(
            "cannot draw {} with dimensions {:?} as a line",
            da.label(),
            da.dims()
        )));
    }
    let x = da.index_values(&da.dims()[0])?;
    let y = da.data().iter().copied().collect();
    ax.plot(x, y)?;
    if let Some(line) = ax.lines.last_mut() {
        line.label = label;
    }
    Ok(())
}

/// One line per threshold when `thr_dim` is present, otherwise one line
fn plot_by_threshold(ax: &mut Axes, da: &DataArray, thr_dim: &str) -> Result<()> {
    if !da.has_dim(thr_dim) {
        return plot_series(ax, da, None);
    }
    for (k, level) in da.index_values(thr_dim)?.iter().enumerate() {
        plot_series(ax, &da.isel(thr_dim, k)?, Some(format!("{thr_dim} = {level}")))?;
    }
    Ok(())
}

/// 2nd and 98th percentile of the finite values
fn robust_limits(arrays: &[&DataArray]) -> (f64, f64) {
    let values: Array1<f64> = arrays
        .iter()
        .flat_map(|da| da.data().iter().copied())
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return (0.0, 1.0);
    }
    (
        reduce_lane(values.view(), StatOperation::Quantile(0.02)),
        reduce_lane(values.view(), StatOperation::Quantile(0.98)),
    )
}

fn section_heatmap(da: &DataArray, hdim: &str, zdim: &str, limits: (f64, f64)) -> Result<Heatmap> {
    if da.ndim() != 2 || !da.has_dim(hdim) || !da.has_dim(zdim) {
        return Err(OceanPostError::mismatch(format!(
            "section of {} needs dimensions ['{zdim}', '{hdim}'], got {:?}",
            da.label(),
            da.dims()
        )));
    }
    let da = da.transpose(&[zdim.to_string(), hdim.to_string()])?;
    Ok(Heatmap {
        x: da.index_values(hdim)?,
        y: da.index_values(zdim)?,
        values: da.data().clone().into_dimensionality::<Ix2>()?,
        vmin: limits.0,
        vmax: limits.1,
    })
}

/// Section figure at the first time step, faceted by threshold
fn section_figure(da: &DataArray, hdim: &str, cfg: &MetricsConfig, title: String) -> Result<Figure> {
    let zdim = cfg.names.zdim.as_str();
    let thr_dim = cfg.threshold_dim.as_str();
    let panels: Vec<(DataArray, Option<f64>)> = match da.len_of(thr_dim) {
        Some(n) => {
            let levels = da.index_values(thr_dim)?;
            (0..n)
                .map(|k| Ok((da.isel(thr_dim, k)?, levels.get(k).copied())))
                .collect::<Result<_>>()?
        }
        None => vec![(da.clone(), None)],
    };
    let limits = robust_limits(&panels.iter().map(|(p, _)| p).collect::<Vec<_>>());

    let mut fig = Figure::new(1, panels.len());
    fig.title = Some(title);
    for (ax, (panel, level)) in fig.axes_mut().iter_mut().zip(&panels) {
        ax.pcolormesh(section_heatmap(panel, hdim, zdim, limits)?)?;
        ax.y_increasing = false;
        ax.xlabel = Some(hdim.to_string());
        ax.ylabel = Some(zdim.to_string());
        if let Some(level) = level {
            ax.set_title(format!("{thr_dim} = {level}"));
        }
    }
    Ok(fig)
}

/// Figures for a visual sanity check of integrated metrics
///
/// The first figure holds one row per timeseries variable: summed values on
/// the left and values per integrated volume on the right. Then, for each
/// section variable and both section directions, the section at the first
/// time step and the same section per integrated area.
pub fn metrics_control_plots(metrics: &Metrics, cfg: &MetricsConfig) -> Result<Vec<Figure>> {
    let names = &cfg.names;
    let thr_dim = cfg.threshold_dim.as_str();
    let ts = &metrics.timeseries;
    let ts_vars = ts.data_var_names();
    let integrated_volume = ts.get(INTEGRATED_VOLUME)?;

    let mut figures = Vec::new();
    let mut fig = Figure::new(ts_vars.len(), 2);
    fig.title = Some("timeseries".to_string());
    for (row, var) in ts_vars.iter().enumerate() {
        let da = ts.get(var)?;
        let ax = fig.ax_mut(row, 0)?;
        plot_by_threshold(ax, &da, thr_dim)?;
        ax.set_title(var.clone());

        let ax = fig.ax_mut(row, 1)?;
        plot_by_threshold(ax, &da.div(&integrated_volume)?, thr_dim)?;
        ax.set_title(format!("{var} / {INTEGRATED_VOLUME}"));
    }
    figures.push(fig);

    for var in metrics.x_section.data_var_names() {
        for (kind, hdim) in [
            (MetricKind::XSection, &names.xdim),
            (MetricKind::YSection, &names.ydim),
        ] {
            let section = metrics.get(kind);
            let section = if section.dims().contains_key(&names.tdim) {
                section.isel(&names.tdim, 0)?
            } else {
                section.clone()
            };
            let da = section.get(&var)?;
            let area = section.get(INTEGRATED_AREA)?;
            figures.push(section_figure(&da, hdim, cfg, format!("{} {var}", kind.as_str()))?);
            figures.push(section_figure(
                &da.div(&area)?,
                hdim,
                cfg,
                format!("{} {var} per {INTEGRATED_AREA}", kind.as_str()),
            )?);
        }
    }
    Ok(figures)
}

fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Render [`metrics_control_plots`] as PNG files in `dir`
pub fn render_control_plots(metrics: &Metrics, cfg: &MetricsConfig, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut paths = Vec::new();
    for (i, fig) in metrics_control_plots(metrics, cfg)?.iter().enumerate() {
        let stem = fig
            .title
            .as_deref()
            .map(file_stem)
            .unwrap_or_else(|| format!("figure_{i}"));
        let path = dir.join(format!("{stem}.png"));
        fig.save(&path)?;
        paths.push(path);
    }
    Ok(paths)
}
