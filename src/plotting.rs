//! Line, spread and section plots
//!
//! Plots are described by plain data ([`Figure`], [`Axes`], [`Line`],
//! [`Band`], [`Heatmap`]) and only turned into pixels by [`Figure::save`],
//! which renders through `plotters`. This keeps the geometry inspectable.

use crate::errors::{OceanPostError, Result};
use crate::labeled::DataArray;
use log::info;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use std::str::FromStr;

/// An opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Default colour cycle
pub const TAB10: [Rgb; 10] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
    Rgb(148, 103, 189),
    Rgb(140, 86, 75),
    Rgb(227, 119, 194),
    Rgb(127, 127, 127),
    Rgb(188, 189, 34),
    Rgb(23, 190, 207),
];

const VIRIDIS: [Rgb; 5] = [
    Rgb(68, 1, 84),
    Rgb(59, 82, 139),
    Rgb(33, 145, 140),
    Rgb(94, 201, 98),
    Rgb(253, 231, 37),
];

impl Rgb {
    fn to_plotters(self) -> RGBColor {
        RGBColor(self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    /// Sample a perceptually ordered colormap at `t` in `[0, 1]`
    pub fn colormap(t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f64;
        let i = (t.floor() as usize).min(VIRIDIS.len() - 2);
        VIRIDIS[i].lerp(VIRIDIS[i + 1], t - i as f64)
    }
}

/// Which axis a band's coordinate runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Coordinate on x, band spans y
    Horizontal,
    /// Coordinate on y, band spans x
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: Rgb,
    pub label: Option<String>,
}

/// A filled region between two curves
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub coord: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub color: Rgb,
    pub alpha: f64,
    /// Whether an outline is drawn
    pub edge: bool,
    pub orientation: Orientation,
}

/// Cell-centred colour mesh; `values` has shape `(y.len(), x.len())`
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub values: Array2<f64>,
    pub vmin: f64,
    pub vmax: f64,
}

/// A single panel
#[derive(Debug, Clone, PartialEq)]
pub struct Axes {
    pub lines: Vec<Line>,
    pub bands: Vec<Band>,
    pub heatmaps: Vec<Heatmap>,
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    /// Draw y increasing upwards; false puts the largest value at the bottom
    pub y_increasing: bool,
    xlim: Option<(f64, f64)>,
    ylim: Option<(f64, f64)>,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            bands: Vec::new(),
            heatmaps: Vec::new(),
            title: None,
            xlabel: None,
            ylabel: None,
            y_increasing: true,
            xlim: None,
            ylim: None,
        }
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn with_margin(range: Option<(f64, f64)>) -> (f64, f64) {
    match range {
        None => (0.0, 1.0),
        Some((lo, hi)) if lo == hi => (lo - 0.5, hi + 0.5),
        Some((lo, hi)) => {
            let pad = 0.05 * (hi - lo);
            (lo - pad, hi + pad)
        }
    }
}

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colour the next line will get from the cycle
    pub fn next_color(&self) -> Rgb {
        TAB10[self.lines.len() % TAB10.len()]
    }

    /// Add a line in the next cycle colour
    pub fn plot(&mut self, x: Vec<f64>, y: Vec<f64>) -> Result<Line> {
        if x.len() != y.len() {
            return Err(OceanPostError::mismatch(format!(
                "line has {} x values and {} y values",
                x.len(),
                y.len()
            )));
        }
        let line = Line {
            x,
            y,
            color: self.next_color(),
            label: None,
        };
        self.lines.push(line.clone());
        Ok(line)
    }

    pub fn fill(&mut self, band: Band) -> Result<Band> {
        if band.lower.len() != band.coord.len() || band.upper.len() != band.coord.len() {
            return Err(OceanPostError::mismatch(
                "band bounds must match the coordinate length",
            ));
        }
        self.bands.push(band.clone());
        Ok(band)
    }

    pub fn pcolormesh(&mut self, heatmap: Heatmap) -> Result<()> {
        if heatmap.values.dim() != (heatmap.y.len(), heatmap.x.len()) {
            return Err(OceanPostError::mismatch(format!(
                "heatmap values {:?} do not match y ({}) by x ({})",
                heatmap.values.dim(),
                heatmap.y.len(),
                heatmap.x.len()
            )));
        }
        self.heatmaps.push(heatmap);
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_xlim(&mut self, lo: f64, hi: f64) {
        self.xlim = Some((lo, hi));
    }

    pub fn set_ylim(&mut self, lo: f64, hi: f64) {
        self.ylim = Some((lo, hi));
    }

    /// x limits, autoscaled from the data with a 5% margin when unset
    pub fn get_xlim(&self) -> (f64, f64) {
        if let Some(lim) = self.xlim {
            return lim;
        }
        let lines = self.lines.iter().flat_map(|l| l.x.iter().copied());
        let bands = self.bands.iter().flat_map(|b| match b.orientation {
            Orientation::Horizontal => b.coord.clone(),
            Orientation::Vertical => b.lower.iter().chain(&b.upper).copied().collect(),
        });
        let maps = self.heatmaps.iter().flat_map(|h| h.x.iter().copied());
        with_margin(extent(lines.chain(bands).chain(maps)))
    }

    /// y limits as `(low, high)`, autoscaled with a 5% margin when unset
    pub fn get_ylim(&self) -> (f64, f64) {
        if let Some(lim) = self.ylim {
            return lim;
        }
        let lines = self.lines.iter().flat_map(|l| l.y.iter().copied());
        let bands = self.bands.iter().flat_map(|b| match b.orientation {
            Orientation::Horizontal => b.lower.iter().chain(&b.upper).copied().collect(),
            Orientation::Vertical => b.coord.clone(),
        });
        let maps = self.heatmaps.iter().flat_map(|h| h.y.iter().copied());
        with_margin(extent(lines.chain(bands).chain(maps)))
    }
}

/// A grid of panels
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub nrows: usize,
    pub ncols: usize,
    pub title: Option<String>,
    /// Output size in pixels
    pub size: (u32, u32),
    axes: Vec<Axes>,
}

impl Figure {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        let nrows = nrows.max(1);
        let ncols = ncols.max(1);
        Self {
            nrows,
            ncols,
            title: None,
            size: (400 * ncols as u32, 300 * nrows as u32),
            axes: vec![Axes::new(); nrows * ncols],
        }
    }

    /// Panels in row-major order
    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    pub fn axes_mut(&mut self) -> &mut [Axes] {
        &mut self.axes
    }

    pub fn ax(&self, row: usize, col: usize) -> Result<&Axes> {
        let idx = self.index(row, col)?;
        Ok(&self.axes[idx])
    }

    pub fn ax_mut(&mut self, row: usize, col: usize) -> Result<&mut Axes> {
        let idx = self.index(row, col)?;
        Ok(&mut self.axes[idx])
    }

    fn index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.nrows || col >= self.ncols {
            return Err(OceanPostError::InvalidArgument(format!(
                "panel ({row}, {col}) outside a {}x{} figure",
                self.nrows, self.ncols
            )));
        }
        Ok(row * self.ncols + col)
    }

    /// Render to PNG or SVG, chosen by the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => {
                let root = BitMapBackend::new(path, self.size).into_drawing_area();
                self.draw(root)?;
            }
            Some("svg") => {
                let root = SVGBackend::new(path, self.size).into_drawing_area();
                self.draw(root)?;
            }
            _ => {
                return Err(OceanPostError::InvalidArgument(format!(
                    "unsupported figure format for {}, use .png or .svg",
                    path.display()
                )))
            }
        }
        info!("🖼 Saved figure to {}", path.display());
        Ok(())
    }

    fn draw<DB: DrawingBackend>(&self, root: DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(plot_err)?;
        let root = match &self.title {
            Some(title) => root.titled(title, ("sans-serif", 20)).map_err(plot_err)?,
            None => root,
        };
        let panels = root.split_evenly((self.nrows, self.ncols));
        for (panel, ax) in panels.iter().zip(&self.axes) {
            draw_axes(panel, ax)?;
        }
        root.present().map_err(plot_err)
    }
}

fn plot_err(e: impl std::fmt::Display) -> OceanPostError {
    OceanPostError::PlotError(e.to_string())
}

/// Cell boundaries around cell-centre coordinates
fn cell_edges(centers: &[f64]) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [c] => vec![c - 0.5, c + 0.5],
        _ => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - 0.5 * (centers[1] - centers[0]));
            edges.extend(centers.windows(2).map(|w| 0.5 * (w[0] + w[1])));
            edges.push(centers[n - 1] + 0.5 * (centers[n - 1] - centers[n - 2]));
            edges
        }
    }
}

fn draw_axes<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, ax: &Axes) -> Result<()> {
    let (x0, x1) = ax.get_xlim();
    let (y0, y1) = ax.get_ylim();
    let y_range = if ax.y_increasing { y0..y1 } else { y1..y0 };

    let mut builder = ChartBuilder::on(area);
    builder.margin(10).x_label_area_size(30).y_label_area_size(50);
    if let Some(title) = &ax.title {
        builder.caption(title, ("sans-serif", 14));
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y_range)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc(ax.xlabel.clone().unwrap_or_default())
        .y_desc(ax.ylabel.clone().unwrap_or_default())
        .draw()
        .map_err(plot_err)?;

    for map in &ax.heatmaps {
        let xe = cell_edges(&map.x);
        let ye = cell_edges(&map.y);
        let span = map.vmax - map.vmin;
        let cells = map.values.indexed_iter().filter_map(|((j, i), &v)| {
            if !v.is_finite() {
                return None;
            }
            let t = if span > 0.0 { (v - map.vmin) / span } else { 0.5 };
            let color = Rgb::colormap(t).to_plotters();
            Some(Rectangle::new(
                [(xe[i], ye[j]), (xe[i + 1], ye[j + 1])],
                color.filled(),
            ))
        });
        chart.draw_series(cells).map_err(plot_err)?;
    }

    for band in &ax.bands {
        let valid: Vec<(f64, f64, f64)> = band
            .coord
            .iter()
            .zip(&band.lower)
            .zip(&band.upper)
            .map(|((&c, &lo), &hi)| (c, lo, hi))
            .filter(|(c, lo, hi)| c.is_finite() && lo.is_finite() && hi.is_finite())
            .collect();
        let place = |c: f64, v: f64| match band.orientation {
            Orientation::Horizontal => (c, v),
            Orientation::Vertical => (v, c),
        };
        let outline: Vec<(f64, f64)> = valid
            .iter()
            .map(|&(c, lo, _)| place(c, lo))
            .chain(valid.iter().rev().map(|&(c, _, hi)| place(c, hi)))
            .collect();
        let color = band.color.to_plotters();
        chart
            .draw_series(std::iter::once(Polygon::new(
                outline.clone(),
                color.mix(band.alpha).filled(),
            )))
            .map_err(plot_err)?;
        if band.edge {
            chart
                .draw_series(std::iter::once(PathElement::new(outline, color)))
                .map_err(plot_err)?;
        }
    }

    for line in &ax.lines {
        let points = line
            .x
            .iter()
            .zip(&line.y)
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        chart
            .draw_series(LineSeries::new(points, &line.color.to_plotters()))
            .map_err(plot_err)?;
    }
    Ok(())
}

/// A line together with the spread bands drawn around it
#[derive(Debug, Clone, PartialEq)]
pub struct ShadedLine {
    pub line: Line,
    pub bands: Vec<Band>,
}

/// Band opacity for [`plot_line_shaded_std`] when the caller has no preference
pub const DEFAULT_STD_ALPHA: f64 = 0.35;

/// Plot `y` against `x` with a band of `y ± std` in the line's colour
///
/// With `horizontal` false the line is drawn with `x` on the vertical axis,
/// as for a depth profile.
pub fn plot_line_shaded_std(
    ax: &mut Axes,
    x: &[f64],
    y: &[f64],
    std: &[f64],
    horizontal: bool,
    alpha: f64,
) -> Result<ShadedLine> {
    if x.len() != y.len() || y.len() != std.len() {
        return Err(OceanPostError::mismatch(format!(
            "x ({}), y ({}) and std ({}) must have the same length",
            x.len(),
            y.len(),
            std.len()
        )));
    }
    let lower: Vec<f64> = y.iter().zip(std).map(|(m, s)| m - s).collect();
    let upper: Vec<f64> = y.iter().zip(std).map(|(m, s)| m + s).collect();
    draw_shaded(ax, x, y, vec![(lower, upper, alpha)], horizontal)
}

fn draw_shaded(
    ax: &mut Axes,
    coord: &[f64],
    center: &[f64],
    spreads: Vec<(Vec<f64>, Vec<f64>, f64)>,
    horizontal: bool,
) -> Result<ShadedLine> {
    let line = if horizontal {
        ax.plot(coord.to_vec(), center.to_vec())?
    } else {
        ax.plot(center.to_vec(), coord.to_vec())?
    };
    let orientation = if horizontal {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };
    let bands = spreads
        .into_iter()
        .map(|(lower, upper, alpha)| {
            ax.fill(Band {
                coord: coord.to_vec(),
                lower,
                upper,
                color: line.color,
                alpha,
                edge: false,
                orientation,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ShadedLine { line, bands })
}

/// How the width of each spread band is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadStyle {
    /// mean ± spread * std
    #[default]
    Std,
    /// quantiles 0.5 ± spread / 2
    Quantile,
}

impl FromStr for SpreadStyle {
    type Err = OceanPostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "std" => Ok(SpreadStyle::Std),
            "quantile" => Ok(SpreadStyle::Quantile),
            other => Err(OceanPostError::InvalidArgument(format!(
                "Got unknown option ['{other}'] for  `spread_style`. Supported options are : ['std', 'quantile']"
            ))),
        }
    }
}

/// Options for [`shaded_line_plot`]
#[derive(Debug, Clone, PartialEq)]
pub struct ShadedLineOptions {
    pub spreads: Vec<f64>,
    /// One alpha per band; extra spreads or alphas are ignored
    pub alphas: Vec<f64>,
    pub spread_style: SpreadStyle,
    pub horizontal: bool,
}

impl Default for ShadedLineOptions {
    fn default() -> Self {
        Self {
            spreads: vec![1.0, 3.0],
            alphas: vec![0.25, 0.4],
            spread_style: SpreadStyle::Std,
            horizontal: true,
        }
    }
}

/// Plot the mean of `da` over `dims` with shaded spread bands
///
/// `da` must be one-dimensional once `dims` are reduced; its remaining index
/// becomes the line coordinate.
pub fn shaded_line_plot(
    ax: &mut Axes,
    da: &DataArray,
    dims: &[&str],
    options: &ShadedLineOptions,
) -> Result<ShadedLine> {
    let mean = da.mean(dims)?;
    if mean.ndim() != 1 {
        return Err(OceanPostError::InvalidArgument(format!(
            "`da` has to be 1 dimensional after reducing over {dims:?}, got dimensions {:?}",
            mean.dims()
        )));
    }
    let coord = mean.index_values(&mean.dims()[0])?;
    let center: Vec<f64> = mean.data().iter().copied().collect();

    let mut spreads = Vec::new();
    for (&spread, &alpha) in options.spreads.iter().zip(&options.alphas) {
        let (lower, upper) = match options.spread_style {
            SpreadStyle::Std => {
                let std = da.std(dims)?;
                let lower = mean.sub(&std.mul_scalar(spread))?;
                let upper = mean.add(&std.mul_scalar(spread))?;
                (lower, upper)
            }
            SpreadStyle::Quantile => {
                if !(0.0..=1.0).contains(&spread) {
                    return Err(OceanPostError::InvalidArgument(format!(
                        "quantile spread must lie in [0, 1], got {spread}"
                    )));
                }
                (
                    da.quantile(0.5 - spread / 2.0, dims)?,
                    da.quantile(0.5 + spread / 2.0, dims)?,
                )
            }
        };
        spreads.push((
            lower.data().iter().copied().collect(),
            upper.data().iter().copied().collect(),
            alpha,
        ));
    }
    draw_shaded(ax, &coord, &center, spreads, options.horizontal)
}

/// Give every axes the largest y-range among them, keeping each midpoint
pub fn same_y_range(axes: &mut [Axes]) {
    let limits: Vec<(f64, f64)> = axes.iter().map(Axes::get_ylim).collect();
    let range = limits
        .iter()
        .map(|(lo, hi)| hi - lo)
        .fold(0.0_f64, f64::max);
    for (ax, (lo, hi)) in axes.iter_mut().zip(limits) {
        let mid = 0.5 * (lo + hi);
        ax.set_ylim(mid - range / 2.0, mid + range / 2.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_bracket_centers() {
        assert_eq!(cell_edges(&[0.0, 1.0, 2.0]), vec![-0.5, 0.5, 1.5, 2.5]);
        assert_eq!(cell_edges(&[3.0]), vec![2.5, 3.5]);
    }

    #[test]
    fn colormap_endpoints() {
        assert_eq!(Rgb::colormap(0.0), VIRIDIS[0]);
        assert_eq!(Rgb::colormap(1.0), VIRIDIS[4]);
        assert_eq!(Rgb::colormap(7.0), VIRIDIS[4]);
    }
}
