use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use ocean_post::errors::{OceanPostError, Result};
use ocean_post::labeled::DataArray;
use ocean_post::plotting::{
    plot_line_shaded_std, same_y_range, shaded_line_plot, Axes, Figure, Heatmap, Orientation,
    ShadedLineOptions, SpreadStyle, DEFAULT_STD_ALPHA, TAB10,
};
use std::fs;
use tempfile::tempdir;

/// Three time steps of a two-level profile
fn profile() -> Result<DataArray> {
    DataArray::new(
        ["time", "depth"],
        array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]].into_dyn(),
    )?
    .with_index("depth", vec![5.0, 50.0])
}

#[test]
fn test_shaded_std_defaults() -> Result<()> {
    let mut ax = Axes::new();
    let x = [0.0, 1.0, 2.0];
    let y = [1.0, 3.0, 2.0];
    let std = [0.5, 0.5, 1.0];
    let shaded = plot_line_shaded_std(&mut ax, &x, &y, &std, true, DEFAULT_STD_ALPHA)?;

    assert_eq!(shaded.line.x, x);
    assert_eq!(shaded.line.y, y);
    assert_eq!(shaded.line.color, TAB10[0]);
    assert_eq!(shaded.bands.len(), 1);
    let band = &shaded.bands[0];
    assert_eq!(band.alpha, DEFAULT_STD_ALPHA);
    assert_eq!(DEFAULT_STD_ALPHA, 0.35);
    assert!(!band.edge);
    assert_eq!(band.color, shaded.line.color);
    assert_eq!(band.lower, vec![0.5, 2.5, 1.0]);
    assert_eq!(band.upper, vec![1.5, 3.5, 3.0]);
    assert_eq!(ax.lines.len(), 1);
    assert_eq!(ax.bands.len(), 1);

    let second = plot_line_shaded_std(&mut ax, &x, &y, &std, false, DEFAULT_STD_ALPHA)?;
    assert_eq!(second.line.color, TAB10[1]);
    assert_eq!(second.line.x, y);
    assert_eq!(second.line.y, x);
    assert_eq!(second.bands[0].orientation, Orientation::Vertical);

    assert!(plot_line_shaded_std(&mut ax, &x, &y, &std[..2], true, DEFAULT_STD_ALPHA).is_err());
    Ok(())
}

#[test]
fn test_shaded_line_plot_bands() -> Result<()> {
    let da = profile()?;
    let mut ax = Axes::new();
    let shaded = shaded_line_plot(&mut ax, &da, &["time"], &ShadedLineOptions::default())?;

    assert_eq!(shaded.line.x, vec![5.0, 50.0]);
    assert_eq!(shaded.line.y, vec![2.0, 10.0]);
    let alphas: Vec<f64> = shaded.bands.iter().map(|b| b.alpha).collect();
    assert_eq!(alphas, vec![0.25, 0.4]);

    let std = (2.0_f64 / 3.0).sqrt();
    assert_abs_diff_eq!(shaded.bands[0].lower[0], 2.0 - std, epsilon = 1e-12);
    assert_abs_diff_eq!(shaded.bands[1].upper[0], 2.0 + 3.0 * std, epsilon = 1e-12);
    assert_eq!(shaded.bands[1].lower[1], 10.0);
    Ok(())
}

#[test]
fn test_shaded_line_plot_band_count_and_orientation() -> Result<()> {
    let da = profile()?;
    let options = ShadedLineOptions {
        spreads: vec![0.5, 0.9, 1.0],
        alphas: vec![0.2, 0.3],
        spread_style: SpreadStyle::Quantile,
        horizontal: false,
    };
    let mut ax = Axes::new();
    let shaded = shaded_line_plot(&mut ax, &da, &["time"], &options)?;

    // one band per (spread, alpha) pair
    assert_eq!(shaded.bands.len(), 2);
    assert_eq!(shaded.line.x, vec![2.0, 10.0]);
    assert_eq!(shaded.line.y, vec![5.0, 50.0]);
    assert!(shaded
        .bands
        .iter()
        .all(|b| b.orientation == Orientation::Vertical && b.coord == vec![5.0, 50.0]));
    assert_abs_diff_eq!(shaded.bands[0].lower[0], 1.5, epsilon = 1e-12);
    assert_abs_diff_eq!(shaded.bands[0].upper[0], 2.5, epsilon = 1e-12);

    let too_wide = ShadedLineOptions {
        spreads: vec![1.5],
        ..options
    };
    assert!(matches!(
        shaded_line_plot(&mut ax, &da, &["time"], &too_wide),
        Err(OceanPostError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_shaded_line_plot_errors() -> Result<()> {
    let err = "bogus".parse::<SpreadStyle>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Got unknown option ['bogus'] for  `spread_style`. Supported options are : ['std', 'quantile']"
    );
    assert_eq!("quantile".parse::<SpreadStyle>()?, SpreadStyle::Quantile);

    let da = profile()?;
    let mut ax = Axes::new();
    let err = shaded_line_plot(&mut ax, &da, &[], &ShadedLineOptions::default()).unwrap_err();
    assert!(err.to_string().contains("1 dimensional after"));
    assert!(ax.lines.is_empty());
    Ok(())
}

#[test]
fn test_same_y_range() -> Result<()> {
    let mut axes = vec![Axes::new(), Axes::new(), Axes::new()];
    axes[0].plot(vec![0.0, 1.0], vec![0.0, 1.0])?;
    axes[1].plot(vec![0.0, 1.0], vec![10.0, 30.0])?;
    axes[2].set_ylim(-4.0, -2.0);

    same_y_range(&mut axes);
    let widths: Vec<f64> = axes
        .iter()
        .map(|ax| {
            let (lo, hi) = ax.get_ylim();
            hi - lo
        })
        .collect();
    assert_abs_diff_eq!(widths[0], 22.0, epsilon = 1e-9);
    assert!(widths.iter().all(|w| (w - widths[0]).abs() < 1e-9));

    let (lo, hi) = axes[2].get_ylim();
    assert_abs_diff_eq!(0.5 * (lo + hi), -3.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_autoscale_limits() -> Result<()> {
    let mut ax = Axes::new();
    assert_eq!(ax.get_xlim(), (0.0, 1.0));
    ax.plot(vec![0.0, 10.0], vec![2.0, 2.0])?;
    assert_eq!(ax.get_xlim(), (-0.5, 10.5));
    assert_eq!(ax.get_ylim(), (1.5, 2.5));
    ax.y_increasing = false;
    assert_eq!(ax.get_ylim(), (1.5, 2.5));
    Ok(())
}

#[test]
fn test_figure_panels() -> Result<()> {
    let mut fig = Figure::new(2, 3);
    assert_eq!(fig.axes().len(), 6);
    fig.ax_mut(1, 2)?.set_title("last");
    assert_eq!(fig.axes()[5].title.as_deref(), Some("last"));
    assert!(fig.ax(2, 0).is_err());

    let dir = tempdir()?;
    assert!(matches!(
        fig.save(&dir.path().join("figure.pdf")),
        Err(OceanPostError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_figure_renders_png_and_svg() -> Result<()> {
    let mut fig = Figure::new(1, 2);
    fig.title = Some("render check".to_string());

    let line_ax = fig.ax_mut(0, 0)?;
    line_ax.set_title("profile");
    let depth = [5.0, 15.0, 40.0];
    plot_line_shaded_std(
        line_ax,
        &depth,
        &[10.0, 8.0, f64::NAN],
        &[1.0, 0.5, 0.5],
        false,
        DEFAULT_STD_ALPHA,
    )?;
    line_ax.y_increasing = false;

    let map_ax = fig.ax_mut(0, 1)?;
    map_ax.pcolormesh(Heatmap {
        x: vec![100.0, 110.0, 130.0],
        y: depth.to_vec(),
        values: Array2::from_shape_fn((3, 3), |(j, i)| {
            if j == 0 && i == 0 {
                f64::NAN
            } else {
                (i + j) as f64
            }
        }),
        vmin: 0.0,
        vmax: 4.0,
    })?;
    map_ax.y_increasing = false;
    // limits stay (low, high); only the drawn axis is flipped
    let (lo, hi) = map_ax.get_ylim();
    assert_abs_diff_eq!(lo, 3.25, epsilon = 1e-9);
    assert_abs_diff_eq!(hi, 41.75, epsilon = 1e-9);

    let dir = tempdir()?;
    for name in ["figure.png", "figure.svg"] {
        let path = dir.path().join(name);
        fig.save(&path)?;
        assert!(fs::metadata(&path)?.len() > 0, "{name} is empty");
    }
    let svg = fs::read_to_string(dir.path().join("figure.svg"))?;
    assert!(svg.contains("<svg"));
    assert!(svg.contains("polygon") || svg.contains("path"));
    assert!(svg.contains("rect"));
    Ok(())
}
