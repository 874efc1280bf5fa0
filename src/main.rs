//! Entry point for the ocean_post binary.
//! Handles CLI parsing, logging and thread setup, then dispatches one post-processing step.

use clap::Parser;
use log::{info, LevelFilter};
use ocean_post::config::MetricsConfig;
use ocean_post::grid::{calculate_rel_vorticity, AxisPosition, Grid, GridAxis, GridType};
use ocean_post::metadata::{describe_variable, print_dataset_summary};
use ocean_post::metrics::{metrics_ds, metrics_save, render_control_plots};
use ocean_post::netcdf_io::{open_dataset, to_netcdf};
use ocean_post::parallel::ParallelConfig;
use ocean_post::processing::{
    add_grid_geometry_from_path, convert_boundary_flux, convert_units, default_grid_rename,
    ds_add_track_dummy, mask_tracer, shift_lon, time_add_refyear, ShiftLon,
};
use ocean_post::{Dataset, Result};
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};
use std::path::Path;

mod cli;

use cli::{Args, Command, InOut};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    println!(
        r#"
------------------------------------------------------------------
                          ocean_post
          post-processing for gridded ocean model output
------------------------------------------------------------------
"#
    );

    let parallel = ParallelConfig::new(args.threads);
    parallel.setup_global_pool()?;
    info!("🧵 Running with {} threads", parallel.current_threads());

    run(args.command)?;
    Ok(())
}

fn transform(io: &InOut, f: impl FnOnce(&Dataset) -> Result<Dataset>) -> Result<()> {
    let ds = open_dataset(&io.file)?;
    let out = f(&ds)?;
    to_netcdf(&out, &io.output)?;
    println!("✅ Saved result to {}", io.output.display());
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Info { file, describe } => {
            let ds = open_dataset(&file)?;
            println!("Successfully opened NetCDF file: {}", file.display());
            match describe {
                Some(name) => {
                    describe_variable(&ds, &name)?;
                }
                None => print_dataset_summary(&ds),
            }
            Ok(())
        }
        Command::ConvertUnits {
            io,
            var,
            unit,
            factor,
        } => transform(&io, |ds| convert_units(ds, &var, &unit, factor)),
        Command::ShiftLon {
            io,
            lon_dim,
            shift,
            crit,
            larger,
            no_sort,
        } => {
            let options = ShiftLon {
                shift,
                crit,
                smaller: !larger,
                sort: !no_sort,
            };
            transform(&io, |ds| shift_lon(ds, &lon_dim, options))
        }
        Command::RebaseTime {
            io,
            time_dim,
            refyear,
        } => transform(&io, |ds| time_add_refyear(ds, &time_dim, refyear)),
        Command::MaskTracer {
            io,
            mask_var,
            levels,
            name,
        } => transform(&io, |ds| {
            let mask = ds.get(&mask_var)?;
            mask_tracer(ds, &mask, &levels, &name)
        }),
        Command::BoundaryFlux {
            io,
            flux_var,
            full_var,
            zdim,
            bottom,
        } => transform(&io, |ds| {
            let flux = ds.get(&flux_var)?;
            let full = ds.get(&full_var)?;
            let padded = convert_boundary_flux(&flux, &full, &zdim, !bottom)?;
            ds.clone().assign(&flux_var, padded)
        }),
        Command::Metrics {
            file,
            odir,
            fname,
            config,
            gridspec,
            rho_dzt_var,
            refvar,
            threshold_var,
            thresholds,
            average,
            drop_control,
            mf_save,
            plots,
        } => {
            let mut cfg = match config {
                Some(path) => MetricsConfig::from_json_file(&path)?,
                None => MetricsConfig::default(),
            };
            cfg.compute_average |= average;
            cfg.drop_control |= drop_control;

            let mut ds = open_dataset(&file)?;
            if let Some(gridspec) = gridspec {
                let rho_dzt = ds.get(&rho_dzt_var)?;
                ds = add_grid_geometry_from_path(&ds, &rho_dzt, &gridspec, &default_grid_rename())?;
            }
            ds = ds_add_track_dummy(&ds, &refvar)?;
            if let Some(threshold_var) = threshold_var {
                let mask = ds.get(&threshold_var)?;
                ds = mask_tracer(&ds, &mask, &thresholds, &cfg.threshold_dim)?;
            }

            let metrics = metrics_ds(&ds, &cfg)?;
            for path in metrics_save(&metrics, &odir, &fname, mf_save)? {
                println!("✅ Saved {}", path.display());
            }
            if let Some(dir) = plots {
                for path in render_control_plots(&metrics, &cfg, &dir)? {
                    println!("🖼 Saved {}", path.display());
                }
            }
            Ok(())
        }
        Command::Vorticity {
            io,
            u,
            v,
            dx,
            dy,
            area,
            gridtype,
            x_center,
            x_right,
            y_center,
            y_right,
        } => {
            let gridtype = gridtype.as_deref().map(str::parse::<GridType>).transpose()?;
            transform(&io, |ds| {
                let grid = Grid::new(
                    ds,
                    vec![
                        GridAxis::new("X")
                            .with_position(AxisPosition::Center, &x_center)
                            .with_position(AxisPosition::Right, &x_right),
                        GridAxis::new("Y")
                            .with_position(AxisPosition::Center, &y_center)
                            .with_position(AxisPosition::Right, &y_right),
                    ],
                )?;
                let zeta = calculate_rel_vorticity(
                    &grid,
                    &ds.get(&u)?,
                    &ds.get(&v)?,
                    &ds.get(&dx)?,
                    &ds.get(&dy)?,
                    &ds.get(&area)?,
                    gridtype,
                )?;
                let mut out = Dataset::new();
                out.set_attr("source", file_label(&io.file));
                out.assign("relative_vorticity", zeta)
            })
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
