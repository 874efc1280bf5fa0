//! Defines command-line interface options using `clap` for the ocean_post binary.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Post-processing of gridded ocean model output
#[derive(Parser, Debug)]
#[command(
    name = "ocean_post",
    version,
    about = "Post-processing for gridded ocean model output"
)]
pub struct Args {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// Input file and output path shared by the transforming subcommands
#[derive(ClapArgs, Debug)]
pub struct InOut {
    /// Path to the input NetCDF file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Path of the NetCDF file to write
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print dimensions, coordinates, variables and attributes of a file
    Info {
        /// Path to the NetCDF file
        #[arg(short, long)]
        file: PathBuf,

        /// Describe a single variable with summary statistics
        #[arg(long)]
        describe: Option<String>,
    },

    /// Multiply a variable by a factor and set its units
    ConvertUnits {
        #[command(flatten)]
        io: InOut,

        /// Variable to convert
        #[arg(long)]
        var: String,

        /// New value of the `units` attribute
        #[arg(long)]
        unit: String,

        /// Conversion factor
        #[arg(long)]
        factor: f64,
    },

    /// Shift longitudes on one side of a threshold and re-sort
    ShiftLon {
        #[command(flatten)]
        io: InOut,

        /// Longitude dimension
        #[arg(long, default_value = "xt_ocean")]
        lon_dim: String,

        /// Amount added to the shifted longitudes
        #[arg(long, default_value_t = 360.0, allow_hyphen_values = true)]
        shift: f64,

        /// Threshold selecting the shifted longitudes
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        crit: f64,

        /// Shift longitudes above the threshold instead of below it
        #[arg(long)]
        larger: bool,

        /// Keep the original order
        #[arg(long)]
        no_sort: bool,
    },

    /// Reinterpret the time axis as days after 1 January of refyear + 1
    RebaseTime {
        #[command(flatten)]
        io: InOut,

        /// Time dimension
        #[arg(long, default_value = "time")]
        time_dim: String,

        /// Reference year
        #[arg(long, default_value_t = 2000)]
        refyear: i32,
    },

    /// Mask all variables by a tracer at several threshold levels
    MaskTracer {
        #[command(flatten)]
        io: InOut,

        /// Variable used as the mask
        #[arg(long)]
        mask_var: String,

        /// Comma separated threshold levels
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        levels: Vec<f64>,

        /// Name of the new threshold dimension
        #[arg(long, default_value = "omz_thresholds")]
        name: String,
    },

    /// Pad a boundary flux into a full vertical column
    BoundaryFlux {
        #[command(flatten)]
        io: InOut,

        /// Boundary flux variable
        #[arg(long)]
        flux_var: String,

        /// Variable whose shape the result takes
        #[arg(long)]
        full_var: String,

        /// Vertical dimension
        #[arg(long, default_value = "st_ocean")]
        zdim: String,

        /// Place the flux at the bottom level instead of the top
        #[arg(long)]
        bottom: bool,
    },

    /// Compute area and volume weighted metrics and save them
    Metrics {
        /// Path to the input NetCDF file
        #[arg(short, long)]
        file: PathBuf,

        /// Output directory
        #[arg(long)]
        odir: PathBuf,

        /// File name prefix of the saved metrics
        #[arg(long)]
        fname: String,

        /// JSON file overriding dimension names and metric options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Grid-spec file providing `area_t`; adds dzt and volume when given
        #[arg(long)]
        gridspec: Option<PathBuf>,

        /// Variable holding rho * dzt
        #[arg(long, default_value = "rho_dzt")]
        rho_dzt_var: String,

        /// Variable whose valid cells define the tracking variable
        #[arg(long)]
        refvar: String,

        /// Tracer used for threshold masking
        #[arg(long, requires = "thresholds")]
        threshold_var: Option<String>,

        /// Comma separated masking thresholds
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        thresholds: Vec<f64>,

        /// Weighted means instead of weighted sums
        #[arg(long)]
        average: bool,

        /// Drop the tracking variable from averaged metrics
        #[arg(long)]
        drop_control: bool,

        /// Split the saved files by year
        #[arg(long)]
        mf_save: bool,

        /// Directory for control plots
        #[arg(long)]
        plots: Option<PathBuf>,
    },

    /// Relative vorticity of a B or C grid velocity field
    Vorticity {
        #[command(flatten)]
        io: InOut,

        #[arg(long, default_value = "u")]
        u: String,

        #[arg(long, default_value = "v")]
        v: String,

        /// Zonal cell width at the u points
        #[arg(long)]
        dx: String,

        /// Meridional cell width at the v points
        #[arg(long)]
        dy: String,

        /// Cell area at the vorticity points
        #[arg(long)]
        area: String,

        /// Grid type (B or C); inferred when omitted
        #[arg(long)]
        gridtype: Option<String>,

        #[arg(long, default_value = "xt_ocean")]
        x_center: String,

        #[arg(long, default_value = "xu_ocean")]
        x_right: String,

        #[arg(long, default_value = "yt_ocean")]
        y_center: String,

        #[arg(long, default_value = "yu_ocean")]
        y_right: String,
    },
}
