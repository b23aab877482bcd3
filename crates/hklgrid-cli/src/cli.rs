use clap::{Args, Parser, Subcommand};
use hklgrid::core::models::grid::{AxisOrder, Packing};
use hklgrid::engine::binner::BinningMethod;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "hklgrid CLI - density maps, resolution shells and amplitude scaling for reflection tables.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute an electron density map from amplitude and phase columns.
    Map(MapArgs),
    /// Scale calculated structure factors against observed amplitudes.
    Scale(ScaleArgs),
    /// Report reflection counts and mean values per resolution shell.
    Bin(BinArgs),
    /// List the columns of a reflection table, optionally removing one.
    Columns(ColumnsArgs),
}

/// Input table and crystal parameters shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to the input reflection table (CSV with H, K, L as the first columns).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Unit cell as 'a,b,c,alpha,beta,gamma' (Å and degrees), overriding the config file.
    #[arg(long, value_name = "A,B,C,AL,BE,GA")]
    pub cell: Option<String>,

    /// Space group name (e.g. 'P 21 21 21') or number, overriding the config file.
    #[arg(short = 'g', long = "space-group", value_name = "NAME")]
    pub space_group: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S map.sample-rate=2.0
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `map` subcommand.
#[derive(Args, Debug)]
pub struct MapArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Amplitude column label.
    #[arg(short = 'f', long, value_name = "LABEL")]
    pub f_label: Option<String>,

    /// Phase column label (degrees).
    #[arg(short = 'p', long, value_name = "LABEL")]
    pub phi_label: Option<String>,

    /// Oversampling factor used to choose the grid size.
    #[arg(short = 'r', long, value_name = "FLOAT", conflicts_with = "grid")]
    pub sample_rate: Option<f64>,

    /// Exact grid size as 'nh,nk,nl'.
    #[arg(long, value_name = "NH,NK,NL")]
    pub grid: Option<String>,

    /// Axis order of the map: 'xyz' (x fastest) or 'zyx'.
    #[arg(long, value_name = "ORDER")]
    pub axis_order: Option<AxisOrder>,

    /// Packing of the intermediate reciprocal grid: 'full' or 'half-l'.
    #[arg(long, value_name = "PACKING")]
    pub packing: Option<Packing>,
}

/// Arguments for the `scale` subcommand.
#[derive(Args, Debug)]
pub struct ScaleArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Path for the output reflection table with the scaled columns appended.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Calculated amplitude column label.
    #[arg(long, value_name = "LABEL")]
    pub f_calc: Option<String>,

    /// Calculated phase column label.
    #[arg(long, value_name = "LABEL")]
    pub phi_calc: Option<String>,

    /// Observed amplitude column label.
    #[arg(long, value_name = "LABEL")]
    pub f_obs: Option<String>,

    /// Observed amplitude uncertainty column label.
    #[arg(long, value_name = "LABEL")]
    pub sigma_obs: Option<String>,

    /// Override the maximum number of refinement iterations.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Refine a single isotropic B instead of the anisotropic tensor.
    #[arg(long)]
    pub isotropic: bool,

    /// Ignore sigmas and weight every reflection equally.
    #[arg(long)]
    pub no_sigma: bool,
}

/// Arguments for the `bin` subcommand.
#[derive(Args, Debug)]
pub struct BinArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Value column to summarize.
    #[arg(short, long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Number of resolution shells.
    #[arg(short, long, value_name = "INT")]
    pub nbins: Option<usize>,

    /// Binning method: 'equal-count', 'dstar', 'dstar2' or 'dstar3'.
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<BinningMethod>,
}

/// Arguments for the `columns` subcommand.
#[derive(Args, Debug)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Remove the column with this label.
    #[arg(long, value_name = "LABEL", requires = "output")]
    pub remove: Option<String>,

    /// Path for the modified reflection table.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
