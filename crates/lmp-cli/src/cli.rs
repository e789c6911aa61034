use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lmp", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Configuration file (defaults to ~/.lmp/config.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clear the market: dispatch, flows and nodal prices
    Solve {
        /// Case file (TOML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Reference node name (defaults to the case's slack)
        #[arg(long)]
        slack: Option<String>,
        /// Dispatch method: dc or merit
        #[arg(long)]
        method: Option<String>,
        /// Enable load shedding at this value of lost load (currency/MWh)
        #[arg(long)]
        voll: Option<f64>,
        /// Output format for stdout
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Write the full result as JSON to this file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Write nodes.csv and lines.csv into this directory
        #[arg(long, value_hint = ValueHint::DirPath)]
        csv: Option<PathBuf>,
    },
    /// Print the power transfer distribution factors
    Ptdf {
        /// Case file (TOML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Reference node name (defaults to the case's slack)
        #[arg(long)]
        slack: Option<String>,
        /// Output format for stdout
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Also write the matrix as CSV
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Check a case for structural and physical problems
    Validate {
        /// Case file (TOML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
        /// Output format for stdout
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Re-solve while one parameter moves over a range
    Sweep(SweepArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
pub struct SweepArgs {
    /// Case file (TOML or JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub case: PathBuf,
    /// Parameter to vary: demand:NODE, capacity:LINE, length:LINE,
    /// gen-capacity:NODE or gen-cost:NODE (LINE is a label like A→B or an index)
    #[arg(long)]
    pub param: String,
    /// First value
    #[arg(long)]
    pub from: f64,
    /// Last value
    #[arg(long)]
    pub to: f64,
    /// Number of points (defaults to the configured sweep steps)
    #[arg(long)]
    pub steps: Option<usize>,
    /// Reference node name (defaults to the case's slack)
    #[arg(long)]
    pub slack: Option<String>,
    /// Dispatch method: dc or merit
    #[arg(long)]
    pub method: Option<String>,
    /// Enable load shedding at this value of lost load (currency/MWh)
    #[arg(long)]
    pub voll: Option<f64>,
    /// Worker threads ("auto" or a number)
    #[arg(long, default_value = "auto")]
    pub threads: String,
    /// Output format for stdout
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Write the sweep as CSV to this file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_parse_sweep() {
        let cli = Cli::parse_from([
            "lmp", "sweep", "case.toml", "--param", "demand:C", "--from", "50", "--to", "150",
            "--steps", "5",
        ]);
        match cli.command {
            Commands::Sweep(args) => {
                assert_eq!(args.param, "demand:C");
                assert_eq!(args.steps, Some(5));
                assert_eq!(args.threads, "auto");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lmp", "validate", "case.toml", "--log-level", "debug"]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }
}
