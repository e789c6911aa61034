use clap::Parser;
use clap_complete::{generate, Shell};
use std::fs;
use std::io;
use std::path::Path;
use tracing_subscriber::FmtSubscriber;

use lmp_cli::{build_cli_command, Cli, Commands, LmpConfig};

mod commands;

use commands::solve::SolveOptions;

fn generate_completions(shell: Shell, out: Option<&Path>) -> anyhow::Result<()> {
    let mut command = build_cli_command();
    match out {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            generate(shell, &mut command, "lmp", &mut file);
        }
        None => generate(shell, &mut command, "lmp", &mut io::stdout()),
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = LmpConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Solve {
            case,
            slack,
            method,
            voll,
            format,
            out,
            csv,
        } => commands::solve::handle(
            &config,
            SolveOptions {
                case,
                slack: slack.as_deref(),
                method: method.as_deref(),
                voll: *voll,
                format: *format,
                out: out.as_deref(),
                csv: csv.as_deref(),
            },
        ),
        Commands::Ptdf {
            case,
            slack,
            format,
            out,
        } => commands::ptdf::handle(&config, case, slack.as_deref(), *format, out.as_deref()),
        Commands::Validate {
            case,
            strict,
            format,
        } => commands::validate::handle(&config, case, *strict, *format),
        Commands::Sweep(args) => commands::sweep::handle(&config, args),
        Commands::Completions { shell, out } => generate_completions(*shell, out.as_deref()),
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run(&cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
