mod commands;

use clap::Parser;
use nshmp_core::domain::NshmpError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let model_error = error.as_nshmp_error();
            eprintln!("{}", model_error.diagnostic_line());
            eprintln!("{}", model_error.fatal_exit_line());
            model_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("nshmp-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    match Cli::try_parse_from(&full_args) {
        Ok(cli) => {
            init_tracing(cli.log_json);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{err}");
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second initialisation in the same process keeps the first subscriber.
    let _ = if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
}

#[derive(Parser)]
#[command(
    name = "nshmp-rs",
    version,
    about = "Legacy hazard-model source readers and converters"
)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Convert a fault source file to a JSON source list
    Fault(commands::SourceFileArgs),
    /// Convert a subduction source file to a JSON source list
    Subduction(commands::SourceFileArgs),
    /// Convert one or more gridded-seismicity files, merged by location
    Grid(commands::GridArgs),
    /// Print source count and total rates of a model file
    Summary(commands::SummaryArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Fault(args) => commands::run_fault_command(args),
        CliCommand::Subduction(args) => commands::run_subduction_command(args),
        CliCommand::Grid(args) => commands::run_grid_command(args),
        CliCommand::Summary(args) => commands::run_summary_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Model(#[from] NshmpError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_nshmp_error(&self) -> NshmpError {
        match self {
            Self::Usage(message) => NshmpError::configuration("CONFIG.CLI_USAGE", message.clone()),
            Self::Model(error) => error.clone(),
            Self::Internal(error) => NshmpError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, run};
    use nshmp_core::domain::NshmpError;

    #[test]
    fn unknown_subcommand_is_a_usage_error() {
        let error = run(["rupture"]).expect_err("unknown subcommand");
        assert!(matches!(error, CliError::Usage(_)));
        assert_eq!(error.as_nshmp_error().exit_code(), 3);
    }

    #[test]
    fn help_exits_cleanly() {
        assert_eq!(run(["--help"]).expect("help is not an error"), 0);
    }

    #[test]
    fn model_errors_keep_their_category() {
        let error = CliError::from(NshmpError::file_format("FORMAT.FAULT_EOF", "truncated"));
        let model_error = error.as_nshmp_error();
        assert_eq!(model_error.exit_code(), 2);
        assert_eq!(model_error.placeholder(), "FORMAT.FAULT_EOF");
    }
}
