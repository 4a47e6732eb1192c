use clap::{Parser, Subcommand};
use rateproxy::AppCommand;

/// Caching proxy for the USD to IRR exchange rate
#[derive(Parser)]
#[command(name = "rateproxy", version, about, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log debug output from rateproxy
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the per-user one
    #[arg(short, long, global = true, value_name = "FILE")]
    config_path: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Write a default config file (to --config-path when given)
    Setup,
    /// Serve the cached rate over HTTP until Ctrl-C
    Serve,
    /// Look up the rate once and print it as JSON
    Fetch,
}

impl From<Command> for AppCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Setup => AppCommand::Setup,
            Command::Serve => AppCommand::Serve,
            Command::Fetch => AppCommand::Fetch,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    rateproxy::core::log::init_logging(cli.verbose);

    rateproxy::run_command(cli.command.into(), cli.config_path.as_deref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "rateproxy failed"))
}
