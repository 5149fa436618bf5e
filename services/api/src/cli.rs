use crate::demo::{run_availability_report, run_demo, AvailabilityReportArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hospital_ops::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Hospital Operations Console",
    about = "Run and demonstrate the hospital operations console from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the per-role availability report for a unit
    Availability(AvailabilityReportArgs),
    /// Run an end-to-end CLI demo covering allocation and SCP workflows
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Availability(args) => run_availability_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
