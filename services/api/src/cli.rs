use crate::commands::{run_coaches, run_export, CoachesArgs, ExportArgs};
use crate::server;
use campaign_desk::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "campaign-desk",
    about = "Filter campaign coaches and export sending-tool lead lists",
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
    /// Print one page of campaign coaches as JSON
    Coaches(CoachesArgs),
    /// Export matching coaches as a sending-tool CSV and record the lead list
    Export(ExportArgs),
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
        Command::Coaches(args) => run_coaches(args).await,
        Command::Export(args) => run_export(args).await,
    }
}
