use crate::demo::{run_apply, run_demo, ApplyArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hirelink::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "HireLink",
    about = "Run the HireLink job application service or drive submissions from the command line",
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
    /// Submit one application against the configured backend and print its progress
    Apply(ApplyArgs),
    /// Walk through submission scenarios against an in-memory backend
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
        Command::Apply(args) => run_apply(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
