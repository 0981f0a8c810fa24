use clap::Parser;
use http_request_action::{cli::Cli, logging};

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init_logging() {
        eprintln!("warning: {err:#}");
    }

    let cli = Cli::parse();
    if let Err(err) = cli.run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
