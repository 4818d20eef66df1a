use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bch_faucet_lib::commands::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(out) => {
            let rendered = serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string());
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
