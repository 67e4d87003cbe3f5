use clap::Parser;

use blogger2hugo::cli::{run, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        // Post-level failures are summarized in the report; only an
        // unreadable or unparsable archive reaches this arm.
        Ok(()) => std::process::exit(0),
        Err(_) => std::process::exit(1),
    }
}
