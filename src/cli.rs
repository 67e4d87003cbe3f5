use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConvertConfig;
use crate::convert::convert;

/// CLI for blogger2hugo: turn a Blogger export into Hugo content bundles.
#[derive(Parser)]
#[clap(
    name = "blogger2hugo",
    version,
    about = "Convert a Blogger Atom export archive into Hugo Markdown content bundles"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert the given export archive into a Hugo content tree
    Convert {
        /// Path to the Blogger Atom export file
        archive: PathBuf,
        /// Output content root (defaults to `content`)
        output_dir: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert {
            archive,
            output_dir,
        } => {
            let config = ConvertConfig::new(archive, output_dir);
            config.trace_loaded();
            println!("Conversion starting...");
            match convert(&config).await {
                Ok(report) => {
                    println!("Conversion complete.");
                    print!("{report}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Conversion failed: {e}");
                    Err(e.into())
                }
            }
        }
    }
}
