pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "docverify")]
#[command(about = "Register documents on IPFS and Ethereum, and verify them later")]
#[command(version)]
pub struct Args {
    /// Daemon API to talk to (defaults to localhost on the configured api_port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the docverify config directory (defaults to ~/.docverify)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
