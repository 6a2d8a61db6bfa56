use std::path::PathBuf;

use clap::Parser;

/// Manifold gateway command-line arguments
#[derive(Debug, Parser)]
#[command(name = "manifold", about = "OpenAI-compatible gateway over heterogeneous chat providers")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "MANIFOLD_CONFIG", default_value = "manifold.toml")]
    pub config: PathBuf,
}
