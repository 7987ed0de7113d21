/// Calico manifest generator
///
/// Writes the self-hosted Calico (policy-only mode) manifest for a cluster,
/// filling in the cluster CIDR and the kubelet config location.
mod config;
mod manifest;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{FileConfig, GeneratorConfig};
use crate::manifest::ManifestGenerator;

const USAGE: &str = "usage: generate [full cluster CIDR]\n   ex: generate 192.168.0.0/16";

#[derive(Parser)]
#[command(name = "generate")]
#[command(about = "Generate the Calico manifest for a Kubernetes cluster", long_about = None)]
struct Cli {
    /// Full cluster CIDR (e.g., "192.168.0.0/16")
    cluster_cidr: String,

    /// Optional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for generated manifests [default: .]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Home directory substituted into the kubelet path (defaults to $HOME)
    #[arg(long)]
    home: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => {
            println!("{}", USAGE);
            std::process::exit(1);
        }
    };

    // Initialize tracing; stdout is reserved for progress output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        // The failure must be reported even when RUST_LOG filters it out
        if tracing::enabled!(Level::ERROR) {
            error!("Error: {:#}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Resolve configuration and write all manifests
async fn run(cli: Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::from_file(path).context("Failed to load configuration")?,
        None => FileConfig::default(),
    };

    let config = GeneratorConfig::resolve(cli.cluster_cidr, cli.home, cli.output, file_config)
        .context("Failed to resolve configuration")?;
    debug!("Resolved configuration: {:?}", config);

    println!("User home directory: {}", config.context.home_dir);
    println!("Generating manifests in local directory...");

    let generator = ManifestGenerator::new(config.context, config.output_dir);
    let mut stdout = std::io::stdout();
    for manifest in generator.generate(&mut stdout).await? {
        debug!("{} ({} bytes)", manifest.path.display(), manifest.bytes);
    }

    println!("All done.");

    Ok(())
}
