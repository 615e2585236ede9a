//! cadcdn - Prepare CAD robot assets for CDN distribution

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{hook, manifest, process, upload};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadcdn")]
#[command(about = "Content-hash URDF assets and publish them to a CDN", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash meshes, rewrite the URDF and write the manifest
    Process {
        /// Project directory containing the URDF and assets
        #[arg(long, default_value = ".")]
        root: String,

        /// URDF to process (defaults to the first *.urdf in the root)
        #[arg(long)]
        document: Option<String>,

        /// Override the output directory name
        #[arg(long)]
        output_dir: Option<String>,

        /// Process meshes on all cores
        #[arg(long)]
        parallel: bool,

        /// Extra manifest metadata (KEY=VALUE, repeatable)
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },

    /// Upload a processed directory to R2
    Upload {
        /// Project directory containing the processed output
        #[arg(long, default_value = ".")]
        root: String,

        /// Copy into a local directory instead of R2
        #[arg(long)]
        to_dir: Option<String>,
    },

    /// Run the post-conversion hook with the converter's config
    Hook {
        /// Converter config.json
        #[arg(long)]
        host_config: String,

        /// Converter output directory (defaults to the config's directory)
        #[arg(long)]
        root: Option<String>,
    },

    /// Show the contents of a manifest
    Manifest {
        /// Path to manifest.json
        path: String,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            root,
            document,
            output_dir,
            parallel,
            metadata,
        } => process::run(process::ProcessArgs {
            root,
            document,
            output_dir,
            parallel,
            metadata,
        }),
        Commands::Upload { root, to_dir } => upload::run(&root, to_dir.as_deref()),
        Commands::Hook { host_config, root } => hook::run(&host_config, root.as_deref()),
        Commands::Manifest { path } => manifest::run(&path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("robot=openarm").unwrap(),
            ("robot".to_string(), "openarm".to_string())
        );
        assert_eq!(
            parse_key_value("commit=a=b").unwrap(),
            ("commit".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_parses_upload() {
        let cli = Cli::try_parse_from(["cadcdn", "upload", "--to-dir", "out"]).unwrap();
        match cli.command {
            Commands::Upload { root, to_dir } => {
                assert_eq!(root, ".");
                assert_eq!(to_dir.as_deref(), Some("out"));
            }
            _ => panic!("expected upload"),
        }
    }
}
