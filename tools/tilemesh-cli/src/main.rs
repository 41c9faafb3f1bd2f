//! tilemesh - run UV tiling and vertex color pipelines over OBJ meshes.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tilemesh_cli::{RunOptions, registry, run};

#[derive(Parser)]
#[command(name = "tilemesh")]
#[command(about = "Per-face UV tiling and vertex color tools for polygon meshes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an operator pipeline and write the result as OBJ
    Run {
        /// Input OBJ file (omit when the pipeline starts with a primitive)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Pipeline JSON file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Output OBJ file
        #[arg(short, long)]
        output: PathBuf,

        /// Enter edit mode before running
        #[arg(long)]
        edit: bool,

        /// Select all faces and vertices before running
        #[arg(long)]
        select_all: bool,

        /// UV layer to export (default: active layer)
        #[arg(long)]
        uv_layer: Option<String>,
    },

    /// List registered operators
    Ops,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            pipeline,
            output,
            edit,
            select_all,
            uv_layer,
        } => {
            run(&RunOptions {
                input,
                pipeline,
                output,
                edit,
                select_all,
                uv_layer,
            })?;
        }
        Commands::Ops => {
            for name in registry().type_names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
