#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pkgwalk_core::{PackageMeta, WalkEvent, WalkOptions, Walker};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pkgwalk")]
#[command(author, version, about = "Stream every installed package reachable from a project root", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit one JSON object per package instead of human-readable lines
    #[arg(long)]
    json: bool,

    /// Override the working directory
    #[arg(long, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Maximum number of concurrently executing filesystem tasks
    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    /// Also walk the root package's devDependencies
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let root = match cli.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().into_diagnostic()?,
    };
    tracing::debug!(root = %root.display(), "starting walk");

    let walker = Walker::new(root).with_options(WalkOptions {
        concurrency: cli.concurrency,
        dev: cli.dev,
    });

    let mut events = walker.run();
    while let Some(event) = events.recv().await {
        match event {
            WalkEvent::Package(meta) => print_package(&meta, cli.json)?,
            WalkEvent::End => {
                println!("done");
                break;
            }
            WalkEvent::Error(err) => return Err(err).into_diagnostic(),
        }
    }

    Ok(())
}

fn print_package(meta: &PackageMeta, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(meta).into_diagnostic()?);
    } else {
        match &meta.parent {
            Some(parent) => println!(
                "{}@{} {} (via {})",
                meta.name,
                meta.version,
                meta.path.display(),
                parent.name
            ),
            None => println!("{}@{} {}", meta.name, meta.version, meta.path.display()),
        }
    }
    Ok(())
}
