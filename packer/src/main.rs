use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mozu_core::format::archive::{pack_dir, unpack_file};

/// Unpack and repack offset-table archives.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split an archive into numbered member files
    Unpack {
        /// Archive file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the members
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Concatenate every file of a directory into an archive
    Pack {
        /// Directory of members
        #[arg(short, long)]
        input: PathBuf,

        /// Archive file to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Unpack { input, output } => {
            let report = unpack_file(&input, &output)
                .with_context(|| format!("unpacking {}", input.display()))?;
            if !report.warnings.is_empty() {
                log::warn!(
                    "{}: {} container warning(s)",
                    input.display(),
                    report.warnings.len()
                );
            }
        }
        Command::Pack { input, output } => {
            let order = pack_dir(&input, &output)
                .with_context(|| format!("packing {}", input.display()))?;
            log::info!("packed {} members into {}", order.len(), output.display());
        }
    }
    Ok(())
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
