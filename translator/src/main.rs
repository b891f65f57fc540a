use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mozu_core::config::record_table_size;
use mozu_core::nls::{Decoder, Encoding};
use mozu_core::script::ScriptSchema;
use mozu_core::translate::{
    extract, load_corpus, load_units, merge, save_corpus, save_units, table_from_units,
};

/// Translation unit extraction, merge and character table generation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect speaker names and dialogue lines into a translation unit list
    Extract {
        /// Directory of disassembled listings
        #[arg(short, long)]
        path: PathBuf,

        #[arg(short, long, default_value = "raw.json")]
        output: PathBuf,

        /// Opcode schema (TOML); the built-in table is used without it
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Write translated units back into the disassembled listings
    Replace {
        /// Directory of disassembled listings
        #[arg(short, long)]
        path: PathBuf,

        /// Translated unit list, same count and order as the extracted one
        #[arg(short, long, default_value = "translated.json")]
        text: PathBuf,

        #[arg(short, long, default_value = "translated")]
        output_dir: PathBuf,

        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Generate a character table covering a translated unit list
    Charset {
        #[arg(short, long, default_value = "generated/translated.json")]
        text: PathBuf,

        /// Table file to write
        #[arg(short, long, default_value = "generated/system/System002")]
        output: PathBuf,

        /// Build configuration receiving the table size
        #[arg(short, long, default_value = "generated/config.json")]
        config: PathBuf,

        #[arg(short, long, default_value = "sjis")]
        nls: Encoding,
    },
}

fn load_schema(path: Option<&Path>) -> Result<ScriptSchema> {
    ScriptSchema::load_or_builtin(path).context("loading opcode schema")
}

fn check_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("not a directory: {}", path.display());
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Extract {
            path,
            output,
            schema,
        } => {
            check_dir(&path)?;
            let schema = load_schema(schema.as_deref())?;
            let corpus = load_corpus(&path)?;
            let units = extract(&corpus, &schema.roles)?;
            save_units(&output, &units)
                .with_context(|| format!("writing {}", output.display()))?;
            log::info!(
                "extracted {} units from {} scripts into {}",
                units.len(),
                corpus.len(),
                output.display()
            );
        }
        Command::Replace {
            path,
            text,
            output_dir,
            schema,
        } => {
            check_dir(&path)?;
            let schema = load_schema(schema.as_deref())?;
            let corpus = load_corpus(&path)?;
            let units =
                load_units(&text).with_context(|| format!("reading {}", text.display()))?;
            let merged = merge(&corpus, &units, &schema.roles)?;
            save_corpus(&output_dir, &merged)?;
            log::info!(
                "merged {} units into {} scripts under {}",
                units.len(),
                merged.len(),
                output_dir.display()
            );
        }
        Command::Charset {
            text,
            output,
            config,
            nls,
        } => {
            let units =
                load_units(&text).with_context(|| format!("reading {}", text.display()))?;
            let generated = table_from_units(&units, Decoder::new(nls))?;
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, &generated.blob)
                .with_context(|| format!("writing {}", output.display()))?;
            record_table_size(&config, generated.size())?;
            log::info!(
                "{}: {} glyphs, {} bytes",
                output.display(),
                generated.glyph_count(),
                generated.size()
            );
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
