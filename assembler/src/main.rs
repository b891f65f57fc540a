use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mozu_core::format::{CharTable, TextCodec};
use mozu_core::nls::{Decoder, Encoding};
use mozu_core::script::{assemble_dir, ScriptSchema};

/// Assemble JSON listings back into scenario scripts of their original size.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory of `<name>.json` listings
    #[clap(short, long)]
    input: PathBuf,

    /// Directory receiving the binary scripts
    #[clap(short, long)]
    output: PathBuf,

    /// Character table to encode text with, usually a freshly generated one
    #[clap(short, long, default_value = "generated/system/System002")]
    table: PathBuf,

    /// Opcode schema (TOML); the built-in table is used without it
    #[clap(long)]
    schema: Option<PathBuf>,

    #[clap(short, long, default_value = "sjis")]
    nls: Encoding,
}

fn compile(args: Args) -> Result<()> {
    if !args.input.is_dir() {
        bail!("input is not a directory: {}", args.input.display());
    }

    let schema = ScriptSchema::load_or_builtin(args.schema.as_deref())
        .context("loading opcode schema")?;
    let table = CharTable::load(&args.table, Decoder::new(args.nls))
        .with_context(|| format!("loading character table {}", args.table.display()))?;
    let codec = TextCodec::new(&table);

    let count = assemble_dir(&args.input, &args.output, &schema, &codec)?;
    log::info!(
        "assembled {} scripts: {} -> {}",
        count,
        args.input.display(),
        args.output.display()
    );
    Ok(())
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();
    if let Err(e) = compile(args) {
        log::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
