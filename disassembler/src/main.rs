use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use mozu_core::format::{CharTable, TextCodec};
use mozu_core::nls::{Decoder, Encoding};
use mozu_core::script::{disassemble_dir, ScriptSchema};

/// Disassemble raw scenario scripts into editable JSON listings.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory of raw script files
    #[arg(short, long, required = true)]
    input: PathBuf,

    /// Directory receiving `<name>.json` listings
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Character table the scripts were written with
    #[arg(short, long, default_value = "system/System002")]
    table: PathBuf,

    /// Opcode schema (TOML); the built-in table is used without it
    #[arg(long)]
    schema: Option<PathBuf>,

    #[arg(short, long, default_value = "sjis")]
    nls: Encoding,
}

fn run(args: Args) -> Result<()> {
    if !args.input.is_dir() {
        bail!("input is not a directory: {}", args.input.display());
    }

    let schema = ScriptSchema::load_or_builtin(args.schema.as_deref())
        .context("loading opcode schema")?;
    let table = CharTable::load(&args.table, Decoder::new(args.nls))
        .with_context(|| format!("loading character table {}", args.table.display()))?;
    let codec = TextCodec::new(&table);

    let count = disassemble_dir(&args.input, &args.output, &schema, &codec)?;
    log::info!(
        "disassembled {} scripts: {} -> {}",
        count,
        args.input.display(),
        args.output.display()
    );
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
