//! `dmrsp wmap` — build a word-map from vocabulary files.
//!
//! Vocabulary counts are merged across all input files (they may be
//! concatenations of several extractions); ids are then assigned most
//! frequent first, continuing after the ids of an existing map when one
//! is given.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use dmrsprep_core::vocab::Vocab;
use dmrsprep_core::wmap::WordMap;

/// Arguments for `dmrsp wmap`.
#[derive(Args, Debug)]
pub struct WmapArgs {
    /// Existing word-map to extend.
    #[arg(long, value_name = "FILE")]
    pub existing: Option<PathBuf>,

    /// Input vocabulary file (`value\tcount` lines); may be a
    /// concatenation of several extractions.
    pub vocab: PathBuf,

    /// Output word-map file; "-" writes to stdout.
    pub output: String,
}

/// Execute `dmrsp wmap`.
pub fn run(args: &WmapArgs) -> Result<()> {
    let mut vocab = Vocab::new();
    for line in super::read_text(&args.vocab)?.lines() {
        vocab.merge_line(line);
    }

    let mut wmap = match args.existing.as_deref() {
        Some(path) => WordMap::load(path).context("load existing word-map")?,
        None => WordMap::new(),
    };
    for (value, _) in vocab.sorted() {
        wmap.get_or_add(value);
    }

    let mut out = super::open_output(&args.output)?;
    wmap.write_to(&mut out).context("write word-map")?;
    Ok(())
}
