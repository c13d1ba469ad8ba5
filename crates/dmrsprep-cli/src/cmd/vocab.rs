//! `dmrsp vocab` — extract a label (or carg) vocabulary from a stream.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::error;

use dmrsprep_core::codec::{load, split_stream};
use dmrsprep_core::vocab::Vocab;

/// Arguments for `dmrsp vocab`.
#[derive(Args, Debug)]
pub struct VocabArgs {
    /// Count carg attributes instead of node/link labels.
    #[arg(long)]
    pub carg: bool,

    /// Input DMRS file (concatenated graphs).
    pub input: PathBuf,

    /// Output vocabulary file; "-" writes to stdout.
    pub output: String,
}

/// Execute `dmrsp vocab`.
///
/// Unparseable graphs are logged and skipped.
pub fn run(args: &VocabArgs) -> Result<()> {
    let mut vocab = Vocab::new();

    for (index, chunk) in split_stream(&super::read_text(&args.input)?).iter().enumerate() {
        match load(chunk) {
            Ok(graph) => {
                if args.carg {
                    vocab.record_cargs(&graph);
                } else {
                    vocab.record(&graph);
                }
            }
            Err(err) => {
                error!(graph = index, code = err.error_code(), "{err}");
            }
        }
    }

    let mut out = super::open_output(&args.output)?;
    vocab.write_to(&mut out).context("write vocabulary")?;
    Ok(())
}
