//! `dmrsp map` — annotate `label_idx` attributes from a word-map.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tracing::error;

use dmrsprep_core::codec::{dump, load, split_stream};
use dmrsprep_core::wmap::WordMap;
use dmrsprep_pipeline::map_tokens::map_labels;

/// Arguments for `dmrsp map`.
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Input DMRS file with label attributes.
    pub input: PathBuf,

    /// Word-map file.
    pub wmap: PathBuf,

    /// Output DMRS file; "-" writes to stdout.
    pub output: String,
}

/// Execute `dmrsp map`.
///
/// Labels missing from the map get fresh ids for the duration of the run;
/// empty graphs pass through as raw text, unparseable ones are logged and
/// skipped.
pub fn run(args: &MapArgs) -> Result<()> {
    let mut wmap = WordMap::load(&args.wmap).context("load word-map")?;
    let mut out = super::open_output(&args.output)?;

    for (index, chunk) in split_stream(&super::read_text(&args.input)?).iter().enumerate() {
        match load(chunk) {
            Ok(mut graph) => {
                if graph.is_empty() {
                    write!(out, "{chunk}\n\n").context("write output")?;
                    continue;
                }
                map_labels(&mut graph, &mut wmap);
                write!(out, "{}\n\n", dump(&graph)).context("write output")?;
            }
            Err(err) => {
                error!(graph = index, code = err.error_code(), "{err}");
            }
        }
    }
    out.flush().context("flush output")?;
    Ok(())
}
