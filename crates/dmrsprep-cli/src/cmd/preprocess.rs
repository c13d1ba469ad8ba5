//! `dmrsp preprocess` — run the pipeline over a DMRS stream.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tracing::error;

use dmrsprep_core::codec::split_stream;
use dmrsprep_core::wmap::WordMap;
use dmrsprep_pipeline::align::table::RuleSet;
use dmrsprep_pipeline::filter_gpred::parse_filter_file;
use dmrsprep_pipeline::unknown::{Lemmatizer, SuffixLemmatizer};
use dmrsprep_pipeline::{CycleCounters, Options, process};

/// Arguments for `dmrsp preprocess`.
#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Align tokens to nodes.
    #[arg(short = 't', long)]
    pub token_align: bool,

    /// Align unaligned tokens to nodes using heuristic rules.
    #[arg(short = 'u', long)]
    pub unaligned_align: bool,

    /// Create label attributes for nodes and links.
    #[arg(short = 'l', long)]
    pub label: bool,

    /// Remove the LTOP link originating from node 0 and record it as an
    /// attribute.
    #[arg(short = 'r', long)]
    pub handle_ltop: bool,

    /// Rewrite unknown words (e.g. jumped/VBD) into standard form.
    #[arg(long)]
    pub handle_unknown: bool,

    /// Run the transfer-MT preparation rewrite first.
    #[arg(long)]
    pub mt_prep: bool,

    /// Filter out unneeded gpred nodes and their links; the file lists
    /// the filterable predicates.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub filter_gpred: Option<PathBuf>,

    /// Allow the gpred filter to disconnect the graph.
    #[arg(long)]
    pub allow_disconnected: bool,

    /// Curb gpred spans to at most this many tokens; longer alignments
    /// are dropped.
    #[arg(short = 'g', long, value_name = "N")]
    pub gpred_curb: Option<usize>,

    /// Remove cycles from the graph.
    #[arg(short = 'c', long)]
    pub cycle_remove: bool,

    /// Attach the untokenized sentence to the root.
    #[arg(long)]
    pub attach_untok: bool,

    /// Attach the tokenized sentence to the root.
    #[arg(long)]
    pub attach_tok: bool,

    /// Word-map file; enables tok/tok_idx annotation on aligned nodes.
    #[arg(long, value_name = "FILE")]
    pub wmap: Option<PathBuf>,

    /// Replacement heuristic table (TOML) for unaligned-token rules.
    #[arg(long, value_name = "FILE")]
    pub heuristics: Option<PathBuf>,

    /// Report cycle-remover counters to stderr when done.
    #[arg(long)]
    pub debug_counters: bool,

    /// Emit the counter report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Input DMRS file (concatenated graphs).
    pub input_dmrs: PathBuf,

    /// Untokenized sentences, one per line.
    pub input_untok: PathBuf,

    /// Tokenized sentences, one per line, space-separated.
    pub input_tok: PathBuf,

    /// Output DMRS file; "-" writes to stdout.
    pub output: String,
}

/// Execute `dmrsp preprocess`.
///
/// Graphs that fail to load (or hit a word-map miss) are logged and
/// skipped; the run continues with the next graph.
pub fn run(args: &PreprocessArgs) -> Result<()> {
    let dmrs_list = split_stream(&super::read_text(&args.input_dmrs)?);
    let untok_list: Vec<String> = super::read_text(&args.input_untok)?
        .trim_end_matches('\n')
        .lines()
        .map(|line| line.trim().to_string())
        .collect();
    let tok_list: Vec<Vec<String>> = super::read_text(&args.input_tok)?
        .trim_end_matches('\n')
        .lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect();

    let gpred_filter = args
        .filter_gpred
        .as_deref()
        .map(parse_filter_file)
        .transpose()
        .context("load gpred filter")?;
    let heuristics = match args.heuristics.as_deref() {
        Some(path) => RuleSet::load(path).context("load heuristic table")?,
        None => RuleSet::bundled(),
    };
    let word_map = args
        .wmap
        .as_deref()
        .map(WordMap::load)
        .transpose()
        .context("load word-map")?;
    let lemmatizer = SuffixLemmatizer;

    let options = Options {
        mt_prep: args.mt_prep,
        handle_ltop: args.handle_ltop,
        gpred_filter: gpred_filter.as_ref(),
        allow_disconnected: args.allow_disconnected,
        token_align: args.token_align,
        unaligned_align: args.unaligned_align,
        heuristics: args.unaligned_align.then_some(&heuristics),
        gpred_curb: args.gpred_curb,
        lemmatizer: args
            .handle_unknown
            .then_some(&lemmatizer as &dyn Lemmatizer),
        label: args.label,
        carg_clean: args.label,
        cycle_remove: args.cycle_remove,
        word_map: word_map.as_ref(),
        attach_untok: args.attach_untok,
        attach_tok: args.attach_tok,
    };

    let mut out = super::open_output(&args.output)?;
    let mut counters = CycleCounters::default();
    let empty_untok = String::new();
    let empty_tok: Vec<String> = Vec::new();

    for (index, dmrs) in dmrs_list.iter().enumerate() {
        let untok = untok_list.get(index).unwrap_or(&empty_untok);
        let tok = tok_list.get(index).unwrap_or(&empty_tok);

        match process(dmrs, untok, tok, &options, &mut counters) {
            Ok(processed) => {
                write!(out, "{processed}\n\n").context("write output")?;
            }
            Err(err) => {
                error!(graph = index, code = err.error_code(), "{err}");
                error!(graph = index, "offending input: {dmrs}");
            }
        }
    }
    out.flush().context("flush output")?;

    if args.debug_counters {
        report_counters(&counters, args.json)?;
    }
    Ok(())
}

fn report_counters(counters: &CycleCounters, json: bool) -> Result<()> {
    let mut err = std::io::stderr().lock();
    if json {
        let payload = serde_json::to_string_pretty(counters).context("serialize counters")?;
        writeln!(err, "{payload}").context("write counters")?;
    } else {
        writeln!(
            err,
            "cycle remover: iterations={} graphs_with_cycle={} conj_index={} eq={} control={} small_clause={} conj_verb_or_adj={} default={} none_detected={} def_or_not_broken={}",
            counters.cycle,
            counters.has_cycle,
            counters.conj_index,
            counters.eq,
            counters.control,
            counters.small_clause,
            counters.conj_verb_or_adj,
            counters.default,
            counters.none_detected,
            counters.def_or_not_broken,
        )
        .context("write counters")?;
    }
    Ok(())
}
