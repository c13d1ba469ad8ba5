//! Pipeline orchestrator.
//!
//! Drives the stages in their fixed order:
//! MT-prep → LTOP → gpred filter → token align → unaligned align → span
//! curb → unknown-word rewrite → labeler → cycle remover → token-ID
//! annotation → untok/tok attachment. Every stage is individually
//! toggleable; this module is the only place that knows the order.
//!
//! An empty graph passes through as its raw text. A graph that fails to
//! load aborts its own pipeline without affecting others; the caller
//! decides whether to skip or stop.

use std::collections::BTreeSet;
use tracing::warn;

use dmrsprep_core::wmap::WordMap;
use dmrsprep_core::{DmrsError, codec};

use crate::align;
use crate::align::table::RuleSet;
use crate::cycle::{CycleCounters, remove_cycles};
use crate::filter_gpred::{curb_spans, filter_gpred};
use crate::label::label_graph;
use crate::ltop::handle_ltop;
use crate::map_tokens::map_tokens;
use crate::mt_prep::mt_prep;
use crate::unknown::{Lemmatizer, rewrite_unknown};

/// Stage toggles and shared read-only resources for one run.
///
/// The word-map is in its lookup phase here; building it happens in the
/// ID-mapping tools, not in the pipeline.
#[derive(Default)]
pub struct Options<'a> {
    /// Run the transfer-MT preparation rewrite.
    pub mt_prep: bool,
    /// Strip ghost LTOP links into the `ltop` attribute.
    pub handle_ltop: bool,
    /// Remove gpred nodes named in this set.
    pub gpred_filter: Option<&'a BTreeSet<String>>,
    /// Allow the gpred filter to disconnect the graph.
    pub allow_disconnected: bool,
    /// Align node character spans to tokens.
    pub token_align: bool,
    /// Attach unaligned tokens by heuristic table (needs `heuristics`).
    pub unaligned_align: bool,
    /// Heuristic table for `unaligned_align`.
    pub heuristics: Option<&'a RuleSet>,
    /// Curb gpred spans longer than this many tokens.
    pub gpred_curb: Option<usize>,
    /// Rewrite unknown-word nodes through this oracle.
    pub lemmatizer: Option<&'a dyn Lemmatizer>,
    /// Write canonical labels.
    pub label: bool,
    /// Strip quotes off `carg` attributes while labeling.
    pub carg_clean: bool,
    /// Break cycles.
    pub cycle_remove: bool,
    /// Annotate `tok`/`tok_idx` from this word-map.
    pub word_map: Option<&'a WordMap>,
    /// Attach the untokenized sentence to the root.
    pub attach_untok: bool,
    /// Attach the tokenized sentence to the root.
    pub attach_tok: bool,
}

/// Run the pipeline over one DMRS chunk.
///
/// # Errors
///
/// Propagates codec errors and the word-map lookup failures of
/// [`map_tokens`]; each aborts only this graph.
pub fn process(
    dmrs: &str,
    untok: &str,
    tok: &[String],
    options: &Options<'_>,
    counters: &mut CycleCounters,
) -> Result<String, DmrsError> {
    let mut graph = codec::load(dmrs)?;

    if graph.is_empty() {
        return Ok(dmrs.to_string());
    }

    if options.mt_prep {
        mt_prep(&mut graph);
    }
    if options.handle_ltop {
        handle_ltop(&mut graph);
    }
    if let Some(filter) = options.gpred_filter {
        filter_gpred(
            &mut graph,
            filter,
            options.handle_ltop,
            options.allow_disconnected,
        );
    }
    if options.token_align {
        align::align(&mut graph, untok, tok);
    }
    if options.unaligned_align {
        if !options.token_align {
            warn!("token alignment is needed before aligning unaligned tokens");
        }
        if let Some(table) = options.heuristics {
            align::heuristics::align_unaligned(&mut graph, tok, table);
        }
    }
    if let Some(limit) = options.gpred_curb {
        curb_spans(&mut graph, limit);
    }
    if let Some(lemmatizer) = options.lemmatizer {
        rewrite_unknown(&mut graph, lemmatizer);
    }
    if options.label {
        label_graph(&mut graph, options.carg_clean);
    }
    if options.cycle_remove {
        remove_cycles(&mut graph, counters);
    }
    if let Some(wmap) = options.word_map {
        map_tokens(&mut graph, tok, wmap)?;
    }
    if options.attach_untok {
        graph.set_attr("untok", untok);
    }
    if options.attach_tok {
        graph.set_attr("tok", &tok.join(" "));
    }

    Ok(codec::dump(&graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unknown::SuffixLemmatizer;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    const LTOP_SAMPLE: &str = concat!(
        r#"<dmrs cfrom="0" cto="7">"#,
        r#"<node nodeid="10" cfrom="0" cto="2"><realpred lemma="dog" pos="n"/></node>"#,
        r#"<node nodeid="20" cfrom="4" cto="7"><realpred lemma="run" pos="v"/><sortinfo tense="past"/></node>"#,
        r#"<link from="0" to="10"><post>H</post></link>"#,
        r#"<link from="10" to="20"><rargname>ARG1</rargname><post>NEQ</post></link>"#,
        "</dmrs>"
    );

    #[test]
    fn ltop_handling_scenario() {
        let options = Options {
            handle_ltop: true,
            ..Options::default()
        };
        let mut counters = CycleCounters::default();
        let out = process(LTOP_SAMPLE, "dog runs", &tokens(&["dog", "runs"]), &options, &mut counters)
            .expect("process");

        assert!(out.contains(r#"ltop="10""#));
        assert!(out.contains(r#"index="-1""#));
        assert!(!out.contains(r#"from="0""#));
    }

    #[test]
    fn empty_graph_passes_through_unchanged() {
        let raw = r#"<dmrs cfrom="-1" cto="-1"></dmrs>"#;
        let options = Options {
            handle_ltop: true,
            label: true,
            ..Options::default()
        };
        let mut counters = CycleCounters::default();
        let out = process(raw, "", &tokens(&[]), &options, &mut counters).expect("process");
        assert_eq!(out, raw);
    }

    #[test]
    fn full_pipeline_aligns_labels_and_attaches() {
        let table = RuleSet::bundled();
        let options = Options {
            handle_ltop: true,
            token_align: true,
            unaligned_align: true,
            heuristics: Some(&table),
            label: true,
            carg_clean: true,
            cycle_remove: true,
            attach_untok: true,
            attach_tok: true,
            ..Options::default()
        };
        let mut counters = CycleCounters::default();
        let out = process(
            LTOP_SAMPLE,
            "dog runs",
            &tokens(&["dog", "runs"]),
            &options,
            &mut counters,
        )
        .expect("process");

        assert!(out.contains(r#"label="_dog_n_3_sg""#));
        assert!(out.contains(r#"label="ARG1_NEQ""#));
        assert!(out.contains(r#"tokalign="0""#));
        assert!(out.contains(r#"untok="dog runs""#));
        assert!(out.contains(r#"tok="dog runs""#));
    }

    #[test]
    fn lemmatizer_stage_runs_when_injected() {
        let raw = concat!(
            r#"<dmrs cfrom="0" cto="6">"#,
            r#"<node nodeid="10" cfrom="0" cto="5"><realpred lemma="jumped/VBD" pos="u" sense="unknown"/></node>"#,
            "</dmrs>"
        );
        let lemmatizer = SuffixLemmatizer;
        let options = Options {
            lemmatizer: Some(&lemmatizer),
            label: true,
            ..Options::default()
        };
        let mut counters = CycleCounters::default();
        let out = process(raw, "jumped", &tokens(&["jumped"]), &options, &mut counters)
            .expect("process");
        assert!(out.contains(r#"lemma="jump""#));
        assert!(out.contains(r#"pos="v""#));
        assert!(out.contains(r#"label="_jump_v""#));
    }

    #[test]
    fn word_map_stage_annotates_tokens() {
        let mut wmap = WordMap::new();
        wmap.get_or_add("dog");
        wmap.get_or_add("runs");
        let options = Options {
            handle_ltop: true,
            token_align: true,
            word_map: Some(&wmap),
            ..Options::default()
        };
        let mut counters = CycleCounters::default();
        let out = process(
            LTOP_SAMPLE,
            "dog runs",
            &tokens(&["dog", "runs"]),
            &options,
            &mut counters,
        )
        .expect("process");
        assert!(out.contains(r#"tok_idx="0""#));
        assert!(out.contains(r#"tok_idx="1""#));
    }

    #[test]
    fn word_map_miss_aborts_graph() {
        let wmap = WordMap::new();
        let options = Options {
            token_align: true,
            word_map: Some(&wmap),
            ..Options::default()
        };
        let mut counters = CycleCounters::default();
        let err = process(
            LTOP_SAMPLE,
            "dog runs",
            &tokens(&["dog", "runs"]),
            &options,
            &mut counters,
        )
        .expect_err("should fail");
        assert_eq!(err.error_code(), "E4001");
    }
}
