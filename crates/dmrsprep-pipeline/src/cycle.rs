//! Pattern-driven cycle removal.
//!
//! Iteratively detects a cycle (directed peeling first, then undirected),
//! matches it against an ordered list of linguistic patterns, and removes
//! the edge the first matching pattern designates. When no pattern
//! matches, a token-distance default removes the longest-spanning edge;
//! when even that is impossible (all endpoints unaligned) the graph is
//! emitted as-is with the unbroken flag raised.
//!
//! Every successful iteration removes one edge from a finite set, so the
//! loop terminates.

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::{debug, warn};

use dmrsprep_core::{Graph, Node, NodeId};

static ARG23_H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ARG[23]_H").expect("static pattern compiles"));

/// Removal identity of an edge.
type EdgeKey = (NodeId, NodeId, String);

/// Corpus-level counters for cycle-remover outcomes.
///
/// Exposed behind the debug flag so corpus behavior is observable.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleCounters {
    /// Cycle-detection iterations across all graphs.
    pub cycle: u64,
    /// Conjunction-index mismatches resolved.
    pub conj_index: u64,
    /// EQ edges removed.
    pub eq: u64,
    /// Subject-control patterns resolved.
    pub control: u64,
    /// Small-clause patterns resolved.
    pub small_clause: u64,
    /// Conjunction-of-verbs/adjectives patterns resolved.
    pub conj_verb_or_adj: u64,
    /// Token-distance default removals.
    pub default: u64,
    /// Iterations where nothing (not even the default) applied.
    pub none_detected: u64,
    /// Graphs that contained at least one cycle.
    pub has_cycle: u64,
    /// Graphs resolved by the default or left unbroken.
    pub def_or_not_broken: u64,
}

/// Break cycles in place. Returns true when a cycle could not be broken.
pub fn remove_cycles(graph: &mut Graph, counters: &mut CycleCounters) -> bool {
    let mut saw_cycle = false;
    let mut def_or_not_broken = false;
    let mut unbroken = false;

    loop {
        let cycle = graph.any_cycle();
        if cycle.is_empty() {
            break;
        }
        saw_cycle = true;
        counters.cycle += 1;

        if conjunction_index(graph, &cycle) {
            counters.conj_index += 1;
            continue;
        }
        if eq_edge(graph, &cycle) {
            counters.eq += 1;
            continue;
        }
        if subject_control(graph, &cycle) {
            counters.control += 1;
            continue;
        }
        if small_clause(graph, &cycle) {
            counters.small_clause += 1;
            continue;
        }
        if conjunction_verb_or_adj(graph, &cycle) {
            counters.conj_verb_or_adj += 1;
            continue;
        }
        if default_cut(graph, &cycle) {
            counters.default += 1;
            def_or_not_broken = true;
            continue;
        }

        counters.none_detected += 1;
        def_or_not_broken = true;
        unbroken = true;
        warn!(nodes = cycle.len(), "cycle could not be broken");
        break;
    }

    if saw_cycle {
        counters.has_cycle += 1;
    }
    if def_or_not_broken {
        counters.def_or_not_broken += 1;
    }
    unbroken
}

/// Conjunction node test: `pos == c`, or a gpred starting with
/// `implicit_conj`.
fn is_conj(node: &Node) -> bool {
    node.pos() == Some("c") || node.gpred().is_some_and(|g| g.starts_with("implicit_conj"))
}

/// Cycle nodes in ascending id order whose node passes `pred`.
fn cycle_nodes<'a>(
    graph: &'a Graph,
    cycle: &BTreeSet<NodeId>,
    pred: impl Fn(&Node) -> bool + 'a,
) -> Vec<NodeId> {
    cycle
        .iter()
        .copied()
        .filter(|&id| graph.node(id).is_some_and(&pred))
        .collect()
}

/// In-cycle outgoing edges of a node as `(label, target, key)` triples,
/// in document order.
fn outgoing_in_cycle(
    graph: &Graph,
    id: NodeId,
    cycle: &BTreeSet<NodeId>,
) -> Vec<(String, NodeId, EdgeKey)> {
    graph
        .outgoing(id)
        .filter(|e| cycle.contains(&e.to))
        .map(|e| (e.arg_label(), e.to, e.key()))
        .collect()
}

/// In-cycle incoming edges of a node as `(label, source, key)` triples,
/// in document order.
fn incoming_in_cycle(
    graph: &Graph,
    id: NodeId,
    cycle: &BTreeSet<NodeId>,
) -> Vec<(String, NodeId, EdgeKey)> {
    graph
        .incoming(id)
        .filter(|e| cycle.contains(&e.from))
        .map(|e| (e.arg_label(), e.from, e.key()))
        .collect()
}

/// Minimum token distance between two aligned nodes, if both are aligned.
fn token_distance(graph: &Graph, from: NodeId, to: NodeId) -> Option<usize> {
    let from_toks = graph.node(from)?.aligned_tokens();
    let to_toks = graph.node(to)?.aligned_tokens();
    if from_toks.is_empty() || to_toks.is_empty() {
        return None;
    }
    from_toks
        .iter()
        .cartesian_product(to_toks.iter())
        .map(|(&x, &y)| x.abs_diff(y))
        .min()
}

/// Pattern 1 — conjunction-index mismatch.
///
/// A conjunction whose `R-INDEX` and `R-HNDL` (or `L-INDEX` and `L-HNDL`)
/// point at different in-cycle targets loses the INDEX edge.
fn conjunction_index(graph: &mut Graph, cycle: &BTreeSet<NodeId>) -> bool {
    for conj in cycle_nodes(graph, cycle, is_conj) {
        let outgoing = outgoing_in_cycle(graph, conj, cycle);

        // Last edge wins per prefix, like a dict comprehension.
        let mut by_prefix: HashMap<&str, NodeId> = HashMap::new();
        for (label, to, _) in &outgoing {
            let prefix = label.split('_').next().unwrap_or(label.as_str());
            by_prefix.insert(prefix, *to);
        }

        let mut detected = false;
        for side in ["R", "L"] {
            let index_prefix = format!("{side}-INDEX");
            let hndl_prefix = format!("{side}-HNDL");
            let (Some(&index_to), Some(&hndl_to)) = (
                by_prefix.get(index_prefix.as_str()),
                by_prefix.get(hndl_prefix.as_str()),
            ) else {
                continue;
            };
            if index_to == hndl_to {
                continue;
            }
            detected = true;
            if let Some((_, _, key)) = outgoing
                .iter()
                .find(|(label, _, _)| label.starts_with(&index_prefix))
            {
                debug!(edge = ?key, "conjunction-index mismatch: removing INDEX edge");
                graph.remove_edge(key);
            }
        }
        if detected {
            return true;
        }
    }
    false
}

/// Pattern 2 — EQ removal: some in-cycle edge is labeled bare `EQ`.
fn eq_edge(graph: &mut Graph, cycle: &BTreeSet<NodeId>) -> bool {
    for id in cycle_nodes(graph, cycle, |_| true) {
        let key = outgoing_in_cycle(graph, id, cycle)
            .into_iter()
            .filter(|(label, _, _)| label == "EQ")
            .last();
        if let Some((_, _, key)) = key {
            debug!(edge = ?key, "removing EQ edge");
            graph.remove_edge(&key);
            return true;
        }
    }
    false
}

/// Pattern 3 — subject control.
///
/// A verb with an incoming `ARG2_H`/`ARG3_H` (directly, or through a
/// `neg_rel` node reached by `ARG1_H`) and an outgoing `ARG1_NEQ` loses
/// the `ARG1_NEQ` edge.
fn subject_control(graph: &mut Graph, cycle: &BTreeSet<NodeId>) -> bool {
    for verb in cycle_nodes(graph, cycle, |n| n.pos() == Some("v")) {
        let incoming = incoming_in_cycle(graph, verb, cycle);

        if !incoming.iter().any(|(label, _, _)| ARG23_H.is_match(label)) {
            // Last ARG1_H wins, like the original label dict.
            let Some((_, neg, _)) = incoming
                .iter()
                .filter(|(label, _, _)| label == "ARG1_H")
                .last()
            else {
                continue;
            };
            if graph.node(*neg).and_then(Node::gpred) != Some("neg_rel") {
                continue;
            }
            let neg_incoming = incoming_in_cycle(graph, *neg, cycle);
            if !neg_incoming
                .iter()
                .any(|(label, _, _)| ARG23_H.is_match(label))
            {
                continue;
            }
        }

        let arg1_neq = outgoing_in_cycle(graph, verb, cycle)
            .into_iter()
            .find(|(label, _, _)| label == "ARG1_NEQ");
        if let Some((_, _, key)) = arg1_neq {
            debug!(edge = ?key, "subject control: removing ARG1_NEQ");
            graph.remove_edge(&key);
            return true;
        }
    }
    false
}

/// Pattern 4 — small clause.
///
/// A verb with `ARG3_H` to a preposition that itself has an in-cycle
/// `ARG1_NEQ` loses its `ARG2_NEQ` edge, or its `ARG2_EQ` edge to a noun.
fn small_clause(graph: &mut Graph, cycle: &BTreeSet<NodeId>) -> bool {
    for verb in cycle_nodes(graph, cycle, |n| n.pos() == Some("v")) {
        let outgoing = outgoing_in_cycle(graph, verb, cycle);
        let mut by_label: HashMap<&str, NodeId> = HashMap::new();
        for (label, to, _) in &outgoing {
            by_label.insert(label.as_str(), *to);
        }

        let Some(&prep) = by_label.get("ARG3_H") else {
            continue;
        };
        if graph.node(prep).and_then(Node::pos) != Some("p") {
            continue;
        }
        if !outgoing_in_cycle(graph, prep, cycle)
            .iter()
            .any(|(label, _, _)| label == "ARG1_NEQ")
        {
            continue;
        }

        if by_label.contains_key("ARG2_NEQ") {
            if let Some((_, _, key)) = outgoing.iter().find(|(label, _, _)| label == "ARG2_NEQ") {
                debug!(edge = ?key, "small clause: removing ARG2_NEQ");
                graph.remove_edge(key);
                return true;
            }
        }
        if let Some(&noun) = by_label.get("ARG2_EQ") {
            if graph.node(noun).and_then(Node::pos) == Some("n") {
                if let Some((_, _, key)) = outgoing.iter().find(|(label, _, _)| label == "ARG2_EQ")
                {
                    debug!(edge = ?key, "small clause: removing ARG2_EQ to noun");
                    graph.remove_edge(key);
                    return true;
                }
            }
        }
    }
    false
}

/// Pattern 5 — conjunction of verbs or adjectives.
///
/// A conjunction of exactly two verbs/adjectives that share an in-cycle
/// target keeps only the token-closest conjunct edge into each shared
/// target; the rest are removed.
fn conjunction_verb_or_adj(graph: &mut Graph, cycle: &BTreeSet<NodeId>) -> bool {
    for conj in cycle_nodes(graph, cycle, is_conj) {
        let conjuncts: BTreeSet<NodeId> = outgoing_in_cycle(graph, conj, cycle)
            .into_iter()
            .filter(|(_, to, _)| {
                matches!(graph.node(*to).and_then(Node::pos), Some("v" | "a"))
            })
            .map(|(_, to, _)| to)
            .collect();
        if conjuncts.len() != 2 {
            continue;
        }

        let targets: Vec<BTreeSet<NodeId>> = conjuncts
            .iter()
            .map(|&c| {
                outgoing_in_cycle(graph, c, cycle)
                    .into_iter()
                    .map(|(_, to, _)| to)
                    .collect()
            })
            .collect();
        let common: BTreeSet<NodeId> = targets[0].intersection(&targets[1]).copied().collect();
        if common.is_empty() {
            continue;
        }

        let mut ranked: Vec<(usize, EdgeKey)> = Vec::new();
        for &target in &common {
            for edge in graph.incoming(target) {
                if !conjuncts.contains(&edge.from) {
                    continue;
                }
                if let Some(distance) = token_distance(graph, edge.from, edge.to) {
                    ranked.push((distance, edge.key()));
                }
            }
        }
        ranked.sort_by_key(|(distance, _)| *distance);
        for (_, key) in ranked.iter().skip(1) {
            debug!(edge = ?key, "conjunction of verbs/adjectives: removing farther edge");
            graph.remove_edge(key);
        }
        return true;
    }
    false
}

/// Default — remove the in-cycle edge spanning the largest token distance.
///
/// Ties break deterministically on the `(from, to, label)` key. False when
/// no in-cycle edge has both endpoints aligned.
fn default_cut(graph: &mut Graph, cycle: &BTreeSet<NodeId>) -> bool {
    let mut best: Option<(usize, EdgeKey)> = None;
    for id in cycle {
        for (_, to, key) in outgoing_in_cycle(graph, *id, cycle) {
            if let Some(distance) = token_distance(graph, *id, to) {
                let candidate = (distance, key);
                if best.as_ref().map_or(true, |b| candidate > *b) {
                    best = Some(candidate);
                }
            }
        }
    }
    if let Some((distance, key)) = best {
        debug!(edge = ?key, distance, "default: removing farthest edge");
        graph.remove_edge(&key);
        return true;
    }
    false
}
