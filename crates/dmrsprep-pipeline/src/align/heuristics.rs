//! Unaligned-token attachment.
//!
//! After basic alignment, tokens not covered by any node are assigned to
//! existing aligned nodes by table-driven directional search. Unaligned
//! tokens are computed by sorting node alignments by length (ascending)
//! and greedily subtracting contiguous sublists from the token range, so
//! a long gpred span does not drown out the shorter spans inside it.
//!
//! Adjacent unaligned pairs are tried before singletons; resolved tokens
//! merge into the target node's alignment as a sorted union. A token the
//! table cannot resolve simply stays unaligned.

use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use dmrsprep_core::{Graph, NodeId};

use super::table::{RuleSet, Strategy, StrategyKind};

/// Attach unaligned tokens to aligned nodes using the heuristic table.
pub fn align_unaligned(graph: &mut Graph, tok: &[String], table: &RuleSet) {
    let (unaligned, toks_to_nodes) = unaligned_tokens(graph, tok.len());

    let mut tok_to_node: BTreeMap<usize, NodeId> = BTreeMap::new();
    let mut node_to_tok: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();

    // Adjacent pairs first: "not only", "has been", ...
    for pair in unaligned.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first + 1 != second {
            continue;
        }
        if let Some(node) = resolve(graph, (first, second), tok, &toks_to_nodes, table) {
            tok_to_node.insert(first, node);
            tok_to_node.insert(second, node);
            node_to_tok.entry(node).or_default().extend([first, second]);
        }
    }

    // Remaining singletons.
    for &index in &unaligned {
        if tok_to_node.contains_key(&index) {
            continue;
        }
        if let Some(node) = resolve(graph, (index, index), tok, &toks_to_nodes, table) {
            tok_to_node.insert(index, node);
            node_to_tok.entry(node).or_default().push(index);
        }
    }

    for (node_id, extra) in node_to_tok {
        if let Some(node) = graph.node_mut(node_id) {
            let mut merged: BTreeSet<usize> = node.aligned_tokens().iter().copied().collect();
            merged.extend(extra);
            node.tokalign = Some(merged.into_iter().collect());
        }
    }
}

/// Unaligned token indices plus the token → aligned-nodes map for the
/// rest. Nodes appear in document order per token.
pub fn unaligned_tokens(
    graph: &Graph,
    token_count: usize,
) -> (Vec<usize>, BTreeMap<usize, Vec<NodeId>>) {
    let mut aligned_lists: Vec<Vec<usize>> = Vec::new();
    let mut toks_to_nodes: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();

    for node in &graph.nodes {
        let toks = node.aligned_tokens();
        if !toks.is_empty() {
            aligned_lists.push(toks.to_vec());
        }
        for &index in toks {
            toks_to_nodes.entry(index).or_default().push(node.node_id);
        }
    }

    // Short alignments subtract first so a wide gpred span cannot claim
    // the tokens of the nodes inside it.
    aligned_lists.sort_by_key(Vec::len);
    let mut unaligned: Vec<usize> = (0..token_count).collect();
    for list in &aligned_lists {
        if contains_sublist(&unaligned, list) {
            let drop: BTreeSet<usize> = list.iter().copied().collect();
            unaligned.retain(|index| !drop.contains(index));
        }
    }

    for index in &unaligned {
        toks_to_nodes.remove(index);
    }

    (unaligned, toks_to_nodes)
}

fn contains_sublist(list: &[usize], sub: &[usize]) -> bool {
    !sub.is_empty() && list.windows(sub.len()).any(|window| window == sub)
}

/// Resolve one gap (a token or an adjacent pair) through the table.
fn resolve(
    graph: &Graph,
    range: (usize, usize),
    tok: &[String],
    toks_to_nodes: &BTreeMap<usize, Vec<NodeId>>,
    table: &RuleSet,
) -> Option<NodeId> {
    let key = (range.0..=range.1)
        .map(|index| tok[index].to_lowercase())
        .join(" ");
    let strategies = table.lookup(&key)?;

    for strategy in strategies {
        if let Some(node) = run_strategy(graph, strategy, range, tok.len(), toks_to_nodes) {
            trace!(token = %key, node = %node, "heuristic alignment");
            return Some(node);
        }
    }
    None
}

/// Scan aligned tokens per the strategy's direction and return the first
/// node satisfying its constraints.
fn run_strategy(
    graph: &Graph,
    strategy: &Strategy,
    range: (usize, usize),
    token_count: usize,
    toks_to_nodes: &BTreeMap<usize, Vec<NodeId>>,
) -> Option<NodeId> {
    let limit = strategy.limit();
    let indices: Vec<usize> = match strategy.kind {
        StrategyKind::NearestRight => {
            let start = range.1 + 1;
            let end = token_count.min(start + limit);
            (start..end).collect()
        }
        StrategyKind::NearestLeft => {
            let end = range.0;
            let start = end.saturating_sub(limit);
            (start..end).rev().collect()
        }
        StrategyKind::Nearest => {
            let end_left = range.0;
            let start_left = end_left.saturating_sub(limit);
            let start_right = range.1 + 1;
            let end_right = token_count.min(start_right + limit);
            (start_left..end_left)
                .rev()
                .zip_longest(start_right..end_right)
                .flat_map(|pair| {
                    let (left, right) = pair.left_and_right();
                    left.into_iter().chain(right)
                })
                .collect()
        }
    };

    for index in indices {
        let Some(nodes) = toks_to_nodes.get(&index) else {
            continue;
        };
        for &node_id in nodes {
            if strategy.constraints.matches(graph, node_id, true) {
                return Some(node_id);
            }
        }
    }
    None
}
