//! Grammatical-predicate filtering.
//!
//! Removes gpred nodes named in a filter set while preserving graph
//! connectivity: a candidate is only accepted when the graph stays
//! connected given all previously accepted removals. When the removed set
//! contains the current `ltop` root, the root is reassigned by an ordered
//! child/parent rule.
//!
//! Also home to the span curb: a gpred node whose token alignment covers
//! more tokens than a configured limit loses its alignment.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use dmrsprep_core::error::ResourceError;
use dmrsprep_core::{Graph, NodeId};

use crate::connectivity::is_connected;

/// Parse a gpred filter file into the filter-out set.
///
/// Two line forms are accepted, mixed freely: `<gpred_name>\t(yes|no)`
/// records, and bare names grouped under `KEEP` / `FILTER` section
/// headers. `yes`/`KEEP` entries are collected but unused; the returned
/// set holds the `no`/`FILTER` names. Blank lines and lines starting with
/// `#` are comments.
///
/// # Errors
///
/// Fails on unreadable files and on record lines whose flag is neither
/// `yes` nor `no`; a broken filter set is fatal at startup.
pub fn parse_filter_file(path: &Path) -> Result<BTreeSet<String>, anyhow::Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read gpred filter {}: {e}", path.display()))?;
    parse_filter(&content).map_err(|(line_num, reason)| {
        ResourceError::FilterParse {
            path: path.to_path_buf(),
            line_num,
            reason,
        }
        .into()
    })
}

fn parse_filter(content: &str) -> Result<BTreeSet<String>, (usize, String)> {
    let mut filter_out = BTreeSet::new();
    let mut filter_in = BTreeSet::new();
    let mut in_filter_section = false;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, flag)) = line.split_once('\t') {
            match flag.trim() {
                "no" => {
                    filter_out.insert(name.trim().to_string());
                }
                "yes" => {
                    filter_in.insert(name.trim().to_string());
                }
                other => {
                    return Err((idx + 1, format!("expected yes|no, got '{other}'")));
                }
            }
        } else if line.starts_with("KEEP") {
            in_filter_section = false;
        } else if line.starts_with("FILTER") {
            in_filter_section = true;
        } else if in_filter_section {
            filter_out.insert(line.to_string());
        } else {
            filter_in.insert(line.to_string());
        }
    }

    // The keep set is collected for symmetry but only the filter-out set
    // drives removal.
    let _ = filter_in;
    Ok(filter_out)
}

/// Remove filterable gpred nodes, refusing removals that would disconnect
/// the graph unless `allow_disconnected` is set or the graph was already
/// disconnected.
///
/// With `handle_ltop`, a removed `ltop` root is reassigned before the
/// nodes are deleted.
pub fn filter_gpred(
    graph: &mut Graph,
    filter: &BTreeSet<String>,
    handle_ltop: bool,
    allow_disconnected: bool,
) {
    // Candidates in ascending node id order, for deterministic acceptance.
    let mut filterable: Vec<NodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.gpred().is_some_and(|g| filter.contains(g)))
        .map(|n| n.node_id)
        .collect();
    filterable.sort_unstable();

    if filterable.is_empty() {
        return;
    }

    let filterable_set: BTreeSet<NodeId> = filterable.iter().copied().collect();
    let already_disconnected = !is_connected(graph, &BTreeSet::new(), &filterable_set);

    let removed: BTreeSet<NodeId> = if allow_disconnected || already_disconnected {
        filterable_set.clone()
    } else {
        let mut removed = BTreeSet::new();
        for &candidate in &filterable {
            let mut trial = removed.clone();
            trial.insert(candidate);
            let ignored: BTreeSet<NodeId> =
                filterable_set.difference(&trial).copied().collect();
            if is_connected(graph, &trial, &ignored) {
                removed = trial;
            } else {
                debug!(node = %candidate, "keeping gpred node; removal would disconnect the graph");
            }
        }
        removed
    };

    if handle_ltop {
        if let Some(ltop) = graph.ltop() {
            if removed.contains(&ltop) {
                reassign_ltop(graph, ltop, &removed);
            }
        }
    }

    graph.remove_nodes(&removed);
}

/// Reassign the `ltop` root after its node was removed.
///
/// Follows the ordered rule: an only surviving child, then the semantic
/// `index` among the children, then an only surviving parent; an only
/// (removed) child or parent advances the walk. When nothing applies the
/// smallest surviving node id wins, or `-1` when none survive.
fn reassign_ltop(graph: &mut Graph, old_ltop: NodeId, removed: &BTreeSet<NodeId>) {
    let index = graph.index();
    let mut cursor = old_ltop;
    let mut visited = BTreeSet::new();

    let new_ltop = loop {
        if !visited.insert(cursor) {
            break fallback_ltop(graph, removed);
        }

        let children = graph.children(cursor);
        let parents: Vec<NodeId> = {
            let child_set: BTreeSet<NodeId> = children.iter().copied().collect();
            graph
                .parents(cursor)
                .into_iter()
                .filter(|p| !child_set.contains(p))
                .collect()
        };

        if children.len() == 1 && !removed.contains(&children[0]) {
            break Some(children[0]);
        }
        if let Some(index) = index {
            if children.contains(&index) && !removed.contains(&index) {
                break Some(index);
            }
        }
        if parents.len() == 1 && !removed.contains(&parents[0]) {
            break Some(parents[0]);
        }
        if children.len() == 1 {
            cursor = children[0];
            continue;
        }
        if parents.len() == 1 {
            cursor = parents[0];
            continue;
        }
        break fallback_ltop(graph, removed);
    };

    let attr = new_ltop.map_or_else(|| "-1".to_string(), |id| id.to_string());
    graph.set_attr("ltop", &attr);
}

fn fallback_ltop(graph: &Graph, removed: &BTreeSet<NodeId>) -> Option<NodeId> {
    graph
        .sorted_ids()
        .into_iter()
        .find(|id| !removed.contains(id))
}

/// Reset the alignment of gpred nodes spanning more than `limit` tokens.
pub fn curb_spans(graph: &mut Graph, limit: usize) {
    for node in &mut graph.nodes {
        if node.gpred().is_some() && node.aligned_tokens().len() > limit {
            debug!(node = %node.node_id, "curbing over-long gpred span");
            node.tokalign = Some(Vec::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmrsprep_core::{Edge, Node, Pred};

    fn gpred_node(id: u32, name: &str) -> Node {
        let mut node = Node::new(NodeId(id), 0, 0);
        node.pred = Some(Pred::Gpred(name.to_string()));
        node
    }

    fn real_node(id: u32, lemma: &str) -> Node {
        let mut node = Node::new(NodeId(id), 0, 0);
        node.pred = Some(Pred::Real {
            lemma: Some(lemma.to_string()),
            pos: Some("n".to_string()),
            sense: None,
        });
        node
    }

    fn edge(from: u32, to: u32) -> Edge {
        Edge::new(NodeId(from), NodeId(to), Some("ARG1"), Some("NEQ"))
    }

    fn filter_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parse_record_lines() {
        let out = parse_filter("def_q\tno\nproper_q\tyes\n# comment\n\nfocus_d\tno\n")
            .expect("parse");
        assert_eq!(out, filter_set(&["def_q", "focus_d"]));
    }

    #[test]
    fn parse_section_style() {
        let out = parse_filter("KEEP\nproper_q\nFILTER\ndef_q\nudef_q\n").expect("parse");
        assert_eq!(out, filter_set(&["def_q", "udef_q"]));
    }

    #[test]
    fn parse_rejects_bad_flag() {
        let err = parse_filter("def_q\tmaybe\n").expect_err("should fail");
        assert_eq!(err.0, 1);
    }

    #[test]
    fn bridge_gpred_survives_when_disconnection_forbidden() {
        // A - B - C where B is filterable; removing B would disconnect.
        let mut graph = Graph::default();
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.nodes.push(real_node(3, "c"));
        graph.edges.push(edge(1, 2));
        graph.edges.push(edge(2, 3));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), false, false);

        assert_eq!(graph.nodes.len(), 3);
    }

    #[test]
    fn bridge_gpred_removed_when_disconnection_allowed() {
        let mut graph = Graph::default();
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.nodes.push(real_node(3, "c"));
        graph.edges.push(edge(1, 2));
        graph.edges.push(edge(2, 3));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), false, true);

        assert_eq!(graph.sorted_ids(), vec![NodeId(1), NodeId(3)]);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn leaf_gpred_is_removed_safely() {
        let mut graph = Graph::default();
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.edges.push(edge(2, 1));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), false, false);

        assert_eq!(graph.sorted_ids(), vec![NodeId(1)]);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn acceptance_respects_prior_removals() {
        // 1 - 2 - 3 - 4 with 2 and 3 filterable: removing either alone
        // disconnects; removing both leaves {1, 4} disconnected too, so
        // neither may go.
        let mut graph = Graph::default();
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.nodes.push(gpred_node(3, "udef_q"));
        graph.nodes.push(real_node(4, "d"));
        graph.edges.push(edge(1, 2));
        graph.edges.push(edge(2, 3));
        graph.edges.push(edge(3, 4));

        filter_gpred(&mut graph, &filter_set(&["def_q", "udef_q"]), false, false);

        assert_eq!(graph.nodes.len(), 4);
    }

    #[test]
    fn already_disconnected_graph_removes_everything_filterable() {
        let mut graph = Graph::default();
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.nodes.push(real_node(3, "island"));
        graph.edges.push(edge(1, 2));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), false, false);

        assert_eq!(graph.sorted_ids(), vec![NodeId(1), NodeId(3)]);
    }

    #[test]
    fn removed_ltop_is_reassigned_to_only_child() {
        let mut graph = Graph::default();
        graph.set_attr("ltop", "2");
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.edges.push(edge(2, 1));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), true, false);

        assert_eq!(graph.attr("ltop"), Some("1"));
        assert_eq!(graph.sorted_ids(), vec![NodeId(1)]);
    }

    #[test]
    fn removed_ltop_prefers_index_among_children() {
        let mut graph = Graph::default();
        graph.set_attr("ltop", "2");
        graph.set_attr("index", "4");
        graph.nodes.push(real_node(1, "a"));
        graph.nodes.push(gpred_node(2, "def_q"));
        graph.nodes.push(real_node(3, "b"));
        graph.nodes.push(real_node(4, "c"));
        graph.edges.push(edge(2, 3));
        graph.edges.push(edge(2, 4));
        graph.edges.push(edge(3, 1));
        graph.edges.push(edge(4, 1));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), true, false);

        assert_eq!(graph.attr("ltop"), Some("4"));
    }

    #[test]
    fn ltop_falls_back_to_smallest_survivor() {
        let mut graph = Graph::default();
        graph.set_attr("ltop", "5");
        graph.nodes.push(real_node(3, "a"));
        graph.nodes.push(real_node(4, "b"));
        graph.nodes.push(gpred_node(5, "def_q"));
        graph.edges.push(edge(5, 3));
        graph.edges.push(edge(5, 4));
        graph.edges.push(edge(3, 4));

        filter_gpred(&mut graph, &filter_set(&["def_q"]), true, false);

        assert_eq!(graph.attr("ltop"), Some("3"));
    }

    #[test]
    fn curb_resets_long_gpred_spans_only() {
        let mut graph = Graph::default();
        let mut long = gpred_node(1, "def_q");
        long.tokalign = Some(vec![0, 1, 2, 3]);
        let mut short = gpred_node(2, "udef_q");
        short.tokalign = Some(vec![4, 5]);
        let mut real = real_node(3, "a");
        real.tokalign = Some(vec![0, 1, 2, 3, 4]);
        graph.nodes.push(long);
        graph.nodes.push(short);
        graph.nodes.push(real);

        curb_spans(&mut graph, 3);

        assert!(graph.node(NodeId(1)).expect("n1").aligned_tokens().is_empty());
        assert_eq!(graph.node(NodeId(2)).expect("n2").aligned_tokens(), &[4, 5]);
        assert_eq!(
            graph.node(NodeId(3)).expect("n3").aligned_tokens(),
            &[0, 1, 2, 3, 4]
        );
    }
}
