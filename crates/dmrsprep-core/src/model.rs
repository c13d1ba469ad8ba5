//! In-memory DMRS graph model.
//!
//! # Overview
//!
//! A [`Graph`] owns its [`Node`]s and [`Edge`]s. Consumers reference nodes
//! by [`NodeId`] and edges by `(from, to, label)` identity; references into
//! the graph never outlive it. Document order of nodes and edges is
//! preserved on load so that traversal order is deterministic; the codec
//! re-sorts on dump.
//!
//! Node content is a closed tagged variant ([`Pred`]): a *real predicate*
//! tied to a surface lexeme, or a *grammatical predicate* (gpred) named
//! but not lexicalized. The labeler and the cycle remover dispatch on the
//! tag explicitly.
//!
//! Cycle detection lives here as well: the peeling algorithms report the
//! set of nodes that survive iterative stripping, which form (or contain)
//! a directed or undirected cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a node within one graph. Unique per graph.
///
/// `NodeId(0)` never names a real node: a link with `from == 0` is the
/// *ghost LTOP link* whose target is the graph's root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The ghost source id used by LTOP links.
    pub const GHOST: Self = Self(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node content: real predicate vs grammatical predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pred {
    /// A surface lexeme: lemma, part of speech, optional sense.
    Real {
        /// Lemma, e.g. `cat`.
        lemma: Option<String>,
        /// Part of speech: `n`, `v`, `a`, `p`, `q`, `x`, `c`, `u`, ...
        pos: Option<String>,
        /// Optional sense distinguisher, e.g. `1` or `there`.
        sense: Option<String>,
    },
    /// A grammatical predicate name, e.g. `def_q` or `neg_rel`.
    Gpred(String),
}

impl Pred {
    /// True for the real-predicate variant.
    #[must_use]
    pub const fn is_real(&self) -> bool {
        matches!(self, Self::Real { .. })
    }

    /// Part of speech of a real predicate.
    #[must_use]
    pub fn pos(&self) -> Option<&str> {
        match self {
            Self::Real { pos, .. } => pos.as_deref(),
            Self::Gpred(_) => None,
        }
    }

    /// Lemma of a real predicate.
    #[must_use]
    pub fn lemma(&self) -> Option<&str> {
        match self {
            Self::Real { lemma, .. } => lemma.as_deref(),
            Self::Gpred(_) => None,
        }
    }

    /// Sense of a real predicate.
    #[must_use]
    pub fn sense(&self) -> Option<&str> {
        match self {
            Self::Real { sense, .. } => sense.as_deref(),
            Self::Gpred(_) => None,
        }
    }

    /// Name of a grammatical predicate.
    #[must_use]
    pub fn gpred(&self) -> Option<&str> {
        match self {
            Self::Real { .. } => None,
            Self::Gpred(name) => Some(name),
        }
    }
}

/// Morphosyntactic features (`<sortinfo>`).
///
/// Stored as a sorted attribute map so that attributes the pipeline does
/// not own round-trip unchanged; typed accessors cover the features the
/// pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sortinfo {
    attrs: BTreeMap<String, String>,
}

impl Sortinfo {
    /// Empty feature set (an empty `<sortinfo/>` element).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attrs: BTreeMap::new(),
        }
    }

    /// Raw attribute lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_string(), value.to_string());
    }

    /// Remove an attribute.
    pub fn remove(&mut self, key: &str) {
        self.attrs.remove(key);
    }

    /// All attributes, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Grammatical number (`num`).
    #[must_use]
    pub fn num(&self) -> Option<&str> {
        self.get("num")
    }

    /// Person (`pers`).
    #[must_use]
    pub fn pers(&self) -> Option<&str> {
        self.get("pers")
    }

    /// Gender (`gend`).
    #[must_use]
    pub fn gend(&self) -> Option<&str> {
        self.get("gend")
    }

    /// Tense (`tense`).
    #[must_use]
    pub fn tense(&self) -> Option<&str> {
        self.get("tense")
    }

    /// Sentence force (`sf`).
    #[must_use]
    pub fn sf(&self) -> Option<&str> {
        self.get("sf")
    }

    /// Perfect aspect (`perf`).
    #[must_use]
    pub fn perf(&self) -> Option<&str> {
        self.get("perf")
    }

    /// Progressive aspect (`prog`).
    #[must_use]
    pub fn prog(&self) -> Option<&str> {
        self.get("prog")
    }
}

/// One DMRS node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Unique id within the graph.
    pub node_id: NodeId,
    /// Character span start (inclusive) in the untokenized sentence.
    pub cfrom: i64,
    /// Character span end in the untokenized sentence.
    pub cto: i64,
    /// Predicate content; `None` when the node carries neither a
    /// `<realpred>` nor a `<gpred>` child.
    pub pred: Option<Pred>,
    /// Constant argument, e.g. a quoted proper noun.
    pub carg: Option<String>,
    /// Morphosyntactic features; `None` when the element is absent.
    pub sortinfo: Option<Sortinfo>,
    /// Token alignment. `None` = attribute absent, `Some(empty)` =
    /// explicitly unaligned (`-1`), otherwise sorted token indices.
    pub tokalign: Option<Vec<usize>>,
    /// Canonical label, written by the labeler.
    pub label: Option<String>,
    /// Word-map id of the label, written by the label-ID mapper.
    pub label_idx: Option<u64>,
    /// Aligned token strings, written by token-ID annotation.
    pub tok: Option<String>,
    /// Aligned token ids, written by token-ID annotation.
    pub tok_idx: Option<String>,
    /// Attributes the pipeline does not own, preserved for round-trip.
    pub extra: BTreeMap<String, String>,
}

impl Node {
    /// New node with the mandatory attributes; everything else empty.
    #[must_use]
    pub fn new(node_id: NodeId, cfrom: i64, cto: i64) -> Self {
        Self {
            node_id,
            cfrom,
            cto,
            pred: None,
            carg: None,
            sortinfo: None,
            tokalign: None,
            label: None,
            label_idx: None,
            tok: None,
            tok_idx: None,
            extra: BTreeMap::new(),
        }
    }

    /// True when the node is a real predicate.
    #[must_use]
    pub fn is_real(&self) -> bool {
        self.pred.as_ref().is_some_and(Pred::is_real)
    }

    /// Gpred name, if this is a grammatical-predicate node.
    #[must_use]
    pub fn gpred(&self) -> Option<&str> {
        self.pred.as_ref().and_then(Pred::gpred)
    }

    /// Part of speech, if this is a real predicate with one.
    #[must_use]
    pub fn pos(&self) -> Option<&str> {
        self.pred.as_ref().and_then(Pred::pos)
    }

    /// Aligned token indices; empty when unaligned.
    #[must_use]
    pub fn aligned_tokens(&self) -> &[usize] {
        self.tokalign.as_deref().unwrap_or(&[])
    }

    /// Sortinfo feature lookup that tolerates an absent element.
    #[must_use]
    pub fn feature(&self, key: &str) -> Option<&str> {
        self.sortinfo.as_ref().and_then(|s| s.get(key))
    }
}

/// One directed labeled edge (`<link>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Source node id; `NodeId::GHOST` for the LTOP link.
    pub from: NodeId,
    /// Target node id.
    pub to: NodeId,
    /// Argument name (`<rargname>`), e.g. `ARG1` or `R-INDEX`.
    pub rargname: Option<String>,
    /// Scopal relation (`<post>`): `NEQ`, `EQ`, `H`, or `HEQ`.
    pub post: Option<String>,
    /// Canonical label, written by the labeler.
    pub label: Option<String>,
    /// Word-map id of the label, written by the label-ID mapper.
    pub label_idx: Option<u64>,
    /// Attributes the pipeline does not own, preserved for round-trip.
    pub extra: BTreeMap<String, String>,
}

impl Edge {
    /// New edge with argument name and post.
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, rargname: Option<&str>, post: Option<&str>) -> Self {
        Self {
            from,
            to,
            rargname: rargname.map(str::to_string),
            post: post.map(str::to_string),
            label: None,
            label_idx: None,
            extra: BTreeMap::new(),
        }
    }

    /// Canonical `ARG_POST` label, e.g. `ARG1_NEQ` or bare `EQ`.
    ///
    /// A pure function of `rargname` and `post`; absent parts are dropped.
    #[must_use]
    pub fn arg_label(&self) -> String {
        [self.rargname.as_deref(), self.post.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// `ARG/POST` form used by the heuristic table's `args_or` constraints.
    #[must_use]
    pub fn slash_label(&self) -> String {
        format!(
            "{}/{}",
            self.rargname.as_deref().unwrap_or(""),
            self.post.as_deref().unwrap_or("")
        )
    }

    /// Removal/sort identity: `(from, to, label)`.
    #[must_use]
    pub fn key(&self) -> (NodeId, NodeId, String) {
        (self.from, self.to, self.arg_label())
    }
}

/// A DMRS graph: nodes, edges, and root attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// Nodes in document order.
    pub nodes: Vec<Node>,
    /// Edges in document order.
    pub edges: Vec<Edge>,
    /// Root `<dmrs>` attributes (`cfrom`, `cto`, `ltop`, `index`,
    /// `untok`, `tok`, ...), preserved verbatim.
    pub attrs: BTreeMap<String, String>,
}

impl Graph {
    /// True when the graph has no nodes and no edges (an empty `<dmrs/>`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Root attribute lookup.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Set a root attribute.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_string(), value.to_string());
    }

    /// The `ltop` root id, when set to a real node.
    #[must_use]
    pub fn ltop(&self) -> Option<NodeId> {
        self.attr("ltop")
            .and_then(|v| v.parse::<u32>().ok())
            .map(NodeId)
    }

    /// The `index` (semantic head) id, when set to a real node.
    #[must_use]
    pub fn index(&self) -> Option<NodeId> {
        self.attr("index")
            .and_then(|v| v.parse::<u32>().ok())
            .map(NodeId)
    }

    /// Borrow a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == id)
    }

    /// Mutably borrow a node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.node_id == id)
    }

    /// Outgoing edges of a node, in document order.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Incoming edges of a node, in document order.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to == id)
    }

    /// Child node ids (edge targets), in document order, with repeats.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.outgoing(id).map(|e| e.to).collect()
    }

    /// Parent node ids (edge sources), in document order, with repeats.
    /// The LTOP ghost is not a parent.
    #[must_use]
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.incoming(id)
            .map(|e| e.from)
            .filter(|&p| p != NodeId::GHOST)
            .collect()
    }

    /// Remove one edge by `(from, to, label)` identity.
    ///
    /// Returns true when an edge was removed. If several edges share the
    /// identity, the first in document order goes.
    pub fn remove_edge(&mut self, key: &(NodeId, NodeId, String)) -> bool {
        if let Some(pos) = self.edges.iter().position(|e| &e.key() == key) {
            self.edges.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove a set of nodes and every incident edge.
    pub fn remove_nodes(&mut self, ids: &BTreeSet<NodeId>) {
        self.nodes.retain(|n| !ids.contains(&n.node_id));
        self.edges
            .retain(|e| !ids.contains(&e.from) && !ids.contains(&e.to));
    }

    /// Node ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.iter().map(|n| n.node_id).collect();
        ids.sort_unstable();
        ids
    }

    // -----------------------------------------------------------------------
    // Cycle detection (peeling)
    // -----------------------------------------------------------------------

    /// Nodes that survive directed peeling.
    ///
    /// Iteratively strips nodes with no surviving children or no surviving
    /// parents; the survivors form (or contain) a directed cycle. Empty
    /// when the directed graph is acyclic.
    #[must_use]
    pub fn directed_cycle(&self) -> BTreeSet<NodeId> {
        let ids = self.sorted_ids();
        let children: BTreeMap<NodeId, BTreeSet<NodeId>> = ids
            .iter()
            .map(|&id| (id, self.children(id).into_iter().collect()))
            .collect();
        let parents: BTreeMap<NodeId, BTreeSet<NodeId>> = ids
            .iter()
            .map(|&id| (id, self.parents(id).into_iter().collect()))
            .collect();

        let mut remaining: BTreeSet<NodeId> = ids.into_iter().collect();
        let mut changed = true;
        while changed {
            changed = false;
            for &id in &remaining.clone() {
                let no_children = children[&id].intersection(&remaining).next().is_none();
                let no_parents = parents[&id].intersection(&remaining).next().is_none();
                if no_children || no_parents {
                    remaining.remove(&id);
                    changed = true;
                }
            }
        }
        remaining
    }

    /// Nodes that survive undirected peeling.
    ///
    /// Iteratively strips nodes with at most one surviving neighbor; the
    /// survivors form an undirected cycle. Empty when the undirected graph
    /// is a forest.
    #[must_use]
    pub fn undirected_cycle(&self) -> BTreeSet<NodeId> {
        let ids = self.sorted_ids();
        let neighbors: BTreeMap<NodeId, BTreeSet<NodeId>> = ids
            .iter()
            .map(|&id| {
                let mut adj: BTreeSet<NodeId> = self.children(id).into_iter().collect();
                adj.extend(self.parents(id));
                (id, adj)
            })
            .collect();

        let mut remaining: BTreeSet<NodeId> = ids.into_iter().collect();
        let mut changed = true;
        while changed {
            changed = false;
            for &id in &remaining.clone() {
                if neighbors[&id].intersection(&remaining).count() <= 1 {
                    remaining.remove(&id);
                    changed = true;
                }
            }
        }
        remaining
    }

    /// Nodes on any cycle, directed cycles taking priority.
    #[must_use]
    pub fn any_cycle(&self) -> BTreeSet<NodeId> {
        let directed = self.directed_cycle();
        if !directed.is_empty() {
            return directed;
        }
        self.undirected_cycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32) -> Node {
        Node::new(NodeId(id), 0, 0)
    }

    fn graph_with_edges(ids: &[u32], edges: &[(u32, u32, &str, &str)]) -> Graph {
        let mut graph = Graph::default();
        for &id in ids {
            graph.nodes.push(node(id));
        }
        for &(from, to, arg, post) in edges {
            graph.edges.push(Edge::new(
                NodeId(from),
                NodeId(to),
                (!arg.is_empty()).then_some(arg),
                (!post.is_empty()).then_some(post),
            ));
        }
        graph
    }

    #[test]
    fn arg_label_joins_present_parts() {
        let edge = Edge::new(NodeId(1), NodeId(2), Some("ARG1"), Some("NEQ"));
        assert_eq!(edge.arg_label(), "ARG1_NEQ");

        let bare = Edge::new(NodeId(1), NodeId(2), None, Some("EQ"));
        assert_eq!(bare.arg_label(), "EQ");
    }

    #[test]
    fn directed_cycle_found() {
        let graph = graph_with_edges(
            &[1, 2, 3, 4],
            &[
                (1, 2, "ARG1", "NEQ"),
                (2, 3, "ARG1", "NEQ"),
                (3, 1, "ARG1", "NEQ"),
                (3, 4, "ARG2", "NEQ"),
            ],
        );
        let cycle = graph.directed_cycle();
        assert_eq!(
            cycle,
            [NodeId(1), NodeId(2), NodeId(3)].into_iter().collect()
        );
    }

    #[test]
    fn directed_cycle_empty_for_dag() {
        let graph = graph_with_edges(
            &[1, 2, 3],
            &[(1, 2, "ARG1", "NEQ"), (1, 3, "ARG2", "NEQ"), (2, 3, "ARG1", "NEQ")],
        );
        assert!(graph.directed_cycle().is_empty());
    }

    #[test]
    fn undirected_cycle_found_when_directed_absent() {
        // 1 -> 2, 1 -> 3, 2 -> 4, 3 -> 4: a diamond, directed-acyclic but
        // undirected-cyclic.
        let graph = graph_with_edges(
            &[1, 2, 3, 4],
            &[
                (1, 2, "ARG1", "NEQ"),
                (1, 3, "ARG2", "NEQ"),
                (2, 4, "ARG1", "NEQ"),
                (3, 4, "ARG1", "NEQ"),
            ],
        );
        assert!(graph.directed_cycle().is_empty());
        let cycle = graph.any_cycle();
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn tree_has_no_cycle() {
        let graph = graph_with_edges(
            &[1, 2, 3],
            &[(1, 2, "ARG1", "NEQ"), (1, 3, "ARG2", "NEQ")],
        );
        assert!(graph.any_cycle().is_empty());
    }

    #[test]
    fn ghost_is_not_a_parent() {
        let graph = graph_with_edges(&[10, 20], &[(0, 10, "", "H"), (10, 20, "ARG1", "NEQ")]);
        assert!(graph.parents(NodeId(10)).is_empty());
        assert_eq!(graph.parents(NodeId(20)), vec![NodeId(10)]);
    }

    #[test]
    fn remove_edge_by_key() {
        let mut graph = graph_with_edges(
            &[1, 2],
            &[(1, 2, "ARG1", "NEQ"), (2, 1, "", "EQ")],
        );
        let key = (NodeId(2), NodeId(1), "EQ".to_string());
        assert!(graph.remove_edge(&key));
        assert_eq!(graph.edges.len(), 1);
        assert!(!graph.remove_edge(&key));
    }

    #[test]
    fn remove_nodes_drops_incident_edges() {
        let mut graph = graph_with_edges(
            &[1, 2, 3],
            &[(1, 2, "ARG1", "NEQ"), (2, 3, "ARG1", "NEQ")],
        );
        graph.remove_nodes(&[NodeId(2)].into_iter().collect());
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
    }
}
