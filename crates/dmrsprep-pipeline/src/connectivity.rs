//! Undirected connectivity oracle.
//!
//! Answers "is the graph still connected if a set of nodes is removed?"
//! for the gpred filter. The query builds a petgraph undirected view
//! restricted to the surviving nodes and runs one DFS from an arbitrary
//! seed; nodes the DFS does not reach, minus the ignored set, are the
//! disconnected remainder. O(|N|+|E|) per query.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Dfs;
use std::collections::{BTreeSet, HashMap};

use dmrsprep_core::{Graph, NodeId};

/// True iff every surviving node is reachable from the first surviving
/// node under undirected adjacency, after discarding `ignored` from the
/// unreachable set.
///
/// `removed` nodes and their incident edges are excluded from the view;
/// the LTOP ghost never participates. An empty surviving set counts as
/// connected.
#[must_use]
pub fn is_connected(graph: &Graph, removed: &BTreeSet<NodeId>, ignored: &BTreeSet<NodeId>) -> bool {
    let surviving: Vec<NodeId> = graph
        .nodes
        .iter()
        .map(|n| n.node_id)
        .filter(|id| !removed.contains(id))
        .collect();

    let Some(&seed) = surviving.first() else {
        return true;
    };

    let mut view = UnGraph::<NodeId, ()>::default();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(surviving.len());
    for &id in &surviving {
        index.insert(id, view.add_node(id));
    }
    for edge in &graph.edges {
        let (Some(&a), Some(&b)) = (index.get(&edge.from), index.get(&edge.to)) else {
            continue;
        };
        view.add_edge(a, b, ());
    }

    let mut reached: BTreeSet<NodeId> = BTreeSet::new();
    let mut dfs = Dfs::new(&view, index[&seed]);
    while let Some(ix) = dfs.next(&view) {
        reached.insert(view[ix]);
    }

    surviving
        .iter()
        .all(|id| reached.contains(id) || ignored.contains(id))
}
