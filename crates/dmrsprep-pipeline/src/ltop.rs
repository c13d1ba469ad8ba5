//! LTOP link handling.
//!
//! The converter emits the logical top of a graph as a ghost link from the
//! non-existent node id 0. This stage removes every such link, records the
//! target as the root `ltop` attribute (`-1` when there is none), and
//! defaults the `index` attribute to `-1` when absent.

use dmrsprep_core::{Graph, NodeId};

/// Strip ghost LTOP links and promote the target to the `ltop` attribute.
pub fn handle_ltop(graph: &mut Graph) {
    let mut ltop: Option<NodeId> = None;
    graph.edges.retain(|edge| {
        if edge.from == NodeId::GHOST {
            ltop = Some(edge.to);
            false
        } else {
            true
        }
    });

    let ltop_attr = ltop.map_or_else(|| "-1".to_string(), |id| id.to_string());
    graph.set_attr("ltop", &ltop_attr);

    if graph.attr("index").is_none() {
        graph.set_attr("index", "-1");
    }
}
