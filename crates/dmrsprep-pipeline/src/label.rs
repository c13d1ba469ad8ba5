//! Canonical node and link labels.
//!
//! Labels are deterministic pure functions of a node's features, so
//! relabeling an already-labeled graph is a no-op. Templates by node kind:
//!
//! - gpred: `carg_gpred_pers_num_gend`
//! - noun:  `_lemma_n_sense_pers_num` (person defaults to `3`, number to `sg`)
//! - verb:  `_lemma_v_sense_tense_sf`
//! - other: `_lemma_pos_sense`
//!
//! Absent fields are dropped; real-pred labels carry a leading `_` to
//! distinguish them from gpreds. `tense` is dropped when it lowercases to
//! `untensed`; `sf` is dropped when it is `prop` or `prop-or-ques`.
//! Link labels are `ARG_POST`.

use dmrsprep_core::{Graph, Node, Pred};

/// Write `label` on every node and link. With `carg_clean`, surrounding
/// quotes are stripped off `carg` attributes first.
pub fn label_graph(graph: &mut Graph, carg_clean: bool) {
    for node in &mut graph.nodes {
        if carg_clean {
            if let Some(carg) = &node.carg {
                if let Some(stripped) = carg
                    .strip_prefix('"')
                    .and_then(|c| c.strip_suffix('"'))
                {
                    node.carg = Some(stripped.to_string());
                }
            }
        }
        node.label = Some(node_label(node));
    }
    for edge in &mut graph.edges {
        edge.label = Some(edge.arg_label());
    }
}

/// Canonical label of one node.
#[must_use]
pub fn node_label(node: &Node) -> String {
    let tense = node
        .feature("tense")
        .filter(|t| t.to_lowercase() != "untensed");
    let sf = node
        .feature("sf")
        .filter(|&s| s != "prop" && s != "prop-or-ques");

    let fields: Vec<Option<&str>> = match &node.pred {
        Some(Pred::Gpred(name)) => vec![
            node.carg.as_deref(),
            Some(name.as_str()),
            node.feature("pers"),
            node.feature("num"),
            node.feature("gend"),
        ],
        Some(Pred::Real { lemma, pos, sense }) => match pos.as_deref() {
            Some("n") => vec![
                Some(""),
                lemma.as_deref(),
                Some("n"),
                sense.as_deref(),
                Some(node.feature("pers").unwrap_or("3")),
                Some(node.feature("num").unwrap_or("sg")),
            ],
            Some("v") => vec![
                Some(""),
                lemma.as_deref(),
                Some("v"),
                sense.as_deref(),
                tense,
                sf,
            ],
            _ => vec![Some(""), lemma.as_deref(), pos.as_deref(), sense.as_deref()],
        },
        None => vec![Some("")],
    };

    fields
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmrsprep_core::{Edge, NodeId, Sortinfo};

    fn real(id: u32, lemma: &str, pos: &str, sense: Option<&str>) -> Node {
        let mut node = Node::new(NodeId(id), 0, 0);
        node.pred = Some(Pred::Real {
            lemma: Some(lemma.to_string()),
            pos: Some(pos.to_string()),
            sense: sense.map(str::to_string),
        });
        node
    }

    fn sortinfo(features: &[(&str, &str)]) -> Sortinfo {
        let mut sortinfo = Sortinfo::new();
        for (key, value) in features {
            sortinfo.set(key, value);
        }
        sortinfo
    }

    #[test]
    fn noun_defaults_person_and_number() {
        let node = real(1, "cat", "n", None);
        assert_eq!(node_label(&node), "_cat_n_3_sg");
    }

    #[test]
    fn noun_uses_present_features() {
        let mut node = real(1, "cat", "n", Some("1"));
        node.sortinfo = Some(sortinfo(&[("pers", "3"), ("num", "pl")]));
        assert_eq!(node_label(&node), "_cat_n_1_3_pl");
    }

    #[test]
    fn verb_drops_untensed_and_prop() {
        let mut node = real(1, "run", "v", None);
        node.sortinfo = Some(sortinfo(&[("tense", "UNTENSED"), ("sf", "prop")]));
        assert_eq!(node_label(&node), "_run_v");

        let mut node = real(1, "run", "v", Some("1"));
        node.sortinfo = Some(sortinfo(&[("tense", "past"), ("sf", "ques")]));
        assert_eq!(node_label(&node), "_run_v_1_past_ques");

        let mut node = real(1, "run", "v", None);
        node.sortinfo = Some(sortinfo(&[("tense", "pres"), ("sf", "prop-or-ques")]));
        assert_eq!(node_label(&node), "_run_v_pres");
    }

    #[test]
    fn other_pos_uses_plain_template() {
        let node = real(1, "on", "p", Some("temp"));
        assert_eq!(node_label(&node), "_on_p_temp");
    }

    #[test]
    fn gpred_label_has_no_leading_underscore() {
        let mut node = Node::new(NodeId(1), 0, 0);
        node.pred = Some(Pred::Gpred("pron".to_string()));
        node.sortinfo = Some(sortinfo(&[("pers", "3"), ("num", "sg"), ("gend", "f")]));
        assert_eq!(node_label(&node), "pron_3_sg_f");
    }

    #[test]
    fn gpred_label_includes_carg() {
        let mut node = Node::new(NodeId(1), 0, 0);
        node.pred = Some(Pred::Gpred("named".to_string()));
        node.carg = Some("Kim".to_string());
        assert_eq!(node_label(&node), "Kim_named");
    }

    #[test]
    fn carg_clean_strips_quotes_once() {
        let mut graph = Graph::default();
        let mut node = Node::new(NodeId(1), 0, 0);
        node.pred = Some(Pred::Gpred("named".to_string()));
        node.carg = Some("\"Kim\"".to_string());
        graph.nodes.push(node);

        label_graph(&mut graph, true);
        assert_eq!(graph.nodes[0].carg.as_deref(), Some("Kim"));
        assert_eq!(graph.nodes[0].label.as_deref(), Some("Kim_named"));

        // Idempotent: a second pass changes nothing.
        label_graph(&mut graph, true);
        assert_eq!(graph.nodes[0].carg.as_deref(), Some("Kim"));
        assert_eq!(graph.nodes[0].label.as_deref(), Some("Kim_named"));
    }

    #[test]
    fn link_labels_join_arg_and_post() {
        let mut graph = Graph::default();
        graph.nodes.push(real(1, "a", "n", None));
        graph.nodes.push(real(2, "b", "n", None));
        graph
            .edges
            .push(Edge::new(NodeId(1), NodeId(2), Some("ARG1"), Some("NEQ")));
        graph.edges.push(Edge::new(NodeId(2), NodeId(1), None, Some("EQ")));

        label_graph(&mut graph, false);
        assert_eq!(graph.edges[0].label.as_deref(), Some("ARG1_NEQ"));
        assert_eq!(graph.edges[1].label.as_deref(), Some("EQ"));
    }

    #[test]
    fn labeling_is_idempotent() {
        let mut graph = Graph::default();
        let mut noun = real(1, "cat", "n", None);
        noun.sortinfo = Some(sortinfo(&[("num", "pl")]));
        graph.nodes.push(noun);
        graph.nodes.push(real(2, "chase", "v", Some("1")));
        graph
            .edges
            .push(Edge::new(NodeId(2), NodeId(1), Some("ARG2"), Some("NEQ")));

        label_graph(&mut graph, true);
        let first = graph.clone();
        label_graph(&mut graph, true);
        assert_eq!(graph, first);
    }

    mod properties {
        use super::*;
        use proptest::option;
        use proptest::prelude::*;

        fn arbitrary_node() -> impl Strategy<Value = Node> {
            let pred = option::of(prop_oneof![
                ("[a-z]{1,6}", option::of("[nvapqxcu]"), option::of("[a-z0-9]{1,4}"))
                    .prop_map(|(lemma, pos, sense)| Pred::Real {
                        lemma: Some(lemma),
                        pos: pos.map(|p| p.to_string()),
                        sense,
                    }),
                "[a-z_]{1,10}".prop_map(Pred::Gpred),
            ]);
            let features = proptest::collection::vec(
                (
                    prop_oneof![
                        Just("num"),
                        Just("pers"),
                        Just("gend"),
                        Just("tense"),
                        Just("sf")
                    ],
                    "[a-z0-9-]{1,8}",
                ),
                0..4,
            );
            (pred, option::of("\"?[A-Za-z]{1,6}\"?"), features).prop_map(
                |(pred, carg, features)| {
                    let mut node = Node::new(NodeId(1), 0, 0);
                    node.pred = pred;
                    node.carg = carg;
                    if !features.is_empty() {
                        let mut info = Sortinfo::new();
                        for (key, value) in features {
                            info.set(key, &value);
                        }
                        node.sortinfo = Some(info);
                    }
                    node
                },
            )
        }

        proptest! {
            /// Relabeling an already-labeled graph changes nothing.
            #[test]
            fn labeling_is_idempotent_for_arbitrary_nodes(node in arbitrary_node()) {
                let mut graph = Graph::default();
                graph.nodes.push(node);

                label_graph(&mut graph, true);
                let once = graph.clone();
                label_graph(&mut graph, true);
                prop_assert_eq!(graph, once);
            }
        }
    }
}
