//! Transfer-MT preparation rewrite.
//!
//! Normalizes underspecified morphosyntactic features, strips the `_rel`
//! suffix off gpred names, applies the pure-lookup gpred rename table,
//! converts transfer-produced `ja:` gpreds into regular predicates, and
//! rewrites a handful of determiner/pronoun gpreds. Runs before every
//! other stage.

use tracing::debug;

use dmrsprep_core::{Graph, Node, Pred, Sortinfo};

/// The gpred rename table. Pure lookup, applied after `_rel` stripping.
fn gpred_rename(name: &str) -> Option<&'static str> {
    match name {
        "discourse_x" => Some("discourse"),
        "ellipses" => Some("ellipsis"),
        "if_then" => Some("if_x_then"),
        "neg_x" => Some("neg"),
        "number" => Some("number_q"),
        "part-of" => Some("part_of"),
        "unknown_v" => Some("unknown"),
        "unknown_v_cop" => Some("cop_id"),
        "unspec_p_manner" => Some("unspec_manner"),
        _ => None,
    }
}

/// Apply the transfer-MT normalizations to every node.
pub fn mt_prep(graph: &mut Graph) {
    for node in &mut graph.nodes {
        normalize_features(node);
        rewrite_gpred(node);
    }
}

/// Feature-level normalization of underspecified values.
fn normalize_features(node: &mut Node) {
    let is_verb = node.pos() == Some("v");

    if let Some(sortinfo) = node.sortinfo.as_mut() {
        if sortinfo.num() == Some("number") {
            sortinfo.set("num", "sg");
        }
        if sortinfo.sf() == Some("sforce") {
            sortinfo.set("sf", "prop");
        }
        if sortinfo.pers() == Some("person") {
            sortinfo.set("pers", "3");
        }
        if sortinfo.perf() == Some("luk") || (is_verb && sortinfo.perf().is_none()) {
            sortinfo.set("perf", "-");
        }
        if sortinfo.prog() == Some("luk") || (is_verb && sortinfo.prog().is_none()) {
            sortinfo.set("prog", "-");
        }
    }

    if let Some(Pred::Real { sense, .. }) = &mut node.pred {
        if sense.as_deref() == Some("0") {
            *sense = Some("1".to_string());
        }
    }
}

/// Gpred-level rewrites: `_rel` strip, `ja:` conversion, rename table,
/// determiner and pronoun adjustments.
fn rewrite_gpred(node: &mut Node) {
    let Some(name) = node.gpred().map(str::to_string) else {
        return;
    };

    // Strip the trailing `_rel` segment.
    let mut name = name;
    if let Some(stripped) = name.strip_suffix("_rel") {
        name = stripped.to_string();
        node.pred = Some(Pred::Gpred(name.clone()));
    }

    // Transfer-produced predicates: `ja:_lemma_pos[_sense]` becomes a
    // real predicate carrying the source lemma as a carg; a bare `ja:`
    // prefix is stripped off the gpred name.
    if let Some(ja_pred) = name.strip_prefix("ja:_") {
        let parts: Vec<&str> = ja_pred.split('_').collect();
        if parts.len() >= 2 {
            let lemma = parts[0];
            replace_with_realpred(
                node,
                &format!("_ja_{lemma}"),
                parts[1],
                parts.get(2).copied(),
                Some(&format!("\"{lemma}\"")),
            );
            debug!(pred = ja_pred, "converted ja: gpred to real predicate");
            return;
        }
    } else if let Some(stripped) = name.strip_prefix("ja:") {
        name = stripped.to_string();
        node.pred = Some(Pred::Gpred(name.clone()));
    }

    match name.as_str() {
        "def_udef_a_q" | "def_q" => {
            replace_with_realpred(node, "the", "q", None, None);
        }
        "pron" => {
            if node.feature("pers") == Some("2") && node.feature("gend").is_some() {
                if let Some(sortinfo) = node.sortinfo.as_mut() {
                    sortinfo.remove("gend");
                }
            } else if node.feature("pers") == Some("3") && node.feature("num").is_none() {
                if let Some(sortinfo) = node.sortinfo.as_mut() {
                    sortinfo.set("num", "pl");
                }
            }
        }
        other => {
            if let Some(renamed) = gpred_rename(other) {
                node.pred = Some(Pred::Gpred(renamed.to_string()));
            }
        }
    }
}

/// Replace a node's content with a fresh real predicate, keeping only the
/// identity attributes (`nodeid`, `cfrom`, `cto`).
fn replace_with_realpred(
    node: &mut Node,
    lemma: &str,
    pos: &str,
    sense: Option<&str>,
    carg: Option<&str>,
) {
    node.pred = Some(Pred::Real {
        lemma: Some(lemma.to_string()),
        pos: Some(pos.to_string()),
        sense: sense.map(str::to_string),
    });
    node.carg = carg.map(str::to_string);
    node.sortinfo = Some(Sortinfo::new());
    node.tokalign = None;
    node.label = None;
    node.label_idx = None;
    node.tok = None;
    node.tok_idx = None;
    node.extra.clear();
}
