//! Token-ID and label-ID annotation from the word-map.
//!
//! `map_tokens` writes `tok` (the aligned token strings) and `tok_idx`
//! (their word-map ids) on every aligned node. A lookup miss is fatal for
//! the graph: it means the corpus and the word-map are out of sync, and
//! the error reports the token and its index. `map_labels` assigns
//! `label_idx` to every labeled node and link, growing the map as needed.

use dmrsprep_core::error::{GraphError, MapError};
use dmrsprep_core::wmap::WordMap;
use dmrsprep_core::{DmrsError, Graph};

/// Annotate aligned nodes with `tok` and `tok_idx` from the word-map.
///
/// Tokens are looked up lowercased.
///
/// # Errors
///
/// [`MapError::TokenNotFound`] when a sentence token is missing from the
/// map; [`GraphError::TokenIndexOutOfRange`] when a `tokalign` index does
/// not fit the sentence.
pub fn map_tokens(graph: &mut Graph, tok: &[String], wmap: &WordMap) -> Result<(), DmrsError> {
    let ids = tok
        .iter()
        .enumerate()
        .map(|(index, token)| {
            wmap.get(&token.to_lowercase())
                .ok_or_else(|| MapError::TokenNotFound {
                    index,
                    token: token.clone(),
                })
        })
        .collect::<Result<Vec<u64>, _>>()?;

    for node in &mut graph.nodes {
        let aligned = node.aligned_tokens().to_vec();
        if aligned.is_empty() {
            continue;
        }
        for &index in &aligned {
            if index >= tok.len() {
                return Err(GraphError::TokenIndexOutOfRange {
                    index,
                    len: tok.len(),
                }
                .into());
            }
        }
        node.tok = Some(
            aligned
                .iter()
                .map(|&index| tok[index].as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        node.tok_idx = Some(
            aligned
                .iter()
                .map(|&index| ids[index].to_string())
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    Ok(())
}

/// Annotate labeled nodes and links with `label_idx`, assigning fresh ids
/// for unseen labels.
pub fn map_labels(graph: &mut Graph, wmap: &mut WordMap) {
    for node in &mut graph.nodes {
        if let Some(label) = &node.label {
            node.label_idx = Some(wmap.get_or_add(label));
        }
    }
    for edge in &mut graph.edges {
        if let Some(label) = &edge.label {
            edge.label_idx = Some(wmap.get_or_add(label));
        }
    }
}
