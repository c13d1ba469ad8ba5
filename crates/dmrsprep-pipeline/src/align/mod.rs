//! Token-to-node alignment.
//!
//! Maps DMRS node character spans to token indices. Spans are grouped by
//! `cfrom`; the *elementary* span at each start (smallest `cto`) is
//! matched against the token stream left to right with a forward-only
//! pointer, trying single tokens first and then two-token concatenations.
//! Compound spans inherit the range between their elementary start and
//! end spans. Nodes that cannot be aligned get the `-1` sentinel.
//!
//! Matching is somewhat fuzzy: exact, lowercased, punctuation-stripped,
//! and finally a Levenshtein ratio. The ratio is
//! `(|s|+|t| - d) / (|s|+|t|)` where `d` is the edit distance with
//! substitution cost 2 and indel cost 1, over characters.

pub mod heuristics;
pub mod table;

use std::collections::{BTreeMap, HashMap};

use dmrsprep_core::Graph;

/// Ratio above which two strings count as the same token.
pub const LEVENSHTEIN_RATIO: f64 = 0.90;

type Span = (i64, i64);

/// Align node character spans to token indices, writing `tokalign` on
/// every node (`-1` when no alignment was found).
pub fn align(graph: &mut Graph, untok: &str, tok: &[String]) {
    let chars: Vec<char> = untok.chars().collect();
    let spans = node_spans(graph, &chars);
    let mut matches = basic_matches(&spans, tok);
    compound_matches(&spans, &mut matches);

    for node in &mut graph.nodes {
        let span = (node.cfrom, node.cto);
        node.tokalign = Some(matches.get(&span).cloned().unwrap_or_default());
    }
}

/// Character spans grouped by `cfrom`, each group sorted by `cto` so the
/// elementary span comes first.
fn node_spans(graph: &Graph, chars: &[char]) -> BTreeMap<i64, Vec<(i64, String)>> {
    let mut spans: BTreeMap<i64, Vec<(i64, String)>> = BTreeMap::new();
    for node in &graph.nodes {
        spans
            .entry(node.cfrom)
            .or_default()
            .push((node.cto, span_text(chars, node.cfrom, node.cto)));
    }
    for group in spans.values_mut() {
        group.sort();
    }
    spans
}

/// Substring `untok[cfrom..=cto]` over characters, clamped to the string.
fn span_text(chars: &[char], cfrom: i64, cto: i64) -> String {
    if cfrom < 0 || cto < cfrom {
        return String::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let start = cfrom as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let end = cto as usize;
    if start >= chars.len() {
        return String::new();
    }
    chars[start..=end.min(chars.len() - 1)].iter().collect()
}

/// Step A: match elementary spans against tokens with a forward pointer.
fn basic_matches(
    spans: &BTreeMap<i64, Vec<(i64, String)>>,
    tok: &[String],
) -> HashMap<Span, Vec<usize>> {
    let mut matches: HashMap<Span, Vec<usize>> = HashMap::new();
    let mut tok_ptr = 0usize;

    for (&start, group) in spans {
        let (end, raw) = &group[0];
        let text = raw.trim();

        let mut found = false;
        for (index, token) in tok.iter().enumerate().skip(tok_ptr) {
            if match_token(text, token) {
                matches.insert((start, *end), vec![index]);
                tok_ptr = index + 1;
                found = true;
                break;
            }
        }
        if found {
            continue;
        }

        for index in tok_ptr..tok.len().saturating_sub(1) {
            if match_two_tokens(text, &tok[index], &tok[index + 1]) {
                matches.insert((start, *end), vec![index, index + 1]);
                tok_ptr = index + 2;
                break;
            }
        }
    }

    matches
}

/// Step B: compound spans inherit the inclusive token range between their
/// aligned elementary start and end spans.
fn compound_matches(
    spans: &BTreeMap<i64, Vec<(i64, String)>>,
    matches: &mut HashMap<Span, Vec<usize>>,
) {
    for (&start, group) in spans {
        for (end, _) in group {
            let span = (start, *end);
            if matches.contains_key(&span) {
                continue;
            }

            let start_span = (start, group[0].0);
            let Some(first) = matches.get(&start_span).and_then(|toks| toks.first().copied())
            else {
                continue;
            };
            let Some(end_span) = find_end(*end, spans) else {
                continue;
            };
            let Some(last) = matches.get(&end_span).and_then(|toks| toks.last().copied()) else {
                continue;
            };

            let range: Vec<usize> = if first <= last {
                (first..=last).collect()
            } else {
                Vec::new()
            };
            matches.insert(span, range);
        }
    }
}

/// Elementary span whose `cto` equals `target`, among starts before it.
fn find_end(target: i64, spans: &BTreeMap<i64, Vec<(i64, String)>>) -> Option<Span> {
    for (&start, group) in spans {
        if start >= target {
            break;
        }
        let end = group[0].0;
        if end == target {
            return Some((start, end));
        }
    }
    None
}

/// Fuzzy single-token match: exact, lowercased, punctuation-stripped,
/// then Levenshtein ratio.
#[must_use]
pub fn match_token(untok: &str, token: &str) -> bool {
    let untok = untok.trim();
    if untok == token || untok.to_lowercase() == token {
        return true;
    }
    let nopunc = untok.trim_end_matches(['\'', '"', '-', ',', '.', ':', ';', '!', '?']);
    if nopunc == token || nopunc.to_lowercase() == token {
        return true;
    }
    levenshtein_ratio(untok, token) > LEVENSHTEIN_RATIO
}

/// Two-token match: the pair joined with a space, or concatenated.
#[must_use]
pub fn match_two_tokens(untok: &str, first: &str, second: &str) -> bool {
    match_token(untok, &format!("{first} {second}")) || match_token(untok, &format!("{first}{second}"))
}

/// Levenshtein ratio with substitution cost 2 and indel cost 1, over
/// characters: `(|a|+|b| - d) / (|a|+|b|)`.
#[must_use]
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let lensum = a.len() + b.len();
    if lensum == 0 {
        return 1.0;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = if ca == cb { prev[j] } else { prev[j] + 2 };
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = (lensum - prev[b.len()]) as f64 / lensum as f64;
    ratio
}
