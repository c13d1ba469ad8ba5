//! Unknown-word rewriting.
//!
//! The parser emits out-of-vocabulary words as real predicates with
//! `pos="u"` and a `lemma/POS` surface form (`jumped/VBD`). This stage
//! converts the PTB tag to a DMRS part of speech, lemmatizes the surface
//! form through an injected oracle, and clears the sense.

use tracing::debug;

use dmrsprep_core::{Graph, Pred};

/// Lemmatizer oracle: returns a canonical lemma per word class.
pub trait Lemmatizer {
    /// Canonical lemma of a noun form.
    fn noun(&self, word: &str) -> String;
    /// Canonical lemma of a verb form.
    fn verb(&self, word: &str) -> String;
    /// Canonical lemma of an adjective or adverb form.
    fn adj(&self, word: &str) -> String;
}

/// Deterministic English suffix stripper, the built-in oracle.
///
/// Not a full morphological analyzer: it undoes the regular productive
/// suffixes (plural -s/-es/-ies, verbal -s/-ed/-ing, comparative
/// -er/-est) and leaves everything else untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixLemmatizer;

impl SuffixLemmatizer {
    fn strip_plural(word: &str) -> Option<String> {
        if let Some(stem) = word.strip_suffix("ies") {
            if stem.len() >= 2 {
                return Some(format!("{stem}y"));
            }
        }
        for suffix in ["sses", "shes", "ches", "xes", "zes"] {
            if let Some(stem) = word.strip_suffix(suffix) {
                return Some(format!("{stem}{}", &suffix[..suffix.len() - 2]));
            }
        }
        if let Some(stem) = word.strip_suffix('s') {
            if stem.len() >= 2 && !stem.ends_with('s') && !stem.ends_with('u') {
                return Some(stem.to_string());
            }
        }
        None
    }

    fn strip_verbal(word: &str) -> Option<String> {
        if let Some(stem) = word.strip_suffix("ing") {
            if stem.len() >= 3 {
                return Some(Self::undouble(stem));
            }
        }
        if let Some(stem) = word.strip_suffix("ed") {
            if stem.len() >= 2 {
                return Some(Self::undouble(stem));
            }
        }
        Self::strip_plural(word)
    }

    fn strip_degree(word: &str) -> Option<String> {
        if let Some(stem) = word.strip_suffix("est") {
            if stem.len() >= 3 {
                return Some(stem.to_string());
            }
        }
        if let Some(stem) = word.strip_suffix("er") {
            if stem.len() >= 3 {
                return Some(stem.to_string());
            }
        }
        None
    }

    /// Undo consonant doubling (`stopp` → `stop`).
    fn undouble(stem: &str) -> String {
        let chars: Vec<char> = stem.chars().collect();
        if chars.len() >= 2 {
            let last = chars[chars.len() - 1];
            let prev = chars[chars.len() - 2];
            if last == prev && !"aeiou".contains(last) && last != 'l' && last != 's' {
                return chars[..chars.len() - 1].iter().collect();
            }
        }
        stem.to_string()
    }
}

impl Lemmatizer for SuffixLemmatizer {
    fn noun(&self, word: &str) -> String {
        Self::strip_plural(word).unwrap_or_else(|| word.to_string())
    }

    fn verb(&self, word: &str) -> String {
        Self::strip_verbal(word).unwrap_or_else(|| word.to_string())
    }

    fn adj(&self, word: &str) -> String {
        Self::strip_degree(word).unwrap_or_else(|| word.to_string())
    }
}

/// PTB tag → DMRS part of speech.
fn convert_pos(tag: &str) -> &'static str {
    if tag.starts_with('N') || tag == "FW" {
        "n"
    } else if tag.starts_with('J') || tag == "RB" {
        "a"
    } else if tag.starts_with('V') {
        "v"
    } else {
        "u"
    }
}

/// Rewrite unknown-word nodes (`lemma="jumped/VBD"`, `pos="u"`) into
/// standard form (`lemma="jump"`, `pos="v"`), clearing the sense.
pub fn rewrite_unknown(graph: &mut Graph, lemmatizer: &dyn Lemmatizer) {
    for node in &mut graph.nodes {
        let Some(Pred::Real { lemma, pos, sense }) = &mut node.pred else {
            continue;
        };
        if pos.as_deref() != Some("u") {
            continue;
        }
        let Some(surface) = lemma.as_deref() else {
            continue;
        };

        let normalized = surface.replace("//", "/");
        let mut parts: Vec<&str> = normalized.split('/').collect();
        let Some(tag) = parts.pop() else {
            continue;
        };
        let word = parts.join("/");

        let new_pos = convert_pos(tag);
        let new_lemma = match new_pos {
            "n" => lemmatizer.noun(&word),
            "a" => lemmatizer.adj(&word),
            "v" => lemmatizer.verb(&word),
            _ => word,
        };
        debug!(surface, lemma = %new_lemma, pos = new_pos, "rewrote unknown word");

        *lemma = Some(new_lemma);
        *pos = Some(new_pos.to_string());
        *sense = None;
    }
}
