//! Heuristic table: the data-driven rules for unaligned-token attachment.
//!
//! The table is data, not code: it ships as a TOML resource and can be
//! replaced at startup without recompiling the core. Each rule maps a
//! lowercased token (or adjacent token pair) to an ordered list of search
//! strategies; each strategy carries a conjunction of feature constraints
//! plus the disjunctive `args_or` over outgoing edges. Shared strategies
//! live under `[fallbacks]` and are appended by name; the `[particles]`
//! section expands a word list into sense-regex rules.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use dmrsprep_core::error::ResourceError;
use dmrsprep_core::{Graph, NodeId};

/// The bundled English table.
const DEFAULT_TABLE: &str = include_str!("../../resources/heuristics.toml");

/// Search direction of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Scan aligned tokens to the right of the gap.
    NearestRight,
    /// Scan aligned tokens to the left of the gap.
    NearestLeft,
    /// Interleave left and right scans, nearest first.
    Nearest,
}

impl StrategyKind {
    /// Default scan limit for this direction.
    #[must_use]
    pub const fn default_limit(self) -> usize {
        match self {
            Self::NearestRight | Self::NearestLeft => 7,
            Self::Nearest => 5,
        }
    }
}

/// One search strategy: direction, limit, and node constraints.
#[derive(Debug, Clone)]
pub struct Strategy {
    /// Search direction.
    pub kind: StrategyKind,
    /// Scan limit; the direction's default when absent.
    pub limit: Option<usize>,
    /// Constraints a candidate node must satisfy.
    pub constraints: Constraints,
}

impl Strategy {
    /// Effective scan limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or_else(|| self.kind.default_limit())
    }
}

/// Conjunction of feature predicates over a candidate node.
///
/// All present constraints must be satisfied. `args_or` matches when any
/// outgoing edge of the node carries the given `ARG/POST` label and its
/// target satisfies the sub-constraints (sub-matching sees no edges, so a
/// nested `args_or` never matches).
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Node must be a real predicate.
    pub realpred: bool,
    /// Node must be a grammatical predicate.
    pub gpred: bool,
    /// Gpred name must be one of these (requires `gpred`).
    pub gpred_rel: Vec<String>,
    /// Part of speech must be one of these.
    pub pos: Vec<String>,
    /// Exact lemma.
    pub lemma: Option<String>,
    /// Exact sense.
    pub sense: Option<String>,
    /// Sense must match this (start-anchored) regex.
    pub sense_regex: Option<Regex>,
    /// Sortinfo tense.
    pub tense: Option<String>,
    /// Sortinfo perfect aspect.
    pub perf: Option<String>,
    /// Sortinfo progressive aspect.
    pub prog: Option<String>,
    /// Disjunction over outgoing edges: `(ARG/POST label, target constraints)`.
    pub args_or: Vec<(String, Constraints)>,
}

impl Constraints {
    /// Check a candidate node. `with_args` gates the `args_or` clause;
    /// target sub-matching always runs without it.
    #[must_use]
    pub fn matches(&self, graph: &Graph, id: NodeId, with_args: bool) -> bool {
        let Some(node) = graph.node(id) else {
            return false;
        };

        if self.realpred && !node.is_real() {
            return false;
        }
        if self.gpred && node.gpred().is_none() {
            return false;
        }
        if !self.gpred_rel.is_empty() {
            if !self.gpred {
                return false;
            }
            let Some(name) = node.gpred() else {
                return false;
            };
            if !self.gpred_rel.iter().any(|g| g == name) {
                return false;
            }
        }
        if !self.pos.is_empty() {
            let Some(pos) = node.pos() else {
                return false;
            };
            if !self.pos.iter().any(|p| p == pos) {
                return false;
            }
        }
        if let Some(lemma) = &self.lemma {
            if node.pred.as_ref().and_then(|p| p.lemma()) != Some(lemma.as_str()) {
                return false;
            }
        }
        if let Some(sense) = &self.sense {
            if node.pred.as_ref().and_then(|p| p.sense()) != Some(sense.as_str()) {
                return false;
            }
        }
        if let Some(regex) = &self.sense_regex {
            let Some(sense) = node.pred.as_ref().and_then(|p| p.sense()) else {
                return false;
            };
            if !regex.is_match(sense) {
                return false;
            }
        }
        for (key, expected) in [
            ("tense", &self.tense),
            ("perf", &self.perf),
            ("prog", &self.prog),
        ] {
            if let Some(expected) = expected {
                if node.feature(key) != Some(expected.as_str()) {
                    return false;
                }
            }
        }
        if !self.args_or.is_empty() {
            if !with_args {
                return false;
            }
            let satisfied = graph.outgoing(id).any(|edge| {
                self.args_or.iter().any(|(label, sub)| {
                    edge.slash_label() == *label && sub.matches(graph, edge.to, false)
                })
            });
            if !satisfied {
                return false;
            }
        }
        true
    }
}

/// Compiled rule set: lowercased token (or token pair) → strategies.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: HashMap<String, Vec<Strategy>>,
}

impl RuleSet {
    /// Strategies for a lookup key, in table order.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&[Strategy]> {
        self.rules.get(key).map(Vec::as_slice)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the table has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The bundled English table.
    #[must_use]
    pub fn bundled() -> Self {
        Self::parse(DEFAULT_TABLE).expect("bundled heuristic table parses")
    }

    /// Parse a table from TOML text.
    ///
    /// # Errors
    ///
    /// Fails on TOML syntax errors, invalid regexes, unknown strategy
    /// kinds, and unresolved fallback names.
    pub fn parse(text: &str) -> Result<Self, ResourceError> {
        let raw: RawTable = toml::from_str(text).map_err(|e| ResourceError::HeuristicsParse {
            reason: e.to_string(),
        })?;

        let mut fallbacks: HashMap<String, Strategy> = HashMap::new();
        for (name, strategy) in raw.fallbacks {
            fallbacks.insert(name, compile_strategy(strategy)?);
        }

        let mut rules: HashMap<String, Vec<Strategy>> = HashMap::new();
        for rule in raw.rule {
            let mut strategies = Vec::with_capacity(rule.strategies.len() + rule.fallbacks.len());
            for strategy in rule.strategies {
                strategies.push(compile_strategy(strategy)?);
            }
            for name in rule.fallbacks {
                let fallback = fallbacks
                    .get(&name)
                    .ok_or(ResourceError::UnknownFallback { name })?;
                strategies.push(fallback.clone());
            }
            rules.insert(rule.token, strategies);
        }

        if let Some(particles) = raw.particles {
            for token in particles.tokens {
                let pattern = particles.pattern.replace("{}", &token);
                let strategy = Strategy {
                    kind: StrategyKind::Nearest,
                    limit: particles.limit,
                    constraints: Constraints {
                        realpred: true,
                        sense_regex: Some(compile_regex(&pattern)?),
                        ..Constraints::default()
                    },
                };
                rules.insert(token, vec![strategy]);
            }
        }

        Ok(Self { rules })
    }

    /// Load a replacement table from a file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not parse.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read heuristics {}: {e}", path.display()))?;
        Ok(Self::parse(&text)?)
    }
}

// ---------------------------------------------------------------------------
// Raw TOML shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(default)]
    fallbacks: HashMap<String, RawStrategy>,
    #[serde(default)]
    rule: Vec<RawRule>,
    particles: Option<RawParticles>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    token: String,
    #[serde(default)]
    strategies: Vec<RawStrategy>,
    #[serde(default)]
    fallbacks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawParticles {
    limit: Option<usize>,
    pattern: String,
    tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawStrategy {
    kind: String,
    limit: Option<usize>,
    #[serde(flatten)]
    constraints: RawConstraints,
}

#[derive(Debug, Default, Deserialize)]
struct RawConstraints {
    realpred: Option<bool>,
    gpred: Option<bool>,
    gpred_rel: Option<OneOrMany>,
    pos: Option<OneOrMany>,
    lemma: Option<String>,
    sense: Option<String>,
    sense_regex: Option<String>,
    tense: Option<String>,
    perf: Option<String>,
    prog: Option<String>,
    args_or: Option<Vec<RawArg>>,
}

#[derive(Debug, Deserialize)]
struct RawArg {
    label: String,
    #[serde(flatten)]
    constraints: RawConstraints,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

fn compile_strategy(raw: RawStrategy) -> Result<Strategy, ResourceError> {
    let kind = match raw.kind.as_str() {
        "nearest-right" => StrategyKind::NearestRight,
        "nearest-left" => StrategyKind::NearestLeft,
        "nearest" => StrategyKind::Nearest,
        other => {
            return Err(ResourceError::HeuristicsParse {
                reason: format!("unknown strategy kind '{other}'"),
            });
        }
    };
    Ok(Strategy {
        kind,
        limit: raw.limit,
        constraints: compile_constraints(raw.constraints)?,
    })
}

fn compile_constraints(raw: RawConstraints) -> Result<Constraints, ResourceError> {
    let sense_regex = raw
        .sense_regex
        .as_deref()
        .map(compile_regex)
        .transpose()?;
    let mut args_or = Vec::new();
    for arg in raw.args_or.unwrap_or_default() {
        args_or.push((arg.label, compile_constraints(arg.constraints)?));
    }
    Ok(Constraints {
        realpred: raw.realpred.unwrap_or(false),
        gpred: raw.gpred.unwrap_or(false),
        gpred_rel: raw.gpred_rel.map(OneOrMany::into_vec).unwrap_or_default(),
        pos: raw.pos.map(OneOrMany::into_vec).unwrap_or_default(),
        lemma: raw.lemma,
        sense: raw.sense,
        sense_regex,
        tense: raw.tense,
        perf: raw.perf,
        prog: raw.prog,
        args_or,
    })
}

/// Compile a table pattern, anchored at the start like the original
/// prefix-match semantics.
fn compile_regex(pattern: &str) -> Result<Regex, ResourceError> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|e| ResourceError::HeuristicsRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
