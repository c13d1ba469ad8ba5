//! Error types for dmrsprep.
//!
//! Errors are organized by category and carry stable machine-readable
//! codes for programmatic handling via `--json`.
//!
//! # Error Code Ranges
//!
//! | Range | Category            |
//! |-------|---------------------|
//! | E1xxx | Resources / config  |
//! | E2xxx | Graph model         |
//! | E3xxx | XML codec           |
//! | E4xxx | ID mapping          |

use serde::Serialize;
use std::path::PathBuf;

use crate::model::NodeId;

// ---------------------------------------------------------------------------
// Top-level DmrsError
// ---------------------------------------------------------------------------

/// Top-level error type for all dmrsprep operations.
///
/// Each variant delegates to a category-specific error enum that carries
/// contextual details. Use [`error_code()`](DmrsError::error_code) for
/// machine-readable codes and [`suggestion()`](DmrsError::suggestion)
/// for actionable remediation hints.
#[derive(Debug, thiserror::Error)]
pub enum DmrsError {
    /// Startup resource failures (filter file, heuristic table).
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Graph model violations (dangling edges, out-of-range alignment).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// DMRS XML parsing or serialization failures.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Word-map lookup failures during ID annotation.
    #[error(transparent)]
    Map(#[from] MapError),
}

impl DmrsError {
    /// Machine-readable error code for `--json` output (e.g., `"E3001"`).
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Resource(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            Self::Codec(e) => e.error_code(),
            Self::Map(e) => e.error_code(),
        }
    }

    /// Human-readable suggestion for how to fix the error.
    #[must_use]
    pub fn suggestion(&self) -> String {
        match self {
            Self::Resource(e) => e.suggestion(),
            Self::Graph(e) => e.suggestion(),
            Self::Codec(e) => e.suggestion(),
            Self::Map(e) => e.suggestion(),
        }
    }

    /// Structured error payload for JSON serialization.
    #[must_use]
    pub fn to_json_error(&self) -> JsonError {
        JsonError {
            error_code: self.error_code().to_string(),
            message: self.to_string(),
            suggestion: self.suggestion(),
        }
    }
}

/// JSON-serializable error payload for `--json` mode.
#[derive(Debug, Clone, Serialize)]
pub struct JsonError {
    /// Machine-readable error code (e.g., `"E3001"`).
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Actionable suggestion for fixing the error.
    pub suggestion: String,
}

// ---------------------------------------------------------------------------
// ResourceError
// ---------------------------------------------------------------------------

/// Errors loading startup resources. These are fatal: a run cannot start
/// with a broken filter set or heuristic table.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A line in the gpred filter file could not be interpreted.
    #[error(
        "Error: Failed to parse gpred filter file {path} at line {line_num}\nCause: {reason}\nFix: Filter lines are `<gpred_name>\\t(yes|no)` or grouped under KEEP/FILTER headers; `#` starts a comment."
    )]
    FilterParse {
        /// Path to the filter file.
        path: PathBuf,
        /// 1-based line number.
        line_num: usize,
        /// Description of the parse failure.
        reason: String,
    },

    /// The heuristic table TOML could not be deserialized.
    #[error(
        "Error: Failed to parse heuristic table\nCause: {reason}\nFix: Check the TOML syntax of the heuristics file against the bundled default."
    )]
    HeuristicsParse {
        /// Description of the parse failure.
        reason: String,
    },

    /// A `sense_regex` or particle pattern in the heuristic table is invalid.
    #[error(
        "Error: Invalid regex '{pattern}' in heuristic table\nCause: {reason}\nFix: Correct the sense_regex / particle pattern in the heuristics file."
    )]
    HeuristicsRegex {
        /// The offending pattern.
        pattern: String,
        /// Regex compilation error.
        reason: String,
    },

    /// The heuristic table references an undefined fallback strategy.
    #[error(
        "Error: Unknown fallback '{name}' in heuristic table\nCause: A rule references a fallback that is not defined in [fallbacks]\nFix: Define [fallbacks.{name}] or remove the reference."
    )]
    UnknownFallback {
        /// The fallback name that failed to resolve.
        name: String,
    },
}

impl ResourceError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::FilterParse { .. } => "E1001",
            Self::HeuristicsParse { .. } => "E1002",
            Self::HeuristicsRegex { .. } => "E1003",
            Self::UnknownFallback { .. } => "E1004",
        }
    }

    /// Human-readable suggestion.
    #[must_use]
    pub fn suggestion(&self) -> String {
        match self {
            Self::FilterParse { .. } => {
                "Fix the filter file line; valid forms are `name\\tyes`, `name\\tno`, or KEEP/FILTER sections.".into()
            }
            Self::HeuristicsParse { .. } => {
                "Fix the TOML syntax in the heuristics file and retry.".into()
            }
            Self::HeuristicsRegex { pattern, .. } => {
                format!("Correct the pattern '{pattern}' so it compiles as a regex.")
            }
            Self::UnknownFallback { name } => {
                format!("Define [fallbacks.{name}] in the heuristics file.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

/// Errors related to graph model violations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A link references a node id that does not exist in the graph.
    #[error(
        "Error: Link references unknown node {node_id}\nCause: The DMRS contains a <link> whose endpoint is not a <node> in the same graph\nFix: Check the converter that produced the DMRS; only the LTOP ghost (from=\"0\") may dangle."
    )]
    DanglingEdge {
        /// The missing node id.
        node_id: NodeId,
    },

    /// A `tokalign` index is outside `[0, |tok|)`.
    #[error(
        "Error: Token alignment index {index} out of range (sentence has {len} tokens)\nCause: The tokalign attribute does not match the tokenized sentence\nFix: Check that line i of the tok file corresponds to DMRS i."
    )]
    TokenIndexOutOfRange {
        /// The offending alignment index.
        index: usize,
        /// Number of tokens in the sentence.
        len: usize,
    },
}

impl GraphError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DanglingEdge { .. } => "E2001",
            Self::TokenIndexOutOfRange { .. } => "E2002",
        }
    }

    /// Human-readable suggestion.
    #[must_use]
    pub fn suggestion(&self) -> String {
        match self {
            Self::DanglingEdge { .. } => {
                "Check the MRS-to-DMRS conversion; every link endpoint except the LTOP ghost must exist.".into()
            }
            Self::TokenIndexOutOfRange { .. } => {
                "Verify that the DMRS, untok, and tok inputs are line-aligned.".into()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// Errors related to DMRS XML parsing and serialization.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The XML could not be parsed at all.
    #[error(
        "Error: Malformed DMRS XML\nCause: {reason}\nFix: The offending graph is logged to the diagnostic stream; inspect it and the converter that produced it."
    )]
    Malformed {
        /// Parser error description.
        reason: String,
    },

    /// A required attribute is missing from an element.
    #[error(
        "Error: Missing required attribute '{attribute}' on <{element}>\nCause: The DMRS schema requires this attribute\nFix: nodeid/cfrom/cto on <node> and from/to on <link> are mandatory."
    )]
    MissingAttribute {
        /// Element tag name.
        element: &'static str,
        /// Missing attribute name.
        attribute: &'static str,
    },

    /// An attribute that must be numeric failed to parse.
    #[error(
        "Error: Invalid number '{raw}' in attribute '{attribute}'\nCause: {reason}\nFix: nodeid, from, to, cfrom, cto, and tokalign entries must be integers."
    )]
    InvalidNumber {
        /// Attribute name.
        attribute: &'static str,
        /// The raw value that failed to parse.
        raw: String,
        /// Parse error description.
        reason: String,
    },
}

impl CodecError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "E3001",
            Self::MissingAttribute { .. } => "E3002",
            Self::InvalidNumber { .. } => "E3003",
        }
    }

    /// Human-readable suggestion.
    #[must_use]
    pub fn suggestion(&self) -> String {
        match self {
            Self::Malformed { .. } => {
                "Inspect the logged graph; malformed graphs are skipped and the run continues.".into()
            }
            Self::MissingAttribute { element, attribute } => {
                format!("Add the '{attribute}' attribute to the <{element}> element.")
            }
            Self::InvalidNumber { attribute, .. } => {
                format!("Make '{attribute}' a valid integer.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MapError
// ---------------------------------------------------------------------------

/// Errors related to word-map ID annotation.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A sentence token is not present in the word-map.
    #[error(
        "Error: Token '{token}' (index {index}) not found in word-map\nCause: The corpus and the word-map are out of sync\nFix: Rebuild the word-map from the vocabulary of this corpus (`dmrsp vocab` then `dmrsp wmap`)."
    )]
    TokenNotFound {
        /// 0-based token index within the sentence.
        index: usize,
        /// The token that missed.
        token: String,
    },
}

impl MapError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::TokenNotFound { .. } => "E4001",
        }
    }

    /// Human-readable suggestion.
    #[must_use]
    pub fn suggestion(&self) -> String {
        match self {
            Self::TokenNotFound { .. } => {
                "Rebuild the word-map from this corpus so every token is covered.".into()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn representative_errors() -> Vec<DmrsError> {
        vec![
            ResourceError::FilterParse {
                path: PathBuf::from("filters.txt"),
                line_num: 7,
                reason: "expected yes|no".into(),
            }
            .into(),
            ResourceError::HeuristicsParse {
                reason: "unexpected key".into(),
            }
            .into(),
            ResourceError::HeuristicsRegex {
                pattern: "-?to(".into(),
                reason: "unclosed group".into(),
            }
            .into(),
            ResourceError::UnknownFallback {
                name: "copula".into(),
            }
            .into(),
            GraphError::DanglingEdge {
                node_id: NodeId(42),
            }
            .into(),
            GraphError::TokenIndexOutOfRange { index: 9, len: 5 }.into(),
            CodecError::Malformed {
                reason: "unexpected end of input".into(),
            }
            .into(),
            CodecError::MissingAttribute {
                element: "node",
                attribute: "nodeid",
            }
            .into(),
            CodecError::InvalidNumber {
                attribute: "cfrom",
                raw: "x".into(),
                reason: "invalid digit".into(),
            }
            .into(),
            MapError::TokenNotFound {
                index: 3,
                token: "kludge".into(),
            }
            .into(),
        ]
    }

    #[test]
    fn codes_are_unique_and_machine_friendly() {
        let mut seen = HashSet::new();
        for err in representative_errors() {
            let code = err.error_code();
            assert!(seen.insert(code), "duplicate code {code}");
            assert_eq!(code.len(), 5);
            assert!(code.starts_with('E'));
            assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn every_variant_has_message_and_suggestion() {
        for err in representative_errors() {
            assert!(!err.to_string().is_empty(), "{err:?} has empty display");
            assert!(!err.suggestion().is_empty(), "{err:?} has empty suggestion");
        }
    }

    #[test]
    fn display_format_has_error_cause_fix() {
        let err = DmrsError::from(CodecError::MissingAttribute {
            element: "link",
            attribute: "from",
        });
        let msg = err.to_string();
        assert!(msg.contains("Error:"), "missing 'Error:' in: {msg}");
        assert!(msg.contains("Cause:"), "missing 'Cause:' in: {msg}");
        assert!(msg.contains("Fix:"), "missing 'Fix:' in: {msg}");
    }

    #[test]
    fn json_error_serialization_stable() {
        let err = DmrsError::from(MapError::TokenNotFound {
            index: 2,
            token: "snark".into(),
        });
        let payload = err.to_json_error();
        assert_eq!(payload.error_code, "E4001");
        assert!(payload.message.contains("snark"));

        let value = serde_json::to_value(&payload).expect("serialize");
        assert!(value["error_code"].is_string());
        assert!(value["message"].is_string());
        assert!(value["suggestion"].is_string());
    }
}
