//! # Diagnostic Utilities
//!
//! Formatting helpers for syntax errors and table conflicts.
//!
//! This module provides utilities for:
//! - Listing the symbols a parser state expected
//! - "Did you mean?" suggestions against the grammar's terminals
//! - Locating an error as `line:column` with surrounding text
//! - Rendering the conflicts settled while building a syntax table

use super::SyntaxError;
use crate::grammar::Symbol;
use crate::lr::{Conflict, ConflictKind, Resolution, SyntaxTable};
use std::fmt::Write;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// `", expected a, b"`, or an empty string when nothing was expected.
#[must_use]
pub fn format_expected(expected: &[Symbol]) -> String {
    if expected.is_empty() {
        return String::new();
    }
    let names: Vec<String> = expected.iter().map(ToString::to_string).collect();
    format!(", expected {}", names.join(", "))
}

/// Suggest the expected terminal whose name is closest to `actual`.
///
/// # Example
///
/// ```rust
/// use incline::error::diagnostics::did_you_mean;
/// use incline::grammar::Symbol;
///
/// let expected = [Symbol::terminal("while"), Symbol::terminal("return")];
/// assert_eq!(did_you_mean("whlie", &expected), Some(&expected[0]));
/// ```
#[must_use]
pub fn did_you_mean<'a>(actual: &str, expected: &'a [Symbol]) -> Option<&'a Symbol> {
    let actual = actual.to_lowercase();
    let threshold = 0.6;
    let mut best: Option<(&Symbol, f64)> = None;
    for candidate in expected {
        let Symbol::Terminal(name) = candidate else {
            continue;
        };
        let similarity = string_similarity(&actual, &name.to_lowercase());
        if similarity < threshold {
            continue;
        }
        match best {
            Some((_, score)) if score >= similarity => {}
            _ => best = Some((candidate, similarity)),
        }
    }
    best.map(|(symbol, _)| symbol)
}

/// One-based `(line, column)` of a byte offset. Columns count characters.
#[must_use]
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// `file:line:col: unexpected ..., expected ...` followed by the offending
/// line and a caret, plus a suggestion when one is close enough.
#[must_use]
pub fn format_syntax_error(error: &SyntaxError, source: &str, filename: Option<&str>) -> String {
    let mut out = String::new();
    let (line, column) = line_col(source, error.span.start);
    if let Some(filename) = filename {
        let _ = write!(out, "{filename}:");
    }
    let _ = write!(out, "{line}:{column}: {error}");

    let text = source.lines().nth(line - 1).unwrap_or("");
    let _ = write!(out, "\n  {text}\n  {}^", " ".repeat(column - 1));

    let found = source.get(error.span.clone()).unwrap_or("");
    if !found.is_empty()
        && let Some(suggestion) = did_you_mean(found, &error.expected)
    {
        let _ = write!(out, "\n  help: did you mean {suggestion}?");
    }
    out
}

/// A settled table conflict as a reportable diagnostic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("{kind} conflict in state {state} on {symbol}: {detail}")]
#[cfg_attr(
    feature = "diagnostics",
    diagnostic(code(table::conflict), severity(Warning))
)]
pub struct ConflictDiagnostic {
    pub state: usize,
    pub symbol: Symbol,
    pub kind: &'static str,
    pub detail: String,
    /// Whether declared precedence settled it. Default-policy conflicts
    /// are the ones worth a look.
    pub by_precedence: bool,
}

impl ConflictDiagnostic {
    #[must_use]
    pub fn new(table: &SyntaxTable, conflict: &Conflict) -> Self {
        let grammar = table.grammar();
        let kind = match conflict.kind {
            ConflictKind::ShiftReduce => "shift/reduce",
            ConflictKind::ReduceReduce => "reduce/reduce",
            ConflictKind::AcceptReduce => "accept/reduce",
        };
        let productions: Vec<String> = conflict
            .productions
            .iter()
            .map(|p| grammar.display_production(*p))
            .collect();
        let outcome = match conflict.resolution {
            Resolution::Shift(_) => "shift".to_string(),
            Resolution::Reduce(p) => format!("reduce {}", grammar.display_production(p)),
            Resolution::Accept => "accept".to_string(),
            Resolution::Error => "error (nonassociative)".to_string(),
        };
        let policy = if conflict.by_precedence {
            "by precedence"
        } else {
            "by default"
        };
        Self {
            state: conflict.state,
            symbol: grammar.symbol(conflict.symbol).clone(),
            kind,
            detail: format!("[{}] resolved to {outcome} {policy}", productions.join(" | ")),
            by_precedence: conflict.by_precedence,
        }
    }
}

/// All conflicts of a table, one per line, default-policy ones first.
#[must_use]
pub fn render_conflicts(table: &SyntaxTable) -> String {
    let mut diagnostics: Vec<ConflictDiagnostic> = table
        .conflicts()
        .iter()
        .map(|c| ConflictDiagnostic::new(table, c))
        .collect();
    diagnostics.sort_by_key(|d| (d.by_precedence, d.state));
    let mut out = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(out, "{diagnostic}");
    }
    out
}

/// Levenshtein similarity in `0.0..=1.0`.
fn string_similarity(s1: &str, s2: &str) -> f64 {
    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }
    let distance = levenshtein_distance(s1, s2);
    let max_len = s1.chars().count().max(s2.chars().count());
    1.0 - (distance as f64 / max_len as f64)
}

fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::NodeId;
    use crate::grammar::GrammarSource;
    use crate::lr::{self, LrMode};
    use std::sync::Arc;

    #[test]
    fn expected_list_is_empty_without_symbols() {
        assert_eq!(format_expected(&[]), "");
        assert_eq!(
            format_expected(&[Symbol::terminal("a"), Symbol::Finish]),
            ", expected \"a\", $"
        );
    }

    #[test]
    fn similarity() {
        assert_eq!(string_similarity("hello", "hello"), 1.0);
        assert!(string_similarity("hello", "hell") > 0.5);
        assert!(string_similarity("hello", "world") < 0.5);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn line_col_counts_from_one() {
        let source = "ab\ncd\n";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 4), (2, 2));
        assert_eq!(line_col(source, 99), (3, 1));
    }

    #[test]
    fn syntax_error_points_at_column() {
        let error = SyntaxError {
            node: NodeId::from_raw(7),
            found: Symbol::terminal("x"),
            expected: vec![Symbol::terminal("a")],
            span: 2..3,
        };
        let text = format_syntax_error(&error, "a+x", Some("in.txt"));
        assert!(text.starts_with("in.txt:1:3: unexpected \"x\", expected \"a\""));
        assert!(text.ends_with("  a+x\n    ^"));
    }

    #[test]
    fn conflicts_render_with_policy() {
        let source = GrammarSource::parse("E ::= E \"+\" E | \"a\"").unwrap();
        let table = lr::build(&Arc::new(source.grammar), LrMode::Lalr);
        let rendered = render_conflicts(&table);
        assert!(rendered.contains("shift/reduce conflict"));
        assert!(rendered.contains("resolved to shift by default"));
    }
}
