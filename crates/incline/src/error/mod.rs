//! # Error Types
//!
//! Errors raised while reading grammars, lexing, parsing and caching automata.
//!
//! ## Overview
//!
//! The error types follow how each failure is handled:
//!
//! - [`GrammarError`]: a malformed or inconsistent grammar. Fatal when the
//!   grammar is loaded.
//! - [`LexerError`]: text no lexer rule matches. Collected next to the token
//!   stream; the unmatched text still becomes a token and the parser reports
//!   it as a syntax error.
//! - [`SyntaxError`]: the normal outcome of an edit that leaves the document
//!   invalid. Reported through the parser status and error node, never as `Err`.
//! - [`InvariantViolation`]: an internal fault of the parser or tree, such as
//!   a missing goto after a reduce. Returned as `Err` and should abort.
//! - [`CacheError`]: the persisted automaton cache could not be read or written.
//!
//! [`Error`] wraps all of them for callers that want a single type.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! for rich error reporting with source code snippets.

pub mod diagnostics;

use crate::grammar::Symbol;
use crate::arena::NodeId;
use std::ops::Range;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors in grammar source text or grammar structure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("grammar has no rules")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty)))]
    Empty,

    #[error("start symbol `{name}` has no rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_start)))]
    UndefinedStart { name: String },

    #[error("nonterminal `{name}` is used in `{used_in}` but never defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_nonterminal)))]
    UndefinedNonterminal { name: String, used_in: String },

    #[error("line {line}: expected `::=` after `{name}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::missing_mapping)))]
    MissingMapping { line: usize, name: String },

    #[error("line {line}: unexpected `{found}`, expected {expected}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unexpected_token)))]
    UnexpectedToken {
        line: usize,
        found: String,
        expected: &'static str,
    },

    #[error("line {line}: unterminated {what}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unterminated)))]
    Unterminated { line: usize, what: &'static str },

    #[error("line {line}: `{construct}` is not supported, write the rule out in plain alternatives")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unsupported)))]
    Unsupported { line: usize, construct: String },

    #[error("line {line}: malformed directive `%{text}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::malformed_option)))]
    MalformedOption { line: usize, text: String },

    #[error("line {line}: malformed lexer rule `{text}`, expected NAME:\"regex\"")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::malformed_lexer_rule)))]
    MalformedLexerRule { line: usize, text: String },

    #[error("annotation of a `{rule}` alternative is malformed: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::malformed_annotation)))]
    MalformedAnnotation { rule: String, message: String },

    #[error("lexer rule `{name}` has an invalid pattern: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_regex)))]
    InvalidPattern { name: String, message: String },
}

/// Text no lexer rule matches.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("no token matches {text:?}")]
#[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::no_match)))]
pub struct LexerError {
    #[cfg_attr(feature = "diagnostics", label("unrecognized input"))]
    pub span: Range<usize>,
    pub text: String,
}

/// A rejected document: no action for the lookahead in a non-validating step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("unexpected {found}{}", diagnostics::format_expected(.expected))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(parser::syntax_error)))]
pub struct SyntaxError {
    /// Lookahead node at which parsing stopped.
    pub node: NodeId,
    pub found: Symbol,
    pub expected: Vec<Symbol>,
    #[cfg_attr(feature = "diagnostics", label("here"))]
    pub span: Range<usize>,
}

/// An internal fault. Reaching one is a bug in the parser or the tree surgery
/// that preceded it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("no goto for `{symbol}` in state {state} after reduce")]
    MissingGoto { state: usize, symbol: Symbol },

    #[error("stack underflow reducing `{production}`")]
    StackUnderflow { production: String },

    #[error("node {node:?} has no parent while looking for the next lookahead")]
    DetachedNode { node: NodeId },

    #[error("document root {node:?} has no end-of-stream child")]
    MalformedRoot { node: NodeId },

    #[error("parse did not finish within {steps} steps")]
    NoProgress { steps: usize },
}

/// Errors reading or writing the persisted automaton cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "serialize")]
    #[error("cached automaton {path} is unreadable: {source}")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("cached automaton {path} does not match the grammar")]
    Mismatch { path: std::path::PathBuf },
}

/// Any error of this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
