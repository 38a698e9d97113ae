//! # Incremental Parsing
//!
//! Re-parsing of an edited [`Document`](crate::syntax::Document) against its
//! previous parse tree.
//!
//! ## Overview
//!
//! The parser walks the old tree left to right. Subtrees whose root is not
//! marked changed are shifted whole (an *optimistic shift*) when the table
//! has a goto for them; the next terminal then validates the shift, and a
//! failed validation breaks the subtree down again from the right. Changed
//! subtrees are broken down from the left until their terminals are
//! reached.
//!
//! Beyond plain LR parsing the parser understands:
//!
//! - **pass-through terminals**, shifted without a state change when the
//!   table has no action for them,
//! - **wildcard spans** (`ANY`, `ANYNCR`), which absorb tokens until one has
//!   an action in the state after the span,
//! - **exact errors**: an attempt rejected after a failed validation broke
//!   reused subtrees down is redone as a full reparse. Rejections anywhere
//!   else keep the incremental cost.
//!
//! A rejected attempt is rolled back completely. The tree afterwards is the
//! one the attempt started from, and the nodes it allocated are freed.
//!
//! ## Usage
//!
//! ```rust
//! use incline::arena::TreeArena;
//! use incline::grammar::GrammarSource;
//! use incline::incremental::{IncParser, ParseStatus};
//! use incline::lexer::Lexer;
//! use incline::lr::ParserConfig;
//! use incline::syntax::Document;
//!
//! let source = GrammarSource::parse("E ::= E \"+\" \"a\" | \"a\"")?;
//! let lexer = Lexer::for_grammar(&source)?;
//! let mut parser = IncParser::for_source(&source, ParserConfig::default());
//!
//! let mut arena = TreeArena::new();
//! let doc = Document::from_tokens(&mut arena, &lexer.tokenize("a+a").tokens);
//! assert_eq!(parser.inc_parse(&mut arena, &doc, false)?, ParseStatus::Accepted);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod parser;
mod stack;

pub use parser::IncParser;

use crate::arena::NodeId;

/// Result of [`IncParser::inc_parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Accepted,
    /// Rejected at this lookahead node.
    Error(NodeId),
}

impl ParseStatus {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Counters of one [`IncParser::inc_parse`] call, over all attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseMetrics {
    /// 1, or 2 when a failed attempt was redone as a full reparse.
    pub attempts: usize,
    pub steps: usize,
    pub shifts: usize,
    /// Subtrees shifted whole.
    pub optimistic_shifts: usize,
    pub reductions: usize,
    pub left_breakdowns: usize,
    pub right_breakdowns: usize,
    pub pass_through: usize,
    pub any_spans: usize,
}
