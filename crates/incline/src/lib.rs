//! # Incline
//!
//! An incremental LR parsing engine for editors.
//!
//! ## Overview
//!
//! Incline keeps one parse tree per document alive across edits and reparses
//! only what an edit touched. It provides:
//!
//! - **Grammars** read from a compact rule format, with precedence
//!   declarations, wildcard spans and language-box terminals ([`grammar`]),
//! - **LR automata** built as LR(0), canonical LR(1) merged with Pager's
//!   weak compatibility, or LALR(1), and persisted in an on-disk cache ([`lr`]),
//! - **Syntax tables** with yacc-style conflict resolution and conflict
//!   diagnostics ([`lr::SyntaxTable`], [`error::diagnostics`]),
//! - **A versioned parse tree** with per-node history and whole-document
//!   undo and redo ([`arena`], [`syntax::Document`]),
//! - **An incremental parser** that shifts unchanged subtrees whole and
//!   rolls back completely on rejection ([`incremental`]),
//! - **Abstract syntax** built from production annotations at every
//!   reduction ([`syntax::ast`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use incline::arena::TreeArena;
//! use incline::grammar::GrammarSource;
//! use incline::incremental::IncParser;
//! use incline::lexer::{Lexer, Token};
//! use incline::lr::ParserConfig;
//! use incline::syntax::{Document, render};
//!
//! let source = GrammarSource::parse(
//!     "%left \"plus\"\n\
//!      E ::= E \"plus\" E | \"INT\"\n\
//!      %%\n\
//!      INT:\"[0-9]+\"\n\
//!      plus:\"\\+\"\n",
//! )?;
//! let lexer = Lexer::for_grammar(&source)?;
//! let mut parser = IncParser::for_source(&source, ParserConfig::default());
//!
//! let mut arena = TreeArena::new();
//! let mut doc = Document::from_tokens(&mut arena, &lexer.tokenize("1+2").tokens);
//! assert!(parser.inc_parse(&mut arena, &doc, false)?.is_accepted());
//! doc.commit(&mut arena);
//!
//! // Append "+3" and reparse; the parsed prefix is reused.
//! let last = *doc.tokens(&arena).last().unwrap();
//! let plus = doc.insert_token_after(&mut arena, last, &Token::new(Some("plus"), "+", 3..4))?;
//! doc.insert_token_after(&mut arena, plus, &Token::new(Some("INT"), "3", 4..5))?;
//! assert!(parser.inc_parse(&mut arena, &doc, false)?.is_accepted());
//! assert_eq!(doc.text(&arena), "1+2+3");
//! println!("{}", render(&arena, doc.root()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `serialize` (default): serde support and the on-disk automaton cache
//! - `diagnostics`: [miette](https://docs.rs/miette) reports for conflicts

pub mod arena;
pub mod error;
pub mod grammar;
pub mod incremental;
pub mod lexer;
pub mod lr;
pub mod syntax;

pub use arena::{NodeId, TreeArena, Version};
pub use error::{Error, GrammarError, InvariantViolation, LexerError, Result, SyntaxError};
pub use grammar::{Grammar, GrammarBuilder, GrammarSource, Symbol};
pub use incremental::{IncParser, ParseMetrics, ParseStatus};
pub use lexer::{Lexer, Token};
pub use lr::{Action, LrMode, ParserConfig, SyntaxTable};
pub use syntax::Document;
