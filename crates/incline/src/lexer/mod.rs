//! # Lexer Module
//!
//! Regex tokenizer producing the token stream a document is built from.
//!
//! ## Overview
//!
//! A [`Lexer`] is compiled from the `%%` section of a grammar source. Each
//! rule is `NAME:"regex"`; the longest match wins and ties go to the rule
//! declared first. [`Lexer::for_grammar`] additionally matches every quoted
//! grammar terminal that no rule is named after, ahead of the named rules,
//! so keywords beat identifier patterns of the same length.
//!
//! ## Usage
//!
//! ```rust
//! use incline::grammar::GrammarSource;
//! use incline::lexer::Lexer;
//!
//! let source = GrammarSource::parse("E ::= E \"+\" \"INT\" | \"INT\"\n%%\nINT:\"[0-9]+\"\n")?;
//! let lexer = Lexer::for_grammar(&source)?;
//! let lexed = lexer.tokenize("1+22");
//! let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, ["1", "+", "22"]);
//! assert!(lexed.errors.is_empty());
//! # Ok::<(), incline::error::GrammarError>(())
//! ```
//!
//! ## Error Handling
//!
//! Input no rule matches never aborts tokenizing. Each unmatched run becomes
//! one error token without a class plus a [`LexerError`]; the parser has no
//! action for it and reports a syntax error there.

pub mod indent;
pub mod token;

pub use token::Token;

use crate::error::{GrammarError, LexerError};
use crate::grammar::{GrammarSource, LexerRuleSource, Symbol};
use compact_str::CompactString;
use regex::Regex;
use smallvec::SmallVec;
use tracing::debug;

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct LexRule {
    /// Token class, `None` for grammar literals.
    pub name: Option<CompactString>,
    regex: Regex,
}

impl LexRule {
    /// Compile `pattern`, anchored at the match position.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn new(name: Option<&str>, pattern: &str) -> Result<Self, GrammarError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|err| GrammarError::InvalidPattern {
            name: name.unwrap_or(pattern).to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            name: name.map(CompactString::from),
            regex,
        })
    }

    /// Rule matching `text` literally.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if the escaped literal
    /// exceeds the regex size limit.
    pub fn literal(text: &str) -> Result<Self, GrammarError> {
        Self::new(None, &regex::escape(text))
    }

    fn match_len(&self, input: &str) -> Option<usize> {
        self.regex.find(input).map(|m| m.end()).filter(|len| *len > 0)
    }
}

/// Tokens and the errors met producing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexerError>,
}

/// Longest-match regex lexer.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    rules: SmallVec<[LexRule; 16]>,
    /// Insert layout tokens, see [`indent`].
    indentation: bool,
}

impl Lexer {
    /// Compile the given rules in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] for the first rule whose
    /// pattern does not compile.
    pub fn new(rules: &[LexerRuleSource]) -> Result<Self, GrammarError> {
        let rules = rules
            .iter()
            .map(|rule| LexRule::new(Some(&rule.name), &rule.pattern))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            rules,
            indentation: false,
        })
    }

    /// Lexer for a grammar source: literal terminals first, then the named
    /// rules of its lexer section. With the grammar's `indentation` option
    /// the layout terminals are generated instead of matched.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if a named rule does not compile.
    pub fn for_grammar(source: &GrammarSource) -> Result<Self, GrammarError> {
        let named = Self::new(&source.lexer_rules)?;
        let grammar = &source.grammar;
        let mut literals: Vec<&str> = grammar
            .terminals()
            .filter_map(|t| match grammar.symbol(t) {
                Symbol::Terminal(name) if !name.is_empty() => Some(name.as_str()),
                _ => None,
            })
            .filter(|name| !source.lexer_rules.iter().any(|r| r.name == *name))
            .filter(|name| !(source.options.indentation && indent::LAYOUT_TERMINALS.contains(name)))
            .collect();
        literals.sort_unstable();
        literals.dedup();

        let mut rules = literals
            .into_iter()
            .map(LexRule::literal)
            .collect::<Result<SmallVec<[LexRule; 16]>, _>>()?;
        rules.extend(named.rules);
        debug!(rules = rules.len(), indentation = source.options.indentation, "compiled lexer");
        Ok(Self {
            rules,
            indentation: source.options.indentation,
        })
    }

    #[must_use]
    pub const fn with_indentation(mut self, indentation: bool) -> Self {
        self.indentation = indentation;
        self
    }

    #[must_use]
    pub const fn is_indentation_based(&self) -> bool {
        self.indentation
    }

    #[must_use]
    pub fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    /// Longest match at the start of `input`: `(rule index, length)`.
    fn longest_match(&self, input: &str) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (i, rule) in self.rules.iter().enumerate() {
            if let Some(len) = rule.match_len(input)
                && best.is_none_or(|(_, best_len)| len > best_len)
            {
                best = Some((i, len));
            }
        }
        best
    }

    /// Split a whole document into tokens, adding layout tokens when the
    /// lexer is indentation based.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Lexed {
        let mut lexed = self.tokenize_fragment(text);
        if self.indentation {
            lexed.tokens = indent::layout(lexed.tokens);
        }
        lexed
    }

    /// Split `text` into tokens without layout tokens, for text inserted
    /// into an existing document.
    #[must_use]
    pub fn tokenize_fragment(&self, text: &str) -> Lexed {
        let mut lexed = Lexed::default();
        let mut pos = 0;
        let mut error_start: Option<usize> = None;

        while pos < text.len() {
            let rest = &text[pos..];
            match self.longest_match(rest) {
                Some((rule, len)) => {
                    if let Some(start) = error_start.take() {
                        push_error(&mut lexed, text, start..pos);
                    }
                    let name = self.rules[rule].name.as_deref();
                    lexed.tokens.push(Token::new(name, &rest[..len], pos..pos + len));
                    pos += len;
                }
                None => {
                    error_start.get_or_insert(pos);
                    pos += rest.chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        if let Some(start) = error_start {
            push_error(&mut lexed, text, start..text.len());
        }
        lexed
    }
}

fn push_error(lexed: &mut Lexed, text: &str, span: std::ops::Range<usize>) {
    let slice = &text[span.clone()];
    lexed.tokens.push(Token::error(slice, span.clone()));
    lexed.errors.push(LexerError {
        span,
        text: slice.to_string(),
    });
}
