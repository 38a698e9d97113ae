//! Helpers shared by the integration tests.

#![allow(dead_code)]

use incline::arena::TreeArena;
use incline::grammar::GrammarSource;
use incline::incremental::{IncParser, ParseStatus};
use incline::lexer::{Lexer, Token};
use incline::lr::{LrMode, ParserConfig};
use incline::syntax::Document;

/// A grammar with its lexer and a parser, plus one arena for documents.
pub struct Fixture {
    pub source: GrammarSource,
    pub lexer: Lexer,
    pub parser: IncParser,
    pub arena: TreeArena,
}

impl Fixture {
    pub fn new(grammar: &str) -> Self {
        Self::with_config(grammar, ParserConfig::default())
    }

    pub fn with_mode(grammar: &str, mode: LrMode) -> Self {
        Self::with_config(grammar, ParserConfig::default().with_mode(mode))
    }

    pub fn with_config(grammar: &str, config: ParserConfig) -> Self {
        let source = GrammarSource::parse(grammar).expect("grammar should parse");
        let lexer = Lexer::for_grammar(&source).expect("lexer should compile");
        let parser = IncParser::for_source(&source, config);
        Self {
            source,
            lexer,
            parser,
            arena: TreeArena::new(),
        }
    }

    /// A fresh document holding the tokens of `text`.
    pub fn document(&mut self, text: &str) -> Document {
        let lexed = self.lexer.tokenize(text);
        Document::from_tokens(&mut self.arena, &lexed.tokens)
    }

    pub fn parse(&mut self, doc: &Document) -> ParseStatus {
        self.parser
            .inc_parse(&mut self.arena, doc, false)
            .expect("no invariant violation")
    }

    pub fn full_parse(&mut self, doc: &Document) -> ParseStatus {
        self.parser
            .inc_parse(&mut self.arena, doc, true)
            .expect("no invariant violation")
    }

    /// Parse `text` from scratch in a new document.
    pub fn accepts(&mut self, text: &str) -> bool {
        let doc = self.document(text);
        self.parse(&doc).is_accepted()
    }

    pub fn token(&self, text: &str) -> Token {
        let lexed = self.lexer.tokenize(text);
        assert_eq!(lexed.tokens.len(), 1, "{text:?} should be one token");
        lexed.tokens[0].clone()
    }
}
