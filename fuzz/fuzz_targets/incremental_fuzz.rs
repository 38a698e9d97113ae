#![no_main]
use incline::arena::TreeArena;
use incline::grammar::GrammarSource;
use incline::incremental::IncParser;
use incline::lexer::{Lexer, Token};
use incline::lr::ParserConfig;
use incline::syntax::Document;
use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

// Unambiguous, so every accepted text has exactly one tree.
const GRAMMAR: &str = "S ::= S \";\" E | E |\n\
                       E ::= E \"+\" T | T\n\
                       T ::= T \"*\" F | F\n\
                       F ::= \"(\" E \")\" | \"a\"\n";
const ALPHABET: [&str; 6] = ["a", "+", "*", ";", "(", ")"];

static SOURCE: LazyLock<GrammarSource> =
    LazyLock::new(|| GrammarSource::parse(GRAMMAR).expect("fuzz grammar parses"));

fuzz_target!(|data: &[u8]| {
    let lexer = Lexer::for_grammar(&SOURCE).expect("fuzz lexer compiles");
    let mut parser = IncParser::for_source(&SOURCE, ParserConfig::default());
    let mut scratch = IncParser::for_source(&SOURCE, ParserConfig::default());

    let mut arena = TreeArena::new();
    let mut doc = Document::new(&mut arena);

    // Each pair of bytes is one edit: (operation, position/token).
    for chunk in data.chunks_exact(2) {
        let tokens = doc.tokens(&arena);
        let token = Token::new(None, ALPHABET[chunk[1] as usize % ALPHABET.len()], 0..1);
        match chunk[0] % 4 {
            0 | 1 => {
                let anchor = if tokens.is_empty() {
                    doc.bos()
                } else {
                    tokens[chunk[0] as usize % tokens.len()]
                };
                doc.insert_token_after(&mut arena, anchor, &token).unwrap();
            }
            2 if !tokens.is_empty() => {
                let node = tokens[chunk[1] as usize % tokens.len()];
                doc.remove_token(&mut arena, node).unwrap();
            }
            3 if !tokens.is_empty() => {
                let node = tokens[chunk[0] as usize % tokens.len()];
                doc.replace_token(&mut arena, node, None, &token.text);
            }
            _ => continue,
        }

        let before = arena.snapshot(doc.root());
        let status = parser.inc_parse(&mut arena, &doc, false).unwrap();

        let text = doc.text(&arena);
        let mut fresh = TreeArena::new();
        let fresh_doc = Document::from_tokens(&mut fresh, &lexer.tokenize(&text).tokens);
        let expected = scratch.inc_parse(&mut fresh, &fresh_doc, true).unwrap();

        assert_eq!(status.is_accepted(), expected.is_accepted(), "{text:?}");
        if status.is_accepted() {
            assert_eq!(arena.snapshot(doc.root()), fresh.snapshot(fresh_doc.root()), "{text:?}");
        } else {
            assert_eq!(arena.snapshot(doc.root()), before, "{text:?}");
        }
    }
});
