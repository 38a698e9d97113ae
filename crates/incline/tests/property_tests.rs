//! Property-based tests for incremental parsing and tree history.
//!
//! Random edit scripts are applied to a document and after every edit the
//! incremental result is compared with a from-scratch parse of the same
//! text. Random sessions of edits, commits, undo and redo are checked
//! against the text recorded at every commit.

mod common;

use common::Fixture;
use incline::arena::TreeArena;
use incline::grammar::Symbol;
use incline::incremental::ParseStatus;
use incline::lexer::Token;
use incline::syntax::Document;
use proptest::prelude::*;

const GRAMMAR: &str = "S ::= S \";\" E | E\nE ::= E \"+\" T | T\nT ::= \"a\" | \"(\" E \")\"";
const ALPHABET: [&str; 5] = ["a", "+", ";", "(", ")"];

#[derive(Debug, Clone)]
enum Edit {
    Insert { at: usize, token: usize },
    Remove { at: usize },
    Replace { at: usize, token: usize },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), 0..ALPHABET.len()).prop_map(|(at, token)| Edit::Insert { at, token }),
        any::<usize>().prop_map(|at| Edit::Remove { at }),
        (any::<usize>(), 0..ALPHABET.len()).prop_map(|(at, token)| Edit::Replace { at, token }),
    ]
}

/// Valid sentences, so scripts start from a parsed tree.
fn sentence() -> impl Strategy<Value = String> {
    let term = prop_oneof![Just("a".to_string()), Just("(a+a)".to_string())];
    let expr = prop::collection::vec(term, 1..4).prop_map(|ts| ts.join("+"));
    prop::collection::vec(expr, 1..4).prop_map(|es| es.join(";"))
}

#[derive(Debug, Clone)]
enum Step {
    Edit(Edit),
    Parse,
    Commit,
    Undo(u64),
    Redo(u64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => edit().prop_map(Step::Edit),
        2 => Just(Step::Parse),
        2 => Just(Step::Commit),
        1 => any::<u64>().prop_map(Step::Undo),
        1 => any::<u64>().prop_map(Step::Redo),
    ]
}

/// Apply `edit` to `doc`; edits that need a token are skipped on an empty
/// document.
fn apply(fx: &mut Fixture, doc: &mut Document, edit: &Edit) {
    let tokens = doc.tokens(&fx.arena);
    match *edit {
        Edit::Insert { at, token: t } => {
            let anchor = if tokens.is_empty() { doc.bos() } else { tokens[at % tokens.len()] };
            doc.insert_token_after(&mut fx.arena, anchor, &token(t)).unwrap();
        }
        Edit::Remove { at } if !tokens.is_empty() => {
            doc.remove_token(&mut fx.arena, tokens[at % tokens.len()]).unwrap();
        }
        Edit::Replace { at, token: t } if !tokens.is_empty() => {
            doc.replace_token(&mut fx.arena, tokens[at % tokens.len()], None, ALPHABET[t]);
        }
        _ => {}
    }
}

fn token(index: usize) -> Token {
    let text = ALPHABET[index];
    Token::new(None, text, 0..text.len())
}

/// Parse `text` in a fresh arena: acceptance plus the tree's shape.
fn from_scratch(fx: &mut Fixture, text: &str) -> (bool, Option<incline::arena::TreeSnapshot>) {
    let mut arena = TreeArena::new();
    let lexed = fx.lexer.tokenize(text);
    let doc = Document::from_tokens(&mut arena, &lexed.tokens);
    let status = fx
        .parser
        .inc_parse(&mut arena, &doc, true)
        .expect("no invariant violation");
    let accepted = status.is_accepted();
    (accepted, accepted.then(|| arena.snapshot(doc.root())))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn incremental_agrees_with_from_scratch(text in sentence(), edits in prop::collection::vec(edit(), 1..12)) {
        let mut fx = Fixture::new(GRAMMAR);
        let mut doc = fx.document(&text);
        prop_assert!(fx.parse(&doc).is_accepted());

        for edit in edits {
            apply(&mut fx, &mut doc, &edit);
            let before = fx.arena.snapshot(doc.root());
            let status = fx.parse(&doc);
            let current = doc.text(&fx.arena);
            let (accepted, expected) = from_scratch(&mut fx, &current);
            prop_assert_eq!(status.is_accepted(), accepted, "text {:?}", current);
            match status {
                ParseStatus::Accepted => {
                    prop_assert_eq!(Some(fx.arena.snapshot(doc.root())), expected);
                }
                ParseStatus::Error(_) => {
                    prop_assert_eq!(fx.arena.snapshot(doc.root()), before);
                }
            }
        }
    }

    #[test]
    fn error_position_does_not_depend_on_reuse(text in sentence(), at in any::<usize>(), t in 0..ALPHABET.len()) {
        let mut fx = Fixture::new(GRAMMAR);
        let mut doc = fx.document(&text);
        prop_assert!(fx.parse(&doc).is_accepted());
        let tokens = doc.tokens(&fx.arena);
        doc.insert_token_after(&mut fx.arena, tokens[at % tokens.len()], &token(t)).unwrap();

        let incremental = fx.parse(&doc);
        let incremental_span = fx.parser.last_error().map(|e| e.span.clone());
        let full = fx.full_parse(&doc);
        prop_assert_eq!(incremental, full);
        prop_assert_eq!(incremental_span, fx.parser.last_error().map(|e| e.span.clone()));
    }

    #[test]
    fn history_round_trips(texts in prop::collection::vec("[a-z]{1,4}", 1..8), at in 0u64..10) {
        let mut arena = TreeArena::new();
        let node = arena.alloc_terminal(Symbol::terminal("x"), None, "x");
        arena.save(node, 0);
        let mut expected = vec![("x".to_string(), 0u64)];
        for (i, text) in texts.iter().enumerate() {
            let version = i as u64 + 1;
            arena.set_token(node, None, text.as_str());
            arena.save(node, version);
            expected.push((text.clone(), version));
        }

        let want = expected
            .iter()
            .rev()
            .find(|(_, v)| *v <= at)
            .map(|(t, _)| t.clone())
            .unwrap();
        prop_assert!(arena.load(node, at));
        prop_assert_eq!(arena[node].text(), want.as_str());
    }

    #[test]
    fn undo_and_redo_restore_the_text_of_each_commit(
        text in sentence(),
        steps in prop::collection::vec(step(), 1..40),
    ) {
        let mut fx = Fixture::new(GRAMMAR);
        let mut doc = fx.document(&text);
        let other = fx.document("a");
        // committed texts by version
        let mut committed = vec![(doc.text(&fx.arena), other.text(&fx.arena))];

        for step in steps {
            match step {
                Step::Edit(edit) => apply(&mut fx, &mut doc, &edit),
                Step::Parse => {
                    let _ = fx.parse(&doc);
                }
                Step::Commit => {
                    let base = fx.arena.version();
                    committed.truncate(base as usize + 1);
                    let version = doc.commit(&mut fx.arena);
                    prop_assert_eq!(version, base + 1);
                    committed.push((doc.text(&fx.arena), other.text(&fx.arena)));
                    prop_assert_eq!(fx.arena.max_version(), version);
                }
                Step::Undo(k) => {
                    let target = k % (fx.arena.version() + 1);
                    prop_assert!(doc.undo_to(&mut fx.arena, target));
                    prop_assert_eq!(fx.arena.version(), target);
                    let (text, other_text) = &committed[target as usize];
                    prop_assert_eq!(&doc.text(&fx.arena), text);
                    prop_assert_eq!(&other.text(&fx.arena), other_text);
                }
                Step::Redo(k) => {
                    let version = fx.arena.version();
                    let target = version + k % (fx.arena.max_version() - version + 1);
                    prop_assert!(doc.redo_to(&mut fx.arena, target));
                    let (text, _) = &committed[target as usize];
                    prop_assert_eq!(&doc.text(&fx.arena), text);
                    if target > 0 {
                        prop_assert!(!doc.redo_to(&mut fx.arena, target - 1));
                    }
                }
            }
        }

        // whatever the session did, the last commit parses like a fresh document
        let last = fx.arena.max_version();
        prop_assert!(doc.undo_to(&mut fx.arena, last));
        let status = fx.parse(&doc);
        let (accepted, _) = from_scratch(&mut fx, &committed[last as usize].0);
        prop_assert_eq!(status.is_accepted(), accepted);
    }
}
