//! End-to-end behavior of the incremental parser.

mod common;

use common::Fixture;
use incline::error::diagnostics::format_syntax_error;
use incline::grammar::Symbol;
use incline::incremental::ParseStatus;
use incline::lr::ParserConfig;

const AMBIGUOUS_SUM: &str = "E ::= E \"+\" E | \"a\"";

#[test]
fn golden_acceptance() {
    let mut fx = Fixture::new(AMBIGUOUS_SUM);
    let cases = [
        ("a", true),
        ("a+a", true),
        ("a+a+a+a", true),
        ("a+", false),
        ("+a", false),
        ("aa", false),
        ("", false),
    ];
    for (input, accepted) in cases {
        assert_eq!(fx.accepts(input), accepted, "{input:?}");
    }
}

#[test]
fn missing_operand_is_reported_at_end_of_input() {
    let mut fx = Fixture::new(AMBIGUOUS_SUM);
    let doc = fx.document("a+");
    assert_eq!(fx.parse(&doc), ParseStatus::Error(doc.eos()));
    assert!(!fx.parser.last_status());

    let error = fx.parser.last_error().unwrap();
    assert_eq!(error.found, Symbol::Finish);
    assert_eq!(error.expected, vec![Symbol::terminal("a")]);
    assert_eq!(error.span, 2..2);
    assert_eq!(error.to_string(), "unexpected $, expected \"a\"");
}

#[test]
fn repeated_parse_without_edits_changes_nothing() {
    let mut fx = Fixture::new(AMBIGUOUS_SUM);
    let mut doc = fx.document("a+a+a");
    assert!(fx.parse(&doc).is_accepted());
    doc.commit(&mut fx.arena);
    let version = fx.arena.version();
    let children = fx.arena[doc.root()].children().to_vec();
    let snapshot = fx.arena.snapshot(doc.root());
    let nodes = fx.arena.len();

    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(fx.arena.version(), version);
    assert_eq!(fx.arena[doc.root()].children(), children.as_slice());
    assert_eq!(fx.arena.snapshot(doc.root()), snapshot);
    assert_eq!(fx.arena.len(), nodes);
    assert_eq!(fx.parser.metrics().reductions, 0);
}

#[test]
fn failed_attempt_leaves_the_tree_as_it_was() {
    let mut fx = Fixture::new(AMBIGUOUS_SUM);
    let mut doc = fx.document("a+a");
    assert!(fx.parse(&doc).is_accepted());

    let last = *doc.tokens(&fx.arena).last().unwrap();
    doc.replace_token(&mut fx.arena, last, None, "+");
    let before = fx.arena.snapshot(doc.root());
    let states: Vec<_> = fx.arena.ids().map(|id| fx.arena[id].state()).collect();

    let nodes = fx.arena.len();
    assert_eq!(fx.parse(&doc), ParseStatus::Error(last));
    assert_eq!(fx.parser.metrics().attempts, 1);
    assert_eq!(fx.arena.len(), nodes);
    assert_eq!(fx.arena.snapshot(doc.root()), before);
    let after: Vec<_> = fx.arena.ids().take(states.len()).map(|id| fx.arena[id].state()).collect();
    assert_eq!(after, states);
    assert!(fx.arena[last].is_changed());

    // fixing the edit parses again
    doc.replace_token(&mut fx.arena, last, None, "a");
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(doc.text(&fx.arena), "a+a");
}

#[test]
fn editing_the_middle_reuses_both_sides() {
    let grammar = "S ::= S \";\" E | E\nE ::= E \"+\" \"a\" | \"a\"";
    let mut fx = Fixture::new(grammar);
    let mut doc = fx.document("a+a;a+a;a+a");
    assert!(fx.parse(&doc).is_accepted());

    let tokens = doc.tokens(&fx.arena);
    let middle = tokens[6];
    let plus = fx.token("+");
    let a = fx.token("a");
    let plus = doc.insert_token_after(&mut fx.arena, middle, &plus).unwrap();
    doc.insert_token_after(&mut fx.arena, plus, &a).unwrap();

    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(doc.text(&fx.arena), "a+a;a+a+a;a+a");
    assert!(fx.parser.metrics().optimistic_shifts >= 2, "{:?}", fx.parser.metrics());
    let incremental = fx.arena.snapshot(doc.root());

    assert!(fx.full_parse(&doc).is_accepted());
    assert_eq!(fx.arena.snapshot(doc.root()), incremental);
}

#[test]
fn removing_tokens_reparses() {
    let mut fx = Fixture::new(AMBIGUOUS_SUM);
    let mut doc = fx.document("a+a+a");
    assert!(fx.parse(&doc).is_accepted());

    let tokens = doc.tokens(&fx.arena);
    doc.remove_token(&mut fx.arena, tokens[3]).unwrap();
    doc.remove_token(&mut fx.arena, tokens[4]).unwrap();
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(doc.text(&fx.arena), "a+a");

    doc.remove_token(&mut fx.arena, tokens[2]).unwrap();
    assert_eq!(fx.parse(&doc), ParseStatus::Error(doc.eos()));
}

#[test]
fn lexer_errors_become_syntax_errors() {
    let mut fx = Fixture::new(AMBIGUOUS_SUM);
    let source = "a+$";
    let lexed = fx.lexer.tokenize(source);
    assert_eq!(lexed.errors.len(), 1);
    let doc = fx.document(source);

    let status = fx.parse(&doc);
    let bad = doc.tokens(&fx.arena)[2];
    assert_eq!(status, ParseStatus::Error(bad));
    let report = format_syntax_error(fx.parser.last_error().unwrap(), source, Some("input"));
    assert!(report.starts_with("input:1:3: unexpected \"$\""), "{report}");
}

#[test]
fn implicit_whitespace_is_parsed_through_ws_rules() {
    let grammar = "%whitespace=true\n\
                   E ::= E \"plus\" \"INT\" | \"INT\"\n\
                   %%\n\
                   INT:\"[0-9]+\"\n\
                   plus:\"\\+\"\n\
                   <ws>:\"[ \\t]+\"\n";
    let mut fx = Fixture::new(grammar);
    assert!(fx.accepts(" 1 + 2"));
    assert!(fx.accepts("1+2  "));
    assert!(!fx.accepts("1 2"));
}

#[test]
fn grammar_pass_through_option_is_honored() {
    let grammar = "%passthrough=comment\n\
                   E ::= E \"+\" \"a\" | \"a\"\n\
                   %%\n\
                   comment:\"#[a-z]*\"\n";
    let mut fx = Fixture::new(grammar);
    assert!(fx.accepts("a#x+a#y"));
    assert!(fx.parser.metrics().pass_through >= 2);

    let mut strict = Fixture::with_config(
        "E ::= E \"+\" \"a\" | \"a\"\n%%\ncomment:\"#[a-z]*\"\n",
        ParserConfig::default(),
    );
    assert!(!strict.accepts("a#x+a"));
}

#[test]
fn wildcard_rule_reparses_after_edits_inside_the_span() {
    let grammar = "S ::= \"begin\" ANY \"end\"\n%%\nword:\"[a-z]+\"\n<ws>:\" +\"\n";
    let mut fx = Fixture::new(grammar);
    let mut doc = fx.document("begin foo bar end");
    assert!(fx.parse(&doc).is_accepted());

    let foo = doc.tokens(&fx.arena)[2];
    doc.replace_token(&mut fx.arena, foo, Some("word"), "baz");
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(doc.text(&fx.arena), "begin baz bar end");
}

#[test]
fn repeated_rejections_stay_local_and_do_not_grow_the_arena() {
    let mut fx = Fixture::new("E ::= E \"+\" \"a\" | \"a\"");
    let text = vec!["a"; 500].join("+");
    let mut doc = fx.document(&text);
    assert!(fx.parse(&doc).is_accepted());

    let last = *doc.tokens(&fx.arena).last().unwrap();
    let plus = fx.token("+");
    doc.insert_token_after(&mut fx.arena, last, &plus).unwrap();
    let nodes = fx.arena.len();
    for _ in 0..10 {
        assert_eq!(fx.parse(&doc), ParseStatus::Error(doc.eos()));
        assert_eq!(fx.parser.metrics().attempts, 1);
        assert!(fx.parser.metrics().reductions < 10, "{:?}", fx.parser.metrics());
        assert_eq!(fx.arena.len(), nodes);
    }
}

#[test]
fn language_boxes_parse_as_magic_terminals() {
    let mut fx = Fixture::new("S ::= \"x\" <sql> \"y\"");
    let mut doc = fx.document("xy");
    let mut sub = fx.document("");
    assert!(!fx.parse(&doc).is_accepted());

    let x = doc.tokens(&fx.arena)[0];
    let magic = doc.insert_language_box(&mut fx.arena, x, "sql", &sub).unwrap();
    assert!(fx.parse(&doc).is_accepted());
    let s = fx.arena[doc.root()].children()[1];
    assert_eq!(fx.arena[s].children()[1], magic);
    assert_eq!(fx.arena[s].children().len(), 3);

    // typing inside the box only reparses the host around it
    let select = fx.token("x");
    sub.insert_token_after(&mut fx.arena, sub.bos(), &select).unwrap();
    assert!(fx.arena[doc.root()].is_changed());
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(doc.text(&fx.arena), "xxy");
}

#[test]
fn indentation_grammars_parse_blocks() {
    let grammar = "%indentation=true,passthrough=<ws>|<return>\n\
                   stmts ::= stmts stmt | stmt\n\
                   stmt ::= \"ID\" \"NEWLINE\" | \"if\" \"ID\" \":\" \"NEWLINE\" \"INDENT\" stmts \"DEDENT\"\n\
                   %%\n\
                   ID:\"[a-z]+\"\n\
                   <ws>:\" +\"\n\
                   <return>:\"\\n\"\n";
    let mut fx = Fixture::new(grammar);
    assert!(fx.accepts("if a:\n    b\nc"));
    assert!(fx.accepts("if a:\n  if b:\n    c\n  d\n"));
    assert!(!fx.accepts("if a:\nb"));
    assert!(!fx.accepts("if a:\n    b\n  c"));

    let doc = fx.document("a\n\nb");
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(doc.text(&fx.arena), "a\n\nb");
    let layout: Vec<_> = doc
        .tokens(&fx.arena)
        .into_iter()
        .filter(|t| matches!(fx.arena[*t].symbol(), Symbol::IndentationTerminal(_)))
        .collect();
    assert_eq!(layout.len(), 2);
}

const CALCULATOR: &str = "E ::= T {#0}\n\
                          | E \"plus\" T {Plus(arg1=#0, arg2=#2)};\n\
                          T ::= P {#0}\n\
                          | T \"mul\" P {Mul(arg1=#0, arg2=#2)};\n\
                          P ::= \"INT\" {#0};\n\
                          %%\n\
                          INT:\"[0-9]+\"\n\
                          plus:\"\\+\"\n\
                          mul:\"\\*\"\n";

fn top_alternate(fx: &Fixture, doc: &incline::syntax::Document) -> String {
    let e = fx.arena[doc.root()].children()[1];
    fx.arena[e].alternate().unwrap().display(&fx.arena).to_string()
}

#[test]
fn annotations_build_abstract_nodes() {
    let mut fx = Fixture::new(CALCULATOR);
    let doc = fx.document("1+2*3");
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(top_alternate(&fx, &doc), "Plus(arg1=\"1\", arg2=Mul(arg1=\"2\", arg2=\"3\"))");

    let plus = fx.arena[doc.root()].children()[1];
    let ast = fx.arena[plus].alternate().unwrap().as_ast().unwrap();
    let one = ast.get("arg1").unwrap().as_node().unwrap();
    assert_eq!(fx.arena[one].lookup(), Some("INT"));
}

#[test]
fn abstract_nodes_follow_incremental_edits() {
    let mut fx = Fixture::new(CALCULATOR);
    let mut doc = fx.document("1+2");
    assert!(fx.parse(&doc).is_accepted());
    doc.commit(&mut fx.arena);

    let last = *doc.tokens(&fx.arena).last().unwrap();
    let star = fx.token("*");
    let mul = doc.insert_token_after(&mut fx.arena, last, &star).unwrap();
    let three = fx.token("3");
    doc.insert_token_after(&mut fx.arena, mul, &three).unwrap();
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(top_alternate(&fx, &doc), "Plus(arg1=\"1\", arg2=Mul(arg1=\"2\", arg2=\"3\"))");

    // a rejected edit keeps the abstract nodes of the last accepted tree
    let first = doc.tokens(&fx.arena)[0];
    doc.replace_token(&mut fx.arena, first, Some("plus"), "+");
    assert!(!fx.parse(&doc).is_accepted());
    assert_eq!(top_alternate(&fx, &doc), "Plus(arg1=\"+\", arg2=Mul(arg1=\"2\", arg2=\"3\"))");
    doc.replace_token(&mut fx.arena, first, Some("INT"), "7");
    assert!(fx.parse(&doc).is_accepted());
    assert_eq!(top_alternate(&fx, &doc), "Plus(arg1=\"7\", arg2=Mul(arg1=\"2\", arg2=\"3\"))");
}

#[test]
fn annotations_skip_implicit_whitespace() {
    let grammar = "%whitespace=true\n\
                   X ::= items {foreach(#0) Field(b=item.x)};\n\
                   items ::= items \"comma\" item {#0 + [#2]} | item {[#0]};\n\
                   item ::= \"a\" {Var(x=#0)} | \"b\" {Var(x=#0)};\n\
                   %%\n\
                   a:\"a\"\n\
                   b:\"b\"\n\
                   comma:\",\"\n\
                   <ws>:\" +\"\n";
    let mut fx = Fixture::new(grammar);
    let doc = fx.document("a , b");
    assert!(fx.parse(&doc).is_accepted());
    let x = fx.arena[doc.root()].children()[1];
    let x = fx.arena[x]
        .children()
        .iter()
        .copied()
        .find(|&c| fx.arena[c].symbol() == &Symbol::nonterminal("X"))
        .unwrap();
    let fields = fx.arena[x].alternate().unwrap();
    assert_eq!(fields.as_list().unwrap().name, "X");
    assert_eq!(fields.display(&fx.arena).to_string(), "[Field(b=\"a\"), Field(b=\"b\")]");
}
