use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use incline::arena::TreeArena;
use incline::grammar::GrammarSource;
use incline::incremental::IncParser;
use incline::lexer::Lexer;
use incline::lr::{self, LrMode, ParserConfig};
use incline::syntax::Document;
use std::hint::black_box;
use std::sync::Arc;

const GRAMMAR: &str = "%left \"plus\"\n%left \"times\"\n\
                       S ::= S \"semi\" E | E\n\
                       E ::= E \"plus\" E | E \"times\" E | \"lpar\" E \"rpar\" | \"INT\"\n\
                       %%\n\
                       INT:\"[0-9]+\"\n\
                       plus:\"\\+\"\n\
                       times:\"\\*\"\n\
                       semi:\";\"\n\
                       lpar:\"\\(\"\n\
                       rpar:\"\\)\"\n";

fn input(statements: usize) -> String {
    (0..statements)
        .map(|i| format!("{i}+({i}*2)*3+4"))
        .collect::<Vec<_>>()
        .join(";")
}

fn table_construction(c: &mut Criterion) {
    let source = GrammarSource::parse(GRAMMAR).unwrap();
    let grammar = Arc::new(source.grammar);
    let mut group = c.benchmark_group("table");
    for mode in [LrMode::Lr0, LrMode::Lr1, LrMode::Lalr] {
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| lr::build_uncached(Arc::clone(black_box(&grammar)), mode));
        });
    }
    group.finish();
}

fn reparse(c: &mut Criterion) {
    let source = GrammarSource::parse(GRAMMAR).unwrap();
    let lexer = Lexer::for_grammar(&source).unwrap();
    let text = input(200);
    let tokens = lexer.tokenize(&text).tokens;

    let mut group = c.benchmark_group("parse");
    group.bench_function("from_scratch", |b| {
        let mut parser = IncParser::for_source(&source, ParserConfig::default());
        b.iter_batched(
            || {
                let mut arena = TreeArena::with_capacity(tokens.len() * 3);
                let doc = Document::from_tokens(&mut arena, &tokens);
                (arena, doc)
            },
            |(mut arena, doc)| parser.inc_parse(&mut arena, &doc, false).unwrap(),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("single_token_edit", |b| {
        let mut parser = IncParser::for_source(&source, ParserConfig::default());
        let mut arena = TreeArena::new();
        let mut doc = Document::from_tokens(&mut arena, &tokens);
        parser.inc_parse(&mut arena, &doc, false).unwrap();
        let middle = doc.tokens(&arena)[tokens.len() / 2];
        let original = arena[middle].text().to_string();
        let lookup = arena[middle].lookup().map(str::to_string);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let text = if flip && lookup.as_deref() == Some("INT") { "7" } else { original.as_str() };
            doc.replace_token(&mut arena, middle, lookup.as_deref(), text);
            black_box(parser.inc_parse(&mut arena, &doc, false).unwrap())
        });
    });
    group.finish();
}

criterion_group!(benches, table_construction, reparse);
criterion_main!(benches);
