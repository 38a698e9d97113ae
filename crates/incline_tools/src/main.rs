//! Incline Tools CLI
//!
//! Command-line tools for working with incline grammars.

use clap::Parser;
use incline::arena::TreeArena;
use incline::error::diagnostics::{ConflictDiagnostic, format_syntax_error};
use incline::incremental::IncParser;
use incline::lexer::Lexer;
use incline::lr::ParserConfig;
use incline::syntax::{Document, PrettyConfig, render_with};
use incline_tools::cli::{Cli, Commands};
use incline_tools::replay::{Replay, parse_script};
use incline_tools::visualize::{automaton_dot, automaton_json, table_report, tree_dot};
use incline_tools::{Loaded, load_grammar};
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Table { grammar, states } => {
            let loaded = load_grammar(&grammar)?;
            print!("{}", table_report(&loaded.table, states));
            for conflict in loaded.table.unresolved_conflicts() {
                let report = miette::Report::new(ConflictDiagnostic::new(&loaded.table, conflict));
                eprintln!("{report:?}");
            }
        }
        Commands::Dot { grammar, input, output } => {
            let loaded = load_grammar(&grammar)?;
            let dot = match input {
                Some(input) => {
                    let (arena, doc, _) = parse_file(&loaded, &input)?;
                    tree_dot(&arena, doc.root())
                }
                None => automaton_dot(&loaded.table),
            };
            emit(output.as_deref(), &dot)?;
        }
        Commands::Json { grammar, output } => {
            let loaded = load_grammar(&grammar)?;
            let json = serde_json::to_string_pretty(&automaton_json(&loaded.table)).into_diagnostic()?;
            emit(output.as_deref(), &json)?;
        }
        Commands::Parse { grammar, input, changed } => {
            let loaded = load_grammar(&grammar)?;
            let (arena, doc, parser) = parse_file(&loaded, &input)?;
            if let Some(error) = parser.last_error() {
                let text = doc.text(&arena);
                let name = input.display().to_string();
                eprintln!("{}", format_syntax_error(error, &text, Some(&name)));
                return Ok(ExitCode::FAILURE);
            }
            let config = PrettyConfig {
                changed,
                ..PrettyConfig::default()
            };
            print!("{}", render_with(&arena, doc.root(), &config));
        }
        Commands::Replay { grammar, script } => {
            let loaded = load_grammar(&grammar)?;
            let text = read(&script)?;
            let commands = parse_script(&text)?;
            let mut replay = Replay::new(&loaded)?;
            print!("{}", replay.run_all(&commands)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .into_diagnostic()
                .wrap_err_with(|| format!("writing {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

/// Lex and parse `input` from scratch.
fn parse_file(loaded: &Loaded, input: &Path) -> Result<(TreeArena, Document, IncParser)> {
    let text = read(input)?;
    let lexer = Lexer::for_grammar(&loaded.source).into_diagnostic()?;
    let lexed = lexer.tokenize(&text);
    if let Some(error) = lexed.errors.first() {
        tracing::warn!(%error, "input does not lex cleanly");
    }
    let config =
        ParserConfig::default().with_pass_through(loaded.source.options.pass_through.iter().cloned());
    let mut parser = IncParser::new(loaded.table.clone(), config);
    let mut arena = TreeArena::with_capacity(lexed.tokens.len() * 2);
    let doc = Document::from_tokens(&mut arena, &lexed.tokens);
    parser
        .inc_parse(&mut arena, &doc, true)
        .map_err(|err| miette!("internal parser fault: {err}"))?;
    Ok((arena, doc, parser))
}
