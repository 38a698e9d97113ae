//! Scripted edit replay
//!
//! A replay script drives a document through token edits, parses, commits
//! and undo/redo, one command per line:
//!
//! ```text
//! # comment
//! insert ^ 1+2      # lex "1+2", insert after the beginning of the document
//! insert 0 +3       # insert after token 0
//! replace 2 7       # token 2 becomes "7"
//! remove 1
//! parse             # incremental parse
//! reparse           # parse breaking down every subtree
//! commit
//! undo 1
//! redo 2
//! text
//! tree
//! ast               # abstract nodes built by annotations
//! ```
//!
//! Token indexes count the document's tokens from zero; `^` names the
//! position before the first token.

use crate::Loaded;
use incline::arena::{NodeId, TreeArena, Version};
use incline::error::diagnostics::format_syntax_error;
use incline::incremental::{IncParser, ParseStatus};
use incline::lexer::{Lexer, Token};
use incline::lr::ParserConfig;
use incline::syntax::{Document, PrettyConfig, render_with};
use miette::{IntoDiagnostic, Result, miette};
use std::fmt::Write;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Token(usize),
}

/// One script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert { after: Anchor, text: String },
    Remove { at: usize },
    Replace { at: usize, text: String },
    Parse,
    Reparse,
    Commit,
    Undo(Version),
    Redo(Version),
    Text,
    Tree,
    Ast,
}

/// Parse a whole script.
///
/// # Errors
///
/// Names the first malformed line.
pub fn parse_script(script: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (index, raw) in script.lines().enumerate() {
        let line = raw.split_once(" #").map_or(raw, |(code, _)| code).trim_end();
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let command = parse_line(line.trim_start())
            .map_err(|message| miette!("script line {}: {message}", index + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_line(line: &str) -> Result<Command, String> {
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let index = |arg: &str| -> Result<usize, String> {
        arg.parse().map_err(|_| format!("expected a token index, found {arg:?}"))
    };
    let version = |arg: &str| -> Result<Version, String> {
        arg.trim().parse().map_err(|_| format!("expected a version, found {arg:?}"))
    };
    let with_text = |rest: &str| -> Result<(String, String), String> {
        let (position, text) = rest
            .split_once(' ')
            .ok_or_else(|| format!("`{verb}` needs a position and text"))?;
        Ok((position.to_string(), text.to_string()))
    };
    match verb {
        "insert" => {
            let (position, text) = with_text(rest)?;
            let after = if position == "^" {
                Anchor::Start
            } else {
                Anchor::Token(index(&position)?)
            };
            Ok(Command::Insert { after, text })
        }
        "replace" => {
            let (position, text) = with_text(rest)?;
            Ok(Command::Replace { at: index(&position)?, text })
        }
        "remove" => Ok(Command::Remove { at: index(rest.trim())? }),
        "parse" => Ok(Command::Parse),
        "reparse" => Ok(Command::Reparse),
        "commit" => Ok(Command::Commit),
        "undo" => Ok(Command::Undo(version(rest)?)),
        "redo" => Ok(Command::Redo(version(rest)?)),
        "text" => Ok(Command::Text),
        "tree" => Ok(Command::Tree),
        "ast" => Ok(Command::Ast),
        other => Err(format!("unknown command `{other}`")),
    }
}

/// A document under replay, with its lexer and parser.
pub struct Replay {
    lexer: Lexer,
    parser: IncParser,
    arena: TreeArena,
    doc: Document,
}

impl Replay {
    /// An empty document for the grammar in `loaded`.
    ///
    /// # Errors
    ///
    /// Fails when the grammar's lexer rules do not compile.
    pub fn new(loaded: &Loaded) -> Result<Self> {
        let lexer = Lexer::for_grammar(&loaded.source).into_diagnostic()?;
        let config = ParserConfig::default()
            .with_pass_through(loaded.source.options.pass_through.iter().cloned());
        let parser = IncParser::new(loaded.table.clone(), config);
        let mut arena = TreeArena::new();
        let doc = Document::new(&mut arena);
        Ok(Self {
            lexer,
            parser,
            arena,
            doc,
        })
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub const fn arena(&self) -> &TreeArena {
        &self.arena
    }

    #[must_use]
    pub const fn parser(&self) -> &IncParser {
        &self.parser
    }

    /// Run every command, collecting their output.
    ///
    /// # Errors
    ///
    /// Stops at the first command that fails.
    pub fn run_all(&mut self, commands: &[Command]) -> Result<String> {
        let mut out = String::new();
        for command in commands {
            out.push_str(&self.run(command)?);
        }
        Ok(out)
    }

    /// Run one command. Parses report their status; commits report the new
    /// version.
    ///
    /// # Errors
    ///
    /// Fails for token indexes out of range, text that does not lex to the
    /// expected tokens, and internal parser faults.
    pub fn run(&mut self, command: &Command) -> Result<String> {
        debug!(?command, "replay");
        let mut out = String::new();
        match command {
            Command::Insert { after, text } => {
                let mut anchor = match after {
                    Anchor::Start => self.doc.bos(),
                    Anchor::Token(at) => self.token(*at)?,
                };
                for token in self.lex(text)? {
                    anchor = self
                        .doc
                        .insert_token_after(&mut self.arena, anchor, &token)
                        .into_diagnostic()?;
                }
            }
            Command::Remove { at } => {
                let node = self.token(*at)?;
                self.doc.remove_token(&mut self.arena, node).into_diagnostic()?;
            }
            Command::Replace { at, text } => {
                let node = self.token(*at)?;
                let mut tokens = self.lex(text)?;
                if tokens.len() != 1 {
                    return Err(miette!("{text:?} is {} tokens, expected one", tokens.len()));
                }
                let token = tokens.remove(0);
                self.doc
                    .replace_token(&mut self.arena, node, token.lookup.as_deref(), &token.text);
            }
            Command::Parse | Command::Reparse => {
                let reparse = matches!(command, Command::Reparse);
                let status = self
                    .parser
                    .inc_parse(&mut self.arena, &self.doc, reparse)
                    .into_diagnostic()?;
                match (status, self.parser.last_error()) {
                    (ParseStatus::Accepted, _) => out.push_str("accepted\n"),
                    (ParseStatus::Error(_), Some(error)) => {
                        let text = self.doc.text(&self.arena);
                        let _ = writeln!(out, "{}", format_syntax_error(error, &text, None));
                    }
                    (ParseStatus::Error(node), None) => {
                        let _ = writeln!(out, "rejected at {node}");
                    }
                }
            }
            Command::Commit => {
                let version = self.doc.commit(&mut self.arena);
                let _ = writeln!(out, "version {version}");
            }
            Command::Undo(version) => {
                if !self.doc.undo_to(&mut self.arena, *version) {
                    return Err(miette!("no version {version} to undo to"));
                }
            }
            Command::Redo(version) => {
                if !self.doc.redo_to(&mut self.arena, *version) {
                    return Err(miette!("cannot redo to version {version}"));
                }
            }
            Command::Text => {
                let _ = writeln!(out, "{}", self.doc.text(&self.arena));
            }
            Command::Tree => {
                let config = PrettyConfig {
                    states: false,
                    changed: true,
                    ..PrettyConfig::default()
                };
                out.push_str(&render_with(&self.arena, self.doc.root(), &config));
            }
            Command::Ast => {
                let root = &self.arena[self.doc.root()];
                let mut found = false;
                for &child in root.children() {
                    if let Some(alternate) = self.arena[child].alternate() {
                        let _ = writeln!(out, "{}", alternate.display(&self.arena));
                        found = true;
                    }
                }
                if !found {
                    out.push_str("no abstract syntax\n");
                }
            }
        }
        Ok(out)
    }

    fn token(&self, at: usize) -> Result<NodeId> {
        let tokens = self.doc.tokens(&self.arena);
        tokens
            .get(at)
            .copied()
            .ok_or_else(|| miette!("token {at} out of range, the document has {}", tokens.len()))
    }

    fn lex(&self, text: &str) -> Result<Vec<Token>> {
        let lexed = self.lexer.tokenize_fragment(text);
        match lexed.errors.into_iter().next() {
            Some(error) => Err(miette!("{error} in {text:?}")),
            None => Ok(lexed.tokens),
        }
    }
}
