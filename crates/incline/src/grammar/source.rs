//! # Grammar Source Reader
//!
//! Reads grammars written in the textual rule format:
//!
//! ```text
//! %whitespace=true
//! %left "plus"
//! %left "times"
//!
//! E ::= E "plus" E
//!     | E "times" E
//!     | "INT"
//!     ;
//!
//! %%
//!
//! INT:"[0-9]+"
//! plus:"\+"
//! times:"\*"
//! <ws>:"[ \t]+"
//! <return>:"[\n\r]"
//! ```
//!
//! ## Header
//!
//! Lines starting with `%` before the first rule are either options
//! (`%name=value,name=value`) or precedence declarations (`%left`, `%right`,
//! `%nonassoc`, each followed by terminals). Later precedence lines bind
//! tighter.
//!
//! ## Rules
//!
//! `Name ::= alternative | alternative ;` where the trailing `;` is optional
//! and a new rule starts wherever a name is followed by `::=`. Inside an
//! alternative:
//!
//! - `Name` is a nonterminal,
//! - `"text"` is a terminal (the name of a lexer rule),
//! - `<name>` is a magic terminal (language box),
//! - `ANY` and `ANYNCR` are wildcard spans,
//! - `%prec "t"` gives the alternative the precedence of `t`,
//! - `{...}` is an annotation, parsed into an [`Annotation`](super::Annotation)
//!   when the grammar is built.
//!
//! An alternative without symbols is ε.
//!
//! ## Whitespace mode
//!
//! With `whitespace=true` (or [`GrammarSource::parse_with_whitespace`]) every
//! terminal outside the `comment` rule is followed by an implicit `WS`
//! nonterminal, a `WS` rule is synthesized from the `<ws>`/`<return>` lexer
//! rules and the `comment` rule, and the start symbol becomes
//! `Startrule ::= WS Start` so leading whitespace parses.

use super::{Alternative, Assoc, Grammar, GrammarBuilder, Symbol};
use crate::error::GrammarError;
use compact_str::CompactString;

/// Name of the implicit whitespace nonterminal.
pub const WS: &str = "WS";
/// Name of the start rule synthesized in whitespace mode.
pub const WS_START: &str = "Startrule";

/// Options read from the `%name=value` header lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarOptions {
    pub indentation: bool,
    pub whitespace: bool,
    /// Terminals the parser shifts through without a state change.
    pub pass_through: Vec<CompactString>,
    /// Options this reader does not interpret, in source order.
    pub extra: Vec<(String, String)>,
}

/// One `NAME:"regex"` line of the lexer section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerRuleSource {
    pub name: CompactString,
    pub pattern: String,
    pub line: usize,
}

/// A grammar read from source text together with its lexer section.
#[derive(Debug, Clone)]
pub struct GrammarSource {
    pub grammar: Grammar,
    pub lexer_rules: Vec<LexerRuleSource>,
    pub options: GrammarOptions,
}

impl GrammarSource {
    /// Read a grammar, honoring its own `whitespace` option.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for malformed source or an inconsistent grammar.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        Self::read(text, false)
    }

    /// Read a grammar with implicit whitespace forced on.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for malformed source or an inconsistent grammar.
    pub fn parse_with_whitespace(text: &str, whitespace: bool) -> Result<Self, GrammarError> {
        Self::read(text, whitespace)
    }

    fn read(text: &str, force_whitespace: bool) -> Result<Self, GrammarError> {
        let (rule_part, lexer_part) = split_sections(text);

        let mut options = GrammarOptions::default();
        let mut precedences = Vec::new();
        let mut body_start = 0;
        let mut body_line = 1;
        for (index, line) in rule_part.split_inclusive('\n').enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                body_start += line.len();
                body_line = index + 2;
                continue;
            }
            let Some(directive) = trimmed.strip_prefix('%') else {
                break;
            };
            read_directive(directive, index + 1, &mut options, &mut precedences)?;
            body_start += line.len();
            body_line = index + 2;
        }
        options.whitespace |= force_whitespace;

        let lexer_rules = read_lexer_section(lexer_part, rule_part.lines().count() + 2)?;
        let tokens = tokenize(&rule_part[body_start..], body_line)?;
        let rules = read_rules(&tokens)?;

        let mut builder = GrammarBuilder::new();
        let mut start = None;
        let has_comment = rules.iter().any(|(name, _)| name == "comment");
        for (name, alternatives) in rules {
            start.get_or_insert_with(|| name.clone());
            let in_comment = name == "comment";
            for mut alt in alternatives {
                if options.whitespace && !in_comment {
                    alt.symbols = insert_whitespace(alt.symbols);
                }
                builder.push_alternative(name.clone(), alt);
            }
        }
        for (assoc, terminals) in precedences {
            builder.push_precedence(assoc, terminals);
        }

        let Some(start) = start else {
            return Err(GrammarError::Empty);
        };
        if options.whitespace {
            let ws = || Symbol::nonterminal(WS);
            for magic in ["<ws>", "<return>"] {
                if lexer_rules.iter().any(|r| r.name == magic) {
                    builder.push_alternative(
                        WS.into(),
                        Alternative::new(vec![Symbol::terminal(magic), ws()]),
                    );
                }
            }
            if has_comment {
                builder.push_alternative(
                    WS.into(),
                    Alternative::new(vec![Symbol::nonterminal("comment"), ws()]),
                );
            }
            builder.push_alternative(WS.into(), Alternative::epsilon());
            builder.push_alternative(
                WS_START.into(),
                Alternative::new(vec![ws(), Symbol::Nonterminal(start)]),
            );
            builder.set_start(WS_START.into());
        } else {
            builder.set_start(start);
        }

        Ok(Self {
            grammar: builder.build()?,
            lexer_rules,
            options,
        })
    }
}

fn split_sections(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim() == "%%" {
            return (&text[..offset], &text[offset + line.len()..]);
        }
        offset += line.len();
    }
    (text, "")
}

fn read_directive(
    directive: &str,
    line: usize,
    options: &mut GrammarOptions,
    precedences: &mut Vec<(Assoc, Vec<CompactString>)>,
) -> Result<(), GrammarError> {
    let (keyword, rest) = directive
        .split_once(char::is_whitespace)
        .unwrap_or((directive, ""));
    let assoc = match keyword {
        "left" => Some(Assoc::Left),
        "right" => Some(Assoc::Right),
        "nonassoc" => Some(Assoc::NonAssoc),
        _ => None,
    };
    if let Some(assoc) = assoc {
        let mut terminals = Vec::new();
        for word in rest.split_whitespace() {
            let name = word
                .strip_prefix('"')
                .and_then(|w| w.strip_suffix('"'))
                .unwrap_or(word);
            if name.is_empty() {
                return Err(GrammarError::MalformedOption {
                    line,
                    text: directive.to_string(),
                });
            }
            terminals.push(CompactString::from(name));
        }
        if terminals.is_empty() {
            return Err(GrammarError::MalformedOption {
                line,
                text: directive.to_string(),
            });
        }
        precedences.push((assoc, terminals));
        return Ok(());
    }

    for pair in directive.split(',') {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(GrammarError::MalformedOption {
                line,
                text: directive.to_string(),
            });
        };
        let (name, value) = (name.trim(), value.trim());
        match name {
            "indentation" => options.indentation = parse_flag(value, line, directive)?,
            "whitespace" | "implicit_ws" => options.whitespace = parse_flag(value, line, directive)?,
            "passthrough" => options.pass_through.extend(
                value
                    .split('|')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(CompactString::from),
            ),
            _ => options.extra.push((name.to_string(), value.to_string())),
        }
    }
    Ok(())
}

fn parse_flag(value: &str, line: usize, directive: &str) -> Result<bool, GrammarError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(GrammarError::MalformedOption {
            line,
            text: directive.to_string(),
        }),
    }
}

fn read_lexer_section(text: &str, first_line: usize) -> Result<Vec<LexerRuleSource>, GrammarError> {
    let mut rules = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = first_line + index;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let malformed = || GrammarError::MalformedLexerRule {
            line,
            text: trimmed.to_string(),
        };
        let (name, pattern) = trimmed.split_once(':').ok_or_else(malformed)?;
        let pattern = pattern
            .trim()
            .strip_prefix('"')
            .and_then(|p| p.strip_suffix('"'))
            .ok_or_else(malformed)?;
        let name = name.trim();
        if name.is_empty() || pattern.is_empty() {
            return Err(malformed());
        }
        rules.push(LexerRuleSource {
            name: name.into(),
            pattern: pattern.to_string(),
            line,
        });
    }
    Ok(rules)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Name(CompactString),
    Terminal(CompactString),
    Magic(CompactString),
    Annotation(String),
    Mapsto,
    Alt,
    Semi,
    Prec,
}

fn tokenize(text: &str, first_line: usize) -> Result<Vec<(Tok, usize)>, GrammarError> {
    let mut tokens = Vec::new();
    let mut line = first_line;
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            ':' if text[pos..].starts_with("::=") => {
                chars.next();
                chars.next();
                tokens.push((Tok::Mapsto, line));
            }
            '|' => tokens.push((Tok::Alt, line)),
            ';' => tokens.push((Tok::Semi, line)),
            '"' => {
                let at = line;
                let name = take_until(&mut chars, &mut line, '"', "terminal")?;
                tokens.push((Tok::Terminal(name.into()), at));
            }
            '<' => {
                let at = line;
                let name = take_until(&mut chars, &mut line, '>', "magic terminal")?;
                tokens.push((Tok::Magic(name.into()), at));
            }
            '{' => {
                let at = line;
                let text = take_until(&mut chars, &mut line, '}', "annotation")?;
                tokens.push((Tok::Annotation(text.trim().to_string()), at));
            }
            '[' | ']' | '(' | ')' | '}' => {
                return Err(GrammarError::Unsupported {
                    line,
                    construct: c.to_string(),
                });
            }
            '%' if text[pos..].starts_with("%prec") => {
                for _ in 0..4 {
                    chars.next();
                }
                tokens.push((Tok::Prec, line));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = pos + c.len_utf8();
                while let Some((next, ch)) = chars.peek().copied() {
                    if ch.is_alphanumeric() || ch == '_' {
                        end = next + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Tok::Name(text[pos..end].into()), line));
            }
            other => {
                return Err(GrammarError::UnexpectedToken {
                    line,
                    found: other.to_string(),
                    expected: "a rule",
                });
            }
        }
    }
    Ok(tokens)
}

fn take_until(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    line: &mut usize,
    close: char,
    what: &'static str,
) -> Result<String, GrammarError> {
    let start_line = *line;
    let mut out = String::new();
    for (_, c) in chars.by_ref() {
        if c == close {
            return Ok(out);
        }
        if c == '\n' {
            *line += 1;
        }
        out.push(c);
    }
    Err(GrammarError::Unterminated {
        line: start_line,
        what,
    })
}

type RawRule = (CompactString, Vec<Alternative>);

fn read_rules(tokens: &[(Tok, usize)]) -> Result<Vec<RawRule>, GrammarError> {
    let starts_rule =
        |i: usize| matches!(tokens.get(i), Some((Tok::Name(_), _))) && matches!(tokens.get(i + 1), Some((Tok::Mapsto, _)));

    let mut rules: Vec<RawRule> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (Tok::Name(name), line) = &tokens[i] else {
            return Err(GrammarError::UnexpectedToken {
                line: tokens[i].1,
                found: describe(&tokens[i].0),
                expected: "a rule name",
            });
        };
        if !matches!(tokens.get(i + 1), Some((Tok::Mapsto, _))) {
            return Err(GrammarError::MissingMapping {
                line: *line,
                name: name.to_string(),
            });
        }
        i += 2;

        let mut alternatives = Vec::new();
        let mut current = Alternative::default();
        while i < tokens.len() && !starts_rule(i) {
            let (tok, line) = &tokens[i];
            match tok {
                Tok::Alt => alternatives.push(std::mem::take(&mut current)),
                Tok::Semi => {
                    i += 1;
                    break;
                }
                Tok::Terminal(t) => current.symbols.push(Symbol::Terminal(t.clone())),
                Tok::Magic(m) => current.symbols.push(Symbol::MagicTerminal(m.clone())),
                Tok::Name(n) if n == "ANY" => {
                    current.symbols.push(Symbol::Any(super::AnyMode::Multiline));
                }
                Tok::Name(n) if n == "ANYNCR" => {
                    current.symbols.push(Symbol::Any(super::AnyMode::SingleLine));
                }
                Tok::Name(n) => current.symbols.push(Symbol::Nonterminal(n.clone())),
                Tok::Annotation(a) => current.annotation = Some(a.clone()),
                Tok::Prec => {
                    i += 1;
                    match tokens.get(i) {
                        Some((Tok::Terminal(t) | Tok::Name(t), _)) => {
                            current.precedence = Some(Symbol::Terminal(t.clone()));
                        }
                        other => {
                            return Err(GrammarError::UnexpectedToken {
                                line: other.map_or(*line, |(_, l)| *l),
                                found: other.map_or_else(|| "end of input".into(), |(t, _)| describe(t)),
                                expected: "a terminal after %prec",
                            });
                        }
                    }
                }
                Tok::Mapsto => {
                    return Err(GrammarError::UnexpectedToken {
                        line: *line,
                        found: "::=".into(),
                        expected: "a symbol",
                    });
                }
            }
            i += 1;
        }
        alternatives.push(current);

        if let Some((_, existing)) = rules.iter_mut().find(|(n, _)| n == name) {
            existing.extend(alternatives);
        } else {
            rules.push((name.clone(), alternatives));
        }
    }
    Ok(rules)
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Name(n) => n.to_string(),
        Tok::Terminal(t) => format!("\"{t}\""),
        Tok::Magic(m) => format!("<{m}>"),
        Tok::Annotation(_) => "annotation".into(),
        Tok::Mapsto => "::=".into(),
        Tok::Alt => "|".into(),
        Tok::Semi => ";".into(),
        Tok::Prec => "%prec".into(),
    }
}

fn insert_whitespace(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut out = Vec::with_capacity(symbols.len() * 2);
    for symbol in symbols {
        if matches!(symbol, Symbol::Any(_))
            && out.last() == Some(&Symbol::nonterminal(WS))
        {
            out.pop();
        }
        let needs_ws = matches!(symbol, Symbol::Terminal(_) | Symbol::MagicTerminal(_));
        out.push(symbol);
        if needs_ws {
            out.push(Symbol::nonterminal(WS));
        }
    }
    out
}
