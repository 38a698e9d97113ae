//! Layout tokens for indentation-sensitive grammars.
//!
//! With the `indentation` option every logical line after the first starts
//! with `NEWLINE`, closing the line before it, followed by one `INDENT` when
//! the line is indented deeper than the enclosing level or one `DEDENT` per
//! level it closes. A line that dedents to a width no open level has gets a
//! single `UNBALANCED` token instead, which no grammar expects. The end of
//! the input closes the last line and every level still open.
//!
//! A line is logical when it holds a token other than `<ws>`, `<return>`
//! and `comment`. Its width is the length of a leading `<ws>` token.

use super::Token;

pub const INDENT: &str = "INDENT";
pub const DEDENT: &str = "DEDENT";
pub const NEWLINE: &str = "NEWLINE";
pub const UNBALANCED: &str = "UNBALANCED";

/// Terminal names the layout pass generates.
pub const LAYOUT_TERMINALS: [&str; 4] = [INDENT, DEDENT, NEWLINE, UNBALANCED];

fn class(token: &Token) -> Option<&str> {
    token.lookup.as_deref()
}

fn is_return(token: &Token) -> bool {
    class(token) == Some("<return>")
}

fn is_trivia(token: &Token) -> bool {
    matches!(class(token), Some("<ws>" | "<return>" | "comment"))
}

fn width(line: &[Token]) -> usize {
    match line.first() {
        Some(first) if class(first) == Some("<ws>") => first.text.chars().count(),
        _ => 0,
    }
}

/// Insert layout tokens into a lexed token stream.
#[must_use]
pub fn layout(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len() + tokens.len() / 4 + 2);
    // widths of the open levels, outermost first
    let mut levels: Vec<usize> = Vec::new();

    for line in tokens.split_inclusive(is_return) {
        if !line.iter().any(|t| !is_trivia(t)) {
            out.extend_from_slice(line);
            continue;
        }
        let width = width(line);
        let at = line[0].range.start;
        match levels.last().copied() {
            None => levels.push(width),
            Some(top) if width == top => out.push(Token::indentation(NEWLINE, at)),
            Some(top) if width > top => {
                levels.push(width);
                out.push(Token::indentation(NEWLINE, at));
                out.push(Token::indentation(INDENT, at));
            }
            Some(_) => {
                let mut closed = 0;
                while levels.last().is_some_and(|level| *level > width) {
                    levels.pop();
                    closed += 1;
                }
                if levels.last() == Some(&width) {
                    out.push(Token::indentation(NEWLINE, at));
                    out.extend((0..closed).map(|_| Token::indentation(DEDENT, at)));
                } else {
                    levels.push(width);
                    out.push(Token::indentation(UNBALANCED, at));
                }
            }
        }
        out.extend_from_slice(line);
    }

    if !levels.is_empty() {
        let end = tokens.last().map_or(0, |t| t.range.end);
        out.push(Token::indentation(NEWLINE, end));
        out.extend((1..levels.len()).map(|_| Token::indentation(DEDENT, end)));
    }
    out
}
