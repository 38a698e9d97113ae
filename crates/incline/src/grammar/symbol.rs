//! Grammar symbols.

use compact_str::CompactString;
use std::fmt;

/// Dense index of a symbol inside one [`Grammar`](super::Grammar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How far a wildcard span may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AnyMode {
    /// `ANY`: consumes across line breaks.
    Multiline,
    /// `ANYNCR`: stops at the first line break.
    SingleLine,
}

/// A grammar symbol.
///
/// Equality and hashing are by kind and name, so `Terminal("x")` and
/// `Nonterminal("x")` are distinct symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol {
    Terminal(CompactString),
    Nonterminal(CompactString),
    Epsilon,
    /// End of input.
    Finish,
    /// A terminal standing for an embedded sub-document (language box).
    MagicTerminal(CompactString),
    /// `INDENT`, `DEDENT` and `NEWLINE` tokens produced by an indentation-aware lexer.
    IndentationTerminal(CompactString),
    /// Wildcard span.
    Any(AnyMode),
}

impl Symbol {
    #[must_use]
    pub fn terminal(name: impl Into<CompactString>) -> Self {
        Self::Terminal(name.into())
    }

    #[must_use]
    pub fn nonterminal(name: impl Into<CompactString>) -> Self {
        Self::Nonterminal(name.into())
    }

    #[must_use]
    pub fn magic(name: impl Into<CompactString>) -> Self {
        Self::MagicTerminal(name.into())
    }

    /// The bare name of the symbol, without quoting.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Terminal(name)
            | Self::Nonterminal(name)
            | Self::MagicTerminal(name)
            | Self::IndentationTerminal(name) => name,
            Self::Epsilon => "<eps>",
            Self::Finish => "eos",
            Self::Any(AnyMode::Multiline) => "ANY",
            Self::Any(AnyMode::SingleLine) => "ANYNCR",
        }
    }

    /// Anything that can appear as a leaf of the parse tree.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Nonterminal(_))
    }

    #[must_use]
    pub const fn is_nonterminal(&self) -> bool {
        matches!(self, Self::Nonterminal(_))
    }

    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(self, Self::Epsilon)
    }

    /// The symbol under which the syntax table is consulted for this symbol.
    ///
    /// Indentation tokens are declared as plain terminals in grammars.
    #[must_use]
    pub fn lookup_key(&self) -> Self {
        match self {
            Self::IndentationTerminal(name) => Self::Terminal(name.clone()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(name) | Self::IndentationTerminal(name) => write!(f, "\"{name}\""),
            Self::MagicTerminal(name) => write!(f, "<{name}>"),
            Self::Finish => f.write_str("$"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_part_of_identity() {
        assert_ne!(Symbol::terminal("E"), Symbol::nonterminal("E"));
        assert_eq!(Symbol::terminal("E"), Symbol::terminal("E"));
    }

    #[test]
    fn indentation_terminals_look_up_as_terminals() {
        let sym = Symbol::IndentationTerminal("INDENT".into());
        assert!(sym.is_terminal());
        assert_eq!(sym.lookup_key(), Symbol::terminal("INDENT"));
    }

    #[test]
    fn display_uses_grammar_notation() {
        assert_eq!(Symbol::terminal("+").to_string(), "\"+\"");
        assert_eq!(Symbol::nonterminal("E").to_string(), "E");
        assert_eq!(Symbol::magic("sql").to_string(), "<sql>");
        assert_eq!(Symbol::Any(AnyMode::SingleLine).to_string(), "ANYNCR");
    }
}
