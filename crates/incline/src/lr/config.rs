use compact_str::CompactString;

/// Which automaton construction to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LrMode {
    /// LR(0) items; reduces are installed on every terminal.
    Lr0,
    /// LR(1) items with Pager weak-compatibility merging.
    #[default]
    Lr1,
    /// LR(1) construction followed by merging all states with equal cores.
    Lalr,
}

impl std::str::FromStr for LrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lr0" => Ok(Self::Lr0),
            "lr1" | "pager" => Ok(Self::Lr1),
            "lalr" | "lalr1" => Ok(Self::Lalr),
            _ => Err(format!("Unknown LR mode: {s}. Supported: lr0, lr1, lalr")),
        }
    }
}

impl std::fmt::Display for LrMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lr0 => "lr0",
            Self::Lr1 => "lr1",
            Self::Lalr => "lalr",
        })
    }
}

/// Configuration for the incremental parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Automaton construction used when the parser builds its own table.
    pub mode: LrMode,

    /// Terminals shifted through without a state change when the table has
    /// no action for them (comments and similar trivia).
    pub pass_through: Vec<CompactString>,

    /// Retry as a full reparse when an attempt is rejected after a failed
    /// validation had to break reused subtrees down.
    pub exact_errors: bool,

    /// Break down every nonterminal instead of shifting unchanged subtrees.
    pub reparse: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mode: LrMode::Lr1,
            pass_through: Vec::new(),
            exact_errors: true,
            reparse: false,
        }
    }
}

impl ParserConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: LrMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_pass_through<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.pass_through.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn with_exact_errors(mut self, exact: bool) -> Self {
        self.exact_errors = exact;
        self
    }
}
