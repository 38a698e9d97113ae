use compact_str::CompactString;
use std::ops::Range;

/// A token produced by the lexer.
///
/// `lookup` is the name of the lexer rule that matched, used by the parser
/// as the terminal to look up. Tokens matched by a grammar literal have no
/// class; the parser looks up their text instead.
///
/// # Example
///
/// ```rust
/// use incline::lexer::Token;
///
/// let token = Token::new(Some("INT"), "42", 0..2);
/// assert_eq!(token.lookup.as_deref(), Some("INT"));
/// assert!(!token.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// Lexer rule that produced the token, if any.
    pub lookup: Option<CompactString>,
    /// The source text that this token represents
    pub text: CompactString,
    /// The byte range in the source text where this token appears
    pub range: Range<usize>,
    error: bool,
    indentation: bool,
}

impl Token {
    #[must_use]
    pub fn new(lookup: Option<&str>, text: impl Into<CompactString>, range: Range<usize>) -> Self {
        Self {
            lookup: lookup.map(CompactString::from),
            text: text.into(),
            range,
            error: false,
            indentation: false,
        }
    }

    /// Layout token `name` generated at byte offset `at`. It has no text;
    /// the parser looks it up as the terminal `name`.
    #[must_use]
    pub fn indentation(name: &str, at: usize) -> Self {
        Self {
            lookup: Some(CompactString::from(name)),
            text: CompactString::default(),
            range: at..at,
            error: false,
            indentation: true,
        }
    }

    /// Text no rule matched.
    #[must_use]
    pub fn error(text: impl Into<CompactString>, range: Range<usize>) -> Self {
        Self {
            lookup: None,
            text: text.into(),
            range,
            error: true,
            indentation: false,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error
    }

    #[must_use]
    pub const fn is_indentation(&self) -> bool {
        self.indentation
    }

    /// Whether the token spans a line break.
    #[must_use]
    pub fn has_newline(&self) -> bool {
        self.text.contains('\n')
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
