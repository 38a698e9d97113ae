//! # Production Annotations
//!
//! A production may carry an annotation in braces that describes the
//! abstract syntax node built when the production is reduced:
//!
//! ```text
//! E ::= E "plus" T   {Plus(arg1=#0, arg2=#2)}
//!     | T            {#0}
//! items ::= items "comma" item   {#0 + [#2]}
//!         | item                 {[#0]}
//! X ::= items   {foreach(#0) Field(b=item.x)}
//! ```
//!
//! - `#N` is the N-th child of the reduced node, not counting `WS` children,
//!   or that child's own abstract node when it has one.
//! - `#N.attr` is a field of that abstract node.
//! - `Name(field=expr, ...)` builds an abstract node.
//! - `[a, b]` builds a list and `a + b` concatenates two lists.
//! - `foreach(#N) Name(...)` maps a node constructor over the list `#N`;
//!   inside it `item.field` reads a field of the current element.
//!
//! Annotations are parsed when the grammar is built and evaluated by the
//! parser at every reduction (see [`crate::syntax::ast`]).

use compact_str::CompactString;
use std::fmt;

/// A parsed annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    Node(AstNodeExpr),
    Expr(Expr),
    Foreach {
        item: Lookup,
        node: AstNodeExpr,
    },
}

/// `Name(field=value, ...)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AstNodeExpr {
    pub name: CompactString,
    pub fields: Vec<(CompactString, FieldValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Expr(Expr),
    /// `base.field`: a field of the element a `foreach` is visiting.
    Reference { base: CompactString, field: CompactString },
}

/// `#index` or `#index.attribute`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lookup {
    pub index: usize,
    pub attribute: Option<CompactString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Lookup(Lookup),
    List(Vec<ListElement>),
    Add(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListElement {
    Lookup(Lookup),
    Node(AstNodeExpr),
}

impl Annotation {
    /// Parse annotation text, without the enclosing braces.
    ///
    /// # Errors
    ///
    /// Returns a message naming what was expected and where.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut cursor = Cursor { text, pos: 0 };
        let annotation = cursor.annotation()?;
        cursor.skip_ws();
        if cursor.pos < text.len() {
            return Err(cursor.unexpected("end of annotation"));
        }
        Ok(annotation)
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn skip_ws(&mut self) {
        let text = self.text;
        let rest = &text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        let text = self.text;
        text[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.unexpected(match c {
                '(' => "`(`",
                ')' => "`)`",
                ']' => "`]`",
                '=' => "`=`",
                '.' => "`.`",
                _ => "punctuation",
            }))
        }
    }

    fn unexpected(&mut self, expected: &str) -> String {
        match self.peek() {
            Some(c) => format!("expected {expected} at offset {}, found `{c}`", self.pos),
            None => format!("expected {expected}, found end of annotation"),
        }
    }

    fn name(&mut self) -> Result<CompactString, String> {
        self.skip_ws();
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.unexpected("a name"));
        }
        self.pos += len;
        Ok(rest[..len].into())
    }

    fn lookahead_name(&mut self) -> Option<&str> {
        self.skip_ws();
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        (len > 0).then(|| &rest[..len])
    }

    fn annotation(&mut self) -> Result<Annotation, String> {
        match self.peek() {
            Some('#' | '[') => Ok(Annotation::Expr(self.expr()?)),
            _ if self.lookahead_name() == Some("foreach") => {
                self.name()?;
                self.expect('(')?;
                let item = self.lookup()?;
                self.expect(')')?;
                let node = self.ast_node()?;
                Ok(Annotation::Foreach { item, node })
            }
            _ => Ok(Annotation::Node(self.ast_node()?)),
        }
    }

    fn ast_node(&mut self) -> Result<AstNodeExpr, String> {
        let name = self.name()?;
        self.expect('(')?;
        let mut fields = Vec::new();
        loop {
            let field = self.name()?;
            self.expect('=')?;
            let value = if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
                let base = self.name()?;
                self.expect('.')?;
                FieldValue::Reference {
                    base,
                    field: self.name()?,
                }
            } else {
                FieldValue::Expr(self.expr()?)
            };
            fields.push((field, value));
            if !self.eat(',') {
                break;
            }
        }
        self.expect(')')?;
        Ok(AstNodeExpr { name, fields })
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.term()?;
        while self.eat('+') {
            expr = Expr::Add(Box::new(expr), Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some('#') => Ok(Expr::Lookup(self.lookup()?)),
            Some('[') => {
                self.pos += 1;
                let mut elements = Vec::new();
                if !self.eat(']') {
                    loop {
                        let element = if self.peek() == Some('#') {
                            ListElement::Lookup(self.lookup()?)
                        } else {
                            ListElement::Node(self.ast_node()?)
                        };
                        elements.push(element);
                        if !self.eat(',') {
                            break;
                        }
                    }
                    self.expect(']')?;
                }
                Ok(Expr::List(elements))
            }
            _ => Err(self.unexpected("`#N` or a list")),
        }
    }

    fn lookup(&mut self) -> Result<Lookup, String> {
        if !self.eat('#') {
            return Err(self.unexpected("`#N`"));
        }
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let index = rest[..len]
            .parse()
            .map_err(|_| format!("expected a child index after `#` at offset {}", self.pos))?;
        self.pos += len;
        let attribute = if self.eat('.') { Some(self.name()?) } else { None };
        Ok(Lookup { index, attribute })
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => write!(f, "{node}"),
            Self::Expr(expr) => write!(f, "{expr}"),
            Self::Foreach { item, node } => write!(f, "foreach({item}) {node}"),
        }
    }
}

impl fmt::Display for AstNodeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                FieldValue::Expr(expr) => write!(f, "{name}={expr}")?,
                FieldValue::Reference { base, field } => write!(f, "{name}={base}.{field}")?,
            }
        }
        f.write_str(")")
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if let Some(attribute) = &self.attribute {
            write!(f, ".{attribute}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup(lookup) => write!(f, "{lookup}"),
            Self::Add(a, b) => write!(f, "{a} + {b}"),
            Self::List(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match element {
                        ListElement::Lookup(lookup) => write!(f, "{lookup}")?,
                        ListElement::Node(node) => write!(f, "{node}")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(index: usize) -> Lookup {
        Lookup { index, attribute: None }
    }

    #[test]
    fn node_constructors_and_expressions() {
        let a = Annotation::parse("Node2(child=#0, child2=[#1,#3], child3=#3+[#4])").unwrap();
        let Annotation::Node(node) = &a else {
            panic!("{a:?}");
        };
        assert_eq!(node.name, "Node2");
        assert_eq!(node.fields[0], ("child".into(), FieldValue::Expr(Expr::Lookup(lookup(0)))));
        assert_eq!(
            node.fields[1].1,
            FieldValue::Expr(Expr::List(vec![ListElement::Lookup(lookup(1)), ListElement::Lookup(lookup(3))]))
        );
        assert_eq!(
            node.fields[2].1,
            FieldValue::Expr(Expr::Add(
                Box::new(Expr::Lookup(lookup(3))),
                Box::new(Expr::List(vec![ListElement::Lookup(lookup(4))]))
            ))
        );
        assert_eq!(a.to_string(), "Node2(child=#0, child2=[#1, #3], child3=#3 + [#4])");
    }

    #[test]
    fn bare_lookups_and_attributes() {
        assert_eq!(Annotation::parse(" #1 ").unwrap(), Annotation::Expr(Expr::Lookup(lookup(1))));
        let a = Annotation::parse("X(name=#0.x)").unwrap();
        assert_eq!(a.to_string(), "X(name=#0.x)");
        assert_eq!(Annotation::parse("[]").unwrap(), Annotation::Expr(Expr::List(Vec::new())));
    }

    #[test]
    fn foreach_maps_a_constructor() {
        let a = Annotation::parse("foreach(#2) X(name=item.x)").unwrap();
        let Annotation::Foreach { item, node } = a else {
            panic!();
        };
        assert_eq!(item, lookup(2));
        assert_eq!(
            node.fields,
            vec![(
                "name".into(),
                FieldValue::Reference {
                    base: "item".into(),
                    field: "x".into()
                }
            )]
        );
    }

    #[test]
    fn list_elements_may_be_nodes() {
        let a = Annotation::parse("#0 + [Var(x=#2)]").unwrap();
        assert_eq!(a.to_string(), "#0 + [Var(x=#2)]");
    }

    #[test]
    fn malformed_annotations_are_rejected() {
        let err = Annotation::parse("If(child1=#1, child2=[#3, #4]").unwrap_err();
        assert!(err.contains("`)`"), "{err}");
        assert!(Annotation::parse("#x").is_err());
        assert!(Annotation::parse("#0 #1").is_err());
        assert!(Annotation::parse("").is_err());
        assert!(Annotation::parse("Node()").is_err());
    }
}
