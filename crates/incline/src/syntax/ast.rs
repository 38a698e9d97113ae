//! # Abstract Syntax
//!
//! Values built from production annotations. When the parser reduces a
//! production that carries an [`Annotation`], the annotation is evaluated
//! against the new node and the result is stored as the node's
//! [alternate](crate::arena::Node::alternate).
//!
//! A value is a parse tree node, an [`AstNode`] or a [`ListNode`]. Nodes and
//! lists are shared, so copying a child's alternate into a parent is cheap.
//! Lookups that find nothing (an index past the last child, a missing
//! attribute, `+` on something that is not a list) yield no value; a field
//! without a value is kept as `None`, a list element without one is dropped.

use crate::arena::{NodeId, TreeArena};
use crate::grammar::annotation::{Annotation, AstNodeExpr, Expr, FieldValue, ListElement, Lookup};
use crate::grammar::Symbol;
use crate::grammar::source::WS;
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;

/// Name of a list built from an empty `[]`.
pub const EMPTY_LIST: &str = "[ ]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstValue {
    Node(NodeId),
    Ast(Arc<AstNode>),
    List(Arc<ListNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub name: CompactString,
    pub fields: Vec<(CompactString, Option<AstValue>)>,
}

impl AstNode {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&AstValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNode {
    /// The symbol of the node that built the list.
    pub name: CompactString,
    pub items: Vec<AstValue>,
}

impl AstValue {
    #[must_use]
    pub fn as_ast(&self) -> Option<&AstNode> {
        match self {
            Self::Ast(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Display adapter that prints tree nodes by their text.
    #[must_use]
    pub const fn display<'a>(&'a self, arena: &'a TreeArena) -> Rendered<'a> {
        Rendered { value: self, arena }
    }
}

pub struct Rendered<'a> {
    value: &'a AstValue,
    arena: &'a TreeArena,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena;
        match self.value {
            AstValue::Node(id) => write!(f, "{:?}", arena.text(*id)),
            AstValue::Ast(node) => {
                write!(f, "{}(", node.name)?;
                for (i, (name, value)) in node.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match value {
                        Some(value) => write!(f, "{name}={}", value.display(arena))?,
                        None => write!(f, "{name}=_")?,
                    }
                }
                f.write_str(")")
            }
            AstValue::List(list) => {
                f.write_str("[")?;
                for (i, item) in list.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.display(arena))?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Evaluate `annotation` for the freshly reduced `node`.
#[must_use]
pub fn evaluate(annotation: &Annotation, arena: &TreeArena, node: NodeId) -> Option<AstValue> {
    let scope = Scope { arena, node };
    match annotation {
        Annotation::Node(ctor) => Some(scope.construct(ctor, None)),
        Annotation::Expr(expr) => scope.expr(expr),
        Annotation::Foreach { item, node: ctor } => {
            let AstValue::List(list) = scope.lookup(item)? else {
                return None;
            };
            let items = list
                .items
                .iter()
                .map(|element| scope.construct(ctor, Some(element)))
                .collect();
            Some(scope.list(items))
        }
    }
}

struct Scope<'a> {
    arena: &'a TreeArena,
    node: NodeId,
}

impl Scope<'_> {
    fn construct(&self, ctor: &AstNodeExpr, element: Option<&AstValue>) -> AstValue {
        let mut fields = Vec::with_capacity(ctor.fields.len());
        for (name, value) in &ctor.fields {
            match value {
                FieldValue::Expr(expr) => fields.push((name.clone(), self.expr(expr))),
                FieldValue::Reference { field, .. } => {
                    if let Some(value) = element.and_then(AstValue::as_ast).and_then(|ast| ast.get(field)) {
                        fields.push((name.clone(), Some(value.clone())));
                    }
                }
            }
        }
        AstValue::Ast(Arc::new(AstNode {
            name: ctor.name.clone(),
            fields,
        }))
    }

    fn expr(&self, expr: &Expr) -> Option<AstValue> {
        match expr {
            Expr::Lookup(lookup) => self.lookup(lookup),
            Expr::List(elements) => {
                let items = elements
                    .iter()
                    .filter_map(|element| match element {
                        ListElement::Lookup(lookup) => self.lookup(lookup),
                        ListElement::Node(ctor) => Some(self.construct(ctor, None)),
                    })
                    .collect::<Vec<_>>();
                if elements.is_empty() {
                    return Some(AstValue::List(Arc::new(ListNode {
                        name: EMPTY_LIST.into(),
                        items,
                    })));
                }
                Some(self.list(items))
            }
            Expr::Add(a, b) => {
                let (AstValue::List(a), AstValue::List(b)) = (self.expr(a)?, self.expr(b)?) else {
                    return None;
                };
                let mut items = Vec::with_capacity(a.items.len() + b.items.len());
                items.extend(a.items.iter().cloned());
                items.extend(b.items.iter().cloned());
                Some(AstValue::List(Arc::new(ListNode {
                    name: a.name.clone(),
                    items,
                })))
            }
        }
    }

    /// The `index`-th non-whitespace child, or its alternate.
    fn lookup(&self, lookup: &Lookup) -> Option<AstValue> {
        let arena = self.arena;
        let child = arena[self.node]
            .children()
            .iter()
            .copied()
            .filter(|&c| !matches!(arena[c].symbol(), Symbol::Nonterminal(name) if name == WS))
            .nth(lookup.index)?;
        let value = arena[child]
            .alternate()
            .cloned()
            .unwrap_or(AstValue::Node(child));
        match &lookup.attribute {
            None => Some(value),
            Some(attribute) => value.as_ast()?.get(attribute).cloned(),
        }
    }

    fn list(&self, items: Vec<AstValue>) -> AstValue {
        AstValue::List(Arc::new(ListNode {
            name: self.arena[self.node].symbol().name().into(),
            items,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(arena: &mut TreeArena, name: &str, texts: &[&str]) -> NodeId {
        let leaves: Vec<_> = texts
            .iter()
            .map(|t| arena.alloc_terminal(Symbol::terminal(*t), None, *t))
            .collect();
        arena.alloc_node(Symbol::nonterminal(name), leaves)
    }

    fn eval(arena: &TreeArena, node: NodeId, text: &str) -> Option<AstValue> {
        evaluate(&Annotation::parse(text).unwrap(), arena, node)
    }

    #[test]
    fn constructors_read_children_by_index() {
        let mut arena = TreeArena::new();
        let e = tree(&mut arena, "E", &["1", "+", "2"]);
        let value = eval(&arena, e, "Plus(arg1=#0, arg2=#2, arg3=#7)").unwrap();
        let plus = value.as_ast().unwrap();
        assert_eq!(plus.name, "Plus");
        assert_eq!(arena.text(plus.get("arg2").unwrap().as_node().unwrap()), "2");
        assert_eq!(plus.fields[2], ("arg3".into(), None));
        assert_eq!(value.display(&arena).to_string(), "Plus(arg1=\"1\", arg2=\"2\", arg3=_)");
    }

    #[test]
    fn lookups_prefer_the_child_alternate() {
        let mut arena = TreeArena::new();
        let t = tree(&mut arena, "T", &["x"]);
        let var = eval(&arena, t, "Var(x=#0)");
        arena.set_alternate(t, var);
        let e = arena.alloc_node(Symbol::nonterminal("E"), [t]);
        let value = eval(&arena, e, "#0").unwrap();
        assert_eq!(value.as_ast().unwrap().name, "Var");
        let x = eval(&arena, e, "#0.x").unwrap();
        assert_eq!(arena.text(x.as_node().unwrap()), "x");
        assert_eq!(eval(&arena, e, "#0.y"), None);
    }

    #[test]
    fn whitespace_children_are_skipped() {
        let mut arena = TreeArena::new();
        let a = arena.alloc_terminal(Symbol::terminal("a"), None, "a");
        let ws = tree(&mut arena, WS, &[" "]);
        let b = arena.alloc_terminal(Symbol::terminal("b"), None, "b");
        let s = arena.alloc_node(Symbol::nonterminal("S"), [a, ws, b]);
        assert_eq!(eval(&arena, s, "#1"), Some(AstValue::Node(b)));
    }

    #[test]
    fn lists_concatenate_under_the_left_name() {
        let mut arena = TreeArena::new();
        let item = tree(&mut arena, "items", &["a"]);
        let single = eval(&arena, item, "[#0]");
        arena.set_alternate(item, single);
        let comma = arena.alloc_terminal(Symbol::terminal(","), None, ",");
        let b = arena.alloc_terminal(Symbol::terminal("b"), None, "b");
        let items = arena.alloc_node(Symbol::nonterminal("items"), [item, comma, b]);
        let value = eval(&arena, items, "#0 + [#2]").unwrap();
        let list = value.as_list().unwrap();
        assert_eq!(list.name, "items");
        assert_eq!(value.display(&arena).to_string(), "[\"a\", \"b\"]");
        assert_eq!(eval(&arena, items, "[]").unwrap().as_list().unwrap().name, EMPTY_LIST);
        assert_eq!(eval(&arena, items, "#1 + [#2]"), None);
    }

    #[test]
    fn foreach_reads_fields_of_each_element() {
        let mut arena = TreeArena::new();
        let a = tree(&mut arena, "item", &["a"]);
        let b = tree(&mut arena, "item", &["b"]);
        for item in [a, b] {
            let var = eval(&arena, item, "Var(x=#0)");
            arena.set_alternate(item, var);
        }
        let items = arena.alloc_node(Symbol::nonterminal("items"), [a, b]);
        let list = eval(&arena, items, "[#0, #1]");
        arena.set_alternate(items, list);
        let x = arena.alloc_node(Symbol::nonterminal("X"), [items]);
        let value = eval(&arena, x, "foreach(#0) Field(b=item.x, c=item.y)").unwrap();
        assert_eq!(value.as_list().unwrap().name, "X");
        assert_eq!(value.display(&arena).to_string(), "[Field(b=\"a\"), Field(b=\"b\")]");
        assert_eq!(eval(&arena, x, "foreach(#5) Field(b=item.x)"), None);
    }
}
