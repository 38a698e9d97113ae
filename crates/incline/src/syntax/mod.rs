pub mod ast;
pub mod document;
pub mod pretty;

pub use ast::{AstNode, AstValue, ListNode};
pub use document::{Document, ROOT};
pub use pretty::{PrettyConfig, render, render_with};
