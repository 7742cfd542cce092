//! JavaScript front end: lexer, parser, arena tree, scope analysis and printer.
//!
//! The deobfuscation passes operate on the arena [`Ast`] produced by [`parse`] and turn it
//! back into source with [`print`]. Node ids are stable across in-place rewrites, which is
//! what lets passes collect candidates first and mutate afterwards.
//!
//! # Example
//!
//! ```rust
//! use jsdeob::syntax::{parse, print};
//!
//! let ast = parse("var a=1+2")?;
//! assert_eq!(print(&ast), "var a = 1 + 2;\n");
//! # Ok::<(), jsdeob::Error>(())
//! ```

mod arena;
mod lexer;
mod node;
mod parser;
mod printer;
mod scope;
mod visit;

pub use arena::Ast;
pub use lexer::{line_col, tokenize, Token, TokenKind, Tokens};
pub use node::{
    is_identifier_name, is_valid_identifier, AssignOp, BinaryOp, Comment, DeclKind, Function,
    LogicalOp, Node, NodeId, NodeKind, PropertyKind, Span, UnaryOp, UpdateOp, RESERVED_WORDS,
};
pub use parser::parse;
pub use printer::{print, print_node, quote_string, Printer};
pub use scope::{Binding, BindingId, BindingKind, Scope, ScopeId, ScopeTree};
