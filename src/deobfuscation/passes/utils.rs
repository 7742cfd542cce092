//! Shared utilities for deobfuscation passes.
//!
//! Shape queries (function bodies, static member keys, array tables) and removal helpers
//! that keep the tree a well-formed program.

use crate::{
    deobfuscation::{context::PassContext, events::EventKind},
    numeric::extract_number,
    syntax::{Ast, BindingId, NodeId, NodeKind, ScopeTree},
};

/// Returns the top-level statements of a function declaration or expression.
#[must_use]
pub fn function_body(ast: &Ast, function: NodeId) -> Option<&[NodeId]> {
    let func = ast.kind(function).as_function()?;
    match ast.kind(func.body) {
        NodeKind::Block { body } => Some(body),
        _ => None,
    }
}

/// Returns the declared name of a function.
#[must_use]
pub fn function_name(ast: &Ast, function: NodeId) -> Option<&str> {
    let id = ast.kind(function).as_function()?.id?;
    ast.kind(id).as_ident()
}

/// Returns the callee identifier of a call, if the callee is a plain identifier.
#[must_use]
pub fn callee_ident(ast: &Ast, call: NodeId) -> Option<NodeId> {
    match ast.kind(call) {
        NodeKind::Call { callee, .. } if ast.kind(*callee).as_ident().is_some() => Some(*callee),
        _ => None,
    }
}

/// Returns the key of a member property known without evaluation.
///
/// Accepts `.key`, `["key"]` and the bundler's `[["key"]]` wrapping, which coerces the
/// single-element array to its only string.
#[must_use]
pub fn static_member_key(ast: &Ast, property: NodeId, computed: bool) -> Option<&str> {
    if !computed {
        return ast.kind(property).as_ident();
    }
    match ast.kind(property) {
        NodeKind::StringLiteral { value, .. } => Some(value),
        NodeKind::Array { elements } => match elements.as_slice() {
            [Some(only)] => ast.kind(*only).as_string(),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the static property name of a member expression.
#[must_use]
pub fn member_property_name(ast: &Ast, member: NodeId) -> Option<&str> {
    match ast.kind(member) {
        NodeKind::Member {
            property, computed, ..
        } => static_member_key(ast, *property, *computed),
        _ => None,
    }
}

/// Reads a non-negative integer index.
#[must_use]
pub fn index_value(ast: &Ast, id: NodeId) -> Option<usize> {
    let value = extract_number(ast, id)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as usize)
    } else {
        None
    }
}

/// A constant binding initialised with an array literal.
#[derive(Debug, Clone)]
pub struct ArrayTable {
    /// Binding of the array name.
    pub binding: BindingId,
    /// The `name = [..]` declarator.
    pub declarator: NodeId,
    /// Element slots; holes are `None`.
    pub elements: Vec<Option<NodeId>>,
}

/// Resolves `ident` to a never-reassigned binding declared as `name = [...]`.
#[must_use]
pub fn resolve_array(ast: &Ast, scopes: &ScopeTree, ident: NodeId) -> Option<ArrayTable> {
    let binding = scopes.resolve(ident)?;
    if !scopes.is_constant(binding) {
        return None;
    }
    let declarator = scopes.binding(binding).declaration;
    let NodeKind::VariableDeclarator {
        init: Some(init), ..
    } = ast.kind(declarator)
    else {
        return None;
    };
    match ast.kind(*init) {
        NodeKind::Array { elements } => Some(ArrayTable {
            binding,
            declarator,
            elements: elements.clone(),
        }),
        _ => None,
    }
}

/// Returns true if every read reference of `binding` lies inside `container`.
#[must_use]
pub fn references_within(ast: &Ast, scopes: &ScopeTree, binding: BindingId, container: NodeId) -> bool {
    scopes
        .binding(binding)
        .references
        .iter()
        .all(|reference| ast.is_within(*reference, container))
}

/// Removes a declarator, dropping the whole declaration when it was the only one.
///
/// A sole declarator whose declaration is not in a statement list (a `for` head) is kept.
pub fn remove_declarator(ast: &mut Ast, declarator: NodeId) -> bool {
    let Some(declaration) = ast.parent(declarator) else {
        return false;
    };
    let NodeKind::VariableDeclaration { declarations, .. } = ast.kind(declaration) else {
        return false;
    };
    if declarations.len() > 1 {
        return ast.remove(declarator);
    }
    if !ast.in_statement_list(declaration) {
        return false;
    }
    ast.remove(declaration)
}

/// Removes a statement; an `else` branch is dropped rather than emptied.
pub fn remove_statement(ast: &mut Ast, statement: NodeId) -> bool {
    let Some(parent) = ast.parent(statement) else {
        return false;
    };
    if let NodeKind::If { alternate, .. } = ast.kind_mut(parent) {
        if *alternate == Some(statement) {
            *alternate = None;
            return true;
        }
    }
    ast.remove(statement)
}

/// Removes the declaration of a binding: a function declaration or a declarator.
pub fn remove_binding_declaration(ast: &mut Ast, scopes: &ScopeTree, binding: BindingId) -> bool {
    let declaration = scopes.binding(binding).declaration;
    match ast.kind(declaration) {
        NodeKind::FunctionDeclaration(_) => ast.remove(declaration),
        NodeKind::VariableDeclarator { .. } => remove_declarator(ast, declaration),
        _ => false,
    }
}

/// Collects the `name(<index>)` calls of a table decoder.
///
/// References that are not calls with a single constant index are logged and skipped.
pub fn indexed_calls(
    ast: &Ast,
    scopes: &ScopeTree,
    decoder: BindingId,
    ctx: &PassContext<'_>,
) -> Vec<(NodeId, usize)> {
    let binding = scopes.binding(decoder);
    let mut calls = Vec::with_capacity(binding.references.len());
    for reference in &binding.references {
        let call = ast
            .parent(*reference)
            .filter(|call| callee_ident(ast, *call) == Some(*reference));
        let Some(call) = call else {
            ctx.warn(
                ast.span(*reference),
                format!("'{}' referenced outside of a call", binding.name),
            );
            continue;
        };
        let NodeKind::Call { arguments, .. } = ast.kind(call) else {
            continue;
        };
        match arguments.as_slice() {
            [argument] => match index_value(ast, *argument) {
                Some(index) => calls.push((call, index)),
                None => ctx.warn(
                    ast.span(call),
                    format!("'{}' called with a non-constant index", binding.name),
                ),
            },
            _ => ctx.warn(
                ast.span(call),
                format!("'{}' called with {} arguments", binding.name, arguments.len()),
            ),
        }
    }
    calls
}

/// Removes a table decoder function once nothing references it, then its table if every
/// table reference lay inside the decoder.
///
/// `table_local` must be computed before the decoder calls were rewritten. Returns the
/// number of removed declarations.
pub fn remove_table_decoder(
    ast: &mut Ast,
    ctx: &PassContext<'_>,
    function: NodeId,
    table: &ArrayTable,
    table_local: bool,
) -> usize {
    let Some(name) = ast.kind(function).as_function().and_then(|func| func.id) else {
        return 0;
    };
    let scopes = ScopeTree::build(ast);
    let Some(binding) = scopes.resolve(name) else {
        return 0;
    };
    if !scopes.binding(binding).references.is_empty() || !ast.remove(function) {
        return 0;
    }
    let decoder = scopes.binding(binding).name.clone();
    ctx.rewrite(
        EventKind::ArtifactRemoved,
        ast.span(function),
        format!("removed decoder '{decoder}'"),
    );
    if table_local && remove_declarator(ast, table.declarator) {
        ctx.rewrite(
            EventKind::ArtifactRemoved,
            ast.span(table.declarator),
            format!("removed table of '{decoder}'"),
        );
        return 2;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, print};

    fn first(ast: &Ast, predicate: impl Fn(&NodeKind) -> bool) -> NodeId {
        ast.preorder(ast.root())
            .into_iter()
            .find(|id| predicate(ast.kind(*id)))
            .unwrap()
    }

    #[test]
    fn test_static_member_keys() {
        let ast = parse("a.b; a['c']; a[['d']]; a[e]; a[['x', 'y']];").unwrap();
        let keys: Vec<Option<&str>> = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::Member { .. }))
            .into_iter()
            .map(|member| member_property_name(&ast, member))
            .collect();
        assert_eq!(keys, vec![Some("b"), Some("c"), Some("d"), None, None]);
    }

    #[test]
    fn test_index_value() {
        let ast = parse("[3, -1, 1.5, !0];").unwrap();
        let NodeKind::Array { elements } =
            ast.kind(first(&ast, |kind| matches!(kind, NodeKind::Array { .. })))
        else {
            unreachable!()
        };
        let values: Vec<Option<usize>> = elements
            .iter()
            .map(|element| index_value(&ast, element.unwrap()))
            .collect();
        assert_eq!(values, vec![Some(3), None, None, Some(1)]);
    }

    #[test]
    fn test_resolve_array() {
        let ast = parse("var t = ['a', 'b']; t[0]; var u = ['c']; u = 1; u[0];").unwrap();
        let scopes = ScopeTree::build(&ast);
        let reads: Vec<NodeId> = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::Member { .. }))
            .into_iter()
            .map(|member| match ast.kind(member) {
                NodeKind::Member { object, .. } => *object,
                _ => unreachable!(),
            })
            .collect();
        let table = resolve_array(&ast, &scopes, reads[0]).unwrap();
        assert_eq!(table.elements.len(), 2);
        assert!(resolve_array(&ast, &scopes, reads[1]).is_none());
    }

    #[test]
    fn test_remove_declarator() {
        let mut ast = parse("var a = 1, b = 2; var c = 3; for (var i = 0;;) {}").unwrap();
        let declarators = ast.find_all(ast.root(), |kind| {
            matches!(kind, NodeKind::VariableDeclarator { .. })
        });
        assert!(remove_declarator(&mut ast, declarators[0]));
        assert!(remove_declarator(&mut ast, declarators[2]));
        assert!(!remove_declarator(&mut ast, declarators[3]));
        assert_eq!(print(&ast), "var b = 2;\nfor (var i = 0;;) {}\n");
    }

    #[test]
    fn test_remove_else_branch() {
        let mut ast = parse("if (a) b(); else c();").unwrap();
        let NodeKind::If {
            alternate: Some(alternate),
            ..
        } = ast.kind(first(&ast, |kind| matches!(kind, NodeKind::If { .. }))).clone()
        else {
            unreachable!()
        };
        assert!(remove_statement(&mut ast, alternate));
        assert_eq!(print(&ast), "if (a) b();\n");
    }
}
