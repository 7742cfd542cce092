//! Lexical scope analysis.
//!
//! A [`ScopeTree`] is a snapshot: it is built from the current tree and must be rebuilt after
//! rewrites that add, remove or rename bindings. Construction runs in two phases. The first
//! declares every binding (hoisting `var` and function declarations to the enclosing function
//! scope), the second resolves each identifier use against the scope chain and classifies it
//! as a read or a write.

use rustc_hash::FxHashMap;

use crate::syntax::{
    node::{DeclKind, Function, NodeId, NodeKind},
    Ast,
};

/// Index of a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

/// Index of a binding in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u32);

/// How a binding was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var` declarator.
    Var,
    /// `let` declarator.
    Let,
    /// `const` declarator.
    Const,
    /// Function declaration or the name of a named function expression.
    Function,
    /// Function parameter.
    Param,
    /// Catch clause parameter.
    CatchParam,
}

impl From<DeclKind> for BindingKind {
    fn from(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Var => BindingKind::Var,
            DeclKind::Let => BindingKind::Let,
            DeclKind::Const => BindingKind::Const,
        }
    }
}

/// A lexical scope.
#[derive(Debug)]
pub struct Scope {
    /// Enclosing scope, `None` for the program scope.
    pub parent: Option<ScopeId>,
    /// Node that opened the scope.
    pub node: NodeId,
    /// True for program and function scopes.
    pub is_function: bool,
    bindings: FxHashMap<String, BindingId>,
}

/// A declared name and everything that touches it.
#[derive(Debug)]
pub struct Binding {
    /// Declared name.
    pub name: String,
    /// Declaration form.
    pub kind: BindingKind,
    /// Scope holding the binding.
    pub scope: ScopeId,
    /// Identifier node at the first declaration site.
    pub identifier: NodeId,
    /// First declaring node: declarator, function or parameter identifier.
    pub declaration: NodeId,
    /// Identifier nodes that read the binding.
    pub references: Vec<NodeId>,
    /// Nodes that write the binding: assignments, updates, initializing declarators,
    /// function declarations, parameters and `for-in` heads.
    pub writes: Vec<NodeId>,
}

/// Scope and binding information for one tree snapshot.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    resolved: FxHashMap<NodeId, BindingId>,
    ident_scope: FxHashMap<NodeId, ScopeId>,
    node_scope: FxHashMap<NodeId, ScopeId>,
}

impl ScopeTree {
    /// Analyzes the live tree.
    #[must_use]
    pub fn build(ast: &Ast) -> Self {
        let mut tree = ScopeTree::default();
        let root = ast.root();
        let program = tree.new_scope(None, root, true);
        tree.declare(ast, root, program);
        tree.resolve_node(ast, root, program);
        tree
    }

    /// Returns the binding for `id`.
    #[must_use]
    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    /// Returns the scope for `id`.
    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Iterates over all bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| (BindingId(index as u32), binding))
    }

    /// Returns the binding an identifier node refers to, if it is not a global.
    #[must_use]
    pub fn resolve(&self, ident: NodeId) -> Option<BindingId> {
        self.resolved.get(&ident).copied()
    }

    /// Resolves `name` starting at `scope` and walking outwards.
    #[must_use]
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(binding) = scope.bindings.get(name) {
                return Some(*binding);
            }
            current = scope.parent;
        }
        None
    }

    /// Returns the scope an identifier node was resolved in.
    #[must_use]
    pub fn scope_of_ident(&self, ident: NodeId) -> Option<ScopeId> {
        self.ident_scope.get(&ident).copied()
    }

    /// Returns the scope opened by `node`, if it opens one.
    #[must_use]
    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scope.get(&node).copied()
    }

    /// Returns true if the only write to the binding is its declaration.
    #[must_use]
    pub fn is_constant(&self, id: BindingId) -> bool {
        let binding = self.binding(id);
        binding.writes.iter().all(|write| *write == binding.declaration)
    }

    fn new_scope(&mut self, parent: Option<ScopeId>, node: NodeId, is_function: bool) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            node,
            is_function,
            bindings: FxHashMap::default(),
        });
        self.node_scope.insert(node, id);
        id
    }

    fn function_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let data = self.scope(current);
            match data.parent {
                Some(parent) if !data.is_function => current = parent,
                _ => return current,
            }
        }
    }

    fn declare_binding(
        &mut self,
        ast: &Ast,
        scope: ScopeId,
        ident: NodeId,
        kind: BindingKind,
        declaration: NodeId,
    ) {
        let Some(name) = ast.kind(ident).as_ident() else {
            return;
        };
        let existing = self.scopes[scope.0 as usize].bindings.get(name).copied();
        let binding = match existing {
            Some(binding) => binding,
            None => {
                let binding = BindingId(self.bindings.len() as u32);
                self.bindings.push(Binding {
                    name: name.to_string(),
                    kind,
                    scope,
                    identifier: ident,
                    declaration,
                    references: Vec::new(),
                    writes: Vec::new(),
                });
                self.scopes[scope.0 as usize]
                    .bindings
                    .insert(name.to_string(), binding);
                binding
            }
        };
        self.resolved.insert(ident, binding);
        self.ident_scope.insert(ident, scope);
    }

    fn declare_function(&mut self, ast: &Ast, id: NodeId, func: &Function, outer: ScopeId) {
        let inner = self.new_scope(Some(outer), id, true);
        if matches!(ast.kind(id), NodeKind::FunctionExpression(_)) {
            if let Some(name) = func.id {
                self.declare_binding(ast, inner, name, BindingKind::Function, id);
            }
        }
        for param in &func.params {
            self.declare_binding(ast, inner, *param, BindingKind::Param, *param);
        }
        self.node_scope.insert(func.body, inner);
        if let NodeKind::Block { body } = ast.kind(func.body) {
            for stmt in body {
                self.declare(ast, *stmt, inner);
            }
        }
    }

    fn declare(&mut self, ast: &Ast, id: NodeId, scope: ScopeId) {
        match ast.kind(id) {
            NodeKind::FunctionDeclaration(func) => {
                if let Some(name) = func.id {
                    let target = self.function_scope(scope);
                    self.declare_binding(ast, target, name, BindingKind::Function, id);
                }
                self.declare_function(ast, id, func, scope);
            }
            NodeKind::FunctionExpression(func) => self.declare_function(ast, id, func, scope),
            NodeKind::VariableDeclaration { kind, declarations } => {
                let target = if *kind == DeclKind::Var {
                    self.function_scope(scope)
                } else {
                    scope
                };
                for declarator in declarations {
                    if let NodeKind::VariableDeclarator { id: name, init } = ast.kind(*declarator) {
                        self.declare_binding(ast, target, *name, (*kind).into(), *declarator);
                        if let Some(init) = init {
                            self.declare(ast, *init, scope);
                        }
                    }
                }
            }
            NodeKind::CatchClause { param, body } => {
                let inner = self.new_scope(Some(scope), id, false);
                if let Some(param) = param {
                    self.declare_binding(ast, inner, *param, BindingKind::CatchParam, *param);
                }
                self.declare(ast, *body, inner);
            }
            NodeKind::Block { .. }
            | NodeKind::For { .. }
            | NodeKind::ForIn { .. }
            | NodeKind::Switch { .. } => {
                let inner = self.new_scope(Some(scope), id, false);
                for child in ast.kind(id).children() {
                    self.declare(ast, child, inner);
                }
            }
            kind => {
                for child in kind.children() {
                    self.declare(ast, child, scope);
                }
            }
        }
    }

    fn record_write(&mut self, ident: NodeId, write: NodeId) {
        if let Some(binding) = self.resolved.get(&ident) {
            self.bindings[binding.0 as usize].writes.push(write);
        }
    }

    /// Resolves an identifier use in `scope` without classifying it.
    fn bind_use(&mut self, ast: &Ast, ident: NodeId, scope: ScopeId) -> bool {
        let Some(name) = ast.kind(ident).as_ident() else {
            return false;
        };
        self.ident_scope.insert(ident, scope);
        match self.lookup(scope, name) {
            Some(binding) => {
                self.resolved.insert(ident, binding);
                true
            }
            None => false,
        }
    }

    fn resolve_write_target(&mut self, ast: &Ast, target: NodeId, write: NodeId, scope: ScopeId) {
        if matches!(ast.kind(target), NodeKind::Identifier { .. }) {
            if self.bind_use(ast, target, scope) {
                self.record_write(target, write);
            }
        } else {
            self.resolve_node(ast, target, scope);
        }
    }

    fn resolve_node(&mut self, ast: &Ast, id: NodeId, scope: ScopeId) {
        let scope = self.node_scope.get(&id).copied().unwrap_or(scope);
        match ast.kind(id) {
            NodeKind::Identifier { .. } => {
                if self.bind_use(ast, id, scope) {
                    if let Some(binding) = self.resolved.get(&id) {
                        self.bindings[binding.0 as usize].references.push(id);
                    }
                }
            }
            NodeKind::VariableDeclarator { id: name, init } => {
                if let Some(init) = init {
                    self.record_write(*name, id);
                    self.resolve_node(ast, *init, scope);
                }
            }
            NodeKind::FunctionDeclaration(func) | NodeKind::FunctionExpression(func) => {
                if let Some(name) = func.id {
                    self.record_write(name, id);
                }
                for param in &func.params {
                    self.record_write(*param, *param);
                }
                self.resolve_node(ast, func.body, scope);
            }
            NodeKind::CatchClause { param, body } => {
                if let Some(param) = param {
                    self.record_write(*param, *param);
                }
                self.resolve_node(ast, *body, scope);
            }
            NodeKind::Assignment { target, value, .. } => {
                self.resolve_write_target(ast, *target, id, scope);
                self.resolve_node(ast, *value, scope);
            }
            NodeKind::Update { argument, .. } => {
                self.resolve_write_target(ast, *argument, id, scope);
            }
            NodeKind::ForIn { left, right, body } => {
                match ast.kind(*left) {
                    NodeKind::VariableDeclaration { declarations, .. } => {
                        for declarator in declarations {
                            if let NodeKind::VariableDeclarator { id: name, .. } =
                                ast.kind(*declarator)
                            {
                                self.record_write(*name, id);
                            }
                        }
                        self.resolve_node(ast, *left, scope);
                    }
                    _ => self.resolve_write_target(ast, *left, id, scope),
                }
                self.resolve_node(ast, *right, scope);
                self.resolve_node(ast, *body, scope);
            }
            NodeKind::Member {
                object,
                property,
                computed,
            } => {
                self.resolve_node(ast, *object, scope);
                if *computed {
                    self.resolve_node(ast, *property, scope);
                }
            }
            NodeKind::Property {
                key,
                value,
                computed,
                ..
            } => {
                if *computed {
                    self.resolve_node(ast, *key, scope);
                }
                self.resolve_node(ast, *value, scope);
            }
            kind => {
                for child in kind.children() {
                    self.resolve_node(ast, child, scope);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn binding_named<'a>(tree: &'a ScopeTree, name: &str) -> Vec<(BindingId, &'a Binding)> {
        tree.bindings().filter(|(_, b)| b.name == name).collect()
    }

    #[test]
    fn constant_and_reassigned_bindings() {
        let ast = parse("var a = 1; var b = 2; b = 3; f(a, b);").unwrap();
        let tree = ScopeTree::build(&ast);
        let (a, a_binding) = binding_named(&tree, "a")[0];
        let (b, b_binding) = binding_named(&tree, "b")[0];
        assert!(tree.is_constant(a));
        assert!(!tree.is_constant(b));
        assert_eq!(a_binding.references.len(), 1);
        assert_eq!(b_binding.writes.len(), 2);
        assert!(binding_named(&tree, "f").is_empty());
    }

    #[test]
    fn shadowing_and_hoisting() {
        let source = "var x = 1; function g(x) { return x; } function h() { y = x; var y; }";
        let ast = parse(source).unwrap();
        let tree = ScopeTree::build(&ast);
        let xs = binding_named(&tree, "x");
        assert_eq!(xs.len(), 2);
        let outer = xs.iter().find(|(_, b)| b.kind == BindingKind::Var).unwrap();
        let param = xs.iter().find(|(_, b)| b.kind == BindingKind::Param).unwrap();
        assert_eq!(param.1.references.len(), 1);
        assert_eq!(outer.1.references.len(), 1);

        let (y, y_binding) = binding_named(&tree, "y")[0];
        assert_eq!(y_binding.writes.len(), 1);
        assert!(!tree.is_constant(y));
    }

    #[test]
    fn compound_updates_are_writes_only() {
        let ast = parse("var i = 0; i += 1; i++; g(i);").unwrap();
        let tree = ScopeTree::build(&ast);
        let (_, binding) = binding_named(&tree, "i")[0];
        assert_eq!(binding.writes.len(), 3);
        assert_eq!(binding.references.len(), 1);
    }

    #[test]
    fn block_scoped_let() {
        let ast = parse("let a = 1; { let a = 2; f(a); } g(a);").unwrap();
        let tree = ScopeTree::build(&ast);
        let all = binding_named(&tree, "a");
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|(_, b)| b.references.len() == 1));
    }

    #[test]
    fn member_properties_are_not_references() {
        let ast = parse("var p = 1; o.p = o[p];").unwrap();
        let tree = ScopeTree::build(&ast);
        let (_, binding) = binding_named(&tree, "p")[0];
        assert_eq!(binding.references.len(), 1);
    }
}
