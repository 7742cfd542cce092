//! Arena storage for the syntax tree.
//!
//! All nodes live in a flat vector and reference each other through [`NodeId`]s. Rewrites
//! overwrite slots in place, so every holder of an id observes the new node. Detached nodes
//! keep their slot but are no longer reachable from the root; [`Ast::is_live`] distinguishes
//! them, which lets passes iterate over a snapshot of ids while mutating the tree.

use crate::syntax::node::{Comment, Node, NodeId, NodeKind, Span};

/// Arena-backed JavaScript syntax tree.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
    comments: Vec<Comment>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// Creates a tree containing an empty program.
    #[must_use]
    pub fn new() -> Self {
        let mut ast = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            comments: Vec::new(),
        };
        ast.root = ast.alloc(NodeKind::Program { body: Vec::new() }, Span::default());
        ast
    }

    /// Returns the program node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
        self.nodes[root.index()].parent = None;
    }

    /// Number of allocated slots, including detached ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Source comments in order of appearance.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub(crate) fn set_comments(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
    }

    /// Allocates a node and adopts its children.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        self.adopt(id);
        id
    }

    /// Returns the node stored at `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns the kind stored at `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Mutable access to a node's kind.
    ///
    /// Callers that change child ids through this reference must call [`Ast::adopt`].
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    /// Returns the source span of `id`.
    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub(crate) fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.index()].span = span;
    }

    /// Returns the recorded parent of `id`.
    ///
    /// For a detached node this is the parent it was last attached to.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Points the parent link of every child of `id` back to `id`.
    pub fn adopt(&mut self, id: NodeId) {
        let mut children = Vec::new();
        self.nodes[id.index()]
            .kind
            .for_each_child(|child| children.push(child));
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
    }

    /// Overwrites the kind of `id`, keeping its span and position in the tree.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
        self.adopt(id);
    }

    /// Moves the node stored at `source` into the slot of `target`.
    ///
    /// `source` must not be an ancestor of `target`; its old slot is left empty and detached.
    pub fn replace_with(&mut self, target: NodeId, source: NodeId) {
        if target == source {
            return;
        }
        let node = std::mem::replace(
            &mut self.nodes[source.index()],
            Node {
                kind: NodeKind::Empty,
                span: Span::default(),
                parent: None,
            },
        );
        let slot = &mut self.nodes[target.index()];
        slot.kind = node.kind;
        slot.span = node.span;
        self.adopt(target);
    }

    /// Allocates a structural copy of the subtree rooted at `id`.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        let span = self.span(id);
        let mut children = Vec::new();
        kind.for_each_child(|child| children.push(child));
        let mut mapping = Vec::with_capacity(children.len());
        for child in children {
            mapping.push((child, self.deep_clone(child)));
        }
        let cloned = kind.map_children(&mut |child| {
            mapping
                .iter()
                .find(|(old, _)| *old == child)
                .map_or(child, |(_, new)| *new)
        });
        self.alloc(cloned, span)
    }

    /// Returns true if `id` is reachable from the root.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            let Some(parent) = self.parent(current) else {
                return false;
            };
            let mut attached = false;
            self.kind(parent).for_each_child(|child| attached |= child == current);
            if !attached {
                return false;
            }
            current = parent;
        }
    }

    /// Returns true if `node` lies inside the subtree rooted at `ancestor` (inclusive).
    #[must_use]
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Returns the closest ancestor of `id` (exclusive) matching `predicate`.
    pub fn find_ancestor(
        &self,
        id: NodeId,
        mut predicate: impl FnMut(&NodeKind) -> bool,
    ) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(candidate) = current {
            if predicate(self.kind(candidate)) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Returns the statement list that directly contains `id`, if any.
    fn statement_list_mut(&mut self, owner: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.kind_mut(owner) {
            NodeKind::Program { body } | NodeKind::Block { body } => Some(body),
            NodeKind::SwitchCase { consequent, .. } => Some(consequent),
            _ => None,
        }
    }

    /// Returns true if `id` sits directly in a program, block or case body.
    #[must_use]
    pub fn in_statement_list(&self, id: NodeId) -> bool {
        self.parent(id).is_some_and(|parent| {
            matches!(
                self.kind(parent),
                NodeKind::Program { .. } | NodeKind::Block { .. } | NodeKind::SwitchCase { .. }
            )
        })
    }

    /// Replaces the statement `id` with a list of statements.
    ///
    /// Inside a statement list the replacements are spliced in place. In a single-statement
    /// slot (an `if` branch or loop body) the slot becomes a block, a lone statement or an
    /// empty statement. Returns false if `id` is not in statement position.
    pub fn replace_with_many(&mut self, id: NodeId, replacements: Vec<NodeId>) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(list) = self.statement_list_mut(parent) {
            let Some(position) = list.iter().position(|stmt| *stmt == id) else {
                return false;
            };
            list.splice(position..=position, replacements);
            self.adopt(parent);
            return true;
        }
        if !self.kind(id).is_statement() {
            return false;
        }
        match replacements.len() {
            0 => self.replace(id, NodeKind::Empty),
            1 => self.replace_with(id, replacements[0]),
            _ => self.replace(id, NodeKind::Block { body: replacements }),
        }
        true
    }

    /// Detaches `id` from its parent.
    ///
    /// Statements are removed from their list (or replaced by an empty statement in a
    /// single-statement slot); declarators, sequence elements and object properties are
    /// removed from their parent list. Returns false for any other position.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let removed = match self.kind_mut(parent) {
            NodeKind::Program { body } | NodeKind::Block { body } => remove_from(body, id),
            NodeKind::SwitchCase { consequent, .. } => remove_from(consequent, id),
            NodeKind::VariableDeclaration { declarations, .. } => remove_from(declarations, id),
            NodeKind::Sequence { expressions } => remove_from(expressions, id),
            NodeKind::Object { properties } => remove_from(properties, id),
            _ => false,
        };
        if removed {
            return true;
        }
        if self.kind(id).is_statement() && !matches!(self.kind(parent), NodeKind::Labeled { .. })
        {
            self.replace(id, NodeKind::Empty);
            return true;
        }
        false
    }

    /// Convenience constructor for a numeric literal.
    pub fn number(&mut self, value: f64, span: Span) -> NodeId {
        self.alloc(NodeKind::NumericLiteral { value }, span)
    }

    /// Convenience constructor for a canonical string literal.
    pub fn string(&mut self, value: impl Into<String>, span: Span) -> NodeId {
        self.alloc(NodeKind::string(value), span)
    }

    /// Convenience constructor for an identifier.
    pub fn ident(&mut self, name: impl Into<String>, span: Span) -> NodeId {
        self.alloc(NodeKind::ident(name), span)
    }
}

fn remove_from(list: &mut Vec<NodeId>, id: NodeId) -> bool {
    match list.iter().position(|item| *item == id) {
        Some(position) => {
            list.remove(position);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, print};

    #[test]
    fn replace_keeps_identity() {
        let mut ast = parse("var a = 1 + 2;").unwrap();
        let binary = ast
            .preorder(ast.root())
            .into_iter()
            .find(|id| matches!(ast.kind(*id), NodeKind::Binary { .. }))
            .unwrap();
        ast.replace(binary, NodeKind::NumericLiteral { value: 3.0 });
        assert_eq!(print(&ast), "var a = 3;\n");
        assert!(ast.is_live(binary));
    }

    #[test]
    fn splice_and_remove_statements() {
        let mut ast = parse("a(); { b(); c(); } d();").unwrap();
        let block = ast
            .preorder(ast.root())
            .into_iter()
            .find(|id| matches!(ast.kind(*id), NodeKind::Block { .. }))
            .unwrap();
        let NodeKind::Block { body } = ast.kind(block).clone() else {
            unreachable!()
        };
        assert!(ast.replace_with_many(block, body.clone()));
        assert_eq!(print(&ast), "a();\nb();\nc();\nd();\n");
        assert!(ast.remove(body[0]));
        assert!(!ast.is_live(body[0]));
        assert!(!ast.is_live(block));
        assert_eq!(print(&ast), "a();\nc();\nd();\n");
    }

    #[test]
    fn single_statement_slot_becomes_empty() {
        let mut ast = parse("if (x) y();").unwrap();
        let stmt = ast
            .preorder(ast.root())
            .into_iter()
            .find(|id| {
                matches!(ast.kind(*id), NodeKind::ExpressionStatement { .. })
                    && !ast.in_statement_list(*id)
            })
            .unwrap();
        assert!(ast.remove(stmt));
        assert_eq!(print(&ast), "if (x) ;\n");
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut ast = parse("f(a + 1);").unwrap();
        let call = ast
            .preorder(ast.root())
            .into_iter()
            .find(|id| matches!(ast.kind(*id), NodeKind::Call { .. }))
            .unwrap();
        let copy = ast.deep_clone(call);
        assert_ne!(copy, call);
        assert!(!ast.is_live(copy));
        let original = ast.preorder(call).len();
        assert_eq!(ast.preorder(copy).len(), original);
    }
}
