//! Tree traversal.
//!
//! Traversals return snapshots of node ids rather than borrowing the tree, so a pass can walk
//! the snapshot and mutate the arena at the same time. Ids that a rewrite detached are
//! filtered with [`Ast::is_live`].

use crate::syntax::{
    node::{NodeId, NodeKind},
    Ast,
};

impl Ast {
    /// Ids of the subtree rooted at `from`, parents before children.
    #[must_use]
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.kind(id).children();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Ids of the subtree rooted at `from`, children before parents.
    #[must_use]
    pub fn postorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(from, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            let children = self.kind(id).children();
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
        out
    }

    /// Pre-order walk that does not enter nested functions (the root itself is entered).
    #[must_use]
    pub fn preorder_shallow(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            if id != from && self.kind(id).is_function() {
                continue;
            }
            let children = self.kind(id).children();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Collects the ids in the subtree of `from` whose kind satisfies `predicate`.
    pub fn find_all(&self, from: NodeId, mut predicate: impl FnMut(&NodeKind) -> bool) -> Vec<NodeId> {
        self.preorder(from)
            .into_iter()
            .filter(|id| predicate(self.kind(*id)))
            .collect()
    }

    /// Ids of all live nodes of the program in pre-order.
    #[must_use]
    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.preorder(self.root())
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::{parse, NodeKind};

    #[test]
    fn orders_are_consistent() {
        let ast = parse("a = b + c;").unwrap();
        let pre = ast.preorder(ast.root());
        let post = ast.postorder(ast.root());
        assert_eq!(pre.len(), post.len());
        assert_eq!(pre[0], ast.root());
        assert_eq!(*post.last().unwrap(), ast.root());

        let names: Vec<_> = pre
            .iter()
            .filter_map(|id| ast.kind(*id).as_ident().map(str::to_string))
            .collect();
        assert_eq!(names, ["a", "b", "c"]);

        let first_binary = post
            .iter()
            .position(|id| matches!(ast.kind(*id), NodeKind::Binary { .. }))
            .unwrap();
        let first_assign = post
            .iter()
            .position(|id| matches!(ast.kind(*id), NodeKind::Assignment { .. }))
            .unwrap();
        assert!(first_binary < first_assign);
    }

    #[test]
    fn shallow_walk_skips_nested_functions() {
        let ast = parse("function f() { var inner = 1; } var outer = 2;").unwrap();
        let idents: Vec<_> = ast
            .preorder_shallow(ast.root())
            .iter()
            .filter_map(|id| ast.kind(*id).as_ident().map(str::to_string))
            .collect();
        assert_eq!(idents, ["outer"]);
    }
}
