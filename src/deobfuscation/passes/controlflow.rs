//! Static branch elimination.
//!
//! Folding leaves behind conditionals whose test is a constant. This pass replaces every
//! `if` and `?:` with a statically known test by its taken branch.
//!
//! # Transformed Patterns
//!
//! ```text
//! if (0) { a(); } else { b(); c(); }     →   b(); c();
//! x = (1 ? 0 : 1) ? p : q;               →   x = q;
//! if (2 && 3) d();                       →   d();
//! if (0 || 0) e();                       →   (removed)
//! ```
//!
//! A test is resolved through nested ternaries, `==` between numbers, `&&`/`||` between
//! numbers and bare numbers. Anything else, including tests with side effects, leaves the
//! conditional untouched. A taken block is spliced into the enclosing statement list
//! unless it declares `let`, `const` or function bindings of its own.

use crate::{
    deobfuscation::{
        context::PassContext, events::EventKind, pass::Pass, passes::utils::remove_statement,
    },
    numeric::{extract_value, loose_eq, Primitive},
    syntax::{Ast, BinaryOp, DeclKind, LogicalOp, NodeId, NodeKind},
    Result,
};

/// Replaces conditionals with a constant test by their taken branch.
pub struct StaticBranchPass;

impl Default for StaticBranchPass {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticBranchPass {
    /// Creates a new static branch pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Statically evaluates `id` if it is built from numbers only.
    fn resolve(ast: &Ast, id: NodeId) -> Option<Primitive> {
        if let Some(value) = extract_value(ast, id) {
            return Some(value);
        }
        match ast.kind(id) {
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let taken = if Self::resolve(ast, *test)?.truthy() {
                    *consequent
                } else {
                    *alternate
                };
                Self::resolve(ast, taken)
            }
            NodeKind::Binary {
                operator: BinaryOp::Eq,
                left,
                right,
            } => {
                let left = Self::resolve(ast, *left)?;
                let right = Self::resolve(ast, *right)?;
                Some(Primitive::Bool(loose_eq(left, right)))
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let left = Self::resolve(ast, *left)?;
                let right = Self::resolve(ast, *right)?;
                match operator {
                    LogicalOp::And => Some(if left.truthy() { right } else { left }),
                    LogicalOp::Or => Some(if left.truthy() { left } else { right }),
                    LogicalOp::Nullish => None,
                }
            }
            _ => None,
        }
    }

    /// Returns true if splicing `block` would leak block-scoped declarations.
    fn has_lexical_declarations(ast: &Ast, block: NodeId) -> bool {
        let NodeKind::Block { body } = ast.kind(block) else {
            return false;
        };
        body.iter().any(|stmt| {
            matches!(
                ast.kind(*stmt),
                NodeKind::FunctionDeclaration(_)
                    | NodeKind::VariableDeclaration {
                        kind: DeclKind::Let | DeclKind::Const,
                        ..
                    }
            )
        })
    }

    /// Replaces the statement `stmt` with its taken branch, or removes it.
    fn take_branch(ast: &mut Ast, stmt: NodeId, taken: Option<NodeId>) {
        let Some(branch) = taken else {
            remove_statement(ast, stmt);
            return;
        };
        match ast.kind(branch) {
            NodeKind::Block { body }
                if ast.in_statement_list(stmt) && !Self::has_lexical_declarations(ast, branch) =>
            {
                let body = body.clone();
                ast.replace_with_many(stmt, body);
            }
            _ => ast.replace_with(stmt, branch),
        }
    }
}

impl Pass for StaticBranchPass {
    fn name(&self) -> &'static str {
        "static-branches"
    }

    fn description(&self) -> &'static str {
        "Replaces if statements and ternaries with constant tests by the taken branch"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let mut changed = 0;
        for id in ast.postorder(ast.root()) {
            match ast.kind(id) {
                NodeKind::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    let Some(value) = Self::resolve(ast, *test) else {
                        continue;
                    };
                    let taken = if value.truthy() {
                        Some(*consequent)
                    } else {
                        *alternate
                    };
                    ctx.rewrite(
                        EventKind::BranchSimplified,
                        ast.span(id),
                        format!("if test is always {}", value.truthy()),
                    );
                    Self::take_branch(ast, id, taken);
                }
                NodeKind::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    let Some(value) = Self::resolve(ast, *test) else {
                        continue;
                    };
                    let taken = if value.truthy() {
                        *consequent
                    } else {
                        *alternate
                    };
                    ctx.rewrite(
                        EventKind::BranchSimplified,
                        ast.span(id),
                        format!("ternary test is always {}", value.truthy()),
                    );
                    ast.replace_with(id, taken);
                }
                _ => continue,
            }
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::run_pass;

    #[test]
    fn test_ternaries_take_constant_branch() {
        let source = "x = 1 ? a : b; y = -0 ? a : b; z = 1 == !0 ? c : d;";
        let run = run_pass(&StaticBranchPass::new(), source);
        assert_eq!(run.output, "x = a;\ny = b;\nz = c;\n");
        assert_eq!(run.rewrites, 3);
    }

    #[test]
    fn test_if_statements() {
        let source = "if (0) { a(); } else { b(); c(); } if (2 && 3) d(); if (0 || 0) e(); f();";
        let run = run_pass(&StaticBranchPass::new(), source);
        assert_eq!(run.output, "b();\nc();\nd();\nf();\n");
        assert_eq!(run.events.count_kind(EventKind::BranchSimplified), 3);
    }

    #[test]
    fn test_nested_ternary_tests() {
        let run = run_pass(&StaticBranchPass::new(), "if ((1 ? 0 : 1) ? a : 1) g();");
        assert_eq!(run.output, "g();\n");
    }

    #[test]
    fn test_spliced_into_enclosing_block() {
        let run = run_pass(&StaticBranchPass::new(), "if (x) { if (1) { a(); b(); } }");
        assert_eq!(run.output, "if (x) {\n  a();\n  b();\n}\n");
    }

    #[test]
    fn test_lexical_block_is_kept_whole() {
        let run = run_pass(&StaticBranchPass::new(), "if (1) { let a = 1; f(a); }");
        assert_eq!(run.output, "{\n  let a = 1;\n  f(a);\n}\n");
    }

    #[test]
    fn test_unresolvable_tests_untouched() {
        let source = "if (x) a(); y = x ? 1 : 2; if (f() == 1) b(); z = (g(), 1) ? 1 : 2;";
        let run = run_pass(&StaticBranchPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }
}
