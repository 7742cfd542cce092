//! `if` statement normalisation.
//!
//! # Transformed Patterns
//!
//! ```text
//! if (a) b(); else {}              →   if (a) b();
//! if (c ? 1 : 0) f();              →   if (c) f();
//! if (x < y ? 0 : 1) g();          →   if (x >= y) g();
//! if (!(c ? 0 : 1)) f();           →   if (c) f();
//! if (a) {} else { b(); }          →   if (!a) { b(); }
//! ```
//!
//! Only the truthiness of an `if` test matters, so `1`/`0` ternaries are collapsed inside
//! it, through `!`, `&&` and `||`. Tests that cannot be inverted (assignments, updates)
//! are left alone.

use crate::{
    deobfuscation::{context::PassContext, events::EventKind, pass::Pass},
    numeric::invert_condition,
    syntax::{print_node, Ast, LogicalOp, NodeId, NodeKind, UnaryOp},
    Result,
};

/// Simplifies the shape of `if` statements.
pub struct IfNormalizationPass;

impl Default for IfNormalizationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl IfNormalizationPass {
    /// Creates a new if normalisation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_literal(ast: &Ast, id: NodeId, expected: f64) -> bool {
        matches!(ast.kind(id), NodeKind::NumericLiteral { value } if *value == expected)
    }

    fn is_empty_block(ast: &Ast, id: NodeId) -> bool {
        matches!(ast.kind(id), NodeKind::Block { body } if body.is_empty())
    }

    /// Collapses `1`/`0` ternaries in a position where only truthiness is observed.
    fn normalize_truthy(ast: &mut Ast, id: NodeId) -> usize {
        match ast.kind(id).clone() {
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } if Self::is_literal(ast, consequent, 1.0) && Self::is_literal(ast, alternate, 0.0) => {
                ast.replace_with(id, test);
                1 + Self::normalize_truthy(ast, id)
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } if Self::is_literal(ast, consequent, 0.0) && Self::is_literal(ast, alternate, 1.0) => {
                match invert_condition(ast, test) {
                    Some(inverted) => {
                        ast.replace_with(id, inverted);
                        1 + Self::normalize_truthy(ast, id)
                    }
                    None => 0,
                }
            }
            NodeKind::Unary {
                operator: UnaryOp::Not,
                argument,
            } => {
                let changed = Self::normalize_truthy(ast, argument);
                // `!!x` observes the truthiness of `x` only.
                if let NodeKind::Unary {
                    operator: UnaryOp::Not,
                    argument: inner,
                } = *ast.kind(argument)
                {
                    ast.replace_with(id, inner);
                    return changed + 1;
                }
                changed
            }
            NodeKind::Logical {
                operator: LogicalOp::And | LogicalOp::Or,
                left,
                right,
            } => Self::normalize_truthy(ast, left) + Self::normalize_truthy(ast, right),
            _ => 0,
        }
    }
}

impl Pass for IfNormalizationPass {
    fn name(&self) -> &'static str {
        "if-normalize"
    }

    fn description(&self) -> &'static str {
        "Drops empty else branches, collapses 1/0 ternaries and flips empty consequents"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let ifs = ast.find_all(ast.root(), |kind| matches!(kind, NodeKind::If { .. }));
        let mut changed = 0;

        for id in ifs {
            if let NodeKind::If {
                alternate: Some(alternate),
                ..
            } = *ast.kind(id)
            {
                if Self::is_empty_block(ast, alternate) {
                    if let NodeKind::If { alternate, .. } = ast.kind_mut(id) {
                        *alternate = None;
                    }
                    ctx.rewrite(EventKind::BranchSimplified, ast.span(id), "dropped empty else");
                    changed += 1;
                }
            }

            let NodeKind::If { test, .. } = *ast.kind(id) else {
                continue;
            };
            let collapsed = Self::normalize_truthy(ast, test);
            if collapsed > 0 {
                ctx.rewrite(
                    EventKind::ExpressionSimplified,
                    ast.span(test),
                    format!("if test -> {}", print_node(ast, test)),
                );
                changed += collapsed;
            }

            let NodeKind::If {
                test,
                consequent,
                alternate: Some(alternate),
            } = *ast.kind(id)
            else {
                continue;
            };
            if !Self::is_empty_block(ast, consequent) {
                continue;
            }
            let Some(inverted) = invert_condition(ast, test) else {
                continue;
            };
            ast.replace(
                id,
                NodeKind::If {
                    test: inverted,
                    consequent: alternate,
                    alternate: None,
                },
            );
            ctx.rewrite(
                EventKind::BranchSimplified,
                ast.span(id),
                format!("flipped empty consequent, test -> {}", print_node(ast, inverted)),
            );
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
    fn test_empty_else_dropped() {
        let run = run_pass(&IfNormalizationPass::new(), "if (a) b(); else {}");
        assert_eq!(run.output, "if (a) b();\n");
        assert_eq!(run.rewrites, 1);
    }

    #[test]
    fn test_ternary_tests_collapse() {
        let source = "if (c ? 1 : 0) f(); if (x < y ? 0 : 1) g(); if (!(c ? 0 : 1)) h();";
        let run = run_pass(&IfNormalizationPass::new(), source);
        assert_eq!(run.output, "if (c) f();\nif (!(x < y)) g();\nif (c) h();\n");
    }

    #[test]
    fn test_collapses_inside_logical_tests() {
        let run = run_pass(&IfNormalizationPass::new(), "if ((a ? 1 : 0) && !(b ? 1 : 0)) f();");
        assert_eq!(run.output, "if (a && !b) f();\n");
        assert_eq!(run.rewrites, 2);
    }

    #[test]
    fn test_empty_consequent_flipped() {
        let source = "if (a) {} else { b(); } if (a == b) {} else c();";
        let run = run_pass(&IfNormalizationPass::new(), source);
        assert_eq!(run.output, "if (!a) {\n  b();\n}\nif (a != b) c();\n");
    }

    #[test]
    fn test_non_invertible_tests_kept() {
        let source = "if (x = 1) {} else b(); if (i++ ? 0 : 1) c(); y = c ? 1 : 0;";
        let run = run_pass(&IfNormalizationPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let first = run_pass(&IfNormalizationPass::new(), "if (a ? 0 : 1) {} else { b(); }");
        assert_eq!(first.output, "if (a) {\n  b();\n}\n");
        assert_eq!(run_pass(&IfNormalizationPass::new(), &first.output).rewrites, 0);
    }
}
