//! Logical short-circuit folding.
//!
//! Removes a constant operand of `&&`/`||` that cannot decide the outcome:
//!
//! ```text
//! x || 0    →   x          0 || x    →   x
//! x && 1    →   x          1 && x    →   x
//! ```
//!
//! The rewrite applies only when exactly one side is a side-effect-free number. Folding
//! `x || 0` keeps the truthiness of the expression, which is all the bundler's tests rely
//! on.

use crate::{
    deobfuscation::{context::PassContext, events::EventKind, pass::Pass},
    numeric::extract_value,
    syntax::{print_node, Ast, LogicalOp, NodeId, NodeKind},
    Result,
};

/// Folds `&&`/`||` with one neutral numeric operand.
pub struct LogicalFoldingPass;

impl Default for LogicalFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalFoldingPass {
    /// Creates a new logical folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the operand that survives, if the other one is neutral.
    fn survivor(ast: &Ast, operator: LogicalOp, left: NodeId, right: NodeId) -> Option<NodeId> {
        let neutral = |truthy: bool| match operator {
            LogicalOp::Or => !truthy,
            LogicalOp::And => truthy,
            LogicalOp::Nullish => false,
        };
        match (extract_value(ast, left), extract_value(ast, right)) {
            (Some(value), None) if neutral(value.truthy()) => Some(right),
            (None, Some(value)) if neutral(value.truthy()) => Some(left),
            _ => None,
        }
    }
}

impl Pass for LogicalFoldingPass {
    fn name(&self) -> &'static str {
        "logical"
    }

    fn description(&self) -> &'static str {
        "Drops neutral numeric operands of && and ||"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let mut changed = 0;
        for id in ast.postorder(ast.root()) {
            let NodeKind::Logical {
                operator,
                left,
                right,
            } = ast.kind(id)
            else {
                continue;
            };
            let Some(kept) = Self::survivor(ast, *operator, *left, *right) else {
                continue;
            };
            ctx.rewrite(
                EventKind::ExpressionSimplified,
                ast.span(id),
                format!("{} -> {}", print_node(ast, id), print_node(ast, kept)),
            );
            ast.replace_with(id, kept);
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
    fn test_neutral_operands_dropped() {
        let source = "a = x || 0; b = 0 || x; c = x && 1; d = !0 && x; e = x || !1;";
        let run = run_pass(&LogicalFoldingPass::new(), source);
        assert_eq!(run.output, "a = x;\nb = x;\nc = x;\nd = x;\ne = x;\n");
        assert_eq!(run.rewrites, 5);
    }

    #[test]
    fn test_deciding_operands_kept() {
        let source = "a = x || 1; b = 0 && x; c = 1 || 2; d = x && y; e = x ?? 0;";
        let run = run_pass(&LogicalFoldingPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_nested_chains_collapse() {
        let run = run_pass(&LogicalFoldingPass::new(), "if ((x || 0) && 1) f();");
        assert_eq!(run.output, "if (x) f();\n");
    }
}
