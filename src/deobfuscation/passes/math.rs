//! Static math call folding.
//!
//! Folds `Math.floor(n)`, `Math.ceil(n)`, `parseInt(n)` and `Number(n)` with a constant
//! argument. The globals must not be shadowed at the call site.
//!
//! When the folded call initialises a never-reassigned variable, the value is also
//! propagated into every read of that variable and the declarator is dropped:
//!
//! ```text
//! var a = parseInt(7.5), b = 2;        var b = 2;
//! f(a, a + b);                   →     f(7, 7 + b);
//! ```

use crate::{
    deobfuscation::{
        context::PassContext,
        events::EventKind,
        pass::Pass,
        passes::utils::{member_property_name, remove_declarator},
    },
    numeric::{extract_number, number_to_string, parse_int_number, synthesize, Primitive},
    syntax::{Ast, NodeId, NodeKind, ScopeTree},
    Result,
};

/// Folds calls of `Math.floor`, `Math.ceil`, `parseInt` and `Number` on constants.
pub struct StaticMathPass;

impl Default for StaticMathPass {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticMathPass {
    /// Creates a new static math pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if `id` is the identifier `name` resolving to no local binding.
    fn is_global(ast: &Ast, scopes: &ScopeTree, id: NodeId, name: &str) -> bool {
        ast.kind(id).as_ident() == Some(name) && scopes.resolve(id).is_none()
    }

    /// Evaluates a supported call with one constant argument.
    fn evaluate(ast: &Ast, scopes: &ScopeTree, call: NodeId) -> Option<f64> {
        let NodeKind::Call { callee, arguments } = ast.kind(call) else {
            return None;
        };
        let [argument] = arguments.as_slice() else {
            return None;
        };
        let value = extract_number(ast, *argument)?;

        let result = match ast.kind(*callee) {
            NodeKind::Identifier { .. } if Self::is_global(ast, scopes, *callee, "parseInt") => {
                parse_int_number(value)
            }
            NodeKind::Identifier { .. } if Self::is_global(ast, scopes, *callee, "Number") => {
                value
            }
            NodeKind::Member { object, .. } if Self::is_global(ast, scopes, *object, "Math") => {
                match member_property_name(ast, *callee)? {
                    "floor" => value.floor(),
                    "ceil" => value.ceil(),
                    _ => return None,
                }
            }
            _ => return None,
        };
        result.is_finite().then_some(result)
    }

    /// Propagates a folded initialiser into the reads of its variable.
    ///
    /// Returns the number of rewrites, including the declarator removal.
    fn propagate(
        ast: &mut Ast,
        scopes: &ScopeTree,
        ctx: &PassContext<'_>,
        folded: NodeId,
        value: f64,
    ) -> usize {
        let Some(declarator) = ast.parent(folded) else {
            return 0;
        };
        let NodeKind::VariableDeclarator {
            id,
            init: Some(init),
        } = ast.kind(declarator)
        else {
            return 0;
        };
        if *init != folded {
            return 0;
        }
        let Some(binding) = scopes.resolve(*id) else {
            return 0;
        };
        if !scopes.is_constant(binding) {
            return 0;
        }

        let name = scopes.binding(binding).name.clone();
        let mut changed = 0;
        for reference in scopes.binding(binding).references.clone() {
            if !ast.is_live(reference) {
                continue;
            }
            let span = ast.span(reference);
            let literal = synthesize(ast, Primitive::Number(value), span);
            ast.replace_with(reference, literal);
            ctx.rewrite(
                EventKind::ConstantFolded,
                span,
                format!("{name} -> {}", number_to_string(value)),
            );
            changed += 1;
        }
        if remove_declarator(ast, declarator) {
            ctx.rewrite(
                EventKind::ArtifactRemoved,
                ast.span(declarator),
                format!("removed constant '{name}'"),
            );
            changed += 1;
        }
        changed
    }
}

impl Pass for StaticMathPass {
    fn name(&self) -> &'static str {
        "static-math"
    }

    fn description(&self) -> &'static str {
        "Folds Math.floor, Math.ceil, parseInt and Number on constants"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let scopes = ScopeTree::build(ast);
        let calls = ast.find_all(ast.root(), |kind| matches!(kind, NodeKind::Call { .. }));

        let mut changed = 0;
        // Innermost calls first, so nested calls see folded arguments.
        for call in calls.into_iter().rev() {
            let Some(value) = Self::evaluate(ast, &scopes, call) else {
                continue;
            };
            let span = ast.span(call);
            ctx.rewrite(
                EventKind::ConstantFolded,
                span,
                format!("static call -> {}", number_to_string(value)),
            );
            let literal = synthesize(ast, Primitive::Number(value), span);
            ast.replace_with(call, literal);
            changed += 1;
            changed += Self::propagate(ast, &scopes, ctx, call, value);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::run_pass;

    #[test]
    fn test_folds_supported_calls() {
        let source = "x = Math.floor(3.7) + Math['ceil'](4.2); y = parseInt(-12.9); z = Number(!0);";
        let run = run_pass(&StaticMathPass::new(), source);
        assert_eq!(run.output, "x = 3 + 5;\ny = -12;\nz = 1;\n");
        assert_eq!(run.rewrites, 4);
    }

    #[test]
    fn test_nested_calls_fold_inside_out() {
        let run = run_pass(&StaticMathPass::new(), "x = Math.floor(parseInt(9.9) / 2);");
        assert_eq!(run.output, "x = Math.floor(9 / 2);\n");
        let run = run_pass(&StaticMathPass::new(), "x = Math.ceil(Number(-~1));");
        assert_eq!(run.output, "x = 2;\n");
    }

    #[test]
    fn test_propagates_constant_initialisers() {
        let source = "var a = parseInt(7.5), b = 2; f(a, a + b);";
        let run = run_pass(&StaticMathPass::new(), source);
        assert_eq!(run.output, "var b = 2;\nf(7, 7 + b);\n");
        assert_eq!(run.events.count_kind(EventKind::ArtifactRemoved), 1);
    }

    #[test]
    fn test_reassigned_variable_keeps_declarator() {
        let source = "var a = Math.floor(1.5); a = 3; f(a);";
        let run = run_pass(&StaticMathPass::new(), source);
        assert_eq!(run.output, "var a = 1;\na = 3;\nf(a);\n");
    }

    #[test]
    fn test_shadowed_and_unsupported_calls_untouched() {
        let source = "function g(parseInt, Math) { return parseInt(1.5) + Math.floor(2.5); } x = Math.round(1.5); y = parseInt(s); z = Number(0 / 0);";
        let run = run_pass(&StaticMathPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }
}
