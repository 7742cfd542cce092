//! Binary expression folding.
//!
//! Folds binary expressions whose operands are statically known numbers, innermost first,
//! with JavaScript semantics: `ToInt32` for bitwise operators, masked shift counts,
//! `IsLooselyEqual`/`IsStrictlyEqual` for equality. Comparisons produce `1` or `0`.
//!
//! ```text
//! x = (5 - 7) * 2 | 0;    →   x = -4;
//! y = !0 === 1;           →   y = 0;
//! ```
//!
//! `in` and `instanceof` between numbers cannot come out of the bundler; meeting one means
//! the input is not what the pipeline expects, and the run is aborted.

use crate::{
    deobfuscation::{context::PassContext, events::EventKind, pass::Pass},
    numeric::{
        apply_binary, extract_value, loose_eq, number_to_string, strict_eq, synthesize, Primitive,
    },
    syntax::{Ast, BinaryOp, NodeKind},
    Error, Result,
};

/// Folds numeric binary expressions.
pub struct BinaryFoldingPass;

impl Default for BinaryFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryFoldingPass {
    /// Creates a new binary folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `left <operator> right`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperator`] for `in` and `instanceof`.
    fn evaluate(operator: BinaryOp, left: Primitive, right: Primitive) -> Result<Option<f64>> {
        let flag = |condition: bool| if condition { 1.0 } else { 0.0 };
        let value = match operator {
            BinaryOp::In | BinaryOp::InstanceOf => {
                return Err(Error::UnsupportedOperator(operator.as_str().to_string()));
            }
            BinaryOp::Eq => flag(loose_eq(left, right)),
            BinaryOp::NotEq => flag(!loose_eq(left, right)),
            BinaryOp::StrictEq => flag(strict_eq(left, right)),
            BinaryOp::StrictNotEq => flag(!strict_eq(left, right)),
            _ => match apply_binary(operator, left.to_number(), right.to_number()) {
                Some(value) => value,
                None => return Ok(None),
            },
        };
        Ok(value.is_finite().then_some(value))
    }
}

impl Pass for BinaryFoldingPass {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn description(&self) -> &'static str {
        "Folds binary expressions over numeric literals"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let mut changed = 0;
        for id in ast.postorder(ast.root()) {
            let NodeKind::Binary {
                operator,
                left,
                right,
            } = ast.kind(id)
            else {
                continue;
            };
            let (Some(left), Some(right)) = (extract_value(ast, *left), extract_value(ast, *right))
            else {
                continue;
            };
            let Some(value) = Self::evaluate(*operator, left, right)? else {
                continue;
            };
            let span = ast.span(id);
            ctx.rewrite(
                EventKind::ConstantFolded,
                span,
                format!("binary '{operator}' -> {}", number_to_string(value)),
            );
            let literal = synthesize(ast, Primitive::Number(value), span);
            ast.replace_with(id, literal);
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{run_pass, run_pass_err};

    #[test]
    fn test_folds_nested_arithmetic() {
        let run = run_pass(&BinaryFoldingPass::new(), "x = (5 - 7) * 2 | 0; y = 1 + 2 * 3;");
        assert_eq!(run.output, "x = -4;\ny = 7;\n");
        assert_eq!(run.rewrites, 5);
    }

    #[test]
    fn test_int32_semantics() {
        let source = "a = 1 << 33; b = -1 >>> 28; c = 4294967297 | 0; d = ~5 & 255; e = 2 ** 10;";
        let run = run_pass(&BinaryFoldingPass::new(), source);
        assert_eq!(run.output, "a = 2;\nb = 15;\nc = 1;\nd = 250;\ne = 1024;\n");
    }

    #[test]
    fn test_equality_and_comparisons() {
        let source = "a = !0 == 1; b = !0 === 1; c = 3 < 2; d = -0 === 0; e = !1 !== !1;";
        let run = run_pass(&BinaryFoldingPass::new(), source);
        assert_eq!(run.output, "a = 1;\nb = 0;\nc = 0;\nd = 1;\ne = 0;\n");
    }

    #[test]
    fn test_non_numeric_and_non_finite_untouched() {
        let source = "a = x + 1; b = 1 / 0; c = '1' + 2; d = 0 % 0;";
        let run = run_pass(&BinaryFoldingPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_in_operator_is_fatal() {
        let err = run_pass_err(&BinaryFoldingPass::new(), "x = 1 in 2;");
        assert!(matches!(&err, Error::UnsupportedOperator(op) if op == "in"));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("'in'"));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let first = run_pass(&BinaryFoldingPass::new(), "x = 2 - 9;");
        assert_eq!(first.output, "x = -7;\n");
        assert_eq!(run_pass(&BinaryFoldingPass::new(), &first.output).rewrites, 0);
    }
}
