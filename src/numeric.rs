//! Numeric literal model and JavaScript primitive semantics.
//!
//! The bundler hides numbers behind unary chains (`-~!0`), comma sequences (`(0, 5)`) and
//! arithmetic helpers. [`extract_value`] reads such a value back, [`synthesize`] writes one,
//! and [`invert_condition`] negates a boolean test without piling up `!` operators.
//!
//! The conversion helpers implement the ECMAScript abstract operations the folding passes
//! need: `ToInt32` and friends, truthiness, loose and strict equality between primitives,
//! and `Number.prototype.toString()` formatting.

use crate::syntax::{Ast, BinaryOp, LogicalOp, NodeId, NodeKind, Span, UnaryOp};

/// A statically known primitive value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// A JavaScript number.
    Number(f64),
    /// A JavaScript boolean, produced by `!`.
    Bool(bool),
}

impl Primitive {
    /// `ToNumber`.
    #[must_use]
    pub fn to_number(self) -> f64 {
        match self {
            Primitive::Number(value) => value,
            Primitive::Bool(value) => f64::from(u8::from(value)),
        }
    }

    /// `ToBoolean`.
    #[must_use]
    pub fn truthy(self) -> bool {
        match self {
            Primitive::Number(value) => truthy(value),
            Primitive::Bool(value) => value,
        }
    }
}

/// Returns true if `id` holds a statically known number.
#[must_use]
pub fn is_number(ast: &Ast, id: NodeId) -> bool {
    extract_value(ast, id).is_some()
}

/// Reads the value of a numeric literal, a `+ - ~ !` chain around one, or the final element
/// of a comma sequence whose other elements are side-effect-free.
#[must_use]
pub fn extract_value(ast: &Ast, id: NodeId) -> Option<Primitive> {
    match ast.kind(id) {
        NodeKind::NumericLiteral { value } => Some(Primitive::Number(*value)),
        NodeKind::Unary { operator, argument } => {
            let inner = extract_value(ast, *argument)?;
            match operator {
                UnaryOp::Minus => Some(Primitive::Number(-inner.to_number())),
                UnaryOp::Plus => Some(Primitive::Number(inner.to_number())),
                UnaryOp::BitNot => Some(Primitive::Number(f64::from(!to_int32(inner.to_number())))),
                UnaryOp::Not => Some(Primitive::Bool(!inner.truthy())),
                _ => None,
            }
        }
        NodeKind::Sequence { expressions } => {
            let (last, rest) = expressions.split_last()?;
            if rest.iter().all(|e| is_side_effect_free(ast, *e)) {
                extract_value(ast, *last)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Reads a statically known number, converting booleans.
#[must_use]
pub fn extract_number(ast: &Ast, id: NodeId) -> Option<f64> {
    extract_value(ast, id).map(Primitive::to_number)
}

/// Allocates the canonical literal for `value`.
///
/// Negative numbers (including `-0`) become a unary minus around the magnitude; booleans
/// become `1` or `0`.
pub fn synthesize(ast: &mut Ast, value: Primitive, span: Span) -> NodeId {
    let number = value.to_number();
    if number.is_sign_negative() && !number.is_nan() {
        let magnitude = ast.number(-number, span);
        ast.alloc(
            NodeKind::Unary {
                operator: UnaryOp::Minus,
                argument: magnitude,
            },
            span,
        )
    } else {
        ast.number(number, span)
    }
}

/// Returns true if evaluating `id` cannot have side effects.
#[must_use]
pub fn is_side_effect_free(ast: &Ast, id: NodeId) -> bool {
    match ast.kind(id) {
        NodeKind::NumericLiteral { .. }
        | NodeKind::StringLiteral { .. }
        | NodeKind::BooleanLiteral { .. }
        | NodeKind::NullLiteral
        | NodeKind::RegExpLiteral { .. }
        | NodeKind::Identifier { .. }
        | NodeKind::This => true,
        NodeKind::Unary { operator, argument } => {
            *operator != UnaryOp::Delete && is_side_effect_free(ast, *argument)
        }
        NodeKind::Binary { left, right, .. } | NodeKind::Logical { left, right, .. } => {
            is_side_effect_free(ast, *left) && is_side_effect_free(ast, *right)
        }
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            is_side_effect_free(ast, *test)
                && is_side_effect_free(ast, *consequent)
                && is_side_effect_free(ast, *alternate)
        }
        NodeKind::Sequence { expressions } => {
            expressions.iter().all(|e| is_side_effect_free(ast, *e))
        }
        _ => false,
    }
}

fn is_literal_number(ast: &Ast, id: NodeId, expected: f64) -> bool {
    matches!(ast.kind(id), NodeKind::NumericLiteral { value } if *value == expected)
}

/// Returns true if [`invert_condition`] would succeed on `id`.
#[must_use]
pub fn is_invertible(ast: &Ast, id: NodeId) -> bool {
    match ast.kind(id) {
        NodeKind::Assignment { .. }
        | NodeKind::Update { .. }
        | NodeKind::FunctionExpression(_)
        | NodeKind::Object { .. }
        | NodeKind::Array { .. } => false,
        NodeKind::Logical {
            operator: LogicalOp::And | LogicalOp::Or,
            left,
            right,
        } => is_invertible(ast, *left) && is_invertible(ast, *right),
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } if is_literal_number(ast, *consequent, 1.0) && is_literal_number(ast, *alternate, 0.0) => {
            is_invertible(ast, *test)
        }
        NodeKind::Sequence { expressions } => expressions
            .last()
            .is_some_and(|last| is_invertible(ast, *last)),
        kind => !kind.is_statement(),
    }
}

/// Builds the boolean negation of `id`.
///
/// `!x` becomes `x`, `&&`/`||` are rewritten with De Morgan, equality operators are
/// complemented, `c ? 1 : 0` and `c ? 0 : 1` collapse to their test and a comma sequence
/// inverts its final element. Relational operators are complemented only between two
/// numbers (see [`is_number`]); any other comparison may see `NaN`, where `a < b` and
/// `a >= b` are both false, so it is wrapped in `!` like every other plain value. Returns
/// `None` for assignments, updates and function, object or array expressions.
///
/// The returned node never contains `id` itself, so callers can move it into the slot of
/// `id` with [`Ast::replace_with`].
pub fn invert_condition(ast: &mut Ast, id: NodeId) -> Option<NodeId> {
    if !is_invertible(ast, id) {
        return None;
    }
    Some(invert_unchecked(ast, id))
}

fn invert_unchecked(ast: &mut Ast, id: NodeId) -> NodeId {
    let span = ast.span(id);
    match ast.kind(id).clone() {
        NodeKind::Unary {
            operator: UnaryOp::Not,
            argument,
        } => argument,
        NodeKind::Logical {
            operator: operator @ (LogicalOp::And | LogicalOp::Or),
            left,
            right,
        } => {
            let left = invert_unchecked(ast, left);
            let right = invert_unchecked(ast, right);
            let operator = if operator == LogicalOp::And {
                LogicalOp::Or
            } else {
                LogicalOp::And
            };
            ast.alloc(
                NodeKind::Logical {
                    operator,
                    left,
                    right,
                },
                span,
            )
        }
        NodeKind::Binary {
            operator,
            left,
            right,
        } if exact_complement(ast, operator, left, right).is_some() => {
            let operator = exact_complement(ast, operator, left, right).unwrap_or(operator);
            ast.alloc(
                NodeKind::Binary {
                    operator,
                    left,
                    right,
                },
                span,
            )
        }
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } if is_literal_number(ast, consequent, 1.0) && is_literal_number(ast, alternate, 0.0) => {
            invert_unchecked(ast, test)
        }
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } if is_literal_number(ast, consequent, 0.0) && is_literal_number(ast, alternate, 1.0) => {
            test
        }
        NodeKind::Sequence { mut expressions } => {
            if let Some(last) = expressions.pop() {
                let inverted = invert_unchecked(ast, last);
                expressions.push(inverted);
            }
            ast.alloc(NodeKind::Sequence { expressions }, span)
        }
        kind => {
            let copy = ast.alloc(kind, span);
            ast.alloc(
                NodeKind::Unary {
                    operator: UnaryOp::Not,
                    argument: copy,
                },
                span,
            )
        }
    }
}

/// Complement of a comparison that holds for every pair of operand values.
fn exact_complement(
    ast: &Ast,
    operator: BinaryOp,
    left: NodeId,
    right: NodeId,
) -> Option<BinaryOp> {
    let complement = operator.complement()?;
    let relational = matches!(
        operator,
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
    );
    (!relational || (is_number(ast, left) && is_number(ast, right))).then_some(complement)
}

/// `ToBoolean` for numbers.
#[must_use]
pub fn truthy(value: f64) -> bool {
    !(value == 0.0 || value.is_nan())
}

/// `ToInt32`.
#[must_use]
pub fn to_int32(value: f64) -> i32 {
    to_uint32(value) as i32
}

/// `ToUint32`.
#[must_use]
pub fn to_uint32(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// `ToUint16`, as applied by `String.fromCharCode`.
#[must_use]
pub fn to_uint16(value: f64) -> u16 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid(65_536.0) as u16
}

/// `Number::exponentiate`; differs from `powf` for `NaN` exponents and `±1 ** ±Infinity`.
#[must_use]
pub fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// `IsLooselyEqual` between two primitives.
#[must_use]
pub fn loose_eq(left: Primitive, right: Primitive) -> bool {
    match (left, right) {
        (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
        _ => left.to_number() == right.to_number(),
    }
}

/// `IsStrictlyEqual` between two primitives.
#[must_use]
pub fn strict_eq(left: Primitive, right: Primitive) -> bool {
    match (left, right) {
        (Primitive::Number(a), Primitive::Number(b)) => a == b,
        (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
        _ => false,
    }
}

/// Evaluates a binary operator on two numbers.
///
/// Comparisons produce `1` or `0`. Returns `None` for `in` and `instanceof`, which have no
/// numeric meaning.
#[must_use]
pub fn apply_binary(operator: BinaryOp, left: f64, right: f64) -> Option<f64> {
    let flag = |condition: bool| if condition { 1.0 } else { 0.0 };
    let value = match operator {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        BinaryOp::Exp => pow(left, right),
        BinaryOp::BitOr => f64::from(to_int32(left) | to_int32(right)),
        BinaryOp::BitXor => f64::from(to_int32(left) ^ to_int32(right)),
        BinaryOp::BitAnd => f64::from(to_int32(left) & to_int32(right)),
        BinaryOp::Shl => f64::from(to_int32(left).wrapping_shl(to_uint32(right) & 31)),
        BinaryOp::Shr => f64::from(to_int32(left).wrapping_shr(to_uint32(right) & 31)),
        BinaryOp::UShr => f64::from(to_uint32(left).wrapping_shr(to_uint32(right) & 31)),
        BinaryOp::Eq | BinaryOp::StrictEq => flag(left == right),
        BinaryOp::NotEq | BinaryOp::StrictNotEq => flag(left != right),
        BinaryOp::Lt => flag(left < right),
        BinaryOp::LtEq => flag(left <= right),
        BinaryOp::Gt => flag(left > right),
        BinaryOp::GtEq => flag(left >= right),
        BinaryOp::In | BinaryOp::InstanceOf => return None,
    };
    Some(value)
}

/// `Number.prototype.toString()` with radix 10.
#[must_use]
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", number_to_string(-value));
    }

    // Shortest round-trip digits and decimal exponent.
    let formatted = format!("{value:e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let sign = if n - 1 >= 0 { '+' } else { '-' };
        let magnitude = (n - 1).abs();
        if k == 1 {
            format!("{digits}e{sign}{magnitude}")
        } else {
            format!("{}.{}e{sign}{magnitude}", &digits[..1], &digits[1..])
        }
    }
}

/// `parseInt(value)` for a number argument: parses the integer prefix of its string form.
#[must_use]
pub fn parse_int_number(value: f64) -> f64 {
    let text = number_to_string(value);
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let digits: String = body.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let magnitude: f64 = digits.parse().unwrap_or(f64::NAN);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, print_node};

    fn expression(source: &str) -> (Ast, NodeId) {
        let ast = parse(source).unwrap();
        let NodeKind::Program { body } = ast.kind(ast.root()) else {
            unreachable!()
        };
        let NodeKind::ExpressionStatement { expression } = ast.kind(body[0]) else {
            unreachable!()
        };
        let expression = *expression;
        (ast, expression)
    }

    fn value_of(source: &str) -> Option<Primitive> {
        let (ast, id) = expression(source);
        extract_value(&ast, id)
    }

    fn inverted(source: &str) -> Option<String> {
        let (mut ast, id) = expression(source);
        invert_condition(&mut ast, id).map(|node| print_node(&ast, node))
    }

    #[test]
    fn formats_like_javascript() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1), "0.1");
        assert_eq!(number_to_string(123.456), "123.456");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e20), "100000000000000000000");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(-2.5), "-2.5");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_string(f64::NAN), "NaN");
    }

    #[test]
    fn int_conversions() {
        assert_eq!(to_int32(4_294_967_295.0), -1);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_uint16(65_601.0), 65);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn parse_int_of_numbers() {
        assert_eq!(parse_int_number(4.7), 4.0);
        assert_eq!(parse_int_number(-4.7), -4.0);
        assert_eq!(parse_int_number(1e21), 1.0);
        assert_eq!(parse_int_number(0.0000005), 5.0);
        assert!(parse_int_number(f64::NAN).is_nan());
    }

    #[test]
    fn reads_wrapped_numbers() {
        assert_eq!(value_of("5;"), Some(Primitive::Number(5.0)));
        assert_eq!(value_of("-~5;"), Some(Primitive::Number(6.0)));
        assert_eq!(value_of("!0;"), Some(Primitive::Bool(true)));
        assert_eq!(value_of("+!0;"), Some(Primitive::Number(1.0)));
        assert_eq!(value_of("(a, 0, 7);"), Some(Primitive::Number(7.0)));
        assert_eq!(value_of("(f(), 7);"), None);
        assert_eq!(value_of("typeof 1;"), None);
        assert_eq!(value_of("x;"), None);
    }

    #[test]
    fn synthesis_reads_back() {
        for value in [0.0, -0.0, 3.5, -12.0, f64::INFINITY] {
            let mut ast = Ast::new();
            let id = synthesize(&mut ast, Primitive::Number(value), Span::default());
            let read = extract_number(&ast, id).unwrap();
            assert_eq!(read.to_bits(), value.to_bits());
        }
        let mut ast = Ast::new();
        let id = synthesize(&mut ast, Primitive::Bool(true), Span::default());
        assert_eq!(print_node(&ast, id), "1");
    }

    #[test]
    fn inverts_conditions() {
        assert_eq!(inverted("!a;").as_deref(), Some("a"));
        assert_eq!(inverted("a;").as_deref(), Some("!a"));
        assert_eq!(inverted("a == b;").as_deref(), Some("a != b"));
        assert_eq!(inverted("a !== b;").as_deref(), Some("a === b"));
        assert_eq!(inverted("1 < 2;").as_deref(), Some("1 >= 2"));
        assert_eq!(inverted("-1 > ~2;").as_deref(), Some("-1 <= ~2"));
        assert_eq!(inverted("a < b;").as_deref(), Some("!(a < b)"));
        assert_eq!(inverted("a >= 1;").as_deref(), Some("!(a >= 1)"));
        assert_eq!(inverted("a && !b;").as_deref(), Some("!a || b"));
        assert_eq!(inverted("(a || b) && c;").as_deref(), Some("!a && !b || !c"));
        assert_eq!(inverted("c ? 1 : 0;").as_deref(), Some("!c"));
        assert_eq!(inverted("c ? 0 : 1;").as_deref(), Some("c"));
        assert_eq!(inverted("(f(), a);").as_deref(), Some("f(), !a"));
        assert_eq!(inverted("a + b;").as_deref(), Some("!(a + b)"));
        assert_eq!(inverted("f();").as_deref(), Some("!f()"));
        assert_eq!(inverted("a = 1;"), None);
        assert_eq!(inverted("a && (b = 1);"), None);
    }
}
