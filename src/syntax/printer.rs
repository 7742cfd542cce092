//! Pretty printer.
//!
//! Emits statements one per line with configurable indentation, inserts parentheses from
//! operator precedence, and re-emits source comments in front of the statement that
//! follows them.

use crate::{
    numeric::number_to_string,
    syntax::{
        node::{BinaryOp, Comment, LogicalOp, NodeId, NodeKind, PropertyKind},
        Ast,
    },
};

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_MEMBER: u8 = 17;
const PREC_PRIMARY: u8 = 20;

/// Prints a whole program with default settings.
#[must_use]
pub fn print(ast: &Ast) -> String {
    Printer::new(ast).print()
}

/// Prints a single statement or expression without comments.
#[must_use]
pub fn print_node(ast: &Ast, id: NodeId) -> String {
    let mut printer = Printer::new(ast).without_comments();
    let mut out = String::new();
    if ast.kind(id).is_statement() {
        printer.statement(id, 0, &mut out);
    } else if matches!(ast.kind(id), NodeKind::VariableDeclarator { .. }) {
        out = printer.declarator(id, 0);
    } else {
        out = printer.expr(id, PREC_SEQUENCE, 0);
    }
    out
}

/// Returns the canonical double-quoted spelling of a string value.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Configurable printer over a borrowed tree.
pub struct Printer<'a> {
    ast: &'a Ast,
    indent_width: usize,
    comments: &'a [Comment],
    next_comment: usize,
    /// Set while printing a `for` initialiser, where a bare `in` would start a for-in head.
    no_in: bool,
}

impl<'a> Printer<'a> {
    /// Creates a printer with two-space indentation that emits comments.
    #[must_use]
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            indent_width: 2,
            comments: ast.comments(),
            next_comment: 0,
            no_in: false,
        }
    }

    /// Sets the indentation width.
    #[must_use]
    pub fn with_indent(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    /// Suppresses comment output.
    #[must_use]
    pub fn without_comments(mut self) -> Self {
        self.comments = &[];
        self
    }

    /// Prints the program.
    #[must_use]
    pub fn print(mut self) -> String {
        let mut out = String::new();
        let ast = self.ast;
        if let NodeKind::Program { body } = ast.kind(ast.root()) {
            self.statement_list(body, 0, &mut out);
        }
        self.flush_comments(u32::MAX, 0, &mut out);
        out
    }

    fn indent(&self, depth: usize) -> String {
        " ".repeat(depth * self.indent_width)
    }

    fn flush_comments(&mut self, before: u32, depth: usize, out: &mut String) {
        while let Some(comment) = self.comments.get(self.next_comment) {
            if comment.span.start >= before {
                break;
            }
            out.push_str(&self.indent(depth));
            if comment.block {
                out.push_str("/*");
                out.push_str(&comment.text);
                out.push_str("*/");
            } else {
                out.push_str("//");
                out.push_str(&comment.text);
            }
            out.push('\n');
            self.next_comment += 1;
        }
    }

    fn statement_list(&mut self, body: &[NodeId], depth: usize, out: &mut String) {
        for stmt in body {
            let span = self.ast.span(*stmt);
            if !span.is_empty() {
                self.flush_comments(span.start, depth, out);
            }
            out.push_str(&self.indent(depth));
            self.statement(*stmt, depth, out);
            out.push('\n');
        }
    }

    fn block(&mut self, id: NodeId, depth: usize, out: &mut String) {
        let ast = self.ast;
        let NodeKind::Block { body } = ast.kind(id) else {
            self.statement(id, depth, out);
            return;
        };
        if body.is_empty() {
            out.push_str("{}");
            return;
        }
        out.push_str("{\n");
        self.statement_list(body, depth + 1, out);
        out.push_str(&self.indent(depth));
        out.push('}');
    }

    fn body(&mut self, id: NodeId, depth: usize, out: &mut String) {
        out.push(' ');
        if matches!(self.ast.kind(id), NodeKind::Block { .. }) {
            self.block(id, depth, out);
        } else {
            self.statement(id, depth, out);
        }
    }

    fn declaration(&mut self, id: NodeId, depth: usize) -> String {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::VariableDeclaration { kind, declarations } => {
                let parts: Vec<String> = declarations
                    .iter()
                    .map(|decl| self.declarator(*decl, depth))
                    .collect();
                format!("{} {}", kind.as_str(), parts.join(", "))
            }
            _ => self.expr(id, PREC_SEQUENCE, depth),
        }
    }

    fn declarator(&mut self, id: NodeId, depth: usize) -> String {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::VariableDeclarator { id: name, init } => {
                let mut text = self.expr(*name, PREC_PRIMARY, depth);
                if let Some(init) = init {
                    text.push_str(" = ");
                    text.push_str(&self.expr(*init, PREC_ASSIGN, depth));
                }
                text
            }
            _ => self.expr(id, PREC_ASSIGN, depth),
        }
    }

    /// Prints a statement at the current position without trailing newline.
    fn statement(&mut self, id: NodeId, depth: usize, out: &mut String) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Program { body } => self.statement_list(body, depth, out),
            NodeKind::Block { .. } => self.block(id, depth, out),
            NodeKind::Empty => out.push(';'),
            NodeKind::Debugger => out.push_str("debugger;"),
            NodeKind::ExpressionStatement { expression } => {
                let text = self.expr(*expression, PREC_SEQUENCE, depth);
                if text.starts_with('{')
                    || text.starts_with("function ")
                    || text.starts_with("function(")
                {
                    out.push('(');
                    out.push_str(&text);
                    out.push(')');
                } else {
                    out.push_str(&text);
                }
                out.push(';');
            }
            NodeKind::VariableDeclaration { .. } => {
                let text = self.declaration(id, depth);
                out.push_str(&text);
                out.push(';');
            }
            NodeKind::VariableDeclarator { .. } => {
                let text = self.declarator(id, depth);
                out.push_str(&text);
            }
            NodeKind::FunctionDeclaration(_) => {
                let text = self.function(id, depth);
                out.push_str(&text);
            }
            NodeKind::Return { argument } => {
                out.push_str("return");
                if let Some(argument) = argument {
                    out.push(' ');
                    out.push_str(&self.expr(*argument, PREC_SEQUENCE, depth));
                }
                out.push(';');
            }
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                out.push_str("if (");
                out.push_str(&self.expr(*test, PREC_SEQUENCE, depth));
                out.push(')');
                let Some(alternate) = alternate else {
                    self.body(*consequent, depth, out);
                    return;
                };
                if matches!(ast.kind(*consequent), NodeKind::Block { .. }) {
                    self.body(*consequent, depth, out);
                } else {
                    out.push_str(" {\n");
                    out.push_str(&self.indent(depth + 1));
                    self.statement(*consequent, depth + 1, out);
                    out.push('\n');
                    out.push_str(&self.indent(depth));
                    out.push('}');
                }
                out.push_str(" else");
                if matches!(ast.kind(*alternate), NodeKind::If { .. }) {
                    out.push(' ');
                    self.statement(*alternate, depth, out);
                } else {
                    self.body(*alternate, depth, out);
                }
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => {
                let init = init
                    .map(|init| {
                        self.no_in = true;
                        let text = self.declaration(init, depth);
                        self.no_in = false;
                        text
                    })
                    .unwrap_or_default();
                let test = test
                    .map(|test| format!(" {}", self.expr(test, PREC_SEQUENCE, depth)))
                    .unwrap_or_default();
                let update = update
                    .map(|update| format!(" {}", self.expr(update, PREC_SEQUENCE, depth)))
                    .unwrap_or_default();
                out.push_str(&format!("for ({init};{test};{update})"));
                self.body(*body, depth, out);
            }
            NodeKind::ForIn { left, right, body } => {
                let left = self.declaration(*left, depth);
                let right = self.expr(*right, PREC_SEQUENCE, depth);
                out.push_str(&format!("for ({left} in {right})"));
                self.body(*body, depth, out);
            }
            NodeKind::While { test, body } => {
                let test = self.expr(*test, PREC_SEQUENCE, depth);
                out.push_str(&format!("while ({test})"));
                self.body(*body, depth, out);
            }
            NodeKind::DoWhile { body, test } => {
                out.push_str("do");
                self.body(*body, depth, out);
                let test = self.expr(*test, PREC_SEQUENCE, depth);
                out.push_str(&format!(" while ({test});"));
            }
            NodeKind::Break { label } | NodeKind::Continue { label } => {
                out.push_str(if matches!(ast.kind(id), NodeKind::Break { .. }) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    out.push(' ');
                    out.push_str(label);
                }
                out.push(';');
            }
            NodeKind::Throw { argument } => {
                out.push_str("throw ");
                out.push_str(&self.expr(*argument, PREC_SEQUENCE, depth));
                out.push(';');
            }
            NodeKind::Try {
                block,
                handler,
                finalizer,
            } => {
                out.push_str("try ");
                self.block(*block, depth, out);
                if let Some(handler) = handler {
                    if let NodeKind::CatchClause { param, body } = ast.kind(*handler) {
                        out.push_str(" catch ");
                        if let Some(param) = param {
                            out.push_str(&format!("({}) ", self.expr(*param, PREC_PRIMARY, depth)));
                        }
                        self.block(*body, depth, out);
                    }
                }
                if let Some(finalizer) = finalizer {
                    out.push_str(" finally ");
                    self.block(*finalizer, depth, out);
                }
            }
            NodeKind::CatchClause { body, .. } => self.block(*body, depth, out),
            NodeKind::Switch {
                discriminant,
                cases,
            } => {
                let discriminant = self.expr(*discriminant, PREC_SEQUENCE, depth);
                out.push_str(&format!("switch ({discriminant}) {{\n"));
                for case in cases {
                    self.switch_case(*case, depth + 1, out);
                }
                out.push_str(&self.indent(depth));
                out.push('}');
            }
            NodeKind::SwitchCase { .. } => self.switch_case(id, depth, out),
            NodeKind::Labeled { label, body } => {
                out.push_str(label);
                out.push_str(": ");
                self.statement(*body, depth, out);
            }
            _ => {
                let text = self.expr(id, PREC_SEQUENCE, depth);
                out.push_str(&text);
            }
        }
    }

    fn switch_case(&mut self, id: NodeId, depth: usize, out: &mut String) {
        let ast = self.ast;
        let NodeKind::SwitchCase { test, consequent } = ast.kind(id) else {
            return;
        };
        let span = ast.span(id);
        if !span.is_empty() {
            self.flush_comments(span.start, depth, out);
        }
        out.push_str(&self.indent(depth));
        match test {
            Some(test) => {
                let test = self.expr(*test, PREC_SEQUENCE, depth);
                out.push_str(&format!("case {test}:\n"));
            }
            None => out.push_str("default:\n"),
        }
        self.statement_list(consequent, depth + 1, out);
    }

    fn function(&mut self, id: NodeId, depth: usize) -> String {
        let ast = self.ast;
        let Some(func) = ast.kind(id).as_function() else {
            return String::new();
        };
        let mut text = String::from("function");
        match func.id {
            Some(name) => {
                text.push(' ');
                text.push_str(&self.expr(name, PREC_PRIMARY, depth));
            }
            None => text.push(' '),
        }
        text.push_str(&self.signature(id, depth));
        text
    }

    /// Parameter list and body of a function node.
    fn signature(&mut self, id: NodeId, depth: usize) -> String {
        let ast = self.ast;
        let Some(func) = ast.kind(id).as_function() else {
            return String::new();
        };
        let params: Vec<String> = func
            .params
            .iter()
            .map(|param| self.expr(*param, PREC_PRIMARY, depth))
            .collect();
        let mut text = format!("({}) ", params.join(", "));
        let no_in = std::mem::replace(&mut self.no_in, false);
        self.block(func.body, depth, &mut text);
        self.no_in = no_in;
        text
    }

    fn expr(&mut self, id: NodeId, min_precedence: u8, depth: usize) -> String {
        let bare_in = self.no_in
            && matches!(
                self.ast.kind(id),
                NodeKind::Binary {
                    operator: BinaryOp::In,
                    ..
                }
            );
        if !bare_in && self.precedence(id) >= min_precedence {
            return self.expr_inner(id, depth);
        }
        let no_in = std::mem::replace(&mut self.no_in, false);
        let text = self.expr_inner(id, depth);
        self.no_in = no_in;
        format!("({text})")
    }

    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.kind(id) {
            NodeKind::Sequence { .. } => PREC_SEQUENCE,
            NodeKind::Assignment { .. } => PREC_ASSIGN,
            NodeKind::Conditional { .. } => PREC_CONDITIONAL,
            NodeKind::Logical { operator, .. } => logical_precedence(*operator),
            NodeKind::Binary { operator, .. } => binary_precedence(*operator),
            NodeKind::Unary { .. } => PREC_UNARY,
            NodeKind::Update { prefix: true, .. } => PREC_UNARY,
            NodeKind::Update { prefix: false, .. } => PREC_POSTFIX,
            NodeKind::NumericLiteral { value } if value.is_sign_negative() && !value.is_nan() => {
                PREC_UNARY
            }
            NodeKind::Call { .. } | NodeKind::New { .. } | NodeKind::Member { .. } => PREC_MEMBER,
            _ => PREC_PRIMARY,
        }
    }

    fn expr_inner(&mut self, id: NodeId, depth: usize) -> String {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Identifier { name } => name.clone(),
            NodeKind::NumericLiteral { value } => number_to_string(*value),
            NodeKind::StringLiteral { value, raw } => {
                raw.clone().unwrap_or_else(|| quote_string(value))
            }
            NodeKind::BooleanLiteral { value } => value.to_string(),
            NodeKind::NullLiteral => "null".to_string(),
            NodeKind::RegExpLiteral { pattern, flags } => format!("/{pattern}/{flags}"),
            NodeKind::This => "this".to_string(),
            NodeKind::Array { elements } => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|element| {
                        element.map_or_else(String::new, |e| self.expr(e, PREC_ASSIGN, depth))
                    })
                    .collect();
                let trailing_hole = if elements.last().is_some_and(Option::is_none) {
                    ","
                } else {
                    ""
                };
                format!("[{}{trailing_hole}]", parts.join(", "))
            }
            NodeKind::Object { properties } => {
                if properties.is_empty() {
                    return "{}".to_string();
                }
                let inner = self.indent(depth + 1);
                let parts: Vec<String> = properties
                    .iter()
                    .map(|prop| format!("{inner}{}", self.property(*prop, depth + 1)))
                    .collect();
                format!("{{\n{}\n{}}}", parts.join(",\n"), self.indent(depth))
            }
            NodeKind::Property { .. } => self.property(id, depth),
            NodeKind::FunctionExpression(_) => self.function(id, depth),
            NodeKind::Unary { operator, argument } => {
                let op = operator.as_str();
                let arg = self.expr(*argument, PREC_UNARY, depth);
                if op.chars().all(char::is_alphabetic) {
                    format!("{op} {arg}")
                } else if (op == "-" && arg.starts_with('-')) || (op == "+" && arg.starts_with('+'))
                {
                    format!("{op} {arg}")
                } else {
                    format!("{op}{arg}")
                }
            }
            NodeKind::Update {
                operator,
                prefix,
                argument,
            } => {
                let arg = self.expr(*argument, PREC_POSTFIX, depth);
                if *prefix {
                    format!("{operator}{arg}")
                } else {
                    format!("{arg}{operator}")
                }
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let precedence = binary_precedence(*operator);
                let (left_min, right_min) = if *operator == BinaryOp::Exp {
                    (PREC_POSTFIX, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                let left = self.expr(*left, left_min, depth);
                let right = self.expr(*right, right_min, depth);
                format!("{left} {operator} {right}")
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let precedence = logical_precedence(*operator);
                let left = self.logical_operand(*operator, *left, precedence, depth);
                let right = self.logical_operand(*operator, *right, precedence + 1, depth);
                format!("{left} {operator} {right}")
            }
            NodeKind::Assignment {
                operator,
                target,
                value,
            } => {
                let target = self.expr(*target, PREC_POSTFIX, depth);
                let value = self.expr(*value, PREC_ASSIGN, depth);
                format!("{target} {operator} {value}")
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.expr(*test, PREC_CONDITIONAL + 1, depth);
                let consequent = self.expr(*consequent, PREC_ASSIGN, depth);
                let alternate = self.expr(*alternate, PREC_ASSIGN, depth);
                format!("{test} ? {consequent} : {alternate}")
            }
            NodeKind::Call { callee, arguments } => {
                let callee = self.expr(*callee, PREC_MEMBER, depth);
                let args = self.arguments(arguments, depth);
                format!("{callee}({args})")
            }
            NodeKind::New { callee, arguments } => {
                let callee_text = if self.has_call_in_chain(*callee) {
                    format!("({})", self.expr_inner(*callee, depth))
                } else {
                    self.expr(*callee, PREC_MEMBER, depth)
                };
                let args = self.arguments(arguments, depth);
                format!("new {callee_text}({args})")
            }
            NodeKind::Member {
                object,
                property,
                computed,
            } => {
                let object_text = match ast.kind(*object) {
                    NodeKind::NumericLiteral { .. } if !computed => {
                        format!("({})", self.expr_inner(*object, depth))
                    }
                    _ => self.expr(*object, PREC_MEMBER, depth),
                };
                if *computed {
                    let property = self.expr(*property, PREC_SEQUENCE, depth);
                    format!("{object_text}[{property}]")
                } else {
                    let property = self.expr_inner(*property, depth);
                    format!("{object_text}.{property}")
                }
            }
            NodeKind::Sequence { expressions } => {
                let parts: Vec<String> = expressions
                    .iter()
                    .map(|e| self.expr(*e, PREC_ASSIGN, depth))
                    .collect();
                parts.join(", ")
            }
            _ => {
                let mut out = String::new();
                self.statement(id, depth, &mut out);
                out
            }
        }
    }

    fn logical_operand(
        &mut self,
        operator: LogicalOp,
        operand: NodeId,
        min_precedence: u8,
        depth: usize,
    ) -> String {
        let ast = self.ast;
        let mixes_nullish = match ast.kind(operand) {
            NodeKind::Logical { operator: inner, .. } => {
                (operator == LogicalOp::Nullish) != (*inner == LogicalOp::Nullish)
            }
            _ => false,
        };
        if mixes_nullish {
            format!("({})", self.expr_inner(operand, depth))
        } else {
            self.expr(operand, min_precedence, depth)
        }
    }

    fn arguments(&mut self, arguments: &[NodeId], depth: usize) -> String {
        let parts: Vec<String> = arguments
            .iter()
            .map(|arg| self.expr(*arg, PREC_ASSIGN, depth))
            .collect();
        parts.join(", ")
    }

    fn has_call_in_chain(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            match self.ast.kind(current) {
                NodeKind::Call { .. } => return true,
                NodeKind::Member { object, .. } => current = *object,
                _ => return false,
            }
        }
    }

    fn property(&mut self, id: NodeId, depth: usize) -> String {
        let ast = self.ast;
        let NodeKind::Property {
            key,
            value,
            computed,
            kind,
        } = ast.kind(id)
        else {
            return self.expr(id, PREC_ASSIGN, depth);
        };
        let key_text = if *computed {
            format!("[{}]", self.expr(*key, PREC_ASSIGN, depth))
        } else {
            self.expr_inner(*key, depth)
        };
        match kind {
            PropertyKind::Init => {
                let value = self.expr(*value, PREC_ASSIGN, depth);
                format!("{key_text}: {value}")
            }
            PropertyKind::Get | PropertyKind::Set => {
                let prefix = if *kind == PropertyKind::Get { "get" } else { "set" };
                let signature = self.signature(*value, depth);
                format!("{prefix} {key_text}{signature}")
            }
        }
    }
}

fn logical_precedence(op: LogicalOp) -> u8 {
    match op {
        LogicalOp::Nullish | LogicalOp::Or => 4,
        LogicalOp::And => 5,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::BitOr => 6,
        BinaryOp::BitXor => 7,
        BinaryOp::BitAnd => 8,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 9,
        BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::InstanceOf => 10,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
        BinaryOp::Add | BinaryOp::Sub => 12,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        BinaryOp::Exp => 14,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn roundtrip(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    #[test]
    fn parenthesizes_in_inside_for_initialiser() {
        let source = "for (var i = (\"x\" in o); i;) {}";
        let printed = roundtrip(source);
        assert_eq!(printed, "for (var i = (\"x\" in o); i;) {}\n");
        assert_eq!(roundtrip(&printed), printed);

        assert_eq!(
            roundtrip("for (x = a && (b in c);;) {}"),
            "for (x = a && (b in c);;) {}\n"
        );
        assert_eq!(roundtrip("x = (\"x\" in o);"), "x = \"x\" in o;\n");
        assert_eq!(roundtrip("for (k in o) {}"), "for (k in o) {}\n");
    }

    #[test]
    fn parenthesizes_by_precedence() {
        assert_eq!(roundtrip("x = (a + b) * c;"), "x = (a + b) * c;\n");
        assert_eq!(roundtrip("x = a - (b - c);"), "x = a - (b - c);\n");
        assert_eq!(roundtrip("x = -(-a);"), "x = - -a;\n");
        assert_eq!(roundtrip("x = (a, b);"), "x = (a, b);\n");
        assert_eq!(roundtrip("(function () {})();"), "(function () {})();\n");
        assert_eq!(roundtrip("new (f())();"), "new (f())();\n");
        assert_eq!(roundtrip("x = (1).toString();"), "x = (1).toString();\n");
    }

    #[test]
    fn block_layout() {
        let source = "function f(a){if(a){return 1}else{return 2}}";
        assert_eq!(
            roundtrip(source),
            "function f(a) {\n  if (a) {\n    return 1;\n  } else {\n    return 2;\n  }\n}\n"
        );
    }

    #[test]
    fn switch_layout() {
        let source = "switch(s){case 1:a();break;default:b()}";
        assert_eq!(
            roundtrip(source),
            "switch (s) {\n  case 1:\n    a();\n    break;\n  default:\n    b();\n}\n"
        );
    }

    #[test]
    fn keeps_comments() {
        let source = "// header\na();\n/* note */\nb();";
        assert_eq!(roundtrip(source), "// header\na();\n/* note */\nb();\n");
    }

    #[test]
    fn raw_strings_until_canonicalised() {
        assert_eq!(roundtrip("x = '\\x41';"), "x = '\\x41';\n");
        assert_eq!(quote_string("a\"b\n\u{1}"), "\"a\\\"b\\n\\x01\"");
    }

    #[test]
    fn array_holes_survive() {
        assert_eq!(roundtrip("x = [1, , 2, ,];"), "x = [1, , 2, ,];\n");
    }

    #[test]
    fn print_single_nodes() {
        let ast = crate::syntax::parse("// c\nvar t = [1, 'a'], u; function f(i) { return t[i]; }").unwrap();
        let declarator = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::VariableDeclarator { .. }))[0];
        assert_eq!(print_node(&ast, declarator), "t = [1, 'a']");
        let function = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::FunctionDeclaration(_)))[0];
        assert_eq!(print_node(&ast, function), "function f(i) {\n  return t[i];\n}");
    }
}
