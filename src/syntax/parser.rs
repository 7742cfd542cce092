//! Recursive-descent parser producing an arena [`Ast`].
//!
//! Covers ES5 scripts plus `let`/`const`, `**`, `??` and shorthand object members. Arrow
//! functions, classes, template literals, destructuring, spread and modules are rejected
//! with a positioned [`Error::Parse`].

use crate::{
    syntax::{
        lexer::{line_col, tokenize, Token, TokenKind},
        node::{
            AssignOp, BinaryOp, DeclKind, Function, LogicalOp, NodeId, NodeKind, PropertyKind,
            Span, UnaryOp, UpdateOp, RESERVED_WORDS,
        },
        Ast,
    },
    Error, Result,
};

/// Parses a script into a syntax tree.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the line and column of the first offending token.
pub fn parse(source: &str) -> Result<Ast> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens: tokens.tokens,
        pos: 0,
        ast: Ast::new(),
        no_in: false,
        last_end: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    let root = parser.ast.root();
    parser.ast.replace(root, NodeKind::Program { body });
    parser.ast.set_span(root, Span::new(0, source.len() as u32));
    parser.ast.set_comments(tokens.comments);
    Ok(parser.ast)
}

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    no_in: bool,
    last_end: u32,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn start(&self) -> u32 {
        self.peek().span.start
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Punct(p) if *p == punct)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if w == word)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.last_end = token.span.end;
        token
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected `{punct}`")))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected `{word}`")))
        }
    }

    fn error_at(&self, offset: u32, message: impl Into<String>) -> Error {
        let (line, column) = line_col(self.source, offset as usize);
        Error::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    fn unexpected(&self, context: &str) -> Error {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Word(word) => format!("`{word}`"),
            TokenKind::Number(_) => "number".to_string(),
            TokenKind::String { .. } => "string".to_string(),
            TokenKind::RegExp { .. } => "regular expression".to_string(),
            TokenKind::Punct(p) => format!("`{p}`"),
            TokenKind::Eof => "end of input".to_string(),
        };
        self.error_at(token.span.start, format!("{context}, found {found}"))
    }

    fn finish(&mut self, kind: NodeKind, start: u32) -> NodeId {
        let end = self.last_end.max(start);
        self.ast.alloc(kind, Span::new(start, end))
    }

    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat_punct(";") {
            return Ok(());
        }
        if self.is_punct("}") || self.at_eof() || self.peek().newline_before {
            return Ok(());
        }
        Err(self.unexpected("expected `;`"))
    }

    fn with_in<T>(&mut self, allowed: bool, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.no_in;
        self.no_in = !allowed;
        let result = f(self);
        self.no_in = saved;
        result
    }

    // Statements

    fn statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        let word = match &self.peek().kind {
            TokenKind::Punct("{") => return self.block(),
            TokenKind::Punct(";") => {
                self.advance();
                return Ok(self.finish(NodeKind::Empty, start));
            }
            TokenKind::Word(word) => word.clone(),
            _ => return self.expression_statement(),
        };

        match word.as_str() {
            "var" | "const" => self.declaration_statement(),
            "let" if self.let_starts_declaration() => self.declaration_statement(),
            "function" => self.function(true),
            "if" => self.if_statement(),
            "for" => self.for_statement(),
            "while" => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.with_in(true, Self::expression)?;
                self.expect_punct(")")?;
                let body = self.statement()?;
                Ok(self.finish(NodeKind::While { test, body }, start))
            }
            "do" => {
                self.advance();
                let body = self.statement()?;
                self.expect_word("while")?;
                self.expect_punct("(")?;
                let test = self.with_in(true, Self::expression)?;
                self.expect_punct(")")?;
                self.eat_punct(";");
                Ok(self.finish(NodeKind::DoWhile { body, test }, start))
            }
            "return" => {
                self.advance();
                let argument = if self.is_punct(";")
                    || self.is_punct("}")
                    || self.at_eof()
                    || self.peek().newline_before
                {
                    None
                } else {
                    Some(self.with_in(true, Self::expression)?)
                };
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::Return { argument }, start))
            }
            "break" | "continue" => {
                self.advance();
                let label = match &self.peek().kind {
                    TokenKind::Word(label)
                        if !self.peek().newline_before
                            && !RESERVED_WORDS.contains(&label.as_str()) =>
                    {
                        let label = label.clone();
                        self.advance();
                        Some(label)
                    }
                    _ => None,
                };
                self.consume_semicolon()?;
                let kind = if word == "break" {
                    NodeKind::Break { label }
                } else {
                    NodeKind::Continue { label }
                };
                Ok(self.finish(kind, start))
            }
            "throw" => {
                self.advance();
                let argument = self.with_in(true, Self::expression)?;
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::Throw { argument }, start))
            }
            "try" => self.try_statement(),
            "switch" => self.switch_statement(),
            "debugger" => {
                self.advance();
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::Debugger, start))
            }
            "with" | "class" | "import" | "export" | "async" if !self.next_is_colon() => {
                Err(self.error_at(start, format!("`{word}` is not supported")))
            }
            _ if self.next_is_colon() && !RESERVED_WORDS.contains(&word.as_str()) => {
                self.advance();
                self.advance();
                let body = self.statement()?;
                Ok(self.finish(NodeKind::Labeled { label: word, body }, start))
            }
            _ => self.expression_statement(),
        }
    }

    fn next_is_colon(&self) -> bool {
        matches!(self.peek_at(1).kind, TokenKind::Punct(":"))
    }

    fn let_starts_declaration(&self) -> bool {
        matches!(&self.peek_at(1).kind, TokenKind::Word(w) if !RESERVED_WORDS.contains(&w.as_str()))
    }

    fn expression_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        let expression = self.with_in(true, Self::expression)?;
        self.consume_semicolon()?;
        Ok(self.finish(NodeKind::ExpressionStatement { expression }, start))
    }

    fn block(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("expected `}`"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(self.finish(NodeKind::Block { body }, start))
    }

    fn declaration_statement(&mut self) -> Result<NodeId> {
        let declaration = self.variable_declaration()?;
        self.consume_semicolon()?;
        Ok(declaration)
    }

    fn variable_declaration(&mut self) -> Result<NodeId> {
        let start = self.start();
        let kind = match &self.advance().kind {
            TokenKind::Word(w) if w == "let" => DeclKind::Let,
            TokenKind::Word(w) if w == "const" => DeclKind::Const,
            _ => DeclKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let declarator_start = self.start();
            let id = self.binding_identifier()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            declarations.push(self.finish(NodeKind::VariableDeclarator { id, init }, declarator_start));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(self.finish(NodeKind::VariableDeclaration { kind, declarations }, start))
    }

    fn binding_identifier(&mut self) -> Result<NodeId> {
        let start = self.start();
        match &self.peek().kind {
            TokenKind::Word(name) if !RESERVED_WORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(self.finish(NodeKind::Identifier { name }, start))
            }
            TokenKind::Punct("[" | "{") => {
                Err(self.error_at(start, "destructuring patterns are not supported"))
            }
            _ => Err(self.unexpected("expected identifier")),
        }
    }

    fn function(&mut self, declaration: bool) -> Result<NodeId> {
        let start = self.start();
        self.expect_word("function")?;
        if self.is_punct("*") {
            return Err(self.error_at(start, "generator functions are not supported"));
        }
        let id = if declaration || matches!(self.peek().kind, TokenKind::Word(_)) {
            Some(self.binding_identifier()?)
        } else {
            None
        };
        let func = self.function_rest(id)?;
        let kind = if declaration {
            NodeKind::FunctionDeclaration(func)
        } else {
            NodeKind::FunctionExpression(func)
        };
        Ok(self.finish(kind, start))
    }

    fn function_rest(&mut self, id: Option<NodeId>) -> Result<Function> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.is_punct(")") {
            if self.is_punct("...") {
                return Err(self.unexpected("rest parameters are not supported"));
            }
            params.push(self.binding_identifier()?);
            if self.is_punct("=") {
                return Err(self.unexpected("default parameters are not supported"));
            }
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        self.advance();
        let body = self.with_in(true, Self::block)?;
        Ok(Function { id, params, body })
    }

    fn if_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.advance();
        self.expect_punct("(")?;
        let test = self.with_in(true, Self::expression)?;
        self.expect_punct(")")?;
        let consequent = self.statement()?;
        let alternate = if self.eat_word("else") {
            Some(self.statement()?)
        } else {
            None
        };
        Ok(self.finish(
            NodeKind::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn for_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.advance();
        if self.is_word("await") {
            return Err(self.error_at(start, "`for await` is not supported"));
        }
        self.expect_punct("(")?;

        let init = if self.is_punct(";") {
            None
        } else if self.is_word("var")
            || self.is_word("const")
            || (self.is_word("let") && self.let_starts_declaration())
        {
            Some(self.with_in(false, Self::variable_declaration)?)
        } else {
            Some(self.with_in(false, Self::expression)?)
        };

        if let Some(left) = init {
            if self.eat_word("in") {
                let right = self.with_in(true, Self::expression)?;
                self.expect_punct(")")?;
                let body = self.statement()?;
                return Ok(self.finish(NodeKind::ForIn { left, right, body }, start));
            }
            if self.is_word("of") {
                return Err(self.error_at(start, "`for ... of` is not supported"));
            }
        }

        self.expect_punct(";")?;
        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.with_in(true, Self::expression)?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.with_in(true, Self::expression)?)
        };
        self.expect_punct(")")?;
        let body = self.statement()?;
        Ok(self.finish(
            NodeKind::For {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    fn try_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.advance();
        let block = self.block()?;
        let handler = if self.is_word("catch") {
            let catch_start = self.start();
            self.advance();
            let param = if self.eat_punct("(") {
                let param = self.binding_identifier()?;
                self.expect_punct(")")?;
                Some(param)
            } else {
                None
            };
            let body = self.block()?;
            Some(self.finish(NodeKind::CatchClause { param, body }, catch_start))
        } else {
            None
        };
        let finalizer = if self.eat_word("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("expected `catch` or `finally`"));
        }
        Ok(self.finish(
            NodeKind::Try {
                block,
                handler,
                finalizer,
            },
            start,
        ))
    }

    fn switch_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.advance();
        self.expect_punct("(")?;
        let discriminant = self.with_in(true, Self::expression)?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;
        let mut cases = Vec::new();
        while !self.eat_punct("}") {
            let case_start = self.start();
            let test = if self.eat_word("case") {
                Some(self.with_in(true, Self::expression)?)
            } else if self.eat_word("default") {
                None
            } else {
                return Err(self.unexpected("expected `case` or `default`"));
            };
            self.expect_punct(":")?;
            let mut consequent = Vec::new();
            while !self.is_word("case") && !self.is_word("default") && !self.is_punct("}") {
                if self.at_eof() {
                    return Err(self.unexpected("expected `}`"));
                }
                consequent.push(self.statement()?);
            }
            cases.push(self.finish(NodeKind::SwitchCase { test, consequent }, case_start));
        }
        Ok(self.finish(
            NodeKind::Switch {
                discriminant,
                cases,
            },
            start,
        ))
    }

    // Expressions

    fn expression(&mut self) -> Result<NodeId> {
        let start = self.start();
        let first = self.assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(",") {
            expressions.push(self.assignment()?);
        }
        Ok(self.finish(NodeKind::Sequence { expressions }, start))
    }

    fn assignment(&mut self) -> Result<NodeId> {
        let start = self.start();
        let target = self.conditional()?;
        let operator = match &self.peek().kind {
            TokenKind::Punct("=>") => {
                return Err(self.unexpected("arrow functions are not supported"));
            }
            TokenKind::Punct(p) => AssignOp::from_symbol(p),
            _ => None,
        };
        let Some(operator) = operator else {
            return Ok(target);
        };
        if !matches!(
            self.ast.kind(target),
            NodeKind::Identifier { .. } | NodeKind::Member { .. }
        ) {
            return Err(self.error_at(start, "invalid assignment target"));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(self.finish(
            NodeKind::Assignment {
                operator,
                target,
                value,
            },
            start,
        ))
    }

    fn conditional(&mut self) -> Result<NodeId> {
        let start = self.start();
        let test = self.binary(0)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.with_in(true, Self::assignment)?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(self.finish(
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn infix(&self) -> Option<(u8, Infix)> {
        match &self.peek().kind {
            TokenKind::Word(w) if w == "in" && !self.no_in => Some((8, Infix::Binary(BinaryOp::In))),
            TokenKind::Word(w) if w == "instanceof" => {
                Some((8, Infix::Binary(BinaryOp::InstanceOf)))
            }
            TokenKind::Punct(p) => {
                if let Some(op) = LogicalOp::from_symbol(p) {
                    let precedence = match op {
                        LogicalOp::Nullish => 1,
                        LogicalOp::Or => 2,
                        LogicalOp::And => 3,
                    };
                    return Some((precedence, Infix::Logical(op)));
                }
                let op = BinaryOp::from_symbol(p)?;
                Some((binary_precedence(op), Infix::Binary(op)))
            }
            _ => None,
        }
    }

    fn binary(&mut self, min_precedence: u8) -> Result<NodeId> {
        let start = self.start();
        let mut left = self.unary()?;
        while let Some((precedence, infix)) = self.infix() {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right_assoc = matches!(infix, Infix::Binary(BinaryOp::Exp));
            let right = self.binary(if right_assoc { precedence } else { precedence + 1 })?;
            let kind = match infix {
                Infix::Binary(operator) => NodeKind::Binary {
                    operator,
                    left,
                    right,
                },
                Infix::Logical(operator) => NodeKind::Logical {
                    operator,
                    left,
                    right,
                },
            };
            left = self.finish(kind, start);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<NodeId> {
        let start = self.start();
        let unary = match &self.peek().kind {
            TokenKind::Punct(p @ ("!" | "~" | "+" | "-")) => UnaryOp::from_symbol(p),
            TokenKind::Word(w) if matches!(w.as_str(), "typeof" | "void" | "delete") => {
                UnaryOp::from_symbol(w)
            }
            TokenKind::Punct(p @ ("++" | "--")) => {
                let operator = if *p == "++" {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let argument = self.unary()?;
                self.check_update_target(argument, start)?;
                return Ok(self.finish(
                    NodeKind::Update {
                        operator,
                        prefix: true,
                        argument,
                    },
                    start,
                ));
            }
            _ => None,
        };
        if let Some(operator) = unary {
            self.advance();
            let argument = self.unary()?;
            return Ok(self.finish(NodeKind::Unary { operator, argument }, start));
        }

        let argument = self.lhs()?;
        let postfix = match &self.peek().kind {
            TokenKind::Punct("++") if !self.peek().newline_before => Some(UpdateOp::Increment),
            TokenKind::Punct("--") if !self.peek().newline_before => Some(UpdateOp::Decrement),
            _ => None,
        };
        match postfix {
            Some(operator) => {
                self.check_update_target(argument, start)?;
                self.advance();
                Ok(self.finish(
                    NodeKind::Update {
                        operator,
                        prefix: false,
                        argument,
                    },
                    start,
                ))
            }
            None => Ok(argument),
        }
    }

    fn check_update_target(&self, argument: NodeId, start: u32) -> Result<()> {
        if matches!(
            self.ast.kind(argument),
            NodeKind::Identifier { .. } | NodeKind::Member { .. }
        ) {
            Ok(())
        } else {
            Err(self.error_at(start, "invalid update target"))
        }
    }

    fn lhs(&mut self) -> Result<NodeId> {
        let start = self.start();
        let mut expr = if self.is_word("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };
        loop {
            if let Some(member) = self.member_suffix(expr, start)? {
                expr = member;
            } else if self.is_punct("(") {
                let arguments = self.arguments()?;
                expr = self.finish(
                    NodeKind::Call {
                        callee: expr,
                        arguments,
                    },
                    start,
                );
            } else if self.is_punct("?.") {
                return Err(self.unexpected("optional chaining is not supported"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn member_suffix(&mut self, object: NodeId, start: u32) -> Result<Option<NodeId>> {
        if self.eat_punct(".") {
            let property_start = self.start();
            let name = match &self.peek().kind {
                TokenKind::Word(name) => name.clone(),
                _ => return Err(self.unexpected("expected property name")),
            };
            self.advance();
            let property = self.finish(NodeKind::Identifier { name }, property_start);
            return Ok(Some(self.finish(
                NodeKind::Member {
                    object,
                    property,
                    computed: false,
                },
                start,
            )));
        }
        if self.eat_punct("[") {
            let property = self.with_in(true, Self::expression)?;
            self.expect_punct("]")?;
            return Ok(Some(self.finish(
                NodeKind::Member {
                    object,
                    property,
                    computed: true,
                },
                start,
            )));
        }
        Ok(None)
    }

    fn new_expression(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect_word("new")?;
        let mut callee = if self.is_word("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };
        while let Some(member) = self.member_suffix(callee, start)? {
            callee = member;
        }
        let arguments = if self.is_punct("(") {
            self.arguments()?
        } else {
            Vec::new()
        };
        Ok(self.finish(NodeKind::New { callee, arguments }, start))
    }

    fn arguments(&mut self) -> Result<Vec<NodeId>> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.is_punct(")") {
            if self.is_punct("...") {
                return Err(self.unexpected("spread arguments are not supported"));
            }
            arguments.push(self.with_in(true, Self::assignment)?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        self.advance();
        Ok(arguments)
    }

    fn primary(&mut self) -> Result<NodeId> {
        let start = self.start();
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Word(word) => match word.as_str() {
                "function" => return self.function(false),
                "this" => NodeKind::This,
                "null" => NodeKind::NullLiteral,
                "true" => NodeKind::BooleanLiteral { value: true },
                "false" => NodeKind::BooleanLiteral { value: false },
                w if RESERVED_WORDS.contains(&w) => {
                    return Err(self.unexpected("expected expression"));
                }
                _ => NodeKind::Identifier { name: word.clone() },
            },
            TokenKind::Number(value) => NodeKind::NumericLiteral { value },
            TokenKind::String { value, raw } => NodeKind::StringLiteral {
                value,
                raw: Some(raw),
            },
            TokenKind::RegExp { pattern, flags } => NodeKind::RegExpLiteral { pattern, flags },
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.with_in(true, Self::expression)?;
                self.expect_punct(")")?;
                return Ok(expr);
            }
            TokenKind::Punct("[") => return self.array(),
            TokenKind::Punct("{") => return self.object(),
            _ => return Err(self.unexpected("expected expression")),
        };
        self.advance();
        Ok(self.finish(kind, start))
    }

    fn array(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        loop {
            if self.eat_punct("]") {
                break;
            }
            if self.eat_punct(",") {
                elements.push(None);
                continue;
            }
            if self.is_punct("...") {
                return Err(self.unexpected("spread elements are not supported"));
            }
            elements.push(Some(self.with_in(true, Self::assignment)?));
            if !self.is_punct("]") {
                self.expect_punct(",")?;
            }
        }
        Ok(self.finish(NodeKind::Array { elements }, start))
    }

    fn object(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.eat_punct("}") {
            properties.push(self.property()?);
            if !self.is_punct("}") {
                self.expect_punct(",")?;
            }
        }
        Ok(self.finish(NodeKind::Object { properties }, start))
    }

    fn property(&mut self) -> Result<NodeId> {
        let start = self.start();
        let accessor = match &self.peek().kind {
            TokenKind::Word(w) if w == "get" => Some(PropertyKind::Get),
            TokenKind::Word(w) if w == "set" => Some(PropertyKind::Set),
            _ => None,
        };
        let accessor = accessor.filter(|_| {
            !matches!(
                self.peek_at(1).kind,
                TokenKind::Punct(":" | "(" | "," | "}")
            )
        });
        if let Some(kind) = accessor {
            self.advance();
            let (key, computed) = self.property_key()?;
            let func_start = self.start();
            let func = self.function_rest(None)?;
            let value = self.finish(NodeKind::FunctionExpression(func), func_start);
            return Ok(self.finish(
                NodeKind::Property {
                    key,
                    value,
                    computed,
                    kind,
                },
                start,
            ));
        }

        let (key, computed) = self.property_key()?;
        let value = if self.eat_punct(":") {
            self.with_in(true, Self::assignment)?
        } else if self.is_punct("(") {
            let func_start = self.start();
            let func = self.function_rest(None)?;
            self.finish(NodeKind::FunctionExpression(func), func_start)
        } else {
            match self.ast.kind(key).clone() {
                NodeKind::Identifier { name } if !computed => {
                    let span = self.ast.span(key);
                    self.ast.alloc(NodeKind::Identifier { name }, span)
                }
                _ => return Err(self.unexpected("expected `:`")),
            }
        };
        Ok(self.finish(
            NodeKind::Property {
                key,
                value,
                computed,
                kind: PropertyKind::Init,
            },
            start,
        ))
    }

    fn property_key(&mut self) -> Result<(NodeId, bool)> {
        let start = self.start();
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Word(name) => NodeKind::Identifier { name },
            TokenKind::String { value, raw } => NodeKind::StringLiteral {
                value,
                raw: Some(raw),
            },
            TokenKind::Number(value) => NodeKind::NumericLiteral { value },
            TokenKind::Punct("[") => {
                self.advance();
                let key = self.with_in(true, Self::assignment)?;
                self.expect_punct("]")?;
                return Ok((key, true));
            }
            _ => return Err(self.unexpected("expected property name")),
        };
        self.advance();
        Ok((self.finish(kind, start), false))
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::BitOr => 4,
        BinaryOp::BitXor => 5,
        BinaryOp::BitAnd => 6,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 7,
        BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::InstanceOf => 8,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 9,
        BinaryOp::Add | BinaryOp::Sub => 10,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 11,
        BinaryOp::Exp => 12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(ast: &Ast) -> Vec<NodeId> {
        match ast.kind(ast.root()) {
            NodeKind::Program { body } => body.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn precedence() {
        let ast = parse("a + b * c;").unwrap();
        let NodeKind::ExpressionStatement { expression } = ast.kind(body(&ast)[0]) else {
            panic!("expected expression statement");
        };
        let NodeKind::Binary {
            operator, right, ..
        } = ast.kind(*expression)
        else {
            panic!("expected binary");
        };
        assert_eq!(*operator, BinaryOp::Add);
        assert!(matches!(
            ast.kind(*right),
            NodeKind::Binary {
                operator: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn automatic_semicolons() {
        let ast = parse("var a = 1\nvar b = 2\nreturn_value()\n").unwrap();
        assert_eq!(body(&ast).len(), 3);
    }

    #[test]
    fn for_in_and_classic_for() {
        let ast = parse("for (var k in o) {} for (var i = 0; i < 3; i++) {}").unwrap();
        let stmts = body(&ast);
        assert!(matches!(ast.kind(stmts[0]), NodeKind::ForIn { .. }));
        assert!(matches!(ast.kind(stmts[1]), NodeKind::For { .. }));
    }

    #[test]
    fn object_literal_forms() {
        let ast = parse(r#"x = { a: 1, "b": 2, 3: c, [d]: 4, get e() { return 5; }, f };"#);
        assert!(ast.is_ok());
    }

    #[test]
    fn array_holes() {
        let ast = parse("x = [1, , 2, ];").unwrap();
        let array = ast
            .live_nodes()
            .into_iter()
            .find(|id| matches!(ast.kind(*id), NodeKind::Array { .. }))
            .unwrap();
        let NodeKind::Array { elements } = ast.kind(array) else {
            unreachable!()
        };
        assert_eq!(elements.len(), 3);
        assert!(elements[1].is_none());
    }

    #[test]
    fn labeled_switch_and_try() {
        let source = "outer: for (;;) { switch (s) { case 1: break outer; default: continue; } }\n\
                      try { a(); } catch (e) { b(e); } finally { c(); }";
        assert!(parse(source).is_ok());
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(matches!(parse("var f = (a) => a;"), Err(Error::Parse { .. })));
        assert!(matches!(parse("class A {}"), Err(Error::Parse { .. })));
        let err = parse("var a = ;").unwrap_err();
        assert!(err.to_string().contains("1:9"));
    }
}
