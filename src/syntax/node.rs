//! Node definitions for the JavaScript syntax tree.
//!
//! Every construct the front end understands is a variant of the closed [`NodeKind`] enum.
//! Children are referenced through [`NodeId`]s into the owning [`crate::syntax::Ast`] arena,
//! which keeps identities stable while passes rewrite the tree in place.

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Stable index of a node inside an [`crate::syntax::Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Byte range of a node in the original source text.
///
/// Synthesized nodes carry the span of the construct they replaced, or an empty span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Offset of the first byte.
    pub start: u32,
    /// Offset one past the last byte.
    pub end: u32,
}

impl Span {
    /// Creates a span from byte offsets.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns true for spans of synthesized nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A single arena slot.
#[derive(Debug, Clone)]
pub struct Node {
    /// The syntactic construct stored in this slot.
    pub kind: NodeKind,
    /// Source range of the construct.
    pub span: Span,
    pub(crate) parent: Option<NodeId>,
}

/// A source comment, kept on the side and re-emitted before the statement that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment body without the delimiters.
    pub text: String,
    /// `true` for `/* */` comments.
    pub block: bool,
    /// Source range including delimiters.
    pub span: Span,
}

/// Declaration keyword of a variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum DeclKind {
    /// `var`
    #[strum(serialize = "var")]
    Var,
    /// `let`
    #[strum(serialize = "let")]
    Let,
    /// `const`
    #[strum(serialize = "const")]
    Const,
}

/// Kind of an object literal property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// `key: value`
    Init,
    /// `get key() {}`
    Get,
    /// `set key(v) {}`
    Set,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum UnaryOp {
    /// `-`
    #[strum(serialize = "-")]
    Minus,
    /// `+`
    #[strum(serialize = "+")]
    Plus,
    /// `!`
    #[strum(serialize = "!")]
    Not,
    /// `~`
    #[strum(serialize = "~")]
    BitNot,
    /// `typeof`
    #[strum(serialize = "typeof")]
    Typeof,
    /// `void`
    #[strum(serialize = "void")]
    Void,
    /// `delete`
    #[strum(serialize = "delete")]
    Delete,
}

/// `++` and `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum UpdateOp {
    /// `++`
    #[strum(serialize = "++")]
    Increment,
    /// `--`
    #[strum(serialize = "--")]
    Decrement,
}

/// Binary operators, excluding the short-circuiting ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum BinaryOp {
    /// `==`
    #[strum(serialize = "==")]
    Eq,
    /// `!=`
    #[strum(serialize = "!=")]
    NotEq,
    /// `===`
    #[strum(serialize = "===")]
    StrictEq,
    /// `!==`
    #[strum(serialize = "!==")]
    StrictNotEq,
    /// `<`
    #[strum(serialize = "<")]
    Lt,
    /// `<=`
    #[strum(serialize = "<=")]
    LtEq,
    /// `>`
    #[strum(serialize = ">")]
    Gt,
    /// `>=`
    #[strum(serialize = ">=")]
    GtEq,
    /// `<<`
    #[strum(serialize = "<<")]
    Shl,
    /// `>>`
    #[strum(serialize = ">>")]
    Shr,
    /// `>>>`
    #[strum(serialize = ">>>")]
    UShr,
    /// `+`
    #[strum(serialize = "+")]
    Add,
    /// `-`
    #[strum(serialize = "-")]
    Sub,
    /// `*`
    #[strum(serialize = "*")]
    Mul,
    /// `/`
    #[strum(serialize = "/")]
    Div,
    /// `%`
    #[strum(serialize = "%")]
    Mod,
    /// `**`
    #[strum(serialize = "**")]
    Exp,
    /// `|`
    #[strum(serialize = "|")]
    BitOr,
    /// `^`
    #[strum(serialize = "^")]
    BitXor,
    /// `&`
    #[strum(serialize = "&")]
    BitAnd,
    /// `in`
    #[strum(serialize = "in")]
    In,
    /// `instanceof`
    #[strum(serialize = "instanceof")]
    InstanceOf,
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum LogicalOp {
    /// `||`
    #[strum(serialize = "||")]
    Or,
    /// `&&`
    #[strum(serialize = "&&")]
    And,
    /// `??`
    #[strum(serialize = "??")]
    Nullish,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum AssignOp {
    /// `=`
    #[strum(serialize = "=")]
    Assign,
    /// `+=`
    #[strum(serialize = "+=")]
    AddAssign,
    /// `-=`
    #[strum(serialize = "-=")]
    SubAssign,
    /// `*=`
    #[strum(serialize = "*=")]
    MulAssign,
    /// `/=`
    #[strum(serialize = "/=")]
    DivAssign,
    /// `%=`
    #[strum(serialize = "%=")]
    ModAssign,
    /// `**=`
    #[strum(serialize = "**=")]
    ExpAssign,
    /// `<<=`
    #[strum(serialize = "<<=")]
    ShlAssign,
    /// `>>=`
    #[strum(serialize = ">>=")]
    ShrAssign,
    /// `>>>=`
    #[strum(serialize = ">>>=")]
    UShrAssign,
    /// `|=`
    #[strum(serialize = "|=")]
    BitOrAssign,
    /// `^=`
    #[strum(serialize = "^=")]
    BitXorAssign,
    /// `&=`
    #[strum(serialize = "&=")]
    BitAndAssign,
    /// `&&=`
    #[strum(serialize = "&&=")]
    AndAssign,
    /// `||=`
    #[strum(serialize = "||=")]
    OrAssign,
    /// `??=`
    #[strum(serialize = "??=")]
    NullishAssign,
}

macro_rules! operator_lookup {
    ($($ty:ty),*) => {
        $(
            impl $ty {
                /// Returns the source spelling of the operator.
                #[must_use]
                pub fn as_str(self) -> &'static str {
                    self.into()
                }

                /// Looks up an operator by its source spelling.
                #[must_use]
                pub fn from_symbol(text: &str) -> Option<Self> {
                    Self::iter().find(|op| op.as_str() == text)
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

operator_lookup!(DeclKind, UnaryOp, UpdateOp, BinaryOp, LogicalOp, AssignOp);

impl BinaryOp {
    /// Returns the operator with swapped truth value (`<` becomes `>=`).
    ///
    /// Relational complements are exact only for non-NaN operands.
    #[must_use]
    pub fn complement(self) -> Option<Self> {
        Some(match self {
            Self::Eq => Self::NotEq,
            Self::NotEq => Self::Eq,
            Self::StrictEq => Self::StrictNotEq,
            Self::StrictNotEq => Self::StrictEq,
            Self::Lt => Self::GtEq,
            Self::GtEq => Self::Lt,
            Self::Gt => Self::LtEq,
            Self::LtEq => Self::Gt,
            _ => return None,
        })
    }
}

/// Function shared by declarations and expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Optional name.
    pub id: Option<NodeId>,
    /// Parameter identifiers.
    pub params: Vec<NodeId>,
    /// Body block.
    pub body: NodeId,
}

/// All syntactic constructs the front end represents.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum NodeKind {
    Program {
        body: Vec<NodeId>,
    },

    // Statements
    ExpressionStatement {
        expression: NodeId,
    },
    Block {
        body: Vec<NodeId>,
    },
    Empty,
    VariableDeclaration {
        kind: DeclKind,
        declarations: Vec<NodeId>,
    },
    VariableDeclarator {
        id: NodeId,
        init: Option<NodeId>,
    },
    FunctionDeclaration(Function),
    Return {
        argument: Option<NodeId>,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    ForIn {
        left: NodeId,
        right: NodeId,
        body: NodeId,
    },
    While {
        test: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        test: NodeId,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Throw {
        argument: NodeId,
    },
    Try {
        block: NodeId,
        handler: Option<NodeId>,
        finalizer: Option<NodeId>,
    },
    CatchClause {
        param: Option<NodeId>,
        body: NodeId,
    },
    Switch {
        discriminant: NodeId,
        cases: Vec<NodeId>,
    },
    SwitchCase {
        test: Option<NodeId>,
        consequent: Vec<NodeId>,
    },
    Labeled {
        label: String,
        body: NodeId,
    },
    Debugger,

    // Expressions
    Identifier {
        name: String,
    },
    NumericLiteral {
        value: f64,
    },
    /// `raw` holds the source spelling until the literal is canonicalised.
    StringLiteral {
        value: String,
        raw: Option<String>,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    RegExpLiteral {
        pattern: String,
        flags: String,
    },
    This,
    Array {
        elements: Vec<Option<NodeId>>,
    },
    Object {
        properties: Vec<NodeId>,
    },
    Property {
        key: NodeId,
        value: NodeId,
        computed: bool,
        kind: PropertyKind,
    },
    FunctionExpression(Function),
    Unary {
        operator: UnaryOp,
        argument: NodeId,
    },
    Update {
        operator: UpdateOp,
        prefix: bool,
        argument: NodeId,
    },
    Binary {
        operator: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Logical {
        operator: LogicalOp,
        left: NodeId,
        right: NodeId,
    },
    Assignment {
        operator: AssignOp,
        target: NodeId,
        value: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    New {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        property: NodeId,
        computed: bool,
    },
    Sequence {
        expressions: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Creates an identifier node kind.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier { name: name.into() }
    }

    /// Creates a string literal that prints in canonical form.
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringLiteral {
            value: value.into(),
            raw: None,
        }
    }

    /// Returns the direct children in source order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_child(|id| out.push(id));
        out
    }

    /// Invokes `f` for each direct child in source order.
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        match self {
            Self::Program { body } | Self::Block { body } => body.iter().copied().for_each(f),
            Self::ExpressionStatement { expression } => f(*expression),
            Self::VariableDeclaration { declarations, .. } => {
                declarations.iter().copied().for_each(f);
            }
            Self::VariableDeclarator { id, init } => {
                f(*id);
                if let Some(init) = init {
                    f(*init);
                }
            }
            Self::FunctionDeclaration(func) | Self::FunctionExpression(func) => {
                if let Some(id) = func.id {
                    f(id);
                }
                func.params.iter().copied().for_each(&mut f);
                f(func.body);
            }
            Self::Return { argument } => {
                if let Some(argument) = argument {
                    f(*argument);
                }
            }
            Self::If {
                test,
                consequent,
                alternate,
            } => {
                f(*test);
                f(*consequent);
                if let Some(alternate) = alternate {
                    f(*alternate);
                }
            }
            Self::For {
                init,
                test,
                update,
                body,
            } => {
                for part in [init, test, update].into_iter().flatten() {
                    f(*part);
                }
                f(*body);
            }
            Self::ForIn { left, right, body } => {
                f(*left);
                f(*right);
                f(*body);
            }
            Self::While { test, body } => {
                f(*test);
                f(*body);
            }
            Self::DoWhile { body, test } => {
                f(*body);
                f(*test);
            }
            Self::Throw { argument } => f(*argument),
            Self::Try {
                block,
                handler,
                finalizer,
            } => {
                f(*block);
                if let Some(handler) = handler {
                    f(*handler);
                }
                if let Some(finalizer) = finalizer {
                    f(*finalizer);
                }
            }
            Self::CatchClause { param, body } => {
                if let Some(param) = param {
                    f(*param);
                }
                f(*body);
            }
            Self::Switch {
                discriminant,
                cases,
            } => {
                f(*discriminant);
                cases.iter().copied().for_each(f);
            }
            Self::SwitchCase { test, consequent } => {
                if let Some(test) = test {
                    f(*test);
                }
                consequent.iter().copied().for_each(f);
            }
            Self::Labeled { body, .. } => f(*body),
            Self::Array { elements } => elements.iter().flatten().copied().for_each(f),
            Self::Object { properties } => properties.iter().copied().for_each(f),
            Self::Property { key, value, .. } => {
                f(*key);
                f(*value);
            }
            Self::Unary { argument, .. } | Self::Update { argument, .. } => f(*argument),
            Self::Binary { left, right, .. } | Self::Logical { left, right, .. } => {
                f(*left);
                f(*right);
            }
            Self::Assignment { target, value, .. } => {
                f(*target);
                f(*value);
            }
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => {
                f(*test);
                f(*consequent);
                f(*alternate);
            }
            Self::Call { callee, arguments } | Self::New { callee, arguments } => {
                f(*callee);
                arguments.iter().copied().for_each(f);
            }
            Self::Member {
                object, property, ..
            } => {
                f(*object);
                f(*property);
            }
            Self::Sequence { expressions } => expressions.iter().copied().for_each(f),
            Self::Empty
            | Self::Break { .. }
            | Self::Continue { .. }
            | Self::Debugger
            | Self::Identifier { .. }
            | Self::NumericLiteral { .. }
            | Self::StringLiteral { .. }
            | Self::BooleanLiteral { .. }
            | Self::NullLiteral
            | Self::RegExpLiteral { .. }
            | Self::This => {}
        }
    }

    /// Returns a copy of this kind with every child id passed through `f`.
    pub fn map_children(&self, f: &mut impl FnMut(NodeId) -> NodeId) -> NodeKind {
        match self {
            Self::Program { body } => Self::Program {
                body: map_ids(body, f),
            },
            Self::Block { body } => Self::Block {
                body: map_ids(body, f),
            },
            Self::ExpressionStatement { expression } => Self::ExpressionStatement {
                expression: f(*expression),
            },
            Self::VariableDeclaration { kind, declarations } => Self::VariableDeclaration {
                kind: *kind,
                declarations: map_ids(declarations, f),
            },
            Self::VariableDeclarator { id, init } => Self::VariableDeclarator {
                id: f(*id),
                init: init.map(&mut *f),
            },
            Self::FunctionDeclaration(func) => Self::FunctionDeclaration(map_function(func, f)),
            Self::FunctionExpression(func) => Self::FunctionExpression(map_function(func, f)),
            Self::Return { argument } => Self::Return {
                argument: argument.map(&mut *f),
            },
            Self::If {
                test,
                consequent,
                alternate,
            } => Self::If {
                test: f(*test),
                consequent: f(*consequent),
                alternate: alternate.map(&mut *f),
            },
            Self::For {
                init,
                test,
                update,
                body,
            } => Self::For {
                init: init.map(&mut *f),
                test: test.map(&mut *f),
                update: update.map(&mut *f),
                body: f(*body),
            },
            Self::ForIn { left, right, body } => Self::ForIn {
                left: f(*left),
                right: f(*right),
                body: f(*body),
            },
            Self::While { test, body } => Self::While {
                test: f(*test),
                body: f(*body),
            },
            Self::DoWhile { body, test } => Self::DoWhile {
                body: f(*body),
                test: f(*test),
            },
            Self::Throw { argument } => Self::Throw {
                argument: f(*argument),
            },
            Self::Try {
                block,
                handler,
                finalizer,
            } => Self::Try {
                block: f(*block),
                handler: handler.map(&mut *f),
                finalizer: finalizer.map(&mut *f),
            },
            Self::CatchClause { param, body } => Self::CatchClause {
                param: param.map(&mut *f),
                body: f(*body),
            },
            Self::Switch {
                discriminant,
                cases,
            } => Self::Switch {
                discriminant: f(*discriminant),
                cases: map_ids(cases, f),
            },
            Self::SwitchCase { test, consequent } => Self::SwitchCase {
                test: test.map(&mut *f),
                consequent: map_ids(consequent, f),
            },
            Self::Labeled { label, body } => Self::Labeled {
                label: label.clone(),
                body: f(*body),
            },
            Self::Array { elements } => Self::Array {
                elements: elements.iter().map(|e| e.map(&mut *f)).collect(),
            },
            Self::Object { properties } => Self::Object {
                properties: map_ids(properties, f),
            },
            Self::Property {
                key,
                value,
                computed,
                kind,
            } => Self::Property {
                key: f(*key),
                value: f(*value),
                computed: *computed,
                kind: *kind,
            },
            Self::Unary { operator, argument } => Self::Unary {
                operator: *operator,
                argument: f(*argument),
            },
            Self::Update {
                operator,
                prefix,
                argument,
            } => Self::Update {
                operator: *operator,
                prefix: *prefix,
                argument: f(*argument),
            },
            Self::Binary {
                operator,
                left,
                right,
            } => Self::Binary {
                operator: *operator,
                left: f(*left),
                right: f(*right),
            },
            Self::Logical {
                operator,
                left,
                right,
            } => Self::Logical {
                operator: *operator,
                left: f(*left),
                right: f(*right),
            },
            Self::Assignment {
                operator,
                target,
                value,
            } => Self::Assignment {
                operator: *operator,
                target: f(*target),
                value: f(*value),
            },
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => Self::Conditional {
                test: f(*test),
                consequent: f(*consequent),
                alternate: f(*alternate),
            },
            Self::Call { callee, arguments } => Self::Call {
                callee: f(*callee),
                arguments: map_ids(arguments, f),
            },
            Self::New { callee, arguments } => Self::New {
                callee: f(*callee),
                arguments: map_ids(arguments, f),
            },
            Self::Member {
                object,
                property,
                computed,
            } => Self::Member {
                object: f(*object),
                property: f(*property),
                computed: *computed,
            },
            Self::Sequence { expressions } => Self::Sequence {
                expressions: map_ids(expressions, f),
            },
            leaf => leaf.clone(),
        }
    }

    /// Returns true for statement kinds.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::ExpressionStatement { .. }
                | Self::Block { .. }
                | Self::Empty
                | Self::VariableDeclaration { .. }
                | Self::FunctionDeclaration(_)
                | Self::Return { .. }
                | Self::If { .. }
                | Self::For { .. }
                | Self::ForIn { .. }
                | Self::While { .. }
                | Self::DoWhile { .. }
                | Self::Break { .. }
                | Self::Continue { .. }
                | Self::Throw { .. }
                | Self::Try { .. }
                | Self::Switch { .. }
                | Self::Labeled { .. }
                | Self::Debugger
        )
    }

    /// Returns true for function declarations and expressions.
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::FunctionDeclaration(_) | Self::FunctionExpression(_))
    }

    /// Returns the function payload of a declaration or expression.
    #[must_use]
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::FunctionDeclaration(func) | Self::FunctionExpression(func) => Some(func),
            _ => None,
        }
    }

    /// Returns the identifier name, if this is an identifier.
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string literal.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::StringLiteral { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Program { .. } => "Program",
            Self::ExpressionStatement { .. } => "ExpressionStatement",
            Self::Block { .. } => "BlockStatement",
            Self::Empty => "EmptyStatement",
            Self::VariableDeclaration { .. } => "VariableDeclaration",
            Self::VariableDeclarator { .. } => "VariableDeclarator",
            Self::FunctionDeclaration(_) => "FunctionDeclaration",
            Self::Return { .. } => "ReturnStatement",
            Self::If { .. } => "IfStatement",
            Self::For { .. } => "ForStatement",
            Self::ForIn { .. } => "ForInStatement",
            Self::While { .. } => "WhileStatement",
            Self::DoWhile { .. } => "DoWhileStatement",
            Self::Break { .. } => "BreakStatement",
            Self::Continue { .. } => "ContinueStatement",
            Self::Throw { .. } => "ThrowStatement",
            Self::Try { .. } => "TryStatement",
            Self::CatchClause { .. } => "CatchClause",
            Self::Switch { .. } => "SwitchStatement",
            Self::SwitchCase { .. } => "SwitchCase",
            Self::Labeled { .. } => "LabeledStatement",
            Self::Debugger => "DebuggerStatement",
            Self::Identifier { .. } => "Identifier",
            Self::NumericLiteral { .. } => "NumericLiteral",
            Self::StringLiteral { .. } => "StringLiteral",
            Self::BooleanLiteral { .. } => "BooleanLiteral",
            Self::NullLiteral => "NullLiteral",
            Self::RegExpLiteral { .. } => "RegExpLiteral",
            Self::This => "ThisExpression",
            Self::Array { .. } => "ArrayExpression",
            Self::Object { .. } => "ObjectExpression",
            Self::Property { .. } => "ObjectProperty",
            Self::FunctionExpression(_) => "FunctionExpression",
            Self::Unary { .. } => "UnaryExpression",
            Self::Update { .. } => "UpdateExpression",
            Self::Binary { .. } => "BinaryExpression",
            Self::Logical { .. } => "LogicalExpression",
            Self::Assignment { .. } => "AssignmentExpression",
            Self::Conditional { .. } => "ConditionalExpression",
            Self::Call { .. } => "CallExpression",
            Self::New { .. } => "NewExpression",
            Self::Member { .. } => "MemberExpression",
            Self::Sequence { .. } => "SequenceExpression",
        }
    }
}

fn map_ids(ids: &[NodeId], f: &mut impl FnMut(NodeId) -> NodeId) -> Vec<NodeId> {
    ids.iter().map(|id| f(*id)).collect()
}

fn map_function(func: &Function, f: &mut impl FnMut(NodeId) -> NodeId) -> Function {
    Function {
        id: func.id.map(&mut *f),
        params: map_ids(&func.params, f),
        body: f(func.body),
    }
}

/// Reserved words that can never be used as a plain identifier reference.
pub const RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
];

/// Returns true if `text` is a valid `IdentifierName` (reserved words allowed).
///
/// This is the condition for printing `obj["text"]` as `obj.text`.
#[must_use]
pub fn is_identifier_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_id_start(c) => chars.all(is_id_continue),
        _ => false,
    }
}

/// Returns true if `text` can be used as an identifier reference.
#[must_use]
pub fn is_valid_identifier(text: &str) -> bool {
    is_identifier_name(text) && !RESERVED_WORDS.contains(&text)
}

pub(crate) fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

pub(crate) fn is_id_continue(c: char) -> bool {
    is_id_start(c)
        || c.is_ascii_digit()
        || c == '\u{200c}'
        || c == '\u{200d}'
        || (!c.is_ascii() && c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_spelling_round_trips() {
        for op in BinaryOp::iter() {
            assert_eq!(BinaryOp::from_symbol(op.as_str()), Some(op));
        }
        assert_eq!(AssignOp::from_symbol(">>>="), Some(AssignOp::UShrAssign));
        assert_eq!(UnaryOp::from_symbol("typeof"), Some(UnaryOp::Typeof));
        assert_eq!(LogicalOp::from_symbol("&"), None);
    }

    #[test]
    fn complement_pairs() {
        assert_eq!(BinaryOp::Lt.complement(), Some(BinaryOp::GtEq));
        assert_eq!(BinaryOp::Gt.complement(), Some(BinaryOp::LtEq));
        assert_eq!(BinaryOp::StrictEq.complement(), Some(BinaryOp::StrictNotEq));
        assert_eq!(BinaryOp::Add.complement(), None);
    }

    #[test]
    fn identifier_names() {
        assert!(is_identifier_name("fromCharCode"));
        assert!(is_identifier_name("$_a1"));
        assert!(is_identifier_name("default"));
        assert!(!is_valid_identifier("default"));
        assert!(!is_identifier_name("1abc"));
        assert!(!is_identifier_name("a-b"));
        assert!(!is_identifier_name(""));
    }
}
