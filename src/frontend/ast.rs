//! Syntax tree for the TypeScript subset understood by the reference frontend.

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<pest::Span<'_>> for Span {
    fn from(span: pest::Span<'_>) -> Self {
        Self {
            start: span.start(),
            end: span.end(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Ident(Ident),
    Array(Vec<Ident>),
}

impl Binding {
    pub fn names(&self) -> Vec<&Ident> {
        match self {
            Binding::Ident(ident) => vec![ident],
            Binding::Array(elements) => elements.iter().collect(),
        }
    }
}

/// A parameter in a signature, arrow function, or function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub optional: bool,
    pub rest: bool,
    /// Source text of the type annotation, if any.
    pub ty: Option<String>,
}

/// `function name<T>(params): ReturnType;` as written in a declaration file.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
}

impl FunctionSignature {
    pub fn min_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.optional && !p.rest)
            .count()
    }

    /// `None` when a rest parameter accepts any number of trailing arguments.
    pub fn max_args(&self) -> Option<usize> {
        if self.params.iter().any(|p| p.rest) {
            None
        } else {
            Some(self.params.len())
        }
    }

    pub fn returns_multiple(&self) -> bool {
        self.return_type
            .as_deref()
            .is_some_and(|ty| ty.starts_with("LuaMultiReturn"))
    }

    pub fn returns_iterable(&self) -> bool {
        self.return_type
            .as_deref()
            .is_some_and(|ty| ty.starts_with("LuaIterable"))
    }
}

/// Ambient declarations introduced with `declare`.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Function(FunctionSignature),
    Variable { name: String, ty: String },
    Namespace { name: String, members: Vec<Declaration> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var {
        kind: VarKind,
        binding: Binding,
        init: Option<Expr>,
        span: Span,
    },
    Function {
        name: Ident,
        params: Vec<Param>,
        body: Vec<Stmt>,
        span: Span,
    },
    Assign {
        target: Expr,
        value: Expr,
        span: Span,
    },
    ForOf {
        binding: Binding,
        iterable: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    Return(Option<Expr>, Span),
    Block(Vec<Stmt>, Span),
    Expr(Expr),
    Declare(Declaration, Span),
    /// `interface` and `type` declarations; erased during lowering.
    TypeOnly(Span),
    Empty(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    StrictEq,
    StrictNe,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitOr
                | BinaryOp::BitXor
                | BinaryOp::BitAnd
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::UShr
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub spread: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as written.
    Number(String, Span),
    /// String literal with escapes resolved.
    String(String, Span),
    Bool(bool, Span),
    /// `null` and `undefined`.
    Nil(Span),
    Ident(Ident),
    Array(Vec<Arg>, Span),
    Object(Vec<(String, Expr)>, Span),
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: Ident,
    },
    NonNull(Box<Expr>),
    Paren(Box<Expr>, Span),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Arrow {
        params: Vec<Param>,
        body: ArrowBody,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span)
            | Expr::String(_, span)
            | Expr::Bool(_, span)
            | Expr::Nil(span)
            | Expr::Array(_, span)
            | Expr::Object(_, span)
            | Expr::Call { span, .. }
            | Expr::Paren(_, span)
            | Expr::Unary { span, .. }
            | Expr::Arrow { span, .. } => *span,
            Expr::Ident(ident) => ident.span,
            Expr::Member { object, property } => Span {
                start: object.span().start,
                end: property.span.end,
            },
            Expr::NonNull(inner) => inner.span(),
            Expr::Binary { lhs, rhs, .. } => Span {
                start: lhs.span().start,
                end: rhs.span().end,
            },
        }
    }

    /// Strip non-null assertions and parentheses, which do not change the value.
    pub fn unwrapped(&self) -> &Expr {
        match self {
            Expr::NonNull(inner) | Expr::Paren(inner, _) => inner.unwrapped(),
            other => other,
        }
    }
}
