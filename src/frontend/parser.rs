//! Pest-based parser for the TypeScript subset.
//!
//! The parser is purely syntactic. Failures are returned as a [`SyntaxError`]
//! which program construction turns into a diagnostic instead of aborting.

use once_cell::sync::Lazy;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use super::ast::{
    Arg, ArrowBody, BinaryOp, Binding, Declaration, Expr, FunctionSignature, Ident, Param, Span,
    Stmt, UnaryOp, VarKind,
};

#[derive(Parser)]
#[grammar = "frontend/grammar.pest"]
struct TypeScriptParser;

static PRATT: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::bit_or, Assoc::Left))
        .op(Op::infix(Rule::bit_xor, Assoc::Left))
        .op(Op::infix(Rule::bit_and, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::shl, Assoc::Left)
            | Op::infix(Rule::shr, Assoc::Left)
            | Op::infix(Rule::ushr, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::modulo, Assoc::Left))
        .op(Op::prefix(Rule::not_op) | Op::prefix(Rule::neg_op) | Op::prefix(Rule::bitnot_op))
        .op(Op::postfix(Rule::call_args)
            | Op::postfix(Rule::member)
            | Op::postfix(Rule::non_null))
});

/// A parse failure at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse a whole source file into statements.
pub fn parse_source(text: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let mut pairs = TypeScriptParser::parse(Rule::program, text).map_err(|error| {
        let offset = match error.location {
            InputLocation::Pos(pos) => pos,
            InputLocation::Span((start, _)) => start,
        };
        SyntaxError {
            offset,
            message: error.variant.message().into_owned(),
        }
    })?;

    let program = pairs.next().unwrap(); // pest guarantees program rule exists
    Ok(program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_statement)
        .collect())
}

// ============================================================================
// STATEMENTS
// ============================================================================

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_const
            | Rule::kw_let
            | Rule::kw_var
            | Rule::kw_function
            | Rule::kw_declare
            | Rule::kw_namespace
            | Rule::kw_interface
            | Rule::kw_type
            | Rule::kw_extends
            | Rule::kw_readonly
            | Rule::kw_for
            | Rule::kw_of
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_return
    )
}

/// Inner pairs without keyword tokens.
fn significant(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn build_statement(pair: Pair<Rule>) -> Stmt {
    let span = Span::from(pair.as_span());

    match pair.as_rule() {
        Rule::declare_stmt => {
            let declaration = significant(pair).next().unwrap(); // grammar guarantees a declaration
            Stmt::Declare(build_declaration(declaration), span)
        }

        Rule::interface_decl | Rule::type_alias => Stmt::TypeOnly(span),

        Rule::function_decl => {
            let mut inner = significant(pair);
            let name = build_ident(inner.next().unwrap()); // grammar guarantees a name
            let mut params = Vec::new();
            let mut body = Vec::new();
            for part in inner {
                match part.as_rule() {
                    Rule::params => params = build_params(part),
                    Rule::block => body = build_block(part),
                    _ => {}
                }
            }
            Stmt::Function {
                name,
                params,
                body,
                span,
            }
        }

        Rule::var_stmt => {
            let mut inner = pair.into_inner();
            let kind = build_var_kind(inner.next().unwrap()); // grammar guarantees var_kind
            let binding = build_binding(inner.next().unwrap()); // grammar guarantees binding
            let init = inner.find(|p| p.as_rule() == Rule::expr).map(build_expr);
            Stmt::Var {
                kind,
                binding,
                init,
                span,
            }
        }

        Rule::for_of_stmt => {
            let mut inner = significant(pair);
            let _kind = inner.next();
            let binding = build_binding(inner.next().unwrap()); // grammar guarantees binding
            let iterable = build_expr(inner.next().unwrap()); // grammar guarantees iterable
            let body = build_statement(inner.next().unwrap()); // grammar guarantees body
            Stmt::ForOf {
                binding,
                iterable,
                body: Box::new(body),
                span,
            }
        }

        Rule::if_stmt => {
            let mut inner = significant(pair);
            let condition = build_expr(inner.next().unwrap()); // grammar guarantees condition
            let then_branch = build_statement(inner.next().unwrap()); // grammar guarantees branch
            let else_branch = inner.next().map(|p| Box::new(build_statement(p)));
            Stmt::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch,
                span,
            }
        }

        Rule::return_stmt => Stmt::Return(significant(pair).next().map(build_expr), span),

        Rule::block => Stmt::Block(build_block(pair), span),

        Rule::empty_stmt => Stmt::Empty(span),

        Rule::assign_stmt => {
            let mut inner = pair.into_inner();
            let target = build_assign_target(inner.next().unwrap()); // grammar guarantees target
            let value = build_expr(inner.next().unwrap()); // grammar guarantees value
            Stmt::Assign {
                target,
                value,
                span,
            }
        }

        Rule::expr_stmt => Stmt::Expr(build_expr(pair.into_inner().next().unwrap())), // grammar guarantees an expression

        rule => unreachable!("statement rule {:?} is not produced by the grammar", rule),
    }
}

fn build_block(pair: Pair<Rule>) -> Vec<Stmt> {
    pair.into_inner().map(build_statement).collect()
}

fn build_var_kind(pair: Pair<Rule>) -> VarKind {
    match pair.into_inner().next().map(|p| p.as_rule()) {
        Some(Rule::kw_let) => VarKind::Let,
        Some(Rule::kw_var) => VarKind::Var,
        _ => VarKind::Const,
    }
}

fn build_binding(pair: Pair<Rule>) -> Binding {
    match pair.as_rule() {
        Rule::array_pattern => Binding::Array(pair.into_inner().map(build_ident).collect()),
        _ => Binding::Ident(build_ident(pair)),
    }
}

fn build_ident(pair: Pair<Rule>) -> Ident {
    Ident {
        name: pair.as_str().to_string(),
        span: pair.as_span().into(),
    }
}

fn build_assign_target(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let root = Expr::Ident(build_ident(inner.next().unwrap())); // grammar guarantees root ident
    inner.fold(root, |object, property| Expr::Member {
        object: Box::new(object),
        property: build_ident(property),
    })
}

// ============================================================================
// DECLARATIONS
// ============================================================================

fn build_declaration(pair: Pair<Rule>) -> Declaration {
    match pair.as_rule() {
        Rule::fn_signature => Declaration::Function(build_signature(pair)),
        Rule::var_signature => {
            let mut inner = pair.into_inner().skip(1);
            let name = inner.next().unwrap().as_str().to_string(); // grammar guarantees name
            let ty = inner.next().unwrap().as_str().to_string(); // grammar guarantees type
            Declaration::Variable { name, ty }
        }
        Rule::namespace_decl => {
            let mut inner = significant(pair);
            let name = inner.next().unwrap().as_str().to_string(); // grammar guarantees name
            let members = inner.map(build_declaration).collect();
            Declaration::Namespace { name, members }
        }
        rule => unreachable!("declaration rule {:?} is not produced by the grammar", rule),
    }
}

fn build_signature(pair: Pair<Rule>) -> FunctionSignature {
    let mut inner = significant(pair);
    let name = inner.next().unwrap().as_str().to_string(); // grammar guarantees name
    let mut params = Vec::new();
    let mut return_type = None;
    for part in inner {
        match part.as_rule() {
            Rule::params => params = build_params(part),
            Rule::return_type => return_type = Some(type_text(part)),
            _ => {}
        }
    }
    FunctionSignature {
        name,
        params,
        return_type,
    }
}

fn build_params(pair: Pair<Rule>) -> Vec<Param> {
    pair.into_inner()
        .map(|param| {
            let mut built = Param {
                name: String::new(),
                optional: false,
                rest: false,
                ty: None,
            };
            for part in param.into_inner() {
                match part.as_rule() {
                    Rule::rest_marker => built.rest = true,
                    Rule::optional_marker => built.optional = true,
                    Rule::prop_name => built.name = part.as_str().to_string(),
                    Rule::ty => built.ty = Some(part.as_str().to_string()),
                    _ => {}
                }
            }
            built
        })
        .collect()
}

/// Source text of the type inside a `return_type` pair.
fn type_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|ty| ty.as_str().to_string())
        .unwrap_or_default()
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

fn build_expr(pair: Pair<Rule>) -> Expr {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, operand| {
            let span = Span {
                start: op.as_span().start(),
                end: operand.span().end,
            };
            let op = match op.as_rule() {
                Rule::not_op => UnaryOp::Not,
                Rule::neg_op => UnaryOp::Neg,
                _ => UnaryOp::BitNot,
            };
            Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            }
        })
        .map_postfix(|object, op| match op.as_rule() {
            Rule::call_args => {
                let span = Span {
                    start: object.span().start,
                    end: op.as_span().end(),
                };
                Expr::Call {
                    callee: Box::new(object),
                    args: op.into_inner().map(build_arg).collect(),
                    span,
                }
            }
            Rule::member => Expr::Member {
                object: Box::new(object),
                property: build_ident(op.into_inner().next().unwrap()), // grammar guarantees name
            },
            _ => Expr::NonNull(Box::new(object)),
        })
        .map_infix(|lhs, op, rhs| Expr::Binary {
            op: binary_op(op.as_rule()),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
        .parse(pair.into_inner())
}

fn binary_op(rule: Rule) -> BinaryOp {
    match rule {
        Rule::or => BinaryOp::Or,
        Rule::and => BinaryOp::And,
        Rule::bit_or => BinaryOp::BitOr,
        Rule::bit_xor => BinaryOp::BitXor,
        Rule::bit_and => BinaryOp::BitAnd,
        Rule::strict_eq => BinaryOp::StrictEq,
        Rule::strict_ne => BinaryOp::StrictNe,
        Rule::eq => BinaryOp::Eq,
        Rule::ne => BinaryOp::Ne,
        Rule::lt => BinaryOp::Lt,
        Rule::le => BinaryOp::Le,
        Rule::gt => BinaryOp::Gt,
        Rule::ge => BinaryOp::Ge,
        Rule::shl => BinaryOp::Shl,
        Rule::shr => BinaryOp::Shr,
        Rule::ushr => BinaryOp::UShr,
        Rule::add => BinaryOp::Add,
        Rule::sub => BinaryOp::Sub,
        Rule::mul => BinaryOp::Mul,
        Rule::div => BinaryOp::Div,
        Rule::modulo => BinaryOp::Mod,
        rule => unreachable!("infix rule {:?} is not produced by the grammar", rule),
    }
}

fn build_arg(pair: Pair<Rule>) -> Arg {
    let mut spread = false;
    let mut value = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::spread => spread = true,
            _ => value = Some(build_expr(part)),
        }
    }
    Arg {
        spread,
        value: value.unwrap(), // grammar guarantees an argument expression
    }
}

fn build_primary(pair: Pair<Rule>) -> Expr {
    let span = Span::from(pair.as_span());

    match pair.as_rule() {
        Rule::arrow_fn => {
            let mut params = Vec::new();
            let mut body = ArrowBody::Block(Vec::new());
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::arrow_params => params = build_arrow_params(part),
                    Rule::block => body = ArrowBody::Block(build_block(part)),
                    Rule::expr => body = ArrowBody::Expr(Box::new(build_expr(part))),
                    _ => {}
                }
            }
            Expr::Arrow { params, body, span }
        }
        Rule::paren_expr => {
            let inner = pair.into_inner().next().unwrap(); // grammar guarantees inner expression
            Expr::Paren(Box::new(build_expr(inner)), span)
        }
        Rule::array_lit => Expr::Array(pair.into_inner().map(build_arg).collect(), span),
        Rule::object_lit => Expr::Object(pair.into_inner().map(build_property).collect(), span),
        Rule::number_lit => Expr::Number(pair.as_str().to_string(), span),
        Rule::string_lit => Expr::String(string_value(pair), span),
        Rule::true_lit => Expr::Bool(true, span),
        Rule::false_lit => Expr::Bool(false, span),
        Rule::null_lit => Expr::Nil(span),
        Rule::ident => Expr::Ident(build_ident(pair)),
        rule => unreachable!("primary rule {:?} is not produced by the grammar", rule),
    }
}

fn build_arrow_params(pair: Pair<Rule>) -> Vec<Param> {
    match pair.into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::params => build_params(inner),
        Some(inner) => vec![Param {
            name: inner.as_str().to_string(),
            optional: false,
            rest: false,
            ty: None,
        }],
        None => Vec::new(),
    }
}

fn build_property(pair: Pair<Rule>) -> (String, Expr) {
    let mut inner = pair.into_inner();
    let key = inner.next().unwrap(); // grammar guarantees a key
    match inner.next() {
        Some(value) => {
            let name = match key.as_rule() {
                Rule::string_lit => string_value(key),
                _ => key.as_str().to_string(),
            };
            (name, build_expr(value))
        }
        None => (key.as_str().to_string(), Expr::Ident(build_ident(key))),
    }
}

fn string_value(pair: Pair<Rule>) -> String {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    unescape(raw)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
