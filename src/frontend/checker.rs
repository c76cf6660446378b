//! Semantic checks for non-declaration files.

use std::collections::HashMap;

use super::ast::{Arg, ArrowBody, Binding, Expr, Param, Stmt, VarKind};
use super::binder::{resolve_callee, select_overload, CallMismatch, Symbol, SymbolTable};
use super::SourceFile;
use crate::diagnostics::Diagnostic;

pub const CANNOT_FIND_NAME: u32 = 2304;
pub const PROPERTY_DOES_NOT_EXIST: u32 = 2339;
pub const CANNOT_REDECLARE: u32 = 2451;
pub const ARGUMENT_COUNT: u32 = 2554;
pub const ARGUMENT_COUNT_AT_LEAST: u32 = 2555;
pub const ARGUMENT_NOT_ASSIGNABLE: u32 = 2345;
pub const NO_OVERLOAD: u32 = 2769;

/// Check `file` against the program's global symbols.
pub fn check_file(file: &SourceFile, globals: &SymbolTable) -> Vec<Diagnostic> {
    let mut checker = Checker {
        file,
        globals,
        scopes: Vec::new(),
        diagnostics: Vec::new(),
    };
    checker.block(&file.statements, &[]);
    checker.diagnostics
}

struct Checker<'a> {
    file: &'a SourceFile,
    globals: &'a SymbolTable,
    /// Names per scope, mapped to whether the binding is block scoped.
    scopes: Vec<HashMap<String, bool>>,
    diagnostics: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn report(&mut self, code: u32, message: String, offset: usize) {
        let diagnostic =
            Diagnostic::error(code, message).at(&self.file.file_name, &self.file.text, offset);
        self.diagnostics.push(diagnostic);
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    /// Only `var` may repeat a name already bound by `var` or a parameter.
    fn declare(&mut self, name: &str, block_scoped: bool, offset: usize) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        match scope.get(name).copied() {
            None => {
                scope.insert(name.to_string(), block_scoped);
            }
            Some(existing) if !existing && !block_scoped => {}
            Some(_) => self.report(
                CANNOT_REDECLARE,
                format!("Cannot redeclare block-scoped variable '{name}'."),
                offset,
            ),
        }
    }

    /// Check statements in a fresh scope seeded with `params`. Function
    /// declarations are hoisted to the top of their block.
    fn block(&mut self, statements: &[Stmt], params: &[Param]) {
        self.scopes.push(parameter_scope(params));
        for statement in statements {
            if let Stmt::Function { name, .. } = statement {
                self.declare(&name.name, true, name.span.start);
            }
        }
        for statement in statements {
            self.statement(statement);
        }
        self.scopes.pop();
    }

    fn statement(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Var {
                kind,
                binding,
                init,
                ..
            } => {
                if let Some(init) = init {
                    self.expr(init);
                }
                self.bind(binding, *kind != VarKind::Var);
            }
            Stmt::Function { params, body, .. } => self.block(body, params),
            Stmt::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            Stmt::ForOf {
                binding,
                iterable,
                body,
                ..
            } => {
                self.expr(iterable);
                self.scopes.push(HashMap::new());
                self.bind(binding, true);
                self.statement(body);
                self.scopes.pop();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.expr(condition);
                self.nested(then_branch);
                if let Some(else_branch) = else_branch {
                    self.nested(else_branch);
                }
            }
            Stmt::Return(value, _) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::Block(statements, _) => self.block(statements, &[]),
            Stmt::Expr(expr) => self.expr(expr),
            Stmt::Declare(..) | Stmt::TypeOnly(_) | Stmt::Empty(_) => {}
        }
    }

    /// A statement in branch position gets its own scope even without braces.
    fn nested(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Block(statements, _) => self.block(statements, &[]),
            other => self.block(std::slice::from_ref(other), &[]),
        }
    }

    fn bind(&mut self, binding: &Binding, block_scoped: bool) {
        for ident in binding.names() {
            self.declare(&ident.name, block_scoped, ident.span.start);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(..) | Expr::String(..) | Expr::Bool(..) | Expr::Nil(_) => {}
            Expr::Ident(ident) => {
                if !self.is_local(&ident.name) && !self.globals.contains_key(&ident.name) {
                    self.report(
                        CANNOT_FIND_NAME,
                        format!("Cannot find name '{}'.", ident.name),
                        ident.span.start,
                    );
                }
            }
            Expr::Array(elements, _) => self.args(elements),
            Expr::Object(properties, _) => {
                for (_, value) in properties {
                    self.expr(value);
                }
            }
            Expr::Call { callee, args, span } => {
                self.expr(callee);
                self.args(args);
                self.call(callee, args, span.start);
            }
            Expr::Member { object, property } => {
                self.expr(object);
                if let Expr::Ident(namespace) = object.unwrapped() {
                    if self.is_local(&namespace.name) {
                        return;
                    }
                    if let Some(Symbol::Namespace(members)) = self.globals.get(&namespace.name) {
                        if !members.contains_key(&property.name) {
                            self.report(
                                PROPERTY_DOES_NOT_EXIST,
                                format!(
                                    "Property '{}' does not exist on type 'typeof {}'.",
                                    property.name, namespace.name
                                ),
                                property.span.start,
                            );
                        }
                    }
                }
            }
            Expr::NonNull(inner) | Expr::Paren(inner, _) => self.expr(inner),
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Arrow { params, body, .. } => match body {
                ArrowBody::Expr(value) => {
                    self.scopes.push(parameter_scope(params));
                    self.expr(value);
                    self.scopes.pop();
                }
                ArrowBody::Block(statements) => self.block(statements, params),
            },
        }
    }

    fn args(&mut self, args: &[Arg]) {
        for arg in args {
            self.expr(&arg.value);
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Arg], offset: usize) {
        let Some(overloads) = resolve_callee(self.globals, callee, |name| self.is_local(name))
        else {
            return;
        };
        match select_overload(overloads, args) {
            Ok(_) => {}
            Err(CallMismatch::Arity { min, max, got }) => {
                let (code, message) = match max {
                    Some(max) if max == min => (
                        ARGUMENT_COUNT,
                        format!("Expected {min} arguments, but got {got}."),
                    ),
                    Some(max) => (
                        ARGUMENT_COUNT,
                        format!("Expected {min}-{max} arguments, but got {got}."),
                    ),
                    None => (
                        ARGUMENT_COUNT_AT_LEAST,
                        format!("Expected at least {min} arguments, but got {got}."),
                    ),
                };
                self.report(code, message, offset);
            }
            Err(CallMismatch::Argument {
                index,
                argument,
                parameter,
            }) => {
                let offset = args[index].value.span().start;
                self.report(
                    ARGUMENT_NOT_ASSIGNABLE,
                    format!(
                        "Argument of type '{argument}' is not assignable to parameter of type '{parameter}'."
                    ),
                    offset,
                );
            }
            Err(CallMismatch::NoOverload) => {
                self.report(
                    NO_OVERLOAD,
                    "No overload matches this call.".to_string(),
                    offset,
                );
            }
        }
    }
}

fn parameter_scope(params: &[Param]) -> HashMap<String, bool> {
    params
        .iter()
        .map(|param| (param.name.clone(), false))
        .collect()
}
