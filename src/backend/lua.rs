//! Lua lowering for the TypeScript subset.
//!
//! Lowering depends on the program's [`LuaTarget`]: spread arguments,
//! array destructuring and bitwise operators each have a per-target form.
//! Constructs a target cannot express are reported as diagnostics and still
//! printed, so one run reports every problem in a file.

use std::collections::HashSet;

use tracing::debug;

use super::{Backend, EmitResult, TranspiledFile};
use crate::diagnostics::Diagnostic;
use crate::frontend::ast::{
    Arg, ArrowBody, BinaryOp, Binding, Expr, FunctionSignature, Param, Stmt, UnaryOp,
};
use crate::frontend::binder::{resolve_callee, select_overload, SymbolTable};
use crate::frontend::{Program, SourceFile};
use crate::targets::LuaTarget;

pub const HEADER: &str = "--[[ Generated with luatypes-harness ]]";

pub const UNSUPPORTED_BITWISE: u32 = 100001;
pub const UNSUPPORTED_RIGHT_SHIFT: u32 = 100002;

const INDENT: &str = "    ";

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LuaBackend;

impl Backend<Program> for LuaBackend {
    fn transpile(&self, program: &Program) -> EmitResult {
        let mut result = EmitResult::default();
        let target = program.options().lua_target;

        for file in program
            .source_files()
            .iter()
            .filter(|file| !file.is_declaration_file())
        {
            let mut printer = LuaPrinter::new(file, program.globals(), target, program.new_line());
            printer.statements(&file.statements);

            let mut lua = String::new();
            if !program.options().no_header {
                lua.push_str(HEADER);
                lua.push_str(program.new_line());
            }
            lua.push_str(&printer.out);

            debug!(
                file_name = %file.file_name,
                target = target.label(),
                diagnostics = printer.diagnostics.len(),
                "lowered file"
            );
            result.diagnostics.append(&mut printer.diagnostics);
            result.transpiled_files.push(TranspiledFile {
                file_name: file.file_name.clone(),
                lua,
            });
        }

        result
    }
}

// ============================================================================
// PRINTER
// ============================================================================

struct LuaPrinter<'p> {
    file: &'p SourceFile,
    globals: &'p SymbolTable,
    target: LuaTarget,
    new_line: &'p str,
    out: String,
    indent: usize,
    scopes: Vec<HashSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'p> LuaPrinter<'p> {
    fn new(
        file: &'p SourceFile,
        globals: &'p SymbolTable,
        target: LuaTarget,
        new_line: &'p str,
    ) -> Self {
        Self {
            file,
            globals,
            target,
            new_line,
            out: String::new(),
            indent: 0,
            scopes: vec![HashSet::new()],
            diagnostics: Vec::new(),
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push_str(self.new_line);
    }

    fn report(&mut self, code: u32, message: String, offset: usize) {
        let diagnostic =
            Diagnostic::error(code, message).at(&self.file.file_name, &self.file.text, offset);
        self.diagnostics.push(diagnostic);
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn unpack(&self) -> &'static str {
        match self.target {
            LuaTarget::Lua51 | LuaTarget::LuaJit => "unpack",
            LuaTarget::Lua52 | LuaTarget::Lua53 => "table.unpack",
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn statements(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    /// Lower `statements` one level deeper, inside their own scope.
    fn nested(&mut self, statements: &[Stmt], params: &[Param]) {
        self.indent += 1;
        self.scopes
            .push(params.iter().map(|param| param.name.clone()).collect());
        if let Some(rest) = params.iter().find(|param| param.rest) {
            let line = format!("local {} = {{...}}", lua_name(&rest.name));
            self.line(&line);
        }
        self.statements(statements);
        self.scopes.pop();
        self.indent -= 1;
    }

    fn statement(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Var { binding, init, .. } => self.variable(binding, init.as_ref()),

            Stmt::Function {
                name, params, body, ..
            } => {
                self.declare(&name.name);
                let header = format!(
                    "local function {}({})",
                    lua_name(&name.name),
                    parameter_list(params)
                );
                self.line(&header);
                self.nested(body, params);
                self.line("end");
            }

            Stmt::Assign { target, value, .. } => {
                let line = format!("{} = {}", self.expr(target), self.value(value));
                self.line(&line);
            }

            Stmt::ForOf {
                binding,
                iterable,
                body,
                ..
            } => self.for_of(binding, iterable, body),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let header = format!("if {} then", self.expr(condition));
                self.line(&header);
                self.branch(then_branch);
                let mut next = else_branch.as_deref();
                while let Some(branch) = next {
                    match branch {
                        Stmt::If {
                            condition,
                            then_branch,
                            else_branch,
                            ..
                        } => {
                            let header = format!("elseif {} then", self.expr(condition));
                            self.line(&header);
                            self.branch(then_branch);
                            next = else_branch.as_deref();
                        }
                        other => {
                            self.line("else");
                            self.branch(other);
                            next = None;
                        }
                    }
                }
                self.line("end");
            }

            Stmt::Return(value, _) => match value {
                Some(value) => {
                    let line = format!("return {}", self.expr(value));
                    self.line(&line);
                }
                None => self.line("return"),
            },

            Stmt::Block(statements, _) => {
                self.line("do");
                self.nested(statements, &[]);
                self.line("end");
            }

            Stmt::Expr(expr) => {
                let text = self.expr(expr);
                if matches!(expr.unwrapped(), Expr::Call { .. }) {
                    self.line(&text);
                } else {
                    self.line(&format!("local ____ = {text}"));
                }
            }

            Stmt::Declare(..) | Stmt::TypeOnly(_) | Stmt::Empty(_) => {}
        }
    }

    fn branch(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Block(statements, _) => self.nested(statements, &[]),
            other => self.nested(std::slice::from_ref(other), &[]),
        }
    }

    fn variable(&mut self, binding: &Binding, init: Option<&Expr>) {
        let names = binding
            .names()
            .iter()
            .map(|ident| lua_name(&ident.name))
            .collect::<Vec<_>>()
            .join(", ");

        let line = match (binding, init) {
            (_, None) => format!("local {names}"),
            (Binding::Ident(_), Some(init)) => format!("local {names} = {}", self.value(init)),
            (Binding::Array(_), Some(init)) if self.returns_multiple(init) => {
                format!("local {names} = {}", self.expr(init))
            }
            (Binding::Array(_), Some(init)) => {
                format!("local {names} = {}({})", self.unpack(), self.expr(init))
            }
        };

        for ident in binding.names() {
            self.declare(&ident.name);
        }
        self.line(&line);
    }

    fn for_of(&mut self, binding: &Binding, iterable: &Expr, body: &Stmt) {
        let iterable_text = self.expr(iterable);
        let generic_for = self.returns_iterable(iterable);
        let body_statements = match body {
            Stmt::Block(statements, _) => statements.as_slice(),
            other => std::slice::from_ref(other),
        };
        let names: Vec<String> = binding
            .names()
            .iter()
            .map(|ident| lua_name(&ident.name))
            .collect();

        self.scopes.push(HashSet::new());
        for ident in binding.names() {
            self.declare(&ident.name);
        }

        if generic_for {
            let header = format!("for {} in {} do", names.join(", "), iterable_text);
            self.line(&header);
            self.nested(body_statements, &[]);
        } else if let Binding::Array(_) = binding {
            let header = format!("for ____, ____value in ipairs({iterable_text}) do");
            self.line(&header);
            self.indent += 1;
            let destructure = format!("local {} = {}(____value)", names.join(", "), self.unpack());
            self.line(&destructure);
            self.indent -= 1;
            self.nested(body_statements, &[]);
        } else {
            let header = format!("for ____, {} in ipairs({}) do", names.join(", "), iterable_text);
            self.line(&header);
            self.nested(body_statements, &[]);
        }

        self.scopes.pop();
        self.line("end");
    }

    // ------------------------------------------------------------------------
    // Call classification
    // ------------------------------------------------------------------------

    fn signature_of(&self, expr: &Expr) -> Option<&'p FunctionSignature> {
        let Expr::Call { callee, args, .. } = expr.unwrapped() else {
            return None;
        };
        let globals = self.globals;
        let overloads = resolve_callee(globals, callee, |name| self.is_local(name))?;
        select_overload(overloads, args).ok()
    }

    fn returns_multiple(&self, expr: &Expr) -> bool {
        self.signature_of(expr)
            .is_some_and(|signature| signature.returns_multiple())
    }

    fn returns_iterable(&self, expr: &Expr) -> bool {
        self.signature_of(expr)
            .is_some_and(|signature| signature.returns_iterable())
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// An expression in a position that takes a single value. Multiple
    /// results are collected into a table.
    fn value(&mut self, expr: &Expr) -> String {
        let text = self.expr(expr);
        if self.returns_multiple(expr) {
            format!("{{{text}}}")
        } else {
            text
        }
    }

    fn args(&mut self, args: &[Arg]) -> String {
        args.iter()
            .map(|arg| {
                if arg.spread {
                    if self.returns_multiple(&arg.value) {
                        self.expr(&arg.value)
                    } else {
                        format!("{}({})", self.unpack(), self.expr(&arg.value))
                    }
                } else {
                    self.value(&arg.value)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Number(text, _) => text.clone(),
            Expr::String(value, _) => quote(value),
            Expr::Bool(value, _) => value.to_string(),
            Expr::Nil(_) => "nil".to_string(),
            Expr::Ident(ident) => lua_name(&ident.name),
            Expr::Array(elements, _) => format!("{{{}}}", self.args(elements)),
            Expr::Object(properties, _) => {
                let fields: Vec<String> = properties
                    .iter()
                    .map(|(key, value)| {
                        let value = self.value(value);
                        if is_lua_identifier(key) {
                            format!("{key} = {value}")
                        } else {
                            format!("[{}] = {value}", quote(key))
                        }
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
            Expr::Call { callee, args, .. } => {
                let callee_text = self.expr(callee);
                let callee_text = match callee.unwrapped() {
                    Expr::Arrow { .. } | Expr::Object(..) | Expr::Array(..) | Expr::String(..) => {
                        format!("({callee_text})")
                    }
                    _ => callee_text,
                };
                format!("{callee_text}({})", self.args(args))
            }
            Expr::Member { object, property } => {
                let object_text = self.expr(object);
                let object_text = match object.unwrapped() {
                    Expr::Object(..) | Expr::Array(..) | Expr::String(..) | Expr::Arrow { .. } => {
                        format!("({object_text})")
                    }
                    _ => object_text,
                };
                if is_lua_identifier(&property.name) {
                    format!("{object_text}.{}", property.name)
                } else {
                    format!("{object_text}[{}]", quote(&property.name))
                }
            }
            Expr::NonNull(inner) => self.expr(inner),
            Expr::Paren(inner, _) => format!("({})", self.expr(inner)),
            Expr::Unary { op, operand, span } => {
                let operand_text = self.operand(operand, UNARY_PRECEDENCE, false);
                match op {
                    UnaryOp::Not => format!("not {operand_text}"),
                    // `--` would open a Lua comment.
                    UnaryOp::Neg if operand_text.starts_with('-') => format!("-({operand_text})"),
                    UnaryOp::Neg => format!("-{operand_text}"),
                    UnaryOp::BitNot => match self.target {
                        LuaTarget::Lua51 => {
                            self.unsupported_bitwise(span.start);
                            format!("~{operand_text}")
                        }
                        LuaTarget::Lua52 => format!("bit32.bnot({})", self.expr(operand)),
                        LuaTarget::Lua53 => format!("~{operand_text}"),
                        LuaTarget::LuaJit => format!("bit.bnot({})", self.expr(operand)),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, expr.span().start),
            Expr::Arrow { params, body, .. } => {
                let params_text = parameter_list(params);
                match body {
                    ArrowBody::Expr(value) => {
                        self.scopes
                            .push(params.iter().map(|param| param.name.clone()).collect());
                        let value = self.expr(value);
                        self.scopes.pop();
                        match params.iter().find(|param| param.rest) {
                            Some(rest) => format!(
                                "function({params_text}) local {} = {{...}}; return {value} end",
                                lua_name(&rest.name)
                            ),
                            None => format!("function({params_text}) return {value} end"),
                        }
                    }
                    ArrowBody::Block(statements) => {
                        let outer = std::mem::take(&mut self.out);
                        self.nested(statements, params);
                        let body = std::mem::replace(&mut self.out, outer);
                        let closing = INDENT.repeat(self.indent);
                        format!(
                            "function({params_text}){}{body}{closing}end",
                            self.new_line
                        )
                    }
                }
            }
        }
    }

    /// Lower an operand, parenthesized when it binds looser than its parent.
    fn operand(&mut self, expr: &Expr, parent: u8, right: bool) -> String {
        let text = self.expr(expr);
        let child = match expr {
            Expr::Binary { op, lhs, rhs } => self.lowered_precedence(*op, lhs, rhs),
            Expr::Unary { .. } => Some(UNARY_PRECEDENCE),
            _ => None,
        };
        match child {
            Some(child) if child < parent || (right && child == parent) => format!("({text})"),
            _ => text,
        }
    }

    /// Lua precedence of the lowered form of a binary expression; `None` when
    /// it lowers to a function call.
    fn lowered_precedence(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<u8> {
        if op.is_bitwise() && matches!(self.target, LuaTarget::Lua52 | LuaTarget::LuaJit) {
            return None;
        }
        if op == BinaryOp::Add && (is_string_literal(lhs) || is_string_literal(rhs)) {
            return Some(CONCAT_PRECEDENCE);
        }
        Some(precedence(op))
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, offset: usize) -> String {
        if op.is_bitwise() {
            if let Some(lowered) = self.bitwise_call(op, lhs, rhs, offset) {
                return lowered;
            }
        }

        let (symbol, prec) = match op {
            BinaryOp::Add if is_string_literal(lhs) || is_string_literal(rhs) => {
                ("..", CONCAT_PRECEDENCE)
            }
            BinaryOp::UShr => (">>", precedence(op)),
            _ => (lua_operator(op), precedence(op)),
        };
        // `..` is right associative; everything else here associates left.
        let right_assoc = symbol == "..";
        let lhs_text = self.operand(lhs, prec, right_assoc);
        let rhs_text = self.operand(rhs, prec, !right_assoc);
        format!("{lhs_text} {symbol} {rhs_text}")
    }

    /// Bitwise operators that lower to library calls, or that the target
    /// rejects. Returns `None` for native operators.
    fn bitwise_call(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        offset: usize,
    ) -> Option<String> {
        let library = match self.target {
            LuaTarget::Lua51 => {
                self.unsupported_bitwise(offset);
                return None;
            }
            LuaTarget::Lua53 => {
                if op == BinaryOp::Shr {
                    self.report(
                        UNSUPPORTED_RIGHT_SHIFT,
                        "Right shift operator is not supported for target Lua 5.3. Use `>>>` instead."
                            .to_string(),
                        offset,
                    );
                }
                return None;
            }
            LuaTarget::Lua52 => "bit32",
            LuaTarget::LuaJit => "bit",
        };
        let function = match op {
            BinaryOp::BitAnd => "band",
            BinaryOp::BitOr => "bor",
            BinaryOp::BitXor => "bxor",
            BinaryOp::Shl => "lshift",
            BinaryOp::Shr => "arshift",
            _ => "rshift",
        };
        Some(format!(
            "{library}.{function}({}, {})",
            self.expr(lhs),
            self.expr(rhs)
        ))
    }

    fn unsupported_bitwise(&mut self, offset: usize) {
        self.report(
            UNSUPPORTED_BITWISE,
            format!(
                "Bitwise operations are not supported for target {}.",
                self.target
            ),
            offset,
        );
    }
}

// ============================================================================
// HELPERS
// ============================================================================

const UNARY_PRECEDENCE: u8 = 11;
const CONCAT_PRECEDENCE: u8 = 8;

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::StrictEq
        | BinaryOp::StrictNe
        | BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => 3,
        BinaryOp::BitOr => 4,
        BinaryOp::BitXor => 5,
        BinaryOp::BitAnd => 6,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 7,
        BinaryOp::Add | BinaryOp::Sub => 9,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 10,
    }
}

fn lua_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "or",
        BinaryOp::And => "and",
        BinaryOp::StrictEq | BinaryOp::Eq => "==",
        BinaryOp::StrictNe | BinaryOp::Ne => "~=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "~",
        BinaryOp::BitAnd => "&",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr | BinaryOp::UShr => ">>",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
    }
}

fn is_string_literal(expr: &Expr) -> bool {
    matches!(expr.unwrapped(), Expr::String(..))
}

fn parameter_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| {
            if param.rest {
                "...".to_string()
            } else {
                lua_name(&param.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_lua_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LUA_KEYWORDS.contains(&name)
}

/// Map a source identifier to a valid Lua name.
fn lua_name(name: &str) -> String {
    if LUA_KEYWORDS.contains(&name) {
        return format!("____{name}");
    }
    name.replace('$', "_24")
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::binder::bind;
    use crate::frontend::ScriptTarget;

    const DECLARATIONS: &str = r#"
        declare function print(...args: any[]): void;
        declare function next(t: any, index?: any): LuaMultiReturn<[any, any]>;
        declare function pairs(t: any): LuaIterable<LuaMultiReturn<[any, any]>>;
    "#;

    fn lower(target: LuaTarget, source: &str) -> (String, Vec<String>) {
        let declarations = SourceFile::parse("globals.d.ts", DECLARATIONS, ScriptTarget::ES5);
        let globals = bind(&[declarations]);
        let file = SourceFile::parse("input.ts", source, ScriptTarget::ES5);
        assert!(file.parse_diagnostics.is_empty(), "{:?}", file.parse_diagnostics);
        let mut printer = LuaPrinter::new(&file, &globals, target, "\n");
        printer.statements(&file.statements);
        let diagnostics = printer
            .diagnostics
            .iter()
            .map(|d| d.message_text.clone())
            .collect();
        (printer.out.trim().to_string(), diagnostics)
    }

    fn lua(target: LuaTarget, source: &str) -> String {
        let (lua, diagnostics) = lower(target, source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        lua
    }

    #[test]
    fn lowers_operators() {
        assert_eq!(
            lua(LuaTarget::Lua53, "const ok = a === 1 && !(b !== 2) || c;"),
            "local ok = a == 1 and not (b ~= 2) or c"
        );
        assert_eq!(
            lua(LuaTarget::Lua53, r#"const s = "n=" + n;"#),
            r#"local s = "n=" .. n"#
        );
    }

    #[test]
    fn nested_negation_never_prints_a_comment() {
        assert_eq!(lua(LuaTarget::Lua53, "const x = - -1;"), "local x = -(-1)");
        assert_eq!(lua(LuaTarget::Lua51, "const y = -(-x);"), "local y = -(-x)");
        assert_eq!(lua(LuaTarget::Lua53, "const z = -x - -1;"), "local z = -x - -1");
    }

    #[test]
    fn keeps_arithmetic_grouping() {
        assert_eq!(
            lua(LuaTarget::Lua53, "const x = (1 + 2) * 3 - 4 / 2;"),
            "local x = (1 + 2) * 3 - 4 / 2"
        );
    }

    #[test]
    fn destructures_non_multi_return_values_per_target() {
        assert_eq!(
            lua(LuaTarget::Lua51, "const [a, b] = pair;"),
            "local a, b = unpack(pair)"
        );
        assert_eq!(
            lua(LuaTarget::Lua53, "const [a, b] = pair;"),
            "local a, b = table.unpack(pair)"
        );
    }

    #[test]
    fn multi_return_calls() {
        assert_eq!(
            lua(LuaTarget::Lua53, "const [k, v] = next({});"),
            "local k, v = next({})"
        );
        assert_eq!(
            lua(LuaTarget::Lua53, "const entry = next({});"),
            "local entry = {next({})}"
        );
        assert_eq!(lua(LuaTarget::Lua53, "next({});"), "next({})");
    }

    #[test]
    fn for_of_over_plain_arrays_uses_ipairs() {
        assert_eq!(
            lua(LuaTarget::Lua53, "for (const x of list) { print(x); }"),
            "for ____, x in ipairs(list) do\n    print(x)\nend"
        );
        assert_eq!(
            lua(LuaTarget::LuaJit, "for (const [a, b] of list) print(a, b);"),
            "for ____, ____value in ipairs(list) do\n    local a, b = unpack(____value)\n    print(a, b)\nend"
        );
    }

    #[test]
    fn for_of_over_iterables_uses_generic_for() {
        assert_eq!(
            lua(LuaTarget::Lua52, "for (const [k, v] of pairs(t)) { print(k, v); }"),
            "for k, v in pairs(t) do\n    print(k, v)\nend"
        );
    }

    #[test]
    fn spread_arguments_follow_the_target() {
        assert_eq!(lua(LuaTarget::Lua51, "print(...xs);"), "print(unpack(xs))");
        assert_eq!(lua(LuaTarget::Lua52, "print(...xs);"), "print(table.unpack(xs))");
    }

    #[test]
    fn bitwise_operators_per_target() {
        let source = "const x = a & b | c;";
        assert_eq!(
            lua(LuaTarget::Lua52, source),
            "local x = bit32.bor(bit32.band(a, b), c)"
        );
        assert_eq!(lua(LuaTarget::Lua53, source), "local x = a & b | c");
        assert_eq!(
            lua(LuaTarget::LuaJit, source),
            "local x = bit.bor(bit.band(a, b), c)"
        );

        let (_, diagnostics) = lower(LuaTarget::Lua51, source);
        assert_eq!(
            diagnostics,
            [
                "Bitwise operations are not supported for target Lua 5.1.",
                "Bitwise operations are not supported for target Lua 5.1.",
            ]
        );
    }

    #[test]
    fn shifts_on_lua_53() {
        assert_eq!(lua(LuaTarget::Lua53, "const x = a >>> 2;"), "local x = a >> 2");
        let (_, diagnostics) = lower(LuaTarget::Lua53, "const x = a >> 2;");
        assert_eq!(
            diagnostics,
            ["Right shift operator is not supported for target Lua 5.3. Use `>>>` instead."]
        );
        assert_eq!(
            lua(LuaTarget::Lua52, "const x = a >> 2;"),
            "local x = bit32.arshift(a, 2)"
        );
    }

    #[test]
    fn functions_and_closures() {
        assert_eq!(
            lua(
                LuaTarget::Lua53,
                "function sum(first: number, ...rest: number[]) { return first; }"
            ),
            "local function sum(first, ...)\n    local rest = {...}\n    return first\nend"
        );
        assert_eq!(
            lua(LuaTarget::Lua53, "const f = (a: number) => { print(a); };"),
            "local f = function(a)\n    print(a)\nend"
        );
    }

    #[test]
    fn if_else_chains() {
        assert_eq!(
            lua(
                LuaTarget::Lua53,
                "if (a) { print(1); } else if (b) { print(2); } else { print(3); }"
            ),
            "if a then\n    print(1)\nelseif b then\n    print(2)\nelse\n    print(3)\nend"
        );
    }

    #[test]
    fn escapes_names_and_keys() {
        assert_eq!(
            lua(LuaTarget::Lua53, r#"const end = { "not-ident": 1, ok: $x };"#),
            r#"local ____end = {["not-ident"] = 1, ok = _24x}"#
        );
    }

    #[test]
    fn non_call_expression_statements_are_assigned() {
        assert_eq!(lua(LuaTarget::Lua53, "a + 1;"), "local ____ = a + 1");
    }
}
