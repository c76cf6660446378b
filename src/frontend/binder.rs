//! Global symbol table and call resolution.

use std::collections::BTreeMap;

use super::ast::{Arg, Declaration, Expr, FunctionSignature, Stmt};
use super::SourceFile;

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// One entry per overload, in declaration order.
    Function(Vec<FunctionSignature>),
    Variable(String),
    Namespace(SymbolTable),
}

pub type SymbolTable = BTreeMap<String, Symbol>;

/// Bind the ambient declarations of `files`, in load order.
///
/// Repeated function declarations become overloads and repeated namespaces
/// merge. Any other redeclaration keeps the first symbol.
pub fn bind(files: &[SourceFile]) -> SymbolTable {
    let mut globals = SymbolTable::new();
    for file in files {
        for statement in &file.statements {
            if let Stmt::Declare(declaration, _) = statement {
                declare(&mut globals, declaration);
            }
        }
    }
    globals
}

fn declare(table: &mut SymbolTable, declaration: &Declaration) {
    match declaration {
        Declaration::Function(signature) => match table.get_mut(&signature.name) {
            Some(Symbol::Function(overloads)) => overloads.push(signature.clone()),
            Some(_) => {}
            None => {
                table.insert(
                    signature.name.clone(),
                    Symbol::Function(vec![signature.clone()]),
                );
            }
        },
        Declaration::Variable { name, ty } => {
            table
                .entry(name.clone())
                .or_insert_with(|| Symbol::Variable(ty.clone()));
        }
        Declaration::Namespace { name, members } => {
            let entry = table
                .entry(name.clone())
                .or_insert_with(|| Symbol::Namespace(SymbolTable::new()));
            if let Symbol::Namespace(namespace) = entry {
                for member in members {
                    declare(namespace, member);
                }
            }
        }
    }
}

/// Overloads for a call target: a global function, or a function member of a
/// global namespace. `is_local` reports names shadowed by local bindings.
pub fn resolve_callee<'g>(
    globals: &'g SymbolTable,
    callee: &Expr,
    is_local: impl Fn(&str) -> bool,
) -> Option<&'g [FunctionSignature]> {
    match callee.unwrapped() {
        Expr::Ident(ident) if !is_local(&ident.name) => match globals.get(&ident.name)? {
            Symbol::Function(overloads) => Some(overloads.as_slice()),
            _ => None,
        },
        Expr::Member { object, property } => match object.unwrapped() {
            Expr::Ident(namespace) if !is_local(&namespace.name) => {
                match globals.get(&namespace.name)? {
                    Symbol::Namespace(members) => match members.get(&property.name)? {
                        Symbol::Function(overloads) => Some(overloads.as_slice()),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

// ============================================================================
// OVERLOAD SELECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallMismatch {
    Arity {
        min: usize,
        max: Option<usize>,
        got: usize,
    },
    /// Argument at `index` does not fit its parameter type.
    Argument {
        index: usize,
        argument: String,
        parameter: String,
    },
    NoOverload,
}

/// Pick the first overload accepting `args`. With a single candidate its own
/// mismatch is reported; with several, [`CallMismatch::NoOverload`].
pub fn select_overload<'s>(
    overloads: &'s [FunctionSignature],
    args: &[Arg],
) -> Result<&'s FunctionSignature, CallMismatch> {
    let mut last = CallMismatch::NoOverload;
    for signature in overloads {
        match check_call(signature, args) {
            Ok(()) => return Ok(signature),
            Err(mismatch) => last = mismatch,
        }
    }
    if overloads.len() == 1 {
        Err(last)
    } else {
        Err(CallMismatch::NoOverload)
    }
}

fn check_call(signature: &FunctionSignature, args: &[Arg]) -> Result<(), CallMismatch> {
    let has_spread = args.iter().any(|arg| arg.spread);
    let min = signature.min_args();
    let max = signature.max_args();
    if !has_spread && (args.len() < min || max.is_some_and(|max| args.len() > max)) {
        return Err(CallMismatch::Arity {
            min,
            max,
            got: args.len(),
        });
    }

    for (index, arg) in args.iter().take_while(|arg| !arg.spread).enumerate() {
        let Some(parameter) = parameter_type(signature, index) else {
            continue;
        };
        let Some(literal) = LiteralType::of(&arg.value) else {
            continue;
        };
        if !literal.assignable_to(&parameter) {
            return Err(CallMismatch::Argument {
                index,
                argument: literal.display(),
                parameter,
            });
        }
    }
    Ok(())
}

/// Declared type of the parameter receiving argument `index`; rest
/// parameters contribute their element type.
fn parameter_type(signature: &FunctionSignature, index: usize) -> Option<String> {
    let param = match signature.params.get(index) {
        Some(param) if !param.rest => param,
        _ => signature.params.iter().find(|p| p.rest)?,
    };
    let ty = param.ty.as_deref()?.trim();
    if param.rest {
        Some(ty.strip_suffix("[]").unwrap_or(ty).trim().to_string())
    } else {
        Some(ty.to_string())
    }
}

/// Types of literal arguments; anything else is accepted by every parameter.
enum LiteralType<'a> {
    String(&'a str),
    Number(&'a str),
    Boolean(bool),
}

impl<'a> LiteralType<'a> {
    fn of(expr: &'a Expr) -> Option<Self> {
        match expr.unwrapped() {
            Expr::String(value, _) => Some(LiteralType::String(value)),
            Expr::Number(value, _) => Some(LiteralType::Number(value)),
            Expr::Bool(value, _) => Some(LiteralType::Boolean(*value)),
            _ => None,
        }
    }

    fn display(&self) -> String {
        match self {
            LiteralType::String(value) => format!("\"{value}\""),
            LiteralType::Number(value) => (*value).to_string(),
            LiteralType::Boolean(value) => value.to_string(),
        }
    }

    fn assignable_to(&self, parameter: &str) -> bool {
        parameter
            .split('|')
            .map(str::trim)
            .any(|member| self.assignable_to_member(member))
    }

    fn assignable_to_member(&self, member: &str) -> bool {
        if let Some(expected) = string_literal_type(member) {
            return matches!(self, LiteralType::String(value) if *value == expected);
        }
        match member {
            "string" => matches!(self, LiteralType::String(_)),
            "number" => matches!(self, LiteralType::Number(_)),
            "boolean" => matches!(self, LiteralType::Boolean(_)),
            "true" => matches!(self, LiteralType::Boolean(true)),
            "false" => matches!(self, LiteralType::Boolean(false)),
            _ if member.parse::<f64>().is_ok() => {
                matches!(self, LiteralType::Number(value) if *value == member)
            }
            _ => true,
        }
    }
}

fn string_literal_type(ty: &str) -> Option<&str> {
    ty.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| ty.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Ident, Span};
    use crate::frontend::ScriptTarget;

    fn bind_source(source: &str) -> SymbolTable {
        bind(&[SourceFile::parse("test.d.ts", source, ScriptTarget::ES5)])
    }

    fn call_args(source: &str) -> Vec<Arg> {
        let file = SourceFile::parse("input.ts", source, ScriptTarget::ES5);
        match file.statements.into_iter().next() {
            Some(Stmt::Expr(Expr::Call { args, .. })) => args,
            other => panic!("expected call statement, got {other:?}"),
        }
    }

    fn overloads<'g>(globals: &'g SymbolTable, name: &str) -> &'g [FunctionSignature] {
        let callee = Expr::Ident(Ident {
            name: name.to_string(),
            span: Span::default(),
        });
        resolve_callee(globals, &callee, |_| false).expect("function is declared")
    }

    const SELECT: &str = r##"
        declare function select<T>(index: number, ...args: T[]): LuaMultiReturn<T[]>;
        declare function select<T>(index: "#", ...args: T[]): number;
    "##;

    #[test]
    fn repeated_functions_become_overloads() {
        let globals = bind_source(SELECT);
        assert_eq!(overloads(&globals, "select").len(), 2);
    }

    #[test]
    fn namespaces_merge_across_declarations() {
        let globals = bind_source(
            "declare namespace table { function insert(t: any, v: any): void; }\n\
             declare namespace table { function unpack(t: any): any; }",
        );
        let Some(Symbol::Namespace(members)) = globals.get("table") else {
            panic!("expected namespace");
        };
        assert!(members.contains_key("insert"));
        assert!(members.contains_key("unpack"));
    }

    #[test]
    fn first_variable_declaration_wins() {
        let globals = bind_source("declare const _VERSION: string;\ndeclare const _VERSION: number;");
        assert_eq!(
            globals.get("_VERSION"),
            Some(&Symbol::Variable("string".to_string()))
        );
    }

    #[test]
    fn selects_overload_by_literal_argument() {
        let globals = bind_source(SELECT);
        let select = overloads(&globals, "select");

        let by_index = select_overload(select, &call_args(r#"select(2, "a");"#)).unwrap();
        assert!(by_index.returns_multiple());

        let by_count = select_overload(select, &call_args(r##"select("#", "a");"##)).unwrap();
        assert_eq!(by_count.return_type.as_deref(), Some("number"));
    }

    #[test]
    fn no_overload_matches() {
        let globals = bind_source(SELECT);
        let result = select_overload(overloads(&globals, "select"), &call_args("select(true);"));
        assert_eq!(result, Err(CallMismatch::NoOverload));
    }

    #[test]
    fn single_signature_reports_its_own_mismatch() {
        let globals = bind_source("declare function tostring(v: any): string;");
        let tostring = overloads(&globals, "tostring");
        assert_eq!(
            select_overload(tostring, &call_args("tostring(1, 2);")),
            Err(CallMismatch::Arity {
                min: 1,
                max: Some(1),
                got: 2
            })
        );

        let globals = bind_source("declare function rawlen(v: number): number;");
        assert_eq!(
            select_overload(overloads(&globals, "rawlen"), &call_args(r#"rawlen("a");"#)),
            Err(CallMismatch::Argument {
                index: 0,
                argument: "\"a\"".to_string(),
                parameter: "number".to_string(),
            })
        );
    }

    #[test]
    fn spread_arguments_skip_arity() {
        let globals = bind_source("declare function max(a: number, b: number): number;");
        let args = call_args("max(...values);");
        assert!(select_overload(overloads(&globals, "max"), &args).is_ok());
    }

    #[test]
    fn locals_shadow_globals() {
        let globals = bind_source("declare function print(...args: any[]): void;");
        let callee = Expr::Ident(Ident {
            name: "print".to_string(),
            span: Span::default(),
        });
        assert!(resolve_callee(&globals, &callee, |name| name == "print").is_none());
    }
}
