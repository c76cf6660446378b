//! Lowering backends.

pub mod lua;

pub use lua::LuaBackend;

use crate::diagnostics::Diagnostic;

/// One emitted file, named after the source file it was lowered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspiledFile {
    pub file_name: String,
    pub lua: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitResult {
    pub transpiled_files: Vec<TranspiledFile>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Emission entry point over a program built by a frontend.
pub trait Backend<P> {
    fn transpile(&self, program: &P) -> EmitResult;
}
