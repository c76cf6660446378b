//! Reference TypeScript-subset frontend.
//!
//! Builds a [`Program`] from root file names through a [`CompilerHost`],
//! following `/// <reference path>` directives and the default library, then
//! binds ambient declarations into one global symbol table. Pre-emit
//! diagnostics are syntactic problems of every file followed by semantic
//! problems of every non-declaration file.

pub mod ast;
pub mod binder;
pub mod checker;
pub mod parser;

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::diagnostics::Diagnostic;
use crate::errors::HostError;
use crate::targets::LuaTarget;

use self::ast::Stmt;
use self::binder::SymbolTable;

/// Code used for every syntax error.
pub const SYNTAX_ERROR_CODE: u32 = 1005;

/// Code reported when the host says a referenced file does not exist.
pub const FILE_NOT_FOUND_CODE: u32 = 6053;

static REFERENCE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*///\s*<reference\s+path\s*=\s*["']([^"']+)["']\s*/>"#)
        .expect("reference directive pattern is valid")
});

// ============================================================================
// OPTIONS
// ============================================================================

/// Language version used for parsing and for picking the default library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptTarget {
    #[default]
    ES5,
    ES2015,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    pub target: ScriptTarget,
    pub lua_target: LuaTarget,
    /// Suppress the generated-file header comment.
    pub no_header: bool,
    /// Do not load the default library file.
    pub no_lib: bool,
}

// ============================================================================
// HOST
// ============================================================================

/// File resolution capabilities the frontend requires from its environment.
pub trait CompilerHost {
    fn file_exists(&self, file_name: &str) -> bool;
    fn canonical_file_name(&self, file_name: &str) -> String;
    fn current_directory(&self) -> String;
    fn default_lib_file_name(&self, options: &CompilerOptions) -> String;
    fn read_file(&self, file_name: &str) -> Option<String>;
    fn new_line(&self) -> &str;
    fn use_case_sensitive_file_names(&self) -> bool;
    fn write_file(&mut self, file_name: &str, text: &str);
    fn source_file(
        &mut self,
        file_name: &str,
        language_version: ScriptTarget,
    ) -> Result<SourceFile, HostError>;
}

// ============================================================================
// SOURCE FILES
// ============================================================================

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
    pub language_version: ScriptTarget,
    pub statements: Vec<Stmt>,
    /// Paths named by `/// <reference path>` directives, as written.
    pub references: Vec<String>,
    pub parse_diagnostics: Vec<Diagnostic>,
}

impl SourceFile {
    /// Parse `text`. A syntax error leaves the file without statements and
    /// records a diagnostic instead of failing.
    pub fn parse(
        file_name: impl Into<String>,
        text: impl Into<String>,
        language_version: ScriptTarget,
    ) -> Self {
        let file_name = file_name.into();
        let text = text.into();
        let references = REFERENCE_PATH
            .captures_iter(&text)
            .map(|captures| captures[1].to_string())
            .collect();

        let (statements, parse_diagnostics) = match parser::parse_source(&text) {
            Ok(statements) => (statements, Vec::new()),
            Err(error) => {
                let diagnostic = Diagnostic::error(SYNTAX_ERROR_CODE, error.message).at(
                    &file_name,
                    &text,
                    error.offset,
                );
                (Vec::new(), vec![diagnostic])
            }
        };

        Self {
            file_name,
            text,
            language_version,
            statements,
            references,
            parse_diagnostics,
        }
    }

    pub fn is_declaration_file(&self) -> bool {
        self.file_name.ends_with(".d.ts")
    }
}

// ============================================================================
// PROGRAM
// ============================================================================

#[derive(Debug, Clone)]
pub struct Program {
    options: CompilerOptions,
    root_names: Vec<String>,
    files: Vec<SourceFile>,
    globals: SymbolTable,
    new_line: String,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn root_names(&self) -> &[String] {
        &self.root_names
    }

    /// Files in load order: referenced files precede the files referencing them.
    pub fn source_files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn source_file(&self, file_name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|file| file.file_name == file_name)
    }

    pub fn globals(&self) -> &SymbolTable {
        &self.globals
    }

    pub fn new_line(&self) -> &str {
        &self.new_line
    }

    /// Diagnostics raised while loading files (missing references).
    pub fn program_diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

// ============================================================================
// FRONTEND
// ============================================================================

/// Compiler frontend as seen by the harness.
pub trait Frontend {
    type Program;

    fn create_program(
        &self,
        root_names: &[String],
        options: &CompilerOptions,
        host: &mut dyn CompilerHost,
    ) -> Result<Self::Program, HostError>;

    fn pre_emit_diagnostics(&self, program: &Self::Program) -> Vec<Diagnostic>;

    fn default_lib_file_name(&self, options: &CompilerOptions) -> String;

    /// Directory holding the standard library files named `lib.*`.
    fn lib_dir(&self) -> &Path;
}

#[derive(Debug, Clone)]
pub struct TypeScriptFrontend {
    lib_dir: PathBuf,
}

impl TypeScriptFrontend {
    pub fn new(lib_dir: impl Into<PathBuf>) -> Self {
        Self {
            lib_dir: lib_dir.into(),
        }
    }
}

impl Default for TypeScriptFrontend {
    fn default() -> Self {
        Self::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/typescript/lib"))
    }
}

impl Frontend for TypeScriptFrontend {
    type Program = Program;

    fn create_program(
        &self,
        root_names: &[String],
        options: &CompilerOptions,
        host: &mut dyn CompilerHost,
    ) -> Result<Program, HostError> {
        let current_directory = host.current_directory();
        let mut loader = ProgramLoader {
            host,
            language_version: options.target,
            seen: HashSet::new(),
            files: Vec::new(),
            diagnostics: Vec::new(),
        };

        for root in root_names {
            let file_name = if current_directory.is_empty() {
                root.clone()
            } else {
                join_lexically(Path::new(&current_directory), root)
            };
            loader.load(&file_name, None)?;
        }

        if !options.no_lib {
            let lib = loader.host.default_lib_file_name(options);
            loader.load(&lib, None)?;
        }

        let new_line = loader.host.new_line().to_string();
        let ProgramLoader {
            files, diagnostics, ..
        } = loader;
        let globals = binder::bind(&files);
        debug!(
            files = files.len(),
            globals = globals.len(),
            "program created"
        );

        Ok(Program {
            options: options.clone(),
            root_names: root_names.to_vec(),
            files,
            globals,
            new_line,
            diagnostics,
        })
    }

    fn pre_emit_diagnostics(&self, program: &Program) -> Vec<Diagnostic> {
        let mut diagnostics = program.diagnostics.clone();
        for file in &program.files {
            diagnostics.extend(file.parse_diagnostics.iter().cloned());
        }
        for file in program.files.iter().filter(|f| !f.is_declaration_file()) {
            diagnostics.extend(checker::check_file(file, &program.globals));
        }
        diagnostics
    }

    fn default_lib_file_name(&self, options: &CompilerOptions) -> String {
        match options.target {
            ScriptTarget::ES5 => "lib.d.ts".to_string(),
            ScriptTarget::ES2015 => "lib.es6.d.ts".to_string(),
        }
    }

    fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }
}

struct ProgramLoader<'h> {
    host: &'h mut dyn CompilerHost,
    language_version: ScriptTarget,
    seen: HashSet<String>,
    files: Vec<SourceFile>,
    diagnostics: Vec<Diagnostic>,
}

impl ProgramLoader<'_> {
    fn key(&self, file_name: &str) -> String {
        let canonical = self.host.canonical_file_name(file_name);
        if self.host.use_case_sensitive_file_names() {
            canonical
        } else {
            canonical.to_lowercase()
        }
    }

    /// Load `file_name` and everything it references, depth first. A file is
    /// pushed after its references so declarations come before their users.
    fn load(&mut self, file_name: &str, referenced_from: Option<&str>) -> Result<(), HostError> {
        if !self.seen.insert(self.key(file_name)) {
            trace!(file_name, "already loaded");
            return Ok(());
        }

        if !self.host.file_exists(file_name) {
            let message = format!("File '{file_name}' not found.");
            let mut diagnostic = Diagnostic::error(FILE_NOT_FOUND_CODE, message);
            if let Some(parent) = referenced_from {
                diagnostic = diagnostic.at(parent, "", 0);
            }
            self.diagnostics.push(diagnostic);
            return Ok(());
        }

        let file = self.host.source_file(file_name, self.language_version)?;
        let base = Path::new(file_name)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        for reference in &file.references {
            let resolved = join_lexically(&base, reference);
            self.load(&resolved, Some(file_name))?;
        }

        trace!(file_name, "loaded");
        self.files.push(file);
        Ok(())
    }
}

/// Join `relative` onto `base` and fold `.` and `..` components without
/// touching the file system.
fn join_lexically(base: &Path, relative: &str) -> String {
    let mut joined = PathBuf::new();
    for component in base.join(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !joined.pop() {
                    joined.push("..");
                }
            }
            other => joined.push(other.as_os_str()),
        }
    }
    joined.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// In-memory host over a fixed set of files.
    struct MapHost {
        files: HashMap<String, String>,
        requested: Vec<String>,
    }

    impl MapHost {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(name, text)| (name.to_string(), text.to_string()))
                    .collect(),
                requested: Vec::new(),
            }
        }
    }

    impl CompilerHost for MapHost {
        fn file_exists(&self, file_name: &str) -> bool {
            self.files.contains_key(file_name)
        }
        fn canonical_file_name(&self, file_name: &str) -> String {
            file_name.to_string()
        }
        fn current_directory(&self) -> String {
            String::new()
        }
        fn default_lib_file_name(&self, _options: &CompilerOptions) -> String {
            "lib.d.ts".to_string()
        }
        fn read_file(&self, file_name: &str) -> Option<String> {
            self.files.get(file_name).cloned()
        }
        fn new_line(&self) -> &str {
            "\n"
        }
        fn use_case_sensitive_file_names(&self) -> bool {
            true
        }
        fn write_file(&mut self, _file_name: &str, _text: &str) {}
        fn source_file(
            &mut self,
            file_name: &str,
            language_version: ScriptTarget,
        ) -> Result<SourceFile, HostError> {
            self.requested.push(file_name.to_string());
            let text = self.files.get(file_name).cloned().unwrap_or_default();
            Ok(SourceFile::parse(file_name, text, language_version))
        }
    }

    fn no_lib() -> CompilerOptions {
        CompilerOptions {
            no_lib: true,
            ..CompilerOptions::default()
        }
    }

    #[test]
    fn references_load_before_the_referencing_file() {
        let mut host = MapHost::new(&[
            ("types/5.1.d.ts", "/// <reference path=\"./core/global.d.ts\" />\n"),
            ("types/core/global.d.ts", "declare function print(...args: any[]): void;"),
        ]);
        let program = TypeScriptFrontend::default()
            .create_program(&["types/5.1.d.ts".to_string()], &no_lib(), &mut host)
            .unwrap();
        let names: Vec<_> = program
            .source_files()
            .iter()
            .map(|f| f.file_name.as_str())
            .collect();
        assert_eq!(names, ["types/core/global.d.ts", "types/5.1.d.ts"]);
        assert!(program.globals().contains_key("print"));
    }

    #[test]
    fn each_file_is_loaded_once() {
        let mut host = MapHost::new(&[
            ("a.d.ts", "/// <reference path=\"shared.d.ts\" />"),
            ("b.d.ts", "/// <reference path=\"./shared.d.ts\" />"),
            ("shared.d.ts", "declare const x: number;"),
        ]);
        let roots = ["a.d.ts".to_string(), "b.d.ts".to_string()];
        TypeScriptFrontend::default()
            .create_program(&roots, &no_lib(), &mut host)
            .unwrap();
        assert_eq!(host.requested, ["a.d.ts", "shared.d.ts", "b.d.ts"]);
    }

    #[test]
    fn default_library_follows_the_script_target() {
        let frontend = TypeScriptFrontend::default();
        let es5 = CompilerOptions::default();
        let es2015 = CompilerOptions {
            target: ScriptTarget::ES2015,
            ..CompilerOptions::default()
        };
        assert_eq!(frontend.default_lib_file_name(&es5), "lib.d.ts");
        assert_eq!(frontend.default_lib_file_name(&es2015), "lib.es6.d.ts");
    }

    #[test]
    fn default_library_is_loaded_after_roots() {
        let mut host = MapHost::new(&[("input.ts", "print(1);"), ("lib.d.ts", "")]);
        TypeScriptFrontend::default()
            .create_program(&["input.ts".to_string()], &CompilerOptions::default(), &mut host)
            .unwrap();
        assert_eq!(host.requested, ["input.ts", "lib.d.ts"]);
    }

    #[test]
    fn missing_reference_becomes_a_diagnostic() {
        let mut host = MapHost::new(&[("a.d.ts", "/// <reference path=\"gone.d.ts\" />")]);
        let frontend = TypeScriptFrontend::default();
        let program = frontend
            .create_program(&["a.d.ts".to_string()], &no_lib(), &mut host)
            .unwrap();
        let diagnostics = frontend.pre_emit_diagnostics(&program);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, FILE_NOT_FOUND_CODE);
        assert_eq!(diagnostics[0].message_text, "File 'gone.d.ts' not found.");
    }

    #[test]
    fn syntax_errors_are_diagnostics_not_failures() {
        let file = SourceFile::parse("input.ts", "const = ;", ScriptTarget::ES5);
        assert!(file.statements.is_empty());
        assert_eq!(file.parse_diagnostics.len(), 1);
        assert_eq!(file.parse_diagnostics[0].code, SYNTAX_ERROR_CODE);
    }

    #[test]
    fn collects_reference_directives() {
        let file = SourceFile::parse(
            "5.3.d.ts",
            "/// <reference path=\"./core/index.d.ts\" />\n///<reference path='./special/5.3-only.d.ts'/>\n",
            ScriptTarget::ES5,
        );
        assert_eq!(
            file.references,
            ["./core/index.d.ts", "./special/5.3-only.d.ts"]
        );
        assert!(file.is_declaration_file());
    }

    #[test]
    fn joins_paths_lexically() {
        assert_eq!(
            join_lexically(Path::new("/types/core"), "../special/jit-only.d.ts"),
            "/types/special/jit-only.d.ts"
        );
        assert_eq!(join_lexically(Path::new(""), "lib.es5.d.ts"), "lib.es5.d.ts");
    }
}
