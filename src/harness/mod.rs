//! Transpilation harness.
//!
//! [`Harness::run`] compiles one snippet for one Lua target. The snippet is
//! served as [`SENTINEL_FILE`] next to the target's declaration file, the
//! frontend and backend run against it, and the trimmed Lua emitted for the
//! snippet is returned. Any diagnostic from either stage fails the run.
//!
//! ```rust,no_run
//! use luatypes_harness::{Harness, LuaTarget};
//!
//! let mut harness = Harness::default();
//! let lua = harness.expect_lua(LuaTarget::Lua53, "const x = 1;");
//! assert_eq!(lua, "local x = 1");
//! ```

pub mod cache;
pub mod config;
pub mod host;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, debug_span};

use crate::backend::{Backend, LuaBackend};
use crate::errors::HarnessError;
use crate::frontend::{CompilerOptions, Frontend, TypeScriptFrontend};
use crate::targets::LuaTarget;

pub use cache::{DiskLoader, FileCache, SourceLoader};
pub use config::HarnessConfig;
pub use host::SnippetHost;

/// Logical file name of the snippet under test and of its emitted artifact.
pub const SENTINEL_FILE: &str = "input.ts";

/// Fixture file name for `target`, e.g. `5.1.d.ts`.
pub fn declaration_file_name(target: LuaTarget) -> String {
    format!("{}.d.ts", target.label())
}

// ============================================================================
// DECLARATION MAP
// ============================================================================

/// Declaration file to load for each target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationMap {
    paths: BTreeMap<LuaTarget, PathBuf>,
}

impl DeclarationMap {
    /// `<root>/<label>.d.ts` for every target.
    pub fn from_root(root: &Path) -> Self {
        let paths = LuaTarget::ALL
            .into_iter()
            .map(|target| (target, root.join(declaration_file_name(target))))
            .collect();
        Self { paths }
    }

    pub fn path_for(&self, target: LuaTarget) -> Option<&Path> {
        self.paths.get(&target).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, target: LuaTarget, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.paths.insert(target, path.into())
    }

    pub fn remove(&mut self, target: LuaTarget) -> Option<PathBuf> {
        self.paths.remove(&target)
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness<F = TypeScriptFrontend, B = LuaBackend> {
    frontend: F,
    backend: B,
    declarations: DeclarationMap,
    cache: FileCache,
}

impl Harness {
    pub fn new(config: &HarnessConfig) -> Self {
        Self::with_toolchain(
            TypeScriptFrontend::new(&config.lib_dir),
            LuaBackend,
            DeclarationMap::from_root(&config.declarations_root),
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(&HarnessConfig::default())
    }
}

impl<F, B> Harness<F, B>
where
    F: Frontend,
    B: Backend<F::Program>,
{
    pub fn with_toolchain(frontend: F, backend: B, declarations: DeclarationMap) -> Self {
        Self {
            frontend,
            backend,
            declarations,
            cache: FileCache::new(),
        }
    }

    /// Replace the file cache, e.g. with one reading through a custom loader.
    pub fn with_cache(mut self, cache: FileCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn declarations(&self) -> &DeclarationMap {
        &self.declarations
    }

    pub fn declarations_mut(&mut self) -> &mut DeclarationMap {
        &mut self.declarations
    }

    /// Compile `input` for `target` and return the trimmed Lua emitted for it.
    pub fn run(&mut self, target: LuaTarget, input: &str) -> Result<String, HarnessError> {
        let span = debug_span!("run", target = target.label());
        let _entered = span.enter();

        let declaration = self
            .declarations
            .path_for(target)
            .ok_or(HarnessError::MissingDeclaration { target })?;
        let root_names = [
            SENTINEL_FILE.to_string(),
            declaration.to_string_lossy().into_owned(),
        ];
        let options = CompilerOptions {
            lua_target: target,
            no_header: true,
            ..CompilerOptions::default()
        };

        let mut host = SnippetHost::new(&self.frontend, &mut self.cache, input);
        let program = self
            .frontend
            .create_program(&root_names, &options, &mut host)?;
        let emitted = self.backend.transpile(&program);

        let diagnostics: Vec<_> = self
            .frontend
            .pre_emit_diagnostics(&program)
            .into_iter()
            .chain(emitted.diagnostics)
            .collect();
        debug!(
            diagnostics = diagnostics.len(),
            artifacts = emitted.transpiled_files.len(),
            cached_files = self.cache.len(),
            "pipeline finished"
        );
        if !diagnostics.is_empty() {
            return Err(HarnessError::Diagnostics {
                target,
                diagnostics,
            });
        }

        emitted
            .transpiled_files
            .iter()
            .find(|file| file.file_name == SENTINEL_FILE)
            .map(|file| file.lua.trim().to_string())
            .ok_or_else(|| HarnessError::MissingArtifact {
                file_name: SENTINEL_FILE.to_string(),
                emitted: emitted
                    .transpiled_files
                    .iter()
                    .map(|file| file.file_name.clone())
                    .collect(),
            })
    }

    /// Like [`Harness::run`], but panics with a rendered report on failure.
    pub fn expect_lua(&mut self, target: LuaTarget, input: &str) -> String {
        match self.run(target, input) {
            Ok(lua) => lua,
            Err(error) => panic!("{:?}", miette::Report::new(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_map_covers_every_target() {
        let map = DeclarationMap::from_root(Path::new("/types"));
        for target in LuaTarget::ALL {
            let expected = format!("/types/{}.d.ts", target.label());
            assert_eq!(map.path_for(target), Some(Path::new(&expected)));
        }
    }

    #[test]
    fn removed_entries_are_reported_before_compiling() {
        let mut harness = Harness::default();
        harness.declarations_mut().remove(LuaTarget::Lua52);
        let error = harness.run(LuaTarget::Lua52, "const x = 1;").unwrap_err();
        assert!(matches!(
            error,
            HarnessError::MissingDeclaration {
                target: LuaTarget::Lua52
            }
        ));
        assert!(harness.cache().is_empty());
    }
}
