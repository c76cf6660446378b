//! Resolution host that injects the snippet under test.

use std::path::PathBuf;

use tracing::{debug, trace};

use super::cache::FileCache;
use super::SENTINEL_FILE;
use crate::errors::HostError;
use crate::frontend::{CompilerHost, CompilerOptions, Frontend, ScriptTarget, SourceFile};

/// Serves `input` for [`SENTINEL_FILE`] and cached disk contents for every
/// other file. Names starting with `lib.` are read from the frontend's
/// library directory.
pub struct SnippetHost<'a, F> {
    frontend: &'a F,
    cache: &'a mut FileCache,
    input: &'a str,
}

impl<'a, F: Frontend> SnippetHost<'a, F> {
    pub fn new(frontend: &'a F, cache: &'a mut FileCache, input: &'a str) -> Self {
        Self {
            frontend,
            cache,
            input,
        }
    }

    fn disk_path(&self, file_name: &str) -> PathBuf {
        if file_name.starts_with("lib.") {
            self.frontend.lib_dir().join(file_name)
        } else {
            PathBuf::from(file_name)
        }
    }
}

impl<F: Frontend> CompilerHost for SnippetHost<'_, F> {
    fn file_exists(&self, _file_name: &str) -> bool {
        true
    }

    fn canonical_file_name(&self, file_name: &str) -> String {
        file_name.to_string()
    }

    fn current_directory(&self) -> String {
        String::new()
    }

    fn default_lib_file_name(&self, options: &CompilerOptions) -> String {
        self.frontend.default_lib_file_name(options)
    }

    fn read_file(&self, _file_name: &str) -> Option<String> {
        Some(String::new())
    }

    fn new_line(&self) -> &str {
        "\n"
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        false
    }

    fn write_file(&mut self, file_name: &str, _text: &str) {
        trace!(file_name, "discarding write");
    }

    fn source_file(
        &mut self,
        file_name: &str,
        language_version: ScriptTarget,
    ) -> Result<SourceFile, HostError> {
        if file_name == SENTINEL_FILE {
            return Ok(SourceFile::parse(file_name, self.input, language_version));
        }

        if let Some(text) = self.cache.get(file_name) {
            trace!(file_name, "cache hit");
            return Ok(SourceFile::parse(file_name, text, language_version));
        }

        let path = self.disk_path(file_name);
        debug!(file_name, path = %path.display(), "cache miss");
        let text = self.cache.load(file_name, &path)?;
        Ok(SourceFile::parse(file_name, text, language_version))
    }
}
