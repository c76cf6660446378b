//! Harness error types.
//!
//! Input problems (the snippet does not compile cleanly) and configuration
//! defects (a missing declaration mapping, a missing artifact, an unreadable
//! fixture) are separate variants so callers can tell a failing snippet from
//! a broken harness. Nothing here is retried.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::targets::LuaTarget;

/// Failure of the resolution host to supply a file.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum HostError {
    #[error("failed to read '{file_name}' from {}", path.display())]
    #[diagnostic(
        code(harness::host::read),
        help("library and declaration fixtures must stay readable for the whole run")
    )]
    Read {
        file_name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum HarnessError {
    #[error("no declaration file is mapped for target {target}")]
    #[diagnostic(
        code(harness::config::missing_declaration),
        help("add a declaration file for every target to the declaration map")
    )]
    MissingDeclaration { target: LuaTarget },

    #[error("compiling for {target} produced diagnostics:\n{}", render_diagnostics(.diagnostics))]
    #[diagnostic(code(harness::diagnostics))]
    Diagnostics {
        target: LuaTarget,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("no emitted file matches '{file_name}' (emitted: {})", .emitted.join(", "))]
    #[diagnostic(
        code(harness::missing_artifact),
        help("the backend must emit one file per non-declaration source file, keeping its name")
    )]
    MissingArtifact {
        file_name: String,
        emitted: Vec<String>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Host(#[from] HostError),
}

impl HarnessError {
    /// Message texts of the diagnostics behind a failed compilation.
    pub fn diagnostic_messages(&self) -> Vec<&str> {
        match self {
            HarnessError::Diagnostics { diagnostics, .. } => diagnostics
                .iter()
                .map(|d| d.message_text.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when the harness or its environment is misconfigured, as opposed
    /// to the snippet failing to compile.
    pub fn is_configuration_defect(&self) -> bool {
        !matches!(self, HarnessError::Diagnostics { .. })
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors loading harness configuration.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    #[diagnostic(code(harness::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid harness config")]
    #[diagnostic(code(harness::config::parse))]
    Parse(#[from] serde_yaml::Error),
}

/// Errors loading YAML case suites.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum SuiteError {
    #[error("failed to read case file {}", path.display())]
    #[diagnostic(code(harness::suite::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse case file {}", path.display())]
    #[diagnostic(
        code(harness::suite::parse),
        help("target labels such as \"5.1\" must be quoted so YAML does not read them as numbers")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
