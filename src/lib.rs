//! Multi-target test harness for Lua declaration files.
//!
//! Compiles TypeScript snippets against the declaration file of each
//! supported Lua version and returns the emitted Lua for snapshot tests.
//!
//! ```rust,no_run
//! use luatypes_harness::{for_each_target, Harness};
//!
//! let mut harness = Harness::default();
//! for_each_target("global", |target| {
//!     let lua = harness.expect_lua(target, "print(tostring(213.4));");
//!     assert_eq!(lua, "print(tostring(213.4))");
//! });
//! ```

pub mod backend;
pub mod diagnostics;
pub mod errors;
pub mod frontend;
pub mod harness;
pub mod suite;
pub mod targets;

pub use crate::diagnostics::{Diagnostic, DiagnosticCategory};
pub use crate::errors::{ConfigError, HarnessError, HostError, SuiteError};
pub use crate::harness::{DeclarationMap, FileCache, Harness, HarnessConfig, SENTINEL_FILE};
pub use crate::targets::{for_each_target, LuaTarget};
