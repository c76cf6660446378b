//! YAML case suites.
//!
//! A case file holds a list of snippets with their expected Lua:
//! ```yaml
//! - name: "select with #"
//!   input: 'const count = select("#", "a", "b", "c");'
//!   expected: 'local count = select("#", "a", "b", "c")'
//!   expected_by_target:              # optional per-target override
//!     "5.1": '...'
//!   expect_error: "Bitwise"          # diagnostic substring, instead of expected
//!   targets: ["5.2", "5.3"]          # optional, defaults to every target
//!   skip: false
//!   only: false
//! ```
//! Target labels must be quoted; unquoted `5.1` is a YAML float.
//!
//! Every (case, target) pair runs through one shared [`Harness`], so fixture
//! files are read once per suite.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use difference::{Changeset, Difference};
use serde::Deserialize;
use termcolor::{Buffer, Color, ColorSpec, WriteColor};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::backend::Backend;
use crate::errors::{HarnessError, SuiteError};
use crate::frontend::Frontend;
use crate::harness::Harness;
use crate::targets::LuaTarget;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub expected_by_target: BTreeMap<LuaTarget, String>,
    #[serde(default)]
    pub expect_error: Option<String>,
    /// Targets to run; empty means all.
    #[serde(default)]
    pub targets: Vec<LuaTarget>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub only: bool,
}

impl TestCase {
    pub fn runs_on(&self, target: LuaTarget) -> bool {
        self.targets.is_empty() || self.targets.contains(&target)
    }

    /// Expected Lua for `target`, preferring a per-target override.
    pub fn expected_for(&self, target: LuaTarget) -> Option<&str> {
        self.expected_by_target
            .get(&target)
            .or(self.expected.as_ref())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Pass {
        file: String,
        name: String,
        target: LuaTarget,
    },
    Fail {
        file: String,
        name: String,
        target: LuaTarget,
        error: String,
        /// Expected and actual Lua when the failure is an output mismatch.
        mismatch: Option<(String, String)>,
    },
    Skipped {
        file: String,
        name: String,
        target: LuaTarget,
        reason: String,
    },
}

impl TestResult {
    pub fn name(&self) -> &str {
        match self {
            TestResult::Pass { name, .. }
            | TestResult::Fail { name, .. }
            | TestResult::Skipped { name, .. } => name,
        }
    }

    pub fn target(&self) -> LuaTarget {
        match self {
            TestResult::Pass { target, .. }
            | TestResult::Fail { target, .. }
            | TestResult::Skipped { target, .. } => *target,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TestResult::Fail { .. })
    }
}

// ============================================================================
// DISCOVERY AND LOADING
// ============================================================================

/// YAML files under `root`, recursively, in path order.
pub fn discover_yaml_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, SuiteError> {
    let content = fs::read_to_string(path).map_err(|source| SuiteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| SuiteError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn skip_reason(case: &TestCase, has_only: bool, filter: Option<&str>) -> Option<String> {
    if has_only && !case.only {
        return Some("not marked 'only' in 'only' mode".to_string());
    }
    if case.skip {
        return Some("marked 'skip'".to_string());
    }
    if let Some(filter) = filter {
        if !case.name.to_lowercase().contains(&filter.to_lowercase()) {
            return Some(format!("filtered out by substring: {filter}"));
        }
    }
    None
}

// ============================================================================
// EXECUTION
// ============================================================================

/// Run one case for one target.
pub fn run_test_case<F, B>(
    harness: &mut Harness<F, B>,
    file: &str,
    case: &TestCase,
    target: LuaTarget,
) -> TestResult
where
    F: Frontend,
    B: Backend<F::Program>,
{
    let fail = |error: String, mismatch: Option<(String, String)>| TestResult::Fail {
        file: file.to_string(),
        name: case.name.clone(),
        target,
        error,
        mismatch,
    };
    let pass = || TestResult::Pass {
        file: file.to_string(),
        name: case.name.clone(),
        target,
    };

    match (harness.run(target, &case.input), case.expect_error.as_deref()) {
        (Ok(lua), None) => match case.expected_for(target) {
            Some(expected) if expected.trim() == lua => pass(),
            Some(expected) => fail(
                "output did not match expected".to_string(),
                Some((expected.trim().to_string(), lua)),
            ),
            None => fail("case has neither 'expected' nor 'expect_error'".to_string(), None),
        },
        (Ok(lua), Some(expected_error)) => fail(
            format!("expected error '{expected_error}' but compilation succeeded with:\n{lua}"),
            None,
        ),
        // Only compile diagnostics can satisfy an expected error; a broken
        // fixture or mapping always fails the case.
        (Err(error @ HarnessError::Diagnostics { .. }), Some(expected_error))
            if error.to_string().contains(expected_error) =>
        {
            pass()
        }
        (Err(error), _) => fail(error.to_string(), None),
    }
}

/// Run every case in every YAML file under `root` against `harness`.
///
/// A case file that cannot be read or parsed aborts the suite.
pub fn run_suite<F, B>(
    harness: &mut Harness<F, B>,
    root: &Path,
    filter: Option<&str>,
) -> Result<Vec<TestResult>, SuiteError>
where
    F: Frontend,
    B: Backend<F::Program>,
{
    let mut cases = Vec::new();
    for path in discover_yaml_files(root) {
        let file = path.display().to_string();
        for case in load_test_cases(&path)? {
            cases.push((file.clone(), case));
        }
    }
    let has_only = cases.iter().any(|(_, case)| case.only);
    info!(cases = cases.len(), has_only, "running case suite");

    let mut results = Vec::new();
    for (file, case) in &cases {
        let reason = skip_reason(case, has_only, filter);
        for target in LuaTarget::ALL.into_iter().filter(|t| case.runs_on(*t)) {
            let result = match &reason {
                Some(reason) => TestResult::Skipped {
                    file: file.clone(),
                    name: case.name.clone(),
                    target,
                    reason: reason.clone(),
                },
                None => run_test_case(harness, file, case, target),
            };
            debug!(name = %case.name, target = target.label(), failed = result.is_failure(), "case finished");
            results.push(result);
        }
    }
    Ok(results)
}

// ============================================================================
// REPORTING
// ============================================================================

/// Counts of (passed, failed, skipped).
pub fn partition_results(results: &[TestResult]) -> (usize, usize, usize) {
    results
        .iter()
        .fold((0, 0, 0), |(passed, failed, skipped), result| match result {
            TestResult::Pass { .. } => (passed + 1, failed, skipped),
            TestResult::Fail { .. } => (passed, failed + 1, skipped),
            TestResult::Skipped { .. } => (passed, failed, skipped + 1),
        })
}

/// Render a report with one line per result, a diff for each output
/// mismatch, and a summary line.
pub fn render_report(results: &[TestResult], use_colors: bool) -> String {
    let mut buffer = if use_colors {
        Buffer::ansi()
    } else {
        Buffer::no_color()
    };
    // Writes into an in-memory buffer cannot fail.
    let _ = write_report(&mut buffer, results);
    String::from_utf8_lossy(buffer.as_slice()).into_owned()
}

fn write_report(out: &mut Buffer, results: &[TestResult]) -> std::io::Result<()> {
    for result in results {
        let group = result.target().describe(result.name());
        match result {
            TestResult::Pass { file, .. } => {
                write_label(out, "PASS", Color::Green)?;
                writeln!(out, " {group} [{file}]")?;
            }
            TestResult::Skipped { file, reason, .. } => {
                write_label(out, "SKIP", Color::Yellow)?;
                writeln!(out, " {group} [{file}] ({reason})")?;
            }
            TestResult::Fail {
                file,
                error,
                mismatch,
                ..
            } => {
                write_label(out, "FAIL", Color::Red)?;
                writeln!(out, " {group} [{file}]")?;
                for line in error.lines() {
                    writeln!(out, "  {line}")?;
                }
                if let Some((expected, actual)) = mismatch {
                    write_diff(out, expected, actual)?;
                }
            }
        }
    }

    let (passed, failed, skipped) = partition_results(results);
    writeln!(out)?;
    write!(out, "total {}, ", results.len())?;
    write_label(out, "passed", Color::Green)?;
    write!(out, " {passed}, ")?;
    write_label(out, "failed", Color::Red)?;
    write!(out, " {failed}, ")?;
    write_label(out, "skipped", Color::Yellow)?;
    writeln!(out, " {skipped}")
}

fn write_label(out: &mut Buffer, label: &str, color: Color) -> std::io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()
}

fn write_diff(out: &mut Buffer, expected: &str, actual: &str) -> std::io::Result<()> {
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(text) => {
                for line in text.lines() {
                    writeln!(out, "   {line}")?;
                }
            }
            Difference::Rem(text) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                for line in text.lines() {
                    writeln!(out, "  -{line}")?;
                }
                out.reset()?;
            }
            Difference::Add(text) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                for line in text.lines() {
                    writeln!(out, "  +{line}")?;
                }
                out.reset()?;
            }
        }
    }
    Ok(())
}
