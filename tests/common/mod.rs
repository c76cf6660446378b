//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use luatypes_harness::harness::{DiskLoader, SourceLoader};
use luatypes_harness::{Harness, HarnessConfig};
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once. `RUST_LOG=luatypes_harness=debug`
/// shows cache and pipeline events for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A harness over the bundled fixtures.
pub fn harness() -> Harness {
    init_tracing();
    Harness::new(&HarnessConfig::default())
}

/// Disk loader that records how often each path is read.
#[derive(Clone, Default)]
pub struct CountingLoader {
    reads: Rc<RefCell<BTreeMap<PathBuf, usize>>>,
}

impl CountingLoader {
    pub fn reads(&self) -> BTreeMap<PathBuf, usize> {
        self.reads.borrow().clone()
    }

    pub fn total_reads(&self) -> usize {
        self.reads.borrow().values().sum()
    }
}

impl SourceLoader for CountingLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        *self
            .reads
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default() += 1;
        DiskLoader.load(path)
    }
}
