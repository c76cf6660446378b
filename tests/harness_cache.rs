//! Fixture caching across harness runs.

mod common;

use std::fs;

use common::CountingLoader;
use luatypes_harness::{FileCache, Harness, HarnessConfig, LuaTarget, SENTINEL_FILE};

fn counting_harness(config: &HarnessConfig) -> (Harness, CountingLoader) {
    common::init_tracing();
    let loader = CountingLoader::default();
    let harness = Harness::new(config).with_cache(FileCache::with_loader(loader.clone()));
    (harness, loader)
}

#[test]
fn fixtures_are_read_once_across_runs() {
    let (mut harness, loader) = counting_harness(&HarnessConfig::default());

    harness.expect_lua(LuaTarget::Lua53, "const x = 1;");
    let after_first = loader.total_reads();
    assert!(after_first > 0);

    harness.expect_lua(LuaTarget::Lua53, "const y = 2;");
    assert_eq!(loader.total_reads(), after_first);
    assert!(loader.reads().values().all(|&count| count == 1));
}

#[test]
fn shared_files_are_read_once_across_targets() {
    let (mut harness, loader) = counting_harness(&HarnessConfig::default());
    for target in LuaTarget::ALL {
        harness.expect_lua(target, "const x = 1;");
    }

    let reads = loader.reads();
    assert!(reads.values().all(|&count| count == 1), "{reads:?}");
    let core_reads = reads
        .keys()
        .filter(|path| path.ends_with("core/global.d.ts"))
        .count();
    assert_eq!(core_reads, 1);
    for target in LuaTarget::ALL {
        let declaration = harness.declarations().path_for(target).unwrap();
        assert!(reads.contains_key(declaration), "{} never read", declaration.display());
    }
}

#[test]
fn snippet_is_never_cached() {
    let (mut harness, loader) = counting_harness(&HarnessConfig::default());

    let first = harness.expect_lua(LuaTarget::LuaJit, "const a = 1;");
    let second = harness.expect_lua(LuaTarget::LuaJit, "const b = 2;");
    assert_eq!(first, "local a = 1");
    assert_eq!(second, "local b = 2");
    assert!(!harness.cache().contains(SENTINEL_FILE));
    assert!(loader
        .reads()
        .keys()
        .all(|path| !path.ends_with(SENTINEL_FILE)));
}

#[test]
fn repeated_runs_are_deterministic() {
    let mut harness = common::harness();
    let input = r#"const values = select(2, "a", "b", "c");"#;
    let first = harness.expect_lua(LuaTarget::Lua52, input);
    let cached_files = harness.cache().len();

    let second = harness.expect_lua(LuaTarget::Lua52, input);
    assert_eq!(first, second);
    assert_eq!(harness.cache().len(), cached_files);
}

#[test]
fn empty_files_stay_cached() {
    let dir = tempfile::tempdir().unwrap();
    for target in LuaTarget::ALL {
        fs::write(dir.path().join(format!("{}.d.ts", target.label())), "").unwrap();
    }
    let config = HarnessConfig {
        declarations_root: dir.path().to_path_buf(),
        ..HarnessConfig::default()
    };
    let (mut harness, loader) = counting_harness(&config);

    assert_eq!(harness.expect_lua(LuaTarget::Lua51, "const x = 1;"), "local x = 1");
    assert_eq!(harness.expect_lua(LuaTarget::Lua51, "const y = 1;"), "local y = 1");

    let declaration = dir.path().join("5.1.d.ts");
    assert_eq!(loader.reads().get(&declaration), Some(&1));
    assert_eq!(
        harness.cache().get(&declaration.to_string_lossy()),
        Some("")
    );
}
