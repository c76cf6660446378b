//! Memoized file contents for library and declaration fixtures.
//!
//! Entries are keyed by the file name the frontend asked for, not the path
//! that was read. The first read wins and nothing is ever invalidated.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::errors::HostError;

/// Reads file contents on a cache miss.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads straight from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskLoader;

impl SourceLoader for DiskLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

pub struct FileCache {
    entries: HashMap<String, String>,
    loader: Box<dyn SourceLoader>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::with_loader(DiskLoader)
    }

    pub fn with_loader(loader: impl SourceLoader + 'static) -> Self {
        Self {
            entries: HashMap::new(),
            loader: Box::new(loader),
        }
    }

    /// Cached text for `file_name`. An empty file is still a hit.
    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    /// Text for `file_name`, reading `path` only if nothing is cached yet.
    pub fn load(&mut self, file_name: &str, path: &Path) -> Result<&str, HostError> {
        if !self.entries.contains_key(file_name) {
            let text = self.loader.load(path).map_err(|source| HostError::Read {
                file_name: file_name.to_string(),
                path: path.to_path_buf(),
                source,
            })?;
            debug!(file_name, path = %path.display(), bytes = text.len(), "cached file");
            self.entries.insert(file_name.to_string(), text);
        }
        Ok(self.get(file_name).unwrap_or_default())
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.contains_key(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("FileCache").field("entries", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Counting {
        reads: Rc<Cell<usize>>,
        text: &'static str,
    }

    impl SourceLoader for Counting {
        fn load(&self, _path: &Path) -> io::Result<String> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.text.to_string())
        }
    }

    #[test]
    fn first_read_wins() {
        let reads = Rc::new(Cell::new(0));
        let mut cache = FileCache::with_loader(Counting {
            reads: Rc::clone(&reads),
            text: "declare const x: number;",
        });
        assert_eq!(
            cache.load("5.1.d.ts", Path::new("/a/5.1.d.ts")).unwrap(),
            "declare const x: number;"
        );
        cache.load("5.1.d.ts", Path::new("/b/5.1.d.ts")).unwrap();
        assert_eq!(reads.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn empty_files_are_cache_hits() {
        let reads = Rc::new(Cell::new(0));
        let mut cache = FileCache::with_loader(Counting {
            reads: Rc::clone(&reads),
            text: "",
        });
        cache.load("empty.d.ts", Path::new("empty.d.ts")).unwrap();
        assert_eq!(cache.get("empty.d.ts"), Some(""));
        cache.load("empty.d.ts", Path::new("empty.d.ts")).unwrap();
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn read_failures_name_the_file() {
        let mut cache = FileCache::new();
        let error = cache
            .load("missing.d.ts", Path::new("/definitely/not/here/missing.d.ts"))
            .unwrap_err();
        let HostError::Read { file_name, .. } = &error;
        assert_eq!(file_name, "missing.d.ts");
        assert!(!cache.contains("missing.d.ts"));
    }
}
