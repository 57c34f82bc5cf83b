//! Cross-run state: the slug cache and the file-change cache.
//!
//! These two files under `.cache/` are the only state that survives a build.
//! The slug cache records which pages existed after the last full build so
//! the next one can prune output for deleted sources without rebuilding the
//! world; the file-change cache keeps a content digest per tracked source
//! file. Digests are content-based rather than mtime-based so they survive
//! checkouts that reset modification times.
//!
//! Both caches are deliberately forgiving: a missing or corrupt cache file
//! reads as "no previous state" and a failed write is logged, never fatal.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Persists the set of slug keys produced by the previous full build.
pub struct SlugCache {
    path: PathBuf,
}

impl SlugCache {
    pub fn new(path: &Path) -> SlugCache {
        SlugCache {
            path: path.to_owned(),
        }
    }

    /// Reads the persisted slug set. Absent or corrupt caches yield an empty
    /// set; corruption is worth a warning, absence isn't.
    pub fn load(&self) -> BTreeSet<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return BTreeSet::new(),
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(slugs) => slugs.into_iter().collect(),
            Err(e) => {
                crate::log!("warn"; "ignoring corrupt slug cache {}: {}", self.path.display(), e);
                BTreeSet::new()
            }
        }
    }

    /// Writes the current build's slug set as a sorted JSON sequence,
    /// creating parent directories as needed. Failures are logged.
    pub fn save(&self, slugs: &BTreeSet<String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                crate::log!("warn"; "could not create {}: {}", parent.display(), e);
                return;
            }
        }
        let entries: Vec<&String> = slugs.iter().collect();
        let json = match serde_json::to_string(&entries) {
            Ok(json) => json,
            Err(e) => {
                crate::log!("warn"; "could not serialize slug cache: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            crate::log!("warn"; "could not save slug cache {}: {}", self.path.display(), e);
        }
    }

    /// Removes the cache file, forcing the next full build to reconcile
    /// output from scratch. Used when an incremental build observes a
    /// deleted source.
    pub fn invalidate(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                crate::log!("warn"; "could not remove slug cache {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Tracks a content digest per source file under a cache directory.
pub struct FileChangeCache {
    dir: PathBuf,
}

impl FileChangeCache {
    pub fn new(dir: &Path) -> FileChangeCache {
        FileChangeCache {
            dir: dir.to_owned(),
        }
    }

    /// Digests `path` and compares against the stored digest, updating the
    /// store unconditionally. Returns whether the digest differed or no
    /// prior digest existed.
    pub fn changed(&self, path: &Path) -> io::Result<bool> {
        fs::create_dir_all(&self.dir)?;

        let digest = hex::encode(blake3::hash(&fs::read(path)?).as_bytes());
        let entry = self.entry_path(path);
        let previous = fs::read_to_string(&entry).ok();
        fs::write(&entry, &digest)?;

        Ok(match previous {
            Some(prev) => prev.trim() != digest,
            None => true,
        })
    }

    // Same source path must always map to the same entry file; separators
    // are folded into the name so the cache directory stays flat.
    fn entry_path(&self, path: &Path) -> PathBuf {
        let safe = path
            .to_string_lossy()
            .replace('/', "__")
            .replace('\\', "__");
        self.dir.join(format!("{}.hash", safe))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slug_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SlugCache::new(&dir.path().join(".cache/page-slugs.json"));

        let mut slugs = BTreeSet::new();
        slugs.insert("index".to_owned());
        slugs.insert("posts/hello".to_owned());
        cache.save(&slugs);

        assert_eq!(cache.load(), slugs);
    }

    #[test]
    fn test_slug_cache_absent_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SlugCache::new(&dir.path().join("missing.json"));
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_slug_cache_corrupt_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slugs.json");
        fs::write(&path, "{not json").unwrap();
        assert!(SlugCache::new(&path).load().is_empty());
    }

    #[test]
    fn test_slug_cache_saved_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slugs.json");
        let cache = SlugCache::new(&path);

        let slugs: BTreeSet<String> =
            vec!["zebra".to_owned(), "alpha".to_owned(), "mid".to_owned()]
                .into_iter()
                .collect();
        cache.save(&slugs);

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"["alpha","mid","zebra"]"#);
    }

    #[test]
    fn test_slug_cache_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slugs.json");
        let cache = SlugCache::new(&path);
        cache.save(&BTreeSet::new());
        assert!(path.exists());
        cache.invalidate();
        assert!(!path.exists());
        // A second invalidate on a missing file is a no-op.
        cache.invalidate();
    }

    #[test]
    fn test_file_change_cache_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let tracked = dir.path().join("post.md");
        fs::write(&tracked, "one").unwrap();

        let cache = FileChangeCache::new(&dir.path().join(".cache"));
        assert!(cache.changed(&tracked).unwrap());
        assert!(!cache.changed(&tracked).unwrap());

        fs::write(&tracked, "two").unwrap();
        assert!(cache.changed(&tracked).unwrap());
        assert!(!cache.changed(&tracked).unwrap());
    }

    #[test]
    fn test_file_change_cache_entry_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileChangeCache::new(&dir.path().join(".cache"));
        let a = cache.entry_path(Path::new("content/posts/a.md"));
        let b = cache.entry_path(Path::new("content/posts/a.md"));
        assert_eq!(a, b);
        assert_eq!(
            a.file_name().unwrap().to_string_lossy(),
            "content__posts__a.md.hash"
        );
    }

    #[test]
    fn test_file_change_cache_missing_source_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileChangeCache::new(&dir.path().join(".cache"));
        assert!(cache.changed(&dir.path().join("nope.md")).is_err());
    }
}
