use std::path::{Path, PathBuf};

/// Decides whether a block's generated source must be rewritten and
/// recompiled. The default policy keys on artifact presence; swapping in a
/// content-addressed policy does not touch the pipeline.
pub trait CachePolicy {
    /// True when the artifact already exists and the source write and
    /// compile steps can be skipped.
    fn is_cached(&self, artifact: &Path) -> bool;
}

/// The artifact file's existence on disk *is* the cache; there is no index
/// or metadata. The key is positional (input stem + block counter), not
/// content-derived, so editing a block's body without clearing the artifact
/// directory reuses the stale artifact.
pub struct PresenceCache;

impl CachePolicy for PresenceCache {
    fn is_cached(&self, artifact: &Path) -> bool {
        artifact.exists()
    }
}

/// Generated-source path for block `index` of input `stem`:
/// `out_dir/{stem}{index}.{tag}`.
pub fn source_path(out_dir: &Path, stem: &str, index: usize, tag: &str) -> PathBuf {
    out_dir.join(format!("{}{}.{}", stem, index, tag))
}

/// Artifact path: the source path with the language's output extension
/// appended (not replaced). An empty extension makes the source file
/// itself the artifact.
pub fn artifact_path(source: &Path, output_extension: &str) -> PathBuf {
    let mut path = source.as_os_str().to_os_string();
    path.push(output_extension);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_path_is_stem_counter_tag() {
        let path = source_path(Path::new("bin"), "doc", 2, "py");
        assert_eq!(path, PathBuf::from("bin/doc2.py"));
    }

    #[test]
    fn artifact_extension_is_appended_not_replaced() {
        let source = PathBuf::from("bin/doc0.c");
        assert_eq!(artifact_path(&source, ".out"), PathBuf::from("bin/doc0.c.out"));
    }

    #[test]
    fn empty_extension_artifact_is_the_source() {
        let source = PathBuf::from("bin/doc0.py");
        assert_eq!(artifact_path(&source, ""), source);
    }

    #[test]
    fn presence_cache_tracks_file_existence() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("doc0.c.out");

        assert!(!PresenceCache.is_cached(&artifact));
        std::fs::write(&artifact, b"").unwrap();
        assert!(PresenceCache.is_cached(&artifact));
    }
}
