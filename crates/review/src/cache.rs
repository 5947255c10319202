//! Local copy of the last loaded annotation set per session.
//!
//! The cache pre-populates the store when a session is opened so the
//! reviewer sees the previous results before the first round trip
//! completes. Cache failures are logged and otherwise ignored.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use wildid_core::Annotation;

/// Storage for the last-fetched annotations of each session.
#[async_trait]
pub trait AnnotationCache: Send + Sync {
    /// Cached annotations for `session_id`, if any.
    async fn get(&self, session_id: &str) -> Option<Vec<Annotation>>;

    /// Overwrite the cached annotations for `session_id`.
    async fn set(&self, session_id: &str, annotations: &[Annotation]);
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// Process-local cache. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<Annotation>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnnotationCache for MemoryCache {
    async fn get(&self, session_id: &str) -> Option<Vec<Annotation>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(session_id).cloned()
    }

    async fn set(&self, session_id: &str, annotations: &[Annotation]) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(session_id.to_string(), annotations.to_vec());
    }
}

// ---------------------------------------------------------------------------
// FileCache
// ---------------------------------------------------------------------------

/// One JSON file per session under a cache directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `session_id`'s annotations.
    ///
    /// The id is percent-encoded, so distinct ids map to distinct files and
    /// path separators never reach the file system.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(session_id)))
    }

    async fn write(&self, path: &Path, annotations: &[Annotation]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec(annotations)?;
        tokio::fs::write(path, bytes).await
    }
}

#[async_trait]
impl AnnotationCache for FileCache {
    async fn get(&self, session_id: &str) -> Option<Vec<Annotation>> {
        let path = self.path_for(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read annotation cache");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(annotations) => Some(annotations),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt annotation cache");
                None
            }
        }
    }

    async fn set(&self, session_id: &str, annotations: &[Annotation]) {
        let path = self.path_for(session_id);
        if let Err(e) = self.write(&path, annotations).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write annotation cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn giraffe(id: i64) -> Annotation {
        Annotation {
            id,
            file_name: format!("g{id}.jpg"),
            annotated_file_name: None,
            cropped_file_name: Some(format!("g{id}-crop.jpg")),
            bbox: None,
            species_confidence: 0.8,
            predicted_species: "giraffe_reticulated".to_string(),
            predicted_name: format!("G{id}"),
            accepted: Some(false),
            ignored: None,
        }
    }

    #[tokio::test]
    async fn memory_cache_is_keyed_by_session() {
        let cache = MemoryCache::new();
        cache.set("a", &[giraffe(1)]).await;
        cache.set("b", &[giraffe(2), giraffe(3)]).await;

        assert_eq!(cache.get("a").await.unwrap().len(), 1);
        assert_eq!(cache.get("b").await.unwrap()[1].id, 3);
        assert!(cache.get("c").await.is_none());
    }

    #[tokio::test]
    async fn file_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileCache::new(dir.path().join("cache"))
            .set("s1", &[giraffe(7)])
            .await;

        let reopened = FileCache::new(dir.path().join("cache"));
        let annotations = reopened.get("s1").await.unwrap();
        assert_eq!(annotations, vec![giraffe(7)]);
    }

    #[tokio::test]
    async fn file_cache_missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileCache::new(dir.path()).get("nothing").await.is_none());
    }

    #[tokio::test]
    async fn file_cache_corrupt_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        tokio::fs::write(cache.path_for("s1"), b"{not json")
            .await
            .unwrap();
        assert!(cache.get("s1").await.is_none());
    }

    #[test]
    fn session_ids_cannot_escape_directory() {
        let cache = FileCache::new("/var/cache/wildid");
        let path = cache.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/var/cache/wildid")));
        assert_eq!(
            path,
            PathBuf::from("/var/cache/wildid/..%2F..%2Fetc%2Fpasswd.json")
        );
    }

    #[test]
    fn similar_session_ids_get_distinct_files() {
        let cache = FileCache::new("/var/cache/wildid");
        let ids = ["caf\u{e8}", "caf\u{e9}", "caf_", "caf-", "caf%C3%A9"];
        let paths: std::collections::HashSet<_> =
            ids.iter().map(|id| cache.path_for(id)).collect();
        assert_eq!(paths.len(), ids.len());
    }

    #[tokio::test]
    async fn similar_session_ids_do_not_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set("caf\u{e8}", &[giraffe(1)]).await;

        assert!(cache.get("caf\u{e9}").await.is_none());
        assert_eq!(cache.get("caf\u{e8}").await.unwrap(), vec![giraffe(1)]);
    }

    #[tokio::test]
    async fn unwritable_directory_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, b"x").await.unwrap();

        // A regular file where the directory should be makes every write fail.
        let cache = FileCache::new(&blocker);
        cache.set("s1", &[giraffe(1)]).await;
        assert!(cache.get("s1").await.is_none());
    }
}
