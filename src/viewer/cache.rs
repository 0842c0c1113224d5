use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{FileListing, SnapshotView};

/// explicit memoization of snapshot listings
///
/// keyed by (snapshot identity, locale) because served urls embed the
/// locale. entries never expire on their own; callers invalidate a
/// snapshot's entries whenever its extraction is redone.
#[derive(Default)]
pub struct TreeCache {
    inner: RwLock<HashMap<(String, String), Arc<FileListing>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// the memoized listing for a view and locale
    ///
    /// a snapshot that is not ready yields an uncached empty listing so the
    /// cache never pins "not ready" past the extraction finishing.
    pub fn files(&self, view: &SnapshotView, locale: &str) -> Arc<FileListing> {
        if !view.is_extracted() {
            return Arc::new(FileListing::empty());
        }

        let key = (view.snapshot_id().to_string(), locale.to_string());
        if let Some(listing) = self.inner.read().get(&key) {
            return Arc::clone(listing);
        }

        let listing = Arc::new(view.build_listing(locale));
        self.inner.write().insert(key, Arc::clone(&listing));
        listing
    }

    /// drop every locale's listing for a snapshot
    pub fn invalidate(&self, snapshot_id: &str) {
        self.inner
            .write()
            .retain(|(id, _), _| id != snapshot_id);
    }

    /// drop everything
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::ViewerOptions;
    use std::fs;
    use tempfile::tempdir;

    fn seeded_view(root: &std::path::Path, id: &str) -> SnapshotView {
        let view = SnapshotView::new(
            id,
            root.join("unused.zip"),
            &root.join("viewer"),
            false,
            ViewerOptions::default(),
        );
        fs::create_dir_all(view.dest()).unwrap();
        fs::write(view.dest().join("file.txt"), "content").unwrap();
        view
    }

    #[test]
    fn test_cache_memoizes_per_locale() {
        let dir = tempdir().unwrap();
        let cache = TreeCache::new();
        let view = seeded_view(dir.path(), "1");

        let first = cache.files(&view, "en-US");
        let again = cache.files(&view, "en-US");
        assert!(Arc::ptr_eq(&first, &again));

        // a different locale builds its own listing
        let german = cache.files(&view, "de");
        assert!(!Arc::ptr_eq(&first, &german));
        assert_eq!(first.len(), german.len());
    }

    #[test]
    fn test_cache_does_not_pin_not_ready() {
        let dir = tempdir().unwrap();
        let cache = TreeCache::new();
        let view = SnapshotView::new(
            "late",
            dir.path().join("unused.zip"),
            &dir.path().join("viewer"),
            false,
            ViewerOptions::default(),
        );

        assert!(cache.files(&view, "en-US").is_empty());

        // snapshot becomes ready afterwards
        fs::create_dir_all(view.dest()).unwrap();
        fs::write(view.dest().join("file.txt"), "content").unwrap();

        assert_eq!(cache.files(&view, "en-US").len(), 1);
    }

    #[test]
    fn test_invalidate_drops_all_locales() {
        let dir = tempdir().unwrap();
        let cache = TreeCache::new();
        let view = seeded_view(dir.path(), "1");

        let before_en = cache.files(&view, "en-US");
        let _before_de = cache.files(&view, "de");

        // simulate re-extraction changing the tree
        fs::write(view.dest().join("extra.txt"), "new").unwrap();
        cache.invalidate(view.snapshot_id());

        let after = cache.files(&view, "en-US");
        assert!(!Arc::ptr_eq(&before_en, &after));
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn test_invalidate_leaves_other_snapshots() {
        let dir = tempdir().unwrap();
        let cache = TreeCache::new();
        let one = seeded_view(dir.path(), "1");
        let two = seeded_view(dir.path(), "2");

        let cached_two = cache.files(&two, "en-US");
        cache.invalidate(one.snapshot_id());

        let still_two = cache.files(&two, "en-US");
        assert!(Arc::ptr_eq(&cached_two, &still_two));
    }
}
