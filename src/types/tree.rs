use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::Hash;

/// a directory tree - collection of entries sorted by name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// create a new tree, validating and sorting entries
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        // validate entry names
        for entry in &entries {
            validate_entry_name(&entry.name)?;
        }

        // sort by name (byte-wise)
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        // check for duplicates
        for window in entries.windows(2) {
            if window[0].name == window[1].name {
                return Err(Error::DuplicateEntryName(window[0].name.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// create an empty tree
    pub fn empty() -> Self {
        Self { entries: vec![] }
    }

    /// get entries slice
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// look up entry by name
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// is tree empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// validate an entry name
fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName("empty name".to_string()));
    }
    if name.contains('/') {
        return Err(Error::InvalidEntryName(format!(
            "name contains '/': {}",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName(format!(
            "name contains null byte: {}",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidEntryName(format!("reserved name: {}", name)));
    }
    Ok(())
}

/// a single entry in a tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// kind of tree entry
///
/// extracted archives only ever produce regular files and directories, so
/// the model stays small.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// regular file
    File { hash: Hash, size: u64 },

    /// directory
    Directory { hash: Hash },
}

impl EntryKind {
    /// get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            EntryKind::File { .. } => "file",
            EntryKind::Directory { .. } => "directory",
        }
    }

    /// is this a directory entry
    pub fn is_directory(&self) -> bool {
        matches!(self, EntryKind::Directory { .. })
    }

    /// the content or subtree hash
    pub fn hash(&self) -> &Hash {
        match self {
            EntryKind::File { hash, .. } => hash,
            EntryKind::Directory { hash } => hash,
        }
    }

    /// create a file entry
    pub fn file(hash: Hash, size: u64) -> Self {
        Self::File { hash, size }
    }

    /// create a directory entry
    pub fn directory(hash: Hash) -> Self {
        Self::Directory { hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_empty() {
        let t = Tree::empty();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_tree_sorting() {
        let entries = vec![
            TreeEntry::new("zebra", EntryKind::file(Hash::ZERO, 0)),
            TreeEntry::new("alpha", EntryKind::file(Hash::ZERO, 0)),
            TreeEntry::new("beta", EntryKind::file(Hash::ZERO, 0)),
        ];
        let tree = Tree::new(entries).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "zebra"]);
    }

    #[test]
    fn test_tree_get() {
        let entries = vec![
            TreeEntry::new("alpha", EntryKind::file(Hash::ZERO, 10)),
            TreeEntry::new("beta", EntryKind::file(Hash::ZERO, 20)),
        ];
        let tree = Tree::new(entries).unwrap();

        assert!(tree.get("alpha").is_some());
        assert!(tree.get("beta").is_some());
        assert!(tree.get("gamma").is_none());
    }

    #[test]
    fn test_tree_rejects_empty_name() {
        let entries = vec![TreeEntry::new("", EntryKind::file(Hash::ZERO, 0))];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn test_tree_rejects_slash_in_name() {
        let entries = vec![TreeEntry::new("foo/bar", EntryKind::file(Hash::ZERO, 0))];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn test_tree_rejects_dot_names() {
        for name in [".", ".."] {
            let entries = vec![TreeEntry::new(name, EntryKind::file(Hash::ZERO, 0))];
            assert!(Tree::new(entries).is_err());
        }
    }

    #[test]
    fn test_tree_rejects_duplicates() {
        let entries = vec![
            TreeEntry::new("same", EntryKind::file(Hash::ZERO, 0)),
            TreeEntry::new("same", EntryKind::file(Hash::ZERO, 0)),
        ];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn test_entry_kind_predicates() {
        assert!(EntryKind::directory(Hash::ZERO).is_directory());
        assert!(!EntryKind::file(Hash::ZERO, 0).is_directory());
        assert_eq!(EntryKind::file(Hash::ZERO, 0).type_name(), "file");
        assert_eq!(EntryKind::directory(Hash::ZERO).type_name(), "directory");
    }

    #[test]
    fn test_tree_cbor_roundtrip() {
        let entries = vec![
            TreeEntry::new("file.txt", EntryKind::file(Hash::ZERO, 100)),
            TreeEntry::new("dir", EntryKind::directory(Hash::ZERO)),
        ];

        let tree = Tree::new(entries).unwrap();

        let mut cbor_bytes = Vec::new();
        ciborium::into_writer(&tree, &mut cbor_bytes).unwrap();

        let parsed: Tree = ciborium::from_reader(&cbor_bytes[..]).unwrap();
        assert_eq!(tree, parsed);
    }

    #[test]
    fn test_tree_cbor_determinism() {
        // same tree should produce identical cbor bytes regardless of
        // construction order
        let entries1 = vec![
            TreeEntry::new("b", EntryKind::file(Hash::ZERO, 0)),
            TreeEntry::new("a", EntryKind::file(Hash::ZERO, 0)),
        ];
        let entries2 = vec![
            TreeEntry::new("a", EntryKind::file(Hash::ZERO, 0)),
            TreeEntry::new("b", EntryKind::file(Hash::ZERO, 0)),
        ];

        let tree1 = Tree::new(entries1).unwrap();
        let tree2 = Tree::new(entries2).unwrap();

        let mut bytes1 = Vec::new();
        let mut bytes2 = Vec::new();
        ciborium::into_writer(&tree1, &mut bytes1).unwrap();
        ciborium::into_writer(&tree2, &mut bytes2).unwrap();

        assert_eq!(bytes1, bytes2);
    }
}
