mod channel;
mod commit;
mod tree;

pub use channel::{Channel, PackageKind};
pub use commit::{Commit, Signature};
pub use tree::{EntryKind, Tree, TreeEntry};
