//! high-level operations on silo repositories

mod commit;
mod diff;
mod export;
mod log;

pub use commit::{commit_package, Worktree, COMMIT_MESSAGE};
pub use diff::{diff_listings, DiffResult, DiffView, FileDiff};
pub use export::{iter_blobs, BlobIterator, BlobRecord, SkippedBlob};
pub use log::{history, LogEntry};
