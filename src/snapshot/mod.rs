pub mod capture;
pub mod document;
pub mod filter;
pub mod restore;

pub use capture::{capture, capture_from};
pub use document::{GroupMap, SnapshotDocument, TabEntry, WindowEntry, UNGROUPED};
pub use filter::UrlFilter;
pub use restore::{restore, RestoreReport};
