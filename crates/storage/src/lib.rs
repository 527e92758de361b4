pub mod backend;
mod entry;
pub mod error;
mod key;

pub use crate::backend::StorageBackend;
pub use crate::entry::{LISTING_DEPTH, Listing, StorageEntry};
pub use crate::key::{validate as validate_key, validate_prefix};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
