//! Ordering and safe versioning of dated dataset files held in a store.
//!
//! - [`group`] turns a raw listing into records ordered by dataset or date.
//! - [`resolve`] picks the next free version of a filename.
//! - [`prune`] removes objects that have no schema.

pub mod error;
pub mod group;
mod listing;
mod prune;
pub mod resolve;

pub use crate::listing::{ListOptions, Order, ordered_listing};
pub use crate::prune::{PruneEvent, prune};
pub use crate::resolve::{Strategy, safe_filename};
