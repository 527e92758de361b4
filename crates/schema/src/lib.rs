//! Known dataset names.
//!
//! A folder of schema definition files (`sales.json`, `stock.json`, ...)
//! declares which dataset names are valid. [`SchemaIndex`] scans that folder
//! once and answers membership queries from memory.

pub mod error;
mod index;

pub use crate::index::{SchemaIndex, is_data_csv};
