//! Naming conventions for dated, versioned dataset files.
//!
//! Producers name files `YYYY-MM-DD-NAME[_VERSION].EXT`: the day the data
//! belongs to, the dataset it belongs to, an optional revision number for
//! same-day re-deliveries, and a format extension. This crate converts
//! between those names and [`FilenameRecord`]s.
//!
//! Everything here is pure and synchronous. Nothing performs I/O, and
//! nothing returns an error: names that don't follow the convention parse
//! into a fallback record instead.

mod consts;
pub mod dataset;
pub mod date;
pub mod filename;
pub mod split;
pub mod version;

pub use crate::date::{Calendar, DatePattern};
pub use crate::filename::{FilenameRecord, json_log_name, parse, parse_in, parse_on};
pub use crate::version::extract_version;
