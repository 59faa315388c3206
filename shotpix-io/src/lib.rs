//! shotpix-io: Persistence for hit lists, per-pixel maps and run
//! summaries.
//!
//! All formats are deliberately simple text: hit lists are one index per
//! line, maps one value per line in flat pixel order, views CSV and the
//! run summary JSON. Everything loaded is validated against the detector
//! layout before it can reach the processing crates.

pub mod error;
pub mod hitlist;
pub mod maps;
pub mod summary;
pub mod views;

pub use error::{Error, Result};
pub use hitlist::{read_hit_list, write_hit_list};
pub use maps::{read_map, write_map};
pub use summary::{read_summary, write_summary};
pub use views::write_view_csv;
