//! I/O module
//!
//! Handles the binary's input and output.
//!
//! # Components
//!
//! - `seed` - JSON seed document loaded into the in-memory store
//! - `report` - Statistics CSV written to stdout

pub mod report;
pub mod seed;

pub use report::{collect_report, write_report_csv, ReportRow};
pub use seed::{load_seed, SeedDocument};
