//! Cultural infrastructure ETL - transform and report core
//!
//! Responsibilities:
//! - Resolve and read the latest raw snapshot per category
//! - Normalize column names, reconcile categorical values, coerce numerics
//! - Project onto the canonical fact schema and canonicalize nulls
//! - Build the summary reports and load everything into Postgres
//!
//! Transform stages are pure functions over [`frame::Frame`]; the same raw
//! snapshot always yields the same canonical frame.

pub mod coerce;
pub mod config;
pub mod error;
pub mod frame;
pub mod load;
pub mod normalize;
pub mod nulls;
pub mod pipeline;
pub mod project;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod snapshot;

pub use error::{EtlError, ErrorKind, Result};
pub use frame::{Frame, Value};
