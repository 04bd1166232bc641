//! Result Records
//!
//! Raw query results are nested JSON objects; reporting works on flat rows.
//!
//! - **Flatten**: merge one level of relationship sub-records into dotted keys
//! - **Flat**: the [`FlatRecord`] row type and its typed accessors

mod flat;
mod flatten;

pub use flat::FlatRecord;
pub use flatten::{flatten, flatten_record, Record, METADATA_FIELD};
