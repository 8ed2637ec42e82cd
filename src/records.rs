//! Platform record types: filters, list queries and defensive record access.

mod filter;
mod record;

pub use filter::{Filter, FilterRule, MatchMode, Operator};
pub use record::{
    ConnectionRef, Record, RecordPage, RecordQuery, SortOrder, MAX_ROWS_PER_PAGE, MISSING_TEXT,
};
