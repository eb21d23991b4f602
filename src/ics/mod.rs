//! iCalendar feed codec
//!
//! This module decodes source feeds into typed calendar entries and encodes
//! the merged aggregate back into iCalendar text. Parsing is delegated to the
//! icalendar crate's parser; entries are kept as an owned component tree of
//! the crate's properties so they can be re-serialized in source order
//! without losing properties the aggregator does not understand.

mod entry;
mod parser;
mod writer;

pub use entry::{AggregateDocument, CalendarEntry, Component, PRODUCT_ID};
pub use icalendar::Property;
pub use parser::parse_feed;
pub use writer::serialize;

/// Content type used when serving the aggregate
pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
