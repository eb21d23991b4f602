//! Aggregate encoding
//!
//! Content lines are rendered by the icalendar crate, which escapes text
//! values, quotes parameter values and folds at 75 octets with CRLF endings.
//! This module only lays out the component structure, in arrival order.
//!
//! `icalendar::Calendar`'s own writer is not used for the components: it
//! stamps a `DTSTAMP` and a random `UID` into every component that lacks
//! one, including `VTIMEZONE`, `STANDARD`, `DAYLIGHT` and `VALARM`, and it
//! reorders properties by name.

use crate::ics::entry::{AggregateDocument, CalendarEntry, Component};
use icalendar::Property;

/// Serializes an aggregate into iCalendar text
///
/// An aggregate without entries still produces a complete `VCALENDAR` with
/// its `VERSION`, `PRODID` and `CALSCALE` properties.
pub fn serialize(doc: &AggregateDocument) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VCALENDAR\r\n");
    for property in Property::from_array([
        ("VERSION", "2.0"),
        ("PRODID", doc.product_id()),
        ("CALSCALE", "GREGORIAN"),
    ]) {
        write_property(&mut out, property);
    }

    for entry in doc.entries() {
        match entry {
            CalendarEntry::Event(component) | CalendarEntry::Timezone(component) => {
                write_component(&mut out, component)
            }
            // Never stored in an aggregate
            CalendarEntry::Unhandled { .. } => {}
        }
    }

    out.push_str("END:VCALENDAR\r\n");
    out
}

fn write_component(out: &mut String, component: &Component) {
    out.push_str(&format!("BEGIN:{}\r\n", component.name));
    for property in &component.properties {
        write_property(out, property.clone());
    }
    for child in &component.components {
        write_component(out, child);
    }
    out.push_str(&format!("END:{}\r\n", component.name));
}

/// Appends one folded content line, CRLF included
fn write_property(out: &mut String, property: Property) {
    // Rendering into a String never fails
    let line: Result<String, _> = property.try_into();
    if let Ok(line) = line {
        out.push_str(&line);
    }
}
