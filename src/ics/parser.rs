//! Feed decoding using the icalendar crate's parser

use crate::ics::entry::{CalendarEntry, Component};
use crate::DecodeError;
use icalendar::parser::{read_calendar, unfold};
use icalendar::Property;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Decodes a source feed into its top-level calendar entries
///
/// The bytes must be UTF-8 and contain a `VCALENDAR` object; a leading byte
/// order mark is ignored. Every component directly below `VCALENDAR` becomes
/// one entry, classified by its name. Text values come back unescaped.
///
/// # Example
///
/// ```
/// use calproxy::ics::{parse_feed, CalendarEntry};
///
/// let feed = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
/// let entries = parse_feed(feed.as_bytes()).unwrap();
/// assert!(matches!(entries[0], CalendarEntry::Event(_)));
/// ```
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<CalendarEntry>, DecodeError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::Feed(format!("feed is not valid UTF-8: {}", e)))?;
    let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);

    let unfolded = unfold(content);
    if !has_calendar_object(&unfolded) {
        return Err(DecodeError::Feed(
            "missing BEGIN:VCALENDAR/END:VCALENDAR".to_string(),
        ));
    }

    let calendar = read_calendar(&unfolded).map_err(DecodeError::Feed)?;

    Ok(calendar
        .components
        .into_iter()
        .map(to_owned_component)
        .map(CalendarEntry::from_component)
        .collect())
}

/// Checks that the content is wrapped in a VCALENDAR object
fn has_calendar_object(content: &str) -> bool {
    let mut begin = false;
    let mut end = false;
    for line in content.lines() {
        let line = line.trim();
        if line.eq_ignore_ascii_case("BEGIN:VCALENDAR") {
            begin = true;
        } else if begin && line.eq_ignore_ascii_case("END:VCALENDAR") {
            end = true;
        }
    }
    begin && end
}

fn to_owned_component(component: icalendar::parser::Component<'_>) -> Component {
    Component {
        name: component.name.to_string(),
        properties: component.properties.into_iter().map(Property::from).collect(),
        components: component
            .components
            .into_iter()
            .map(to_owned_component)
            .collect(),
    }
}
