use icalendar::Property;

/// Product identifier written into every aggregate
pub const PRODUCT_ID: &str = "-//calproxy//calproxy//EN";

/// An owned iCalendar component (`VEVENT`, `VTIMEZONE`, `VALARM`, ...)
///
/// Properties are the icalendar crate's own, kept in source order. Text
/// values are held unescaped and escaped again when written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<Property>) -> Self {
        self.properties.push(property.into());
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Returns the first property with the given name (case-insensitive)
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.key().eq_ignore_ascii_case(name))
    }

    /// Returns the `UID` value, if present
    pub fn uid(&self) -> Option<&str> {
        self.find_property("UID").map(Property::value)
    }
}

/// A top-level entry decoded from a source feed
///
/// Only `Event` and `Timezone` entries are merged into the aggregate. Every
/// other component kind is reported as `Unhandled` so callers have to decide
/// explicitly what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarEntry {
    /// A `VEVENT` component
    Event(Component),

    /// A `VTIMEZONE` component
    Timezone(Component),

    /// Any other component kind, e.g. `VTODO`
    Unhandled { kind: String },
}

impl CalendarEntry {
    /// Classifies a component by its name
    pub fn from_component(component: Component) -> Self {
        if component.name.eq_ignore_ascii_case("VEVENT") {
            CalendarEntry::Event(component)
        } else if component.name.eq_ignore_ascii_case("VTIMEZONE") {
            CalendarEntry::Timezone(component)
        } else {
            CalendarEntry::Unhandled {
                kind: component.name.to_ascii_uppercase(),
            }
        }
    }

    /// The component kind of this entry
    pub fn kind(&self) -> &str {
        match self {
            CalendarEntry::Event(_) => "VEVENT",
            CalendarEntry::Timezone(_) => "VTIMEZONE",
            CalendarEntry::Unhandled { kind } => kind,
        }
    }
}

/// The merged calendar produced by one refresh cycle
///
/// Entries are kept in arrival order and never deduplicated: the same event
/// published by two sources appears twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDocument {
    product_id: String,
    entries: Vec<CalendarEntry>,
}

impl AggregateDocument {
    /// Creates an empty aggregate
    pub fn new() -> Self {
        Self {
            product_id: PRODUCT_ID.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: Component) {
        self.entries.push(CalendarEntry::Event(event));
    }

    pub fn push_timezone(&mut self, timezone: Component) {
        self.entries.push(CalendarEntry::Timezone(timezone));
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CalendarEntry::Event(_)))
            .count()
    }

    pub fn timezone_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CalendarEntry::Timezone(_)))
            .count()
    }
}

impl Default for AggregateDocument {
    fn default() -> Self {
        Self::new()
    }
}
