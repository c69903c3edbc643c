//! XLink entities of a linkbase: locators, resources and arcs.

use crate::taxonomy::ConceptId;
use compact_str::CompactString;

/// Index of an extended-link element inside its owning linkbase arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u32);

/// An extended-link child: either a locator pointing at a concept (or at a
/// resource id) or a resource carrying a literal value.
#[derive(Debug, Clone)]
pub enum ExtendedLinkElement {
    Locator(Locator),
    Resource(Resource),
}

impl ExtendedLinkElement {
    pub fn label(&self) -> &str {
        match self {
            ExtendedLinkElement::Locator(l) => &l.label,
            ExtendedLinkElement::Resource(r) => &r.label,
        }
    }

    pub fn extended_link_role(&self) -> &str {
        match self {
            ExtendedLinkElement::Locator(l) => &l.extended_link_role,
            ExtendedLinkElement::Resource(r) => &r.extended_link_role,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            ExtendedLinkElement::Locator(l) => &l.source,
            ExtendedLinkElement::Resource(r) => &r.source,
        }
    }

    pub fn is_locator(&self) -> bool {
        matches!(self, ExtendedLinkElement::Locator(_))
    }

    pub fn as_locator(&self) -> Option<&Locator> {
        match self {
            ExtendedLinkElement::Locator(l) => Some(l),
            ExtendedLinkElement::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            ExtendedLinkElement::Resource(r) => Some(r),
            ExtendedLinkElement::Locator(_) => None,
        }
    }

    /// Concept this element points at, if it is a concept locator.
    pub fn concept(&self) -> Option<ConceptId> {
        match self {
            ExtendedLinkElement::Locator(l) => match l.target {
                LocatorTarget::Concept(c) => Some(c),
                LocatorTarget::Resource(_) => None,
            },
            ExtendedLinkElement::Resource(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LocatorTarget {
    Concept(ConceptId),
    /// A locator href may resolve to a resource id within the same linkbase.
    Resource(ElementId),
}

#[derive(Debug, Clone)]
pub struct Locator {
    pub label: CompactString,
    pub role: Option<CompactString>,
    pub title: Option<CompactString>,
    pub id: Option<CompactString>,
    pub target: LocatorTarget,
    /// Cleared by an arc carrying `xbrldt:usable="false"`.
    pub usable: bool,
    /// Linkbase file this locator was read from.
    pub source: CompactString,
    pub extended_link_role: CompactString,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub label: CompactString,
    pub role: Option<CompactString>,
    pub title: Option<CompactString>,
    pub id: Option<CompactString>,
    pub lang: Option<CompactString>,
    pub value: String,
    pub source: CompactString,
    pub extended_link_role: CompactString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcUse {
    #[default]
    Optional,
    Prohibited,
}

impl ArcUse {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("prohibited") => ArcUse::Prohibited,
            _ => ArcUse::Optional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextElementKind {
    Scenario,
    Segment,
    #[default]
    Unset,
}

impl ContextElementKind {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("scenario") => ContextElementKind::Scenario,
            Some("segment") => ContextElementKind::Segment,
            _ => ContextElementKind::Unset,
        }
    }
}

/// A directed, labeled edge between two extended-link elements of the same
/// extended link role.
#[derive(Debug, Clone)]
pub struct Arc {
    pub from: ElementId,
    pub to: ElementId,
    pub arcrole: CompactString,
    pub extended_link_role: CompactString,
    pub context_element: ContextElementKind,
    pub target_role: Option<CompactString>,
    pub order: f64,
    pub weight: f64,
    pub priority: i32,
    pub arc_use: ArcUse,
    /// Linkbase file this arc was read from.
    pub source_file: CompactString,
    /// The raw attribute bag as it appeared on the arc element.
    pub attributes: Vec<(CompactString, CompactString)>,
}

impl Arc {
    pub fn new(from: ElementId, to: ElementId, extended_link_role: CompactString) -> Self {
        Self {
            from,
            to,
            arcrole: CompactString::const_new(""),
            extended_link_role,
            context_element: ContextElementKind::Unset,
            target_role: None,
            order: 0.0,
            weight: 1.0,
            priority: 0,
            arc_use: ArcUse::Optional,
            source_file: CompactString::const_new(""),
            attributes: Vec::new(),
        }
    }
}
