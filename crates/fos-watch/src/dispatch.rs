//! Handler keys and lookup table
//!
//! Handlers are registered under string-shaped keys:
//!
//! - `NEW:<observed>:<element>` / `REM:<observed>:<element>` for added and
//!   removed elements, where either side may be `*`
//! - `ATTR:<element>[<ATTRIBUTE>]` for attribute changes
//!
//! Tag names are upper case; a shadow root is named `SHADOW`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use fos_dom::NodeId;

use crate::{WatchError, WatchResult, Watcher};

/// Name used for shadow roots in handler keys
pub(crate) const SHADOW_LABEL: &str = "SHADOW";

/// Handler for an added or removed element
pub type ElementHandler<C> = Rc<dyn Fn(&Rc<Watcher<C>>, NodeId) -> WatchResult<()>>;

/// Handler for an attribute change: `(element, attribute name)`
pub type AttributeHandler<C> = Rc<dyn Fn(&Rc<Watcher<C>>, NodeId, &str) -> WatchResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementEvent {
    Added,
    Removed,
}

impl ElementEvent {
    pub fn prefix(self) -> &'static str {
        match self {
            ElementEvent::Added => "NEW",
            ElementEvent::Removed => "REM",
        }
    }
}

/// One side of an element key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagPattern {
    /// `*`
    Any,
    /// Upper-cased tag name, or `SHADOW`
    Name(String),
}

impl TagPattern {
    pub fn name(tag: &str) -> Self {
        TagPattern::Name(tag.to_ascii_uppercase())
    }
}

impl From<&str> for TagPattern {
    fn from(s: &str) -> Self {
        if s == "*" { TagPattern::Any } else { TagPattern::name(s) }
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagPattern::Any => f.write_str("*"),
            TagPattern::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    Element {
        event: ElementEvent,
        observed: TagPattern,
        element: TagPattern,
    },
    Attribute {
        element: String,
        attribute: String,
    },
}

impl HandlerKey {
    /// `NEW:<observed>:<element>`
    pub fn added(observed: impl Into<TagPattern>, element: impl Into<TagPattern>) -> Self {
        HandlerKey::Element {
            event: ElementEvent::Added,
            observed: observed.into(),
            element: element.into(),
        }
    }

    /// `REM:<observed>:<element>`
    pub fn removed(observed: impl Into<TagPattern>, element: impl Into<TagPattern>) -> Self {
        HandlerKey::Element {
            event: ElementEvent::Removed,
            observed: observed.into(),
            element: element.into(),
        }
    }

    /// `ATTR:<element>[<ATTRIBUTE>]`
    pub fn attribute(element: &str, attribute: &str) -> Self {
        HandlerKey::Attribute {
            element: element.to_ascii_uppercase(),
            attribute: attribute.to_ascii_uppercase(),
        }
    }

    /// Keys consulted for one element event, in dispatch order: exact,
    /// any element under `observed`, `element` under any root
    pub fn candidates(event: ElementEvent, observed: &str, element: &str) -> [HandlerKey; 3] {
        let observed = TagPattern::name(observed);
        let element = TagPattern::name(element);
        [
            HandlerKey::Element {
                event,
                observed: observed.clone(),
                element: element.clone(),
            },
            HandlerKey::Element {
                event,
                observed,
                element: TagPattern::Any,
            },
            HandlerKey::Element {
                event,
                observed: TagPattern::Any,
                element,
            },
        ]
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKey::Element { event, observed, element } => {
                write!(f, "{}:{}:{}", event.prefix(), observed, element)
            }
            HandlerKey::Attribute { element, attribute } => write!(f, "ATTR:{element}[{attribute}]"),
        }
    }
}

impl FromStr for HandlerKey {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WatchError::InvalidHandlerKey(s.to_string());

        let (prefix, rest) = s.split_once(':').ok_or_else(invalid)?;
        let event = match prefix {
            "NEW" => ElementEvent::Added,
            "REM" => ElementEvent::Removed,
            "ATTR" => {
                let (element, attribute) = rest
                    .strip_suffix(']')
                    .and_then(|r| r.split_once('['))
                    .ok_or_else(invalid)?;
                if !is_tag(element) || !is_tag(attribute) {
                    return Err(invalid());
                }
                return Ok(HandlerKey::attribute(element, attribute));
            }
            _ => return Err(invalid()),
        };

        let (observed, element) = rest.split_once(':').ok_or_else(invalid)?;
        for side in [observed, element] {
            if side != "*" && !is_tag(side) {
                return Err(invalid());
            }
        }
        Ok(HandlerKey::Element {
            event,
            observed: observed.into(),
            element: element.into(),
        })
    }
}

fn is_tag(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Handler lookup table, built once and shared by a [`Watcher`]
pub struct HandlerTable<C> {
    elements: HashMap<HandlerKey, ElementHandler<C>>,
    attributes: HashMap<HandlerKey, AttributeHandler<C>>,
}

impl<C> Default for HandlerTable<C> {
    fn default() -> Self {
        Self {
            elements: HashMap::new(),
            attributes: HashMap::new(),
        }
    }
}

impl<C> HandlerTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `NEW:` handler; either side may be `*`
    pub fn on_added<F>(self, observed: &str, element: &str, handler: F) -> Self
    where
        F: Fn(&Rc<Watcher<C>>, NodeId) -> WatchResult<()> + 'static,
    {
        self.on_element(HandlerKey::added(observed, element), handler)
    }

    pub fn on_removed<F>(self, observed: &str, element: &str, handler: F) -> Self
    where
        F: Fn(&Rc<Watcher<C>>, NodeId) -> WatchResult<()> + 'static,
    {
        self.on_element(HandlerKey::removed(observed, element), handler)
    }

    /// Register an element handler under an explicit key; attribute keys
    /// are ignored
    pub fn on_element<F>(mut self, key: HandlerKey, handler: F) -> Self
    where
        F: Fn(&Rc<Watcher<C>>, NodeId) -> WatchResult<()> + 'static,
    {
        if matches!(key, HandlerKey::Element { .. }) {
            self.elements.insert(key, Rc::new(handler));
        }
        self
    }

    pub fn on_attribute<F>(mut self, element: &str, attribute: &str, handler: F) -> Self
    where
        F: Fn(&Rc<Watcher<C>>, NodeId, &str) -> WatchResult<()> + 'static,
    {
        self.attributes
            .insert(HandlerKey::attribute(element, attribute), Rc::new(handler));
        self
    }

    pub fn element_handler(&self, key: &HandlerKey) -> Option<ElementHandler<C>> {
        self.elements.get(key).cloned()
    }

    pub fn attribute_handler(&self, key: &HandlerKey) -> Option<AttributeHandler<C>> {
        self.attributes.get(key).cloned()
    }

    pub fn contains(&self, key: &HandlerKey) -> bool {
        self.elements.contains_key(key) || self.attributes.contains_key(key)
    }

    /// Registered keys, sorted by their string form
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .elements
            .keys()
            .chain(self.attributes.keys())
            .map(ToString::to_string)
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.elements.len() + self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> fmt::Debug for HandlerTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable").field("keys", &self.keys()).finish()
    }
}
