//! DOM Node
//!
//! Nodes live in the [`DomTree`](crate::DomTree) arena and refer to each
//! other by [`NodeId`]. Children are kept in an ordered vector; shadow roots
//! hang off their host element rather than its child list.

use std::collections::HashMap;

use serde_json::Value;

use crate::NodeId;
use crate::shadow::ShadowRootData;

/// Node kind, as exposed by `Node.nodeType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Element,
    ShadowRoot,
    Text,
    Comment,
}

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (None if detached, for the document, or for shadow roots)
    pub(crate) parent: Option<NodeId>,
    /// Children in tree order
    pub(crate) children: Vec<NodeId>,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    /// Parent node, if attached
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in tree order
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Node kind
    pub fn node_type(&self) -> NodeType {
        match &self.data {
            NodeData::Document => NodeType::Document,
            NodeData::Element(_) => NodeType::Element,
            NodeData::ShadowRoot(_) => NodeType::ShadowRoot,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get shadow root data if this is a shadow root
    #[inline]
    pub fn as_shadow_root(&self) -> Option<&ShadowRootData> {
        match &self.data {
            NodeData::ShadowRoot(s) => Some(s),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// `Node.nodeName`: uppercase tag for elements, `#…` names otherwise
    pub fn node_name(&self) -> String {
        match &self.data {
            NodeData::Document => "#document".into(),
            NodeData::Element(e) => e.tag.to_ascii_uppercase(),
            NodeData::ShadowRoot(_) => "#document-fragment".into(),
            NodeData::Text(_) => "#text".into(),
            NodeData::Comment(_) => "#comment".into(),
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Shadow root attached to an element
    ShadowRoot(ShadowRootData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Local name, lowercase
    pub(crate) tag: String,
    /// Attributes in insertion order
    pub(crate) attrs: Vec<Attribute>,
    /// Script-visible properties (custom element state such as `integration`)
    pub(crate) props: HashMap<String, Value>,
    /// Attached shadow root
    pub(crate) shadow_root: Option<NodeId>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            props: HashMap::new(),
            shadow_root: None,
        }
    }

    /// Local name (lowercase)
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// All attributes in insertion order
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, returning the previous value
    pub(crate) fn set_attr(&mut self, name: &str, value: String) -> Option<String> {
        for attr in self.attrs.iter_mut() {
            if attr.name.eq_ignore_ascii_case(name) {
                return Some(std::mem::replace(&mut attr.value, value));
            }
        }
        self.attrs.push(Attribute {
            name: name.to_ascii_lowercase(),
            value,
        });
        None
    }

    /// Remove an attribute, returning its value if it was present
    pub(crate) fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(pos).value)
    }

    /// Class list parsed from the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    /// Element id from the `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attr("id")
    }

    /// Script-visible property
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Attached shadow root, regardless of mode
    pub fn shadow_root(&self) -> Option<NodeId> {
        self.shadow_root
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}
