//! DOM Tree (arena-based allocation)
//!
//! Nodes live in generational slots. Destroying a node frees its slot and
//! every slot of its shadow-including subtree; ids issued before the free
//! stop resolving.

use serde_json::Value;

use crate::node::ElementData;
use crate::shadow::{ShadowRootData, ShadowRootInit, ShadowRootMode};
use crate::style::parse_inline_style;
use crate::{DomError, DomResult, Generation, Node, NodeData, NodeId, NodeType};

#[derive(Debug)]
struct Slot {
    generation: Generation,
    node: Option<Node>,
}

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    document: NodeId,
    live: usize,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            document: NodeId::new(0, Generation::INITIAL),
            live: 0,
        };
        tree.document = tree.alloc(NodeData::Document);
        tree
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(Node::new(data));
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: Generation::INITIAL,
            node: Some(Node::new(data)),
        });
        NodeId::new(index, Generation::INITIAL)
    }

    /// The document node
    #[inline]
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Whether `id` refers to a live node
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::StaleNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        self.get_mut(id)
            .ok_or(DomError::StaleNode(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    /// Number of live nodes, the document included
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    /// Append without producing mutation records; for building fixtures
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert(parent, child, None).map(|_| ())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        self.node_type(id) == Some(NodeType::ShadowRoot)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children in tree order; empty for stale ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(|&c| self.is_element(c))
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).next()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// `Node.nodeName`
    pub fn node_name(&self, id: NodeId) -> Option<String> {
        self.get(id).map(Node::node_name)
    }

    /// Lowercase local name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    /// `Element.shadowRoot`: the attached root when it is open
    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        let root = self.element(id)?.shadow_root()?;
        let data = self.get(root)?.as_shadow_root()?;
        (data.mode == ShadowRootMode::Open).then_some(root)
    }

    /// `ShadowRoot.host`
    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.as_shadow_root().map(|s| s.host)
    }

    /// Parent, or host when `id` is a shadow root
    pub fn parent_or_host(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).or_else(|| self.host(id))
    }

    // ========================================================================
    // Element state
    // ========================================================================

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.get_attr(name)
    }

    pub fn prop(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.element(id)?.prop(name)
    }

    /// Follow a dotted property path such as `integration.domain`
    pub fn prop_path(&self, id: NodeId, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut value = self.prop(id, segments.next()?)?;
        for segment in segments {
            value = value.get(segment)?;
        }
        Some(value)
    }

    /// String at a dotted property path; other JSON types yield `None`
    pub fn prop_str(&self, id: NodeId, path: &str) -> Option<&str> {
        self.prop_path(id, path)?.as_str()
    }

    /// One declaration of the inline `style` attribute
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.get_attribute(id, "style")?;
        parse_inline_style(style)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    // ========================================================================
    // Ancestry
    // ========================================================================

    /// Preorder descendants of `root`, excluding `root`, not entering shadow trees
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(root).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Whether `ancestor` is `node` or one of its tree ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Like [`is_inclusive_ancestor`](Self::is_inclusive_ancestor) but
    /// steps from shadow roots to their hosts
    pub fn is_shadow_including_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_or_host(id);
        }
        false
    }

    /// Whether the shadow-including root of `id` is the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_shadow_including_inclusive_ancestor(self.document, id)
    }

    // ========================================================================
    // Mutation (record-free; `Dom` queues the records)
    // ========================================================================

    /// Insert `child` into `parent` before `before`, returning the new
    /// previous and next siblings of `child`.
    pub(crate) fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> DomResult<(Option<NodeId>, Option<NodeId>)> {
        let parent_type = self.node(parent)?.node_type();
        let child_type = self.node(child)?.node_type();

        let parent_ok = matches!(
            parent_type,
            NodeType::Document | NodeType::Element | NodeType::ShadowRoot
        );
        let child_ok = !matches!(child_type, NodeType::Document | NodeType::ShadowRoot);
        if !parent_ok || !child_ok || self.is_shadow_including_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = before {
            if reference == child || self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
        }

        self.detach(child);

        let siblings = &mut self.get_mut(parent).ok_or(DomError::StaleNode(parent))?.children;
        let pos = match before {
            Some(reference) => siblings
                .iter()
                .position(|&c| c == reference)
                .ok_or(DomError::NotAChild { parent, child: reference })?,
            None => siblings.len(),
        };
        siblings.insert(pos, child);
        let prev = pos.checked_sub(1).map(|p| siblings[p]);
        let next = siblings.get(pos + 1).copied();

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        Ok((prev, next))
    }

    /// Unlink `child` from its parent, returning `(parent, prev, next)`
    pub(crate) fn detach(&mut self, child: NodeId) -> Option<(NodeId, Option<NodeId>, Option<NodeId>)> {
        let parent = self.get_mut(child)?.parent.take()?;
        let siblings = &mut self.get_mut(parent)?.children;
        let pos = siblings.iter().position(|&c| c == child)?;
        siblings.remove(pos);
        let prev = pos.checked_sub(1).map(|p| siblings[p]);
        let next = siblings.get(pos).copied();
        Some((parent, prev, next))
    }

    pub(crate) fn attach_shadow(&mut self, host: NodeId, init: ShadowRootInit) -> DomResult<NodeId> {
        if self.element_mut(host)?.shadow_root.is_some() {
            return Err(DomError::ShadowAlreadyAttached(host));
        }
        let root = self.alloc(NodeData::ShadowRoot(ShadowRootData::from_init(host, init)));
        self.element_mut(host)?.shadow_root = Some(root);
        Ok(root)
    }

    pub(crate) fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<Option<String>> {
        Ok(self.element_mut(id)?.set_attr(name, value.to_string()))
    }

    pub(crate) fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        Ok(self.element_mut(id)?.remove_attr(name))
    }

    pub(crate) fn set_prop(&mut self, id: NodeId, name: &str, value: Value) -> DomResult<()> {
        self.element_mut(id)?.props.insert(name.to_string(), value);
        Ok(())
    }

    /// Free `id` and its shadow-including subtree, returning the freed ids
    pub(crate) fn destroy(&mut self, id: NodeId) -> DomResult<Vec<NodeId>> {
        if id == self.document {
            return Err(DomError::HierarchyRequest { parent: id, child: id });
        }
        self.node(id)?;
        self.detach(id);
        if let Some(host) = self.host(id) {
            if let Ok(element) = self.element_mut(host) {
                element.shadow_root = None;
            }
        }

        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index() as usize];
            let Some(node) = slot.node.take() else { continue };
            slot.generation = slot.generation.next();
            self.free.push(current.index());
            self.live -= 1;

            stack.extend(node.children.iter().copied());
            if let Some(root) = node.as_element().and_then(ElementData::shadow_root) {
                stack.push(root);
            }
            freed.push(current);
        }
        Ok(freed)
    }
}

/// Preorder iterator over light-tree descendants
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let doc = tree.document();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(doc, div).unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();
        (tree, div, a, b)
    }

    #[test]
    fn test_insert_positions() {
        let (mut tree, div, a, b) = fixture();
        let c = tree.create_element("c");

        let (prev, next) = tree.insert(div, c, Some(b)).unwrap();
        assert_eq!((prev, next), (Some(a), Some(b)));
        assert_eq!(tree.children(div), &[a, c, b]);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.previous_sibling(a), None);
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let (mut tree, div, a, _) = fixture();
        assert_eq!(
            tree.insert(a, div, None),
            Err(DomError::HierarchyRequest { parent: a, child: div })
        );

        let stray = tree.create_element("i");
        assert!(matches!(tree.insert(div, stray, Some(stray)), Err(DomError::NotAChild { .. })));
    }

    #[test]
    fn test_descendants_skip_shadow() {
        let (mut tree, div, a, b) = fixture();
        let root = tree.attach_shadow(a, ShadowRootInit::open()).unwrap();
        let inner = tree.create_element("img");
        tree.append_child(root, inner).unwrap();

        let found: Vec<_> = tree.descendants(div).collect();
        assert_eq!(found, vec![a, b]);
        assert!(tree.is_shadow_including_inclusive_ancestor(div, inner));
        assert!(!tree.is_inclusive_ancestor(div, inner));
        assert!(tree.is_connected(inner));
    }

    #[test]
    fn test_closed_shadow_hidden() {
        let (mut tree, _, a, b) = fixture();
        let open = tree.attach_shadow(a, ShadowRootInit::open()).unwrap();
        tree.attach_shadow(b, ShadowRootInit::closed()).unwrap();

        assert_eq!(tree.shadow_root(a), Some(open));
        assert_eq!(tree.shadow_root(b), None);
        assert_eq!(tree.host(open), Some(a));
        assert_eq!(
            tree.attach_shadow(a, ShadowRootInit::open()),
            Err(DomError::ShadowAlreadyAttached(a))
        );
    }

    #[test]
    fn test_destroy_frees_subtree() {
        let (mut tree, div, a, b) = fixture();
        let root = tree.attach_shadow(a, ShadowRootInit::open()).unwrap();
        let inner = tree.create_element("img");
        tree.append_child(root, inner).unwrap();
        let before = tree.len();

        let freed = tree.destroy(div).unwrap();
        assert_eq!(freed.len(), 5);
        assert_eq!(tree.len(), before - 5);
        for id in [div, a, b, root, inner] {
            assert!(!tree.contains(id), "{id} should be stale");
        }

        // Slot reuse never resurrects old ids
        let fresh = tree.create_element("p");
        assert!(tree.contains(fresh));
        assert!(!tree.contains(inner));
    }

    #[test]
    fn test_prop_path() {
        let (mut tree, div, _, _) = fixture();
        tree.set_prop(div, "integration", json!({ "domain": "acme" })).unwrap();
        tree.set_attribute(div, "style", "background-image: url(/a.svg)").unwrap();

        assert_eq!(tree.prop_str(div, "integration.domain"), Some("acme"));
        assert_eq!(tree.prop_str(div, "integration.missing"), None);
        assert_eq!(tree.style_property(div, "Background-Image").as_deref(), Some("url(/a.svg)"));
    }
}
