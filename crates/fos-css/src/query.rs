//! Element queries
//!
//! `querySelector` family over a [`DomTree`]. Queries are scoped to the
//! light-tree descendants of the root and never enter shadow trees; a
//! shadow root is itself a valid query root.

use fos_dom::{DomTree, NodeId};

use crate::SelectorList;

/// Selector-based lookups on a document tree
pub trait ElementQuery {
    /// First matching descendant of `root` in tree order
    fn query_selector(&self, root: NodeId, selectors: &SelectorList) -> Option<NodeId>;

    /// Every matching descendant of `root` in tree order
    fn query_selector_all(&self, root: NodeId, selectors: &SelectorList) -> Vec<NodeId>;

    /// `Element.matches`
    fn matches_selector(&self, element: NodeId, selectors: &SelectorList) -> bool;

    /// `Element.closest`: nearest inclusive ancestor element that matches
    fn closest(&self, element: NodeId, selectors: &SelectorList) -> Option<NodeId>;
}

impl ElementQuery for DomTree {
    fn query_selector(&self, root: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.descendants(root).find(|&node| selectors.matches(self, node))
    }

    fn query_selector_all(&self, root: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|&node| selectors.matches(self, node))
            .collect()
    }

    fn matches_selector(&self, element: NodeId, selectors: &SelectorList) -> bool {
        selectors.matches(self, element)
    }

    fn closest(&self, element: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        let mut current = Some(element).filter(|&e| self.is_element(e));
        while let Some(candidate) = current {
            if selectors.matches(self, candidate) {
                return Some(candidate);
            }
            current = self.parent(candidate).filter(|&p| self.is_element(p));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::{Dom, ShadowRootInit};

    fn list(selector: &str) -> SelectorList {
        SelectorList::parse(selector).unwrap()
    }

    #[test]
    fn test_query_does_not_match_root() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(tree.document(), div).unwrap();
        tree.append_child(div, inner).unwrap();

        assert_eq!(tree.query_selector(div, &list("div")), Some(inner));
        assert_eq!(tree.query_selector(inner, &list("div")), None);
    }

    #[test]
    fn test_closest() {
        let mut tree = DomTree::new();
        let card = tree.create_element("ha-card");
        let img = tree.create_element("img");
        let text = tree.create_text("x");
        tree.append_child(tree.document(), card).unwrap();
        tree.append_child(card, img).unwrap();
        tree.append_child(card, text).unwrap();

        assert_eq!(tree.closest(img, &list("ha-card")), Some(card));
        assert_eq!(tree.closest(img, &list("img")), Some(img));
        assert_eq!(tree.closest(text, &list("ha-card")), None);
    }

    #[test]
    fn test_shadow_root_as_query_root() {
        let dom = Dom::new();
        let host = dom.create_element("ha-config-dashboard");
        let card = dom.create_element("ha-card");
        dom.append_child(dom.document(), host).unwrap();
        let root = dom.attach_shadow(host, ShadowRootInit::open()).unwrap();
        dom.append_child(root, card).unwrap();

        let tree = dom.tree();
        assert_eq!(tree.query_selector(root, &list("ha-card")), Some(card));
        assert_eq!(
            tree.query_selector(tree.document(), &list("ha-card")),
            None,
            "Document queries must not enter shadow trees"
        );
        assert_eq!(tree.query_selector_all(tree.document(), &list("*")), vec![host]);
    }
}
