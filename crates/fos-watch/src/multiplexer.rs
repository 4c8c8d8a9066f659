//! Mutation multiplexer
//!
//! One mutation observer per watched root, fanning records out to separate
//! add / remove / attribute callbacks. Within a record, removals are
//! reported before additions; text and comment nodes are ignored.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use fos_dom::{Dom, DomTree, MutationObserverInit, MutationRecord, MutationType, NodeId, ObserverId};

use crate::WatchResult;

/// `(observed, element)`: `observed` is the node whose child list changed
pub type ElementCallback = Rc<dyn Fn(NodeId, NodeId)>;

/// `(target, attribute name, old value)`
pub type AttributeCallback = Rc<dyn Fn(NodeId, &str, Option<&str>)>;

/// Callbacks for [`observe_changes`]; attributes are only observed when
/// `on_attribute` is set
#[derive(Clone, Default)]
pub struct ChangeCallbacks {
    pub on_add: Option<ElementCallback>,
    pub on_remove: Option<ElementCallback>,
    pub on_attribute: Option<AttributeCallback>,
}

impl ChangeCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_add(mut self, f: impl Fn(NodeId, NodeId) + 'static) -> Self {
        self.on_add = Some(Rc::new(f));
        self
    }

    pub fn on_remove(mut self, f: impl Fn(NodeId, NodeId) + 'static) -> Self {
        self.on_remove = Some(Rc::new(f));
        self
    }

    pub fn on_attribute(mut self, f: impl Fn(NodeId, &str, Option<&str>) + 'static) -> Self {
        self.on_attribute = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for ChangeCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCallbacks")
            .field("on_add", &self.on_add.is_some())
            .field("on_remove", &self.on_remove.is_some())
            .field("on_attribute", &self.on_attribute.is_some())
            .finish()
    }
}

/// Attribute observation options
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    /// Report the previous value with attribute events
    pub attribute_old_value: bool,
    /// Only report these attributes
    pub attribute_filter: Option<Vec<String>>,
}

/// Observe `root` and its subtree.
///
/// `root` may be an element or a shadow root. The returned handle
/// disconnects the observer when dropped.
pub fn observe_changes(
    dom: &Dom,
    root: NodeId,
    callbacks: ChangeCallbacks,
    options: ObserveOptions,
) -> WatchResult<Disconnect> {
    let init = MutationObserverInit {
        child_list: true,
        subtree: true,
        attributes: callbacks.on_attribute.is_some(),
        attribute_old_value: options.attribute_old_value,
        attribute_filter: options.attribute_filter,
    };

    let observer = dom.observe(root, init, move |dom, records| {
        for record in records {
            dispatch_record(dom, record, &callbacks);
        }
    })?;

    Ok(Disconnect::new(dom.clone(), observer))
}

fn dispatch_record(dom: &Dom, record: &MutationRecord, callbacks: &ChangeCallbacks) {
    match record.mutation_type {
        MutationType::ChildList => {
            let (removed, added) = {
                let tree = dom.tree();
                (
                    elements(&tree, &record.removed_nodes),
                    elements(&tree, &record.added_nodes),
                )
            };

            if let Some(on_remove) = &callbacks.on_remove {
                for element in removed {
                    on_remove(record.target, element);
                }
            }
            if let Some(on_add) = &callbacks.on_add {
                for element in added {
                    on_add(record.target, element);
                }
            }
        }
        MutationType::Attributes => {
            let Some(on_attribute) = &callbacks.on_attribute else {
                return;
            };
            let Some(name) = record.attribute_name.as_deref() else {
                return;
            };
            if dom.tree().is_element(record.target) {
                on_attribute(record.target, name, record.old_value.as_deref());
            }
        }
    }
}

/// Live element nodes among `nodes`; destroyed nodes are skipped
fn elements(tree: &DomTree, nodes: &[NodeId]) -> Vec<NodeId> {
    nodes.iter().copied().filter(|&n| tree.is_element(n)).collect()
}

/// Handle for one observer registration
#[must_use = "dropping the handle disconnects the observer"]
pub struct Disconnect {
    dom: Dom,
    observer: Cell<Option<ObserverId>>,
}

impl Disconnect {
    pub(crate) fn new(dom: Dom, observer: ObserverId) -> Self {
        Self {
            dom,
            observer: Cell::new(Some(observer)),
        }
    }

    /// Stop observing; returns `false` when already disconnected
    pub fn disconnect(&self) -> bool {
        match self.observer.take() {
            Some(id) => self.dom.disconnect(id),
            None => false,
        }
    }

    /// Whether the observer is still registered with the document.
    ///
    /// Destroying the observed root disconnects it from the document side.
    pub fn is_connected(&self) -> bool {
        self.observer.get().is_some_and(|id| self.dom.is_observing(id))
    }
}

impl Drop for Disconnect {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Disconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disconnect")
            .field("observer", &self.observer.get())
            .finish()
    }
}
