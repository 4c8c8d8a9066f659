//! Document - shared DOM handle
//!
//! [`Dom`] owns the tree together with the host services that hang off it:
//! observer registrations, the animation frame queue and shadow-attachment
//! hooks. All mutations go through here so that the matching mutation
//! records get queued.
//!
//! Callbacks run with no internal borrow held, so they may freely read or
//! mutate the document they are handed.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::observer::{MutationCallback, ObserverRegistry};
use crate::scheduler::FrameQueue;
use crate::shadow::ShadowHooks;
use crate::style::with_property;
use crate::{
    DomError, DomResult, DomTree, FrameId, HookId, MutationObserverInit, MutationRecord, NodeId,
    ObserverId, ShadowRootInit, ShadowRootMode,
};

#[derive(Default)]
struct DomInner {
    tree: RefCell<DomTree>,
    observers: RefCell<ObserverRegistry>,
    frames: RefCell<FrameQueue>,
    hooks: RefCell<ShadowHooks>,
}

/// Cheap, clonable handle to a live document
#[derive(Clone, Default)]
pub struct Dom {
    inner: Rc<DomInner>,
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.inner.tree.borrow().len())
            .field("observers", &self.observer_count())
            .field("pending_frames", &self.pending_frames())
            .finish()
    }
}

impl Dom {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the tree.
    ///
    /// Drop the guard before mutating through this handle.
    pub fn tree(&self) -> Ref<'_, DomTree> {
        self.inner.tree.borrow()
    }

    /// Whether both handles refer to the same document
    pub fn ptr_eq(&self, other: &Dom) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn document(&self) -> NodeId {
        self.tree().document()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree().contains(id)
    }

    fn queue(&self, record: MutationRecord) {
        let tree = self.inner.tree.borrow();
        self.inner.observers.borrow_mut().queue(&tree, &record);
    }

    // ========================================================================
    // Tree mutation
    // ========================================================================

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.tree.borrow_mut().create_element(tag)
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner.tree.borrow_mut().create_text(text)
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.inner.tree.borrow_mut().create_comment(text)
    }

    /// `parent.appendChild(child)`
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// `parent.insertBefore(child, before)`; moves `child` if it is attached
    pub fn insert_before(&self, parent: NodeId, child: NodeId, before: Option<NodeId>) -> DomResult<()> {
        let (before, old) = {
            let tree = self.tree();
            let before = match before {
                Some(reference) if reference == child => tree.next_sibling(child),
                other => other,
            };
            let old = tree
                .parent(child)
                .map(|p| (p, tree.previous_sibling(child), tree.next_sibling(child)));
            (before, old)
        };

        let (prev, next) = self.inner.tree.borrow_mut().insert(parent, child, before)?;

        if let Some((old_parent, old_prev, old_next)) = old {
            self.queue(MutationRecord::child_list(old_parent, vec![], vec![child], old_prev, old_next));
        }
        self.queue(MutationRecord::child_list(parent, vec![child], vec![], prev, next));
        tracing::trace!(%parent, %child, "insert");
        Ok(())
    }

    /// `parent.removeChild(child)`
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.tree().parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.remove(child)
    }

    /// `node.remove()`; a no-op for detached nodes
    pub fn remove(&self, node: NodeId) -> DomResult<()> {
        if !self.contains(node) {
            return Err(DomError::StaleNode(node));
        }
        let detached = self.inner.tree.borrow_mut().detach(node);
        if let Some((parent, prev, next)) = detached {
            self.queue(MutationRecord::child_list(parent, vec![], vec![node], prev, next));
            tracing::trace!(%parent, child = %node, "remove");
        }
        Ok(())
    }

    /// Remove `node` and free its shadow-including subtree.
    ///
    /// Observers targeting freed nodes are disconnected and shadow hooks
    /// waiting on freed hosts are dropped, which wakes anyone awaiting them.
    pub fn destroy(&self, node: NodeId) -> DomResult<()> {
        self.remove(node)?;
        let freed = self.inner.tree.borrow_mut().destroy(node)?;

        let observers = self.inner.observers.borrow_mut().disconnect_targets(&freed);
        let hooks = self.inner.hooks.borrow_mut().drop_hosts(&freed);
        tracing::trace!(%node, freed = freed.len(), "destroy");

        // Captured state is released here, outside any borrow
        drop(observers);
        drop(hooks);
        Ok(())
    }

    /// `host.attachShadow(init)`; fires shadow hooks for open roots
    pub fn attach_shadow(&self, host: NodeId, init: ShadowRootInit) -> DomResult<NodeId> {
        let root = self.inner.tree.borrow_mut().attach_shadow(host, init)?;
        tracing::trace!(%host, %root, "attach_shadow");

        if init.mode == ShadowRootMode::Open {
            let hooks = self.inner.hooks.borrow_mut().take_for(host);
            for hook in hooks {
                hook(self, root);
            }
        }
        Ok(root)
    }

    /// `el.setAttribute(name, value)`; always records, even for equal values
    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        let old = self.inner.tree.borrow_mut().set_attribute(element, name, value)?;
        self.queue(MutationRecord::attribute(element, name, old));
        Ok(())
    }

    /// `el.removeAttribute(name)`; records only when the attribute existed
    pub fn remove_attribute(&self, element: NodeId, name: &str) -> DomResult<()> {
        let old = self.inner.tree.borrow_mut().remove_attribute(element, name)?;
        if old.is_some() {
            self.queue(MutationRecord::attribute(element, name, old));
        }
        Ok(())
    }

    /// Assign a script-visible property; properties are not observed
    pub fn set_property(&self, element: NodeId, name: &str, value: Value) -> DomResult<()> {
        self.inner.tree.borrow_mut().set_prop(element, name, value)
    }

    /// `el.style.setProperty(property, value)`.
    ///
    /// Returns `false` without touching the `style` attribute when the
    /// declaration already holds `value`.
    pub fn set_style_property(&self, element: NodeId, property: &str, value: &str) -> DomResult<bool> {
        let updated = {
            let tree = self.tree();
            if !tree.contains(element) {
                return Err(DomError::StaleNode(element));
            }
            if !tree.is_element(element) {
                return Err(DomError::NotAnElement(element));
            }
            with_property(tree.get_attribute(element, "style").unwrap_or_default(), property, value)
        };
        match updated {
            Some(style) => self.set_attribute(element, "style", &style).map(|_| true),
            None => Ok(false),
        }
    }

    // ========================================================================
    // Mutation observers
    // ========================================================================

    /// `new MutationObserver(callback).observe(target, init)`
    pub fn observe<F>(&self, target: NodeId, init: MutationObserverInit, callback: F) -> DomResult<ObserverId>
    where
        F: Fn(&Dom, &[MutationRecord]) + 'static,
    {
        if !self.contains(target) {
            return Err(DomError::StaleNode(target));
        }
        let callback: MutationCallback = Rc::new(callback);
        let id = self.inner.observers.borrow_mut().register(target, init, callback);
        tracing::trace!(%target, ?id, "observe");
        Ok(id)
    }

    /// `observer.disconnect()`; pending records are discarded
    pub fn disconnect(&self, id: ObserverId) -> bool {
        let callback = self.inner.observers.borrow_mut().disconnect(id);
        callback.is_some()
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.inner.observers.borrow().is_registered(id)
    }

    /// Live observer registrations
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Registrations ever made on this document
    pub fn observers_registered_total(&self) -> u64 {
        self.inner.observers.borrow().total_registered()
    }

    pub fn has_pending_mutations(&self) -> bool {
        self.inner.observers.borrow().has_pending()
    }

    /// Run one delivery round, returning the number of callbacks invoked.
    ///
    /// Records queued by the callbacks themselves wait for the next round.
    pub fn deliver_mutations(&self) -> usize {
        let ids = self.inner.observers.borrow().pending_ids();
        let mut delivered = 0;
        for id in ids {
            let batch = self.inner.observers.borrow_mut().take(id);
            if let Some((callback, records)) = batch {
                callback(self, &records);
                delivered += 1;
            }
        }
        delivered
    }

    // ========================================================================
    // Animation frames
    // ========================================================================

    pub fn request_animation_frame<F>(&self, callback: F) -> FrameId
    where
        F: FnOnce(&Dom) + 'static,
    {
        self.inner.frames.borrow_mut().request(Box::new(callback))
    }

    pub fn cancel_animation_frame(&self, id: FrameId) -> bool {
        let callback = self.inner.frames.borrow_mut().cancel(id);
        callback.is_some()
    }

    /// Run the callbacks queued before this frame started
    pub fn run_animation_frame(&self) -> usize {
        let callbacks = self.inner.frames.borrow_mut().take_frame();
        let count = callbacks.len();
        for callback in callbacks {
            callback(self);
        }
        count
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.frames.borrow().len()
    }

    // ========================================================================
    // Shadow attachment hooks
    // ========================================================================

    /// Call `hook` once, right after `host` gets an open shadow root.
    ///
    /// The hook is dropped uncalled if the host is destroyed first.
    pub fn on_shadow_attached<F>(&self, host: NodeId, hook: F) -> DomResult<HookId>
    where
        F: FnOnce(&Dom, NodeId) + 'static,
    {
        {
            let tree = self.tree();
            if !tree.contains(host) {
                return Err(DomError::StaleNode(host));
            }
            if !tree.is_element(host) {
                return Err(DomError::NotAnElement(host));
            }
        }
        Ok(self.inner.hooks.borrow_mut().register(host, Box::new(hook)))
    }

    pub fn remove_shadow_hook(&self, id: HookId) -> bool {
        self.inner.hooks.borrow_mut().remove(id)
    }

    pub fn shadow_hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }
}
