//! Dispatch registry
//!
//! A [`Watcher`] owns one multiplexer per subscribed root and turns their
//! events into handler calls looked up in its [`HandlerTable`]. Handlers get
//! the watcher back, so they can subscribe further roots and start selector
//! waits: the watch tree grows from inside the handlers.
//!
//! Removing a watched element tears down everything below it: subscriptions
//! on the element, its descendants and their shadow roots are disconnected,
//! and selector waits started on their behalf are cancelled.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use fos_dom::{Dom, DomTree, NodeId};
use tokio_util::sync::CancellationToken;

use crate::dispatch::SHADOW_LABEL;
use crate::{
    ChangeCallbacks, Disconnect, ElementEvent, EventLoop, HandlerKey, HandlerTable, ObserveOptions,
    SelectorPath, WaitOptions, WatchError, WatchResult, observe_changes, resolve_path,
};

pub struct Watcher<C> {
    runtime: EventLoop,
    handlers: HandlerTable<C>,
    context: C,
    debug: bool,
    subscriptions: RefCell<HashMap<NodeId, Disconnect>>,
    /// Selector waits still running, per owner node
    pending: RefCell<HashMap<NodeId, PendingWaits>>,
    next_wait_group: Cell<u64>,
    this: Weak<Self>,
}

/// Parent token shared by the live waits of one owner
#[derive(Debug)]
struct PendingWaits {
    token: CancellationToken,
    /// Distinguishes this group from a later one for the same owner
    group: u64,
    live: usize,
}

impl<C: 'static> Watcher<C> {
    /// Create a watcher with no subscriptions.
    ///
    /// `debug` enables the per-event `tracing` output.
    pub fn new(runtime: EventLoop, handlers: HandlerTable<C>, context: C, debug: bool) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            runtime,
            handlers,
            context,
            debug,
            subscriptions: RefCell::new(HashMap::new()),
            pending: RefCell::new(HashMap::new()),
            next_wait_group: Cell::new(0),
            this: this.clone(),
        })
    }

    pub fn dom(&self) -> &Dom {
        self.runtime.dom()
    }

    pub fn runtime(&self) -> &EventLoop {
        &self.runtime
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn handlers(&self) -> &HandlerTable<C> {
        &self.handlers
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Watch `root` (an element or shadow root) and its subtree.
    ///
    /// Re-subscribing a root replaces its previous multiplexer. Attribute
    /// changes are only dispatched when `watch_attributes` is set.
    pub fn subscribe(&self, root: NodeId, watch_attributes: bool) -> WatchResult<()> {
        let prior = self.subscriptions.borrow_mut().remove(&root);
        drop(prior);
        self.prune_stale();

        if self.debug {
            let label = label(&self.dom().tree(), root).unwrap_or_default();
            tracing::debug!(event = "subscribe", "SUB {} {}", label, root);
        }

        let mut callbacks = ChangeCallbacks::new();
        let this = self.this.clone();
        callbacks = callbacks.on_add(move |observed, element| {
            if let Some(watcher) = this.upgrade() {
                watcher.report(watcher.on_add(observed, element));
            }
        });
        let this = self.this.clone();
        callbacks = callbacks.on_remove(move |observed, element| {
            if let Some(watcher) = this.upgrade() {
                watcher.report(watcher.on_remove(observed, element));
            }
        });
        if watch_attributes {
            let this = self.this.clone();
            callbacks = callbacks.on_attribute(move |target, name, _| {
                if let Some(watcher) = this.upgrade() {
                    watcher.report(watcher.on_attribute(target, name));
                }
            });
        }

        let handle = observe_changes(self.dom(), root, callbacks, ObserveOptions::default())?;
        self.subscriptions.borrow_mut().insert(root, handle);
        Ok(())
    }

    /// Stop watching `root`; returns `false` if it was not subscribed
    pub fn unsubscribe(&self, root: NodeId) -> bool {
        let handle = self.subscriptions.borrow_mut().remove(&root);
        match handle {
            Some(handle) => {
                if self.debug {
                    tracing::debug!(event = "unsubscribe", "UNSUB {}", root);
                }
                handle.disconnect();
                true
            }
            None => false,
        }
    }

    /// Whether `root` has a live subscription
    pub fn is_subscribed(&self, root: NodeId) -> bool {
        self.subscriptions
            .borrow()
            .get(&root)
            .is_some_and(Disconnect::is_connected)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Roots currently subscribed, in arena order
    pub fn subscribed_roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self.subscriptions.borrow().keys().copied().collect();
        roots.sort();
        roots
    }

    /// Forget subscriptions and wait owners whose node was destroyed
    fn prune_stale(&self) {
        let dom = self.dom();
        let stale: Vec<Disconnect> = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let keys: Vec<NodeId> = subscriptions.keys().copied().filter(|&id| !dom.contains(id)).collect();
            keys.iter().filter_map(|id| subscriptions.remove(id)).collect()
        };
        self.pending.borrow_mut().retain(|&owner, _| dom.contains(owner));
        drop(stale);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Dispatch `NEW:` handlers for `element` appearing under `observed`.
    ///
    /// Every defined candidate fires once, in order: exact, any element
    /// under `observed`, `element` under any root. The first handler error
    /// stops the remaining candidates.
    pub fn on_add(&self, observed: NodeId, element: NodeId) -> WatchResult<()> {
        self.dispatch_element(ElementEvent::Added, observed, element)
    }

    /// Tear down watches inside `element`, then dispatch `REM:` handlers.
    ///
    /// Only detached elements are reported; an element freed with
    /// `Dom::destroy` never reaches its `REM:` handlers.
    pub fn on_remove(&self, observed: NodeId, element: NodeId) -> WatchResult<()> {
        self.teardown(element);
        self.dispatch_element(ElementEvent::Removed, observed, element)
    }

    /// Dispatch the `ATTR:<target>[<NAME>]` handler, if any
    pub fn on_attribute(&self, target: NodeId, name: &str) -> WatchResult<()> {
        let Some(target_label) = label(&self.dom().tree(), target) else {
            return Ok(());
        };
        let key = HandlerKey::attribute(&target_label, name);
        match self.handlers.attribute_handler(&key) {
            Some(handler) => {
                if self.debug {
                    tracing::debug!(event = "attr_call", "ATR {} {}", key, target);
                }
                handler(&self.strong()?, target, name)
            }
            None => {
                if self.debug {
                    tracing::debug!(event = "attr_skip", "ATR {} {}", key, target);
                }
                Ok(())
            }
        }
    }

    /// Run `NEW:` dispatch for an element that was not reported by a
    /// mutation, e.g. one that existed before the subscription
    pub fn emit_create(&self, observed: NodeId, created: NodeId) -> WatchResult<()> {
        self.on_add(observed, created)
    }

    fn dispatch_element(&self, event: ElementEvent, observed: NodeId, element: NodeId) -> WatchResult<()> {
        let labels = {
            let tree = self.dom().tree();
            label(&tree, observed).zip(label(&tree, element))
        };
        let Some((observed_label, element_label)) = labels else {
            return Ok(());
        };

        let (call, skip) = match event {
            ElementEvent::Added => ("new_node_call", "new_node_skip"),
            ElementEvent::Removed => ("rm_node_call", "rm_node_skip"),
        };

        let mut fired = false;
        for key in HandlerKey::candidates(event, &observed_label, &element_label) {
            let Some(handler) = self.handlers.element_handler(&key) else {
                continue;
            };
            if self.debug {
                tracing::debug!(event = call, "{} {}", key, element);
            }
            fired = true;
            handler(&self.strong()?, element)?;
        }

        if !fired && self.debug {
            tracing::debug!(
                event = skip,
                "{}:{}:{} {}",
                event.prefix(),
                observed_label,
                element_label,
                element
            );
        }
        Ok(())
    }

    /// Disconnect subscriptions and cancel waits rooted at or inside
    /// `removed`, across shadow boundaries
    fn teardown(&self, removed: NodeId) {
        let (subscriptions, tokens) = {
            let tree = self.dom().tree();
            let inside = |id: NodeId| !tree.contains(id) || tree.is_shadow_including_inclusive_ancestor(removed, id);

            let mut subscriptions = self.subscriptions.borrow_mut();
            let roots: Vec<NodeId> = subscriptions.keys().copied().filter(|&id| inside(id)).collect();
            let handles: Vec<(NodeId, Disconnect)> = roots
                .into_iter()
                .filter_map(|id| subscriptions.remove(&id).map(|handle| (id, handle)))
                .collect();

            let mut pending = self.pending.borrow_mut();
            let owners: Vec<NodeId> = pending.keys().copied().filter(|&id| inside(id)).collect();
            let tokens: Vec<CancellationToken> = owners
                .iter()
                .filter_map(|id| pending.remove(id))
                .map(|waits| waits.token)
                .collect();
            (handles, tokens)
        };

        for (root, handle) in subscriptions {
            if self.debug {
                tracing::debug!(event = "unsubscribe", "UNSUB {} (removed with {})", root, removed);
            }
            handle.disconnect();
        }
        for token in tokens {
            token.cancel();
        }
    }

    fn strong(&self) -> WatchResult<Rc<Self>> {
        self.this.upgrade().ok_or(WatchError::Cancelled)
    }

    /// Top-level sink for handler errors on the mutation path
    fn report(&self, result: WatchResult<()>) {
        if let Err(err) = result {
            tracing::error!("Watch handler failed: {}", err);
        }
    }

    // ========================================================================
    // Selector waits
    // ========================================================================

    /// Resolve `selector` from `owner` in the background and call `then`
    /// with the match.
    ///
    /// The wait is cancelled when `owner` is removed from a watched root.
    /// A wait whose root is destroyed ends silently.
    pub fn wait_selector<F>(&self, owner: NodeId, selector: &str, then: F)
    where
        F: FnOnce(&Rc<Self>, NodeId) -> WatchResult<()> + 'static,
    {
        let path = SelectorPath::parse(selector);
        let (token, group) = {
            let mut pending = self.pending.borrow_mut();
            let waits = pending.entry(owner).or_insert_with(|| {
                let group = self.next_wait_group.get();
                self.next_wait_group.set(group.wrapping_add(1));
                PendingWaits {
                    token: CancellationToken::new(),
                    group,
                    live: 0,
                }
            });
            waits.live += 1;
            (waits.token.child_token(), waits.group)
        };
        let this = self.this.clone();
        let dom = self.dom().clone();

        self.runtime.spawn(async move {
            let options = WaitOptions::new().with_cancel(token);
            let result = resolve_path(&dom, owner, &path, &options).await;
            let Some(watcher) = this.upgrade() else {
                return;
            };
            watcher.release_wait(owner, group);
            match result {
                Ok(Some(found)) => watcher.report(then(&watcher, found)),
                Ok(None) => {}
                Err(WatchError::Cancelled) => {
                    if watcher.debug {
                        tracing::debug!("Wait for '{}' on {} cancelled", path, owner);
                    }
                }
                Err(err) => tracing::error!("Wait for '{}' on {} failed: {}", path, owner, err),
            }
        });
    }

    /// Drop one finished wait from `owner`'s group, forgetting the group
    /// when it was the last
    fn release_wait(&self, owner: NodeId, group: u64) {
        let mut pending = self.pending.borrow_mut();
        let Some(waits) = pending.get_mut(&owner) else {
            return;
        };
        if waits.group != group {
            return;
        }
        waits.live = waits.live.saturating_sub(1);
        if waits.live == 0 {
            pending.remove(&owner);
        }
    }

    /// Number of owners with selector waits still running
    pub fn pending_owner_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

/// Handler-key name for a node: upper-case tag, `SHADOW` for shadow roots,
/// `nodeName` otherwise
fn label(tree: &DomTree, node: NodeId) -> Option<String> {
    if tree.is_shadow_root(node) {
        return Some(SHADOW_LABEL.to_string());
    }
    match tree.tag_name(node) {
        Some(tag) => Some(tag.to_ascii_uppercase()),
        None => tree.node_name(node),
    }
}

impl<C> Drop for Watcher<C> {
    fn drop(&mut self) {
        for waits in self.pending.get_mut().values() {
            waits.token.cancel();
        }
    }
}

impl<C> fmt::Debug for Watcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("handlers", &self.handlers)
            .field("subscriptions", &self.subscriptions.borrow().len())
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::ShadowRootInit;

    type Log = RefCell<Vec<String>>;

    fn watcher(handlers: HandlerTable<Log>) -> Rc<Watcher<Log>> {
        Watcher::new(EventLoop::new(Dom::new()), handlers, Log::default(), false)
    }

    fn push(watcher: &Watcher<Log>, entry: &str) {
        watcher.context().borrow_mut().push(entry.to_string());
    }

    #[test]
    fn test_resubscribe_replaces_multiplexer() {
        let w = watcher(HandlerTable::new());
        let root = w.dom().create_element("div");

        w.subscribe(root, false).unwrap();
        w.subscribe(root, true).unwrap();
        assert_eq!(w.subscription_count(), 1);
        assert_eq!(w.dom().observer_count(), 1, "Prior observer disconnected");

        assert!(w.unsubscribe(root));
        assert!(!w.unsubscribe(root));
        assert_eq!(w.dom().observer_count(), 0);
    }

    #[test]
    fn test_shadow_root_label() {
        let handlers = HandlerTable::new().on_added("SHADOW", "img", |w: &Rc<Watcher<Log>>, _| {
            push(w, "shadow img");
            Ok(())
        });
        let w = watcher(handlers);
        let dom = w.dom().clone();
        let host = dom.create_element("ha-card");
        let root = dom.attach_shadow(host, ShadowRootInit::open()).unwrap();
        w.subscribe(root, false).unwrap();

        let img = dom.create_element("img");
        dom.append_child(root, img).unwrap();
        w.runtime().run_until_stalled();
        assert_eq!(*w.context().borrow(), ["shadow img"]);
    }

    #[test]
    fn test_first_error_stops_candidates() {
        let handlers = HandlerTable::new()
            .on_added("div", "img", |w: &Rc<Watcher<Log>>, _| {
                push(w, "exact");
                Err(WatchError::InvalidHandlerKey("boom".into()))
            })
            .on_added("*", "img", |w: &Rc<Watcher<Log>>, _| {
                push(w, "any root");
                Ok(())
            });
        let w = watcher(handlers);
        let div = w.dom().create_element("div");
        let img = w.dom().create_element("img");

        let result = w.emit_create(div, img);
        assert_eq!(result, Err(WatchError::InvalidHandlerKey("boom".into())));
        assert_eq!(*w.context().borrow(), ["exact"]);
    }

    #[test]
    fn test_attribute_dispatch_requires_flag() {
        let handlers = HandlerTable::new().on_attribute("img", "src", |w: &Rc<Watcher<Log>>, _, name| {
            push(w, name);
            Ok(())
        });
        let w = watcher(handlers);
        let dom = w.dom().clone();
        let plain = dom.create_element("section");
        let watched = dom.create_element("section");
        let (a, b) = (dom.create_element("img"), dom.create_element("img"));
        dom.append_child(plain, a).unwrap();
        dom.append_child(watched, b).unwrap();
        w.subscribe(plain, false).unwrap();
        w.subscribe(watched, true).unwrap();

        dom.set_attribute(a, "src", "/a.png").unwrap();
        dom.set_attribute(b, "alt", "b").unwrap();
        dom.set_attribute(b, "src", "/b.png").unwrap();
        w.runtime().run_until_stalled();
        assert_eq!(*w.context().borrow(), ["src"]);
    }

    #[test]
    fn test_destroyed_roots_pruned_on_subscribe() {
        let w = watcher(HandlerTable::new());
        let dom = w.dom().clone();
        let (a, b) = (dom.create_element("div"), dom.create_element("div"));
        w.subscribe(a, false).unwrap();

        dom.destroy(a).unwrap();
        assert!(!w.is_subscribed(a));
        assert_eq!(w.subscription_count(), 1, "Stale entry kept until the next subscribe");

        w.subscribe(b, false).unwrap();
        assert_eq!(w.subscribed_roots(), [b]);
    }

    #[test]
    fn test_wait_selector_runs_then() {
        let w = watcher(HandlerTable::new());
        let dom = w.dom().clone();
        let card = dom.create_element("ha-card");

        w.wait_selector(card, ":shadow img", |w, img| {
            let tag = w.dom().tree().tag_name(img).unwrap_or_default().to_string();
            push(w, &tag);
            Ok(())
        });
        w.runtime().run_until_stalled();
        assert_eq!(w.pending_owner_count(), 1);

        let root = dom.attach_shadow(card, ShadowRootInit::open()).unwrap();
        let img = dom.create_element("img");
        dom.append_child(root, img).unwrap();
        w.runtime().paint();
        assert_eq!(*w.context().borrow(), ["img"]);
        assert_eq!(w.pending_owner_count(), 0, "Settled waits release their owner");
    }

    #[test]
    fn test_settled_waits_release_owners() {
        let w = watcher(HandlerTable::new());
        let dom = w.dom().clone();
        let cards: Vec<NodeId> = (0..100)
            .map(|_| {
                let card = dom.create_element("ha-card");
                let root = dom.attach_shadow(card, ShadowRootInit::open()).unwrap();
                dom.append_child(root, dom.create_element("img")).unwrap();
                card
            })
            .collect();

        for &card in &cards {
            w.wait_selector(card, ":shadow img", |w, _| {
                push(w, "found");
                Ok(())
            });
            w.wait_selector(card, ":shadow img", |_, _| Ok(()));
        }
        assert_eq!(w.pending_owner_count(), 100);

        w.runtime().run_until_stalled();
        assert_eq!(w.context().borrow().len(), 100);
        assert_eq!(w.pending_owner_count(), 0);
    }

    #[test]
    fn test_wait_group_survives_partial_settle() {
        let w = watcher(HandlerTable::new());
        let dom = w.dom().clone();
        let card = dom.create_element("ha-card");
        let root = dom.attach_shadow(card, ShadowRootInit::open()).unwrap();
        dom.append_child(root, dom.create_element("img")).unwrap();

        w.wait_selector(card, ":shadow img", |_, _| Ok(()));
        w.wait_selector(card, ":shadow .late", |w, _| {
            push(w, "late");
            Ok(())
        });
        w.runtime().run_until_stalled();
        assert_eq!(w.pending_owner_count(), 1, "One wait is still running");

        let late = dom.create_element("span");
        dom.set_attribute(late, "class", "late").unwrap();
        dom.append_child(root, late).unwrap();
        w.runtime().run_until_stalled();
        assert_eq!(*w.context().borrow(), ["late"]);
        assert_eq!(w.pending_owner_count(), 0);
    }
}
