//! Mutation Observers
//!
//! Records are queued per registration as the tree mutates and handed out
//! at the next [`Dom::deliver_mutations`](crate::Dom::deliver_mutations)
//! checkpoint, mirroring the microtask delivery of `MutationObserver`.

use std::rc::Rc;

use crate::{Dom, DomTree, NodeId};

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    ChildList,
}

impl MutationRecord {
    /// Child-list record on `target`
    pub fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }

    /// Attribute record on `target`
    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_ascii_lowercase()),
            old_value,
        }
    }
}

/// Handle for one observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

pub(crate) type MutationCallback = Rc<dyn Fn(&Dom, &[MutationRecord])>;

struct Registration {
    id: ObserverId,
    target: NodeId,
    options: MutationObserverInit,
    callback: MutationCallback,
    queue: Vec<MutationRecord>,
}

impl Registration {
    fn wants(&self, tree: &DomTree, record: &MutationRecord) -> bool {
        let in_scope = record.target == self.target
            || (self.options.subtree && tree.is_inclusive_ancestor(self.target, record.target));
        if !in_scope {
            return false;
        }

        match record.mutation_type {
            MutationType::ChildList => self.options.child_list,
            MutationType::Attributes => {
                self.options.attributes
                    && match (&self.options.attribute_filter, &record.attribute_name) {
                        (Some(filter), Some(name)) => {
                            filter.iter().any(|f| f.eq_ignore_ascii_case(name))
                        }
                        _ => true,
                    }
            }
        }
    }
}

/// All live observer registrations of a [`Dom`]
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    total_registered: u64,
    registrations: Vec<Registration>,
}

impl ObserverRegistry {
    pub(crate) fn register(
        &mut self,
        target: NodeId,
        options: MutationObserverInit,
        callback: MutationCallback,
    ) -> ObserverId {
        self.next_id += 1;
        self.total_registered += 1;
        let id = ObserverId(self.next_id);
        self.registrations.push(Registration {
            id,
            target,
            options,
            callback,
            queue: Vec::new(),
        });
        id
    }

    /// Remove a registration along with its undelivered records
    pub(crate) fn disconnect(&mut self, id: ObserverId) -> Option<MutationCallback> {
        let pos = self.registrations.iter().position(|r| r.id == id)?;
        Some(self.registrations.remove(pos).callback)
    }

    /// Remove every registration observing one of `targets`
    pub(crate) fn disconnect_targets(&mut self, targets: &[NodeId]) -> Vec<MutationCallback> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.registrations.len());
        for registration in self.registrations.drain(..) {
            if targets.contains(&registration.target) {
                dropped.push(registration.callback);
            } else {
                kept.push(registration);
            }
        }
        self.registrations = kept;
        dropped
    }

    /// Queue a record for every interested registration
    pub(crate) fn queue(&mut self, tree: &DomTree, record: &MutationRecord) {
        for registration in &mut self.registrations {
            if !registration.wants(tree, record) {
                continue;
            }
            let mut record = record.clone();
            if record.mutation_type == MutationType::Attributes
                && !registration.options.attribute_old_value
            {
                record.old_value = None;
            }
            registration.queue.push(record);
        }
    }

    /// Registrations with pending records, in registration order
    pub(crate) fn pending_ids(&self) -> Vec<ObserverId> {
        self.registrations
            .iter()
            .filter(|r| !r.queue.is_empty())
            .map(|r| r.id)
            .collect()
    }

    /// Take the pending records of one registration
    pub(crate) fn take(&mut self, id: ObserverId) -> Option<(MutationCallback, Vec<MutationRecord>)> {
        let registration = self.registrations.iter_mut().find(|r| r.id == id)?;
        if registration.queue.is_empty() {
            return None;
        }
        let records = std::mem::take(&mut registration.queue);
        Some((Rc::clone(&registration.callback), records))
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.registrations.iter().any(|r| !r.queue.is_empty())
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    pub(crate) fn total_registered(&self) -> u64 {
        self.total_registered
    }

    pub(crate) fn is_registered(&self, id: ObserverId) -> bool {
        self.registrations.iter().any(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_filter_and_old_value() {
        let mut tree = DomTree::new();
        let img = tree.create_element("img");

        let mut registry = ObserverRegistry::default();
        let id = registry.register(
            img,
            MutationObserverInit {
                attributes: true,
                attribute_filter: Some(vec!["src".into()]),
                ..Default::default()
            },
            Rc::new(|_, _| {}),
        );

        registry.queue(&tree, &MutationRecord::attribute(img, "alt", None));
        assert!(!registry.has_pending(), "Filtered attribute should not queue");

        registry.queue(&tree, &MutationRecord::attribute(img, "SRC", Some("/old.svg".into())));
        let (_, records) = registry.take(id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute_name.as_deref(), Some("src"));
        assert_eq!(records[0].old_value, None, "Old value only when requested");
    }

    #[test]
    fn test_subtree_scope() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("span");
        tree.insert(outer, inner, None).unwrap();

        let mut registry = ObserverRegistry::default();
        let shallow = registry.register(
            outer,
            MutationObserverInit { child_list: true, ..Default::default() },
            Rc::new(|_, _| {}),
        );
        let deep = registry.register(
            outer,
            MutationObserverInit { child_list: true, subtree: true, ..Default::default() },
            Rc::new(|_, _| {}),
        );

        let record = MutationRecord::child_list(inner, vec![], vec![], None, None);
        registry.queue(&tree, &record);

        assert!(registry.take(shallow).is_none());
        assert_eq!(registry.take(deep).map(|(_, r)| r.len()), Some(1));
        assert_eq!(registry.total_registered(), 2);
    }
}
