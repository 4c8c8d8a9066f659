//! Shadow DOM
//!
//! Shadow root data plus the shadow-attachment notification hooks that let
//! callers learn when a host gets its shadow root without patching
//! `attachShadow`.

use crate::{Dom, NodeId};

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

/// Shadow root initialization options
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowRootInit {
    pub mode: ShadowRootMode,
    pub delegates_focus: bool,
}

impl ShadowRootInit {
    /// Open shadow root with default options
    pub fn open() -> Self {
        Self::default()
    }

    /// Closed shadow root
    pub fn closed() -> Self {
        Self {
            mode: ShadowRootMode::Closed,
            ..Self::default()
        }
    }
}

/// Shadow root payload stored in the arena
#[derive(Debug, Clone)]
pub struct ShadowRootData {
    /// Host element
    pub host: NodeId,
    /// Mode (open/closed)
    pub mode: ShadowRootMode,
    /// Whether focus is delegated to the first focusable element
    pub delegates_focus: bool,
}

impl ShadowRootData {
    pub(crate) fn from_init(host: NodeId, init: ShadowRootInit) -> Self {
        Self {
            host,
            mode: init.mode,
            delegates_focus: init.delegates_focus,
        }
    }
}

/// Handle for a pending shadow-attachment hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

pub(crate) type ShadowHook = Box<dyn FnOnce(&Dom, NodeId)>;

/// One-shot hooks keyed by host element
#[derive(Default)]
pub(crate) struct ShadowHooks {
    next_id: u64,
    hooks: Vec<(HookId, NodeId, ShadowHook)>,
}

impl ShadowHooks {
    pub(crate) fn register(&mut self, host: NodeId, hook: ShadowHook) -> HookId {
        self.next_id += 1;
        let id = HookId(self.next_id);
        self.hooks.push((id, host, hook));
        id
    }

    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _, _)| *hook_id != id);
        self.hooks.len() != before
    }

    /// Take every hook waiting on `host`, in registration order
    pub(crate) fn take_for(&mut self, host: NodeId) -> Vec<ShadowHook> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.hooks.len());
        for (id, hook_host, hook) in self.hooks.drain(..) {
            if hook_host == host {
                taken.push(hook);
            } else {
                kept.push((id, hook_host, hook));
            }
        }
        self.hooks = kept;
        taken
    }

    /// Drop hooks whose host no longer exists
    pub(crate) fn drop_hosts(&mut self, hosts: &[NodeId]) -> Vec<ShadowHook> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.hooks.len());
        for (id, host, hook) in self.hooks.drain(..) {
            if hosts.contains(&host) {
                dropped.push(hook);
            } else {
                kept.push((id, host, hook));
            }
        }
        self.hooks = kept;
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Generation;

    fn host(index: u32) -> NodeId {
        NodeId::new(index, Generation::INITIAL)
    }

    #[test]
    fn test_shadow_root_init() {
        let init = ShadowRootInit::closed();
        let data = ShadowRootData::from_init(host(1), init);

        assert_eq!(data.mode, ShadowRootMode::Closed);
        assert_eq!(data.host, host(1));
        assert!(!data.delegates_focus);
    }

    #[test]
    fn test_hooks_take_for_host() {
        let mut hooks = ShadowHooks::default();
        hooks.register(host(1), Box::new(|_, _| {}));
        let other = hooks.register(host(2), Box::new(|_, _| {}));
        hooks.register(host(1), Box::new(|_, _| {}));

        assert_eq!(hooks.take_for(host(1)).len(), 2);
        assert_eq!(hooks.len(), 1);
        assert!(hooks.remove(other));
        assert!(!hooks.remove(other));
    }
}
