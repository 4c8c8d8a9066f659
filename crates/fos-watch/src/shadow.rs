//! Shadow root resolver
//!
//! Waits for an element to get an open shadow root. Attachment is learned
//! through a one-shot hook on the host, and the root is handed out one
//! animation frame later so the attaching component can populate it first.

use std::cell::Cell;
use std::rc::Rc;

use fos_dom::{Dom, FrameId, HookId, NodeId};

use crate::{WaitOptions, WatchError, WatchResult};

/// Resolve the shadow root of `element`.
///
/// Resolves `Ok(None)` if the element is destroyed before a root appears.
pub async fn wait_shadow_root(
    dom: &Dom,
    element: NodeId,
    options: &WaitOptions,
) -> WatchResult<Option<NodeId>> {
    options.run(shadow_root_ready(dom, element)).await
}

pub(crate) async fn shadow_root_ready(dom: &Dom, element: NodeId) -> WatchResult<Option<NodeId>> {
    {
        let tree = dom.tree();
        if !tree.contains(element) {
            return Ok(None);
        }
        if !tree.is_element(element) {
            return Err(WatchError::NotAnElement(element));
        }
        if let Some(root) = tree.shadow_root(element) {
            return Ok(Some(root));
        }
    }

    let (sender, receiver) = smol::channel::bounded(1);
    let frame = Rc::new(Cell::new(None));
    let pending_frame = Rc::clone(&frame);

    let hook = dom.on_shadow_attached(element, move |dom, root| {
        let id = dom.request_animation_frame(move |dom| {
            if dom.contains(root) {
                let _ = sender.try_send(root);
            }
        });
        pending_frame.set(Some(id));
    })?;
    let _guard = ShadowWait {
        dom: dom.clone(),
        hook,
        frame,
    };

    // A dropped sender means the host (or the new root) went away
    Ok(receiver.recv().await.ok())
}

/// Releases the hook and any scheduled frame when the wait ends
struct ShadowWait {
    dom: Dom,
    hook: HookId,
    frame: Rc<Cell<Option<FrameId>>>,
}

impl Drop for ShadowWait {
    fn drop(&mut self) {
        self.dom.remove_shadow_hook(self.hook);
        if let Some(frame) = self.frame.take() {
            self.dom.cancel_animation_frame(frame);
        }
    }
}
