//! Subtree element resolver
//!
//! `querySelector` that waits: if nothing matches yet, the root's subtree is
//! observed and re-queried whenever nodes are added.

use fos_css::{ElementQuery, SelectorList};
use fos_dom::{Dom, MutationObserverInit, NodeId};

use crate::multiplexer::Disconnect;
use crate::{WaitOptions, WatchResult};

/// Resolve the first element under `root` matching `selector`.
///
/// Invalid selector syntax fails before anything is observed. Resolves
/// `Ok(None)` if `root` is destroyed first.
pub async fn wait_element(
    dom: &Dom,
    root: NodeId,
    selector: &str,
    options: &WaitOptions,
) -> WatchResult<Option<NodeId>> {
    let selectors = SelectorList::parse(selector)?;
    options.run(element_ready(dom, root, &selectors)).await
}

pub(crate) async fn element_ready(
    dom: &Dom,
    root: NodeId,
    selectors: &SelectorList,
) -> WatchResult<Option<NodeId>> {
    {
        let tree = dom.tree();
        if !tree.contains(root) {
            return Ok(None);
        }
        if let Some(found) = tree.query_selector(root, selectors) {
            return Ok(Some(found));
        }
    }

    let (sender, receiver) = smol::channel::bounded(1);
    let watched = selectors.clone();
    let init = MutationObserverInit {
        child_list: true,
        subtree: true,
        ..Default::default()
    };

    let observer = dom.observe(root, init, move |dom, records| {
        if records.iter().all(|r| r.added_nodes.is_empty()) {
            return;
        }
        let found = dom.tree().query_selector(root, &watched);
        if let Some(found) = found {
            let _ = sender.try_send(found);
        }
    })?;
    let _guard = Disconnect::new(dom.clone(), observer);

    // The observer (and its sender) is dropped when root is destroyed
    Ok(receiver.recv().await.ok())
}
