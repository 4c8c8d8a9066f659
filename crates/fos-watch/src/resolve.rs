//! Selector path resolver
//!
//! Walks a [`SelectorPath`] step by step, waiting at each step for the next
//! shadow root or element to appear.

use fos_css::SelectorList;
use fos_dom::{Dom, NodeId};

use crate::element::element_ready;
use crate::shadow::shadow_root_ready;
use crate::{SelectorPath, Step, WaitOptions, WatchResult};

/// Resolve `path` starting at `root`.
///
/// An empty path resolves to `root`. Every query step is compiled before
/// the walk starts, so a bad selector anywhere in the path fails without
/// waiting. The deadline and token in `options` cover the whole walk.
pub async fn resolve_path(
    dom: &Dom,
    root: NodeId,
    path: &SelectorPath,
    options: &WaitOptions,
) -> WatchResult<Option<NodeId>> {
    let compiled = path
        .steps()
        .iter()
        .map(|step| match step {
            Step::CrossShadow => Ok(None),
            Step::Query(selector) => SelectorList::parse(selector).map(Some),
        })
        .collect::<Result<Vec<_>, _>>()?;

    options.run(walk(dom, root, &compiled)).await
}

/// [`SelectorPath::parse`] followed by [`resolve_path`]
pub async fn wait_selector(
    dom: &Dom,
    root: NodeId,
    selector: &str,
    options: &WaitOptions,
) -> WatchResult<Option<NodeId>> {
    resolve_path(dom, root, &SelectorPath::parse(selector), options).await
}

/// `None` entries cross a shadow boundary
async fn walk(dom: &Dom, root: NodeId, steps: &[Option<SelectorList>]) -> WatchResult<Option<NodeId>> {
    let mut current = root;
    for step in steps {
        let next = match step {
            None => shadow_root_ready(dom, current).await?,
            Some(selectors) => element_ready(dom, current, selectors).await?,
        };
        match next {
            Some(node) => current = node,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}
