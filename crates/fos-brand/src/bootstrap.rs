//! Bootstrap
//!
//! Finds the application element, waits for its shadow root and starts a
//! watcher there. Dropping the [`BrandResolver`] stops everything it
//! started.

use std::rc::Rc;

use fos_css::{ElementQuery, SelectorList};
use fos_dom::NodeId;
use fos_watch::{EventLoop, WaitOptions, Watcher, wait_shadow_root};

use crate::handlers::{BrandWatcher, handler_table};
use crate::{BrandConfig, BrandContext, BrandError, BrandResult, StateRegistry};

#[derive(Debug)]
pub struct BrandResolver {
    watcher: Rc<BrandWatcher>,
    root: NodeId,
}

impl BrandResolver {
    /// Watch `root` (normally the application's shadow root).
    ///
    /// The root's first element child is dispatched right away, since it
    /// usually exists before anyone is listening.
    pub fn attach(
        runtime: &EventLoop,
        root: NodeId,
        states: StateRegistry,
        config: &BrandConfig,
    ) -> BrandResult<Self> {
        let context = BrandContext::new(config.images.clone(), states);
        let watcher = Watcher::new(runtime.clone(), handler_table(), context, config.debug);
        watcher.subscribe(root, false)?;

        let first = runtime.dom().tree().first_element_child(root);
        if let Some(first) = first {
            watcher.emit_create(root, first)?;
        }

        tracing::debug!("Brand resolver attached to {} ({} images)", root, config.images.len());
        Ok(Self { watcher, root })
    }

    /// Find `config.host_element` in the document, wait for its shadow
    /// root, then [`attach`](Self::attach) there.
    pub async fn install(runtime: &EventLoop, states: StateRegistry, config: &BrandConfig) -> BrandResult<Self> {
        let dom = runtime.dom();
        let selector = SelectorList::parse(&config.host_element)
            .map_err(|e| BrandError::Config(format!("host_element: {e}")))?;
        let host = dom
            .tree()
            .query_selector(dom.document(), &selector)
            .ok_or_else(|| BrandError::NotFound(config.host_element.clone()))?;

        let mut options = WaitOptions::new();
        if let Some(timeout) = config.shadow_timeout() {
            options = options.with_timeout(timeout);
        }
        let root = wait_shadow_root(dom, host, &options)
            .await?
            .ok_or_else(|| BrandError::NotFound(config.host_element.clone()))?;

        Self::attach(runtime, root, states, config)
    }

    pub fn watcher(&self) -> &Rc<BrandWatcher> {
        &self.watcher
    }

    pub fn context(&self) -> &BrandContext {
        self.watcher.context()
    }

    /// The node passed to [`attach`](Self::attach)
    pub fn root(&self) -> NodeId {
        self.root
    }
}
