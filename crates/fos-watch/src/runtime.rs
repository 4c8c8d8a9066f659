//! Event loop
//!
//! Drives watcher futures against a [`Dom`]. Tasks run on a
//! single-threaded executor; between task polls the loop performs the
//! microtask checkpoint (mutation delivery). Animation frames only run when
//! asked for with [`EventLoop::paint`], or on every pump of
//! [`EventLoop::block_on`].

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use fos_dom::Dom;
use smol::{LocalExecutor, Timer, future};

/// Pump interval for [`EventLoop::block_on`]
const PUMP_INTERVAL: Duration = Duration::from_millis(1);

/// Single-threaded executor bound to one document
#[derive(Clone)]
pub struct EventLoop {
    dom: Dom,
    executor: Rc<LocalExecutor<'static>>,
}

impl EventLoop {
    pub fn new(dom: Dom) -> Self {
        Self {
            dom,
            executor: Rc::new(LocalExecutor::new()),
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Spawn a detached task; it runs on the next tick
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.executor.spawn(future).detach();
    }

    /// Run ready tasks and deliver mutations until neither makes progress.
    ///
    /// Returns the number of task polls plus observer callbacks performed.
    pub fn run_until_stalled(&self) -> usize {
        let mut steps = 0;
        loop {
            let mut progressed = false;
            while self.executor.try_tick() {
                steps += 1;
                progressed = true;
            }
            let delivered = self.dom.deliver_mutations();
            if delivered > 0 {
                steps += delivered;
                progressed = true;
            }
            if !progressed {
                return steps;
            }
        }
    }

    /// Run one animation frame, then settle.
    ///
    /// Returns the number of frame callbacks run.
    pub fn paint(&self) -> usize {
        let ran = self.dom.run_animation_frame();
        self.run_until_stalled();
        ran
    }

    /// Drive `future` to completion, pumping mutations and frames while it
    /// waits on timers
    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        let dom = self.dom.clone();
        let pump = async move {
            loop {
                dom.deliver_mutations();
                dom.run_animation_frame();
                Timer::after(PUMP_INTERVAL).await;
            }
        };
        smol::block_on(self.executor.run(future::or(future, pump)))
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop").field("dom", &self.dom).finish()
    }
}
