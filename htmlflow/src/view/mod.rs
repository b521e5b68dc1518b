//! Views: the public render/write entry points.
//!
//! A view pairs a content producer with one [`Engine`] (or one per calling
//! thread once [`StaticView::thread_safe`] / [`DynamicView::thread_safe`] has
//! been applied). Reconfiguring a view never mutates it: every `with_*` and
//! `thread_safe` call returns a fresh view with fresh engines that shares the
//! same producer.

mod dynamic_view;
mod html;
mod static_view;

pub use dynamic_view::DynamicView;
pub use html::Html;
pub use static_view::StaticView;

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::engine::{Block, DEFAULT_HEADER, Engine};
use crate::error::{RenderError, Result};
use crate::sink::{Finished, Output};

bitflags! {
    /// The entry points a view accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// `render()` / `write()`
        const MODELLESS = 0b0000_0001;
        /// `render_with(model)` / `write_with(model)`
        const MODEL     = 0b0000_0010;
        /// `render_with_partials(model, partials)`
        const PARTIALS  = 0b0000_0100;
    }
}

/// A view that can be spliced into another view's output.
pub trait Partial {
    /// Sets the nesting depth the partial's next pass starts at.
    fn set_depth(&self, depth: usize);

    /// Runs a complete, independent render pass of the partial.
    fn render_nested(&self, model: Option<&dyn Any>) -> Result<String>;
}

/// Everything needed to build a fresh engine for a view.
#[derive(Debug, Clone)]
struct EngineFactory {
    output: Output,
    dynamic: bool,
    header: Arc<str>,
}

impl EngineFactory {
    fn build(&self) -> Engine {
        Engine::new(self.output.sink(), self.dynamic).with_header(Arc::clone(&self.header))
    }
}

type EngineMap = Mutex<HashMap<ThreadId, Arc<Mutex<Engine>>>>;

enum EngineStore {
    Shared(Mutex<Engine>),
    /// Entries are removed by [`Release`] when their thread exits.
    PerThread(Arc<EngineMap>),
}

/// Drops one thread's engine from a view's store.
struct Release {
    engines: Weak<EngineMap>,
    thread: ThreadId,
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(engines) = self.engines.upgrade() {
            engines.lock().remove(&self.thread);
            tracing::debug!(target: "htmlflow.view", thread = ?self.thread, "per-thread engine released");
        }
    }
}

thread_local! {
    static RELEASES: RefCell<Vec<Release>> = const { RefCell::new(Vec::new()) };
}

/// Arranges for the calling thread's engine to leave `engines` when the
/// thread exits. Must be called without holding the `engines` lock.
fn release_on_exit(engines: &Arc<EngineMap>, thread: ThreadId) {
    let release = Release {
        engines: Arc::downgrade(engines),
        thread,
    };
    // During thread teardown the storage is gone and `release` drops at once,
    // so the engine is not retained.
    let _ = RELEASES.try_with(move |releases| {
        let mut releases = releases.borrow_mut();
        releases.retain(|release| release.engines.strong_count() > 0);
        releases.push(release);
    });
}

/// Engine ownership and configuration shared by both view kinds.
struct ViewCore {
    factory: EngineFactory,
    store: EngineStore,
}

impl ViewCore {
    fn new(output: Output, dynamic: bool) -> Self {
        let factory = EngineFactory {
            output,
            dynamic,
            header: Arc::from(DEFAULT_HEADER),
        };
        Self::from_factory(factory, false)
    }

    fn from_factory(factory: EngineFactory, thread_safe: bool) -> Self {
        let store = if thread_safe {
            EngineStore::PerThread(Arc::new(Mutex::new(HashMap::new())))
        } else {
            EngineStore::Shared(Mutex::new(factory.build()))
        };
        ViewCore { factory, store }
    }

    fn is_thread_safe(&self) -> bool {
        matches!(self.store, EngineStore::PerThread(_))
    }

    fn output(&self) -> &Output {
        &self.factory.output
    }

    fn thread_safe(&self) -> Result<Self> {
        if self.factory.output.is_stream() {
            return Err(RenderError::ThreadSafeWithTransportSink);
        }
        Ok(Self::from_factory(self.factory.clone(), true))
    }

    fn with_output(&self, output: Output) -> Result<Self> {
        if self.is_thread_safe() && output.is_stream() {
            return Err(RenderError::TransportSinkOnThreadSafeView);
        }
        let factory = EngineFactory {
            output,
            ..self.factory.clone()
        };
        Ok(Self::from_factory(factory, self.is_thread_safe()))
    }

    fn with_header(&self, header: Arc<str>) -> Self {
        let factory = EngineFactory {
            header,
            ..self.factory.clone()
        };
        Self::from_factory(factory, self.is_thread_safe())
    }

    /// Runs `f` against the engine owned by the calling thread.
    fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        match &self.store {
            EngineStore::Shared(engine) => {
                let mut engine = engine.lock();
                f(&mut *engine)
            }
            EngineStore::PerThread(engines) => {
                let id = thread::current().id();
                let (slot, created) = {
                    let mut map = engines.lock();
                    match map.get(&id) {
                        Some(slot) => (Arc::clone(slot), false),
                        None => {
                            tracing::debug!(target: "htmlflow.view", thread = ?id, "new per-thread engine");
                            let slot = Arc::new(Mutex::new(self.factory.build()));
                            map.insert(id, Arc::clone(&slot));
                            (slot, true)
                        }
                    }
                };
                if created {
                    release_on_exit(engines, id);
                }
                let mut engine = slot.lock();
                f(&mut *engine)
            }
        }
    }

    /// Drives the engine with `produce` without finishing the pass.
    fn visit(&self, produce: impl FnOnce(&mut Html<'_>) -> Result<()>) -> Result<()> {
        self.with_engine(|engine| {
            let result = produce(&mut Html::new(engine));
            if result.is_err() {
                engine.abort_pass();
            }
            result
        })
    }

    /// One complete top-to-bottom pass.
    fn run_pass(&self, produce: impl FnOnce(&mut Html<'_>) -> Result<()>) -> Result<Finished> {
        self.with_engine(|engine| {
            let produced = produce(&mut Html::new(engine));
            let result = produced.and_then(|()| engine.finish_pass());
            if result.is_err() {
                engine.abort_pass();
            }
            result
        })
    }

    /// Fails early when the pass would stream its text instead of returning it.
    fn ensure_retrievable(&self) -> Result<()> {
        if self.factory.output.is_stream() {
            return Err(RenderError::OutputNotRetrievable);
        }
        Ok(())
    }

    fn set_depth(&self, depth: usize) {
        self.with_engine(|engine| engine.set_depth(depth));
    }

    fn cached_blocks(&self) -> Vec<Block> {
        self.with_engine(|engine| engine.blocks().to_vec())
    }

    /// Engines currently held for live threads; zero for shared views.
    #[cfg(test)]
    fn thread_engines(&self) -> usize {
        match &self.store {
            EngineStore::Shared(_) => 0,
            EngineStore::PerThread(engines) => engines.lock().len(),
        }
    }
}

fn into_text(finished: Finished) -> Result<String> {
    match finished {
        Finished::Text(text) => Ok(text),
        Finished::Streamed => Err(RenderError::OutputNotRetrievable),
    }
}
