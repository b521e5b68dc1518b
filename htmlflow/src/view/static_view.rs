use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::engine::Block;
use crate::error::{RenderError, Result};
use crate::sink::{Finished, Output};
use crate::view::{Capabilities, Html, Partial, ViewCore, into_text};

type BuildFn = dyn Fn(&mut Html<'_>) -> Result<()> + Send + Sync;

/// A view without a model. Its whole output is cached after the first render.
pub struct StaticView {
    core: ViewCore,
    builder: Option<Arc<BuildFn>>,
}

impl StaticView {
    /// A view rendered by calling `builder` on every pass.
    pub fn new<F>(builder: F) -> Self
    where
        F: Fn(&mut Html<'_>) -> Result<()> + Send + Sync + 'static,
    {
        StaticView {
            core: ViewCore::new(Output::Memory, false),
            builder: Some(Arc::new(builder)),
        }
    }

    /// A view without a builder, populated through [`StaticView::visit`].
    pub fn empty() -> Self {
        StaticView {
            core: ViewCore::new(Output::Memory, false),
            builder: None,
        }
    }

    fn reconfigured(&self, core: ViewCore) -> Self {
        StaticView {
            core,
            builder: self.builder.clone(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::MODELLESS
    }

    fn require(&self, capability: Capabilities) -> Result<()> {
        if self.capabilities().contains(capability) {
            Ok(())
        } else {
            Err(RenderError::ModelNotSupported)
        }
    }

    /// Drives this view's engine with `f` without completing the pass; the
    /// next `render` or `write` finishes it.
    pub fn visit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Html<'_>) -> Result<()>,
    {
        self.core.visit(f)
    }

    pub fn render(&self) -> Result<String> {
        self.require(Capabilities::MODELLESS)?;
        self.core.ensure_retrievable()?;
        into_text(self.pass()?)
    }

    pub fn write(&self) -> Result<()> {
        self.require(Capabilities::MODELLESS)?;
        self.pass().map(drop)
    }

    pub fn render_with<M: ?Sized>(&self, _model: &M) -> Result<String> {
        self.require(Capabilities::MODEL)?;
        self.render()
    }

    pub fn write_with<M: ?Sized>(&self, _model: &M) -> Result<()> {
        self.require(Capabilities::MODEL)?;
        self.write()
    }

    fn pass(&self) -> Result<Finished> {
        self.core.run_pass(|html| match &self.builder {
            Some(builder) => builder(html),
            None => Ok(()),
        })
    }

    pub fn thread_safe(&self) -> Result<Self> {
        Ok(self.reconfigured(self.core.thread_safe()?))
    }

    pub fn with_output(&self, output: Output) -> Result<Self> {
        Ok(self.reconfigured(self.core.with_output(output)?))
    }

    pub fn with_header(&self, header: impl Into<Arc<str>>) -> Self {
        self.reconfigured(self.core.with_header(header.into()))
    }

    pub fn is_thread_safe(&self) -> bool {
        self.core.is_thread_safe()
    }

    pub fn output(&self) -> &Output {
        self.core.output()
    }

    /// The blocks cached by the calling thread's engine.
    pub fn cached_blocks(&self) -> Vec<Block> {
        self.core.cached_blocks()
    }
}

impl Default for StaticView {
    fn default() -> Self {
        Self::empty()
    }
}

impl Partial for StaticView {
    fn set_depth(&self, depth: usize) {
        self.core.set_depth(depth);
    }

    fn render_nested(&self, model: Option<&dyn Any>) -> Result<String> {
        match model {
            Some(model) => self.render_with(model),
            None => self.render(),
        }
    }
}

impl fmt::Debug for StaticView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticView")
            .field("output", self.core.output())
            .field("thread_safe", &self.core.is_thread_safe())
            .field("builder", &self.builder.is_some())
            .finish()
    }
}
