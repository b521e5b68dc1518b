use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::engine::Block;
use crate::error::{RenderError, Result};
use crate::sink::{Finished, Output};
use crate::view::{Capabilities, Html, Partial, ViewCore, into_text};

type BinderFn<M> = dyn Fn(&mut Html<'_>, &M) -> Result<()> + Send + Sync;
type TemplateFn<M> = dyn Fn(&mut Html<'_>, &M, &[&dyn Partial]) -> Result<()> + Send + Sync;

enum Producer<M: 'static> {
    /// `(view, model)`, used by `render_with` / `write_with`.
    Bound(Arc<BinderFn<M>>),
    /// `(view, model, partials)`, used by `render_with_partials`.
    Templated(Arc<TemplateFn<M>>),
}

impl<M: 'static> Clone for Producer<M> {
    fn clone(&self) -> Self {
        match self {
            Producer::Bound(f) => Producer::Bound(Arc::clone(f)),
            Producer::Templated(f) => Producer::Templated(Arc::clone(f)),
        }
    }
}

/// A view bound to a model of type `M`.
///
/// Static markup around [`Html::dynamic`] regions is cached on the first
/// render; later renders replay it and only run the dynamic regions again.
/// The regions must sit at the same positions on every render: blocks are
/// matched to regions by order alone.
pub struct DynamicView<M: 'static> {
    core: ViewCore,
    producer: Producer<M>,
}

impl<M: 'static> DynamicView<M> {
    /// A view rendered with [`DynamicView::render_with`].
    pub fn bind<F>(binder: F) -> Self
    where
        F: Fn(&mut Html<'_>, &M) -> Result<()> + Send + Sync + 'static,
    {
        DynamicView {
            core: ViewCore::new(Output::Memory, true),
            producer: Producer::Bound(Arc::new(binder)),
        }
    }

    /// A view rendered with [`DynamicView::render_with_partials`].
    pub fn template<F>(template: F) -> Self
    where
        F: Fn(&mut Html<'_>, &M, &[&dyn Partial]) -> Result<()> + Send + Sync + 'static,
    {
        DynamicView {
            core: ViewCore::new(Output::Memory, true),
            producer: Producer::Templated(Arc::new(template)),
        }
    }

    fn reconfigured(&self, core: ViewCore) -> Self {
        DynamicView {
            core,
            producer: self.producer.clone(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self.producer {
            Producer::Bound(_) => Capabilities::MODEL,
            Producer::Templated(_) => Capabilities::PARTIALS,
        }
    }

    fn require(&self, capability: Capabilities) -> Result<()> {
        if self.capabilities().contains(capability) {
            Ok(())
        } else if capability == Capabilities::PARTIALS {
            Err(RenderError::PartialsNotSupported)
        } else {
            Err(RenderError::ModelMissing)
        }
    }

    /// Always fails: a dynamic view needs a model.
    pub fn render(&self) -> Result<String> {
        Err(RenderError::ModelMissing)
    }

    /// Always fails: a dynamic view needs a model.
    pub fn write(&self) -> Result<()> {
        Err(RenderError::ModelMissing)
    }

    pub fn render_with(&self, model: &M) -> Result<String> {
        self.require(Capabilities::MODEL)?;
        self.core.ensure_retrievable()?;
        into_text(self.bound_pass(model)?)
    }

    pub fn write_with(&self, model: &M) -> Result<()> {
        self.require(Capabilities::MODEL)?;
        self.bound_pass(model).map(drop)
    }

    pub fn render_with_partials(&self, model: &M, partials: &[&dyn Partial]) -> Result<String> {
        self.require(Capabilities::PARTIALS)?;
        self.core.ensure_retrievable()?;
        into_text(self.templated_pass(model, partials)?)
    }

    pub fn write_with_partials(&self, model: &M, partials: &[&dyn Partial]) -> Result<()> {
        self.require(Capabilities::PARTIALS)?;
        self.templated_pass(model, partials).map(drop)
    }

    fn bound_pass(&self, model: &M) -> Result<Finished> {
        match &self.producer {
            Producer::Bound(binder) => self.core.run_pass(|html| binder(html, model)),
            Producer::Templated(_) => Err(RenderError::ModelMissing),
        }
    }

    fn templated_pass(&self, model: &M, partials: &[&dyn Partial]) -> Result<Finished> {
        match &self.producer {
            Producer::Templated(template) => {
                self.core.run_pass(|html| template(html, model, partials))
            }
            Producer::Bound(_) => Err(RenderError::PartialsNotSupported),
        }
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

impl<M: 'static> Partial for DynamicView<M> {
    fn set_depth(&self, depth: usize) {
        self.core.set_depth(depth);
    }

    fn render_nested(&self, model: Option<&dyn Any>) -> Result<String> {
        let model = model.ok_or(RenderError::ModelMissing)?;
        let model = model
            .downcast_ref::<M>()
            .ok_or(RenderError::ModelTypeMismatch {
                expected: type_name::<M>(),
            })?;
        self.render_with(model)
    }
}

impl<M: 'static> fmt::Debug for DynamicView<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let producer = match self.producer {
            Producer::Bound(_) => "binder",
            Producer::Templated(_) => "template",
        };
        f.debug_struct("DynamicView")
            .field("model", &type_name::<M>())
            .field("producer", &producer)
            .field("output", self.core.output())
            .field("thread_safe", &self.core.is_thread_safe())
            .finish()
    }
}
