use std::any::Any;

use crate::engine::Engine;
use crate::error::Result;
use crate::tags;
use crate::view::Partial;

/// Builder handle passed to view callbacks.
///
/// Nesting is expressed with closures, so every element entered is exited in
/// order. Attributes must be added before the first child of an element.
pub struct Html<'e> {
    engine: &'e mut Engine,
}

impl<'e> Html<'e> {
    pub(crate) fn new(engine: &'e mut Engine) -> Self {
        Html { engine }
    }

    /// Writes the document header, then the `<html>` root element.
    pub fn html<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.engine.write_header()?;
        self.element("html", f)
    }

    /// Enters `name`, runs `f` for its attributes and children, then exits it.
    /// Void elements (`img`, `br`, ...) are finished without a close tag.
    pub fn element<F>(&mut self, name: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.engine.enter_element(name)?;
        f(self)?;
        if tags::is_void(name) {
            self.engine.exit_void_element(name)?;
        } else {
            self.engine.exit_element(name)?;
        }
        Ok(self)
    }

    /// Like [`Html::element`] but always finished as a void element.
    pub fn void_element<F>(&mut self, name: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.engine.enter_element(name)?;
        f(self)?;
        self.engine.exit_void_element(name)?;
        Ok(self)
    }

    /// `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self> {
        self.element(name, |el| el.text(text).map(drop))
    }

    pub fn attr(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.engine.attribute(name, value)?;
        Ok(self)
    }

    pub fn text(&mut self, value: &str) -> Result<&mut Self> {
        self.engine.text(value)?;
        Ok(self)
    }

    pub fn comment(&mut self, value: &str) -> Result<&mut Self> {
        self.engine.comment(value)?;
        Ok(self)
    }

    /// Marks the output of `f` as dynamic: it is never cached and is produced
    /// again on every render.
    pub fn dynamic<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.engine.enter_dynamic()?;
        f(self)?;
        self.engine.exit_dynamic();
        Ok(self)
    }

    /// Splices a model-less partial view into this view's output.
    pub fn add_partial(&mut self, partial: &dyn Partial) -> Result<&mut Self> {
        self.splice(partial, None)
    }

    /// Splices a partial view bound to `model` into this view's output.
    pub fn add_partial_with<U: Any>(
        &mut self,
        partial: &dyn Partial,
        model: &U,
    ) -> Result<&mut Self> {
        self.splice(partial, Some(model as &dyn Any))
    }

    fn splice(&mut self, partial: &dyn Partial, model: Option<&dyn Any>) -> Result<&mut Self> {
        self.engine.close_begin_tag()?;
        partial.set_depth(self.engine.depth());
        if self.engine.is_writing() {
            let text = partial.render_nested(model)?;
            self.engine.write_raw(&text)?;
        }
        Ok(self)
    }

    pub fn depth(&self) -> usize {
        self.engine.depth()
    }

    pub fn is_writing(&self) -> bool {
        self.engine.is_writing()
    }

    /// Direct access to the engine's producer operations.
    pub fn engine(&mut self) -> &mut Engine {
        &mut *self.engine
    }
}
