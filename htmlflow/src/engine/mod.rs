//! The visitor/cache engine.
//!
//! An upstream producer walks a tree and calls [`Engine::enter_element`],
//! [`Engine::attribute`], [`Engine::text`] and friends in document order. On
//! the first pass everything is written to the sink, and every run of markup
//! between two dynamic-region boundaries is captured as a [`Block`]. On later
//! passes calls outside dynamic regions are no-ops: at each boundary the engine
//! blits the next cached block in one write and restores the depth and
//! open-tag state recorded with it, so only dynamic content is produced again.
//!
//! Invariants:
//! - After the first pass, `blocks.len()` == dynamic regions entered + 1.
//! - Blocks are replayed strictly by position; the i-th boundary of a pass
//!   consumes the i-th block.
//! - `cached` flips to true once, at the end of the first completed pass.

mod block;

pub use block::Block;

use std::sync::Arc;

use crate::error::{RenderError, Result};
use crate::indentation;
use crate::sink::{Finished, Sink};
use crate::tags;

pub const DEFAULT_HEADER: &str = "<!DOCTYPE html>";

pub struct Engine {
    sink: Box<dyn Sink>,
    header: Arc<str>,
    /// Whether dynamic regions are allowed at all.
    dynamic: bool,
    depth: usize,
    /// False while a begin tag is still open for attributes (`<elem`).
    closed: bool,
    in_dynamic: bool,
    cached: bool,
    blocks: Vec<Block>,
    /// Next block to replay on a cached pass.
    cursor: usize,
    /// Sink position where the current static run started.
    run_start: usize,
}

impl Engine {
    pub fn new(sink: Box<dyn Sink>, dynamic: bool) -> Self {
        Engine {
            sink,
            header: Arc::from(DEFAULT_HEADER),
            dynamic,
            depth: 0,
            closed: true,
            in_dynamic: false,
            cached: false,
            blocks: Vec::new(),
            cursor: 0,
            run_start: 0,
        }
    }

    pub fn with_header(mut self, header: Arc<str>) -> Self {
        self.header = header;
        self
    }

    /// True while output must be physically produced: before the cache exists,
    /// or inside a dynamic region, which is never cached.
    pub fn is_writing(&self) -> bool {
        !self.cached || self.in_dynamic
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Aligns a partial's indentation with the parent it is spliced into.
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Closes a pending begin tag if any, otherwise starts a new indented line.
    fn newline_and_indent(&mut self) -> Result<()> {
        if !self.is_writing() {
            return Ok(());
        }
        if self.closed {
            self.sink.write_str(&indentation::tabs(self.depth))
        } else {
            self.depth += 1;
            self.closed = true;
            self.sink.write_str(&indentation::closed_tabs(self.depth))
        }
    }

    pub fn enter_element(&mut self, name: &str) -> Result<()> {
        self.newline_and_indent()?;
        if self.is_writing() {
            tags::open_tag(self.sink.as_mut(), name)?;
            self.closed = false;
        }
        Ok(())
    }

    pub fn exit_element(&mut self, name: &str) -> Result<()> {
        if !self.is_writing() {
            return Ok(());
        }
        if self.closed {
            self.depth = self.depth.saturating_sub(1);
            self.sink.write_str(&indentation::tabs(self.depth))?;
        } else {
            // Childless element: finish the begin tag at the same depth.
            self.closed = true;
            self.sink.write_str(&indentation::closed_tabs(self.depth))?;
        }
        tags::close_tag(self.sink.as_mut(), name)
    }

    pub fn exit_void_element(&mut self, _name: &str) -> Result<()> {
        if self.is_writing() {
            if !self.closed {
                self.sink.write_char(tags::FINISH_TAG)?;
            }
            self.closed = true;
        }
        Ok(())
    }

    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        if self.is_writing() {
            tags::attribute(self.sink.as_mut(), name, value)?;
        }
        Ok(())
    }

    pub fn text(&mut self, value: &str) -> Result<()> {
        self.newline_and_indent()?;
        if self.is_writing() {
            self.sink.write_str(value)?;
        }
        Ok(())
    }

    pub fn comment(&mut self, value: &str) -> Result<()> {
        self.newline_and_indent()?;
        if self.is_writing() {
            tags::comment(self.sink.as_mut(), value)?;
        }
        Ok(())
    }

    /// Writes `text` verbatim while writing; used for the document header and
    /// for splicing rendered partials.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        if self.is_writing() {
            self.sink.write_str(text)?;
        }
        Ok(())
    }

    pub fn write_header(&mut self) -> Result<()> {
        let header = Arc::clone(&self.header);
        self.write_raw(&header)
    }

    /// Finishes a pending begin tag with `>` and steps one level deeper.
    pub fn close_begin_tag(&mut self) -> Result<()> {
        if self.is_writing() && !self.closed {
            self.sink.write_char(tags::FINISH_TAG)?;
            self.closed = true;
            self.depth += 1;
        }
        Ok(())
    }

    pub fn enter_dynamic(&mut self) -> Result<()> {
        if !self.dynamic {
            return Err(RenderError::DynamicOnStaticView);
        }
        if self.cached {
            let block = self
                .blocks
                .get(self.cursor)
                .ok_or(RenderError::CacheDesync {
                    region: self.cursor,
                    cached: self.blocks.len(),
                })?;
            self.sink.write_str(block.text())?;
            self.depth = block.depth();
            self.closed = block.is_closed();
            self.cursor += 1;
        } else {
            let text = self.sink.slice_from(self.run_start)?.to_owned();
            tracing::trace!(
                target: "htmlflow.engine",
                block = self.blocks.len(),
                len = text.len(),
                depth = self.depth,
                "capture static block"
            );
            self.blocks.push(Block::new(text, self.depth, self.closed));
        }
        self.in_dynamic = true;
        Ok(())
    }

    pub fn exit_dynamic(&mut self) {
        self.in_dynamic = false;
        if !self.cached {
            self.run_start = self.sink.position();
        }
    }

    /// Completes one render pass and returns what the sink produced.
    pub fn finish_pass(&mut self) -> Result<Finished> {
        if self.cached {
            let cached = self.blocks.len();
            let block = self.blocks.get(self.cursor).ok_or(RenderError::CacheDesync {
                region: self.cursor,
                cached,
            })?;
            if self.cursor + 1 != cached {
                tracing::warn!(
                    target: "htmlflow.engine",
                    regions = self.cursor,
                    expected = cached - 1,
                    "dynamic regions differ from the cached pass; replay is positional"
                );
            }
            self.sink.write_str(block.text())?;
            self.depth = block.depth();
            self.closed = block.is_closed();
        } else {
            let text = self.sink.slice_from(self.run_start)?.to_owned();
            self.blocks.push(Block::new(text, self.depth, self.closed));
            self.cached = true;
            tracing::debug!(
                target: "htmlflow.engine",
                blocks = self.blocks.len(),
                dynamic = self.dynamic,
                "static block cache built"
            );
        }
        self.cursor = 0;
        self.run_start = 0;
        self.sink.finish_and_reset()
    }

    /// Drops everything a failed pass left behind so the next pass starts clean.
    pub fn abort_pass(&mut self) {
        self.sink.discard();
        self.depth = 0;
        self.closed = true;
        self.in_dynamic = false;
        self.cursor = 0;
        self.run_start = 0;
        if !self.cached {
            self.blocks.clear();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dynamic", &self.dynamic)
            .field("depth", &self.depth)
            .field("closed", &self.closed)
            .field("in_dynamic", &self.in_dynamic)
            .field("cached", &self.cached)
            .field("blocks", &self.blocks.len())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
