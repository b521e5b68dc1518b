//! Cached HTML rendering.
//!
//! A producer describes a document as a sequence of enter/attribute/text/exit
//! calls against an [`Html`] handle. The first render of a view writes
//! everything and caches the static markup between [`Html::dynamic`] regions;
//! later renders blit the cached blocks and only run the dynamic regions,
//! which is what makes re-rendering a [`DynamicView`] against a new model cheap.
//!
//! ```
//! use htmlflow::DynamicView;
//!
//! let view = DynamicView::bind(|html, name: &String| {
//!     html.html(|html| {
//!         html.element("body", |body| {
//!             body.element("div", |div| {
//!                 div.attr("class", "c")?;
//!                 div.dynamic(|div| div.text(name).map(drop))?;
//!                 Ok(())
//!             })?;
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! });
//!
//! let alice = view.render_with(&"Alice".to_string()).unwrap();
//! let bob = view.render_with(&"Bob".to_string()).unwrap();
//! assert_eq!(alice.replace("Alice", "Bob"), bob);
//! ```

pub mod engine;
pub mod error;
pub mod indentation;
pub mod sink;
pub mod tags;
pub mod view;

pub use engine::{Block, Engine};
pub use error::{RenderError, Result};
pub use sink::{Output, StreamTarget};
pub use view::{Capabilities, DynamicView, Html, Partial, StaticView};
