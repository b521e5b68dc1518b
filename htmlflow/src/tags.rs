//! Markup fragments written by the engine.

use crate::error::Result;
use crate::sink::Sink;

const BEGIN_TAG: char = '<';
const BEGIN_CLOSE_TAG: &str = "</";
const BEGIN_COMMENT_TAG: &str = "<!-- ";
const END_COMMENT_TAG: &str = " -->";
const ATTRIBUTE_MID: &str = "=\"";
const SPACE: char = ' ';
const QUOTATION: char = '"';
pub(crate) const FINISH_TAG: char = '>';

/// Elements that never have children or a separate close tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// `<name`, left open for attributes.
pub(crate) fn open_tag(sink: &mut dyn Sink, name: &str) -> Result<()> {
    sink.write_char(BEGIN_TAG)?;
    sink.write_str(name)
}

/// ` name="value"`
pub(crate) fn attribute(sink: &mut dyn Sink, name: &str, value: &str) -> Result<()> {
    sink.write_char(SPACE)?;
    sink.write_str(name)?;
    sink.write_str(ATTRIBUTE_MID)?;
    sink.write_str(value)?;
    sink.write_char(QUOTATION)
}

/// `<!-- text -->`
pub(crate) fn comment(sink: &mut dyn Sink, text: &str) -> Result<()> {
    sink.write_str(BEGIN_COMMENT_TAG)?;
    sink.write_str(text)?;
    sink.write_str(END_COMMENT_TAG)
}

/// `</name>`
pub(crate) fn close_tag(sink: &mut dyn Sink, name: &str) -> Result<()> {
    sink.write_str(BEGIN_CLOSE_TAG)?;
    sink.write_str(name)?;
    sink.write_char(FINISH_TAG)
}
