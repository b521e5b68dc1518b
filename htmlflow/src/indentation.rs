//! Precomputed newline + indentation strings keyed by nesting depth.

use std::borrow::Cow;
use std::sync::LazyLock;

use crate::tags::FINISH_TAG;

const MAX_TABS: usize = 1000;
const NEWLINE: char = '\n';
const TAB: char = '\t';

static TABS: LazyLock<Vec<String>> = LazyLock::new(|| (0..MAX_TABS).map(build_tabs).collect());
static CLOSED_TABS: LazyLock<Vec<String>> =
    LazyLock::new(|| (0..MAX_TABS).map(build_closed_tabs).collect());

fn build_tabs(depth: usize) -> String {
    let mut s = String::with_capacity(depth + 1);
    s.push(NEWLINE);
    s.extend(std::iter::repeat_n(TAB, depth));
    s
}

fn build_closed_tabs(depth: usize) -> String {
    let mut s = String::with_capacity(depth + 2);
    s.push(FINISH_TAG);
    s.push(NEWLINE);
    s.extend(std::iter::repeat_n(TAB, depth));
    s
}

/// `"\n"` followed by `depth` tabs.
pub fn tabs(depth: usize) -> Cow<'static, str> {
    match TABS.get(depth) {
        Some(s) => Cow::Borrowed(s.as_str()),
        None => Cow::Owned(build_tabs(depth)),
    }
}

/// `">\n"` followed by `depth` tabs: closes a pending begin tag and starts a new line.
pub fn closed_tabs(depth: usize) -> Cow<'static, str> {
    match CLOSED_TABS.get(depth) {
        Some(s) => Cow::Borrowed(s.as_str()),
        None => Cow::Owned(build_closed_tabs(depth)),
    }
}
