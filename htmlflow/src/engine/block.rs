/// One cached run of static markup, captured between two dynamic-region
/// boundaries (or a boundary and the start/end of the document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    text: String,
    /// Nesting depth when the run ended.
    depth: usize,
    /// Whether the last begin tag of the run was already finished with `>`.
    closed: bool,
}

impl Block {
    pub(crate) fn new(text: String, depth: usize, closed: bool) -> Self {
        Block {
            text,
            depth,
            closed,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
