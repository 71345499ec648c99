/// Engine-wide limits applied while compiling untrusted queries.
///
/// Evaluation recurses once per nesting level, so bounding the depth at
/// compile time also bounds stack use during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Deepest allowed nesting of logical operators.
    pub max_depth: usize,
    /// Most entries accepted in `select.ordering`.
    pub max_ordering_keys: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_ORDERING_KEYS: usize = 16;

impl Default for Context {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_ordering_keys: DEFAULT_MAX_ORDERING_KEYS,
        }
    }
}

impl Context {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_ordering_keys(mut self, max_ordering_keys: usize) -> Self {
        self.max_ordering_keys = max_ordering_keys;
        self
    }
}
