use std::collections::HashSet;

/// Per-run attendance state. Lives as long as the loop; never persisted.
#[derive(Debug, Clone)]
pub struct SessionState {
    marked: HashSet<String>,
    unknown_counter: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            marked: HashSet::new(),
            unknown_counter: 1,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_marked(&self, name: &str) -> bool {
        self.marked.contains(name)
    }

    /// Record `name` as marked. Returns false if it already was.
    pub fn mark(&mut self, name: impl Into<String>) -> bool {
        self.marked.insert(name.into())
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Number the next unknown-face event will receive.
    pub fn unknown_counter(&self) -> u32 {
        self.unknown_counter
    }

    /// Label for the next unknown-face event, e.g. `unknown_3`.
    pub fn next_unknown_label(&self) -> String {
        format!("unknown_{}", self.unknown_counter)
    }

    /// Consume the current unknown number.
    pub fn advance_unknown(&mut self) {
        self.unknown_counter += 1;
    }
}
