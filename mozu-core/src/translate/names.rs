use std::collections::HashSet;

/// Speaker names in first-seen order, shared by every script of a run.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the name was not known yet.
    pub fn register(&mut self, raw: &str) -> bool {
        if self.seen.contains(raw) {
            return false;
        }
        self.seen.insert(raw.to_string());
        self.order.push(raw.to_string());
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
