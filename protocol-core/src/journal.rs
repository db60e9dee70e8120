//! Per-command undo journal
//!
//! While a command is open, components record the inverse of every write
//! they make. A failed command is unwound newest first; a successful one
//! discards the journal. The cost of a rollback is proportional to the
//! command, never to the history held by the component.

/// Undo entries of the open command
#[derive(Debug, Clone)]
pub struct Journal<T> {
    entries: Option<Vec<T>>,
}

impl<T> Default for Journal<T> {
    fn default() -> Self {
        Self { entries: None }
    }
}

impl<T> Journal<T> {
    /// Create a closed journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the journal, discarding anything left from a previous command
    pub fn begin(&mut self) {
        self.entries = Some(Vec::new());
    }

    /// Check if a command is open
    pub fn is_open(&self) -> bool {
        self.entries.is_some()
    }

    /// Record an undo entry. Ignored while closed.
    pub fn record(&mut self, entry: T) {
        if let Some(entries) = self.entries.as_mut() {
            entries.push(entry);
        }
    }

    /// Close the journal, keeping every write
    pub fn commit(&mut self) {
        self.entries = None;
    }

    /// Close the journal and return its entries, newest first
    pub fn unwind(&mut self) -> std::iter::Rev<std::vec::IntoIter<T>> {
        self.entries.take().unwrap_or_default().into_iter().rev()
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State that can be returned to the start of a command
pub trait Transactional {
    /// Start recording undo entries
    fn begin(&mut self);

    /// Keep every write made since `begin`
    fn commit(&mut self);

    /// Undo every write made since `begin`
    fn rollback(&mut self);
}
