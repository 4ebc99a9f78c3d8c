//! Linear undo/redo over document snapshots.

use crate::document::DocumentState;
use thiserror::Error;

/// Soft signals returned when undo/redo has nowhere to go.
///
/// These never indicate a fault; the UI uses them to disable controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Already at the oldest history entry")]
    AtOldest,
    #[error("Already at the newest history entry")]
    AtNewest,
}

/// Result type for history navigation.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Snapshot history with a cursor.
///
/// `entries[cursor]` is the live document after every [`History::record`].
/// Recording after an undo discards everything past the cursor.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<DocumentState>,
    cursor: usize,
    /// Maximum number of entries kept, oldest evicted first.
    limit: Option<usize>,
}

impl History {
    /// Create a history seeded with an initial snapshot.
    pub fn new(initial: DocumentState) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: None,
        }
    }

    /// Create a history that keeps at most `limit` entries.
    pub fn with_limit(initial: DocumentState, limit: Option<usize>) -> Self {
        let mut history = Self::new(initial);
        history.limit = limit.map(|l| l.max(1));
        history
    }

    /// Append a snapshot, discarding any redo branch.
    pub fn record(&mut self, snapshot: DocumentState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(snapshot);

        if let Some(limit) = self.limit {
            let excess = self.entries.len().saturating_sub(limit);
            if excess > 0 {
                self.entries.drain(..excess);
            }
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry and return it.
    pub fn undo(&mut self) -> HistoryResult<&DocumentState> {
        if self.cursor == 0 || self.entries.is_empty() {
            return Err(HistoryError::AtOldest);
        }
        self.cursor -= 1;
        Ok(&self.entries[self.cursor])
    }

    /// Step forward one entry and return it.
    pub fn redo(&mut self) -> HistoryResult<&DocumentState> {
        if self.cursor + 1 >= self.entries.len() {
            return Err(HistoryError::AtNewest);
        }
        self.cursor += 1;
        Ok(&self.entries[self.cursor])
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<&DocumentState> {
        self.entries.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Drop all entries and start again from `initial`.
    pub fn reset(&mut self, initial: DocumentState) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }
}
