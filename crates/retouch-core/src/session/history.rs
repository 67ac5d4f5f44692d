//! Undo history of preset snapshots.

use crate::preset::{EditOp, EditPreset};

/// A preset snapshot and the edit that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub preset: EditPreset,
    /// `None` for the loaded or reset state.
    pub edit: Option<EditOp>,
}

impl HistoryItem {
    pub fn new(preset: EditPreset, edit: Option<EditOp>) -> Self {
        Self { preset, edit }
    }
}

/// Oldest-first list of snapshots with a cursor on the active one.
///
/// Adding while the cursor is behind the newest item drops the redo tail.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    items: Vec<HistoryItem>,
    current: usize,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    /// Index of the active item.
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&HistoryItem> {
        self.items.get(self.current)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.current = 0;
    }

    /// Replace the whole history with one item.
    pub fn reset(&mut self, item: HistoryItem) {
        self.items.clear();
        self.items.push(item);
        self.current = 0;
    }

    pub fn add(&mut self, item: HistoryItem) {
        if !self.items.is_empty() {
            self.items.truncate(self.current + 1);
        }
        self.items.push(item);
        self.current = self.items.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.items.len()
    }

    pub fn can_reset(&self) -> bool {
        self.items.len() > 1
    }

    pub fn undo(&mut self) -> Option<&HistoryItem> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        self.current()
    }

    pub fn redo(&mut self) -> Option<&HistoryItem> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        self.current()
    }

    pub fn jump_to(&mut self, position: usize) -> Option<&HistoryItem> {
        if position >= self.items.len() {
            return None;
        }
        self.current = position;
        self.current()
    }
}
