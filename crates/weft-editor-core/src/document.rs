//! A small editing surface: buffer with history, a cursor and a selection.
//!
//! This is what widget sub-editors run on. Every edit goes through
//! [`PlainEditor::replace`], which keeps the cursor after the inserted text
//! and drops the selection.

use std::ops::Range;

use smol_str::SmolStr;

use crate::text::TextBuffer;
use crate::types::{EditInfo, Selection};
use crate::undo::UndoManager;

#[derive(Clone, Default)]
pub struct PlainEditor<B> {
    buffer: B,
    /// Char offset, always within the buffer.
    cursor: usize,
    selection: Option<Selection>,
}

impl<B: TextBuffer + UndoManager> PlainEditor<B> {
    pub fn new(buffer: B) -> Self {
        Self {
            buffer,
            cursor: 0,
            selection: None,
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn value(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the text. Clears the selection.
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.len_chars());
        self.selection = None;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Select a range, clamped to the text. The cursor follows the head.
    pub fn select(&mut self, anchor: usize, head: usize) {
        let len = self.len_chars();
        let selection = Selection::new(anchor.min(len), head.min(len));
        self.cursor = selection.head;
        self.selection = Some(selection);
    }

    pub fn select_all(&mut self) {
        self.select(0, self.len_chars());
    }

    pub fn selected_text(&self) -> Option<SmolStr> {
        let selection = self.selection?;
        self.buffer.slice(selection.to_range())
    }

    /// Replace a char range. `None` if the range is out of bounds.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Option<EditInfo> {
        if range.start > range.end || range.end > self.len_chars() {
            return None;
        }
        let start = range.start;
        let deleted_len = range.len();
        self.buffer.replace(range, text);

        let inserted_len = text.chars().count();
        self.cursor = start + inserted_len;
        self.selection = None;
        Some(EditInfo::new(start, deleted_len, inserted_len, self.len_chars()))
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Option<EditInfo> {
        self.replace(offset..offset, text)
    }

    pub fn delete(&mut self, range: Range<usize>) -> Option<EditInfo> {
        self.replace(range, "")
    }

    /// Type over the selection, or at the cursor when nothing is selected.
    pub fn type_text(&mut self, text: &str) -> Option<EditInfo> {
        let range = self.target_range();
        self.replace(range, text)
    }

    /// Delete the selection, or the char before the cursor.
    pub fn backspace(&mut self) -> Option<EditInfo> {
        match self.selection.filter(|s| !s.is_collapsed()) {
            Some(selection) => self.delete(selection.to_range()),
            None if self.cursor > 0 => self.delete(self.cursor - 1..self.cursor),
            None => None,
        }
    }

    pub fn undo(&mut self) -> bool {
        let done = self.buffer.undo();
        if done {
            self.after_history();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.buffer.redo();
        if done {
            self.after_history();
        }
        done
    }

    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.buffer.can_redo()
    }

    fn target_range(&self) -> Range<usize> {
        match self.selection {
            Some(selection) => selection.to_range(),
            None => self.cursor..self.cursor,
        }
    }

    fn after_history(&mut self) {
        self.cursor = self.cursor.min(self.len_chars());
        self.selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EditorRope, UndoableBuffer};

    fn editor(content: &str) -> PlainEditor<UndoableBuffer<EditorRope>> {
        PlainEditor::new(UndoableBuffer::new(EditorRope::from_str(content), 100))
    }

    #[test]
    fn test_insert_moves_cursor() {
        let mut ed = editor("hello");
        let edit = ed.insert(5, " world").expect("in bounds");
        assert_eq!(ed.value(), "hello world");
        assert_eq!(edit.inserted_len, 6);
        assert_eq!(ed.cursor(), 11);
    }

    #[test]
    fn test_out_of_bounds_edit_is_refused() {
        let mut ed = editor("abc");
        assert!(ed.delete(2..9).is_none());
        assert!(ed.insert(4, "x").is_none());
        assert_eq!(ed.value(), "abc");
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_type_over_selection() {
        let mut ed = editor("hello world");
        ed.select(11, 6);
        assert_eq!(ed.selected_text().as_deref(), Some("world"));
        ed.type_text("there");
        assert_eq!(ed.value(), "hello there");
        assert!(ed.selection().is_none());
        assert_eq!(ed.cursor(), 11);
    }

    #[test]
    fn test_backspace() {
        let mut ed = editor("abc");
        ed.set_cursor(99);
        assert_eq!(ed.cursor(), 3);
        ed.backspace();
        assert_eq!(ed.value(), "ab");

        ed.select_all();
        ed.backspace();
        assert!(ed.is_empty());
        assert!(ed.backspace().is_none());
    }

    #[test]
    fn test_undo_clamps_cursor() {
        let mut ed = editor("hello");
        ed.insert(5, " world");
        assert!(ed.undo());
        assert_eq!(ed.value(), "hello");
        assert_eq!(ed.cursor(), 5);

        assert!(ed.redo());
        assert_eq!(ed.value(), "hello world");
        assert!(!ed.can_redo());
    }
}
