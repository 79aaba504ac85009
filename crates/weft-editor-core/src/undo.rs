//! Undo history over any [`TextBuffer`].
//!
//! Each recorded step stores the text it removed and the text it put back, so
//! undo and redo are a single `replace` either way. Sub-editors turn on typing
//! groups: a run of adjacent insertions made in quick succession undoes as
//! one step.

use std::collections::VecDeque;
use std::ops::Range;
use std::time::Duration;

use smol_str::SmolStr;
use web_time::Instant;

use crate::text::TextBuffer;

pub trait UndoManager {
    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Returns `false` if there was nothing to undo.
    fn undo(&mut self) -> bool;

    /// Returns `false` if there was nothing to redo.
    fn redo(&mut self) -> bool;
}

#[derive(Debug, Clone)]
struct Step {
    pos: usize,
    removed: SmolStr,
    added: String,
    at: Instant,
}

impl Step {
    fn added_chars(&self) -> usize {
        self.added.chars().count()
    }

    fn removed_chars(&self) -> usize {
        self.removed.chars().count()
    }
}

#[derive(Clone)]
pub struct UndoableBuffer<T> {
    buffer: T,
    undo_stack: VecDeque<Step>,
    redo_stack: Vec<Step>,
    max_steps: usize,
    /// Merge window for typing groups; `None` records every edit separately.
    group_window: Option<Duration>,
}

impl<T: TextBuffer + Default> Default for UndoableBuffer<T> {
    fn default() -> Self {
        Self::new(T::default(), 100)
    }
}

impl<T: TextBuffer> UndoableBuffer<T> {
    pub fn new(buffer: T, max_steps: usize) -> Self {
        Self {
            buffer,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_steps,
            group_window: None,
        }
    }

    /// Merge adjacent insertions made less than `window` apart.
    pub fn with_typing_groups(mut self, window: Duration) -> Self {
        self.group_window = Some(window);
        self
    }

    pub fn inner(&self) -> &T {
        &self.buffer
    }

    pub fn history_len(&self) -> usize {
        self.undo_stack.len()
    }

    fn record(&mut self, pos: usize, removed: SmolStr, added: &str) {
        self.redo_stack.clear();
        let now = Instant::now();
        if removed.is_empty() && self.extends_group(pos, added, now) {
            if let Some(last) = self.undo_stack.back_mut() {
                last.added.push_str(added);
                last.at = now;
                return;
            }
        }
        self.undo_stack.push_back(Step {
            pos,
            removed,
            added: added.to_owned(),
            at: now,
        });
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.pop_front();
        }
    }

    /// A pure insertion continues the last step if it lands right after the
    /// text that step added, within the window, on the same line.
    fn extends_group(&self, pos: usize, added: &str, now: Instant) -> bool {
        let (Some(window), Some(last)) = (self.group_window, self.undo_stack.back()) else {
            return false;
        };
        last.removed.is_empty()
            && !added.contains('\n')
            && last.pos + last.added_chars() == pos
            && now.duration_since(last.at) <= window
    }

    fn removed_text(&self, range: &Range<usize>) -> SmolStr {
        self.buffer.slice(range.clone()).unwrap_or_default()
    }
}

impl<T: TextBuffer> TextBuffer for UndoableBuffer<T> {
    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.record(char_offset, SmolStr::default(), text);
        self.buffer.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let removed = self.removed_text(&char_range);
        self.record(char_range.start, removed, "");
        self.buffer.delete(char_range);
    }

    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        let removed = self.removed_text(&char_range);
        self.record(char_range.start, removed, text);
        self.buffer.replace(char_range, text);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        self.buffer.slice(char_range)
    }

    fn to_string(&self) -> String {
        self.buffer.to_string()
    }
}

impl<T: TextBuffer> UndoManager for UndoableBuffer<T> {
    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn undo(&mut self) -> bool {
        let Some(step) = self.undo_stack.pop_back() else {
            return false;
        };
        self.buffer
            .replace(step.pos..step.pos + step.added_chars(), &step.removed);
        self.redo_stack.push(step);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(step) = self.redo_stack.pop() else {
            return false;
        };
        self.buffer
            .replace(step.pos..step.pos + step.removed_chars(), &step.added);
        self.undo_stack.push_back(step);
        true
    }
}
