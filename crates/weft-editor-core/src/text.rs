//! Rope storage shared by the document source and the widget sub-editors.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Editable text addressed by char offsets.
///
/// Offsets count Unicode scalar values, never bytes.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    fn insert(&mut self, char_offset: usize, text: &str);

    fn delete(&mut self, char_range: Range<usize>);

    /// Delete then insert, as one operation where the buffer supports it.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// `None` if the range is reversed or past the end.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    fn to_string(&self) -> String;
}

/// `ropey`-backed buffer.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    fn in_bounds(&self, char_range: &Range<usize>) -> bool {
        char_range.start <= char_range.end && char_range.end <= self.rope.len_chars()
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        let start = char_range.start;
        if !char_range.is_empty() {
            self.rope.remove(char_range);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if !self.in_bounds(&char_range) {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}
