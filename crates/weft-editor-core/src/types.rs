//! Selections and edit records, in char offsets.

use std::ops::Range;

/// Anchor is where the selection started, head is where the cursor is.
/// Either may come first; use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// One splice applied to a buffer, in char offsets.
///
/// Used to map offsets that were taken before the edit onto the text after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditInfo {
    pub edit_char_pos: usize,
    pub inserted_len: usize,
    pub deleted_len: usize,
    /// Document length after this edit was applied.
    pub doc_len_after: usize,
}

impl EditInfo {
    pub fn new(edit_char_pos: usize, deleted_len: usize, inserted_len: usize, doc_len_after: usize) -> Self {
        Self {
            edit_char_pos,
            inserted_len,
            deleted_len,
            doc_len_after,
        }
    }

    /// Range of text replaced by this edit, in pre-edit offsets.
    pub fn deleted_range(&self) -> Range<usize> {
        self.edit_char_pos..self.edit_char_pos + self.deleted_len
    }

    /// Signed change in document length.
    pub fn delta(&self) -> isize {
        self.inserted_len as isize - self.deleted_len as isize
    }

    /// Map a pre-edit range onto the post-edit text.
    ///
    /// Returns `None` when the edit touched the range itself, in which case
    /// the caller has to rediscover it. Inserting exactly at the range start
    /// shifts the range; inserting exactly at its end leaves it alone.
    pub fn map_range(&self, range: Range<usize>) -> Option<Range<usize>> {
        let deleted = self.deleted_range();
        if deleted.end <= range.start {
            let start = apply_delta(range.start, self.delta());
            let end = apply_delta(range.end, self.delta());
            return Some(start..end);
        }
        if deleted.start >= range.end {
            return Some(range);
        }
        None
    }

    /// True when this edit deleted every char of a non-empty `range`.
    pub fn covers(&self, range: &Range<usize>) -> bool {
        let deleted = self.deleted_range();
        !range.is_empty() && deleted.start <= range.start && deleted.end >= range.end
    }

    /// Map a single pre-edit offset. An offset inside the deleted text
    /// collapses to the start of the edit.
    pub fn map_offset(&self, offset: usize) -> usize {
        let deleted = self.deleted_range();
        if deleted.end <= offset {
            apply_delta(offset, self.delta())
        } else if deleted.start >= offset {
            offset
        } else {
            deleted.start
        }
    }
}

/// Apply a signed delta to a usize, saturating at 0 on underflow.
pub fn apply_delta(val: usize, delta: isize) -> usize {
    if delta >= 0 {
        val.saturating_add(delta as usize)
    } else {
        val.saturating_sub(delta.unsigned_abs())
    }
}
