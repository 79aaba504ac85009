//! The document source: the single writable ground truth widgets splice into.
//!
//! Every mutation bumps a revision counter and is appended to a bounded edit
//! log, so holders of an offset taken at an older revision can map it forward.
//! Change listeners are the notification path the renderer uses to schedule a
//! re-render.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::Range;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::text::{EditorRope, TextBuffer};
use crate::types::EditInfo;
use crate::undo::{UndoManager, UndoableBuffer};

/// Edits kept for offset mapping. Older anchors fall back to rescanning.
const MAX_EDIT_LOG: usize = 256;

/// Shared handle to a document source.
///
/// The widget subsystem runs on one logical UI thread, so a `RefCell` is
/// enough. Listeners run while the document is mutably borrowed and must not
/// borrow it again.
pub type SharedSource = Rc<RefCell<SourceDocument>>;

/// Where a change came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Typed or pasted by the user, or applied by an outside collaborator.
    External,
    /// A widget controller rewrote or removed its marker.
    Widget,
    /// Undo or redo.
    History,
}

/// Notification sent to listeners after every change.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub revision: u64,
    /// `None` for changes that cannot be described as one splice (history moves, resets).
    pub edit: Option<EditInfo>,
    pub origin: ChangeOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent)>;

pub struct SourceDocument {
    buffer: UndoableBuffer<EditorRope>,
    revision: u64,
    log: VecDeque<(u64, EditInfo)>,
    /// Oldest revision whose subsequent edits are all still in `log`.
    log_floor: u64,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("revision", &self.revision)
            .field("len_chars", &self.buffer.len_chars())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for SourceDocument {
    fn default() -> Self {
        Self::new("")
    }
}

impl SourceDocument {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: UndoableBuffer::new(EditorRope::from_str(text), 200),
            revision: 0,
            log: VecDeque::new(),
            log_floor: 0,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Create a document already wrapped for sharing.
    pub fn shared(text: &str) -> SharedSource {
        Rc::new(RefCell::new(Self::new(text)))
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        self.buffer.slice(range)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace a char range with text.
    ///
    /// Returns `None` (and changes nothing) when the range is out of bounds.
    pub fn splice(&mut self, range: Range<usize>, text: &str, origin: ChangeOrigin) -> Option<EditInfo> {
        if range.start > range.end || range.end > self.buffer.len_chars() {
            tracing::warn!(
                target: "weft::source",
                ?range,
                len = self.buffer.len_chars(),
                "splice out of bounds, ignored"
            );
            return None;
        }
        if range.is_empty() && text.is_empty() {
            return None;
        }

        let start = range.start;
        let deleted_len = range.len();
        self.buffer.replace(range, text);
        let edit = EditInfo::new(start, deleted_len, text.chars().count(), self.buffer.len_chars());

        self.revision += 1;
        self.log.push_back((self.revision, edit));
        while self.log.len() > MAX_EDIT_LOG {
            if let Some((rev, _)) = self.log.pop_front() {
                self.log_floor = rev;
            }
        }

        self.emit(ChangeEvent {
            revision: self.revision,
            edit: Some(edit),
            origin,
        });
        Some(edit)
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Option<EditInfo> {
        self.splice(offset..offset, text, ChangeOrigin::External)
    }

    pub fn delete(&mut self, range: Range<usize>) -> Option<EditInfo> {
        self.splice(range, "", ChangeOrigin::External)
    }

    /// Replace the whole text, e.g. after reloading from disk.
    ///
    /// Offsets taken before a reset cannot be mapped and must be rediscovered.
    pub fn reset(&mut self, text: &str) {
        self.buffer = UndoableBuffer::new(EditorRope::from_str(text), 200);
        self.bump_unmapped(ChangeOrigin::External);
    }

    pub fn undo(&mut self) -> bool {
        let done = self.buffer.undo();
        if done {
            self.bump_unmapped(ChangeOrigin::History);
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.buffer.redo();
        if done {
            self.bump_unmapped(ChangeOrigin::History);
        }
        done
    }

    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }

    /// Edits applied after `revision`, oldest first.
    ///
    /// `None` when the log no longer covers that revision.
    pub fn edits_since(&self, revision: u64) -> Option<Vec<EditInfo>> {
        if revision < self.log_floor || revision > self.revision {
            return None;
        }
        Some(
            self.log
                .iter()
                .filter(|(rev, _)| *rev > revision)
                .map(|(_, edit)| *edit)
                .collect(),
        )
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        before != self.listeners.len()
    }

    fn bump_unmapped(&mut self, origin: ChangeOrigin) {
        self.revision += 1;
        self.log.clear();
        self.log_floor = self.revision;
        self.emit(ChangeEvent {
            revision: self.revision,
            edit: None,
            origin,
        });
    }

    fn emit(&mut self, event: ChangeEvent) {
        tracing::trace!(
            target: "weft::source",
            revision = event.revision,
            origin = ?event.origin,
            "source changed"
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_splice_bumps_revision_and_logs() {
        let mut doc = SourceDocument::new("hello world");
        assert_eq!(doc.revision(), 0);

        let edit = doc.splice(6..11, "rust", ChangeOrigin::Widget).expect("in bounds");
        assert_eq!(doc.text(), "hello rust");
        assert_eq!(doc.revision(), 1);
        assert_eq!(edit.deleted_len, 5);

        let edits = doc.edits_since(0).expect("covered");
        assert_eq!(edits, vec![edit]);
        assert_eq!(doc.edits_since(1), Some(vec![]));
        assert_eq!(doc.edits_since(2), None);
    }

    #[test]
    fn test_out_of_bounds_splice_is_ignored() {
        let mut doc = SourceDocument::new("abc");
        assert!(doc.splice(2..10, "x", ChangeOrigin::External).is_none());
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_empty_splice_is_noop() {
        let mut doc = SourceDocument::new("abc");
        assert!(doc.splice(1..1, "", ChangeOrigin::External).is_none());
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_listeners_receive_changes() {
        let mut doc = SourceDocument::new("abc");
        let seen = Rc::new(Cell::new(0u64));
        let seen_in = seen.clone();
        let id = doc.subscribe(move |event| seen_in.set(event.revision));

        doc.insert(3, "d");
        assert_eq!(seen.get(), 1);

        assert!(doc.unsubscribe(id));
        doc.insert(4, "e");
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_undo_invalidates_log() {
        let mut doc = SourceDocument::new("abc");
        doc.insert(3, "d");
        assert!(doc.undo());
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.revision(), 2);
        assert_eq!(doc.edits_since(0), None);
        assert_eq!(doc.edits_since(2), Some(vec![]));
    }

    #[test]
    fn test_log_is_bounded() {
        let mut doc = SourceDocument::new("");
        for _ in 0..(MAX_EDIT_LOG + 10) {
            doc.insert(0, "x");
        }
        assert_eq!(doc.edits_since(0), None);
        let recent = doc.edits_since(doc.revision() - 5).expect("recent edits covered");
        assert_eq!(recent.len(), 5);
    }
}
