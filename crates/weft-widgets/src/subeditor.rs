//! Nested editors used inside widget dialogs.
//!
//! A sub-editor is created when a dialog opens and destroyed when it closes.
//! The pool hands out host ids and tracks which are live, so a host can drop
//! the matching element and tests can check nothing leaks.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use smol_str::SmolStr;
use weft_editor_core::{EditorRope, PlainEditor, UndoableBuffer};

/// Keystrokes closer together than this undo as one step.
const TYPING_GROUP_WINDOW: Duration = Duration::from_millis(750);

/// Identifies the host element a sub-editor is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weft-subeditor-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    next: u64,
    live: BTreeSet<HostId>,
}

#[derive(Clone, Debug, Default)]
pub struct SubEditorPool {
    inner: Rc<RefCell<PoolInner>>,
}

impl SubEditorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sub-editor seeded with `text`.
    pub fn open(&self, text: &str, editor_theme: impl Into<SmolStr>) -> SubEditor {
        let host = {
            let mut inner = self.inner.borrow_mut();
            inner.next += 1;
            let host = HostId(inner.next);
            inner.live.insert(host);
            host
        };
        let mut editor = PlainEditor::new(
            UndoableBuffer::new(EditorRope::from_str(text), 100).with_typing_groups(TYPING_GROUP_WINDOW),
        );
        editor.set_cursor(editor.len_chars());
        tracing::debug!(target: "weft::subeditor", %host, "sub-editor opened");
        SubEditor {
            host: Some(host),
            editor,
            theme: editor_theme.into(),
            pool: self.clone(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner.borrow().live.len()
    }

    pub fn is_live(&self, host: HostId) -> bool {
        self.inner.borrow().live.contains(&host)
    }

    fn release(&self, host: HostId) {
        if self.inner.borrow_mut().live.remove(&host) {
            tracing::debug!(target: "weft::subeditor", %host, "sub-editor destroyed");
        }
    }
}

pub type SubEditorBuffer = UndoableBuffer<EditorRope>;

/// An embedded editor instance. Dropping it destroys it.
pub struct SubEditor {
    host: Option<HostId>,
    editor: PlainEditor<SubEditorBuffer>,
    theme: SmolStr,
    pool: SubEditorPool,
}

impl fmt::Debug for SubEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubEditor")
            .field("host", &self.host)
            .field("len_chars", &self.editor.len_chars())
            .field("theme", &self.theme)
            .finish()
    }
}

impl SubEditor {
    /// Host element id. `None` once destroyed.
    pub fn host(&self) -> Option<HostId> {
        self.host
    }

    pub fn theme(&self) -> &SmolStr {
        &self.theme
    }

    pub fn value(&self) -> String {
        self.editor.value()
    }

    /// Replace the whole content, as a paste over a full selection would.
    pub fn set_value(&mut self, text: &str) {
        self.editor.select_all();
        self.editor.type_text(text);
    }

    pub fn editor(&self) -> &PlainEditor<SubEditorBuffer> {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut PlainEditor<SubEditorBuffer> {
        &mut self.editor
    }

    /// Destroy the editor and clear its host reference.
    pub fn destroy(&mut self) {
        if let Some(host) = self.host.take() {
            self.pool.release(host);
        }
    }
}

impl Drop for SubEditor {
    fn drop(&mut self) {
        self.destroy();
    }
}
