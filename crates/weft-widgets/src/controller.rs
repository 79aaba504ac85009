//! Per-mount handle for rewriting or removing a widget's own marker.
//!
//! The document source is the only ground truth. A controller remembers
//! where its marker was (char range, marker text, revision) and re-resolves
//! that position before every write: first by mapping the range through the
//! edits logged since. An edit that deleted the whole span detaches the
//! controller; one that only changed text inside it is accepted when a marker
//! of the same type still starts at the mapped position. When the log no
//! longer reaches back far enough (undo, reset) the controller rescans for
//! identical marker text closest to where it was. A detached controller's
//! writes are logged no-ops.

use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::rc::{Rc, Weak};

use smol_str::SmolStr;
use weft_editor_core::{ChangeOrigin, EditInfo, SharedSource, SourceDocument};

use crate::attrs::Attributes;
use crate::error::WidgetError;
use crate::marker::{self, WidgetMarker};
use crate::mount::MountSlot;

/// What a controller write did to the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpliceOutcome {
    /// The marker was rewritten or removed.
    Applied,
    /// The requested change matched what is already there.
    Unchanged,
    /// The marker is gone (removed, or edited away by someone else).
    Detached,
}

#[derive(Debug, Clone)]
struct Anchor {
    range: Range<usize>,
    text: SmolStr,
    revision: u64,
}

struct ControllerInner {
    source: SharedSource,
    widget_type: SmolStr,
    anchor: RefCell<Anchor>,
    removed: Cell<bool>,
    mount: RefCell<Weak<MountSlot>>,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WidgetController {
    inner: Rc<ControllerInner>,
}

impl std::fmt::Debug for WidgetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetController")
            .field("widget_type", &self.inner.widget_type)
            .field("anchor", &*self.inner.anchor.borrow())
            .field("removed", &self.inner.removed.get())
            .finish()
    }
}

impl WidgetController {
    /// Bind to a marker found in `source` at its current revision.
    pub fn new(source: SharedSource, marker: &WidgetMarker, revision: u64) -> Self {
        Self {
            inner: Rc::new(ControllerInner {
                source,
                widget_type: marker.widget_type.clone(),
                anchor: RefCell::new(Anchor {
                    range: marker.range.clone(),
                    text: marker.raw.clone(),
                    revision,
                }),
                removed: Cell::new(false),
                mount: RefCell::new(Weak::new()),
            }),
        }
    }

    /// Link the mount this controller belongs to, so `remove_self` can
    /// dispose it.
    pub fn attach(&self, slot: &Rc<MountSlot>) {
        *self.inner.mount.borrow_mut() = Rc::downgrade(slot);
    }

    pub fn widget_type(&self) -> &SmolStr {
        &self.inner.widget_type
    }

    pub fn is_removed(&self) -> bool {
        self.inner.removed.get()
    }

    /// Current char range of the marker, if it can still be found.
    pub fn range(&self) -> Option<Range<usize>> {
        if self.is_removed() {
            return None;
        }
        let doc = self.inner.source.borrow();
        self.resolve(&doc)
    }

    /// Marker text as last seen.
    pub fn marker_text(&self) -> SmolStr {
        self.inner.anchor.borrow().text.clone()
    }

    /// Attributes as currently written in the source.
    pub fn attributes(&self) -> Option<Attributes> {
        let range = self.range()?;
        let doc = self.inner.source.borrow();
        let text = doc.slice(range)?;
        WidgetMarker::parse(&text).map(|m| m.attributes)
    }

    /// Merge `partial` into the marker's attributes and rewrite it.
    ///
    /// Existing attributes are re-read from the source first, so concurrent
    /// edits to other keys survive. The whole call is refused if any key is
    /// invalid; nothing is written in that case.
    pub fn set_attributes(&self, partial: &Attributes) -> Result<SpliceOutcome, WidgetError> {
        if let Some(key) = partial.first_invalid_key() {
            tracing::warn!(
                target: "weft::widget",
                widget_type = %self.inner.widget_type,
                %key,
                "refusing attribute update with invalid key"
            );
            return Err(WidgetError::InvalidAttributeKey(key.clone()));
        }
        if self.is_removed() {
            tracing::debug!(target: "weft::widget", widget_type = %self.inner.widget_type, "set_attributes on removed widget");
            return Ok(SpliceOutcome::Detached);
        }
        if partial.is_empty() {
            return Ok(SpliceOutcome::Unchanged);
        }

        let mut doc = self.inner.source.borrow_mut();
        let Some(range) = self.resolve(&doc) else {
            tracing::warn!(
                target: "weft::widget",
                widget_type = %self.inner.widget_type,
                "marker no longer in source, attribute update dropped"
            );
            return Ok(SpliceOutcome::Detached);
        };

        let current = doc
            .slice(range.clone())
            .and_then(|text| WidgetMarker::parse(&text))
            .map(|m| m.attributes)
            .unwrap_or_default();
        let merged = current.merged(partial);
        if merged == current {
            return Ok(SpliceOutcome::Unchanged);
        }

        let text = marker::format_marker(&self.inner.widget_type, &merged);
        if doc.splice(range.clone(), &text, ChangeOrigin::Widget).is_none() {
            return Ok(SpliceOutcome::Detached);
        }
        let new_len = text.chars().count();
        *self.inner.anchor.borrow_mut() = Anchor {
            range: range.start..range.start + new_len,
            text: text.into(),
            revision: doc.revision(),
        };
        tracing::debug!(
            target: "weft::widget",
            widget_type = %self.inner.widget_type,
            keys = partial.len(),
            "marker attributes rewritten"
        );
        Ok(SpliceOutcome::Applied)
    }

    /// Convenience for a single key.
    pub fn set_attribute(&self, key: &str, value: impl Into<String>) -> Result<SpliceOutcome, WidgetError> {
        let partial: Attributes = [(key, value.into())].into_iter().collect();
        self.set_attributes(&partial)
    }

    /// Delete the marker from the source and dispose the mount.
    ///
    /// Idempotent. Once called, later writes through this controller are
    /// no-ops.
    pub fn remove_self(&self) -> SpliceOutcome {
        if self.inner.removed.replace(true) {
            return SpliceOutcome::Unchanged;
        }

        let outcome = {
            let mut doc = self.inner.source.borrow_mut();
            match self.resolve(&doc) {
                Some(range) => match doc.splice(range, "", ChangeOrigin::Widget) {
                    Some(_) => SpliceOutcome::Applied,
                    None => SpliceOutcome::Detached,
                },
                None => {
                    tracing::warn!(
                        target: "weft::widget",
                        widget_type = %self.inner.widget_type,
                        "marker already gone from source"
                    );
                    SpliceOutcome::Detached
                }
            }
        };

        let slot = self.inner.mount.borrow().upgrade();
        if let Some(slot) = slot {
            slot.dispose();
        }
        tracing::debug!(target: "weft::widget", widget_type = %self.inner.widget_type, ?outcome, "widget removed");
        outcome
    }

    /// Where the marker is now, updating the anchor if it moved.
    fn resolve(&self, doc: &SourceDocument) -> Option<Range<usize>> {
        let anchor = self.inner.anchor.borrow().clone();
        if anchor.revision == doc.revision() {
            return self.verify(doc, anchor.range.clone(), &anchor);
        }

        let Some(edits) = doc.edits_since(anchor.revision) else {
            return self.rescan(doc, &anchor);
        };
        match track(anchor.range.clone(), &edits) {
            Tracked::Intact(range) => self.verify(doc, range, &anchor),
            Tracked::Touched(start) => self.rewritten_at(doc, start),
            Tracked::Deleted => {
                tracing::trace!(target: "weft::widget", range = ?anchor.range, "marker span deleted");
                None
            }
        }
    }

    fn verify(&self, doc: &SourceDocument, range: Range<usize>, anchor: &Anchor) -> Option<Range<usize>> {
        if doc.slice(range.clone()).is_some_and(|text| text == anchor.text) {
            self.remember(range.clone(), anchor.text.clone(), doc.revision());
            Some(range)
        } else {
            None
        }
    }

    /// An edit landed inside the marker: accept it only if what now starts
    /// at the same place is still a marker of our type.
    fn rewritten_at(&self, doc: &SourceDocument, start: usize) -> Option<Range<usize>> {
        let found = marker::scan(&doc.text())
            .into_iter()
            .find(|m| m.range.start == start && m.widget_type == self.inner.widget_type)?;
        self.remember(found.range.clone(), found.raw.clone(), doc.revision());
        Some(found.range)
    }

    /// Without an edit log (history moves, resets) fall back to the nearest
    /// identical marker text, or a same-type marker starting where ours did.
    fn rescan(&self, doc: &SourceDocument, anchor: &Anchor) -> Option<Range<usize>> {
        let markers = marker::scan(&doc.text());
        let found = markers
            .iter()
            .filter(|m| m.raw == anchor.text)
            .min_by_key(|m| m.range.start.abs_diff(anchor.range.start))
            .or_else(|| {
                markers
                    .iter()
                    .find(|m| m.range.start == anchor.range.start && m.widget_type == self.inner.widget_type)
            })?;
        tracing::trace!(
            target: "weft::widget",
            from = anchor.range.start,
            to = found.range.start,
            "marker re-found by rescan"
        );
        self.remember(found.range.clone(), found.raw.clone(), doc.revision());
        Some(found.range.clone())
    }

    fn remember(&self, range: Range<usize>, text: SmolStr, revision: u64) {
        *self.inner.anchor.borrow_mut() = Anchor { range, text, revision };
    }
}

/// Where a marker range ended up after a run of logged edits.
#[derive(Debug, PartialEq, Eq)]
enum Tracked {
    /// No edit touched it.
    Intact(Range<usize>),
    /// An edit changed text inside it; the marker, if any, starts here.
    Touched(usize),
    /// An edit removed the whole span.
    Deleted,
}

fn track(range: Range<usize>, edits: &[EditInfo]) -> Tracked {
    let mut state = Tracked::Intact(range);
    for edit in edits {
        state = match state {
            Tracked::Intact(range) => match edit.map_range(range.clone()) {
                Some(mapped) => Tracked::Intact(mapped),
                None if edit.covers(&range) => Tracked::Deleted,
                None => Tracked::Touched(range.start.min(edit.edit_char_pos)),
            },
            Tracked::Touched(start) => Tracked::Touched(edit.map_offset(start)),
            Tracked::Deleted => return Tracked::Deleted,
        };
    }
    state
}

/// Insert a new marker at `offset`.
///
/// Returns the char range of the inserted marker, or `OffsetOutOfBounds`
/// past the end of the document.
pub fn insert_marker(
    source: &SharedSource,
    offset: usize,
    widget_type: &str,
    attributes: &Attributes,
) -> Result<Range<usize>, WidgetError> {
    if !marker::is_valid_type(widget_type) {
        return Err(WidgetError::InvalidWidgetType(widget_type.into()));
    }
    if let Some(key) = attributes.first_invalid_key() {
        return Err(WidgetError::InvalidAttributeKey(key.clone()));
    }
    let mut doc = source.borrow_mut();
    let len = doc.len_chars();
    if offset > len {
        return Err(WidgetError::OffsetOutOfBounds { offset, len });
    }
    let text = marker::format_marker(widget_type, attributes);
    doc.splice(offset..offset, &text, ChangeOrigin::Widget);
    tracing::debug!(target: "weft::widget", widget_type, offset, "marker inserted");
    Ok(offset..offset + text.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_editor_core::SourceDocument;

    fn bind(source: &SharedSource, index: usize) -> WidgetController {
        let doc = source.borrow();
        let markers = marker::scan(&doc.text());
        WidgetController::new(source.clone(), &markers[index], doc.revision())
    }

    fn text(source: &SharedSource) -> String {
        source.borrow().text()
    }

    #[test]
    fn test_set_attributes_rewrites_marker() {
        let source = SourceDocument::shared("Intro\n@[github_gist]()\nOutro");
        let controller = bind(&source, 0);
        let outcome = controller
            .set_attribute("url", "https://gist.github.com/u/abc")
            .expect("valid key");
        assert_eq!(outcome, SpliceOutcome::Applied);
        assert_eq!(
            text(&source),
            "Intro\n@[github_gist](url=\"https://gist.github.com/u/abc\")\nOutro"
        );
    }

    #[test]
    fn test_empty_partial_is_noop() {
        let source = SourceDocument::shared("@[a](x=\"1\")");
        let controller = bind(&source, 0);
        let before = source.borrow().revision();
        assert_eq!(controller.set_attributes(&Attributes::new()), Ok(SpliceOutcome::Unchanged));
        assert_eq!(source.borrow().revision(), before);
    }

    #[test]
    fn test_unchanged_values_are_noop() {
        let source = SourceDocument::shared("@[a](x=\"1\")");
        let controller = bind(&source, 0);
        assert_eq!(controller.set_attribute("x", "1"), Ok(SpliceOutcome::Unchanged));
        assert_eq!(source.borrow().revision(), 0);
    }

    #[test]
    fn test_invalid_key_refuses_whole_call() {
        let source = SourceDocument::shared("@[a](x=\"1\")");
        let controller = bind(&source, 0);
        let partial: Attributes = [("y", "2"), ("bad key", "3")].into_iter().collect();
        assert_eq!(
            controller.set_attributes(&partial),
            Err(WidgetError::InvalidAttributeKey("bad key".into()))
        );
        assert_eq!(text(&source), "@[a](x=\"1\")");
    }

    #[test]
    fn test_merge_preserves_concurrent_edit() {
        let source = SourceDocument::shared("@[a](x=\"1\")");
        let controller = bind(&source, 0);
        // Someone else rewrites the marker in place with an extra key.
        source.borrow_mut().reset("@[a](x=\"1\" z=\"9\")");
        assert_eq!(controller.set_attribute("y", "2"), Ok(SpliceOutcome::Applied));
        assert_eq!(text(&source), "@[a](x=\"1\" z=\"9\" y=\"2\")");
    }

    #[test]
    fn test_tracks_marker_through_edits_before_it() {
        let source = SourceDocument::shared("abc @[a](x=\"1\") def");
        let controller = bind(&source, 0);
        source.borrow_mut().insert(0, "0123456789 ");
        let end = source.borrow().len_chars();
        source.borrow_mut().insert(end, " tail");
        assert_eq!(controller.range(), Some(15..26));
        controller.set_attribute("x", "2").expect("valid");
        assert_eq!(text(&source), "0123456789 abc @[a](x=\"2\") def tail");
    }

    #[test]
    fn test_rescan_after_history_move() {
        let source = SourceDocument::shared("@[a](x=\"1\")");
        let controller = bind(&source, 0);
        source.borrow_mut().insert(0, "hello ");
        source.borrow_mut().undo();
        source.borrow_mut().insert(0, "> ");
        assert_eq!(controller.range(), Some(2..13));
    }

    #[test]
    fn test_rescan_picks_nearest_identical_marker() {
        let source = SourceDocument::shared("@[a]() mid @[a]() end");
        let second = bind(&source, 1);
        source.borrow_mut().reset("@[a]() mid @[a]() end");
        let range = second.range().expect("found");
        assert_eq!(range.start, 11);
    }

    #[test]
    fn test_remove_self_is_idempotent() {
        let source = SourceDocument::shared("a @[x]() b");
        let controller = bind(&source, 0);
        assert_eq!(controller.remove_self(), SpliceOutcome::Applied);
        assert_eq!(text(&source), "a  b");
        let revision = source.borrow().revision();
        assert_eq!(controller.remove_self(), SpliceOutcome::Unchanged);
        assert_eq!(source.borrow().revision(), revision);
        assert!(controller.is_removed());
        assert_eq!(controller.set_attribute("k", "v"), Ok(SpliceOutcome::Detached));
    }

    #[test]
    fn test_remove_when_marker_already_deleted() {
        let source = SourceDocument::shared("a @[x]() b");
        let controller = bind(&source, 0);
        source.borrow_mut().delete(2..8);
        assert_eq!(controller.remove_self(), SpliceOutcome::Detached);
        assert_eq!(text(&source), "a  b");
    }

    #[test]
    fn test_deleted_marker_does_not_remove_identical_neighbour() {
        let source = SourceDocument::shared("@[g](url=\"1\")@[g](url=\"2\")");
        let first = bind(&source, 0);
        source.borrow_mut().delete(0..13);
        assert_eq!(text(&source), "@[g](url=\"2\")");

        assert_eq!(first.remove_self(), SpliceOutcome::Detached);
        assert_eq!(text(&source), "@[g](url=\"2\")");
    }

    #[test]
    fn test_deleted_marker_does_not_rewrite_same_type_neighbour() {
        let source = SourceDocument::shared("a @[g]() b @[g]() c");
        let second = bind(&source, 1);
        source.borrow_mut().delete(11..17);
        assert_eq!(text(&source), "a @[g]() b  c");

        assert_eq!(second.range(), None);
        assert_eq!(second.set_attribute("url", "x"), Ok(SpliceOutcome::Detached));
        assert_eq!(text(&source), "a @[g]() b  c");
    }

    #[test]
    fn test_deletion_wider_than_marker_detaches() {
        let source = SourceDocument::shared("x @[g]() y @[g]() z");
        let first = bind(&source, 0);
        source.borrow_mut().delete(0..10);
        assert_eq!(first.remove_self(), SpliceOutcome::Detached);
        assert_eq!(text(&source), " @[g]() z");
    }

    #[test]
    fn test_edit_inside_marker_keeps_binding() {
        let source = SourceDocument::shared("a @[x](k=\"v\") @[x](k=\"w\")");
        let controller = bind(&source, 0);
        // The user retypes the value by hand.
        source.borrow_mut().splice(10..11, "q", ChangeOrigin::External);
        source.borrow_mut().insert(0, ">> ");
        assert_eq!(controller.range(), Some(5..16));
        assert_eq!(controller.set_attribute("n", "1"), Ok(SpliceOutcome::Applied));
        assert_eq!(text(&source), ">> a @[x](k=\"q\" n=\"1\") @[x](k=\"w\")");
    }

    #[test]
    fn test_track_through_edits() {
        let edits = [EditInfo::new(0, 0, 3, 0), EditInfo::new(20, 0, 1, 0)];
        assert_eq!(track(5..10, &edits), Tracked::Intact(8..13));

        let edits = [EditInfo::new(7, 1, 1, 0), EditInfo::new(0, 2, 0, 0)];
        assert_eq!(track(5..10, &edits), Tracked::Touched(3));

        let edits = [EditInfo::new(5, 5, 0, 0), EditInfo::new(0, 0, 9, 0)];
        assert_eq!(track(5..10, &edits), Tracked::Deleted);
    }

    #[test]
    fn test_edit_overlapping_marker_detaches() {
        let source = SourceDocument::shared("a @[x](k=\"v\") b");
        let controller = bind(&source, 0);
        source.borrow_mut().splice(6..8, "Q", ChangeOrigin::External);
        assert_eq!(controller.range(), None);
        assert_eq!(controller.set_attribute("k", "w"), Ok(SpliceOutcome::Detached));
    }

    #[test]
    fn test_attributes_reads_source() {
        let source = SourceDocument::shared("@[x](k=\"v\")");
        let controller = bind(&source, 0);
        assert_eq!(controller.attributes().and_then(|a| a.get("k").map(String::from)), Some("v".into()));
    }

    #[test]
    fn test_insert_marker() {
        let source = SourceDocument::shared("ab");
        let attrs: Attributes = [("id", "w1")].into_iter().collect();
        let range = insert_marker(&source, 1, "cloud_widget", &attrs).expect("insert");
        assert_eq!(text(&source), "a@[cloud_widget](id=\"w1\")b");
        assert_eq!(range, 1..25);

        assert!(matches!(
            insert_marker(&source, 99, "x", &Attributes::new()),
            Err(WidgetError::OffsetOutOfBounds { .. })
        ));
        assert!(matches!(
            insert_marker(&source, 0, "bad type", &Attributes::new()),
            Err(WidgetError::InvalidWidgetType(_))
        ));
    }
}
