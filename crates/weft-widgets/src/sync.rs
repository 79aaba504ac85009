//! Local view of a remotely stored widget, kept in step with the store.
//!
//! Updates are optimistic: confirming an edit writes the new values into the
//! snapshot cache at once and only then sends the mutation. A failed mutation
//! raises one error notification and leaves the optimistic values in place;
//! there is no rollback and no version check, so when two saves race the one
//! that resolves last decides the final phase.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use smol_str::SmolStr;
use weft_editor_core::SharedSource;

use crate::attrs::Attributes;
use crate::controller::{self, WidgetController};
use crate::error::WidgetError;
use crate::labels::keys;
use crate::marker;
use crate::mount::{Effects, WidgetContext};
use crate::notify::Notification;
use crate::store::{NewWidget, PersistedWidget, WidgetFields};
use crate::subeditor::{HostId, SubEditor};
use crate::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Viewing,
    Editing,
    Saving,
    /// The last mutation failed. Renders like `Viewing`.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Loading,
    Ready,
    /// The store has no such widget, or could not be asked.
    Unavailable,
}

/// Host-scoped snapshots keyed by widget id.
///
/// Outlives individual mounts, so optimistic values survive a re-render.
#[derive(Clone, Debug, Default)]
pub struct SnapshotCache {
    inner: Rc<RefCell<HashMap<SmolStr, PersistedWidget>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<PersistedWidget> {
        self.inner.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.borrow().contains_key(id)
    }

    pub fn insert(&self, widget: PersistedWidget) {
        self.inner.borrow_mut().insert(widget.id.clone(), widget);
    }

    /// Insert unless a (possibly optimistic) snapshot is already present.
    pub fn insert_if_absent(&self, widget: PersistedWidget) {
        self.inner
            .borrow_mut()
            .entry(widget.id.clone())
            .or_insert(widget);
    }

    pub fn apply(&self, id: &str, fields: WidgetFields) -> bool {
        match self.inner.borrow_mut().get_mut(id) {
            Some(widget) => {
                widget.apply(fields);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<PersistedWidget> {
        self.inner.borrow_mut().remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

/// Buffered edits while the dialog is open.
#[derive(Debug)]
pub struct EditDialog {
    pub editor: SubEditor,
    pub source_field: String,
}

#[derive(Debug)]
struct SyncState {
    phase: SyncPhase,
    availability: Availability,
    in_flight: usize,
    last_failed: bool,
    dialog: Option<EditDialog>,
}

impl SyncState {
    /// Phase to show when no dialog is open.
    fn resting(&self) -> SyncPhase {
        if self.in_flight > 0 {
            SyncPhase::Saving
        } else if self.last_failed {
            SyncPhase::Failed
        } else {
            SyncPhase::Viewing
        }
    }
}

/// Sync state for one mounted persisted widget. Clones share state.
#[derive(Clone)]
pub struct PersistedWidgetSync {
    id: SmolStr,
    ctx: WidgetContext,
    state: Rc<RefCell<SyncState>>,
}

impl std::fmt::Debug for PersistedWidgetSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedWidgetSync")
            .field("id", &self.id)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl PersistedWidgetSync {
    pub fn new(id: impl Into<SmolStr>, ctx: WidgetContext) -> Self {
        let id = id.into();
        let availability = if ctx.snapshots.contains(&id) {
            Availability::Ready
        } else {
            Availability::Loading
        };
        Self {
            id,
            ctx,
            state: Rc::new(RefCell::new(SyncState {
                phase: SyncPhase::Viewing,
                availability,
                in_flight: 0,
                last_failed: false,
                dialog: None,
            })),
        }
    }

    pub fn id(&self) -> &SmolStr {
        &self.id
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.borrow().phase
    }

    pub fn availability(&self) -> Availability {
        self.state.borrow().availability
    }

    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight
    }

    /// Last known values, optimistic edits included.
    pub fn snapshot(&self) -> Option<PersistedWidget> {
        self.ctx.snapshots.get(&self.id)
    }

    pub fn is_editing(&self) -> bool {
        self.state.borrow().dialog.is_some()
    }

    /// Buffered description and source while editing.
    pub fn dialog_values(&self) -> Option<(String, String)> {
        self.state
            .borrow()
            .dialog
            .as_ref()
            .map(|d| (d.editor.value(), d.source_field.clone()))
    }

    pub fn editor_host(&self) -> Option<(HostId, SmolStr)> {
        let state = self.state.borrow();
        let editor = &state.dialog.as_ref()?.editor;
        Some((editor.host()?, editor.theme().clone()))
    }

    /// Fetch the snapshot unless the cache already has it.
    pub fn load(&self) -> Effects {
        if self.ctx.snapshots.contains(&self.id) {
            self.state.borrow_mut().availability = Availability::Ready;
            return Effects::none();
        }
        self.state.borrow_mut().availability = Availability::Loading;

        let id = self.id.clone();
        let ctx = self.ctx.clone();
        let state = self.state.clone();
        Effects::one(async move {
            let result = ctx.store.get(&id).await;
            let availability = match result {
                Ok(Some(widget)) => {
                    ctx.snapshots.insert_if_absent(widget);
                    Availability::Ready
                }
                Ok(None) => {
                    tracing::debug!(target: "weft::sync", widget_id = %id, "widget not found in store");
                    Availability::Unavailable
                }
                Err(error) => {
                    tracing::error!(target: "weft::sync", widget_id = %id, %error, "failed to load widget");
                    ctx.notifier
                        .notify(Notification::error(ctx.label(keys::FAILED_TO_LOAD)));
                    Availability::Unavailable
                }
            };
            // Another mount may have filled the cache meanwhile.
            state.borrow_mut().availability = if ctx.snapshots.contains(&id) {
                Availability::Ready
            } else {
                availability
            };
        })
    }

    /// Open the edit dialog, seeded from the snapshot.
    pub fn begin_edit(&self, theme: &Theme, is_preview: bool) -> Result<(), WidgetError> {
        let snapshot = self
            .snapshot()
            .ok_or_else(|| WidgetError::Unavailable(self.id.clone()))?;
        if is_preview || !snapshot.can_configure {
            return Err(WidgetError::NotConfigurable(self.id.clone()));
        }
        let mut state = self.state.borrow_mut();
        if state.dialog.is_some() {
            return Ok(());
        }
        state.dialog = Some(EditDialog {
            editor: self
                .ctx
                .sub_editors
                .open(&snapshot.description, theme.editor_theme.clone()),
            source_field: snapshot.source.unwrap_or_default(),
        });
        state.phase = SyncPhase::Editing;
        tracing::debug!(target: "weft::sync", widget_id = %self.id, "edit dialog opened");
        Ok(())
    }

    pub fn set_source_field(&self, value: impl Into<String>) {
        if let Some(dialog) = self.state.borrow_mut().dialog.as_mut() {
            dialog.source_field = value.into();
        }
    }

    pub fn set_description(&self, value: &str) {
        if let Some(dialog) = self.state.borrow_mut().dialog.as_mut() {
            dialog.editor.set_value(value);
        }
    }

    /// Run `f` against the open sub-editor.
    pub fn with_editor<R>(&self, f: impl FnOnce(&mut SubEditor) -> R) -> Option<R> {
        self.state
            .borrow_mut()
            .dialog
            .as_mut()
            .map(|dialog| f(&mut dialog.editor))
    }

    /// Close the dialog, apply its values optimistically and send the update.
    pub fn confirm(&self) -> Effects {
        let Some(mut dialog) = self.state.borrow_mut().dialog.take() else {
            return Effects::none();
        };
        let Some(previous) = self.snapshot() else {
            tracing::warn!(target: "weft::sync", widget_id = %self.id, "confirm without a snapshot, dropped");
            dialog.editor.destroy();
            self.settle_phase();
            return Effects::none();
        };

        let description = dialog.editor.value();
        let description = if description.is_empty() {
            previous.description.clone()
        } else {
            description
        };
        let source = dialog.source_field.trim();
        let fields = WidgetFields {
            description,
            source: (!source.is_empty()).then(|| source.to_string()),
        };
        dialog.editor.destroy();

        self.ctx.snapshots.apply(&self.id, fields.clone());
        {
            let mut state = self.state.borrow_mut();
            state.in_flight += 1;
            state.phase = SyncPhase::Saving;
        }
        tracing::debug!(target: "weft::sync", widget_id = %self.id, "update dispatched");

        let id = self.id.clone();
        let ctx = self.ctx.clone();
        let state = self.state.clone();
        Effects::one(async move {
            let result = ctx.store.update(&id, fields.clone()).await;
            let failed = match &result {
                Ok(server) => {
                    if server.fields() != fields {
                        tracing::debug!(target: "weft::sync", widget_id = %id, "store echoed different values, keeping local");
                    }
                    false
                }
                Err(error) => {
                    tracing::error!(target: "weft::sync", widget_id = %id, %error, "widget update failed");
                    true
                }
            };
            {
                let mut state = state.borrow_mut();
                state.in_flight = state.in_flight.saturating_sub(1);
                state.last_failed = failed;
                if state.phase != SyncPhase::Editing {
                    state.phase = state.resting();
                }
            }
            if failed {
                ctx.notifier
                    .notify(Notification::error(ctx.label(keys::FAILED_TO_UPDATE)));
            }
        })
    }

    /// Close the dialog and discard its buffered values.
    pub fn cancel(&self) {
        let dialog = self.state.borrow_mut().dialog.take();
        if let Some(mut dialog) = dialog {
            dialog.editor.destroy();
            tracing::debug!(target: "weft::sync", widget_id = %self.id, "edit cancelled");
        }
        self.settle_phase();
    }

    /// Ask the store to delete the widget; on success remove its marker.
    pub fn delete(&self, controller: WidgetController) -> Effects {
        let can_configure = self.snapshot().is_some_and(|s| s.can_configure);
        if !can_configure {
            tracing::warn!(target: "weft::sync", widget_id = %self.id, "delete refused, viewer cannot configure");
            return Effects::none();
        }

        let id = self.id.clone();
        let ctx = self.ctx.clone();
        Effects::one(async move {
            match ctx.store.delete(&id).await {
                Ok(true) => {
                    ctx.snapshots.remove(&id);
                    controller.remove_self();
                    tracing::debug!(target: "weft::sync", widget_id = %id, "widget deleted");
                }
                Ok(false) => {
                    tracing::error!(target: "weft::sync", widget_id = %id, "store reported nothing deleted");
                    ctx.notifier
                        .notify(Notification::error(ctx.label(keys::FAILED_TO_DELETE)));
                }
                Err(error) => {
                    tracing::error!(target: "weft::sync", widget_id = %id, %error, "widget delete failed");
                    ctx.notifier
                        .notify(Notification::error(ctx.label(keys::FAILED_TO_DELETE)));
                }
            }
        })
    }

    /// Release the sub-editor, if any. In-flight mutations keep running.
    pub fn dispose(&self) {
        let dialog = self.state.borrow_mut().dialog.take();
        if let Some(mut dialog) = dialog {
            dialog.editor.destroy();
        }
        self.settle_phase();
    }

    fn settle_phase(&self) {
        let mut state = self.state.borrow_mut();
        state.phase = state.resting();
    }
}

/// Create a widget in the store, then reference it from the document.
///
/// On failure an error notification is shown and the document is left alone.
pub async fn create_and_insert(
    ctx: &WidgetContext,
    source: &SharedSource,
    offset: usize,
    widget_type: &str,
    input: NewWidget,
) -> Result<PersistedWidget, WidgetError> {
    if !marker::is_valid_type(widget_type) {
        return Err(WidgetError::InvalidWidgetType(widget_type.into()));
    }
    let created = match ctx.store.create(input).await {
        Ok(created) => created,
        Err(error) => {
            tracing::error!(target: "weft::sync", widget_type, %error, "widget create failed");
            ctx.notifier
                .notify(Notification::error(ctx.label(keys::FAILED_TO_CREATE)));
            return Err(error.into());
        }
    };
    ctx.snapshots.insert(created.clone());

    let offset = offset.min(source.borrow().len_chars());
    let attributes: Attributes = [("id", created.id.as_str())].into_iter().collect();
    controller::insert_marker(source, offset, widget_type, &attributes)?;
    tracing::debug!(target: "weft::sync", widget_type, widget_id = %created.id, offset, "widget created");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::store::{MemoryStore, Owner};
    use futures_util::future::join_all;
    use weft_editor_core::SourceDocument;

    struct Fixture {
        store: Rc<MemoryStore>,
        notifier: Rc<RecordingNotifier>,
        ctx: WidgetContext,
    }

    fn fixture() -> Fixture {
        let store = Rc::new(MemoryStore::new(Owner::new("u1", "alice")));
        store.seed("w1", Owner::new("u1", "alice"), "original", Some("https://example.com".into()));
        store.seed("w2", Owner::new("u2", "bob"), "bob's widget", None);
        let notifier = Rc::new(RecordingNotifier::new());
        let ctx = WidgetContext::new(store.clone()).with_notifier(notifier.clone());
        Fixture { store, notifier, ctx }
    }

    async fn run(effects: Effects) {
        join_all(effects).await;
    }

    async fn loaded(fx: &Fixture, id: &str) -> PersistedWidgetSync {
        let sync = PersistedWidgetSync::new(id, fx.ctx.clone());
        run(sync.load()).await;
        sync
    }

    #[tokio::test]
    async fn test_load_fills_cache() {
        let fx = fixture();
        let sync = PersistedWidgetSync::new("w1", fx.ctx.clone());
        assert_eq!(sync.availability(), Availability::Loading);
        run(sync.load()).await;
        assert_eq!(sync.availability(), Availability::Ready);
        assert_eq!(sync.snapshot().map(|s| s.description), Some("original".into()));

        // A second mount for the same id does not refetch.
        let again = PersistedWidgetSync::new("w1", fx.ctx.clone());
        assert_eq!(again.availability(), Availability::Ready);
        assert!(again.load().is_empty());
    }

    #[tokio::test]
    async fn test_missing_widget_is_unavailable() {
        let fx = fixture();
        let sync = loaded(&fx, "nope").await;
        assert_eq!(sync.availability(), Availability::Unavailable);
        assert!(fx.notifier.all().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_notifies() {
        let fx = fixture();
        fx.store.set_offline(true);
        let sync = loaded(&fx, "w1").await;
        assert_eq!(sync.availability(), Availability::Unavailable);
        assert_eq!(fx.notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_confirm_success() {
        let fx = fixture();
        let sync = loaded(&fx, "w1").await;
        sync.begin_edit(&Theme::light(), false).expect("editable");
        assert_eq!(sync.phase(), SyncPhase::Editing);
        assert_eq!(sync.dialog_values(), Some(("original".into(), "https://example.com".into())));
        assert_eq!(fx.ctx.sub_editors.live_count(), 1);

        sync.set_description("updated");
        sync.set_source_field("  ");
        let effects = sync.confirm();
        assert_eq!(sync.phase(), SyncPhase::Saving);
        assert_eq!(fx.ctx.sub_editors.live_count(), 0);
        let snapshot = sync.snapshot().expect("cached");
        assert_eq!(snapshot.description, "updated");
        assert_eq!(snapshot.source, None);

        run(effects).await;
        assert_eq!(sync.phase(), SyncPhase::Viewing);
        assert_eq!(fx.store.peek("w1").map(|w| w.description), Some("updated".into()));
        assert!(fx.notifier.all().is_empty());
    }

    #[tokio::test]
    async fn test_empty_description_keeps_previous() {
        let fx = fixture();
        let sync = loaded(&fx, "w1").await;
        sync.begin_edit(&Theme::light(), false).expect("editable");
        sync.set_description("");
        run(sync.confirm()).await;
        assert_eq!(sync.snapshot().map(|s| s.description), Some("original".into()));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_optimistic_state() {
        let fx = fixture();
        let sync = loaded(&fx, "w1").await;
        fx.store.set_offline(true);
        sync.begin_edit(&Theme::light(), false).expect("editable");
        sync.set_description("offline edit");
        run(sync.confirm()).await;

        assert_eq!(sync.phase(), SyncPhase::Failed);
        assert_eq!(sync.snapshot().map(|s| s.description), Some("offline edit".into()));
        let errors = fx.notifier.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].text, "Failed to update widget");
        assert_eq!(errors[0].timeout, std::time::Duration::from_secs(5));

        // Failed can be edited again.
        fx.store.set_offline(false);
        sync.begin_edit(&Theme::light(), false).expect("editable again");
        run(sync.confirm()).await;
        assert_eq!(sync.phase(), SyncPhase::Viewing);
    }

    #[tokio::test]
    async fn test_cancel_discards_and_resets() {
        let fx = fixture();
        let sync = loaded(&fx, "w1").await;
        sync.begin_edit(&Theme::light(), false).expect("editable");
        sync.set_source_field("https://changed");
        sync.set_description("changed");
        sync.cancel();
        assert_eq!(sync.phase(), SyncPhase::Viewing);
        assert_eq!(fx.ctx.sub_editors.live_count(), 0);

        sync.begin_edit(&Theme::light(), false).expect("editable");
        assert_eq!(sync.dialog_values(), Some(("original".into(), "https://example.com".into())));
        assert!(fx.store.calls().iter().all(|c| !matches!(c, crate::store::StoreCall::Update(_))));
    }

    #[tokio::test]
    async fn test_cannot_edit_without_capability_or_in_preview() {
        let fx = fixture();
        let foreign = loaded(&fx, "w2").await;
        assert_eq!(
            foreign.begin_edit(&Theme::light(), false),
            Err(WidgetError::NotConfigurable("w2".into()))
        );
        let own = loaded(&fx, "w1").await;
        assert!(own.begin_edit(&Theme::light(), true).is_err());
        assert!(foreign.delete(WidgetController::new(
            SourceDocument::shared(""),
            &marker::WidgetMarker::parse("@[cloud_widget](id=\"w2\")").expect("marker"),
            0
        ))
        .is_empty());
    }

    #[tokio::test]
    async fn test_racing_saves_last_resolution_wins() {
        let fx = fixture();
        let sync = loaded(&fx, "w1").await;

        sync.begin_edit(&Theme::light(), false).expect("editable");
        sync.set_description("first");
        let first = sync.confirm();
        sync.begin_edit(&Theme::light(), false).expect("editable");
        sync.set_description("second");
        let second = sync.confirm();
        assert_eq!(sync.in_flight(), 2);

        run(second).await;
        assert_eq!(sync.phase(), SyncPhase::Saving);
        run(first).await;
        assert_eq!(sync.phase(), SyncPhase::Viewing);
        // Local state shows the last confirmed edit; the store holds whichever
        // write landed last.
        assert_eq!(sync.snapshot().map(|s| s.description), Some("second".into()));
        assert_eq!(fx.store.peek("w1").map(|w| w.description), Some("first".into()));
    }

    #[tokio::test]
    async fn test_create_and_insert() {
        let fx = fixture();
        let source = SourceDocument::shared("Intro\n");
        let created = create_and_insert(
            &fx.ctx,
            &source,
            100,
            "cloud_widget",
            NewWidget {
                description: "fresh".into(),
                source: None,
            },
        )
        .await
        .expect("created");
        assert_eq!(
            source.borrow().text(),
            format!("Intro\n@[cloud_widget](id=\"{}\")", created.id)
        );
        assert!(fx.ctx.snapshots.contains(&created.id));
    }

    #[tokio::test]
    async fn test_create_failure_inserts_nothing() {
        let fx = fixture();
        fx.store.set_offline(true);
        let source = SourceDocument::shared("Intro\n");
        let result = create_and_insert(&fx.ctx, &source, 0, "cloud_widget", NewWidget::default()).await;
        assert!(matches!(result, Err(WidgetError::Store(_))));
        assert_eq!(source.borrow().text(), "Intro\n");
        assert_eq!(fx.notifier.errors().len(), 1);
    }
}
