//! The contract between the renderer and widget implementations.
//!
//! A creator receives [`WidgetArgs`] and either returns a live
//! [`WidgetMount`] or `None` to render nothing. The host owns each mount in a
//! [`MountSlot`], routes user input to it as [`WidgetEvent`]s, and disposes
//! it exactly once when the marker goes away or a new render pass
//! supersedes it.
//!
//! Asynchronous work (store calls) is returned from event handlers as
//! [`Effects`] rather than spawned, so the host decides how to drive it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use futures_util::future::LocalBoxFuture;
use smol_str::SmolStr;

use crate::attrs::Attributes;
use crate::controller::WidgetController;
use crate::labels::{EnglishLabels, Labels};
use crate::notify::{Notifier, TracingNotifier};
use crate::preview::{MarkdownPreview, PreviewRenderer};
use crate::store::WidgetStore;
use crate::subeditor::SubEditorPool;
use crate::sync::SnapshotCache;
use crate::theme::Theme;
use crate::view::View;

/// A unit of deferred work.
pub type Effect = LocalBoxFuture<'static, ()>;

/// Work a mount wants run after it returns.
#[derive(Default)]
pub struct Effects(Vec<Effect>);

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(effect: impl Future<Output = ()> + 'static) -> Self {
        Self(vec![Box::pin(effect)])
    }

    pub fn push(&mut self, effect: impl Future<Output = ()> + 'static) {
        self.0.push(Box::pin(effect));
    }

    pub fn extend(&mut self, other: Effects) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Option<Effect>> for Effects {
    fn from(effect: Option<Effect>) -> Self {
        Self(effect.into_iter().collect())
    }
}

impl IntoIterator for Effects {
    type Item = Effect;
    type IntoIter = std::vec::IntoIter<Effect>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Debug for Effects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Effects").field(&self.0.len()).finish()
    }
}

/// User input routed to a mount.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetEvent {
    /// A button with `data-action` was pressed.
    Action(SmolStr),
    /// An input bound with `data-field` changed.
    Input { field: SmolStr, value: String },
    /// Enter was pressed in an input.
    Submit { field: SmolStr },
}

impl WidgetEvent {
    pub fn action(name: &str) -> Self {
        Self::Action(SmolStr::new(name))
    }

    pub fn input(field: &str, value: impl Into<String>) -> Self {
        Self::Input {
            field: SmolStr::new(field),
            value: value.into(),
        }
    }

    pub fn submit(field: &str) -> Self {
        Self::Submit {
            field: SmolStr::new(field),
        }
    }
}

/// A live widget instance.
pub trait WidgetMount {
    fn view(&self) -> View;

    fn handle(&mut self, event: WidgetEvent) -> Effects {
        tracing::trace!(target: "weft::mount", ?event, "event ignored");
        Effects::none()
    }

    /// Called once, right after the host has taken ownership.
    fn mounted(&mut self) -> Effects {
        Effects::none()
    }

    /// Release everything the mount holds. Called at most once by the host.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

/// Creates a mount for one marker, or `None` to render nothing.
pub type Factory = Arc<dyn Fn(WidgetArgs) -> Option<Box<dyn WidgetMount>> + Send + Sync>;

/// Host-provided services every widget can use.
#[derive(Clone)]
pub struct WidgetContext {
    pub store: Rc<dyn WidgetStore>,
    pub notifier: Rc<dyn Notifier>,
    pub preview: Rc<dyn PreviewRenderer>,
    pub labels: Rc<dyn Labels>,
    pub snapshots: SnapshotCache,
    pub sub_editors: SubEditorPool,
    /// Origin of the hosting app, used to tell internal links from external ones.
    pub app_origin: Option<SmolStr>,
}

impl WidgetContext {
    /// Context with stock preview, labels and a log-backed notifier.
    pub fn new(store: Rc<dyn WidgetStore>) -> Self {
        Self {
            store,
            notifier: Rc::new(TracingNotifier),
            preview: Rc::new(MarkdownPreview),
            labels: Rc::new(EnglishLabels),
            snapshots: SnapshotCache::default(),
            sub_editors: SubEditorPool::default(),
            app_origin: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_preview(mut self, preview: Rc<dyn PreviewRenderer>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_labels(mut self, labels: Rc<dyn Labels>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_app_origin(mut self, origin: impl Into<SmolStr>) -> Self {
        self.app_origin = Some(origin.into());
        self
    }

    pub fn label(&self, key: &str) -> String {
        self.labels.label(key).into_owned()
    }
}

impl fmt::Debug for WidgetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetContext")
            .field("app_origin", &self.app_origin)
            .field("live_sub_editors", &self.sub_editors.live_count())
            .finish_non_exhaustive()
    }
}

/// Everything a creator gets for one marker.
pub struct WidgetArgs {
    pub widget_type: SmolStr,
    pub attributes: Attributes,
    pub controller: WidgetController,
    pub is_preview: bool,
    pub context: WidgetContext,
    /// Theme captured for this mount.
    pub theme: Arc<Theme>,
}

/// Host-owned cell holding a mount until it is disposed.
///
/// Controllers keep a weak reference so `remove_self` can dispose the mount
/// without an ownership cycle. Disposal requested while the mount is busy
/// handling an event is deferred until the handler returns.
pub struct MountSlot {
    mount: RefCell<Option<Box<dyn WidgetMount>>>,
    dispose_requested: Cell<bool>,
}

impl MountSlot {
    pub fn new(mount: Box<dyn WidgetMount>) -> Self {
        Self {
            mount: RefCell::new(Some(mount)),
            dispose_requested: Cell::new(false),
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self.mount.try_borrow() {
            Ok(mount) => mount.is_none(),
            Err(_) => self.dispose_requested.get(),
        }
    }

    /// Dispose the mount. Returns `true` only for the call that actually
    /// disposed it.
    pub fn dispose(&self) -> bool {
        let taken = match self.mount.try_borrow_mut() {
            Ok(mut mount) => mount.take(),
            Err(_) => {
                self.dispose_requested.set(true);
                return false;
            }
        };
        match taken {
            Some(mut mount) => {
                if !mount.is_disposed() {
                    mount.dispose();
                }
                true
            }
            None => false,
        }
    }

    /// Run `f` against the live mount, then apply any deferred disposal.
    pub fn with_mount<R>(&self, f: impl FnOnce(&mut dyn WidgetMount) -> R) -> Option<R> {
        let result = {
            let mut mount = self.mount.try_borrow_mut().ok()?;
            mount.as_mut().map(|m| f(m.as_mut()))
        };
        if self.dispose_requested.take() {
            self.dispose();
        }
        result
    }

    pub fn view(&self) -> Option<View> {
        self.mount.try_borrow().ok()?.as_ref().map(|m| m.view())
    }
}

impl fmt::Debug for MountSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountSlot")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        disposals: Rc<Cell<u32>>,
        disposed: bool,
    }

    impl WidgetMount for Counter {
        fn view(&self) -> View {
            View::text("counter")
        }

        fn dispose(&mut self) {
            self.disposed = true;
            self.disposals.set(self.disposals.get() + 1);
        }

        fn is_disposed(&self) -> bool {
            self.disposed
        }
    }

    fn slot() -> (Rc<MountSlot>, Rc<Cell<u32>>) {
        let disposals = Rc::new(Cell::new(0));
        let slot = Rc::new(MountSlot::new(Box::new(Counter {
            disposals: disposals.clone(),
            disposed: false,
        })));
        (slot, disposals)
    }

    #[test]
    fn test_dispose_runs_once() {
        let (slot, disposals) = slot();
        assert!(slot.dispose());
        assert!(!slot.dispose());
        assert_eq!(disposals.get(), 1);
        assert!(slot.is_disposed());
        assert!(slot.view().is_none());
    }

    #[test]
    fn test_dispose_during_handler_is_deferred() {
        let (slot, disposals) = slot();
        let inner = slot.clone();
        slot.with_mount(|_| {
            assert!(!inner.dispose());
            assert!(inner.is_disposed());
        });
        assert_eq!(disposals.get(), 1);
        assert!(slot.with_mount(|_| ()).is_none());
    }

    #[test]
    fn test_effects_from_option() {
        let effects: Effects = Some(Box::pin(async {}) as Effect).into();
        assert_eq!(effects.len(), 1);
        assert!(Effects::from(None).is_empty());
    }
}
