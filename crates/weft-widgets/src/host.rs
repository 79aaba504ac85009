//! Reference renderer: mounts widgets for every marker in a document.
//!
//! Each render pass disposes the previous pass's mounts, scans the source,
//! and creates a fresh mount per marker. Unknown types get a fallback view;
//! creators returning `None` render nothing. The host listens to the source
//! and reports itself dirty after any change, so callers know to render
//! again. Effects returned by mounts are collected and driven by
//! [`WidgetHost::settle`].

use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use smol_str::SmolStr;
use weft_editor_core::{ListenerId, SharedSource};

use crate::attrs::Attributes;
use crate::controller::WidgetController;
use crate::labels::keys;
use crate::marker::{self, WidgetMarker};
use crate::mount::{Effect, Effects, MountSlot, WidgetArgs, WidgetContext, WidgetEvent};
use crate::registry::WidgetRegistry;
use crate::theme::{ThemeSource, ThemedMount};
use crate::view::{Element, View};

/// What a marker rendered as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetOutput {
    Mounted,
    /// The creator chose to render nothing.
    Absent,
    /// No creator registered for the type.
    Unknown,
}

#[derive(Debug)]
pub struct HostedWidget {
    marker: WidgetMarker,
    output: WidgetOutput,
    controller: Option<WidgetController>,
    slot: Option<Rc<MountSlot>>,
}

impl HostedWidget {
    pub fn widget_type(&self) -> &SmolStr {
        &self.marker.widget_type
    }

    /// Char range at render time.
    pub fn range(&self) -> Range<usize> {
        self.marker.range.clone()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.marker.attributes
    }

    pub fn output(&self) -> WidgetOutput {
        self.output
    }

    pub fn controller(&self) -> Option<&WidgetController> {
        self.controller.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.slot.as_ref().is_none_or(|slot| slot.is_disposed())
    }

    fn dispose(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.dispose())
    }
}

pub struct WidgetHost {
    registry: Arc<WidgetRegistry>,
    source: SharedSource,
    context: WidgetContext,
    themes: Rc<dyn ThemeSource>,
    is_preview: bool,
    widgets: Vec<HostedWidget>,
    rendered_text: String,
    pending: FuturesUnordered<Effect>,
    dirty: Rc<Cell<bool>>,
    listener: ListenerId,
}

impl WidgetHost {
    pub fn new(
        registry: Arc<WidgetRegistry>,
        source: SharedSource,
        context: WidgetContext,
        themes: Rc<dyn ThemeSource>,
    ) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = dirty.clone();
        let listener = source.borrow_mut().subscribe(move |_| flag.set(true));
        Self {
            registry,
            source,
            context,
            themes,
            is_preview: false,
            widgets: Vec::new(),
            rendered_text: String::new(),
            pending: FuturesUnordered::new(),
            dirty,
            listener,
        }
    }

    /// Render in preview mode: no editing chrome, unconfigured widgets hidden.
    pub fn with_preview(mut self, is_preview: bool) -> Self {
        self.is_preview = is_preview;
        self
    }

    pub fn context(&self) -> &WidgetContext {
        &self.context
    }

    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Whether the source changed since the last render pass.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Dispose current mounts and mount one widget per marker.
    pub fn render(&mut self) -> usize {
        let disposed = self.unmount_all();
        self.dirty.set(false);

        let (text, revision) = {
            let doc = self.source.borrow();
            (doc.text(), doc.revision())
        };
        let markers = marker::scan(&text);
        self.rendered_text = text;

        for marker in markers {
            let hosted = self.mount_marker(marker, revision);
            self.widgets.push(hosted);
        }
        tracing::debug!(
            target: "weft::host",
            revision,
            widgets = self.widgets.len(),
            disposed,
            preview = self.is_preview,
            "render pass"
        );
        self.widgets.len()
    }

    /// Render again only if the source changed.
    pub fn render_if_dirty(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.render();
        true
    }

    fn mount_marker(&mut self, marker: WidgetMarker, revision: u64) -> HostedWidget {
        let Some(factory) = self.registry.lookup(&marker.widget_type) else {
            tracing::debug!(target: "weft::host", widget_type = %marker.widget_type, "no creator registered");
            return HostedWidget {
                marker,
                output: WidgetOutput::Unknown,
                controller: None,
                slot: None,
            };
        };

        let controller = WidgetController::new(self.source.clone(), &marker, revision);
        let theme = self.themes.current();
        let args = WidgetArgs {
            widget_type: marker.widget_type.clone(),
            attributes: marker.attributes.clone(),
            controller: controller.clone(),
            is_preview: self.is_preview,
            context: self.context.clone(),
            theme: theme.clone(),
        };

        let Some(mount) = factory(args) else {
            return HostedWidget {
                marker,
                output: WidgetOutput::Absent,
                controller: Some(controller),
                slot: None,
            };
        };

        let slot = Rc::new(MountSlot::new(Box::new(ThemedMount::new(theme, mount))));
        controller.attach(&slot);
        if let Some(effects) = slot.with_mount(|m| m.mounted()) {
            self.queue(effects);
        }
        HostedWidget {
            marker,
            output: WidgetOutput::Mounted,
            controller: Some(controller),
            slot: Some(slot),
        }
    }

    pub fn widgets(&self) -> &[HostedWidget] {
        &self.widgets
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Number of live mounts.
    pub fn mounted_count(&self) -> usize {
        self.widgets
            .iter()
            .filter(|w| w.output == WidgetOutput::Mounted && !w.is_disposed())
            .count()
    }

    /// View for the `index`-th marker of the last render pass.
    pub fn view(&self, index: usize) -> Option<View> {
        let widget = self.widgets.get(index)?;
        Some(match widget.output {
            WidgetOutput::Mounted => widget
                .slot
                .as_ref()
                .and_then(|slot| slot.view())
                .unwrap_or(View::Empty),
            WidgetOutput::Absent => View::Empty,
            WidgetOutput::Unknown => self.unknown_view(widget),
        })
    }

    pub fn views(&self) -> Vec<View> {
        (0..self.widgets.len()).filter_map(|i| self.view(i)).collect()
    }

    fn unknown_view(&self, widget: &HostedWidget) -> View {
        Element::new("span")
            .class("weft-widget-unknown")
            .attr("data-widget-type", widget.widget_type().as_str())
            .text(format!(
                "{}: {}",
                self.context.label(keys::UNKNOWN_TYPE),
                widget.widget_type()
            ))
            .into()
    }

    /// Route an event to the `index`-th mount. `false` if there is no live
    /// mount there.
    pub fn dispatch(&mut self, index: usize, event: WidgetEvent) -> bool {
        let Some(slot) = self.widgets.get(index).and_then(|w| w.slot.clone()) else {
            return false;
        };
        match slot.with_mount(|m| m.handle(event)) {
            Some(effects) => {
                self.queue(effects);
                true
            }
            None => false,
        }
    }

    fn queue(&mut self, effects: Effects) {
        for effect in effects {
            self.pending.push(effect);
        }
    }

    /// Effects not yet driven to completion.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drive every queued effect to completion.
    pub async fn settle(&mut self) {
        while self.pending.next().await.is_some() {}
    }

    /// Dispose every live mount. Returns how many were disposed.
    pub fn unmount_all(&mut self) -> usize {
        let disposed = self.widgets.drain(..).filter(|w| w.dispose()).count();
        if disposed > 0 {
            tracing::trace!(target: "weft::host", disposed, "mounts disposed");
        }
        disposed
    }

    /// The rendered document: text escaped, markers replaced by widget views.
    pub fn to_html(&self) -> String {
        let chars: Vec<char> = self.rendered_text.chars().collect();
        let mut out = String::new();
        let mut pos = 0;
        for (index, widget) in self.widgets.iter().enumerate() {
            let range = widget.range();
            let before: String = chars[pos..range.start].iter().collect();
            out.push_str(&View::text(before).to_html());
            if let Some(view) = self.view(index) {
                out.push_str(&view.to_html());
            }
            pos = range.end;
        }
        let rest: String = chars[pos..].iter().collect();
        out.push_str(&View::text(rest).to_html());
        out
    }
}

impl Drop for WidgetHost {
    fn drop(&mut self) {
        self.unmount_all();
        if let Ok(mut doc) = self.source.try_borrow_mut() {
            doc.unsubscribe(self.listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::WidgetMount;
    use crate::store::{MemoryStore, Owner};
    use crate::theme::ThemeManager;
    use std::sync::Mutex;
    use weft_editor_core::SourceDocument;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Probe {
        label: String,
        log: Log,
        disposed: bool,
    }

    impl WidgetMount for Probe {
        fn view(&self) -> View {
            View::text(self.label.clone())
        }

        fn dispose(&mut self) {
            self.disposed = true;
            self.log.lock().unwrap().push(format!("dispose {}", self.label));
        }

        fn is_disposed(&self) -> bool {
            self.disposed
        }
    }

    fn host_for(text: &str, log: Log) -> WidgetHost {
        let mut builder = WidgetRegistry::builder();
        builder.register("probe", move |args| {
            let label = args.attributes.get("name").unwrap_or("?").to_string();
            log.lock().unwrap().push(format!("create {label}"));
            Some(Box::new(Probe {
                label,
                log: log.clone(),
                disposed: false,
            }))
        });
        builder.register("hidden", |_| None);
        let store = Rc::new(MemoryStore::new(Owner::new("u1", "alice")));
        WidgetHost::new(
            Arc::new(builder.build()),
            SourceDocument::shared(text),
            WidgetContext::new(store),
            Rc::new(ThemeManager::new()),
        )
    }

    #[test]
    fn test_render_mounts_each_marker() {
        let log = Log::default();
        let mut host = host_for("a @[probe](name=\"one\") b @[hidden]() c @[nope]()", log);
        assert_eq!(host.render(), 3);
        let outputs: Vec<_> = host.widgets().iter().map(|w| w.output()).collect();
        assert_eq!(
            outputs,
            vec![WidgetOutput::Mounted, WidgetOutput::Absent, WidgetOutput::Unknown]
        );
        assert_eq!(host.mounted_count(), 1);
        assert_eq!(host.view(1), Some(View::Empty));
        assert!(host.view(2).expect("fallback").text_content().contains("nope"));
    }

    #[test]
    fn test_rerender_disposes_previous_mounts_once() {
        let log = Log::default();
        let mut host = host_for("@[probe](name=\"one\")", log.clone());
        host.render();
        assert!(!host.is_dirty());
        host.source().borrow_mut().insert(0, "x ");
        assert!(host.is_dirty());
        assert!(host.render_if_dirty());
        assert!(!host.render_if_dirty());
        drop(host);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["create one", "dispose one", "create one", "dispose one"]
        );
    }

    #[test]
    fn test_document_html() {
        let mut host = host_for("<p> @[probe](name=\"w\") @[nope]() end", Log::default());
        host.render();
        let html = host.to_html();
        assert!(html.starts_with("&lt;p&gt; <div class=\"weft-widget\" data-theme=\"light\""));
        assert!(html.contains(">w</div>"));
        assert!(html.ends_with(
            "<span class=\"weft-widget-unknown\" data-widget-type=\"nope\">Unknown widget type: nope</span> end"
        ));
    }

    #[test]
    fn test_dispatch_without_mount() {
        let mut host = host_for("@[hidden]()", Log::default());
        host.render();
        assert!(!host.dispatch(0, WidgetEvent::action("edit")));
        assert!(!host.dispatch(5, WidgetEvent::action("edit")));
    }
}
