//! Widget whose content lives in the widget store.
//!
//! The marker only carries the id: `@[cloud_widget](id="w1")`. Description
//! and source come from the store and are edited through a dialog with an
//! embedded sub-editor.

use std::sync::Arc;

use crate::chrome::{ACTION_DELETE, ACTION_EDIT, Chrome, SourceLink};
use crate::controller::WidgetController;
use crate::labels::keys;
use crate::mount::{Effects, WidgetArgs, WidgetContext, WidgetEvent, WidgetMount};
use crate::store::PersistedWidget;
use crate::sync::{Availability, PersistedWidgetSync, SyncPhase};
use crate::theme::Theme;
use crate::view::{Element, FIELD_ATTR, View};

pub const WIDGET_TYPE: &str = "cloud_widget";
pub const ID_FIELD: &str = "id";
pub const SOURCE_FIELD: &str = "source";
pub const DESCRIPTION_FIELD: &str = "description";
pub const ACTION_SAVE: &str = "save";
pub const ACTION_CANCEL: &str = "cancel";

pub fn create(args: WidgetArgs) -> Option<Box<dyn WidgetMount>> {
    let id = args.attributes.get_non_empty("id").map(str::to_string);
    let state = match id {
        Some(id) => State::Bound(PersistedWidgetSync::new(id, args.context.clone())),
        None if args.is_preview => return None,
        None => State::Unbound { draft: String::new() },
    };
    Some(Box::new(CloudWidget {
        state,
        controller: args.controller,
        context: args.context,
        theme: args.theme,
        is_preview: args.is_preview,
        disposed: false,
    }))
}

enum State {
    /// No id yet; the user is asked for one.
    Unbound { draft: String },
    Bound(PersistedWidgetSync),
}

struct CloudWidget {
    state: State,
    controller: WidgetController,
    context: WidgetContext,
    theme: Arc<Theme>,
    is_preview: bool,
    disposed: bool,
}

impl CloudWidget {
    fn chrome(&self) -> Chrome<'_> {
        Chrome::new(&*self.context.labels, self.is_preview)
    }

    fn prompt(&self, draft: &str) -> View {
        Element::new("div")
            .class("weft-card")
            .class("weft-cloud-prompt")
            .child(Element::new("h5").text(self.context.label(keys::CLOUD_TITLE)))
            .child(View::input(ID_FIELD, draft, "w1").attr("aria-label", self.context.label(keys::CLOUD_PROMPT)))
            .child(self.chrome().build())
            .into()
    }

    fn placeholder(&self, sync: &PersistedWidgetSync, class: &str, label: &str) -> View {
        Element::new("div")
            .class("weft-card")
            .class(class)
            .attr("data-widget-id", sync.id().as_str())
            .text(self.context.label(label))
            .child(self.chrome().build())
            .into()
    }

    fn panel(&self, sync: &PersistedWidgetSync, snapshot: &PersistedWidget) -> View {
        let phase = match sync.phase() {
            SyncPhase::Viewing => "viewing",
            SyncPhase::Editing => "editing",
            SyncPhase::Saving => "saving",
            SyncPhase::Failed => "failed",
        };
        let source = snapshot
            .source
            .as_deref()
            .and_then(|s| SourceLink::classify(s, self.context.app_origin.as_deref()));
        let chrome = self
            .chrome()
            .can_configure(snapshot.can_configure)
            .editable(true)
            .source(source)
            .owner(&snapshot.owner)
            .build();

        Element::new("div")
            .class("weft-cloud-widget")
            .attr("data-widget-id", snapshot.id.as_str())
            .attr("data-phase", phase)
            .child(chrome)
            .child(
                Element::new("div")
                    .class("weft-description")
                    .child(View::Html(self.context.preview.render_preview(&snapshot.description))),
            )
            .child(self.dialog(sync))
            .into()
    }

    fn dialog(&self, sync: &PersistedWidgetSync) -> View {
        let (Some((description, source)), Some((host, editor_theme))) = (sync.dialog_values(), sync.editor_host())
        else {
            return View::Empty;
        };
        Element::new("div")
            .class("weft-dialog")
            .attr("role", "dialog")
            .child(Element::new("label").text(self.context.label(keys::SOURCE)))
            .child(View::input(SOURCE_FIELD, &source, "https://..."))
            .child(Element::new("label").text(self.context.label(keys::DESCRIPTION)))
            .child(
                Element::new("div")
                    .class("weft-subeditor")
                    .attr("id", host.to_string())
                    .attr("data-theme", editor_theme.as_str())
                    .child(Element::new("textarea").attr(FIELD_ATTR, DESCRIPTION_FIELD).text(description)),
            )
            .child(
                Element::new("div")
                    .class("weft-dialog-actions")
                    .child(View::button(ACTION_SAVE, self.context.label(keys::SAVE)))
                    .child(View::button(ACTION_CANCEL, self.context.label(keys::CANCEL))),
            )
            .into()
    }

    fn handle_bound(&self, sync: &PersistedWidgetSync, event: WidgetEvent) -> Effects {
        match event {
            WidgetEvent::Action(action) => match action.as_str() {
                ACTION_EDIT => {
                    if let Err(error) = sync.begin_edit(&self.theme, self.is_preview) {
                        tracing::warn!(target: "weft::widget", widget_id = %sync.id(), %error, "cannot edit widget");
                    }
                    Effects::none()
                }
                ACTION_SAVE => sync.confirm(),
                ACTION_CANCEL => {
                    sync.cancel();
                    Effects::none()
                }
                ACTION_DELETE if !self.is_preview => sync.delete(self.controller.clone()),
                _ => Effects::none(),
            },
            WidgetEvent::Input { field, value } => {
                match field.as_str() {
                    SOURCE_FIELD => sync.set_source_field(value),
                    DESCRIPTION_FIELD => sync.set_description(&value),
                    _ => {}
                }
                Effects::none()
            }
            WidgetEvent::Submit { .. } => Effects::none(),
        }
    }
}

impl WidgetMount for CloudWidget {
    fn view(&self) -> View {
        match &self.state {
            State::Unbound { draft } => self.prompt(draft),
            State::Bound(sync) => match (sync.availability(), sync.snapshot()) {
                (Availability::Ready, Some(snapshot)) => self.panel(sync, &snapshot),
                (Availability::Loading, _) => self.placeholder(sync, "weft-loading", keys::LOADING),
                _ => self.placeholder(sync, "weft-unavailable", keys::UNAVAILABLE),
            },
        }
    }

    fn handle(&mut self, event: WidgetEvent) -> Effects {
        match &mut self.state {
            State::Unbound { draft } => {
                match event {
                    WidgetEvent::Input { field, value } if field == ID_FIELD => *draft = value,
                    WidgetEvent::Submit { field } if field == ID_FIELD => {
                        let id = draft.trim();
                        if !id.is_empty() {
                            if let Err(error) = self.controller.set_attribute("id", id) {
                                tracing::warn!(target: "weft::widget", widget_type = WIDGET_TYPE, %error, "could not store widget id");
                            }
                        }
                    }
                    WidgetEvent::Action(action) if action == ACTION_DELETE && !self.is_preview => {
                        self.controller.remove_self();
                    }
                    _ => {}
                }
                Effects::none()
            }
            State::Bound(sync) => {
                let sync = sync.clone();
                self.handle_bound(&sync, event)
            }
        }
    }

    fn mounted(&mut self) -> Effects {
        match &self.state {
            State::Bound(sync) => sync.load(),
            State::Unbound { .. } => Effects::none(),
        }
    }

    fn dispose(&mut self) {
        if let State::Bound(sync) = &self.state {
            sync.dispose();
        }
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
