//! Shared control strip shown above widgets: source link, owner avatar, and
//! the edit and delete buttons.

use smol_str::{SmolStr, format_smolstr};

use crate::labels::{Labels, keys};
use crate::store::Owner;
use crate::view::{Element, View};

pub const ACTION_EDIT: &str = "edit";
pub const ACTION_DELETE: &str = "delete";

/// Where a source link leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLink {
    /// Inside the hosting app; `path` is relative to the app origin.
    Internal { path: String },
    External { url: String },
}

impl SourceLink {
    /// Classify `source` against the app origin. Empty sources yield `None`.
    pub fn classify(source: &str, app_origin: Option<&str>) -> Option<SourceLink> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        match app_origin {
            Some(origin) if !origin.is_empty() && source.starts_with(origin) => {
                let path = &source[origin.len()..];
                let path = if path.is_empty() { "/" } else { path };
                Some(SourceLink::Internal { path: path.to_string() })
            }
            _ => Some(SourceLink::External {
                url: source.to_string(),
            }),
        }
    }

    fn view(&self, label: &str) -> View {
        let link = match self {
            SourceLink::Internal { path } => Element::new("a")
                .attr("href", path.as_str())
                .attr("data-navigate", "internal"),
            SourceLink::External { url } => Element::new("a")
                .attr("href", url.as_str())
                .attr("data-navigate", "external")
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer"),
        };
        link.class("weft-source-link").text(label).into()
    }
}

/// Owner picture, or a generated stand-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Avatar {
    Image { url: String, username: SmolStr },
    Fallback { initial: char, hue: u16, username: SmolStr },
}

impl Avatar {
    pub fn for_owner(owner: &Owner) -> Avatar {
        match owner.avatar.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => Avatar::Image {
                url: url.to_string(),
                username: owner.username.clone(),
            },
            None => Avatar::Fallback {
                initial: owner
                    .username
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().next().unwrap_or(c))
                    .unwrap_or('?'),
                hue: fallback_hue(&owner.username),
                username: owner.username.clone(),
            },
        }
    }

    fn view(&self) -> View {
        match self {
            Avatar::Image { url, username } => Element::new("img")
                .class("weft-avatar")
                .attr("src", url.as_str())
                .attr("alt", username.as_str())
                .attr("title", username.as_str())
                .into(),
            Avatar::Fallback { initial, hue, username } => Element::new("span")
                .class("weft-avatar")
                .class("weft-avatar-fallback")
                .attr("title", username.as_str())
                .attr("style", format!("background: hsl({hue}, 55%, 60%);"))
                .text(format_smolstr!("{initial}"))
                .into(),
        }
    }
}

/// Stable hue in `0..360` derived from the username.
pub fn fallback_hue(username: &str) -> u16 {
    let hash = blake3::hash(username.as_bytes());
    let bytes = hash.as_bytes();
    (u16::from_le_bytes([bytes[0], bytes[1]])) % 360
}

/// Builder for the control strip.
pub struct Chrome<'a> {
    labels: &'a dyn Labels,
    is_preview: bool,
    can_configure: bool,
    editable: bool,
    source: Option<SourceLink>,
    owner: Option<Avatar>,
}

impl<'a> Chrome<'a> {
    pub fn new(labels: &'a dyn Labels, is_preview: bool) -> Self {
        Self {
            labels,
            is_preview,
            can_configure: true,
            editable: false,
            source: None,
            owner: None,
        }
    }

    pub fn can_configure(mut self, can_configure: bool) -> Self {
        self.can_configure = can_configure;
        self
    }

    /// Show an edit button alongside delete.
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn source(mut self, source: Option<SourceLink>) -> Self {
        self.source = source;
        self
    }

    pub fn owner(mut self, owner: &Owner) -> Self {
        self.owner = Some(Avatar::for_owner(owner));
        self
    }

    /// Edit and delete are shown only outside preview and with the capability.
    pub fn shows_controls(&self) -> bool {
        !self.is_preview && self.can_configure
    }

    pub fn build(self) -> View {
        let mut strip = Element::new("div").class("weft-chrome");
        if let Some(source) = &self.source {
            strip = strip.child(source.view(&self.labels.label(keys::SOURCE)));
        }
        if let Some(owner) = &self.owner {
            strip = strip.child(owner.view());
        }
        if self.shows_controls() {
            let mut controls = Element::new("div").class("weft-chrome-controls");
            if self.editable {
                controls = controls.child(View::button(ACTION_EDIT, &*self.labels.label(keys::EDIT)));
            }
            controls = controls.child(View::button(ACTION_DELETE, &*self.labels.label(keys::DELETE)));
            strip = strip.child(controls);
        }
        if strip.children.is_empty() {
            return View::Empty;
        }
        strip.into()
    }
}
