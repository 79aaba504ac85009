//! Localised UI strings.
//!
//! Widgets never hard-code user-facing text; they ask a [`Labels`]
//! implementation by key. Unknown keys come back as the key itself.

use std::borrow::Cow;

pub mod keys {
    pub const EDIT: &str = "general/edit";
    pub const DELETE: &str = "general/delete";
    pub const SAVE: &str = "general/save";
    pub const CANCEL: &str = "general/cancel";
    pub const SOURCE: &str = "general/source";
    pub const DESCRIPTION: &str = "general/description";
    pub const LOADING: &str = "widget/loading";
    pub const UNAVAILABLE: &str = "widget/unavailable";
    pub const UNKNOWN_TYPE: &str = "widget/unknown-type";
    pub const GIST_TITLE: &str = "widget/github-gist/title";
    pub const GIST_PROMPT: &str = "widget/github-gist/enter-url";
    pub const CLOUD_TITLE: &str = "widget/cloud/title";
    pub const CLOUD_PROMPT: &str = "widget/cloud/enter-id";
    pub const FAILED_TO_CREATE: &str = "error/failed-to-create-widget";
    pub const FAILED_TO_UPDATE: &str = "error/failed-to-update-widget";
    pub const FAILED_TO_DELETE: &str = "error/failed-to-delete-widget";
    pub const FAILED_TO_LOAD: &str = "error/failed-to-load-widget";
}

pub trait Labels {
    fn label(&self, key: &str) -> Cow<'_, str>;
}

impl<T: Labels + ?Sized> Labels for &T {
    fn label(&self, key: &str) -> Cow<'_, str> {
        (**self).label(key)
    }
}

/// Built-in English strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishLabels;

impl Labels for EnglishLabels {
    fn label(&self, key: &str) -> Cow<'_, str> {
        let text = match key {
            keys::EDIT => "Edit",
            keys::DELETE => "Delete",
            keys::SAVE => "Save",
            keys::CANCEL => "Cancel",
            keys::SOURCE => "Source",
            keys::DESCRIPTION => "Description",
            keys::LOADING => "Loading widget…",
            keys::UNAVAILABLE => "This widget is no longer available",
            keys::UNKNOWN_TYPE => "Unknown widget type",
            keys::GIST_TITLE => "GitHub Gist",
            keys::GIST_PROMPT => "Paste a gist.github.com link and press Enter",
            keys::CLOUD_TITLE => "Shared widget",
            keys::CLOUD_PROMPT => "Enter a widget id and press Enter",
            keys::FAILED_TO_CREATE => "Failed to create widget",
            keys::FAILED_TO_UPDATE => "Failed to update widget",
            keys::FAILED_TO_DELETE => "Failed to delete widget",
            keys::FAILED_TO_LOAD => "Failed to load widget",
            other => return Cow::Owned(other.to_string()),
        };
        Cow::Borrowed(text)
    }
}
