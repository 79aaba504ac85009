//! Embedded GitHub gist.
//!
//! `@[github_gist](url="https://gist.github.com/<user>/<id>")` embeds the
//! gist. Without a url the widget shows a prompt; the link typed there is
//! accepted only if it points at gist.github.com over https, and is stored
//! without query or fragment. A url already in the document goes through the
//! same check before anything is embedded; one that fails it is treated as
//! missing.

use url::Url;

use crate::chrome::{ACTION_DELETE, Chrome};
use crate::controller::WidgetController;
use crate::labels::keys;
use crate::mount::{Effects, WidgetArgs, WidgetContext, WidgetEvent, WidgetMount};
use crate::view::{Element, View};

pub const WIDGET_TYPE: &str = "github_gist";
pub const GIST_HOST: &str = "gist.github.com";
pub const URL_FIELD: &str = "url";

/// Canonical gist url (origin plus path), or `None` if `input` is not a gist
/// link.
pub fn normalize_gist_url(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    if url.scheme() != "https" || url.host_str() != Some(GIST_HOST) {
        return None;
    }
    Some(format!("{}{}", url.origin().ascii_serialization(), url.path()))
}

pub fn create(args: WidgetArgs) -> Option<Box<dyn WidgetMount>> {
    let url = args.attributes.get_non_empty(URL_FIELD).and_then(|raw| {
        let url = normalize_gist_url(raw);
        if url.is_none() {
            tracing::warn!(target: "weft::widget", widget_type = WIDGET_TYPE, url = raw, "not a gist url, not embedding");
        }
        url
    });
    if url.is_none() && args.is_preview {
        return None;
    }
    Some(Box::new(GistWidget {
        url,
        draft: String::new(),
        controller: args.controller,
        context: args.context,
        is_preview: args.is_preview,
        disposed: false,
    }))
}

struct GistWidget {
    url: Option<String>,
    /// Text typed into the prompt, not yet submitted.
    draft: String,
    controller: WidgetController,
    context: WidgetContext,
    is_preview: bool,
    disposed: bool,
}

impl GistWidget {
    fn embed(&self, url: &str) -> View {
        Element::new("div")
            .class("preview")
            .class("github-gist")
            .attr("data-gist-url", url)
            .child(Chrome::new(&*self.context.labels, self.is_preview).build())
            .child(
                Element::new("div")
                    .class("weft-gist-embed")
                    .child(Element::new("script").attr("src", format!("{url}.js")))
                    .child(Element::new("noscript").child(Element::new("a").attr("href", url).text(url))),
            )
            .into()
    }

    fn prompt(&self) -> View {
        Element::new("div")
            .class("weft-card")
            .class("weft-gist-prompt")
            .child(Element::new("h5").text(self.context.label(keys::GIST_TITLE)))
            .child(
                View::input(URL_FIELD, &self.draft, "https://gist.github.com/...")
                    .attr("aria-label", self.context.label(keys::GIST_PROMPT)),
            )
            .child(Chrome::new(&*self.context.labels, self.is_preview).build())
            .into()
    }

    fn submit(&mut self) {
        match normalize_gist_url(&self.draft) {
            Some(url) => {
                if let Err(error) = self.controller.set_attribute(URL_FIELD, url) {
                    tracing::warn!(target: "weft::widget", widget_type = WIDGET_TYPE, %error, "could not store gist url");
                }
            }
            None => {
                tracing::debug!(target: "weft::widget", widget_type = WIDGET_TYPE, input = %self.draft, "ignoring non-gist url");
            }
        }
    }
}

impl WidgetMount for GistWidget {
    fn view(&self) -> View {
        match &self.url {
            Some(url) => self.embed(url),
            None => self.prompt(),
        }
    }

    fn handle(&mut self, event: WidgetEvent) -> Effects {
        match event {
            WidgetEvent::Input { field, value } if field == URL_FIELD => self.draft = value,
            WidgetEvent::Submit { field } if field == URL_FIELD => self.submit(),
            WidgetEvent::Action(action) if action == ACTION_DELETE && !self.is_preview => {
                self.controller.remove_self();
            }
            other => {
                tracing::trace!(target: "weft::widget", widget_type = WIDGET_TYPE, event = ?other, "unhandled event");
            }
        }
        Effects::none()
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.draft.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_gist_url() {
        assert_eq!(
            normalize_gist_url("https://gist.github.com/someone/abc123?file=x#L1"),
            Some("https://gist.github.com/someone/abc123".into())
        );
        assert_eq!(
            normalize_gist_url("  https://gist.github.com/a/b  "),
            Some("https://gist.github.com/a/b".into())
        );
        assert_eq!(normalize_gist_url("https://github.com/someone/abc123"), None);
        assert_eq!(normalize_gist_url("http://gist.github.com/someone/abc123"), None);
        assert_eq!(normalize_gist_url("https://gist.github.com.evil.example/x"), None);
        assert_eq!(normalize_gist_url("not a url"), None);
        assert_eq!(normalize_gist_url(""), None);
    }
}
