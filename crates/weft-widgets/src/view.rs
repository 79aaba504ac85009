//! Framework-neutral view tree produced by widget mounts.
//!
//! Mounts describe what they show as a small element tree. Interactive
//! elements carry `data-action` (buttons) or `data-field` (inputs) so a host
//! can route user input back as [`WidgetEvent`](crate::mount::WidgetEvent)s.
//! [`View::to_html`] is the reference rendering.

use std::fmt;

use pulldown_cmark_escape::{FmtWriter, StrWrite, escape_html};
use smol_str::SmolStr;

pub const ACTION_ATTR: &str = "data-action";
pub const FIELD_ATTR: &str = "data-field";

const VOID_TAGS: &[&str] = &["img", "input", "br", "hr"];

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Element(Element),
    Text(SmolStr),
    /// Pre-rendered markup from a trusted renderer.
    Html(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: SmolStr,
    pub classes: Vec<SmolStr>,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<View>,
}

impl Element {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn class(mut self, class: impl Into<SmolStr>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        let child = child.into();
        if child != View::Empty {
            self.children.push(child);
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = View>) -> Self {
        for child in children {
            self = self.child(child);
        }
        self
    }

    pub fn text(self, text: impl Into<SmolStr>) -> Self {
        self.child(View::Text(text.into()))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl From<Element> for View {
    fn from(element: Element) -> Self {
        View::Element(element)
    }
}

impl View {
    pub fn el(tag: impl Into<SmolStr>) -> Element {
        Element::new(tag)
    }

    pub fn text(text: impl Into<SmolStr>) -> View {
        View::Text(text.into())
    }

    /// A button that dispatches `action` when pressed.
    pub fn button(action: &str, label: impl Into<SmolStr>) -> Element {
        let label = label.into();
        Element::new("button")
            .attr(ACTION_ATTR, action)
            .attr("title", label.as_str())
            .text(label)
    }

    /// A single-line input bound to `field`.
    pub fn input(field: &str, value: &str, placeholder: &str) -> Element {
        Element::new("input")
            .attr("type", "text")
            .attr(FIELD_ATTR, field)
            .attr("value", value)
            .attr("placeholder", placeholder)
    }

    /// Depth-first walk over every element.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Element)) {
        if let View::Element(el) = self {
            f(el);
            for child in &el.children {
                child.walk(f);
            }
        }
    }

    /// Every action exposed by buttons in this tree, in order.
    pub fn actions(&self) -> Vec<SmolStr> {
        let mut out = Vec::new();
        self.walk(&mut |el| {
            if let Some(action) = el.get_attr(ACTION_ATTR) {
                out.push(SmolStr::new(action));
            }
        });
        out
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions().iter().any(|a| a == action)
    }

    /// Every input field name in this tree, in order.
    pub fn fields(&self) -> Vec<SmolStr> {
        let mut out = Vec::new();
        self.walk(&mut |el| {
            if let Some(field) = el.get_attr(FIELD_ATTR) {
                out.push(SmolStr::new(field));
            }
        });
        out
    }

    /// First element carrying `class`.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        let mut found = None;
        self.walk(&mut |el| {
            if found.is_none() && el.has_class(class) {
                found = Some(el);
            }
        });
        found
    }

    /// Concatenated text nodes. Pre-rendered HTML is included verbatim.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            View::Text(t) => out.push_str(t),
            View::Html(h) => out.push_str(h),
            View::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            View::Empty => {}
        }
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }

    /// Render into any escaping writer.
    pub fn write_html<W: StrWrite>(&self, out: &mut W) -> Result<(), W::Error> {
        match self {
            View::Text(text) => escape_html(&mut *out, text)?,
            View::Html(html) => out.write_str(html)?,
            View::Empty => {}
            View::Element(el) => {
                out.write_str("<")?;
                out.write_str(&el.tag)?;
                if !el.classes.is_empty() {
                    out.write_str(" class=\"")?;
                    escape_html(&mut *out, &el.classes.join(" "))?;
                    out.write_str("\"")?;
                }
                for (name, value) in &el.attrs {
                    out.write_str(" ")?;
                    out.write_str(name)?;
                    out.write_str("=\"")?;
                    escape_html(&mut *out, value)?;
                    out.write_str("\"")?;
                }
                out.write_str(">")?;
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return Ok(());
                }
                for child in &el.children {
                    child.write_html(out)?;
                }
                out.write_str("</")?;
                out.write_str(&el.tag)?;
                out.write_str(">")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_html(&mut FmtWriter(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> View {
        View::el("div")
            .class("card")
            .child(View::el("h5").text("Title <b>"))
            .child(View::input("url", "a\"b", "paste a link"))
            .child(View::button("delete", "Delete"))
            .child(View::Empty)
            .into()
    }

    #[test]
    fn test_actions_and_fields() {
        let view = sample();
        assert_eq!(view.actions(), vec![SmolStr::new("delete")]);
        assert!(view.has_action("delete"));
        assert!(!view.has_action("edit"));
        assert_eq!(view.fields(), vec![SmolStr::new("url")]);
        assert!(view.find_class("card").is_some());
    }

    #[test]
    fn test_empty_children_are_dropped() {
        let View::Element(el) = sample() else {
            panic!("expected element");
        };
        assert_eq!(el.children.len(), 3);
    }

    #[test]
    fn test_write_html_appends() {
        let mut out = String::from("<main>");
        sample().write_html(&mut out).expect("writing to a string");
        assert!(out.starts_with("<main><div class=\"card\"><h5>"));
        assert_eq!(out.len(), "<main>".len() + sample().to_html().len());
    }

    #[test]
    fn test_to_html_escapes() {
        insta::assert_snapshot!(sample().to_html(), @r#"<div class="card"><h5>Title &lt;b&gt;</h5><input type="text" data-field="url" value="a&quot;b" placeholder="paste a link"><button data-action="delete" title="Delete">Delete</button></div>"#);
    }
}
