//! Visual themes and the binding between a mount and the theme it was
//! created under.
//!
//! A mount reads the current theme exactly once, when it is created. Changing
//! the active theme afterwards does not restyle existing mounts; the next
//! render pass picks it up.

use std::cell::RefCell;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::mount::{Effects, WidgetEvent, WidgetMount};
use crate::view::View;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: SmolStr,
    pub colors: ColorScheme,
    pub fonts: FontScheme,
    pub spacing: SpacingScheme,
    /// Theme name handed to embedded sub-editors.
    pub editor_theme: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorScheme {
    pub background: SmolStr,
    pub foreground: SmolStr,
    pub link: SmolStr,
    pub link_hover: SmolStr,
    pub border: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontScheme {
    pub body: SmolStr,
    pub heading: SmolStr,
    pub monospace: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpacingScheme {
    pub base_font_size: SmolStr,
    pub line_height: SmolStr,
    pub scale: SmolStr,
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

impl Theme {
    pub fn light() -> Self {
        Self {
            name: SmolStr::new_static("light"),
            colors: ColorScheme::default(),
            fonts: FontScheme::default(),
            spacing: SpacingScheme::default(),
            editor_theme: SmolStr::new_static("rose-pine-dawn"),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: SmolStr::new_static("dark"),
            colors: ColorScheme {
                background: SmolStr::new_static("#191724"),
                foreground: SmolStr::new_static("#e0def4"),
                link: SmolStr::new_static("#9ccfd8"),
                link_hover: SmolStr::new_static("#c4a7e7"),
                border: SmolStr::new_static("#403d52"),
            },
            fonts: FontScheme::default(),
            spacing: SpacingScheme::default(),
            editor_theme: SmolStr::new_static("rose-pine"),
        }
    }

    /// CSS custom properties for this theme, in a stable order.
    pub fn css_variables(&self) -> Vec<(&'static str, &SmolStr)> {
        vec![
            ("--weft-bg", &self.colors.background),
            ("--weft-fg", &self.colors.foreground),
            ("--weft-link", &self.colors.link),
            ("--weft-link-hover", &self.colors.link_hover),
            ("--weft-border", &self.colors.border),
            ("--weft-font-body", &self.fonts.body),
            ("--weft-font-heading", &self.fonts.heading),
            ("--weft-font-mono", &self.fonts.monospace),
            ("--weft-font-size", &self.spacing.base_font_size),
            ("--weft-line-height", &self.spacing.line_height),
            ("--weft-scale", &self.spacing.scale),
        ]
    }

    pub fn inline_style(&self) -> String {
        self.css_variables()
            .into_iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            background: SmolStr::new_static("#faf4ed"),
            foreground: SmolStr::new_static("#2b303b"),
            link: SmolStr::new_static("#286983"),
            link_hover: SmolStr::new_static("#56949f"),
            border: SmolStr::new_static("#dfdad9"),
        }
    }
}

impl Default for FontScheme {
    fn default() -> Self {
        Self {
            body: SmolStr::new_static(
                "IBM Plex, system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif",
            ),
            heading: SmolStr::new_static(
                "IBM Plex Sans, system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif",
            ),
            monospace: SmolStr::new_static(
                "'IBM Plex Mono', 'Berkeley Mono', 'Cascadia Code', 'Roboto Mono', Consolas, monospace",
            ),
        }
    }
}

impl Default for SpacingScheme {
    fn default() -> Self {
        Self {
            base_font_size: SmolStr::new_static("16px"),
            line_height: SmolStr::new_static("1.6"),
            scale: SmolStr::new_static("1.25"),
        }
    }
}

/// Where mounts get the active theme from.
pub trait ThemeSource {
    fn current(&self) -> Arc<Theme>;
}

impl ThemeSource for Arc<Theme> {
    fn current(&self) -> Arc<Theme> {
        self.clone()
    }
}

/// Named themes with one selected.
#[derive(Debug)]
pub struct ThemeManager {
    themes: Vec<Arc<Theme>>,
    active: RefCell<Arc<Theme>>,
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeManager {
    /// Manager with the built-in light and dark themes, light selected.
    pub fn new() -> Self {
        let light = Arc::new(Theme::light());
        Self {
            themes: vec![light.clone(), Arc::new(Theme::dark())],
            active: RefCell::new(light),
        }
    }

    /// Add or replace a theme by name.
    pub fn add(&mut self, theme: Theme) {
        let theme = Arc::new(theme);
        match self.themes.iter_mut().find(|t| t.name == theme.name) {
            Some(slot) => *slot = theme,
            None => self.themes.push(theme),
        }
    }

    pub fn names(&self) -> Vec<SmolStr> {
        self.themes.iter().map(|t| t.name.clone()).collect()
    }

    /// Switch the active theme. Unknown names are ignored.
    pub fn select(&self, name: &str) -> bool {
        match self.themes.iter().find(|t| t.name == name) {
            Some(theme) => {
                *self.active.borrow_mut() = theme.clone();
                tracing::debug!(target: "weft::theme", theme = name, "theme selected");
                true
            }
            None => {
                tracing::warn!(target: "weft::theme", theme = name, "unknown theme, keeping current");
                false
            }
        }
    }
}

impl ThemeSource for ThemeManager {
    fn current(&self) -> Arc<Theme> {
        self.active.borrow().clone()
    }
}

/// A mount wrapped in the theme it was created under.
pub struct ThemedMount {
    theme: Arc<Theme>,
    inner: Box<dyn WidgetMount>,
}

impl ThemedMount {
    pub fn new(theme: Arc<Theme>, inner: Box<dyn WidgetMount>) -> Self {
        Self { theme, inner }
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }
}

impl WidgetMount for ThemedMount {
    fn view(&self) -> View {
        View::el("div")
            .class("weft-widget")
            .attr("data-theme", self.theme.name.as_str())
            .attr("style", self.theme.inline_style())
            .child(self.inner.view())
            .into()
    }

    fn handle(&mut self, event: WidgetEvent) -> Effects {
        self.inner.handle(event)
    }

    fn mounted(&mut self) -> Effects {
        self.inner.mounted()
    }

    fn dispose(&mut self) {
        self.inner.dispose()
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}
