//! Widget type registry.
//!
//! Built once at startup, then frozen. Lookups on the frozen registry take no
//! lock and the registry can be shared across threads behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::builtins;
use crate::marker;
use crate::mount::{Factory, WidgetArgs, WidgetMount};

#[derive(Default)]
pub struct RegistryBuilder {
    creators: HashMap<SmolStr, Factory>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a creator for `widget_type`.
    ///
    /// A second registration for the same type replaces the first. Invalid
    /// type identifiers are logged and ignored.
    pub fn register<F>(&mut self, widget_type: &str, creator: F) -> &mut Self
    where
        F: Fn(WidgetArgs) -> Option<Box<dyn WidgetMount>> + Send + Sync + 'static,
    {
        self.register_factory(widget_type, Arc::new(creator))
    }

    pub fn register_factory(&mut self, widget_type: &str, factory: Factory) -> &mut Self {
        if !marker::is_valid_type(widget_type) {
            tracing::error!(target: "weft::registry", widget_type, "refusing to register invalid widget type");
            return self;
        }
        if self.creators.insert(SmolStr::new(widget_type), factory).is_some() {
            tracing::warn!(target: "weft::registry", widget_type, "widget type registered twice, replacing creator");
        } else {
            tracing::debug!(target: "weft::registry", widget_type, "widget type registered");
        }
        self
    }

    /// Register every built-in widget.
    pub fn with_builtins(&mut self) -> &mut Self {
        builtins::register_all(self);
        self
    }

    pub fn build(&mut self) -> WidgetRegistry {
        WidgetRegistry {
            creators: std::mem::take(&mut self.creators),
        }
    }
}

/// Frozen mapping from widget type to creator.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    creators: HashMap<SmolStr, Factory>,
}

impl WidgetRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry holding only the built-in widgets.
    pub fn with_builtins() -> Self {
        Self::builder().with_builtins().build()
    }

    pub fn lookup(&self, widget_type: &str) -> Option<Factory> {
        self.creators.get(widget_type).cloned()
    }

    pub fn contains(&self, widget_type: &str) -> bool {
        self.creators.contains_key(widget_type)
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<SmolStr> {
        let mut types: Vec<SmolStr> = self.creators.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRegistry").field("types", &self.types()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use weft_editor_core::SourceDocument;

    use super::*;
    use crate::controller::WidgetController;
    use crate::mount::WidgetContext;
    use crate::store::{MemoryStore, Owner};
    use crate::theme::Theme;
    use crate::view::View;

    struct Named(&'static str);

    impl WidgetMount for Named {
        fn view(&self) -> View {
            View::text(self.0)
        }

        fn dispose(&mut self) {}

        fn is_disposed(&self) -> bool {
            false
        }
    }

    fn args(text: &str) -> WidgetArgs {
        let source = SourceDocument::shared(text);
        let found = marker::scan(text).remove(0);
        WidgetArgs {
            widget_type: found.widget_type.clone(),
            attributes: found.attributes.clone(),
            controller: WidgetController::new(source, &found, 0),
            is_preview: false,
            context: WidgetContext::new(Rc::new(MemoryStore::new(Owner::new("u1", "alice")))),
            theme: Arc::new(Theme::light()),
        }
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_registry_is_send_sync() {
        assert_send_sync::<WidgetRegistry>();
    }

    #[test]
    fn test_lookup_unknown_is_none() {
        let registry = WidgetRegistry::builder().build();
        assert!(registry.lookup("unknown-type").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let mut builder = WidgetRegistry::builder();
        builder
            .register("note", |_| Some(Box::new(Named("first"))))
            .register("note", |_| Some(Box::new(Named("second"))));
        let registry = builder.build();
        assert_eq!(registry.len(), 1);

        let factory = registry.lookup("note").expect("registered");
        let mount = factory(args("@[note]()")).expect("mounts");
        assert_eq!(mount.view().text_content(), "second");
    }

    #[test]
    fn test_invalid_type_is_ignored() {
        let registry = WidgetRegistry::builder()
            .register("has space", |_| None)
            .register("", |_| None)
            .build();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builtins_listed_sorted() {
        let registry = WidgetRegistry::with_builtins();
        assert_eq!(registry.types(), vec![SmolStr::new("cloud_widget"), SmolStr::new("github_gist")]);
    }
}
