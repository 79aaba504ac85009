//! weft-widgets: inline widgets embedded in document source.
//!
//! A widget lives in the source as a marker such as
//! `@[github_gist](url="https://gist.github.com/someone/abc123")`. The
//! renderer looks the type up in a [`WidgetRegistry`], hands the creator a
//! [`WidgetController`] bound to the marker, and mounts whatever it returns.
//! Widgets change themselves only by rewriting or removing their own marker,
//! so the source stays the single ground truth.
//!
//! - [`attrs`] / [`marker`]: the textual encoding
//! - [`registry`] / [`mount`] / [`controller`]: the creator contract
//! - [`sync`] / [`store`]: widgets whose content lives in a remote store
//! - [`host`]: a reference renderer driving all of the above

pub mod attrs;
pub mod builtins;
pub mod chrome;
pub mod controller;
pub mod error;
pub mod host;
pub mod labels;
pub mod marker;
pub mod mount;
pub mod notify;
pub mod preview;
pub mod registry;
pub mod store;
pub mod subeditor;
pub mod sync;
pub mod theme;
pub mod view;

pub use attrs::Attributes;
pub use controller::{SpliceOutcome, WidgetController};
pub use error::{StoreError, WidgetError};
pub use host::{WidgetHost, WidgetOutput};
pub use marker::WidgetMarker;
pub use mount::{Effect, Effects, Factory, WidgetArgs, WidgetContext, WidgetEvent, WidgetMount};
pub use notify::{Notification, Notifier, Severity};
pub use registry::{RegistryBuilder, WidgetRegistry};
pub use store::{MemoryStore, NewWidget, Owner, PersistedWidget, WidgetFields, WidgetStore};
pub use sync::{PersistedWidgetSync, SnapshotCache, SyncPhase};
pub use theme::{Theme, ThemeManager, ThemeSource};
pub use view::View;
