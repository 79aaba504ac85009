//! Remote store for persisted widgets.
//!
//! The store owns widget metadata (description, source link, owner) keyed by
//! id. Documents only reference widgets by id. Futures returned here are not
//! `Send`: the widget subsystem lives on one UI thread.

use std::cell::{Cell, RefCell};

use futures_util::future::{self, LocalBoxFuture};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: SmolStr,
    pub username: SmolStr,
    /// Avatar image URL. Empty or missing means no avatar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Owner {
    pub fn new(id: impl Into<SmolStr>, username: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Widget state as the store reports it to the current viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedWidget {
    pub id: SmolStr,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub owner: Owner,
    /// Whether the current viewer may edit or delete it.
    #[serde(default)]
    pub can_configure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewWidget {
    pub description: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Mutable fields of a persisted widget.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WidgetFields {
    pub description: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl PersistedWidget {
    pub fn fields(&self) -> WidgetFields {
        WidgetFields {
            description: self.description.clone(),
            source: self.source.clone(),
        }
    }

    pub fn apply(&mut self, fields: WidgetFields) {
        self.description = fields.description;
        self.source = fields.source;
    }
}

pub trait WidgetStore {
    fn get<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, Result<Option<PersistedWidget>, StoreError>>;

    fn create(&self, input: NewWidget) -> LocalBoxFuture<'_, Result<PersistedWidget, StoreError>>;

    fn update<'a>(
        &'a self,
        id: &'a str,
        fields: WidgetFields,
    ) -> LocalBoxFuture<'a, Result<PersistedWidget, StoreError>>;

    /// `Ok(false)` when there was nothing to delete.
    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, Result<bool, StoreError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get(SmolStr),
    Create,
    Update(SmolStr),
    Delete(SmolStr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredWidget {
    id: SmolStr,
    description: String,
    #[serde(default)]
    source: Option<String>,
    owner: Owner,
}

/// In-process store. Resolves immediately.
///
/// Viewer identity decides `can_configure`: only the owner may change a
/// widget. Going offline makes every call fail with [`StoreError::Offline`].
#[derive(Debug)]
pub struct MemoryStore {
    viewer: Owner,
    widgets: RefCell<IndexMap<SmolStr, StoredWidget>>,
    offline: Cell<bool>,
    next_id: Cell<u64>,
    calls: RefCell<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new(viewer: Owner) -> Self {
        Self {
            viewer,
            widgets: RefCell::new(IndexMap::new()),
            offline: Cell::new(false),
            next_id: Cell::new(1),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn viewer(&self) -> &Owner {
        &self.viewer
    }

    /// Seed a widget directly, bypassing permission checks.
    pub fn seed(&self, id: impl Into<SmolStr>, owner: Owner, description: impl Into<String>, source: Option<String>) {
        let id = id.into();
        self.widgets.borrow_mut().insert(
            id.clone(),
            StoredWidget {
                id,
                description: description.into(),
                source,
                owner,
            },
        );
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Server-side state, as the current viewer would see it.
    pub fn peek(&self, id: &str) -> Option<PersistedWidget> {
        self.widgets.borrow().get(id).map(|w| self.view_of(w))
    }

    pub fn len(&self) -> usize {
        self.widgets.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.borrow().is_empty()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    /// Load widgets from a JSON array of stored records.
    pub fn load_json(&self, json: &str) -> Result<usize, serde_json::Error> {
        let records: Vec<StoredWidget> = serde_json::from_str(json)?;
        let count = records.len();
        let mut widgets = self.widgets.borrow_mut();
        for record in records {
            widgets.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let widgets = self.widgets.borrow();
        let records: Vec<&StoredWidget> = widgets.values().collect();
        serde_json::to_string_pretty(&records)
    }

    fn view_of(&self, stored: &StoredWidget) -> PersistedWidget {
        PersistedWidget {
            id: stored.id.clone(),
            description: stored.description.clone(),
            source: stored.source.clone(),
            owner: stored.owner.clone(),
            can_configure: stored.owner.id == self.viewer.id,
        }
    }

    fn check_online(&self, call: StoreCall) -> Result<(), StoreError> {
        tracing::trace!(target: "weft::store", ?call, "memory store call");
        self.calls.borrow_mut().push(call);
        if self.offline.get() {
            return Err(StoreError::Offline("memory store is offline".into()));
        }
        Ok(())
    }

    fn get_now(&self, id: &str) -> Result<Option<PersistedWidget>, StoreError> {
        self.check_online(StoreCall::Get(id.into()))?;
        Ok(self.peek(id))
    }

    fn create_now(&self, input: NewWidget) -> Result<PersistedWidget, StoreError> {
        self.check_online(StoreCall::Create)?;
        let id = loop {
            let n = self.next_id.get();
            self.next_id.set(n + 1);
            let id = format_smolstr!("w{n}");
            if !self.widgets.borrow().contains_key(&id) {
                break id;
            }
        };
        let stored = StoredWidget {
            id: id.clone(),
            description: input.description,
            source: input.source,
            owner: self.viewer.clone(),
        };
        let view = self.view_of(&stored);
        self.widgets.borrow_mut().insert(id, stored);
        Ok(view)
    }

    fn update_now(&self, id: &str, fields: WidgetFields) -> Result<PersistedWidget, StoreError> {
        self.check_online(StoreCall::Update(id.into()))?;
        let mut widgets = self.widgets.borrow_mut();
        let stored = widgets.get_mut(id).ok_or_else(|| StoreError::NotFound(id.into()))?;
        if stored.owner.id != self.viewer.id {
            return Err(StoreError::Forbidden(id.into()));
        }
        stored.description = fields.description;
        stored.source = fields.source;
        Ok(self.view_of(stored))
    }

    fn delete_now(&self, id: &str) -> Result<bool, StoreError> {
        self.check_online(StoreCall::Delete(id.into()))?;
        let mut widgets = self.widgets.borrow_mut();
        match widgets.get(id) {
            None => Ok(false),
            Some(stored) if stored.owner.id != self.viewer.id => Err(StoreError::Forbidden(id.into())),
            Some(_) => Ok(widgets.shift_remove(id).is_some()),
        }
    }
}

impl WidgetStore for MemoryStore {
    fn get<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, Result<Option<PersistedWidget>, StoreError>> {
        Box::pin(future::ready(self.get_now(id)))
    }

    fn create(&self, input: NewWidget) -> LocalBoxFuture<'_, Result<PersistedWidget, StoreError>> {
        Box::pin(future::ready(self.create_now(input)))
    }

    fn update<'a>(
        &'a self,
        id: &'a str,
        fields: WidgetFields,
    ) -> LocalBoxFuture<'a, Result<PersistedWidget, StoreError>> {
        Box::pin(future::ready(self.update_now(id, fields)))
    }

    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(future::ready(self.delete_now(id)))
    }
}
