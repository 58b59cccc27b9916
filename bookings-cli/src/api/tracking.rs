//! Change tracking for partial create and update
//!
//! `Tracked<T>` wraps an entity together with the set of wire properties
//! that were assigned since it was created or last saved. Only those
//! properties are serialized when the container sends with
//! `SendOption::OnlySetProperties`, so a POST or PATCH never carries fields
//! the caller did not touch.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ops::Deref;

use super::container::{MergeOption, SendOption};
use super::error::Result;
use super::models::Entity;
use super::query::{EntityRef, EntitySet};

/// Where a tracked entity will be written on save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingState {
    /// Not yet on the server; saved with POST to the entity set
    Added { entity_set_path: String },
    /// Exists on the server at `edit_path`; saved with PATCH (or PUT)
    Unchanged { edit_path: String },
}

/// An entity plus the properties explicitly set on it
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    entity: T,
    changed: BTreeSet<&'static str>,
    state: TrackingState,
}

impl<T: Entity> Tracked<T> {
    pub(crate) fn added(entity: T, entity_set_path: impl Into<String>) -> Self {
        Self {
            entity,
            changed: BTreeSet::new(),
            state: TrackingState::Added {
                entity_set_path: entity_set_path.into(),
            },
        }
    }

    pub(crate) fn unchanged(entity: T, edit_path: impl Into<String>) -> Self {
        Self {
            entity,
            changed: BTreeSet::new(),
            state: TrackingState::Unchanged {
                edit_path: edit_path.into(),
            },
        }
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn into_inner(self) -> T {
        self.entity
    }

    /// Wire names of the properties set since creation or the last save
    pub fn changed_properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changed.iter().copied()
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Edit the entity in place and record `property` as set
    ///
    /// Use this for edits the generated setters don't cover, such as pushing
    /// onto a collection property.
    pub fn modify(&mut self, property: &'static str, edit: impl FnOnce(&mut T)) -> &mut Self {
        edit(&mut self.entity);
        self.changed.insert(property);
        self
    }

    /// Forget recorded changes without touching the entity values
    pub fn discard_changes(&mut self) {
        self.changed.clear();
    }

    /// JSON body for the next save
    pub fn payload(&self, send_option: SendOption) -> Result<Value> {
        let value = serde_json::to_value(&self.entity)?;
        match send_option {
            SendOption::FullProperties => Ok(value),
            SendOption::OnlySetProperties => {
                let Value::Object(mut properties) = value else {
                    return Ok(value);
                };
                properties.retain(|name, _| self.changed.contains(name.as_str()));
                Ok(Value::Object(properties))
            }
        }
    }

    /// Adopt the server's copy after a successful save
    pub(crate) fn accept_saved(&mut self, server: Option<T>, edit_path: String) {
        if let Some(server) = server {
            self.entity = server;
        }
        self.changed.clear();
        self.state = TrackingState::Unchanged { edit_path };
    }

    /// Fold a freshly fetched copy into this one according to `merge_option`
    pub(crate) fn merge(&mut self, server: T, merge_option: MergeOption) -> Result<()> {
        match merge_option {
            MergeOption::OverwriteChanges => {
                self.entity = server;
                self.changed.clear();
            }
            MergeOption::PreserveChanges => {
                let local = serde_json::to_value(&self.entity)?;
                let mut merged = match serde_json::to_value(server)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                if let Value::Object(local) = local {
                    for (name, value) in local {
                        if self.changed.contains(name.as_str()) {
                            merged.insert(name, value);
                        }
                    }
                }
                self.entity = serde_json::from_value(Value::Object(merged))?;
            }
        }
        Ok(())
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}

impl<T: Entity> EntitySet<'_, T> {
    /// Creates a data object with change tracking that can be used to POST a
    /// new entity with just the data that was set on it.
    ///
    /// The entity set's path is derived relative to the container's base URI.
    /// Persist it with `BookingsContainer::save_changes`.
    pub fn new_entity_with_change_tracking(&self) -> Result<Tracked<T>> {
        let entity_set_path = self.relative_path()?;
        log::debug!("Tracking new entity in {}", entity_set_path);
        Ok(Tracked::added(T::default(), entity_set_path))
    }
}

impl<T: Entity> EntityRef<'_, T> {
    /// Loads the entity and wraps it with change tracking so it can be
    /// PATCHed with just the data that is set or modified afterwards.
    pub async fn patch_entity_with_change_tracking(&self) -> Result<Tracked<T>> {
        let entity = self.get_value().await?;
        Ok(Tracked::unchanged(entity, self.path().to_string()))
    }
}

/// Generates typed setters on `Tracked<Entity>` that record the wire name
macro_rules! tracked_setters {
    ($entity:ty { $($setter:ident => $field:ident : $ty:ty as $wire:literal),* $(,)? }) => {
        impl $crate::api::tracking::Tracked<$entity> {
            $(
                #[doc = concat!("Set `", $wire, "` and record it as changed")]
                pub fn $setter(&mut self, value: impl Into<$ty>) -> &mut Self {
                    let value = value.into();
                    self.modify($wire, move |entity| entity.$field = Some(value))
                }
            )*
        }
    };
}

pub(crate) use tracked_setters;
