//! Home Assistant entity states
//!
//! The live state table the frontend keeps (`hass.states`). Only the parts
//! domain lookup needs are modelled; everything else in `attributes` is
//! kept as raw JSON.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BrandError, BrandResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn entity_picture(&self) -> Option<&str> {
        self.attributes.get("entity_picture")?.as_str()
    }
}

/// Shared, live view of the state table.
///
/// Clones share the same table, so updates made by the host are seen by
/// lookups that run later.
#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    states: Rc<RefCell<HashMap<String, EntityState>>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{ "<entity_id>": { ...state } }` object
    pub fn from_json(json: &str) -> BrandResult<Self> {
        let states: HashMap<String, EntityState> =
            serde_json::from_str(json).map_err(|e| BrandError::Config(e.to_string()))?;
        Ok(Self {
            states: Rc::new(RefCell::new(states)),
        })
    }

    pub fn set(&self, state: EntityState) {
        self.states.borrow_mut().insert(state.entity_id.clone(), state);
    }

    pub fn remove(&self, entity_id: &str) -> Option<EntityState> {
        self.states.borrow_mut().remove(entity_id)
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.borrow().get(entity_id).cloned()
    }

    pub fn entity_picture(&self, entity_id: &str) -> Option<String> {
        self.states
            .borrow()
            .get(entity_id)
            .and_then(EntityState::entity_picture)
            .map(str::to_string)
    }

    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let states = StateRegistry::from_json(
            r#"{
                "update.sun_firmware": {
                    "entity_id": "update.sun_firmware",
                    "state": "off",
                    "attributes": { "entity_picture": "/api/brands/sun/icon.png", "title": "Sun" }
                },
                "light.kitchen": { "entity_id": "light.kitchen" }
            }"#,
        )
        .unwrap();

        assert_eq!(states.len(), 2);
        assert_eq!(
            states.entity_picture("update.sun_firmware").as_deref(),
            Some("/api/brands/sun/icon.png")
        );
        assert_eq!(states.entity_picture("light.kitchen"), None);
        assert_eq!(states.get("update.sun_firmware").map(|s| s.state), Some("off".into()));
    }

    #[test]
    fn test_clones_share_table() {
        let states = StateRegistry::new();
        let view = states.clone();
        states.set(EntityState::new("sensor.a").with_attribute("entity_picture", "/a.png"));
        assert_eq!(view.entity_picture("sensor.a").as_deref(), Some("/a.png"));

        view.remove("sensor.a");
        assert!(states.is_empty());
    }
}
