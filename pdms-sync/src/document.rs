//! Boundary to the diagram host.
//!
//! The core never talks to the host's automation surface directly. It
//! needs shape selection, a property read/write surface keyed by compound
//! key and property name, and a way to enumerate shapes by category for
//! sync collection.

use crate::error::DocumentResult;
use async_trait::async_trait;
use pdms_types::{CompoundKey, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A read-only copy of one shape's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSnapshot {
    pub key: CompoundKey,
    pub category: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ShapeSnapshot {
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Non-blank text value of a property.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(PropertyValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Integer value of a property, accepting numeric text.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropertyValue::as_i64)
    }
}

/// What the core needs from the host document.
///
/// Every call may suspend; implementations marshal onto the host's own
/// thread as required.
#[async_trait]
pub trait HostDocument: Send + Sync {
    /// Selects exactly these shapes and focuses the view on the first.
    async fn select(&self, keys: &[CompoundKey]) -> DocumentResult<()>;

    async fn contains_shape(&self, key: &CompoundKey) -> bool;

    /// Currently selected shapes, primary selection first.
    async fn current_selection(&self) -> Vec<CompoundKey>;

    async fn property_exists(&self, key: &CompoundKey, name: &str) -> DocumentResult<bool>;

    /// Creates a property whose declared type is taken from `initial`.
    async fn create_property(
        &self,
        key: &CompoundKey,
        name: &str,
        initial: &PropertyValue,
    ) -> DocumentResult<()>;

    async fn get_property(&self, key: &CompoundKey, name: &str) -> DocumentResult<PropertyValue>;

    /// Writes a value. Fails with `TypeMismatch` if the value's type differs
    /// from the property's declared type.
    async fn set_property(
        &self,
        key: &CompoundKey,
        name: &str,
        value: &PropertyValue,
    ) -> DocumentResult<()>;

    /// Attaches a display formula to a property.
    async fn set_label_formula(
        &self,
        key: &CompoundKey,
        name: &str,
        formula: &str,
    ) -> DocumentResult<()>;

    /// All shapes tagged with `category`, in key order.
    async fn find_shapes(&self, category: &str) -> DocumentResult<Vec<ShapeSnapshot>>;
}
