//! In-memory host document for tests and headless runs.

use crate::document::{HostDocument, ShapeSnapshot};
use crate::error::{DocumentError, DocumentResult};
use async_trait::async_trait;
use pdms_types::{CompoundKey, PropertyValue, ValueType};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Property {
    value: PropertyValue,
    declared: ValueType,
    label_formula: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Shape {
    category: String,
    properties: BTreeMap<String, Property>,
}

#[derive(Default)]
struct State {
    shapes: BTreeMap<CompoundKey, Shape>,
    selection: Vec<CompoundKey>,
    failing_writes: HashSet<CompoundKey>,
    broken: Option<String>,
    writes: usize,
}

/// A document held entirely in memory.
#[derive(Default)]
pub struct MemoryDocument {
    state: Mutex<State>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds (or replaces) a shape with the given properties. Each property's
    /// declared type is the type of its initial value.
    pub fn add_shape<I, N>(&self, key: CompoundKey, category: &str, properties: I)
    where
        I: IntoIterator<Item = (N, PropertyValue)>,
        N: Into<String>,
    {
        let properties = properties
            .into_iter()
            .map(|(name, value)| {
                let declared = value.value_type();
                (
                    name.into(),
                    Property {
                        value,
                        declared,
                        label_formula: None,
                    },
                )
            })
            .collect();
        self.state().shapes.insert(
            key,
            Shape {
                category: category.to_string(),
                properties,
            },
        );
    }

    pub fn remove_shape(&self, key: &CompoundKey) {
        let mut state = self.state();
        state.shapes.remove(key);
        state.selection.retain(|k| k != key);
    }

    /// Replaces the selection without validation, as a user click would.
    pub fn set_selection(&self, keys: Vec<CompoundKey>) {
        self.state().selection = keys;
    }

    /// Makes every write to this shape fail with a host error.
    pub fn fail_writes_to(&self, key: CompoundKey) {
        self.state().failing_writes.insert(key);
    }

    /// Makes shape enumeration fail, as when the host is busy or closed.
    pub fn break_enumeration(&self, reason: Option<&str>) {
        self.state().broken = reason.map(str::to_string);
    }

    pub fn value(&self, key: &CompoundKey, name: &str) -> Option<PropertyValue> {
        self.state()
            .shapes
            .get(key)
            .and_then(|s| s.properties.get(name))
            .map(|p| p.value.clone())
    }

    pub fn label_formula(&self, key: &CompoundKey, name: &str) -> Option<String> {
        self.state()
            .shapes
            .get(key)
            .and_then(|s| s.properties.get(name))
            .and_then(|p| p.label_formula.clone())
    }

    pub fn selection(&self) -> Vec<CompoundKey> {
        self.state().selection.clone()
    }

    /// Number of successful property writes (create, set, formula).
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    fn with_property<T>(
        &self,
        key: &CompoundKey,
        name: &str,
        write: bool,
        f: impl FnOnce(&mut Property) -> DocumentResult<T>,
    ) -> DocumentResult<T> {
        let mut state = self.state();
        if write && state.failing_writes.contains(key) {
            return Err(DocumentError::Host(format!("shape {key} is locked")));
        }
        let shape = state
            .shapes
            .get_mut(key)
            .ok_or_else(|| DocumentError::ShapeNotFound { key: key.clone() })?;
        let property =
            shape
                .properties
                .get_mut(name)
                .ok_or_else(|| DocumentError::PropertyNotFound {
                    key: key.clone(),
                    name: name.to_string(),
                })?;
        let out = f(property)?;
        if write {
            state.writes += 1;
        }
        Ok(out)
    }
}

#[async_trait]
impl HostDocument for MemoryDocument {
    async fn select(&self, keys: &[CompoundKey]) -> DocumentResult<()> {
        let mut state = self.state();
        if let Some(missing) = keys.iter().find(|k| !state.shapes.contains_key(*k)) {
            return Err(DocumentError::ShapeNotFound {
                key: missing.clone(),
            });
        }
        state.selection = keys.to_vec();
        Ok(())
    }

    async fn contains_shape(&self, key: &CompoundKey) -> bool {
        self.state().shapes.contains_key(key)
    }

    async fn current_selection(&self) -> Vec<CompoundKey> {
        self.state().selection.clone()
    }

    async fn property_exists(&self, key: &CompoundKey, name: &str) -> DocumentResult<bool> {
        let state = self.state();
        let shape = state
            .shapes
            .get(key)
            .ok_or_else(|| DocumentError::ShapeNotFound { key: key.clone() })?;
        Ok(shape.properties.contains_key(name))
    }

    async fn create_property(
        &self,
        key: &CompoundKey,
        name: &str,
        initial: &PropertyValue,
    ) -> DocumentResult<()> {
        let mut state = self.state();
        if state.failing_writes.contains(key) {
            return Err(DocumentError::Host(format!("shape {key} is locked")));
        }
        let shape = state
            .shapes
            .get_mut(key)
            .ok_or_else(|| DocumentError::ShapeNotFound { key: key.clone() })?;
        if shape.properties.contains_key(name) {
            return Err(DocumentError::Host(format!("property {name} already exists")));
        }
        shape.properties.insert(
            name.to_string(),
            Property {
                value: initial.clone(),
                declared: initial.value_type(),
                label_formula: None,
            },
        );
        state.writes += 1;
        Ok(())
    }

    async fn get_property(&self, key: &CompoundKey, name: &str) -> DocumentResult<PropertyValue> {
        self.with_property(key, name, false, |p| Ok(p.value.clone()))
    }

    async fn set_property(
        &self,
        key: &CompoundKey,
        name: &str,
        value: &PropertyValue,
    ) -> DocumentResult<()> {
        self.with_property(key, name, true, |p| {
            if p.declared != value.value_type() {
                return Err(DocumentError::TypeMismatch {
                    name: name.to_string(),
                    expected: p.declared,
                    actual: value.value_type(),
                });
            }
            p.value = value.clone();
            Ok(())
        })
    }

    async fn set_label_formula(
        &self,
        key: &CompoundKey,
        name: &str,
        formula: &str,
    ) -> DocumentResult<()> {
        self.with_property(key, name, true, |p| {
            p.label_formula = Some(formula.to_string());
            Ok(())
        })
    }

    async fn find_shapes(&self, category: &str) -> DocumentResult<Vec<ShapeSnapshot>> {
        let state = self.state();
        if let Some(reason) = &state.broken {
            return Err(DocumentError::Host(reason.clone()));
        }
        Ok(state
            .shapes
            .iter()
            .filter(|(_, shape)| shape.category == category)
            .map(|(key, shape)| ShapeSnapshot {
                key: key.clone(),
                category: shape.category.clone(),
                properties: shape
                    .properties
                    .iter()
                    .map(|(name, p)| (name.clone(), p.value.clone()))
                    .collect(),
            })
            .collect())
    }
}
