//! Compound keys addressing a single shape.
//!
//! A key names a document, a top-level shape inside it and, for shapes
//! nested inside groups, the path of sub-shape ids below that shape.
//! Keys are plain values: cheap to clone, totally ordered, never mutated.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an open diagram document inside the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u32);

impl DocumentId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a shape, unique within its containing page or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(u32);

impl ShapeId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses one shape within one document.
///
/// Two keys are equal iff document, shape and sub-path are all equal.
/// Ordering is lexicographic over the same components, so keys sort by
/// document first and nested shapes sort right after their container.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompoundKey {
    document: DocumentId,
    shape: ShapeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub_path: Vec<ShapeId>,
}

impl CompoundKey {
    /// Key for a top-level shape.
    #[must_use]
    pub fn new(document: DocumentId, shape: ShapeId) -> Self {
        Self {
            document,
            shape,
            sub_path: Vec::new(),
        }
    }

    /// Key for a shape nested below `shape` along `sub_path`.
    #[must_use]
    pub fn nested(document: DocumentId, shape: ShapeId, sub_path: Vec<ShapeId>) -> Self {
        Self {
            document,
            shape,
            sub_path,
        }
    }

    /// Returns a key for the sub-shape `sub` inside this shape.
    #[must_use]
    pub fn child(&self, sub: ShapeId) -> Self {
        let mut sub_path = self.sub_path.clone();
        sub_path.push(sub);
        Self {
            document: self.document,
            shape: self.shape,
            sub_path,
        }
    }

    /// Returns the key of the containing group shape, if this key is nested.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.sub_path.is_empty() {
            return None;
        }
        let mut sub_path = self.sub_path.clone();
        sub_path.pop();
        Some(Self {
            document: self.document,
            shape: self.shape,
            sub_path,
        })
    }

    #[must_use]
    pub const fn document(&self) -> DocumentId {
        self.document
    }

    #[must_use]
    pub const fn shape(&self) -> ShapeId {
        self.shape
    }

    #[must_use]
    pub fn sub_path(&self) -> &[ShapeId] {
        &self.sub_path
    }

    /// Whether this key addresses a shape inside a group.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        !self.sub_path.is_empty()
    }

    /// The innermost shape id along the path.
    #[must_use]
    pub fn leaf(&self) -> ShapeId {
        self.sub_path.last().copied().unwrap_or(self.shape)
    }
}

impl fmt::Display for CompoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document, self.shape)?;
        for sub in &self.sub_path {
            write!(f, "/{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for CompoundKey {
    type Err = Error;

    /// Parses the `Display` form, `"<doc>:<shape>[/<sub>...]"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidKey(s.to_string());

        let (doc, rest) = s.split_once(':').ok_or_else(invalid)?;
        let document = DocumentId(doc.parse().map_err(|_| invalid())?);

        let mut parts = rest.split('/');
        let shape = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;

        let sub_path = parts
            .map(|p| p.parse().map(ShapeId).map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            document,
            shape: ShapeId(shape),
            sub_path,
        })
    }
}
