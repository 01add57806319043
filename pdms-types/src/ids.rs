//! Identifier types for PDMS backend records.
//!
//! The backend assigns plain integer ids. Each record kind gets its own
//! newtype so a material id can never be handed to the function resolver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Common surface of the typed record ids.
pub trait RecordId:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The record kind this id addresses.
    const KIND: EntityKind;

    /// The raw backend id.
    fn raw(&self) -> i32;
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wraps a raw backend id.
            #[must_use]
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            /// Returns the raw backend id.
            #[must_use]
            pub const fn get(&self) -> i32 {
                self.0
            }
        }

        impl RecordId for $name {
            const KIND: EntityKind = $kind;

            fn raw(&self) -> i32 {
                self.0
            }
        }

        impl From<i32> for $name {
            fn from(raw: i32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

record_id!(
    /// Identifier of a process function (zone, group, unit, element...).
    FunctionId,
    EntityKind::Function
);

record_id!(
    /// Identifier of a material record.
    MaterialId,
    EntityKind::Material
);

record_id!(
    /// Identifier of a project.
    ProjectId,
    EntityKind::Project
);

/// The kind of backend record a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Material,
    Project,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 3] = [Self::Function, Self::Material, Self::Project];

    /// Stable lowercase name used in logs and URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Material => "material",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(Self::Function),
            "material" => Ok(Self::Material),
            "project" => Ok(Self::Project),
            other => Err(crate::Error::UnknownKind(other.to_string())),
        }
    }
}
