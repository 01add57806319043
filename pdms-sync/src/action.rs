use crate::props::category;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An upstream reconciliation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncAction {
    /// Create or update the functions behind function-group shapes.
    PushFunctionGroups,
    /// Create or update the functions behind function-element shapes.
    PushFunctionElements,
    /// Attach the materials placed on the diagram to their enclosing zones.
    PushZoneMaterials,
}

impl SyncAction {
    pub const fn all() -> [SyncAction; 3] {
        [
            Self::PushFunctionGroups,
            Self::PushFunctionElements,
            Self::PushZoneMaterials,
        ]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PushFunctionGroups => "push-function-groups",
            Self::PushFunctionElements => "push-function-elements",
            Self::PushZoneMaterials => "push-zone-materials",
        }
    }

    /// Shape category the action collects.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::PushFunctionGroups => category::FUNCTION_GROUP,
            Self::PushFunctionElements => category::FUNCTION_ELEMENT,
            Self::PushZoneMaterials => category::MATERIAL,
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sync action: {s}"))
    }
}
