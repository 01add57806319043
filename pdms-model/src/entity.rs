use pdms_tree::TreeNode;
use pdms_types::{FunctionId, MaterialId, ProjectId, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A record type that can be fetched from the backend and cached.
pub trait RemoteEntity: Clone + Send + Sync + 'static {
    type Id: RecordId;

    fn id(&self) -> Self::Id;

    /// Secondary lookup key, for record kinds addressable by code.
    fn code(&self) -> Option<&str> {
        None
    }
}

/// Position of a function in the plant breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Zone,
    Group,
    Unit,
    Element,
    Instrument,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zone => "zone",
            Self::Group => "group",
            Self::Unit => "unit",
            Self::Element => "element",
            Self::Instrument => "instrument",
        })
    }
}

/// A process function (zone, group, unit, element or instrument).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    #[serde(default)]
    pub parent_id: Option<FunctionId>,
    pub project_id: ProjectId,
    pub kind: FunctionKind,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Function {
    pub fn is_zone(&self) -> bool {
        self.kind == FunctionKind::Zone
    }
}

impl RemoteEntity for Function {
    type Id = FunctionId;

    fn id(&self) -> FunctionId {
        self.id
    }

    fn code(&self) -> Option<&str> {
        Some(&self.code)
    }
}

impl TreeNode for Function {
    type Id = FunctionId;

    fn id(&self) -> FunctionId {
        self.id
    }

    fn parent_id(&self) -> Option<FunctionId> {
        self.parent_id
    }

    fn node_name(&self) -> &str {
        &self.name
    }
}

/// A material from the material catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl RemoteEntity for Material {
    type Id = MaterialId;

    fn id(&self) -> MaterialId {
        self.id
    }

    fn code(&self) -> Option<&str> {
        Some(&self.code)
    }
}

/// A project, the root every function belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteEntity for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }
}

impl TreeNode for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }

    fn parent_id(&self) -> Option<ProjectId> {
        None
    }

    fn node_name(&self) -> &str {
        &self.name
    }
}
