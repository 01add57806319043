//! Shape categories and property names shared by collection and
//! reconciliation.

/// Shape categories the sync actions collect.
pub mod category {
    /// Shapes standing for a function group.
    pub const FUNCTION_GROUP: &str = "FunctionGroup";
    /// Shapes standing for a function element.
    pub const FUNCTION_ELEMENT: &str = "FunctionElement";
    /// Material placements inside a function.
    pub const MATERIAL: &str = "Material";
}

pub const FUNCTION_ID: &str = "FunctionId";
pub const FUNCTION_CODE: &str = "FunctionCode";
pub const FUNCTION_NAME: &str = "FunctionName";
pub const FUNCTION_DESCRIPTION: &str = "FunctionDescription";
pub const PARENT_FUNCTION_ID: &str = "ParentFunctionId";
pub const MATERIAL_CODE: &str = "MaterialCode";
pub const MATERIAL_ID: &str = "MaterialId";
pub const PROJECT_ID: &str = "ProjectId";

/// Display formula that renders a property's own value.
pub fn label_formula(property: &str) -> String {
    format!("=Prop.{property}")
}
