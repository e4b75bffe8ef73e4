use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockflow_core::{Category, DepartmentId, DomainResult, Entity};

use crate::category::infer_category;
use crate::code::DepartmentCode;

/// Metadata key/value tagging a department as a point-of-sale section.
pub const SECTION_KIND_KEY: &str = "kind";
pub const SECTION_KIND_VALUE: &str = "section";

/// A department (or department section), provisioned outside this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    /// Raw composite code, e.g. `restaurant:main`.
    pub code: String,
    pub name: String,
    /// Stored category, when the provisioning side set one explicitly.
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Departments that do not track inventory hold no ledger rows; stock
    /// moved into or out of them enters or leaves the canonical total.
    #[serde(default = "default_true")]
    pub tracks_inventory: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
}

fn default_true() -> bool {
    true
}

impl Department {
    pub fn new(id: DepartmentId, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            category: None,
            is_active: true,
            tracks_inventory: true,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn untracked(mut self) -> Self {
        self.tracks_inventory = false;
        self
    }

    pub fn tagged_as_section(mut self) -> Self {
        self.metadata.insert(
            SECTION_KIND_KEY.to_string(),
            JsonValue::String(SECTION_KIND_VALUE.to_string()),
        );
        self
    }

    pub fn parsed_code(&self) -> DomainResult<DepartmentCode> {
        DepartmentCode::parse(&self.code)
    }

    /// Stored category if present, otherwise inferred from code and name.
    pub fn category(&self) -> DomainResult<Category> {
        if let Some(category) = self.category {
            return Ok(category);
        }
        let code = self.parsed_code()?;
        Ok(infer_category(&code, Some(&self.name)))
    }

    /// Section-shaped code, or explicitly tagged as a section in metadata.
    pub fn is_section(&self) -> bool {
        self.code.contains(':')
            || self
                .metadata
                .get(SECTION_KIND_KEY)
                .and_then(JsonValue::as_str)
                .is_some_and(|kind| kind == SECTION_KIND_VALUE)
    }
}

impl Entity for Department {
    type Id = DepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
