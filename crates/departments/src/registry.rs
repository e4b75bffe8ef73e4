//! In-memory view over a set of departments.

use stockflow_core::{Category, DepartmentId, DomainError, DomainResult};

use crate::department::Department;
use crate::terminal::{TerminalDescriptor, list_terminals};

/// Department lookups used by the workflow and reconciliation services.
///
/// Built from a snapshot of the record store; it does not observe later
/// writes.
#[derive(Debug, Clone, Default)]
pub struct DepartmentRegistry {
    departments: Vec<Department>,
}

impl DepartmentRegistry {
    pub fn new(departments: Vec<Department>) -> Self {
        Self { departments }
    }

    pub fn all(&self) -> &[Department] {
        &self.departments
    }

    pub fn find(&self, id: DepartmentId) -> DomainResult<&Department> {
        self.departments
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| DomainError::not_found(format!("department {id}")))
    }

    pub fn by_code(&self, code: &str) -> Option<&Department> {
        let code = code.trim();
        self.departments.iter().find(|d| d.code == code)
    }

    /// Active departments whose effective category equals `category`.
    ///
    /// Departments with unparseable codes cannot be categorised and are left
    /// out.
    pub fn active_in_category(&self, category: Category) -> Vec<&Department> {
        self.departments
            .iter()
            .filter(|d| d.is_active)
            .filter(|d| match d.category() {
                Ok(c) => c == category,
                Err(err) => {
                    tracing::warn!(
                        department_id = %d.id,
                        code = %d.code,
                        %err,
                        "skipping department with invalid code"
                    );
                    false
                }
            })
            .collect()
    }

    pub fn terminals(&self) -> Vec<TerminalDescriptor> {
        list_terminals(&self.departments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DepartmentRegistry {
        DepartmentRegistry::new(vec![
            Department::new(DepartmentId::new(), "bar:main", "Main Bar"),
            Department::new(DepartmentId::new(), "club", "Night Club"),
            Department::new(DepartmentId::new(), "bar:pool", "Pool Bar").inactive(),
            Department::new(DepartmentId::new(), "restaurant:main", "Main Restaurant"),
            Department::new(DepartmentId::new(), "bad::code", "Broken"),
        ])
    }

    #[test]
    fn active_in_category_filters_inactive_and_other_categories() {
        let reg = registry();
        let codes: Vec<&str> = reg
            .active_in_category(Category::Drinks)
            .into_iter()
            .map(|d| d.code.as_str())
            .collect();
        assert_eq!(codes, vec!["bar:main", "club"]);
    }

    #[test]
    fn find_reports_missing_department() {
        let reg = registry();
        let missing = DepartmentId::new();
        assert!(matches!(reg.find(missing), Err(DomainError::NotFound(_))));
        let first = reg.all()[0].id;
        assert_eq!(reg.find(first).unwrap().code, "bar:main");
    }

    #[test]
    fn by_code_matches_exact_code() {
        let reg = registry();
        assert_eq!(reg.by_code(" club ").unwrap().name, "Night Club");
        assert!(reg.by_code("bar").is_none());
    }
}
