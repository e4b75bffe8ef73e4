//! Point-of-sale terminal descriptors derived from department sections.

use serde::{Deserialize, Serialize};

use crate::department::Department;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Active,
    Inactive,
}

/// Placeholder daily aggregate; filled by the sales side, never by this core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodaySummary {
    pub count: u64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalDescriptor {
    /// The department's raw code.
    pub id: String,
    pub name: String,
    pub department_code: String,
    pub default_section_id: String,
    pub slug: String,
    pub status: TerminalStatus,
    pub today: TodaySummary,
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// One descriptor per section department, in input order.
///
/// Section departments whose code does not parse are skipped with a warning
/// rather than failing the whole listing.
pub fn list_terminals(departments: &[Department]) -> Vec<TerminalDescriptor> {
    departments
        .iter()
        .filter(|d| d.is_section())
        .filter_map(|d| match d.parsed_code() {
            Ok(code) => Some(TerminalDescriptor {
                id: d.code.clone(),
                name: d.name.clone(),
                department_code: code.base_code().to_string(),
                default_section_id: code.ledger_key(),
                slug: slugify(&d.name),
                status: if d.is_active {
                    TerminalStatus::Active
                } else {
                    TerminalStatus::Inactive
                },
                today: TodaySummary::default(),
            }),
            Err(err) => {
                tracing::warn!(
                    department_id = %d.id,
                    code = %d.code,
                    %err,
                    "skipping terminal with invalid code"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::DepartmentId;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Main Restaurant"), "main-restaurant");
        assert_eq!(slugify("  Bar & Clubs -- Pool!  "), "bar-clubs-pool");
        assert_eq!(slugify("Café 2"), "caf-2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn only_sections_become_terminals_in_input_order() {
        let departments = vec![
            Department::new(DepartmentId::new(), "restaurant:main", "Main Restaurant"),
            Department::new(DepartmentId::new(), "restaurant", "Restaurant"),
            Department::new(DepartmentId::new(), "bar:7:terrace", "Terrace Bar").inactive(),
            Department::new(DepartmentId::new(), "spa", "Spa Desk").tagged_as_section(),
        ];

        let terminals = list_terminals(&departments);
        let ids: Vec<&str> = terminals.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["restaurant:main", "bar:7:terrace", "spa"]);

        assert_eq!(terminals[0].department_code, "restaurant");
        assert_eq!(terminals[0].default_section_id, "restaurant-main");
        assert_eq!(terminals[0].slug, "main-restaurant");
        assert_eq!(terminals[0].status, TerminalStatus::Active);

        assert_eq!(terminals[1].default_section_id, "bar-7-terrace");
        assert_eq!(terminals[1].status, TerminalStatus::Inactive);

        assert_eq!(terminals[2].department_code, "spa");
        assert_eq!(terminals[2].default_section_id, "spa");
    }

    #[test]
    fn invalid_section_codes_are_skipped() {
        let departments = vec![
            Department::new(DepartmentId::new(), "bar::x", "Broken"),
            Department::new(DepartmentId::new(), "bar:main", "Main Bar"),
        ];
        let terminals = list_terminals(&departments);
        assert_eq!(terminals.len(), 1);
        assert_eq!(terminals[0].id, "bar:main");
    }

    #[test]
    fn descriptor_serializes_with_external_field_names() {
        let departments = vec![Department::new(DepartmentId::new(), "bar:main", "Main Bar")];
        let json = serde_json::to_value(&list_terminals(&departments)[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "bar:main",
                "name": "Main Bar",
                "departmentCode": "bar",
                "defaultSectionId": "bar-main",
                "slug": "main-bar",
                "status": "active",
                "today": { "count": 0, "total": 0 }
            })
        );
    }
}
