//! Department-name heuristic mapping departments onto item categories.
//!
//! The heuristic is a priority chain, not a set lookup: `rest-bar` is a drinks
//! department because the bar rule is checked before the restaurant rule.

use stockflow_core::{Category, DomainResult};

use crate::code::DepartmentCode;

/// Condition half of a category rule.
#[derive(Debug, Clone, Copy)]
enum Predicate {
    /// Base code or department name contains any of the fragments.
    Mentions(&'static [&'static str]),
    /// Base code is exactly this word.
    Is(&'static str),
}

impl Predicate {
    fn matches(self, base: &str, name: &str) -> bool {
        match self {
            Predicate::Mentions(fragments) => fragments
                .iter()
                .any(|f| base.contains(*f) || name.contains(*f)),
            Predicate::Is(word) => base == word,
        }
    }
}

/// Evaluated top to bottom; first match wins.
const CATEGORY_RULES: &[(Predicate, Category)] = &[
    (Predicate::Mentions(&["bar", "club"]), Category::Drinks),
    (Predicate::Mentions(&["rest"]), Category::Food),
    (Predicate::Is("drinks"), Category::Drinks),
    (Predicate::Is("food"), Category::Food),
    (Predicate::Is("supplies"), Category::Supplies),
    (Predicate::Is("toiletries"), Category::Toiletries),
    (Predicate::Is("misc"), Category::Misc),
];

const FALLBACK_CATEGORY: Category = Category::Supplies;

/// Infer the category of a parsed code, optionally using the department's
/// display name. Matching is case-insensitive.
pub fn infer_category(code: &DepartmentCode, name: Option<&str>) -> Category {
    let base = code.base_code().to_lowercase();
    let name = name.map(str::to_lowercase).unwrap_or_default();

    CATEGORY_RULES
        .iter()
        .find(|(predicate, _)| predicate.matches(&base, &name))
        .map(|(_, category)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}

/// Parse then infer, without a display name.
pub fn category_for(code: &str) -> DomainResult<Category> {
    let code = DepartmentCode::parse(code)?;
    Ok(infer_category(&code, None))
}
