//! Item category vocabulary shared by catalog items and departments.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Catalog item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Drinks,
    Food,
    Supplies,
    Toiletries,
    Misc,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Drinks,
        Category::Food,
        Category::Supplies,
        Category::Toiletries,
        Category::Misc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Drinks => "drinks",
            Category::Food => "food",
            Category::Supplies => "supplies",
            Category::Toiletries => "toiletries",
            Category::Misc => "misc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DomainError::configuration(format!("unknown category '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Drinks".parse::<Category>().unwrap(), Category::Drinks);
        assert_eq!(" misc ".parse::<Category>().unwrap(), Category::Misc);
        assert!(matches!(
            "beverages".parse::<Category>(),
            Err(DomainError::Configuration(_))
        ));
    }
}
