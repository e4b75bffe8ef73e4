//! Composite department codes.
//!
//! A department code encodes a variable-depth hierarchy with `:` separators:
//!
//! ```text
//! bar                  -> Base
//! restaurant:main      -> BaseWithSection
//! bar:3f2a:terrace     -> BaseWithEntityAndSection
//! ```
//!
//! Every caller goes through [`DepartmentCode::parse`]; nothing else slices
//! code strings.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult};

const CODE_SEPARATOR: &str = ":";
const LEDGER_KEY_SEPARATOR: &str = "-";

/// Parsed composite department code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum DepartmentCode {
    Base {
        base: String,
    },
    BaseWithSection {
        base: String,
        section: String,
    },
    BaseWithEntityAndSection {
        base: String,
        entity_id: String,
        section: String,
    },
}

impl DepartmentCode {
    /// Parse a raw code. Surrounding whitespace is ignored.
    ///
    /// Fails with `InvalidCode` for empty input, an empty token, or more than
    /// three tokens.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(DomainError::invalid_code("code cannot be empty"));
        }

        let tokens: Vec<&str> = code.split(CODE_SEPARATOR).map(str::trim).collect();
        if let Some(pos) = tokens.iter().position(|t| t.is_empty()) {
            return Err(DomainError::invalid_code(format!(
                "'{code}' has an empty token at position {pos}"
            )));
        }

        match tokens.as_slice() {
            [base] => Ok(Self::Base {
                base: (*base).to_string(),
            }),
            [base, section] => Ok(Self::BaseWithSection {
                base: (*base).to_string(),
                section: (*section).to_string(),
            }),
            [base, entity_id, section] => Ok(Self::BaseWithEntityAndSection {
                base: (*base).to_string(),
                entity_id: (*entity_id).to_string(),
                section: (*section).to_string(),
            }),
            _ => Err(DomainError::invalid_code(format!(
                "'{code}' has {} tokens (at most 3 allowed)",
                tokens.len()
            ))),
        }
    }

    /// First token: the base department (and category) code.
    pub fn base_code(&self) -> &str {
        match self {
            Self::Base { base }
            | Self::BaseWithSection { base, .. }
            | Self::BaseWithEntityAndSection { base, .. } => base.as_str(),
        }
    }

    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::BaseWithEntityAndSection { entity_id, .. } => Some(entity_id.as_str()),
            _ => None,
        }
    }

    pub fn section(&self) -> Option<&str> {
        match self {
            Self::Base { .. } => None,
            Self::BaseWithSection { section, .. }
            | Self::BaseWithEntityAndSection { section, .. } => Some(section.as_str()),
        }
    }

    fn tokens(&self) -> Vec<&str> {
        let mut tokens = vec![self.base_code()];
        tokens.extend(self.entity_id());
        tokens.extend(self.section());
        tokens
    }

    /// The tokens re-joined with `-`, used as the `defaultSectionId` lookup key.
    pub fn ledger_key(&self) -> String {
        self.tokens().join(LEDGER_KEY_SEPARATOR)
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(CODE_SEPARATOR))
    }
}

impl FromStr for DepartmentCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a raw department code.
pub fn parse_code(code: &str) -> DomainResult<DepartmentCode> {
    DepartmentCode::parse(code)
}

/// Section ledger key for a raw code: same split as [`parse_code`], joined with `-`.
pub fn section_ledger_key(code: &str) -> DomainResult<String> {
    DepartmentCode::parse(code).map(|c| c.ledger_key())
}
