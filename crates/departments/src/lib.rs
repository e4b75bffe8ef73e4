//! Department registry: composite code parsing, category inference and
//! point-of-sale terminal derivation.
//!
//! Pure domain logic (no IO). Departments themselves are provisioned
//! elsewhere; this crate only reads them.

pub mod category;
pub mod code;
pub mod department;
pub mod registry;
pub mod terminal;

pub use category::{category_for, infer_category};
pub use code::{DepartmentCode, parse_code, section_ledger_key};
pub use department::Department;
pub use registry::DepartmentRegistry;
pub use stockflow_core::Category;
pub use terminal::{TerminalDescriptor, TerminalStatus, TodaySummary, list_terminals, slugify};
