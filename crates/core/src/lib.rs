//! `stockflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod category;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use category::Category;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, DepartmentId, InventoryItemId, TransferId};
