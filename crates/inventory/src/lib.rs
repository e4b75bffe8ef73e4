//! Inventory domain module.
//!
//! Catalog items with their canonical quantity, and the per-department ledger
//! row arithmetic that every stock mutation goes through. Pure domain logic
//! (no IO, no storage).

pub mod item;
pub mod ledger;

pub use item::InventoryItem;
pub use ledger::{LedgerKey, LedgerRow, StockAdjustment, net_adjustments};
