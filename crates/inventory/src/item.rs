use serde::{Deserialize, Serialize};

use stockflow_core::{Category, DomainError, DomainResult, Entity, InventoryItemId};

use crate::ledger::requested;

/// Catalog item with its canonical (global) quantity.
///
/// The canonical quantity is the item-level total that audits compare the
/// sum of department ledger rows against. Neither side is assumed correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub sku: String,
    pub name: String,
    pub category: Category,
    /// Canonical global total.
    pub quantity: i64,
}

impl InventoryItem {
    pub fn new(
        id: InventoryItemId,
        sku: impl Into<String>,
        name: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id,
            sku: sku.into(),
            name: name.into(),
            category,
            quantity: 0,
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Validate an operator-supplied canonical total.
    pub fn ensure_valid_quantity(quantity: i64) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("canonical quantity cannot be negative"));
        }
        Ok(())
    }

    /// Canonical total after moving `delta` units across the tracked boundary.
    ///
    /// Removing more than the canonical total is rejected like an over-drawn
    /// ledger row.
    pub fn canonical_after(&self, delta: i64) -> DomainResult<i64> {
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("canonical quantity overflow"))?;
        if next < 0 {
            return Err(DomainError::insufficient_stock(self.quantity, requested(delta)?));
        }
        Ok(next)
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_item() -> InventoryItem {
        InventoryItem::new(InventoryItemId::new(), "SKU-1", "Tonic Water", Category::Drinks)
            .with_quantity(20)
    }

    #[test]
    fn canonical_after_moves_total() {
        let item = test_item();
        assert_eq!(item.canonical_after(5).unwrap(), 25);
        assert_eq!(item.canonical_after(-20).unwrap(), 0);
    }

    #[test]
    fn canonical_cannot_go_negative() {
        let err = test_item().canonical_after(-21).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(20, 21));
    }

    #[test]
    fn most_negative_delta_is_a_validation_error() {
        let err = test_item().canonical_after(i64::MIN).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn negative_canonical_quantity_is_invalid() {
        assert!(InventoryItem::ensure_valid_quantity(0).is_ok());
        assert!(matches!(
            InventoryItem::ensure_valid_quantity(-1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn serializes_external_field_names() {
        let item = test_item();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["sku"], "SKU-1");
        assert_eq!(json["category"], "drinks");
        assert_eq!(json["quantity"], 20);
    }
}
