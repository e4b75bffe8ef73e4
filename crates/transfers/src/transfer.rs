use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{
    Aggregate, AggregateRoot, DepartmentId, DomainError, InventoryItemId, TransferId,
};
use stockflow_events::Event;

/// Transfer status lifecycle.
///
/// `Approved` exists for records written by older flows; approval here moves
/// a transfer straight to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Completed => "completed",
        }
    }
}

/// Transfer line: what moves, and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLine {
    pub product_type: String,
    pub product_id: InventoryItemId,
    pub quantity: i64,
}

impl TransferLine {
    pub fn new(
        product_type: impl Into<String>,
        product_id: InventoryItemId,
        quantity: i64,
    ) -> Self {
        Self {
            product_type: product_type.into(),
            product_id,
            quantity,
        }
    }
}

/// Aggregate root: DepartmentTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTransfer {
    id: TransferId,
    from_department_id: DepartmentId,
    to_department_id: DepartmentId,
    status: TransferStatus,
    items: Vec<TransferLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl DepartmentTransfer {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: TransferId) -> Self {
        Self {
            id,
            from_department_id: DepartmentId::from_uuid(Default::default()),
            to_department_id: DepartmentId::from_uuid(Default::default()),
            status: TransferStatus::Pending,
            items: Vec::new(),
            rejection_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> TransferId {
        self.id
    }

    pub fn from_department_id(&self) -> DepartmentId {
        self.from_department_id
    }

    pub fn to_department_id(&self) -> DepartmentId {
        self.to_department_id
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn items(&self) -> &[TransferLine] {
        &self.items
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Whether this instance holds a created transfer (snapshots loaded from
    /// a store are always created).
    pub fn is_created(&self) -> bool {
        self.created || self.version > 0
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, TransferStatus::Pending)
    }

    /// Validate the shape rules every transfer request must satisfy.
    pub fn validate_request(
        from: DepartmentId,
        to: DepartmentId,
        items: &[TransferLine],
    ) -> Result<(), DomainError> {
        if from == to {
            return Err(DomainError::invalid_transfer(
                "source and destination department must differ",
            ));
        }
        if items.is_empty() {
            return Err(DomainError::invalid_transfer("transfer must have items"));
        }
        for (idx, line) in items.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::invalid_transfer(format!(
                    "line {idx}: quantity must be positive"
                )));
            }
            if line.product_type.trim().is_empty() {
                return Err(DomainError::invalid_transfer(format!(
                    "line {idx}: product type cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

impl AggregateRoot for DepartmentTransfer {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransfer {
    pub transfer_id: TransferId,
    pub from_department_id: DepartmentId,
    pub to_department_id: DepartmentId,
    pub items: Vec<TransferLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteTransfer (the approval decision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTransfer {
    pub transfer_id: TransferId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectTransfer {
    pub transfer_id: TransferId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    Create(CreateTransfer),
    Complete(CompleteTransfer),
    Reject(RejectTransfer),
}

/// Event: TransferCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCreated {
    pub transfer_id: TransferId,
    pub from_department_id: DepartmentId,
    pub to_department_id: DepartmentId,
    pub items: Vec<TransferLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCompleted {
    pub transfer_id: TransferId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRejected {
    pub transfer_id: TransferId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEvent {
    Created(TransferCreated),
    Completed(TransferCompleted),
    Rejected(TransferRejected),
}

impl Event for TransferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::Created(_) => "transfer.created",
            TransferEvent::Completed(_) => "transfer.completed",
            TransferEvent::Rejected(_) => "transfer.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferEvent::Created(e) => e.occurred_at,
            TransferEvent::Completed(e) => e.occurred_at,
            TransferEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DepartmentTransfer {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::Created(e) => {
                self.id = e.transfer_id;
                self.from_department_id = e.from_department_id;
                self.to_department_id = e.to_department_id;
                self.items = e.items.clone();
                self.status = TransferStatus::Pending;
                self.rejection_reason = None;
                self.created = true;
            }
            TransferEvent::Completed(_) => {
                self.status = TransferStatus::Completed;
            }
            TransferEvent::Rejected(e) => {
                self.status = TransferStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::Create(cmd) => self.handle_create(cmd),
            TransferCommand::Complete(cmd) => self.handle_complete(cmd),
            TransferCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl DepartmentTransfer {
    fn ensure_transfer_id(&self, transfer_id: TransferId) -> Result<(), DomainError> {
        if self.id != transfer_id {
            return Err(DomainError::invalid_state("transfer_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self, action: &str) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} a transfer that is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("transfer already exists"));
        }
        Self::validate_request(cmd.from_department_id, cmd.to_department_id, &cmd.items)?;

        Ok(vec![TransferEvent::Created(TransferCreated {
            transfer_id: cmd.transfer_id,
            from_department_id: cmd.from_department_id,
            to_department_id: cmd.to_department_id,
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found(format!("transfer {}", cmd.transfer_id)));
        }
        self.ensure_transfer_id(cmd.transfer_id)?;
        self.ensure_pending("approve")?;

        Ok(vec![TransferEvent::Completed(TransferCompleted {
            transfer_id: cmd.transfer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found(format!("transfer {}", cmd.transfer_id)));
        }
        self.ensure_transfer_id(cmd.transfer_id)?;
        self.ensure_pending("reject")?;

        Ok(vec![TransferEvent::Rejected(TransferRejected {
            transfer_id: cmd.transfer_id,
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_line(quantity: i64) -> TransferLine {
        TransferLine::new("inventory", InventoryItemId::new(), quantity)
    }

    fn create_cmd(transfer_id: TransferId, items: Vec<TransferLine>) -> CreateTransfer {
        CreateTransfer {
            transfer_id,
            from_department_id: DepartmentId::new(),
            to_department_id: DepartmentId::new(),
            items,
            occurred_at: test_time(),
        }
    }

    fn created_transfer() -> DepartmentTransfer {
        let transfer_id = TransferId::new();
        let mut transfer = DepartmentTransfer::empty(transfer_id);
        let events = transfer
            .handle(&TransferCommand::Create(create_cmd(transfer_id, vec![test_line(10)])))
            .unwrap();
        transfer.apply(&events[0]);
        transfer
    }

    #[test]
    fn create_emits_transfer_created_and_starts_pending() {
        let transfer_id = TransferId::new();
        let mut transfer = DepartmentTransfer::empty(transfer_id);
        let cmd = create_cmd(transfer_id, vec![test_line(10), test_line(2)]);

        let events = transfer.handle(&TransferCommand::Create(cmd.clone())).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            TransferEvent::Created(e) => {
                assert_eq!(e.transfer_id, transfer_id);
                assert_eq!(e.items, cmd.items);
            }
            _ => panic!("Expected Created event"),
        }

        transfer.apply(&events[0]);
        assert_eq!(transfer.status(), TransferStatus::Pending);
        assert_eq!(transfer.items().len(), 2);
        assert_eq!(transfer.version(), 1);
    }

    #[test]
    fn same_department_is_rejected() {
        let transfer_id = TransferId::new();
        let dept = DepartmentId::new();
        let cmd = CreateTransfer {
            transfer_id,
            from_department_id: dept,
            to_department_id: dept,
            items: vec![test_line(1)],
            occurred_at: test_time(),
        };
        let err = DepartmentTransfer::empty(transfer_id)
            .handle(&TransferCommand::Create(cmd))
            .unwrap_err();
        match err {
            DomainError::InvalidTransfer(msg) if msg.contains("must differ") => {}
            _ => panic!("Expected InvalidTransfer for same department"),
        }
    }

    #[test]
    fn empty_items_and_non_positive_quantities_are_rejected() {
        let transfer_id = TransferId::new();
        let transfer = DepartmentTransfer::empty(transfer_id);

        for items in [vec![], vec![test_line(0)], vec![test_line(3), test_line(-1)]] {
            let err = transfer
                .handle(&TransferCommand::Create(create_cmd(transfer_id, items)))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransfer(_)));
        }
    }

    #[test]
    fn approve_then_no_further_transitions() {
        let mut transfer = created_transfer();
        let id = transfer.id_typed();

        let events = transfer
            .handle(&TransferCommand::Complete(CompleteTransfer {
                transfer_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        transfer.apply(&events[0]);
        assert_eq!(transfer.status(), TransferStatus::Completed);

        let err = transfer
            .handle(&TransferCommand::Reject(RejectTransfer {
                transfer_id: id,
                reason: "late".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvalidState(msg) if msg.contains("completed") => {}
            _ => panic!("Expected InvalidState after completion"),
        }
    }

    #[test]
    fn reject_records_reason_and_blocks_approval() {
        let mut transfer = created_transfer();
        let id = transfer.id_typed();

        let events = transfer
            .handle(&TransferCommand::Reject(RejectTransfer {
                transfer_id: id,
                reason: "  wrong department ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        transfer.apply(&events[0]);
        assert_eq!(transfer.status(), TransferStatus::Rejected);
        assert_eq!(transfer.rejection_reason(), Some("wrong department"));

        let err = transfer
            .handle(&TransferCommand::Complete(CompleteTransfer {
                transfer_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn commands_on_uncreated_transfer_are_not_found() {
        let id = TransferId::new();
        let err = DepartmentTransfer::empty(id)
            .handle(&TransferCommand::Complete(CompleteTransfer {
                transfer_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let transfer = created_transfer();
        let before = transfer.clone();
        let cmd = TransferCommand::Complete(CompleteTransfer {
            transfer_id: transfer.id_typed(),
            occurred_at: test_time(),
        });

        let events1 = transfer.handle(&cmd).unwrap();
        let events2 = transfer.handle(&cmd).unwrap();

        assert_eq!(transfer, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn snapshot_round_trips_as_created() {
        let transfer = created_transfer();
        let json = serde_json::to_value(&transfer).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("fromDepartmentId").is_some());

        let restored: DepartmentTransfer = serde_json::from_value(json).unwrap();
        assert!(restored.is_created());
        assert_eq!(restored.items(), transfer.items());
        assert_eq!(restored.version(), transfer.version());
    }

    proptest! {
        /// Property: a transfer with any positive quantities between two
        /// distinct departments is accepted.
        #[test]
        fn positive_lines_are_always_accepted(
            quantities in prop::collection::vec(1i64..10_000i64, 1..20)
        ) {
            let items: Vec<TransferLine> = quantities.into_iter().map(test_line).collect();
            let (from, to) = (DepartmentId::new(), DepartmentId::new());
            let outcome = DepartmentTransfer::validate_request(from, to, &items);
            prop_assert!(outcome.is_ok());
        }
    }
}
