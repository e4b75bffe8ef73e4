//! Department transfer domain module.
//!
//! A transfer is a small state machine (`pending → completed | rejected`)
//! implemented as a pure aggregate. Ledger effects of completing a transfer
//! are carried out by the infra layer in the same unit of work that stores the
//! new state.

pub mod transfer;

pub use transfer::{
    CompleteTransfer, CreateTransfer, DepartmentTransfer, RejectTransfer, TransferCommand,
    TransferCompleted, TransferCreated, TransferEvent, TransferLine, TransferRejected,
    TransferStatus,
};
